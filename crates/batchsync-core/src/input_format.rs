use std::borrow::Cow;
use std::path::Path;

use serde_json::Value;

use crate::error::{RecordError, Result};
use crate::record::Record;

/// Supported input formats for record collections.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputFormat {
    /// A single JSON array of objects
    Json,
    /// Newline-delimited JSON, one object per line
    Jsonl,
}

impl InputFormat {
    /// Detect format from a file extension. Returns `None` for unknown extensions.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "json" => Some(Self::Json),
            "jsonl" | "ndjson" => Some(Self::Jsonl),
            _ => None,
        }
    }
}

impl std::str::FromStr for InputFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "jsonl" | "ndjson" => Ok(Self::Jsonl),
            other => Err(format!("unsupported input format: {other} (expected json or jsonl)")),
        }
    }
}

/// Parse a record collection. Rows keep their input order.
pub fn parse_records(bytes: &[u8], format: InputFormat) -> Result<Vec<Record>> {
    let text = std::str::from_utf8(bytes)?;
    match format {
        InputFormat::Json => parse_json_array(text),
        InputFormat::Jsonl => parse_json_lines(text),
    }
}

fn parse_json_array(text: &str) -> Result<Vec<Record>> {
    let value: Value = serde_json::from_str(&sanitize_non_finite(text))
        .map_err(|source| RecordError::Json { source })?;

    let Value::Array(rows) = value else {
        return Err(RecordError::NotAnArray);
    };

    rows.into_iter()
        .enumerate()
        .map(|(row, value)| match value {
            Value::Object(map) => Ok(Record::from(map)),
            _ => Err(RecordError::NotAnObject { row }),
        })
        .collect()
}

fn parse_json_lines(text: &str) -> Result<Vec<Record>> {
    let mut records = Vec::new();
    for (idx, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let value: Value = serde_json::from_str(&sanitize_non_finite(line))
            .map_err(|source| RecordError::JsonLine {
                line: idx + 1,
                source,
            })?;
        match value {
            Value::Object(map) => records.push(Record::from(map)),
            _ => return Err(RecordError::NotAnObject { row: idx + 1 }),
        }
    }
    Ok(records)
}

const NON_FINITE_TOKENS: [&str; 3] = ["-Infinity", "Infinity", "NaN"];

/// Rewrite bare `NaN` / `Infinity` / `-Infinity` tokens to `null`.
///
/// Dataframe exporters emit these tokens for empty numeric cells; they are not
/// JSON. String contents are never touched.
pub fn sanitize_non_finite(input: &str) -> Cow<'_, str> {
    let bytes = input.as_bytes();
    let mut out: Option<String> = None;
    let mut copied_to = 0;
    let mut in_string = false;
    let mut escaped = false;
    let mut i = 0;

    while i < bytes.len() {
        let b = bytes[i];
        if in_string {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == b'"' {
                in_string = false;
            }
            i += 1;
            continue;
        }

        if b == b'"' {
            in_string = true;
            i += 1;
            continue;
        }

        match NON_FINITE_TOKENS
            .iter()
            .find(|token| bytes[i..].starts_with(token.as_bytes()))
        {
            Some(token) => {
                let buf = out.get_or_insert_with(|| String::with_capacity(input.len()));
                buf.push_str(&input[copied_to..i]);
                buf.push_str("null");
                i += token.len();
                copied_to = i;
            }
            None => i += 1,
        }
    }

    match out {
        Some(mut buf) => {
            buf.push_str(&input[copied_to..]);
            Cow::Owned(buf)
        }
        None => Cow::Borrowed(input),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_format_from_path() {
        assert_eq!(
            InputFormat::from_path(Path::new("vendas.json")),
            Some(InputFormat::Json)
        );
        assert_eq!(
            InputFormat::from_path(Path::new("/tmp/estoque.JSONL")),
            Some(InputFormat::Jsonl)
        );
        assert_eq!(
            InputFormat::from_path(Path::new("dump.ndjson")),
            Some(InputFormat::Jsonl)
        );
        assert_eq!(InputFormat::from_path(Path::new("vendas.xlsm")), None);
        assert_eq!(InputFormat::from_path(Path::new("noext")), None);
    }

    #[test]
    fn test_format_from_str() {
        assert_eq!("JSON".parse::<InputFormat>().unwrap(), InputFormat::Json);
        assert_eq!("ndjson".parse::<InputFormat>().unwrap(), InputFormat::Jsonl);
        assert!("csv".parse::<InputFormat>().is_err());
    }

    #[test]
    fn test_sanitize_leaves_strings_alone() {
        let input = r#"[{"a": NaN, "b": "NaN", "c": -Infinity, "d": "say \"Infinity\"", "e": Infinity}]"#;
        let out = sanitize_non_finite(input);
        assert_eq!(
            out,
            r#"[{"a": null, "b": "NaN", "c": null, "d": "say \"Infinity\"", "e": null}]"#
        );
    }

    #[test]
    fn test_sanitize_borrows_when_clean() {
        let input = r#"[{"a": 1}]"#;
        assert!(matches!(sanitize_non_finite(input), Cow::Borrowed(_)));
    }

    #[test]
    fn test_parse_json_array_with_nan() {
        let input = br#"[{"loja": "JK SHOPPING", "qtd": NaN}, {"loja": "PARK SHOPPING", "qtd": 2}]"#;
        let records = parse_records(input, InputFormat::Json).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].get("qtd"), Some(&Value::Null));
        assert_eq!(records[1].get("qtd"), Some(&json!(2)));
    }

    #[test]
    fn test_parse_json_rejects_non_object_rows() {
        let err = parse_records(br#"[{"a": 1}, 3]"#, InputFormat::Json).unwrap_err();
        assert!(matches!(err, RecordError::NotAnObject { row: 1 }));

        let err = parse_records(br#"{"a": 1}"#, InputFormat::Json).unwrap_err();
        assert!(matches!(err, RecordError::NotAnArray));
    }

    #[test]
    fn test_parse_jsonl_skips_blank_lines() {
        let input = b"{\"a\": 1}\n\n{\"a\": NaN}\n";
        let records = parse_records(input, InputFormat::Jsonl).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].get("a"), Some(&Value::Null));
    }

    #[test]
    fn test_parse_jsonl_reports_line_number() {
        let input = b"{\"a\": 1}\n{broken\n";
        let err = parse_records(input, InputFormat::Jsonl).unwrap_err();
        assert!(matches!(err, RecordError::JsonLine { line: 2, .. }));
    }
}
