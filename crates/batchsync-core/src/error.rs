use thiserror::Error;

/// Errors raised while turning raw input into records.
#[derive(Debug, Error)]
pub enum RecordError {
    #[error("input is not valid UTF-8: {0}")]
    Utf8(#[from] std::str::Utf8Error),

    #[error("invalid JSON: {source}")]
    Json { source: serde_json::Error },

    #[error("invalid JSON on line {line}: {source}")]
    JsonLine {
        line: usize,
        source: serde_json::Error,
    },

    #[error("expected a JSON array of records at the top level")]
    NotAnArray,

    /// `row` is zero-based for JSON arrays and one-based (line number) for JSON Lines.
    #[error("row {row} is not a JSON object")]
    NotAnObject { row: usize },
}

pub type Result<T> = std::result::Result<T, RecordError>;
