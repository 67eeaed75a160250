//! Records as handed over by the extract stages.
//!
//! A record is an insertion-ordered mapping of field name to scalar value. The
//! uploader treats records as opaque JSON objects; the only transformation it
//! applies is null normalization (non-finite floats and missing values become
//! JSON `null`) plus optional per-destination defaults for null fields.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};

/// One row of a dataset, serialized as a JSON object.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record(Map<String, Value>);

impl Record {
    pub fn new() -> Self {
        Self(Map::new())
    }

    /// Set a field. Non-finite floats and `None` are stored as `null`.
    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<Scalar>) {
        self.0.insert(field.into(), value.into().into_json());
    }

    /// Builder-style [`Record::insert`].
    pub fn with(mut self, field: impl Into<String>, value: impl Into<Scalar>) -> Self {
        self.insert(field, value);
        self
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Field names in insertion order.
    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_map(self) -> Map<String, Value> {
        self.0
    }
}

impl From<Map<String, Value>> for Record {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl<K, V> FromIterator<(K, V)> for Record
where
    K: Into<String>,
    V: Into<Scalar>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut record = Record::new();
        for (field, value) in iter {
            record.insert(field, value);
        }
        record
    }
}

/// A single cell value as produced by an extract stage.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl Scalar {
    /// Convert to JSON. NaN and infinities have no JSON representation and map to `null`.
    pub fn into_json(self) -> Value {
        match self {
            Scalar::Null => Value::Null,
            Scalar::Bool(b) => Value::Bool(b),
            Scalar::Int(i) => Value::Number(i.into()),
            Scalar::Float(f) => Number::from_f64(f).map_or(Value::Null, Value::Number),
            Scalar::Text(s) => Value::String(s),
        }
    }
}

impl From<bool> for Scalar {
    fn from(value: bool) -> Self {
        Scalar::Bool(value)
    }
}

impl From<i64> for Scalar {
    fn from(value: i64) -> Self {
        Scalar::Int(value)
    }
}

impl From<i32> for Scalar {
    fn from(value: i32) -> Self {
        Scalar::Int(value.into())
    }
}

impl From<u32> for Scalar {
    fn from(value: u32) -> Self {
        Scalar::Int(value.into())
    }
}

impl From<f64> for Scalar {
    fn from(value: f64) -> Self {
        Scalar::Float(value)
    }
}

impl From<String> for Scalar {
    fn from(value: String) -> Self {
        Scalar::Text(value)
    }
}

impl From<&str> for Scalar {
    fn from(value: &str) -> Self {
        Scalar::Text(value.to_string())
    }
}

impl<T: Into<Scalar>> From<Option<T>> for Scalar {
    fn from(value: Option<T>) -> Self {
        value.map_or(Scalar::Null, Into::into)
    }
}

/// Replacement values for fields that are `null` after normalization.
pub type FieldDefaults = BTreeMap<String, Value>;

/// Fill `null` fields that have a configured default. Fields absent from the
/// record are left absent: records are not reshaped.
pub fn normalize_record(mut record: Record, defaults: &FieldDefaults) -> Record {
    if defaults.is_empty() {
        return record;
    }
    for (field, value) in record.0.iter_mut() {
        if value.is_null() {
            if let Some(default) = defaults.get(field) {
                *value = default.clone();
            }
        }
    }
    record
}

/// Apply [`normalize_record`] to a whole collection, preserving order.
pub fn normalize_records(records: Vec<Record>, defaults: &FieldDefaults) -> Vec<Record> {
    if defaults.is_empty() {
        return records;
    }
    records
        .into_iter()
        .map(|record| normalize_record(record, defaults))
        .collect()
}
