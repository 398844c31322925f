//! Query-result rows and the row-to-label mapping convention.
//!
//! Every source row is a flat JSON object (one key per selected column).
//! Label fields are looked up on the row first and then inside a nested
//! `metadata` object, so a query may either extract `metadata->>'category'`
//! in SQL or select the raw `metadata` document.
//!
//! Mapping never fails:
//! - a null, absent or empty label field maps to the field's fallback
//! - a null, absent, non-numeric or non-finite value maps to `0.0`

use serde_json::{Map, Value};

/// Name of the structured key-value column consulted for nested fields.
pub const METADATA_COLUMN: &str = "metadata";

/// One result row keyed by column name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    columns: Map<String, Value>,
}

impl From<Value> for Row {
    fn from(v: Value) -> Self {
        match v {
            Value::Object(columns) => Self { columns },
            other => {
                tracing::warn!(kind = json_kind(&other), "row is not an object, using defaults");
                Self::default()
            }
        }
    }
}

impl From<Map<String, Value>> for Row {
    fn from(columns: Map<String, Value>) -> Self {
        Self { columns }
    }
}

impl Row {
    /// Raw column value, falling back to `metadata.<field>`.
    pub fn get(&self, field: &str) -> Option<&Value> {
        match self.columns.get(field) {
            Some(v) if !v.is_null() => Some(v),
            _ => self
                .columns
                .get(METADATA_COLUMN)
                .and_then(Value::as_object)
                .and_then(|m| m.get(field))
                .filter(|v| !v.is_null()),
        }
    }

    /// Label value for `field`, or `fallback` when null/absent/empty.
    pub fn label(&self, field: &str, fallback: &str) -> String {
        match self.get(field) {
            Some(Value::String(s)) if !s.is_empty() => s.clone(),
            Some(Value::String(_)) | None => fallback.to_string(),
            Some(Value::Number(n)) => n.to_string(),
            Some(Value::Bool(b)) => b.to_string(),
            Some(other) => {
                tracing::debug!(field, kind = json_kind(other), "label field has nested shape");
                fallback.to_string()
            }
        }
    }

    /// Numeric value for `field`, `0.0` on null or unparseable input.
    pub fn value(&self, field: &str) -> f64 {
        let parsed = match self.get(field) {
            Some(Value::Number(n)) => n.as_f64(),
            Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
            _ => None,
        };
        match parsed {
            Some(v) if v.is_finite() => v,
            _ => 0.0,
        }
    }
}

/// How one label is extracted from a row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LabelField {
    /// Label key in the exposition output.
    pub name: &'static str,
    /// Column (or metadata key) holding the value.
    pub column: &'static str,
    /// Label used when the column is null or absent.
    pub fallback: &'static str,
}

impl LabelField {
    pub const fn new(name: &'static str, fallback: &'static str) -> Self {
        Self { name, column: name, fallback }
    }
}

/// One (label set, value) tuple produced from a row.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub labels: Vec<(String, String)>,
    pub value: f64,
}

impl Sample {
    pub fn from_row(row: &Row, fields: &[LabelField], value_column: &str) -> Self {
        let labels = fields
            .iter()
            .map(|f| (f.name.to_string(), row.label(f.column, f.fallback)))
            .collect();
        Self { labels, value: row.value(value_column) }
    }

    /// Borrowed view suitable for the registry's `&[(&str, &str)]` API.
    pub fn label_pairs(&self) -> Vec<(&str, &str)> {
        self.labels.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect()
    }

    /// Value of a single label, if present.
    pub fn label(&self, name: &str) -> Option<&str> {
        self.labels
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }
}

/// Map every row with the same label fields and value column.
pub fn map_rows(rows: &[Row], fields: &[LabelField], value_column: &str) -> Vec<Sample> {
    rows.iter()
        .map(|r| Sample::from_row(r, fields, value_column))
        .collect()
}

fn json_kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
