//! Row representations exchanged with the stores
//!
//! Both stores speak in loosely typed JSON rows: the legacy schema is read
//! with `to_jsonb` and the target schema is written through
//! `json_populate_record`. The accessors here apply the lenient coercions
//! the legacy dataset needs (numbers stored as strings, empty strings for
//! missing values, `0` for "no reference").

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

use super::ids::{LegacyId, TargetId};

/// Ordered column map shared by legacy and target rows
pub type Fields = BTreeMap<String, Value>;

/// A single row read from the legacy dataset
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LegacyRecord {
    fields: Fields,
}

impl LegacyRecord {
    pub fn new(fields: Fields) -> Self {
        Self { fields }
    }

    /// Raw value of a column; `None` when absent or SQL NULL
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name).filter(|v| !v.is_null())
    }

    /// Value of a column, `Value::Null` when absent
    pub fn value(&self, name: &str) -> Value {
        self.get(name).cloned().unwrap_or(Value::Null)
    }

    /// Column as text; numbers and booleans are rendered, NULL becomes ""
    pub fn text(&self, name: &str) -> String {
        self.get(name).map(value_to_text).unwrap_or_default()
    }

    /// Column as trimmed text, `None` when empty
    pub fn opt_text(&self, name: &str) -> Option<String> {
        let text = self.text(name);
        let trimmed = text.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    }

    /// Column as an integer, 0 when missing or unparseable
    pub fn int(&self, name: &str) -> i64 {
        match self.get(name) {
            Some(Value::Number(n)) => n
                .as_i64()
                .or_else(|| n.as_f64().map(|f| f as i64))
                .unwrap_or(0),
            Some(Value::String(s)) => {
                let s = s.trim();
                s.parse::<i64>()
                    .ok()
                    .or_else(|| s.parse::<f64>().ok().map(|f| f as i64))
                    .unwrap_or(0)
            }
            Some(Value::Bool(b)) => i64::from(*b),
            _ => 0,
        }
    }

    /// Column as a float, 0.0 when missing or unparseable
    pub fn float(&self, name: &str) -> f64 {
        match self.get(name) {
            Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
            Some(Value::String(s)) => s.trim().parse::<f64>().unwrap_or(0.0),
            Some(Value::Bool(b)) => f64::from(u8::from(*b)),
            _ => 0.0,
        }
    }

    /// Column as a legacy boolean flag ("1", "true", "yes", "on", non-zero)
    pub fn flag(&self, name: &str) -> bool {
        match self.get(name) {
            Some(Value::Bool(b)) => *b,
            Some(Value::Number(n)) => n.as_f64().is_some_and(|f| f != 0.0),
            Some(Value::String(s)) => matches!(
                s.trim().to_ascii_lowercase().as_str(),
                "1" | "true" | "yes" | "on"
            ),
            _ => false,
        }
    }

    /// Column as a legacy reference; empty and "0" mean no reference
    pub fn id(&self, name: &str) -> Option<LegacyId> {
        let text = self.text(name);
        let trimmed = text.trim();
        if trimmed.is_empty() || trimmed == "0" {
            return None;
        }
        LegacyId::new(trimmed).ok()
    }

    pub fn fields(&self) -> &Fields {
        &self.fields
    }

    /// Adds or replaces a column, returning the record
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    /// Copies columns from `other` that this record does not already carry
    pub fn merged_with(&self, other: &LegacyRecord) -> LegacyRecord {
        let mut fields = self.fields.clone();
        for (key, value) in &other.fields {
            fields.entry(key.clone()).or_insert_with(|| value.clone());
        }
        LegacyRecord { fields }
    }
}

impl From<Value> for LegacyRecord {
    fn from(value: Value) -> Self {
        match value {
            Value::Object(map) => Self {
                fields: map.into_iter().collect(),
            },
            _ => Self::default(),
        }
    }
}

/// A row written to or read back from the target schema
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TargetRow {
    fields: Fields,
}

impl TargetRow {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style column assignment
    pub fn with(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(column.into(), value.into());
        self
    }

    pub fn set(&mut self, column: impl Into<String>, value: impl Into<Value>) {
        self.fields.insert(column.into(), value.into());
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.fields.get(column)
    }

    /// Surrogate id of a row read back from the store
    pub fn id(&self) -> Option<TargetId> {
        self.fields
            .get("id")
            .and_then(Value::as_i64)
            .map(TargetId::new)
    }

    pub fn text(&self, column: &str) -> String {
        match self.fields.get(column) {
            Some(Value::Null) | None => String::new(),
            Some(v) => value_to_text(v),
        }
    }

    pub fn int(&self, column: &str) -> i64 {
        match self.fields.get(column) {
            Some(Value::Number(n)) => n.as_i64().unwrap_or(0),
            Some(Value::String(s)) => s.trim().parse().unwrap_or(0),
            _ => 0,
        }
    }

    pub fn float(&self, column: &str) -> f64 {
        match self.fields.get(column) {
            Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
            Some(Value::String(s)) => s.trim().parse().unwrap_or(0.0),
            _ => 0.0,
        }
    }

    pub fn columns(&self) -> impl Iterator<Item = &String> {
        self.fields.keys()
    }

    pub fn fields(&self) -> &Fields {
        &self.fields
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// True when every column of `filter` equals this row's value (absent counts as NULL)
    pub fn matches(&self, filter: &TargetRow) -> bool {
        filter.fields.iter().all(|(column, expected)| {
            let actual = self.fields.get(column).unwrap_or(&Value::Null);
            values_equal(actual, expected)
        })
    }

    /// JSON object form used by the Postgres store
    pub fn to_json(&self) -> Value {
        Value::Object(
            self.fields
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect::<Map<String, Value>>(),
        )
    }
}

impl From<Value> for TargetRow {
    fn from(value: Value) -> Self {
        match value {
            Value::Object(map) => Self {
                fields: map.into_iter().collect(),
            },
            _ => Self::default(),
        }
    }
}

fn value_to_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        Value::Bool(b) => if *b { "1" } else { "0" }.to_string(),
        other => other.to_string(),
    }
}

/// Numeric values compare by magnitude so `12` matches `12.0`
fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        _ => a == b,
    }
}
