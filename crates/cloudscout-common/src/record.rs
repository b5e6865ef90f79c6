//! Schemaless resource records
//!
//! A record is a JSON object with a string `id` plus type-specific camelCase
//! attributes. Attribute absence is meaningful and distinct from `null`:
//! rule predicates probe presence without panicking on missing keys, and
//! accessors treat `null` the same as absent.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceRecord {
    attrs: Map<String, Value>,
}

impl ResourceRecord {
    pub fn new(id: impl Into<String>) -> Self {
        let mut attrs = Map::new();
        attrs.insert("id".to_string(), Value::String(id.into()));
        Self { attrs }
    }

    /// Wrap a JSON value; `None` unless it is an object.
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(attrs) => Some(Self { attrs }),
            _ => None,
        }
    }

    /// Builder-style attribute set, mainly for fixtures
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attrs.insert(key.into(), value.into());
        self
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.attrs.insert(key.into(), value.into());
    }

    /// Record identifier; empty when the source omitted one
    pub fn id(&self) -> &str {
        self.str("id").unwrap_or("")
    }

    /// Key present with a non-null value
    pub fn has(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.attrs.get(key).filter(|v| !v.is_null())
    }

    pub fn str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }

    /// Boolean attribute; absent, null, or non-boolean read as false
    pub fn flag(&self, key: &str) -> bool {
        self.get(key).and_then(Value::as_bool).unwrap_or(false)
    }

    pub fn int(&self, key: &str) -> Option<i64> {
        self.get(key).and_then(Value::as_i64)
    }

    pub fn float(&self, key: &str) -> Option<f64> {
        self.get(key).and_then(Value::as_f64)
    }

    /// List attribute; absent, null, or non-list read as empty
    pub fn list(&self, key: &str) -> &[Value] {
        self.get(key)
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn attrs(&self) -> &Map<String, Value> {
        &self.attrs
    }
}

/// String field of an object inside a list attribute
pub fn entry_str<'a>(entry: &'a Value, key: &str) -> Option<&'a str> {
    entry.get(key).and_then(Value::as_str)
}

/// Integer field of an object inside a list attribute
pub fn entry_int(entry: &Value, key: &str) -> Option<i64> {
    entry.get(key).and_then(Value::as_i64)
}
