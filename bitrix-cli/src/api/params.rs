//! Parameter access for a single record
//!
//! The host binds parameter values per input record. Every lookup carries the
//! record index explicitly; there is no ambient "current record".

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use super::error::BitrixError;

/// Host capability for reading bound parameter values
pub trait ParamSource {
    /// Value of `name` for record `item_index`, or None when unset
    fn parameter(&self, name: &str, item_index: usize) -> Option<Value>;
}

/// The same parameters for every record
impl ParamSource for Map<String, Value> {
    fn parameter(&self, name: &str, _item_index: usize) -> Option<Value> {
        self.get(name).cloned()
    }
}

/// One parameter map per record
impl ParamSource for Vec<Map<String, Value>> {
    fn parameter(&self, name: &str, item_index: usize) -> Option<Value> {
        self.get(item_index).and_then(|params| params.get(name).cloned())
    }
}

/// Typed view over a parameter source for one record
#[derive(Clone, Copy)]
pub struct Params<'a> {
    source: &'a dyn ParamSource,
    item_index: usize,
}

impl<'a> Params<'a> {
    pub fn new(source: &'a dyn ParamSource, item_index: usize) -> Self {
        Self { source, item_index }
    }

    pub fn item_index(&self) -> usize {
        self.item_index
    }

    /// Raw value, with explicit nulls treated as unset
    pub fn raw(&self, name: &str) -> Option<Value> {
        self.source
            .parameter(name, self.item_index)
            .filter(|v| !v.is_null())
    }

    /// String value; numbers and booleans are rendered as text
    pub fn string(&self, name: &str) -> Option<String> {
        match self.raw(name)? {
            Value::String(s) => Some(s),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }

    /// String value or a default
    pub fn string_or(&self, name: &str, default: &str) -> String {
        self.string(name).unwrap_or_else(|| default.to_string())
    }

    /// Boolean value; accepts JSON booleans and "true"/"false"/"Y"/"N"/"1"/"0" strings
    pub fn bool_or(&self, name: &str, default: bool) -> bool {
        match self.raw(name) {
            Some(Value::Bool(b)) => b,
            Some(Value::String(s)) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "y" | "yes" | "1" => true,
                "false" | "n" | "no" | "0" | "" => false,
                _ => default,
            },
            Some(Value::Number(n)) => n.as_i64().map(|n| n != 0).unwrap_or(default),
            _ => default,
        }
    }

    /// Required value that must not be falsy (null, "", 0, false)
    pub fn required(&self, name: &str) -> Result<Value, BitrixError> {
        self.raw(name)
            .filter(is_truthy)
            .ok_or_else(|| BitrixError::missing(name))
    }

    /// Deserialize a structured parameter (collections, lists)
    pub fn typed<T: DeserializeOwned>(&self, name: &str) -> Result<Option<T>, BitrixError> {
        match self.raw(name) {
            None => Ok(None),
            Some(value) => serde_json::from_value(value)
                .map(Some)
                .map_err(|e| BitrixError::invalid_json(format!("Invalid value for '{}'", name), &e)),
        }
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        Value::String(s) => !s.trim().is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}
