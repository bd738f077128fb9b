//! Small helpers for reading loosely-typed JSON nodes.

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

/// Normalize a `children` field: absent or null is empty, a single object is a
/// one-element sequence, an array is taken as-is. Anything else yields `None`.
pub fn children_of(node: &Map<String, Value>) -> Option<Vec<&Value>> {
    match node.get("children") {
        None | Some(Value::Null) => Some(Vec::new()),
        Some(Value::Array(items)) => Some(items.iter().collect()),
        Some(obj @ Value::Object(_)) => Some(vec![obj]),
        Some(_) => None,
    }
}

/// Numeric value, rejecting booleans (serde_json keeps them distinct already).
pub fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        _ => None,
    }
}

/// Integer literal > 0. `14.0` is a float literal and does not qualify.
pub fn positive_int(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64().filter(|v| *v > 0),
        _ => None,
    }
}

/// String value with at least one non-whitespace character.
pub fn non_empty_str(value: Option<&Value>) -> Option<&str> {
    match value {
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s.as_str()),
        _ => None,
    }
}

/// Strict enum parse: the value must be exactly one of the serialized names.
pub fn parse_enum<T: DeserializeOwned>(value: &Value) -> Option<T> {
    match value {
        Value::String(_) => serde_json::from_value(value.clone()).ok(),
        _ => None,
    }
}

/// Lenient enum parse used by the generator: trims and lowercases first.
pub fn parse_enum_loose<T: DeserializeOwned>(value: &Value) -> Option<T> {
    match value {
        Value::String(s) => serde_json::from_value(Value::String(s.trim().to_lowercase())).ok(),
        _ => None,
    }
}

/// Short type name used in error messages.
pub fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
