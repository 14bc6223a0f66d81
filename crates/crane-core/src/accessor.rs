//! Property access
//!
//! Uniform get/set over a named field, independent of whether the holder is a
//! typed record or a structured tree node. Writes go through [`coerce`] so a
//! value lands in the representation the field already uses.

use crate::value::{ObjectRef, TreeRef, Value};
use serde_json::Value as Json;

/// Named-field access over an object shape
pub trait PropertyAccessor {
    /// Read a field; `None` when the holder has no such field
    fn read_property(&self, name: &str) -> Option<Value>;

    /// Write a field, returning `true` if the holder accepted it
    fn write_property(&self, name: &str, value: Value) -> bool;

    /// Check whether the holder declares the field
    fn has_property(&self, name: &str) -> bool;
}

impl PropertyAccessor for ObjectRef {
    fn read_property(&self, name: &str) -> Option<Value> {
        self.get(name)
    }

    fn write_property(&self, name: &str, value: Value) -> bool {
        let current = self.get(name);
        self.set(name, coerce(current.as_ref(), value));
        true
    }

    fn has_property(&self, name: &str) -> bool {
        self.has_field(name)
    }
}

impl PropertyAccessor for TreeRef {
    fn read_property(&self, name: &str) -> Option<Value> {
        self.read(|node| node.get(name).cloned().map(Value::from_json))
    }

    fn write_property(&self, name: &str, value: Value) -> bool {
        let json = value.to_json();
        self.update(|node| match node {
            Json::Object(map) => {
                map.insert(name.to_string(), json);
                true
            }
            _ => false,
        })
    }

    fn has_property(&self, name: &str) -> bool {
        self.read(|node| node.get(name).is_some())
    }
}

/// Convert `incoming` to the representation of the field's `current` value
///
/// - string field receiving a number or boolean: stringified
/// - numeric field receiving a numeric string: parsed
/// - list field receiving an array (and vice versa): reshaped
/// - anything else: stored as is
#[must_use]
pub fn coerce(current: Option<&Value>, incoming: Value) -> Value {
    match (current, incoming) {
        (Some(Value::Scalar(Json::String(_))), Value::Scalar(Json::Number(n))) => {
            Value::from(n.to_string())
        }
        (Some(Value::Scalar(Json::String(_))), Value::Scalar(Json::Bool(b))) => {
            Value::from(b.to_string())
        }
        (Some(Value::Scalar(Json::Number(_))), Value::Scalar(Json::String(s))) => {
            parse_number(&s).unwrap_or(Value::from(s))
        }
        (Some(Value::List(_)), Value::Array(items)) => Value::List(items.into_vec()),
        (Some(Value::Array(_)), Value::List(items)) => Value::Array(items.into_boxed_slice()),
        (_, incoming) => incoming,
    }
}

fn parse_number(s: &str) -> Option<Value> {
    let trimmed = s.trim();
    if let Ok(n) = trimmed.parse::<i64>() {
        return Some(Value::from(n));
    }
    trimmed
        .parse::<f64>()
        .ok()
        .filter(|n| n.is_finite())
        .map(Value::from)
}
