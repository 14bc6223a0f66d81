//! Fixed array shape

use super::{HandlerChain, ShapeHandler};
use crate::value::Value;

/// Reads and writes through [`Value::Array`]
///
/// Same projection and broadcast rules as the collection shape; an empty
/// array reads as null.
#[derive(Debug, Clone, Copy, Default)]
pub struct ArrayHandler;

impl ShapeHandler for ArrayHandler {
    fn name(&self) -> &'static str {
        "array"
    }

    fn can_read(&self, source: &Value) -> bool {
        matches!(source, Value::Array(_))
    }

    fn can_write(&self, target: &Value) -> bool {
        matches!(target, Value::Array(_))
    }

    fn read(&self, chain: &HandlerChain, source: &Value, field: Option<&str>) -> Option<Value> {
        match source {
            Value::Array(items) if items.is_empty() => None,
            Value::Array(_) if field.is_none() => Some(source.clone()),
            Value::Array(items) => Some(Value::Array(chain.project(items, field).into_boxed_slice())),
            _ => None,
        }
    }

    fn write(&self, chain: &HandlerChain, value: &Value, target: &Value, field: &str) -> usize {
        match target {
            Value::Array(items) => chain.broadcast(value, items, field),
            _ => 0,
        }
    }
}
