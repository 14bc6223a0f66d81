//! Ordered collection shape

use super::{HandlerChain, ShapeHandler};
use crate::value::Value;

/// Reads and writes through [`Value::List`]
///
/// Reading a field projects it out of every element; writing broadcasts the
/// same value into every element.
#[derive(Debug, Clone, Copy, Default)]
pub struct CollectionHandler;

impl ShapeHandler for CollectionHandler {
    fn name(&self) -> &'static str {
        "collection"
    }

    fn can_read(&self, source: &Value) -> bool {
        matches!(source, Value::List(_))
    }

    fn can_write(&self, target: &Value) -> bool {
        matches!(target, Value::List(_))
    }

    fn read(&self, chain: &HandlerChain, source: &Value, field: Option<&str>) -> Option<Value> {
        let Value::List(items) = source else {
            return None;
        };
        if field.is_none() {
            return Some(source.clone());
        }
        Some(Value::List(chain.project(items, field)))
    }

    fn write(&self, chain: &HandlerChain, value: &Value, target: &Value, field: &str) -> usize {
        match target {
            Value::List(items) => chain.broadcast(value, items, field),
            _ => 0,
        }
    }
}
