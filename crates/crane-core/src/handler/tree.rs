//! Structured tree node shape

use super::{HandlerChain, ShapeHandler};
use crate::value::Value;
use serde_json::Value as Json;

/// Reads and writes through [`Value::Tree`]
///
/// Object nodes behave like records; array nodes project on read and
/// broadcast to their object elements on write.
#[derive(Debug, Clone, Copy, Default)]
pub struct TreeHandler;

impl ShapeHandler for TreeHandler {
    fn name(&self) -> &'static str {
        "tree"
    }

    fn can_read(&self, source: &Value) -> bool {
        matches!(source, Value::Tree(_))
    }

    fn can_write(&self, target: &Value) -> bool {
        matches!(target, Value::Tree(_))
    }

    fn read(&self, _chain: &HandlerChain, source: &Value, field: Option<&str>) -> Option<Value> {
        let Value::Tree(tree) = source else {
            return None;
        };
        match field {
            None if tree.read(Json::is_null) => None,
            None => Some(source.clone()),
            Some(field) => tree.read(|node| project(node, field)).map(lift),
        }
    }

    fn write(&self, _chain: &HandlerChain, value: &Value, target: &Value, field: &str) -> usize {
        let Value::Tree(tree) = target else {
            return 0;
        };
        let json = value.to_json();
        tree.update(|node| assign(node, field, &json))
    }
}

fn project(node: &Json, field: &str) -> Option<Json> {
    match node {
        Json::Object(map) => map.get(field).filter(|v| !v.is_null()).cloned(),
        Json::Array(items) => Some(Json::Array(
            items.iter().filter_map(|item| project(item, field)).collect(),
        )),
        _ => None,
    }
}

fn assign(node: &mut Json, field: &str, json: &Json) -> usize {
    match node {
        Json::Object(map) => {
            map.insert(field.to_string(), json.clone());
            1
        }
        Json::Array(items) => items.iter_mut().map(|item| assign(item, field, json)).sum(),
        _ => 0,
    }
}

fn lift(json: Json) -> Value {
    match json {
        Json::Null => Value::Null,
        node @ (Json::Object(_) | Json::Array(_)) => Value::tree(node),
        scalar => Value::Scalar(scalar),
    }
}
