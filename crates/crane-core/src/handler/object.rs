//! Object and scalar shape

use super::{HandlerChain, ShapeHandler};
use crate::accessor::PropertyAccessor;
use crate::value::Value;

/// Fallback handler: reads any value, writes named fields of objects
///
/// Field writes go through the [`PropertyAccessor`], which coerces the value
/// to the representation the field already holds.
#[derive(Debug, Clone, Copy, Default)]
pub struct ObjectHandler;

impl ShapeHandler for ObjectHandler {
    fn name(&self) -> &'static str {
        "object"
    }

    fn can_read(&self, source: &Value) -> bool {
        !source.is_null()
    }

    fn can_write(&self, target: &Value) -> bool {
        matches!(target, Value::Object(_))
    }

    fn read(&self, _chain: &HandlerChain, source: &Value, field: Option<&str>) -> Option<Value> {
        match (source, field) {
            (_, None) => Some(source.clone()),
            (Value::Object(object), Some(field)) => object.read_property(field),
            _ => None,
        }
    }

    fn write(&self, _chain: &HandlerChain, value: &Value, target: &Value, field: &str) -> usize {
        match target {
            Value::Object(object) => usize::from(object.write_property(field, value.clone())),
            _ => 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::ObjectRef;

    #[test]
    fn scalar_source_has_no_fields() {
        let chain = HandlerChain::with_defaults();
        assert!(ObjectHandler.read(&chain, &Value::from(3), Some("x")).is_none());
    }

    #[test]
    fn write_sets_exactly_one_field() {
        let chain = HandlerChain::with_defaults();
        let target = ObjectRef::new("Member").with("id", 1);

        let written = ObjectHandler.write(&chain, &Value::from("Tom"), &Value::from(target.clone()), "name");

        assert_eq!(written, 1);
        assert_eq!(target.field_names(), vec!["id", "name"]);
    }
}
