//! Shape handler chain
//!
//! Reads values out of fetched sources and writes them onto targets without
//! the caller branching on shape. Each [`ShapeHandler`] declares which shapes
//! it can read from and write to; the [`HandlerChain`] dispatches to the first
//! handler that accepts, and container handlers recurse back into the chain
//! for their elements. One assemble operation therefore enriches a single
//! object, every element of a list, or every element of a list of lists.
//!
//! Default precedence: array, ordered collection, tree node, object/scalar.

use crate::value::Value;

mod array;
mod collection;
mod object;
mod tree;

pub use array::ArrayHandler;
pub use collection::CollectionHandler;
pub use object::ObjectHandler;
pub use tree::TreeHandler;

/// Read/write capability for one value shape
pub trait ShapeHandler: Send + Sync + std::fmt::Debug {
    /// Handler name (for diagnostics)
    fn name(&self) -> &'static str;

    /// Check if this handler reads from `source`
    fn can_read(&self, source: &Value) -> bool;

    /// Check if this handler writes into `target`
    fn can_write(&self, target: &Value) -> bool;

    /// Read `field` out of `source`; `None` field means the whole source
    fn read(&self, chain: &HandlerChain, source: &Value, field: Option<&str>) -> Option<Value>;

    /// Write `value` into `field` of `target`, returning fields written
    fn write(&self, chain: &HandlerChain, value: &Value, target: &Value, field: &str) -> usize;
}

/// Ordered set of shape handlers
#[derive(Debug)]
pub struct HandlerChain {
    handlers: Vec<Box<dyn ShapeHandler>>,
}

impl Default for HandlerChain {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl HandlerChain {
    /// Create empty chain
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self {
            handlers: Vec::new(),
        }
    }

    /// Create chain with the built-in handlers
    #[must_use]
    pub fn with_defaults() -> Self {
        let mut chain = Self::new();
        chain.register(ArrayHandler);
        chain.register(CollectionHandler);
        chain.register(TreeHandler);
        chain.register(ObjectHandler);
        chain
    }

    /// Append a handler with the lowest precedence
    pub fn register<H: ShapeHandler + 'static>(&mut self, handler: H) {
        self.handlers.push(Box::new(handler));
    }

    /// Insert a handler with the highest precedence
    pub fn prepend<H: ShapeHandler + 'static>(&mut self, handler: H) {
        self.handlers.insert(0, Box::new(handler));
    }

    /// Handler names in precedence order
    #[must_use]
    pub fn names(&self) -> Vec<&'static str> {
        self.handlers.iter().map(|h| h.name()).collect()
    }

    /// Number of handlers
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// Check if chain is empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Read `field` out of `source`
    ///
    /// Returns `None` for null sources, unreadable shapes and null results.
    #[must_use]
    pub fn read(&self, source: &Value, field: Option<&str>) -> Option<Value> {
        if source.is_null() {
            return None;
        }
        let handler = self.handlers.iter().find(|h| h.can_read(source))?;
        handler
            .read(self, source, field)
            .filter(|value| !value.is_null())
    }

    /// Write `value` into `field` of `target`, returning fields written
    pub fn write(&self, value: &Value, target: &Value, field: &str) -> usize {
        if value.is_null() || target.is_null() {
            return 0;
        }
        match self.handlers.iter().find(|h| h.can_write(target)) {
            Some(handler) => {
                tracing::trace!(handler = handler.name(), field, "writing");
                handler.write(self, value, target, field)
            }
            None => {
                tracing::trace!(shape = target.kind(), field, "no handler accepts target");
                0
            }
        }
    }

    /// Element-wise read, dropping nulls
    pub(crate) fn project(&self, items: &[Value], field: Option<&str>) -> Vec<Value> {
        items
            .iter()
            .filter_map(|item| self.read(item, field))
            .collect()
    }

    /// Write the same value into every element
    pub(crate) fn broadcast(&self, value: &Value, items: &[Value], field: &str) -> usize {
        items
            .iter()
            .map(|item| self.write(value, item, field))
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::ObjectRef;
    use serde_json::json;

    fn member(name: &str) -> ObjectRef {
        ObjectRef::new("Member").with("name", name)
    }

    #[test]
    fn default_precedence() {
        let chain = HandlerChain::with_defaults();
        assert_eq!(chain.names(), vec!["array", "collection", "tree", "object"]);
    }

    #[test]
    fn read_whole_source_without_field() {
        let chain = HandlerChain::with_defaults();
        let source = Value::from("Tom");
        assert_eq!(chain.read(&source, None), Some(Value::from("Tom")));
    }

    #[test]
    fn read_object_field() {
        let chain = HandlerChain::with_defaults();
        let source = Value::from(member("Tom"));
        assert_eq!(chain.read(&source, Some("name")), Some(Value::from("Tom")));
        assert_eq!(chain.read(&source, Some("missing")), None);
    }

    #[test]
    fn read_projects_list_elements() {
        let chain = HandlerChain::with_defaults();
        let source = Value::list([member("a"), member("b"), ObjectRef::new("Member")]);

        let names = chain.read(&source, Some("name")).unwrap();
        assert_eq!(names.to_json(), json!(["a", "b"]));
    }

    #[test]
    fn read_projects_nested_lists() {
        let chain = HandlerChain::with_defaults();
        let source = Value::list([
            Value::list([member("a"), member("b")]),
            Value::array([member("c")]),
        ]);

        let names = chain.read(&source, Some("name")).unwrap();
        assert_eq!(names.to_json(), json!([["a", "b"], ["c"]]));
    }

    #[test]
    fn broadcast_write_into_list() {
        let chain = HandlerChain::with_defaults();
        let members = [member("a"), member("b"), member("c")];
        let target = Value::list(members.clone());

        let written = chain.write(&Value::from("Math"), &target, "title");

        assert_eq!(written, 3);
        for m in &members {
            assert_eq!(m.get("title"), Some(Value::from("Math")));
        }
    }

    #[test]
    fn broadcast_write_into_nested_array() {
        let chain = HandlerChain::with_defaults();
        let inner = member("a");
        let target = Value::array([Value::list([inner.clone()])]);

        assert_eq!(chain.write(&Value::from(1), &target, "rank"), 1);
        assert_eq!(inner.get("rank"), Some(Value::from(1)));
    }

    #[test]
    fn write_null_is_skipped() {
        let chain = HandlerChain::with_defaults();
        let target = member("a");
        assert_eq!(chain.write(&Value::Null, &Value::from(target.clone()), "name"), 0);
        assert_eq!(target.get("name"), Some(Value::from("a")));
    }

    #[test]
    fn write_into_scalar_is_ignored() {
        let chain = HandlerChain::with_defaults();
        assert_eq!(chain.write(&Value::from(1), &Value::from("x"), "f"), 0);
    }

    #[test]
    fn empty_chain_reads_nothing() {
        let chain = HandlerChain::new();
        assert!(chain.is_empty());
        assert_eq!(chain.read(&Value::from(1), None), None);
    }

    #[derive(Debug)]
    struct UppercaseHandler;

    impl ShapeHandler for UppercaseHandler {
        fn name(&self) -> &'static str {
            "uppercase"
        }

        fn can_read(&self, source: &Value) -> bool {
            source.as_str().is_some()
        }

        fn can_write(&self, _target: &Value) -> bool {
            false
        }

        fn read(&self, _chain: &HandlerChain, source: &Value, _field: Option<&str>) -> Option<Value> {
            source.as_str().map(|s| Value::from(s.to_uppercase()))
        }

        fn write(&self, _chain: &HandlerChain, _value: &Value, _target: &Value, _field: &str) -> usize {
            0
        }
    }

    #[test]
    fn prepended_handler_wins() {
        let mut chain = HandlerChain::with_defaults();
        chain.prepend(UppercaseHandler);

        assert_eq!(chain.names()[0], "uppercase");
        assert_eq!(chain.read(&Value::from("tom"), None), Some(Value::from("TOM")));
    }
}
