//! Expression hook
//!
//! A property mapping may carry a derivation expression. The engine does not
//! ship an expression language: it hands the expression and an
//! [`ExpressionContext`] to a pluggable [`ExpressionEvaluator`] and writes the
//! returned value instead of the resolved source value.
//!
//! Variables exposed to evaluators:
//! - `target`: the object being enriched
//! - `source`: the resolved source value for this mapping
//! - `fetched`: the raw value the container fetched for the key
//! - `key`: the key value read from the object
//! - `src`: the configured source field name
//! - `ref`: the configured target field name

use crate::descriptor::PropertyMapping;
use crate::error::ExpressionError;
use crate::value::{ObjectRef, Value};
use indexmap::IndexMap;
use std::fmt;

/// Everything known about one mapping at write time
#[derive(Debug, Clone, Copy)]
pub struct ExpressionContext<'a> {
    /// Object being enriched
    pub target: &'a ObjectRef,
    /// Whole fetched value for the key
    pub fetched: &'a Value,
    /// Value read out of the fetched value for this mapping
    pub value: &'a Value,
    /// Key value read from the target
    pub key: Option<&'a Value>,
    /// Configured source field
    pub source_field: Option<&'a str>,
    /// Configured target field
    pub target_field: Option<&'a str>,
}

impl ExpressionContext<'_> {
    /// Named variables for an evaluator
    #[must_use]
    pub fn variables(&self) -> IndexMap<&'static str, Value> {
        let mut vars = IndexMap::with_capacity(6);
        vars.insert("target", Value::Object(self.target.clone()));
        vars.insert("source", self.value.clone());
        vars.insert("fetched", self.fetched.clone());
        vars.insert("key", self.key.cloned().unwrap_or_default());
        vars.insert("src", self.source_field.map(Value::from).unwrap_or_default());
        vars.insert("ref", self.target_field.map(Value::from).unwrap_or_default());
        vars
    }
}

/// Pluggable expression language
pub trait ExpressionEvaluator: Send + Sync {
    /// Evaluate `expression` against `context`
    fn evaluate(&self, expression: &str, context: &ExpressionContext<'_>) -> Result<Value, ExpressionError>;
}

impl<F> ExpressionEvaluator for F
where
    F: Fn(&str, &ExpressionContext<'_>) -> Result<Value, ExpressionError> + Send + Sync,
{
    fn evaluate(&self, expression: &str, context: &ExpressionContext<'_>) -> Result<Value, ExpressionError> {
        self(expression, context)
    }
}

/// Hook that may replace a value right before it is written
pub trait SourceWriteInterceptor: Send + Sync + fmt::Debug {
    /// Check if the hook applies to `mapping`
    fn supports(&self, mapping: &PropertyMapping) -> bool;

    /// Produce the value to write
    fn intercept(&self, mapping: &PropertyMapping, context: &ExpressionContext<'_>) -> Result<Value, ExpressionError>;
}

/// Interceptor evaluating mapping expressions
pub struct ExpressionInterceptor<E> {
    evaluator: E,
}

impl<E: ExpressionEvaluator> ExpressionInterceptor<E> {
    /// Create interceptor over an evaluator
    #[must_use]
    pub fn new(evaluator: E) -> Self {
        Self { evaluator }
    }
}

impl<E> fmt::Debug for ExpressionInterceptor<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExpressionInterceptor").finish_non_exhaustive()
    }
}

impl<E: ExpressionEvaluator> SourceWriteInterceptor for ExpressionInterceptor<E> {
    fn supports(&self, mapping: &PropertyMapping) -> bool {
        mapping.expression().is_some()
    }

    fn intercept(&self, mapping: &PropertyMapping, context: &ExpressionContext<'_>) -> Result<Value, ExpressionError> {
        match mapping.expression() {
            Some(expression) => self.evaluator.evaluate(expression, context),
            None => Ok(context.value.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn upper(expression: &str, ctx: &ExpressionContext<'_>) -> Result<Value, ExpressionError> {
        match expression {
            "upper" => ctx
                .value
                .as_str()
                .map(|s| Value::from(s.to_uppercase()))
                .ok_or_else(|| ExpressionError::new(expression, "source is not a string")),
            _ => Err(ExpressionError::new(expression, "unknown expression")),
        }
    }

    #[test]
    fn supports_only_mappings_with_expression() {
        let interceptor = ExpressionInterceptor::new(upper);
        assert!(interceptor.supports(&PropertyMapping::new("a", "b").with_expression("upper")));
        assert!(!interceptor.supports(&PropertyMapping::new("a", "b")));
        assert!(!interceptor.supports(&PropertyMapping::new("a", "b").with_expression("  ")));
    }

    #[test]
    fn evaluates_against_context() {
        let interceptor = ExpressionInterceptor::new(upper);
        let target = ObjectRef::new("Member").with("id", 1);
        let value = Value::from("tom");
        let key = Value::from(1);
        let ctx = ExpressionContext {
            target: &target,
            fetched: &Value::Null,
            value: &value,
            key: Some(&key),
            source_field: Some("name"),
            target_field: Some("studentName"),
        };

        let mapping = PropertyMapping::new("studentName", "name").with_expression("upper");
        assert_eq!(interceptor.intercept(&mapping, &ctx), Ok(Value::from("TOM")));

        let broken = PropertyMapping::new("studentName", "name").with_expression("lower");
        assert!(interceptor.intercept(&broken, &ctx).is_err());
    }

    #[test]
    fn variables_follow_contract() {
        let target = ObjectRef::new("Member");
        let fetched = Value::tree(json!({"name": "tom", "age": 17}));
        let value = Value::from("tom");
        let ctx = ExpressionContext {
            target: &target,
            fetched: &fetched,
            value: &value,
            key: None,
            source_field: Some("name"),
            target_field: None,
        };

        let vars = ctx.variables();
        assert_eq!(vars.keys().copied().collect::<Vec<_>>(), vec!["target", "source", "fetched", "key", "src", "ref"]);
        assert_eq!(vars["fetched"].to_json(), json!({"name": "tom", "age": 17}));
        assert_eq!(vars["src"].to_json(), json!("name"));
        assert!(vars["key"].is_null());
        assert!(vars["ref"].is_null());
    }
}
