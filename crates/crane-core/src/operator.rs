//! Assemblers and disassemblers
//!
//! - [`Assembler`]: reads the key off an object and copies fetched data onto it
//! - [`Disassembler`]: expands a nested field into child objects

use crate::descriptor::PropertyMapping;
use crate::error::{EnrichError, EnrichResult};
use crate::handler::HandlerChain;
use crate::interceptor::{ExpressionContext, SourceWriteInterceptor};
use crate::operation::{AssembleOperation, ConfigId, DisassembleOperation};
use crate::value::{ObjectRef, Value};
use std::fmt;
use std::sync::Arc;

/// Applies fetched data to objects
pub trait Assembler: Send + Sync + fmt::Debug {
    /// Read the key for `operation` off `target`
    ///
    /// # Errors
    ///
    /// Returns [`EnrichError::TypeMismatch`] when `target` is not of the
    /// operation's owner type.
    fn get_key(&self, target: &ObjectRef, operation: &AssembleOperation) -> EnrichResult<Option<Value>>;

    /// Copy data out of `source` onto `target` per the operation's mappings
    ///
    /// # Errors
    ///
    /// Returns [`EnrichError::TypeMismatch`] when `target` is not of the
    /// operation's owner type.
    fn execute(&self, target: &ObjectRef, source: &Value, operation: &AssembleOperation) -> EnrichResult<()>;
}

/// Expands nested objects
pub trait Disassembler: Send + Sync + fmt::Debug {
    /// Child objects held by `operation`'s field on `target`
    fn expand(&self, target: &ObjectRef, operation: &DisassembleOperation) -> Vec<(ObjectRef, ConfigId)>;
}

/// Default assembler reading and writing through a [`HandlerChain`]
#[derive(Debug, Clone)]
pub struct HandlerChainAssembler {
    chain: Arc<HandlerChain>,
    interceptor: Option<Arc<dyn SourceWriteInterceptor>>,
}

impl Default for HandlerChainAssembler {
    fn default() -> Self {
        Self::new(Arc::new(HandlerChain::with_defaults()))
    }
}

impl HandlerChainAssembler {
    /// Create assembler over a chain
    #[must_use]
    pub fn new(chain: Arc<HandlerChain>) -> Self {
        Self {
            chain,
            interceptor: None,
        }
    }

    /// Attach a write interceptor
    #[must_use]
    pub fn with_interceptor(mut self, interceptor: Arc<dyn SourceWriteInterceptor>) -> Self {
        self.interceptor = Some(interceptor);
        self
    }

    /// Handler chain in use
    #[inline]
    #[must_use]
    pub fn chain(&self) -> &HandlerChain {
        &self.chain
    }

    fn check_type(target: &ObjectRef, operation: &AssembleOperation) -> EnrichResult<()> {
        if target.is_instance_of(operation.owner()) {
            Ok(())
        } else {
            Err(EnrichError::type_mismatch(
                operation.owner(),
                target.type_name(),
                operation.field(),
            ))
        }
    }

    fn read_key(target: &ObjectRef, operation: &AssembleOperation) -> Option<Value> {
        if target.has_field(operation.field()) {
            return target.get(operation.field());
        }
        operation
            .aliases()
            .iter()
            .find(|alias| target.has_field(alias))
            .and_then(|alias| target.get(alias))
    }

    fn apply(
        &self,
        target: &ObjectRef,
        source: &Value,
        key: Option<&Value>,
        mapping: &PropertyMapping,
        operation: &AssembleOperation,
    ) -> usize {
        let source_field = mapping.source_field();
        let Some(value) = self.chain.read(source, source_field) else {
            return 0;
        };

        let value = match &self.interceptor {
            Some(interceptor) if interceptor.supports(mapping) => {
                let context = ExpressionContext {
                    target,
                    fetched: source,
                    value: &value,
                    key,
                    source_field,
                    target_field: mapping.target_field(),
                };
                match interceptor.intercept(mapping, &context) {
                    Ok(value) => value,
                    Err(e) => {
                        tracing::warn!(
                            owner = %operation.owner(),
                            field = operation.field(),
                            error = %e,
                            "expression failed, mapping skipped"
                        );
                        return 0;
                    }
                }
            }
            _ => value,
        };

        let target_field = mapping.target_field().unwrap_or(operation.field());
        self.chain
            .write(&value, &Value::Object(target.clone()), target_field)
    }
}

impl Assembler for HandlerChainAssembler {
    fn get_key(&self, target: &ObjectRef, operation: &AssembleOperation) -> EnrichResult<Option<Value>> {
        Self::check_type(target, operation)?;
        Ok(Self::read_key(target, operation).filter(|key| !key.is_null()))
    }

    fn execute(&self, target: &ObjectRef, source: &Value, operation: &AssembleOperation) -> EnrichResult<()> {
        Self::check_type(target, operation)?;
        if source.is_null() {
            return Ok(());
        }
        let key = Self::read_key(target, operation);

        if operation.mappings().is_empty() {
            self.apply(target, source, key.as_ref(), &PropertyMapping::default(), operation);
        } else {
            for mapping in operation.mappings() {
                self.apply(target, source, key.as_ref(), mapping, operation);
            }
        }
        Ok(())
    }
}

/// Default disassembler expanding object, list and array fields
#[derive(Debug, Clone, Copy, Default)]
pub struct FieldDisassembler;

impl FieldDisassembler {
    fn collect(value: &Value, child: ConfigId, out: &mut Vec<(ObjectRef, ConfigId)>) {
        match value {
            Value::Object(object) => out.push((object.clone(), child)),
            Value::List(items) => items.iter().for_each(|item| Self::collect(item, child, out)),
            Value::Array(items) => items.iter().for_each(|item| Self::collect(item, child, out)),
            Value::Null | Value::Scalar(_) | Value::Tree(_) => {}
        }
    }
}

impl Disassembler for FieldDisassembler {
    fn expand(&self, target: &ObjectRef, operation: &DisassembleOperation) -> Vec<(ObjectRef, ConfigId)> {
        let value = if target.has_field(operation.field()) {
            target.get(operation.field())
        } else {
            operation
                .aliases()
                .iter()
                .find(|alias| target.has_field(alias))
                .and_then(|alias| target.get(alias))
        };
        let mut children = Vec::new();
        if let Some(value) = value {
            Self::collect(&value, operation.child(), &mut children);
        }
        children
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::{ContainerId, KeyValueContainer};
    use crate::error::ExpressionError;
    use crate::interceptor::ExpressionInterceptor;
    use crate::value::TypeName;
    use serde_json::json;

    fn operation(mappings: Vec<PropertyMapping>, assembler: Arc<dyn Assembler>) -> AssembleOperation {
        AssembleOperation {
            owner: TypeName::from("Student"),
            field: "studentId".to_string(),
            aliases: vec!["sid".to_string()],
            namespace: "student".to_string(),
            container_id: ContainerId::new(0),
            container: Arc::new(KeyValueContainer::new()),
            assembler,
            mappings,
            priority: 0,
        }
    }

    fn members_operation(aliases: Vec<String>) -> DisassembleOperation {
        DisassembleOperation {
            owner: TypeName::from("Classroom"),
            field: "members".to_string(),
            child: ConfigId::new(1),
            child_type: TypeName::from("Member"),
            aliases,
            disassembler: Arc::new(FieldDisassembler),
            priority: 0,
        }
    }

    fn tom() -> Value {
        Value::tree(json!({"name": "Tom", "age": 17}))
    }

    #[test]
    fn copies_mapped_fields() {
        let assembler = Arc::new(HandlerChainAssembler::default());
        let op = operation(
            vec![PropertyMapping::new("studentName", "name"), PropertyMapping::new("studentAge", "age")],
            assembler.clone(),
        );
        let student = ObjectRef::new("Student").with("studentId", "1");

        assembler.execute(&student, &tom(), &op).unwrap();

        assert_eq!(student.get("studentName"), Some(Value::from("Tom")));
        assert_eq!(student.get("studentAge"), Some(Value::from(17)));
    }

    #[test]
    fn empty_mapping_writes_whole_source_onto_key_field() {
        let assembler = Arc::new(HandlerChainAssembler::default());
        let op = operation(Vec::new(), assembler.clone());
        let student = ObjectRef::new("Student").with("studentId", "1");

        assembler.execute(&student, &Value::from("Tom"), &op).unwrap();

        assert_eq!(student.get("studentId"), Some(Value::from("Tom")));
    }

    #[test]
    fn missing_source_field_skips_only_that_mapping() {
        let assembler = Arc::new(HandlerChainAssembler::default());
        let op = operation(
            vec![PropertyMapping::new("nickname", "nick"), PropertyMapping::new("studentName", "name")],
            assembler.clone(),
        );
        let student = ObjectRef::new("Student").with("studentId", "1");

        assembler.execute(&student, &tom(), &op).unwrap();

        assert!(!student.has_field("nickname"));
        assert_eq!(student.get("studentName"), Some(Value::from("Tom")));
    }

    #[test]
    fn key_falls_back_to_alias() {
        let assembler = Arc::new(HandlerChainAssembler::default());
        let op = operation(Vec::new(), assembler.clone());

        let aliased = ObjectRef::new("Student").with("sid", 7);
        assert_eq!(assembler.get_key(&aliased, &op).unwrap(), Some(Value::from(7)));

        let unset = ObjectRef::new("Student").with("studentId", Value::Null).with("sid", 7);
        assert_eq!(assembler.get_key(&unset, &op).unwrap(), None);
    }

    #[test]
    fn wrong_type_is_rejected() {
        let assembler = Arc::new(HandlerChainAssembler::default());
        let op = operation(Vec::new(), assembler.clone());
        let teacher = ObjectRef::new("Teacher").with("studentId", "1");

        let err = assembler.get_key(&teacher, &op).unwrap_err();
        assert!(matches!(err, EnrichError::TypeMismatch { .. }));
        assert!(assembler.execute(&teacher, &tom(), &op).is_err());
    }

    #[test]
    fn failing_expression_skips_mapping() {
        fn evaluator(expression: &str, _: &ExpressionContext<'_>) -> Result<Value, ExpressionError> {
            Err(ExpressionError::new(expression, "boom"))
        }
        let assembler = Arc::new(
            HandlerChainAssembler::default().with_interceptor(Arc::new(ExpressionInterceptor::new(evaluator))),
        );
        let op = operation(
            vec![
                PropertyMapping::new("studentName", "name").with_expression("#source"),
                PropertyMapping::new("studentAge", "age"),
            ],
            assembler.clone(),
        );
        let student = ObjectRef::new("Student").with("studentId", "1");

        assembler.execute(&student, &tom(), &op).unwrap();

        assert!(!student.has_field("studentName"));
        assert_eq!(student.get("studentAge"), Some(Value::from(17)));
    }

    #[test]
    fn expression_sees_key_and_fields() {
        fn evaluator(_: &str, ctx: &ExpressionContext<'_>) -> Result<Value, ExpressionError> {
            let vars = ctx.variables();
            Ok(Value::from(format!(
                "{}:{}:{}",
                vars["key"].to_json(),
                vars["src"].as_str().unwrap_or_default(),
                vars["source"].as_str().unwrap_or_default()
            )))
        }
        let assembler = Arc::new(
            HandlerChainAssembler::default().with_interceptor(Arc::new(ExpressionInterceptor::new(evaluator))),
        );
        let op = operation(
            vec![PropertyMapping::new("label", "name").with_expression("label")],
            assembler.clone(),
        );
        let student = ObjectRef::new("Student").with("studentId", "1");

        assembler.execute(&student, &tom(), &op).unwrap();

        assert_eq!(student.get("label"), Some(Value::from("\"1\":name:Tom")));
    }

    #[test]
    fn disassembler_flattens_nested_shapes() {
        let a = ObjectRef::new("Member");
        let b = ObjectRef::new("Member");
        let c = ObjectRef::new("Member");
        let classroom = ObjectRef::new("Classroom").with(
            "members",
            Value::list([Value::from(a.clone()), Value::Null, Value::array([b.clone(), c.clone()])]),
        );
        let op = members_operation(Vec::new());

        let children = FieldDisassembler.expand(&classroom, &op);

        assert_eq!(children.len(), 3);
        assert!(children[0].0.ptr_eq(&a));
        assert!(children[2].0.ptr_eq(&c));
        assert!(children.iter().all(|(_, id)| *id == ConfigId::new(1)));
    }

    #[test]
    fn disassembler_ignores_trees_and_missing_fields() {
        let op = members_operation(Vec::new());

        assert!(FieldDisassembler.expand(&ObjectRef::new("Classroom"), &op).is_empty());
        let tree = ObjectRef::new("Classroom").with("members", Value::tree(json!([{"id": 1}])));
        assert!(FieldDisassembler.expand(&tree, &op).is_empty());
    }

    #[test]
    fn disassembler_falls_back_to_first_present_alias() {
        let op = members_operation(vec!["people".to_string(), "crew".to_string()]);
        let first = ObjectRef::new("Member");
        let second = ObjectRef::new("Member");
        let classroom = ObjectRef::new("Classroom")
            .with("crew", Value::list([second.clone()]))
            .with("people", Value::list([first.clone()]));

        let children = FieldDisassembler.expand(&classroom, &op);
        assert_eq!(children.len(), 1);
        assert!(children[0].0.ptr_eq(&first));

        let declared = ObjectRef::new("Member");
        classroom.set("members", Value::list([declared.clone()]));
        let children = FieldDisassembler.expand(&classroom, &op);
        assert_eq!(children.len(), 1);
        assert!(children[0].0.ptr_eq(&declared));
    }
}
