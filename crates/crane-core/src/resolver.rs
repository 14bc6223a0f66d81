//! Configuration resolver
//!
//! Turns a [`DescriptorSet`] into an [`OperationPlan`] for a root type. The
//! walk is depth-first over disassemble fields and cycle-safe: every type gets
//! an arena slot and a memo entry *before* its fields are processed, so a
//! nested field pointing back at a type still in progress reuses that type's
//! [`ConfigId`] instead of recursing again.

use crate::container::ContainerRegistry;
use crate::descriptor::{AssembleDescriptor, DescriptorSet, PropertyMapping, TypeDescriptor};
use crate::error::{ConfigError, ConfigResult};
use crate::operation::{
    AssembleOperation, ConfigId, DisassembleOperation, OperationConfiguration, OperationPlan, DEFAULT_PRIORITY,
};
use crate::operator::{Assembler, Disassembler, FieldDisassembler, HandlerChainAssembler};
use crate::value::TypeName;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Transient state of one resolution run
#[derive(Debug, Default)]
struct ResolutionContext {
    slots: Vec<(TypeName, Option<OperationConfiguration>)>,
    memo: HashMap<TypeName, ConfigId>,
    in_progress: HashSet<TypeName>,
}

impl ResolutionContext {
    fn reserve(&mut self, type_name: &TypeName) -> ConfigId {
        let id = ConfigId::new(self.slots.len());
        self.slots.push((type_name.clone(), None));
        self.memo.insert(type_name.clone(), id);
        self.in_progress.insert(type_name.clone());
        id
    }

    fn complete(&mut self, configuration: OperationConfiguration) {
        self.in_progress.remove(&configuration.target_type);
        let index = configuration.id.index();
        self.slots[index].1 = Some(configuration);
    }

    fn finish(self, root: ConfigId) -> ConfigResult<OperationPlan> {
        let configurations = self
            .slots
            .into_iter()
            .map(|(type_name, slot)| slot.ok_or(ConfigError::IncompleteResolution(type_name)))
            .collect::<ConfigResult<Vec<_>>>()?;
        Ok(OperationPlan::new(configurations, root))
    }
}

/// Resolves descriptors into operation plans
#[derive(Debug, Clone)]
pub struct ConfigurationResolver {
    descriptors: Arc<DescriptorSet>,
    registry: Arc<ContainerRegistry>,
    assembler: Arc<dyn Assembler>,
    disassembler: Arc<dyn Disassembler>,
}

impl ConfigurationResolver {
    /// Create resolver with the default assembler and disassembler
    #[must_use]
    pub fn new(descriptors: Arc<DescriptorSet>, registry: Arc<ContainerRegistry>) -> Self {
        Self {
            descriptors,
            registry,
            assembler: Arc::new(HandlerChainAssembler::default()),
            disassembler: Arc::new(FieldDisassembler),
        }
    }

    /// Use a custom assembler for every assemble operation
    #[must_use]
    pub fn with_assembler(mut self, assembler: Arc<dyn Assembler>) -> Self {
        self.assembler = assembler;
        self
    }

    /// Use a custom disassembler for every disassemble operation
    #[must_use]
    pub fn with_disassembler(mut self, disassembler: Arc<dyn Disassembler>) -> Self {
        self.disassembler = disassembler;
        self
    }

    /// Descriptors consulted
    #[inline]
    #[must_use]
    pub fn descriptors(&self) -> &DescriptorSet {
        &self.descriptors
    }

    /// Resolve the plan for `root`
    ///
    /// A root type without a descriptor resolves to a single empty
    /// configuration.
    ///
    /// # Errors
    ///
    /// - [`ConfigError::ConflictingOperations`]: a field is both assembled and disassembled
    /// - [`ConfigError::ContainerNotFound`]: an assemble namespace is unbound
    /// - [`ConfigError::UnknownTemplate`]: a referenced property template is missing
    /// - [`ConfigError::UnknownType`]: a nested type has no descriptor
    pub fn resolve(&self, root: &TypeName) -> ConfigResult<OperationPlan> {
        let mut ctx = ResolutionContext::default();
        let root_id = match self.descriptors.get(root.as_str()) {
            Some(descriptor) => self.resolve_type(&mut ctx, descriptor)?,
            None => {
                tracing::debug!(type_name = %root, "root type has no descriptor");
                let id = ctx.reserve(root);
                ctx.complete(OperationConfiguration {
                    id,
                    target_type: root.clone(),
                    assemble_operations: Vec::new(),
                    disassemble_operations: Vec::new(),
                });
                id
            }
        };
        let plan = ctx.finish(root_id)?;
        tracing::debug!(root = %root, configurations = plan.len(), "resolved");
        Ok(plan)
    }

    fn resolve_nested(&self, ctx: &mut ResolutionContext, type_name: &TypeName) -> ConfigResult<ConfigId> {
        if let Some(&id) = ctx.memo.get(type_name) {
            if ctx.in_progress.contains(type_name) {
                tracing::debug!(type_name = %type_name, config = %id, "cycle, reusing configuration in progress");
            }
            return Ok(id);
        }
        let descriptor = self
            .descriptors
            .get(type_name.as_str())
            .ok_or_else(|| ConfigError::UnknownType(type_name.clone()))?;
        self.resolve_type(ctx, descriptor)
    }

    fn resolve_type(&self, ctx: &mut ResolutionContext, descriptor: &TypeDescriptor) -> ConfigResult<ConfigId> {
        let owner = &descriptor.name;
        let id = ctx.reserve(owner);
        tracing::debug!(type_name = %owner, config = %id, "resolving");

        let mut assemble_operations = Vec::new();
        let mut disassemble_operations = Vec::new();

        Self::check_conflicts(descriptor)?;
        for field in &descriptor.fields {
            for assemble in &field.assemble {
                assemble_operations.push(self.assemble_operation(owner, &field.name, assemble)?);
            }
            if let Some(disassemble) = &field.disassemble {
                let child = self.resolve_nested(ctx, &disassemble.target_type)?;
                disassemble_operations.push(DisassembleOperation {
                    owner: owner.clone(),
                    field: field.name.clone(),
                    child,
                    child_type: disassemble.target_type.clone(),
                    aliases: disassemble.aliases.clone(),
                    disassembler: Arc::clone(&self.disassembler),
                    priority: disassemble.priority.unwrap_or(DEFAULT_PRIORITY),
                });
            }
        }

        assemble_operations.sort_by_key(AssembleOperation::priority);
        disassemble_operations.sort_by_key(DisassembleOperation::priority);

        ctx.complete(OperationConfiguration {
            id,
            target_type: owner.clone(),
            assemble_operations,
            disassemble_operations,
        });
        Ok(id)
    }

    /// A field name may carry assemble or disassemble operations, never both,
    /// even when the name is declared by several field entries
    fn check_conflicts(descriptor: &TypeDescriptor) -> ConfigResult<()> {
        let mut assembled: HashSet<&str> = HashSet::new();
        let mut disassembled: HashSet<&str> = HashSet::new();
        for field in &descriptor.fields {
            let name = field.name.as_str();
            if !field.assemble.is_empty() {
                assembled.insert(name);
            }
            if field.disassemble.is_some() {
                disassembled.insert(name);
            }
            if assembled.contains(name) && disassembled.contains(name) {
                return Err(ConfigError::conflicting(&descriptor.name, name));
            }
        }
        Ok(())
    }

    fn assemble_operation(
        &self,
        owner: &TypeName,
        field: &str,
        descriptor: &AssembleDescriptor,
    ) -> ConfigResult<AssembleOperation> {
        let (container_id, container) = self.registry.lookup(&descriptor.namespace)?;

        let mut mappings: Vec<PropertyMapping> = descriptor.props.clone();
        for template in &descriptor.prop_templates {
            mappings.extend_from_slice(self.descriptors.template(template)?);
        }
        if let Some(expression) = descriptor.expression.as_deref().filter(|e| !e.trim().is_empty()) {
            for mapping in mappings.iter_mut().filter(|m| m.expression().is_none()) {
                mapping.expression = Some(expression.to_string());
            }
        }

        Ok(AssembleOperation {
            owner: owner.clone(),
            field: field.to_string(),
            aliases: descriptor.aliases.clone(),
            namespace: descriptor.namespace.clone(),
            container_id,
            container,
            assembler: Arc::clone(&self.assembler),
            mappings,
            priority: descriptor.priority.unwrap_or(DEFAULT_PRIORITY),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::KeyValueContainer;
    use crate::descriptor::{DisassembleDescriptor, FieldDescriptor};

    fn registry(namespaces: &[&str]) -> Arc<ContainerRegistry> {
        let mut registry = ContainerRegistry::new();
        for ns in namespaces {
            registry.bind(*ns, Arc::new(KeyValueContainer::new())).unwrap();
        }
        Arc::new(registry)
    }

    fn resolver(descriptors: DescriptorSet, namespaces: &[&str]) -> ConfigurationResolver {
        ConfigurationResolver::new(Arc::new(descriptors), registry(namespaces))
    }

    #[test]
    fn resolves_assemble_operations_in_priority_order() {
        let descriptors = DescriptorSet::new().with_type(
            TypeDescriptor::new("Student")
                .assemble("a", AssembleDescriptor::new("student"))
                .assemble("b", AssembleDescriptor::new("student").priority(5))
                .assemble("c", AssembleDescriptor::new("student").priority(1))
                .assemble("d", AssembleDescriptor::new("student").priority(5)),
        );

        let plan = resolver(descriptors, &["student"]).resolve(&"Student".into()).unwrap();
        let fields: Vec<&str> = plan
            .root_configuration()
            .unwrap()
            .assemble_operations()
            .iter()
            .map(AssembleOperation::field)
            .collect();

        assert_eq!(fields, vec!["c", "b", "d", "a"]);
    }

    #[test]
    fn self_reference_yields_one_configuration() {
        let descriptors = DescriptorSet::new().with_type(
            TypeDescriptor::new("Node").disassemble("children", DisassembleDescriptor::new("Node")),
        );

        let plan = resolver(descriptors, &[]).resolve(&"Node".into()).unwrap();

        assert_eq!(plan.len(), 1);
        let root = plan.root_configuration().unwrap();
        assert_eq!(root.disassemble_operations()[0].child(), root.id());
    }

    #[test]
    fn mutual_reference_points_back_at_ancestor() {
        let descriptors = DescriptorSet::new()
            .with_type(TypeDescriptor::new("A").disassemble("b", DisassembleDescriptor::new("B")))
            .with_type(TypeDescriptor::new("B").disassemble("a", DisassembleDescriptor::new("A")));

        let plan = resolver(descriptors, &[]).resolve(&"A".into()).unwrap();

        assert_eq!(plan.len(), 2);
        let b = plan.configuration_for("B").unwrap();
        assert_eq!(b.disassemble_operations()[0].child(), plan.root());
    }

    #[test]
    fn shared_nested_type_is_memoized() {
        let descriptors = DescriptorSet::new()
            .with_type(
                TypeDescriptor::new("Classroom")
                    .disassemble("teachers", DisassembleDescriptor::new("Member"))
                    .disassemble("students", DisassembleDescriptor::new("Member")),
            )
            .with_type(TypeDescriptor::new("Member"));

        let plan = resolver(descriptors, &[]).resolve(&"Classroom".into()).unwrap();

        assert_eq!(plan.len(), 2);
        let ops = plan.root_configuration().unwrap().disassemble_operations();
        assert_eq!(ops[0].child(), ops[1].child());
    }

    #[test]
    fn conflicting_field_is_rejected() {
        let descriptors = DescriptorSet::new().with_type(
            TypeDescriptor::new("Student")
                .assemble("x", AssembleDescriptor::new("student"))
                .disassemble("x", DisassembleDescriptor::new("Student")),
        );

        let err = resolver(descriptors, &["student"]).resolve(&"Student".into()).unwrap_err();
        assert_eq!(err, ConfigError::conflicting("Student", "x"));
    }

    #[test]
    fn conflict_split_across_field_entries_is_rejected() {
        let descriptor = TypeDescriptor {
            name: "Student".into(),
            fields: vec![
                FieldDescriptor {
                    name: "x".to_string(),
                    assemble: vec![AssembleDescriptor::new("student")],
                    disassemble: None,
                },
                FieldDescriptor {
                    name: "x".to_string(),
                    assemble: Vec::new(),
                    disassemble: Some(DisassembleDescriptor::new("Student")),
                },
            ],
        };

        let err = resolver(DescriptorSet::new().with_type(descriptor), &["student"])
            .resolve(&"Student".into())
            .unwrap_err();
        assert_eq!(err, ConfigError::conflicting("Student", "x"));
    }

    #[test]
    fn missing_container_is_rejected() {
        let descriptors = DescriptorSet::new()
            .with_type(TypeDescriptor::new("Student").assemble("id", AssembleDescriptor::new("student")));

        let err = resolver(descriptors, &[]).resolve(&"Student".into()).unwrap_err();
        assert_eq!(err, ConfigError::container_not_found("student"));
    }

    #[test]
    fn unknown_nested_type_is_rejected() {
        let descriptors = DescriptorSet::new()
            .with_type(TypeDescriptor::new("Classroom").disassemble("teachers", DisassembleDescriptor::new("Member")));

        let err = resolver(descriptors, &[]).resolve(&"Classroom".into()).unwrap_err();
        assert_eq!(err, ConfigError::UnknownType("Member".into()));
    }

    #[test]
    fn undeclared_root_resolves_empty() {
        let plan = resolver(DescriptorSet::new(), &[]).resolve(&"Loose".into()).unwrap();
        assert_eq!(plan.len(), 1);
        assert!(plan.root_configuration().unwrap().is_empty());
    }

    #[test]
    fn templates_and_default_expression_expand() {
        let descriptors = DescriptorSet::new()
            .with_template("basic", vec![PropertyMapping::new("memberName", "name")])
            .with_type(
                TypeDescriptor::new("Member").assemble(
                    "id",
                    AssembleDescriptor::new("member")
                        .prop(PropertyMapping::new("memberAge", "age").with_expression("own"))
                        .template("basic")
                        .expression("shared"),
                ),
            );

        let plan = resolver(descriptors, &["member"]).resolve(&"Member".into()).unwrap();
        let mappings = plan.root_configuration().unwrap().assemble_operations()[0].mappings();

        assert_eq!(mappings.len(), 2);
        assert_eq!(mappings[0].expression(), Some("own"));
        assert_eq!(mappings[1].target_field(), Some("memberName"));
        assert_eq!(mappings[1].expression(), Some("shared"));
    }

    #[test]
    fn unknown_template_is_rejected() {
        let descriptors = DescriptorSet::new().with_type(
            TypeDescriptor::new("Member").assemble("id", AssembleDescriptor::new("member").template("nope")),
        );

        let err = resolver(descriptors, &["member"]).resolve(&"Member".into()).unwrap_err();
        assert!(matches!(err, ConfigError::UnknownTemplate { template } if template == "nope"));
    }
}
