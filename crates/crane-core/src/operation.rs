//! Resolved operations
//!
//! The resolver turns descriptors into an [`OperationPlan`]: an arena of
//! [`OperationConfiguration`]s addressed by [`ConfigId`]. Disassemble
//! operations refer to the nested type's configuration by id, which lets a
//! configuration point back at an ancestor (or itself) on cyclic type graphs
//! without aliasing mutable structures.

use crate::container::{Container, ContainerId};
use crate::descriptor::PropertyMapping;
use crate::operator::{Assembler, Disassembler};
use crate::value::TypeName;
use std::fmt;
use std::sync::Arc;

/// Priority of operations that declare none
pub const DEFAULT_PRIORITY: i32 = i32::MAX;

/// Handle to a configuration inside an [`OperationPlan`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConfigId(usize);

impl ConfigId {
    #[inline]
    pub(crate) fn new(index: usize) -> Self {
        Self(index)
    }

    /// Arena index
    #[inline]
    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for ConfigId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Fetch-by-key instruction attached to a key-bearing field
#[derive(Debug, Clone)]
pub struct AssembleOperation {
    pub(crate) owner: TypeName,
    pub(crate) field: String,
    pub(crate) aliases: Vec<String>,
    pub(crate) namespace: String,
    pub(crate) container_id: ContainerId,
    pub(crate) container: Arc<dyn Container>,
    pub(crate) assembler: Arc<dyn Assembler>,
    pub(crate) mappings: Vec<PropertyMapping>,
    pub(crate) priority: i32,
}

impl AssembleOperation {
    /// Type the operation was resolved for
    #[inline]
    #[must_use]
    pub fn owner(&self) -> &TypeName {
        &self.owner
    }

    /// Key-bearing field
    #[inline]
    #[must_use]
    pub fn field(&self) -> &str {
        &self.field
    }

    /// Fallback key fields
    #[inline]
    #[must_use]
    pub fn aliases(&self) -> &[String] {
        &self.aliases
    }

    /// Namespace of the container data
    #[inline]
    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Registry id of the bound container
    #[inline]
    #[must_use]
    pub fn container_id(&self) -> ContainerId {
        self.container_id
    }

    /// Bound container
    #[inline]
    #[must_use]
    pub fn container(&self) -> &Arc<dyn Container> {
        &self.container
    }

    /// Assembler executing this operation
    #[inline]
    #[must_use]
    pub fn assembler(&self) -> &dyn Assembler {
        self.assembler.as_ref()
    }

    /// Property mappings
    #[inline]
    #[must_use]
    pub fn mappings(&self) -> &[PropertyMapping] {
        &self.mappings
    }

    /// Sort priority
    #[inline]
    #[must_use]
    pub fn priority(&self) -> i32 {
        self.priority
    }
}

/// Expansion instruction attached to a nested field
#[derive(Debug, Clone)]
pub struct DisassembleOperation {
    pub(crate) owner: TypeName,
    pub(crate) field: String,
    pub(crate) child: ConfigId,
    pub(crate) child_type: TypeName,
    pub(crate) aliases: Vec<String>,
    pub(crate) disassembler: Arc<dyn Disassembler>,
    pub(crate) priority: i32,
}

impl DisassembleOperation {
    /// Type the operation was resolved for
    #[inline]
    #[must_use]
    pub fn owner(&self) -> &TypeName {
        &self.owner
    }

    /// Nested field
    #[inline]
    #[must_use]
    pub fn field(&self) -> &str {
        &self.field
    }

    /// Configuration of the nested objects
    #[inline]
    #[must_use]
    pub fn child(&self) -> ConfigId {
        self.child
    }

    /// Declared type of the nested objects
    #[inline]
    #[must_use]
    pub fn child_type(&self) -> &TypeName {
        &self.child_type
    }

    /// Fallback nested fields
    #[inline]
    #[must_use]
    pub fn aliases(&self) -> &[String] {
        &self.aliases
    }

    /// Disassembler executing this operation
    #[inline]
    #[must_use]
    pub fn disassembler(&self) -> &dyn Disassembler {
        self.disassembler.as_ref()
    }

    /// Sort priority
    #[inline]
    #[must_use]
    pub fn priority(&self) -> i32 {
        self.priority
    }
}

/// All resolved operations for one type
#[derive(Debug, Clone)]
pub struct OperationConfiguration {
    pub(crate) id: ConfigId,
    pub(crate) target_type: TypeName,
    pub(crate) assemble_operations: Vec<AssembleOperation>,
    pub(crate) disassemble_operations: Vec<DisassembleOperation>,
}

impl OperationConfiguration {
    /// Arena handle
    #[inline]
    #[must_use]
    pub fn id(&self) -> ConfigId {
        self.id
    }

    /// Type this configuration applies to
    #[inline]
    #[must_use]
    pub fn target_type(&self) -> &TypeName {
        &self.target_type
    }

    /// Assemble operations, priority ascending
    #[inline]
    #[must_use]
    pub fn assemble_operations(&self) -> &[AssembleOperation] {
        &self.assemble_operations
    }

    /// Disassemble operations, priority ascending
    #[inline]
    #[must_use]
    pub fn disassemble_operations(&self) -> &[DisassembleOperation] {
        &self.disassemble_operations
    }

    /// Check if the configuration has nothing to do
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.assemble_operations.is_empty() && self.disassemble_operations.is_empty()
    }
}

/// Arena of configurations reachable from a root type
#[derive(Debug, Clone)]
pub struct OperationPlan {
    configurations: Vec<OperationConfiguration>,
    root: ConfigId,
}

impl OperationPlan {
    pub(crate) fn new(configurations: Vec<OperationConfiguration>, root: ConfigId) -> Self {
        Self {
            configurations,
            root,
        }
    }

    /// Root configuration handle
    #[inline]
    #[must_use]
    pub fn root(&self) -> ConfigId {
        self.root
    }

    /// Root configuration
    #[must_use]
    pub fn root_configuration(&self) -> Option<&OperationConfiguration> {
        self.get(self.root)
    }

    /// Configuration by handle
    #[inline]
    #[must_use]
    pub fn get(&self, id: ConfigId) -> Option<&OperationConfiguration> {
        self.configurations.get(id.0)
    }

    /// Configuration by type
    #[must_use]
    pub fn configuration_for(&self, type_name: &str) -> Option<&OperationConfiguration> {
        self.configurations
            .iter()
            .find(|c| c.target_type.as_str() == type_name)
    }

    /// Number of distinct configurations
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.configurations.len()
    }

    /// Check if plan is empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.configurations.is_empty()
    }

    /// Iterate configurations in resolution order
    pub fn iter(&self) -> impl Iterator<Item = &OperationConfiguration> {
        self.configurations.iter()
    }
}
