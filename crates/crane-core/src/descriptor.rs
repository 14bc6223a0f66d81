//! Type descriptors
//!
//! Declarative input to the resolver: for each type, an ordered list of field
//! descriptors saying which fields carry keys to assemble and which fields
//! hold nested objects to disassemble. Descriptors are built in code or loaded
//! from a JSON/YAML document:
//!
//! ```yaml
//! types:
//!   - name: Classroom
//!     fields:
//!       - name: id
//!         assemble:
//!           - namespace: student
//!             props: [{ source: name, target: studentNames }]
//!       - name: teachers
//!         disassemble: { type: Member }
//! templates:
//!   member_basic: [{ source: name, target: memberName }]
//! ```

use crate::error::{ConfigError, ConfigResult};
use crate::value::TypeName;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Mapping from a fetched source value onto the enriched object
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyMapping {
    /// Field to write on the target; `None` writes the key field itself
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,

    /// Field to read from the source; `None` uses the whole source value
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,

    /// Derivation expression evaluated by the configured interceptor
    #[serde(default, skip_serializing_if = "Option::is_none", alias = "exp")]
    pub expression: Option<String>,
}

impl PropertyMapping {
    /// Copy `source` field of the fetched value into `target`
    #[must_use]
    pub fn new(target: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            target: Some(target.into()),
            source: Some(source.into()),
            expression: None,
        }
    }

    /// Copy the whole fetched value into `target`
    #[must_use]
    pub fn whole(target: impl Into<String>) -> Self {
        Self {
            target: Some(target.into()),
            source: None,
            expression: None,
        }
    }

    /// Attach a derivation expression
    #[must_use]
    pub fn with_expression(mut self, expression: impl Into<String>) -> Self {
        self.expression = Some(expression.into());
        self
    }

    /// Configured source field, treating blank names as absent
    #[must_use]
    pub fn source_field(&self) -> Option<&str> {
        non_blank(self.source.as_deref())
    }

    /// Configured target field, treating blank names as absent
    #[must_use]
    pub fn target_field(&self) -> Option<&str> {
        non_blank(self.target.as_deref())
    }

    /// Configured expression, treating blank text as absent
    #[must_use]
    pub fn expression(&self) -> Option<&str> {
        non_blank(self.expression.as_deref())
    }
}

fn non_blank(s: Option<&str>) -> Option<&str> {
    s.filter(|s| !s.trim().is_empty())
}

/// Assemble declaration on a key-bearing field
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssembleDescriptor {
    /// Namespace of the container data
    pub namespace: String,

    /// Sort priority; lower runs first, absent runs last
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<i32>,

    /// Property mappings
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub props: Vec<PropertyMapping>,

    /// Names of property templates appended after `props`
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub prop_templates: Vec<String>,

    /// Fallback key fields when the record lacks the declared field
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub aliases: Vec<String>,

    /// Expression applied to mappings that declare none
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expression: Option<String>,
}

impl AssembleDescriptor {
    /// Create descriptor for namespace
    #[must_use]
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            ..Self::default()
        }
    }

    /// Add property mapping
    #[must_use]
    pub fn prop(mut self, mapping: PropertyMapping) -> Self {
        self.props.push(mapping);
        self
    }

    /// Set priority
    #[must_use]
    pub fn priority(mut self, priority: i32) -> Self {
        self.priority = Some(priority);
        self
    }

    /// Reference property template
    #[must_use]
    pub fn template(mut self, name: impl Into<String>) -> Self {
        self.prop_templates.push(name.into());
        self
    }

    /// Add key field alias
    #[must_use]
    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.aliases.push(alias.into());
        self
    }

    /// Set default expression
    #[must_use]
    pub fn expression(mut self, expression: impl Into<String>) -> Self {
        self.expression = Some(expression.into());
        self
    }
}

/// Disassemble declaration on a nested field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisassembleDescriptor {
    /// Declared type of the nested objects
    #[serde(rename = "type")]
    pub target_type: TypeName,

    /// Sort priority; lower runs first, absent runs last
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<i32>,

    /// Fallback nested fields when the record lacks the declared field
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub aliases: Vec<String>,
}

impl DisassembleDescriptor {
    /// Create descriptor for nested type
    #[must_use]
    pub fn new(target_type: impl Into<TypeName>) -> Self {
        Self {
            target_type: target_type.into(),
            priority: None,
            aliases: Vec::new(),
        }
    }

    /// Set priority
    #[must_use]
    pub fn priority(mut self, priority: i32) -> Self {
        self.priority = Some(priority);
        self
    }

    /// Add nested field alias
    #[must_use]
    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.aliases.push(alias.into());
        self
    }
}

/// Declarations on one field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDescriptor {
    /// Field name
    pub name: String,

    /// Assemble declarations
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub assemble: Vec<AssembleDescriptor>,

    /// Disassemble declaration
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disassemble: Option<DisassembleDescriptor>,
}

/// Declarations for one type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeDescriptor {
    /// Type identity
    pub name: TypeName,

    /// Fields in declaration order
    #[serde(default)]
    pub fields: Vec<FieldDescriptor>,
}

impl TypeDescriptor {
    /// Create descriptor without fields
    #[must_use]
    pub fn new(name: impl Into<TypeName>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
        }
    }

    /// Declare an assemble operation on `field`
    ///
    /// Repeated calls for the same field accumulate operations on it.
    #[must_use]
    pub fn assemble(mut self, field: &str, descriptor: AssembleDescriptor) -> Self {
        self.field_mut(field).assemble.push(descriptor);
        self
    }

    /// Declare a disassemble operation on `field`
    #[must_use]
    pub fn disassemble(mut self, field: &str, descriptor: DisassembleDescriptor) -> Self {
        self.field_mut(field).disassemble = Some(descriptor);
        self
    }

    /// Look up field descriptor
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.name == name)
    }

    fn field_mut(&mut self, name: &str) -> &mut FieldDescriptor {
        let index = match self.fields.iter().position(|f| f.name == name) {
            Some(index) => index,
            None => {
                self.fields.push(FieldDescriptor {
                    name: name.to_string(),
                    assemble: Vec::new(),
                    disassemble: None,
                });
                self.fields.len() - 1
            }
        };
        &mut self.fields[index]
    }
}

/// Serialized form of a [`DescriptorSet`]
#[derive(Debug, Default, Serialize, Deserialize)]
struct DescriptorDocument {
    #[serde(default)]
    types: Vec<TypeDescriptor>,
    #[serde(default)]
    templates: IndexMap<String, Vec<PropertyMapping>>,
}

/// Catalog of type descriptors and property templates
#[derive(Debug, Clone, Default)]
pub struct DescriptorSet {
    types: IndexMap<TypeName, TypeDescriptor>,
    templates: IndexMap<String, Vec<PropertyMapping>>,
}

impl DescriptorSet {
    /// Create empty catalog
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a type descriptor
    pub fn insert(&mut self, descriptor: TypeDescriptor) {
        self.types.insert(descriptor.name.clone(), descriptor);
    }

    /// Add a type descriptor while building
    #[must_use]
    pub fn with_type(mut self, descriptor: TypeDescriptor) -> Self {
        self.insert(descriptor);
        self
    }

    /// Add or replace a property template
    pub fn insert_template(&mut self, name: impl Into<String>, mappings: Vec<PropertyMapping>) {
        self.templates.insert(name.into(), mappings);
    }

    /// Add a property template while building
    #[must_use]
    pub fn with_template(mut self, name: impl Into<String>, mappings: Vec<PropertyMapping>) -> Self {
        self.insert_template(name, mappings);
        self
    }

    /// Look up type descriptor
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&TypeDescriptor> {
        self.types.get(name)
    }

    /// Look up property template
    ///
    /// # Errors
    /// Returns [`ConfigError::UnknownTemplate`] if no template has this name
    pub fn template(&self, name: &str) -> ConfigResult<&[PropertyMapping]> {
        self.templates
            .get(name)
            .map(Vec::as_slice)
            .ok_or_else(|| ConfigError::UnknownTemplate {
                template: name.to_string(),
            })
    }

    /// Check whether a type is described
    #[inline]
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.types.contains_key(name)
    }

    /// Number of described types
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// Check if catalog is empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Iterate type descriptors in insertion order
    pub fn iter(&self) -> impl Iterator<Item = &TypeDescriptor> {
        self.types.values()
    }

    /// Load catalog from JSON
    ///
    /// # Errors
    /// Returns [`ConfigError::InvalidDocument`] if the document does not parse
    pub fn from_json_str(json: &str) -> ConfigResult<Self> {
        let document: DescriptorDocument = serde_json::from_str(json)
            .map_err(|e| ConfigError::InvalidDocument(e.to_string()))?;
        Ok(Self::from_document(document))
    }

    /// Load catalog from YAML
    ///
    /// # Errors
    /// Returns [`ConfigError::InvalidDocument`] if the document does not parse
    pub fn from_yaml_str(yaml: &str) -> ConfigResult<Self> {
        let document: DescriptorDocument = serde_yaml::from_str(yaml)
            .map_err(|e| ConfigError::InvalidDocument(e.to_string()))?;
        Ok(Self::from_document(document))
    }

    /// Render catalog as JSON
    ///
    /// # Errors
    /// Returns [`ConfigError::InvalidDocument`] if serialization fails
    pub fn to_json_string(&self) -> ConfigResult<String> {
        let document = DescriptorDocument {
            types: self.types.values().cloned().collect(),
            templates: self.templates.clone(),
        };
        serde_json::to_string_pretty(&document).map_err(|e| ConfigError::InvalidDocument(e.to_string()))
    }

    fn from_document(document: DescriptorDocument) -> Self {
        let mut set = Self::new();
        for descriptor in document.types {
            set.insert(descriptor);
        }
        set.templates = document.templates;
        set
    }
}
