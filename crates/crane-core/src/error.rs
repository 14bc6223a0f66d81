//! Error types for Crane
//!
//! Provides the error taxonomy for:
//! - Configuration resolution and container registration (fatal)
//! - Enrichment execution (fatal usage errors)
//! - Container fetches (recoverable, never propagated)
//! - Expression hooks (recoverable per property mapping)

use crate::value::TypeName;

/// Errors raised while building registries or resolving operation configurations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// A field declares both assemble and disassemble operations
    #[error("field '{field}' of type '{type_name}' cannot be both assembled and disassembled")]
    ConflictingOperations {
        /// Type declaring the field
        type_name: TypeName,
        /// Offending field
        field: String,
    },

    /// No container is bound to the namespace
    #[error("no container bound to namespace '{namespace}'")]
    ContainerNotFound {
        /// Requested namespace
        namespace: String,
    },

    /// Namespace was registered twice
    #[error("namespace '{namespace}' is already registered")]
    DuplicateNamespace {
        /// Duplicated namespace
        namespace: String,
    },

    /// Nested type has no descriptor
    #[error("no descriptor for type '{0}'")]
    UnknownType(TypeName),

    /// Property template is not defined
    #[error("no property template named '{template}'")]
    UnknownTemplate {
        /// Requested template name
        template: String,
    },

    /// Resolution finished with a configuration slot never populated
    #[error("configuration for type '{0}' was never completed")]
    IncompleteResolution(TypeName),

    /// Descriptor document could not be parsed
    #[error("invalid descriptor document: {0}")]
    InvalidDocument(String),

    /// Crane configuration could not be parsed
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl ConfigError {
    /// Create conflicting operations error
    pub fn conflicting(type_name: impl Into<TypeName>, field: impl Into<String>) -> Self {
        Self::ConflictingOperations {
            type_name: type_name.into(),
            field: field.into(),
        }
    }

    /// Create container not found error
    pub fn container_not_found(namespace: impl Into<String>) -> Self {
        Self::ContainerNotFound {
            namespace: namespace.into(),
        }
    }

    /// Create duplicate namespace error
    pub fn duplicate_namespace(namespace: impl Into<String>) -> Self {
        Self::DuplicateNamespace {
            namespace: namespace.into(),
        }
    }
}

/// Errors that abort an enrichment run
#[derive(Debug, thiserror::Error)]
pub enum EnrichError {
    /// Root type could not be resolved
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Operation applied to an object of another type
    #[error("operation on '{expected}.{field}' applied to object of type '{actual}'")]
    TypeMismatch {
        /// Type the operation was resolved for
        expected: TypeName,
        /// Type of the object handed to the operation
        actual: TypeName,
        /// Key field of the operation
        field: String,
    },
}

impl EnrichError {
    /// Create type mismatch error
    pub fn type_mismatch(
        expected: impl Into<TypeName>,
        actual: impl Into<TypeName>,
        field: impl Into<String>,
    ) -> Self {
        Self::TypeMismatch {
            expected: expected.into(),
            actual: actual.into(),
            field: field.into(),
        }
    }
}

/// Errors raised by a key source while fetching a batch
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    /// Fetch ran and failed
    #[error("fetch for namespace '{namespace}' failed: {reason}")]
    Failed {
        /// Namespace being fetched
        namespace: String,
        /// Failure description
        reason: String,
    },

    /// Backing source is unavailable
    #[error("source unavailable: {0}")]
    Unavailable(String),
}

impl FetchError {
    /// Create failed fetch error
    pub fn failed(namespace: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Failed {
            namespace: namespace.into(),
            reason: reason.into(),
        }
    }
}

/// Error raised by an expression hook
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("expression '{expression}' failed: {message}")]
pub struct ExpressionError {
    /// Expression being evaluated
    pub expression: String,
    /// Failure description
    pub message: String,
}

impl ExpressionError {
    /// Create expression error
    pub fn new(expression: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            expression: expression.into(),
            message: message.into(),
        }
    }
}

/// Result alias for configuration operations
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Result alias for enrichment operations
pub type EnrichResult<T> = Result<T, EnrichError>;
