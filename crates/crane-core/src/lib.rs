//! Crane Core
//!
//! Declarative, batched enrichment of object graphs. Types declare which
//! fields hold foreign keys (assemble) and which fields hold nested objects
//! (disassemble); Crane walks a batch of root objects, groups everything it
//! finds by type and namespace, fetches each namespace once and writes the
//! results back in place.
//!
//! # Architecture
//!
//! ```text
//! DescriptorSet → ConfigurationResolver → OperationPlan
//!                                              ↓
//! roots → OperationExecutor (disassembly) → groups per configuration
//!                                              ↓
//!              Container::process (one fetch per namespace)
//!                                              ↓
//!              Assembler → HandlerChain → mutated objects
//! ```
//!
//! # Example
//!
//! ```rust
//! use crane_core::prelude::*;
//! use std::sync::Arc;
//!
//! let students = Arc::new(KeyValueContainer::new());
//! students.register("student", [(1, serde_json::json!({"name": "Tom"}))]);
//!
//! let crane = Crane::builder()
//!     .type_descriptor(TypeDescriptor::new("Enrollment").assemble(
//!         "studentId",
//!         AssembleDescriptor::new("student").prop(PropertyMapping::new("studentName", "name")),
//!     ))
//!     .container("student", students)?
//!     .build();
//!
//! let enrollment = ObjectRef::new("Enrollment").with("studentId", "1");
//! crane.enrich(&[enrollment.clone()], "Enrollment")?;
//!
//! assert_eq!(enrollment.get("studentName"), Some(Value::from("Tom")));
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod accessor;
pub mod config;
pub mod container;
pub mod crane;
pub mod descriptor;
pub mod error;
pub mod executor;
pub mod handler;
pub mod interceptor;
pub mod operation;
pub mod operator;
pub mod resolver;
pub mod value;

pub use config::CraneConfig;
pub use container::{
    Container, ContainerId, ContainerRegistry, FetchFailure, KeySource, KeyValueContainer, KeyedContainer,
    MethodSource, ProcessOutcome,
};
pub use crane::{Crane, CraneBuilder};
pub use descriptor::{
    AssembleDescriptor, DescriptorSet, DisassembleDescriptor, FieldDescriptor, PropertyMapping, TypeDescriptor,
};
pub use error::{ConfigError, ConfigResult, EnrichError, EnrichResult, ExpressionError, FetchError};
pub use executor::{EnrichReport, OperationExecutor};
pub use handler::{HandlerChain, ShapeHandler};
pub use interceptor::{ExpressionContext, ExpressionEvaluator, ExpressionInterceptor, SourceWriteInterceptor};
pub use operation::{AssembleOperation, ConfigId, DisassembleOperation, OperationConfiguration, OperationPlan};
pub use operator::{Assembler, Disassembler, FieldDisassembler, HandlerChainAssembler};
pub use resolver::ConfigurationResolver;
pub use value::{Key, ObjectRef, TreeRef, TypeName, Value};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for declaring types and running enrichment
    pub use crate::container::{ContainerRegistry, KeySource, KeyValueContainer, KeyedContainer, MethodSource};
    pub use crate::crane::{Crane, CraneBuilder};
    pub use crate::descriptor::{
        AssembleDescriptor, DescriptorSet, DisassembleDescriptor, PropertyMapping, TypeDescriptor,
    };
    pub use crate::error::{ConfigError, EnrichError, FetchError};
    pub use crate::executor::EnrichReport;
    pub use crate::value::{Key, ObjectRef, TypeName, Value};
    pub use crate::CraneConfig;
}
