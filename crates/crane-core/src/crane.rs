//! Crane facade
//!
//! Ties the pieces together: descriptors and container bindings go into a
//! [`CraneBuilder`], which produces a [`Crane`] that resolves plans on demand,
//! caches them per root type and runs them over batches of objects.

use crate::config::CraneConfig;
use crate::container::{Container, ContainerRegistry};
use crate::descriptor::{DescriptorSet, PropertyMapping, TypeDescriptor};
use crate::error::{ConfigResult, EnrichResult};
use crate::executor::{EnrichReport, OperationExecutor};
use crate::handler::HandlerChain;
use crate::interceptor::SourceWriteInterceptor;
use crate::operation::OperationPlan;
use crate::operator::{Assembler, Disassembler, FieldDisassembler, HandlerChainAssembler};
use crate::resolver::ConfigurationResolver;
use crate::value::{ObjectRef, TypeName, Value};
use moka::sync::Cache;
use std::sync::Arc;

/// Enrichment engine
#[derive(Debug, Clone)]
pub struct Crane {
    resolver: ConfigurationResolver,
    executor: OperationExecutor,
    plans: Cache<TypeName, Arc<OperationPlan>>,
    config: CraneConfig,
}

impl Crane {
    /// Start building an engine
    #[inline]
    #[must_use]
    pub fn builder() -> CraneBuilder {
        CraneBuilder::default()
    }

    /// Active configuration
    #[inline]
    #[must_use]
    pub fn config(&self) -> &CraneConfig {
        &self.config
    }

    /// Resolved plan for `root`, cached per type
    ///
    /// # Errors
    ///
    /// Returns the resolver's [`crate::ConfigError`]; failures are not cached.
    pub fn plan(&self, root: impl Into<TypeName>) -> ConfigResult<Arc<OperationPlan>> {
        let root = root.into();
        if let Some(plan) = self.plans.get(&root) {
            return Ok(plan);
        }
        let plan = Arc::new(self.resolver.resolve(&root)?);
        self.plans.insert(root, Arc::clone(&plan));
        Ok(plan)
    }

    /// Drop every cached plan
    #[inline]
    pub fn invalidate_plans(&self) {
        self.plans.invalidate_all();
    }

    /// Enrich `objects` declared as `root_type`, in place
    ///
    /// # Errors
    ///
    /// Returns [`crate::EnrichError::Config`] if the plan cannot be resolved
    /// and [`crate::EnrichError::TypeMismatch`] if an object does not match
    /// the type it is enriched as. Fetch failures never error; they are
    /// listed in the report.
    pub fn enrich(&self, objects: &[ObjectRef], root_type: impl Into<TypeName>) -> EnrichResult<EnrichReport> {
        let root_type = root_type.into();
        if objects.is_empty() {
            tracing::debug!(root = %root_type, "nothing to enrich");
            return Ok(EnrichReport::default());
        }
        let plan = self.plan(root_type)?;
        self.executor.execute(objects, &plan)
    }

    /// Enrich the objects held by `values`
    ///
    /// Lists and arrays are flattened; scalars, nulls and tree nodes are
    /// ignored.
    ///
    /// # Errors
    ///
    /// Same as [`Crane::enrich`].
    pub fn enrich_values(&self, values: &[Value], root_type: impl Into<TypeName>) -> EnrichResult<EnrichReport> {
        let mut objects = Vec::new();
        for value in values {
            flatten_objects(value, &mut objects);
        }
        self.enrich(&objects, root_type)
    }
}

fn flatten_objects(value: &Value, out: &mut Vec<ObjectRef>) {
    match value {
        Value::Object(object) => out.push(object.clone()),
        Value::List(items) => items.iter().for_each(|item| flatten_objects(item, out)),
        Value::Array(items) => items.iter().for_each(|item| flatten_objects(item, out)),
        Value::Null | Value::Scalar(_) | Value::Tree(_) => {}
    }
}

/// Builder for [`Crane`]
///
/// A custom assembler replaces the default one entirely, so the handler chain
/// and interceptor settings only apply when no assembler is given.
#[derive(Debug, Default)]
pub struct CraneBuilder {
    descriptors: DescriptorSet,
    registry: ContainerRegistry,
    chain: Option<HandlerChain>,
    interceptor: Option<Arc<dyn SourceWriteInterceptor>>,
    assembler: Option<Arc<dyn Assembler>>,
    disassembler: Option<Arc<dyn Disassembler>>,
    config: CraneConfig,
}

impl CraneBuilder {
    /// Replace the descriptor catalog
    #[must_use]
    pub fn descriptors(mut self, descriptors: DescriptorSet) -> Self {
        self.descriptors = descriptors;
        self
    }

    /// Add a type descriptor
    #[must_use]
    pub fn type_descriptor(mut self, descriptor: TypeDescriptor) -> Self {
        self.descriptors.insert(descriptor);
        self
    }

    /// Add a property template
    #[must_use]
    pub fn template(mut self, name: impl Into<String>, mappings: Vec<PropertyMapping>) -> Self {
        self.descriptors.insert_template(name, mappings);
        self
    }

    /// Replace the container registry
    #[must_use]
    pub fn registry(mut self, registry: ContainerRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Bind `namespace` to `container`
    ///
    /// # Errors
    ///
    /// Returns [`crate::ConfigError::DuplicateNamespace`] if the namespace is bound.
    pub fn container(mut self, namespace: impl Into<String>, container: Arc<dyn Container>) -> ConfigResult<Self> {
        self.registry.bind(namespace, container)?;
        Ok(self)
    }

    /// Use a custom handler chain
    #[must_use]
    pub fn handler_chain(mut self, chain: HandlerChain) -> Self {
        self.chain = Some(chain);
        self
    }

    /// Attach a write interceptor
    #[must_use]
    pub fn interceptor(mut self, interceptor: Arc<dyn SourceWriteInterceptor>) -> Self {
        self.interceptor = Some(interceptor);
        self
    }

    /// Use a custom assembler
    #[must_use]
    pub fn assembler(mut self, assembler: Arc<dyn Assembler>) -> Self {
        self.assembler = Some(assembler);
        self
    }

    /// Use a custom disassembler
    #[must_use]
    pub fn disassembler(mut self, disassembler: Arc<dyn Disassembler>) -> Self {
        self.disassembler = Some(disassembler);
        self
    }

    /// Set runtime configuration
    #[must_use]
    pub fn config(mut self, config: CraneConfig) -> Self {
        self.config = config;
        self
    }

    /// Build the engine
    #[must_use]
    pub fn build(self) -> Crane {
        let assembler: Arc<dyn Assembler> = match self.assembler {
            Some(assembler) => assembler,
            None => {
                let assembler = HandlerChainAssembler::new(Arc::new(self.chain.unwrap_or_default()));
                match self.interceptor {
                    Some(interceptor) => Arc::new(assembler.with_interceptor(interceptor)),
                    None => Arc::new(assembler),
                }
            }
        };
        let disassembler: Arc<dyn Disassembler> = match self.disassembler {
            Some(disassembler) => disassembler,
            None => Arc::new(FieldDisassembler),
        };

        let resolver = ConfigurationResolver::new(Arc::new(self.descriptors), Arc::new(self.registry))
            .with_assembler(assembler)
            .with_disassembler(disassembler);

        tracing::debug!(
            types = resolver.descriptors().len(),
            parallel = self.config.parallel,
            "crane built"
        );

        Crane {
            resolver,
            executor: OperationExecutor::new().with_parallel(self.config.parallel),
            plans: Cache::new(self.config.plan_cache_capacity),
            config: self.config,
        }
    }
}
