//! Containers
//!
//! The external-data boundary. A container receives every object of one
//! configuration group together with the assemble operations bound to it,
//! looks the keys up per namespace and hands the fetched values to each
//! operation's assembler.
//!
//! - [`KeyValueContainer`]: eager in-memory `namespace -> key -> value` table
//! - [`KeyedContainer`]: batched on-demand fetch through a [`KeySource`]
//! - [`MethodSource`]: key source backed by per-namespace fetch functions
//! - [`ContainerRegistry`]: namespace bindings consulted by the resolver

use crate::error::{ConfigError, ConfigResult, EnrichResult, FetchError};
use crate::operation::AssembleOperation;
use crate::value::{Key, ObjectRef};
use indexmap::IndexMap;
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

mod key_value;
mod keyed;
mod method;

pub use key_value::KeyValueContainer;
pub use keyed::{KeySource, KeyedContainer};
pub use method::{FetchMethod, MethodSource};

/// Registry handle of a bound container
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContainerId(usize);

impl ContainerId {
    #[inline]
    pub(crate) fn new(index: usize) -> Self {
        Self(index)
    }

    /// Registry index
    #[inline]
    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for ContainerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "container#{}", self.0)
    }
}

/// Source of keyed external data
pub trait Container: Send + Sync + fmt::Debug {
    /// Container name (for diagnostics)
    fn name(&self) -> &str;

    /// Fetch data for `operations` over all `targets` and apply it
    ///
    /// Fetch failures are recorded in the outcome, never returned.
    ///
    /// # Errors
    ///
    /// Returns an error only for usage errors raised by an assembler.
    fn process(&self, targets: &[ObjectRef], operations: &[&AssembleOperation]) -> EnrichResult<ProcessOutcome>;
}

/// Namespace fetch that failed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchFailure {
    /// Container that attempted the fetch
    pub container: String,
    /// Namespace being fetched
    pub namespace: String,
    /// Keys requested
    pub keys: BTreeSet<Key>,
    /// Failure
    pub error: FetchError,
}

/// Diagnostics of one [`Container::process`] call
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessOutcome {
    /// Assembler executions with a fetched value
    pub applied: usize,
    /// Namespace fetches performed
    pub fetches: usize,
    /// Namespace fetches that returned no data
    pub empty_fetches: usize,
    /// Namespace fetches that failed
    pub failures: Vec<FetchFailure>,
}

impl ProcessOutcome {
    /// Fold another outcome into this one
    pub fn merge(&mut self, other: Self) {
        self.applied += other.applied;
        self.fetches += other.fetches;
        self.empty_fetches += other.empty_fetches;
        self.failures.extend(other.failures);
    }
}

/// Namespace to container bindings
///
/// Built once before resolution and read-only afterwards. Binding the same
/// container handle under several namespaces keeps one [`ContainerId`], so
/// the executor batches those namespaces into a single `process` call.
#[derive(Debug, Default, Clone)]
pub struct ContainerRegistry {
    containers: Vec<Arc<dyn Container>>,
    namespaces: IndexMap<String, ContainerId>,
}

impl ContainerRegistry {
    /// Create empty registry
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `namespace` to `container`
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::DuplicateNamespace`] if the namespace is bound.
    pub fn bind(&mut self, namespace: impl Into<String>, container: Arc<dyn Container>) -> ConfigResult<ContainerId> {
        let namespace = namespace.into();
        if self.namespaces.contains_key(&namespace) {
            return Err(ConfigError::duplicate_namespace(namespace));
        }
        let id = self.register(&container);
        tracing::debug!(namespace = %namespace, container = %id, "namespace bound");
        self.namespaces.insert(namespace, id);
        Ok(id)
    }

    /// Bind several namespaces to one container
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::DuplicateNamespace`] on the first namespace
    /// already bound.
    pub fn bind_all<I, S>(&mut self, namespaces: I, container: &Arc<dyn Container>) -> ConfigResult<ContainerId>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut id = None;
        for namespace in namespaces {
            id = Some(self.bind(namespace, Arc::clone(container))?);
        }
        match id {
            Some(id) => Ok(id),
            None => Ok(self.register(container)),
        }
    }

    fn register(&mut self, container: &Arc<dyn Container>) -> ContainerId {
        match self.containers.iter().position(|c| Arc::ptr_eq(c, container)) {
            Some(index) => ContainerId::new(index),
            None => {
                self.containers.push(Arc::clone(container));
                ContainerId::new(self.containers.len() - 1)
            }
        }
    }

    /// Look up the container bound to `namespace`
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ContainerNotFound`] if nothing is bound.
    pub fn lookup(&self, namespace: &str) -> ConfigResult<(ContainerId, Arc<dyn Container>)> {
        let id = self
            .namespaces
            .get(namespace)
            .copied()
            .ok_or_else(|| ConfigError::container_not_found(namespace))?;
        let container = self
            .get(id)
            .ok_or_else(|| ConfigError::container_not_found(namespace))?;
        Ok((id, Arc::clone(container)))
    }

    /// Container by handle
    #[inline]
    #[must_use]
    pub fn get(&self, id: ContainerId) -> Option<&Arc<dyn Container>> {
        self.containers.get(id.0)
    }

    /// Check if namespace is bound
    #[inline]
    #[must_use]
    pub fn contains(&self, namespace: &str) -> bool {
        self.namespaces.contains_key(namespace)
    }

    /// Bound namespaces in binding order
    #[must_use]
    pub fn namespaces(&self) -> Vec<&str> {
        self.namespaces.keys().map(String::as_str).collect()
    }

    /// Number of distinct containers
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.containers.len()
    }

    /// Check if registry is empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.containers.is_empty()
    }
}

/// Key of `target` for `operation`; non-scalar key values yield none
pub(crate) fn target_key(target: &ObjectRef, operation: &AssembleOperation) -> EnrichResult<Option<Key>> {
    let Some(value) = operation.assembler().get_key(target, operation)? else {
        return Ok(None);
    };
    let key = Key::from_value(&value);
    if key.is_none() {
        tracing::trace!(field = operation.field(), shape = value.kind(), "key is not a scalar");
    }
    Ok(key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bind_and_lookup() {
        let mut registry = ContainerRegistry::new();
        let id = registry.bind("student", Arc::new(KeyValueContainer::new())).unwrap();

        let (found, _) = registry.lookup("student").unwrap();
        assert_eq!(found, id);
        assert!(registry.contains("student"));
        assert_eq!(
            registry.lookup("teacher").unwrap_err(),
            ConfigError::container_not_found("teacher")
        );
    }

    #[test]
    fn duplicate_namespace_is_rejected() {
        let mut registry = ContainerRegistry::new();
        registry.bind("student", Arc::new(KeyValueContainer::new())).unwrap();

        let err = registry.bind("student", Arc::new(KeyValueContainer::new())).unwrap_err();
        assert_eq!(err, ConfigError::duplicate_namespace("student"));
    }

    #[test]
    fn shared_container_keeps_one_id() {
        let shared: Arc<dyn Container> = Arc::new(KeyValueContainer::new());
        let mut registry = ContainerRegistry::new();

        let a = registry.bind("student", Arc::clone(&shared)).unwrap();
        let b = registry.bind("teacher", Arc::clone(&shared)).unwrap();
        let c = registry.bind("title", Arc::new(KeyValueContainer::new())).unwrap();

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.namespaces(), vec!["student", "teacher", "title"]);
    }

    #[test]
    fn bind_all_shares_id() {
        let shared: Arc<dyn Container> = Arc::new(KeyValueContainer::new());
        let mut registry = ContainerRegistry::new();

        let id = registry.bind_all(["a", "b"], &shared).unwrap();
        assert_eq!(registry.lookup("b").unwrap().0, id);
        assert!(registry.bind_all(["b"], &shared).is_err());
    }

    #[test]
    fn outcome_merge_accumulates() {
        let mut total = ProcessOutcome {
            applied: 1,
            fetches: 1,
            ..ProcessOutcome::default()
        };
        total.merge(ProcessOutcome {
            applied: 2,
            fetches: 1,
            empty_fetches: 1,
            failures: Vec::new(),
        });
        assert_eq!((total.applied, total.fetches, total.empty_fetches), (3, 2, 1));
    }
}
