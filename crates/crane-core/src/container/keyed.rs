//! Batched on-demand container

use super::{target_key, Container, FetchFailure, ProcessOutcome};
use crate::error::{EnrichResult, FetchError};
use crate::operation::AssembleOperation;
use crate::value::{Key, ObjectRef, Value};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::sync::Arc;

/// Backend answering batched key lookups for a namespace
///
/// Must be reentrant: configuration groups may call it from several threads.
pub trait KeySource: Send + Sync {
    /// Fetch values for `keys`; missing keys are simply absent from the result
    ///
    /// # Errors
    ///
    /// Returns [`FetchError`] when the backend cannot answer. The container
    /// logs the failure and skips the namespace.
    fn fetch(&self, namespace: &str, keys: &BTreeSet<Key>) -> Result<HashMap<Key, Value>, FetchError>;
}

impl<F> KeySource for F
where
    F: Fn(&str, &BTreeSet<Key>) -> Result<HashMap<Key, Value>, FetchError> + Send + Sync,
{
    fn fetch(&self, namespace: &str, keys: &BTreeSet<Key>) -> Result<HashMap<Key, Value>, FetchError> {
        self(namespace, keys)
    }
}

/// Container fetching each namespace once per call
///
/// `process` runs three passes: collect the distinct keys of every target for
/// every operation, call [`KeySource::fetch`] once per namespace, then hand
/// each target its value through the operation's assembler.
pub struct KeyedContainer<S> {
    name: String,
    source: Arc<S>,
}

impl<S: KeySource> KeyedContainer<S> {
    /// Create container over a key source
    #[must_use]
    pub fn new(name: impl Into<String>, source: S) -> Self {
        Self::shared(name, Arc::new(source))
    }

    /// Create container over a key source the caller keeps a handle to
    #[must_use]
    pub fn shared(name: impl Into<String>, source: Arc<S>) -> Self {
        Self {
            name: name.into(),
            source,
        }
    }

    /// Underlying key source
    #[inline]
    #[must_use]
    pub fn source(&self) -> &Arc<S> {
        &self.source
    }
}

impl<S> fmt::Debug for KeyedContainer<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyedContainer")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl<S: KeySource> Container for KeyedContainer<S> {
    fn name(&self) -> &str {
        &self.name
    }

    fn process(&self, targets: &[ObjectRef], operations: &[&AssembleOperation]) -> EnrichResult<ProcessOutcome> {
        let mut outcome = ProcessOutcome::default();

        let mut keys: Vec<Vec<Option<Key>>> = Vec::with_capacity(operations.len());
        let mut batches: BTreeMap<&str, BTreeSet<Key>> = BTreeMap::new();
        for operation in operations {
            let mut per_target = Vec::with_capacity(targets.len());
            for target in targets {
                let key = target_key(target, operation)?;
                if let Some(key) = &key {
                    batches
                        .entry(operation.namespace())
                        .or_default()
                        .insert(key.clone());
                }
                per_target.push(key);
            }
            keys.push(per_target);
        }

        let mut fetched: HashMap<&str, HashMap<Key, Value>> = HashMap::with_capacity(batches.len());
        for (namespace, batch) in batches {
            outcome.fetches += 1;
            match self.source.fetch(namespace, &batch) {
                Ok(values) if values.is_empty() => {
                    tracing::debug!(container = %self.name, namespace, keys = batch.len(), "fetch returned no data");
                    outcome.empty_fetches += 1;
                }
                Ok(values) => {
                    tracing::debug!(
                        container = %self.name,
                        namespace,
                        keys = batch.len(),
                        found = values.len(),
                        "fetched"
                    );
                    fetched.insert(namespace, values);
                }
                Err(error) => {
                    tracing::warn!(container = %self.name, namespace, error = %error, "fetch failed, namespace skipped");
                    outcome.failures.push(FetchFailure {
                        container: self.name.clone(),
                        namespace: namespace.to_string(),
                        keys: batch,
                        error,
                    });
                }
            }
        }

        for (operation, per_target) in operations.iter().zip(&keys) {
            let Some(values) = fetched.get(operation.namespace()) else {
                continue;
            };
            for (target, key) in targets.iter().zip(per_target) {
                let Some(source) = key.as_ref().and_then(|key| values.get(key)) else {
                    continue;
                };
                operation.assembler().execute(target, source, operation)?;
                outcome.applied += 1;
            }
        }

        Ok(outcome)
    }
}
