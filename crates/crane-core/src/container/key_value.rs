//! Eager in-memory container

use super::{target_key, Container, ProcessOutcome};
use crate::error::EnrichResult;
use crate::operation::AssembleOperation;
use crate::value::{Key, ObjectRef, Value};
use dashmap::DashMap;
use std::collections::{HashMap, HashSet};

/// Pre-populated `namespace -> key -> value` table
#[derive(Debug, Default)]
pub struct KeyValueContainer {
    name: String,
    data: DashMap<String, HashMap<Key, Value>>,
}

impl KeyValueContainer {
    /// Create empty container
    #[must_use]
    pub fn new() -> Self {
        Self::named("key_value")
    }

    /// Create empty container with a diagnostic name
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data: DashMap::new(),
        }
    }

    /// Add entries to `namespace`, replacing existing keys
    pub fn register<I, K, V>(&self, namespace: impl Into<String>, values: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<Key>,
        V: Into<Value>,
    {
        let mut table = self.data.entry(namespace.into()).or_default();
        table.extend(values.into_iter().map(|(k, v)| (k.into(), v.into())));
    }

    /// Look up one entry
    #[must_use]
    pub fn get(&self, namespace: &str, key: &Key) -> Option<Value> {
        self.data.get(namespace)?.get(key).cloned()
    }

    /// Number of entries in `namespace`
    #[must_use]
    pub fn namespace_len(&self, namespace: &str) -> usize {
        self.data.get(namespace).map_or(0, |table| table.len())
    }
}

impl Container for KeyValueContainer {
    fn name(&self) -> &str {
        &self.name
    }

    fn process(&self, targets: &[ObjectRef], operations: &[&AssembleOperation]) -> EnrichResult<ProcessOutcome> {
        let mut outcome = ProcessOutcome::default();
        let mut hit: HashMap<&str, bool> = HashMap::new();
        let mut seen: HashSet<&str> = HashSet::new();

        for operation in operations {
            let namespace = operation.namespace();
            seen.insert(namespace);
            for target in targets {
                let Some(key) = target_key(target, operation)? else {
                    continue;
                };
                let found = self.get(namespace, &key);
                *hit.entry(namespace).or_default() |= found.is_some();
                if let Some(source) = found {
                    operation.assembler().execute(target, &source, operation)?;
                    outcome.applied += 1;
                }
            }
        }

        outcome.fetches = seen.len();
        outcome.empty_fetches = seen.iter().filter(|ns| !hit.get(*ns).copied().unwrap_or(false)).count();
        Ok(outcome)
    }
}
