//! Key source backed by per-namespace fetch functions

use super::KeySource;
use crate::accessor::PropertyAccessor;
use crate::error::{ConfigError, ConfigResult, FetchError};
use crate::value::{Key, Value};
use indexmap::IndexMap;
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::sync::Arc;

/// Batch lookup function returning source values for a key set
pub type FetchMethod = Arc<dyn Fn(&BTreeSet<Key>) -> Result<Vec<Value>, FetchError> + Send + Sync>;

struct Method {
    key_field: String,
    fetch: FetchMethod,
}

/// [`KeySource`] dispatching each namespace to its own method
///
/// Methods return source values without keys attached; each source is indexed
/// by its `key_field`. Sources lacking the field are dropped, and when two
/// sources share a key the later one wins.
#[derive(Default)]
pub struct MethodSource {
    methods: IndexMap<String, Method>,
}

impl MethodSource {
    /// Create source without methods
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the method serving `namespace`
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::DuplicateNamespace`] if the namespace already
    /// has a method.
    pub fn register_method<F>(&mut self, namespace: impl Into<String>, key_field: impl Into<String>, fetch: F) -> ConfigResult<()>
    where
        F: Fn(&BTreeSet<Key>) -> Result<Vec<Value>, FetchError> + Send + Sync + 'static,
    {
        let namespace = namespace.into();
        if self.methods.contains_key(&namespace) {
            return Err(ConfigError::duplicate_namespace(namespace));
        }
        self.methods.insert(
            namespace,
            Method {
                key_field: key_field.into(),
                fetch: Arc::new(fetch),
            },
        );
        Ok(())
    }

    /// Namespaces with a registered method
    #[must_use]
    pub fn namespaces(&self) -> Vec<&str> {
        self.methods.keys().map(String::as_str).collect()
    }

    fn source_key(source: &Value, key_field: &str) -> Option<Key> {
        let key = match source {
            Value::Object(object) => object.read_property(key_field),
            Value::Tree(tree) => tree.read_property(key_field),
            _ => None,
        };
        key.as_ref().and_then(Key::from_value)
    }
}

impl fmt::Debug for MethodSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodSource")
            .field("namespaces", &self.namespaces())
            .finish()
    }
}

impl KeySource for MethodSource {
    fn fetch(&self, namespace: &str, keys: &BTreeSet<Key>) -> Result<HashMap<Key, Value>, FetchError> {
        let Some(method) = self.methods.get(namespace) else {
            tracing::debug!(namespace, "no method registered");
            return Ok(HashMap::new());
        };
        let sources = (method.fetch)(keys)?;
        Ok(sources
            .into_iter()
            .filter_map(|source| Self::source_key(&source, &method.key_field).map(|key| (key, source)))
            .collect())
    }
}
