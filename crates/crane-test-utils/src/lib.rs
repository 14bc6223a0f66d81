//! Testing utilities for the Crane workspace
//!
//! Shared fixtures, key sources and tracing setup.

#![allow(missing_docs)]

use crane_core::prelude::*;
use crane_core::Container;
use parking_lot::Mutex;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

/// Install a test-writer subscriber once; honors `RUST_LOG`
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// One recorded fetch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchCall {
    pub namespace: String,
    pub keys: BTreeSet<Key>,
}

/// In-memory key source that records every fetch
#[derive(Debug, Default)]
pub struct RecordingSource {
    data: HashMap<String, HashMap<Key, Value>>,
    failing: BTreeSet<String>,
    calls: Mutex<Vec<FetchCall>>,
}

impl RecordingSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add entries served for `namespace`
    pub fn with<I, K, V>(mut self, namespace: &str, entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<Key>,
        V: Into<Value>,
    {
        self.data
            .entry(namespace.to_string())
            .or_default()
            .extend(entries.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// Make every fetch of `namespace` fail
    pub fn failing(mut self, namespace: &str) -> Self {
        self.failing.insert(namespace.to_string());
        self
    }

    pub fn calls(&self) -> Vec<FetchCall> {
        self.calls.lock().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    pub fn calls_for(&self, namespace: &str) -> Vec<BTreeSet<Key>> {
        self.calls
            .lock()
            .iter()
            .filter(|call| call.namespace == namespace)
            .map(|call| call.keys.clone())
            .collect()
    }
}

impl KeySource for RecordingSource {
    fn fetch(&self, namespace: &str, keys: &BTreeSet<Key>) -> Result<HashMap<Key, Value>, FetchError> {
        self.calls.lock().push(FetchCall {
            namespace: namespace.to_string(),
            keys: keys.clone(),
        });
        if self.failing.contains(namespace) {
            return Err(FetchError::failed(namespace, "backend unavailable"));
        }
        let Some(table) = self.data.get(namespace) else {
            return Ok(HashMap::new());
        };
        Ok(keys
            .iter()
            .filter_map(|key| table.get(key).map(|value| (key.clone(), value.clone())))
            .collect())
    }
}

/// `Student` with a `studentId` key resolved from namespace `student`
pub fn student_descriptor() -> TypeDescriptor {
    TypeDescriptor::new("Student").assemble(
        "studentId",
        AssembleDescriptor::new("student").prop(PropertyMapping::new("studentName", "name")),
    )
}

pub fn student(id: impl Into<Value>) -> ObjectRef {
    ObjectRef::new("Student").with("studentId", id)
}

/// `Classroom` holding `teachers` and `students` of type `Member`; each member
/// resolves its `titleId` against namespace `title`
pub fn classroom_descriptors() -> DescriptorSet {
    DescriptorSet::new()
        .with_type(
            TypeDescriptor::new("Classroom")
                .disassemble("teachers", DisassembleDescriptor::new("Member"))
                .disassemble("students", DisassembleDescriptor::new("Member")),
        )
        .with_type(TypeDescriptor::new("Member").assemble(
            "titleId",
            AssembleDescriptor::new("title").prop(PropertyMapping::new("title", "name")),
        ))
}

pub fn member(name: &str, title_id: impl Into<Value>) -> ObjectRef {
    ObjectRef::new("Member").with("name", name).with("titleId", title_id)
}

pub fn classroom(teachers: Vec<ObjectRef>, students: Vec<ObjectRef>) -> ObjectRef {
    ObjectRef::new("Classroom")
        .with("teachers", Value::list(teachers))
        .with("students", Value::list(students))
}

/// Title entries `1 -> Professor`, `2 -> Lecturer`
pub fn title_source() -> RecordingSource {
    RecordingSource::new().with(
        "title",
        [
            (1, serde_json::json!({"name": "Professor"})),
            (2, serde_json::json!({"name": "Lecturer"})),
        ],
    )
}

/// Crane over `descriptors` with `source` bound to every namespace
pub fn crane_with_source(
    descriptors: DescriptorSet,
    source: &Arc<RecordingSource>,
    namespaces: &[&str],
    config: CraneConfig,
) -> Crane {
    let container: Arc<dyn Container> = Arc::new(KeyedContainer::shared("recording", Arc::clone(source)));
    let mut registry = ContainerRegistry::new();
    for namespace in namespaces {
        if let Err(e) = registry.bind(*namespace, Arc::clone(&container)) {
            panic!("fixture binding failed: {e}");
        }
    }
    Crane::builder()
        .descriptors(descriptors)
        .registry(registry)
        .config(config)
        .build()
}
