//! Dynamic object model
//!
//! Enrichment walks objects whose shape is only known through descriptors, so
//! the engine works on a small dynamic model:
//!
//! - [`Value`]: null, scalar, object handle, ordered list, fixed array or tree node
//! - [`ObjectRef`]: shared handle to a typed record with named fields
//! - [`TreeRef`]: shared handle to a structured tree node (`serde_json::Value`)
//! - [`Key`]: canonical form of a scalar used to look data up in containers
//! - [`TypeName`]: identity of a declared object shape
//!
//! Objects and trees are handles: cloning a [`Value`] that holds them clones
//! the handle, so every path reaching an object mutates the same instance.

use indexmap::IndexMap;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value as Json;
use std::borrow::Borrow;
use std::fmt;
use std::sync::Arc;

/// Objects nested deeper than this render as `null` in JSON snapshots.
const MAX_SNAPSHOT_DEPTH: usize = 32;

/// Identity of a declared object shape
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TypeName(String);

impl TypeName {
    /// Create type name
    #[inline]
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Borrow as string slice
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TypeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for TypeName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for TypeName {
    fn from(name: &str) -> Self {
        Self(name.to_string())
    }
}

impl From<String> for TypeName {
    fn from(name: String) -> Self {
        Self(name)
    }
}

impl From<&TypeName> for TypeName {
    fn from(name: &TypeName) -> Self {
        name.clone()
    }
}

/// Canonical lookup key
///
/// Scalars are keyed by their textual form, so the number `1` and the
/// string `"1"` address the same entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Key(String);

impl Key {
    /// Create key
    #[inline]
    #[must_use]
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Derive a key from a value; only scalars produce keys
    #[must_use]
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Scalar(json) => Self::from_json(json),
            _ => None,
        }
    }

    /// Derive a key from a JSON scalar
    #[must_use]
    pub fn from_json(json: &Json) -> Option<Self> {
        match json {
            Json::String(s) => Some(Self(s.clone())),
            Json::Number(n) => Some(Self(n.to_string())),
            Json::Bool(b) => Some(Self(b.to_string())),
            _ => None,
        }
    }

    /// Borrow as string slice
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Key {
    fn from(key: &str) -> Self {
        Self(key.to_string())
    }
}

impl From<String> for Key {
    fn from(key: String) -> Self {
        Self(key)
    }
}

impl From<i64> for Key {
    fn from(key: i64) -> Self {
        Self(key.to_string())
    }
}

impl From<i32> for Key {
    fn from(key: i32) -> Self {
        Self(key.to_string())
    }
}

/// Dynamic value flowing through the engine
#[derive(Debug, Clone, Default)]
pub enum Value {
    /// Absent value
    #[default]
    Null,

    /// String, number or boolean
    Scalar(Json),

    /// Shared handle to a typed record
    Object(ObjectRef),

    /// Ordered collection
    List(Vec<Value>),

    /// Fixed-size array
    Array(Box<[Value]>),

    /// Structured tree node
    Tree(TreeRef),
}

impl Value {
    /// Lift a JSON document; objects become tree nodes, arrays become lists
    #[must_use]
    pub fn from_json(json: Json) -> Self {
        match json {
            Json::Null => Self::Null,
            Json::Array(items) => Self::List(items.into_iter().map(Self::from_json).collect()),
            json @ Json::Object(_) => Self::Tree(TreeRef::new(json)),
            scalar => Self::Scalar(scalar),
        }
    }

    /// Wrap a JSON document as a single tree node
    #[inline]
    #[must_use]
    pub fn tree(json: Json) -> Self {
        Self::Tree(TreeRef::new(json))
    }

    /// Build an ordered collection
    #[must_use]
    pub fn list<I, V>(items: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Self::List(items.into_iter().map(Into::into).collect())
    }

    /// Build a fixed-size array
    #[must_use]
    pub fn array<I, V>(items: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Self::Array(items.into_iter().map(Into::into).collect())
    }

    /// Check for null (including a JSON null scalar)
    #[inline]
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null | Self::Scalar(Json::Null))
    }

    /// Object handle, if this is an object
    #[inline]
    #[must_use]
    pub fn as_object(&self) -> Option<&ObjectRef> {
        match self {
            Self::Object(object) => Some(object),
            _ => None,
        }
    }

    /// String slice, if this is a string scalar
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Scalar(Json::String(s)) => Some(s),
            _ => None,
        }
    }

    /// Integer, if this is an integral scalar
    #[inline]
    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Scalar(json) => json.as_i64(),
            _ => None,
        }
    }

    /// Elements of a list or array
    #[must_use]
    pub fn elements(&self) -> Option<&[Value]> {
        match self {
            Self::List(items) => Some(items),
            Self::Array(items) => Some(items),
            _ => None,
        }
    }

    /// Short shape name for diagnostics
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Scalar(_) => "scalar",
            Self::Object(_) => "object",
            Self::List(_) => "list",
            Self::Array(_) => "array",
            Self::Tree(_) => "tree",
        }
    }

    /// Snapshot as JSON
    #[must_use]
    pub fn to_json(&self) -> Json {
        self.snapshot(0)
    }

    fn snapshot(&self, depth: usize) -> Json {
        if depth > MAX_SNAPSHOT_DEPTH {
            return Json::Null;
        }
        match self {
            Self::Null => Json::Null,
            Self::Scalar(json) => json.clone(),
            Self::Object(object) => object.snapshot(depth + 1),
            Self::List(items) => Json::Array(items.iter().map(|v| v.snapshot(depth + 1)).collect()),
            Self::Array(items) => Json::Array(items.iter().map(|v| v.snapshot(depth + 1)).collect()),
            Self::Tree(tree) => tree.snapshot(),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (a, b) if a.is_null() && b.is_null() => true,
            (Self::Scalar(a), Self::Scalar(b)) => a == b,
            (Self::Object(a), Self::Object(b)) => a.ptr_eq(b),
            (Self::List(a), Self::List(b)) => a == b,
            (Self::Array(a), Self::Array(b)) => a == b,
            (Self::Tree(a), Self::Tree(b)) => a.ptr_eq(b) || a.snapshot() == b.snapshot(),
            _ => false,
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl From<Json> for Value {
    fn from(json: Json) -> Self {
        Self::from_json(json)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Scalar(Json::String(s.to_string()))
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Scalar(Json::String(s))
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Self::Scalar(Json::from(n))
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Self::Scalar(Json::from(n))
    }
}

impl From<u64> for Value {
    fn from(n: u64) -> Self {
        Self::Scalar(Json::from(n))
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Self::Scalar(Json::from(n))
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Scalar(Json::Bool(b))
    }
}

impl From<ObjectRef> for Value {
    fn from(object: ObjectRef) -> Self {
        Self::Object(object)
    }
}

impl From<TreeRef> for Value {
    fn from(tree: TreeRef) -> Self {
        Self::Tree(tree)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Self::List(items)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

#[derive(Debug)]
struct Record {
    type_name: TypeName,
    fields: IndexMap<String, Value>,
}

/// Shared handle to a typed record
#[derive(Clone)]
pub struct ObjectRef(Arc<RwLock<Record>>);

impl ObjectRef {
    /// Create an empty object of the given type
    #[must_use]
    pub fn new(type_name: impl Into<TypeName>) -> Self {
        Self(Arc::new(RwLock::new(Record {
            type_name: type_name.into(),
            fields: IndexMap::new(),
        })))
    }

    /// Set a field while building
    #[must_use]
    pub fn with(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(field, value);
        self
    }

    /// Declared type of the object
    #[must_use]
    pub fn type_name(&self) -> TypeName {
        self.0.read().type_name.clone()
    }

    /// Check the object's declared type
    #[must_use]
    pub fn is_instance_of(&self, type_name: &TypeName) -> bool {
        self.0.read().type_name == *type_name
    }

    /// Read a field; `None` when the record has no such field
    #[must_use]
    pub fn get(&self, field: &str) -> Option<Value> {
        self.0.read().fields.get(field).cloned()
    }

    /// Check whether the record declares a field
    #[must_use]
    pub fn has_field(&self, field: &str) -> bool {
        self.0.read().fields.contains_key(field)
    }

    /// Overwrite a field, returning the previous value
    pub fn set(&self, field: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.write().fields.insert(field.into(), value.into())
    }

    /// Field names in declaration order
    #[must_use]
    pub fn field_names(&self) -> Vec<String> {
        self.0.read().fields.keys().cloned().collect()
    }

    /// Check handle identity
    #[inline]
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// Stable identity of the underlying record for the handle's lifetime
    #[inline]
    #[must_use]
    pub fn identity(&self) -> usize {
        Arc::as_ptr(&self.0).cast::<()>() as usize
    }

    /// Snapshot as JSON object
    #[must_use]
    pub fn to_json(&self) -> Json {
        self.snapshot(0)
    }

    fn snapshot(&self, depth: usize) -> Json {
        let record = self.0.read_recursive();
        Json::Object(
            record
                .fields
                .iter()
                .map(|(name, value)| (name.clone(), value.snapshot(depth)))
                .collect(),
        )
    }
}

impl fmt::Debug for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let record = self.0.read_recursive();
        f.debug_struct("ObjectRef")
            .field("type", &record.type_name.as_str())
            .field("fields", &record.fields.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl Serialize for ObjectRef {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

/// Shared handle to a structured tree node
#[derive(Clone)]
pub struct TreeRef(Arc<RwLock<Json>>);

impl TreeRef {
    /// Wrap a JSON document
    #[must_use]
    pub fn new(json: Json) -> Self {
        Self(Arc::new(RwLock::new(json)))
    }

    /// Run a closure against the node
    pub fn read<R>(&self, f: impl FnOnce(&Json) -> R) -> R {
        f(&self.0.read_recursive())
    }

    /// Run a closure against the node with write access
    pub fn update<R>(&self, f: impl FnOnce(&mut Json) -> R) -> R {
        f(&mut self.0.write())
    }

    /// Copy of the node
    #[must_use]
    pub fn snapshot(&self) -> Json {
        self.0.read_recursive().clone()
    }

    /// Check handle identity
    #[inline]
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for TreeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TreeRef({})", self.0.read_recursive())
    }
}
