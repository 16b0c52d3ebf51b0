//! Store Values
//!
//! A [`StoreValue`] is an immutable JSON-like tree. Lists and objects sit
//! behind `Arc`, so cloning any value is O(1) and an edit copies only the
//! spine from the root to the edited node. Every subtree off that spine is
//! shared between the old and new trees, and equality checks on shared
//! subtrees stop at the pointer comparison.

use std::cmp::Ordering;
use std::sync::Arc;

use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::path::{Path, PathSegment};
use crate::error::StoreError;

/// The fields of an object value, in insertion order.
pub type StoreMap = IndexMap<Arc<str>, StoreValue>;

/// A node in a store's value tree.
#[derive(Debug, Clone, Default)]
pub enum StoreValue {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(Arc<str>),
    List(Arc<Vec<StoreValue>>),
    Object(Arc<StoreMap>),
}

impl StoreValue {
    /// Convert any serializable value into a store tree.
    pub fn from_serialize<S: Serialize + ?Sized>(value: &S) -> Result<Self, StoreError> {
        Ok(serde_json::to_value(value)?.into())
    }

    /// Convert this tree into a typed value.
    pub fn deserialize<D: DeserializeOwned>(&self) -> Result<D, StoreError> {
        Ok(serde_json::from_value(serde_json::Value::from(self))?)
    }

    /// Name of the variant, for error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            StoreValue::Null => "null",
            StoreValue::Bool(_) => "a bool",
            StoreValue::Int(_) => "an integer",
            StoreValue::Float(_) => "a float",
            StoreValue::Str(_) => "a string",
            StoreValue::List(_) => "a list",
            StoreValue::Object(_) => "an object",
        }
    }

    /// Number of elements of a list or fields of an object.
    pub fn len(&self) -> Option<usize> {
        match self {
            StoreValue::List(items) => Some(items.len()),
            StoreValue::Object(fields) => Some(fields.len()),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, StoreValue::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            StoreValue::Bool(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            StoreValue::Int(value) => Some(*value),
            _ => None,
        }
    }

    /// Floats, and integers widened to floats.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            StoreValue::Float(value) => Some(*value),
            StoreValue::Int(value) => Some(*value as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            StoreValue::Str(value) => Some(&**value),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[StoreValue]> {
        match self {
            StoreValue::List(items) => Some(items.as_slice()),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&StoreMap> {
        match self {
            StoreValue::Object(fields) => Some(&**fields),
            _ => None,
        }
    }

    /// The direct child addressed by `segment`.
    pub fn child(&self, segment: &PathSegment) -> Option<&StoreValue> {
        match (self, segment) {
            (StoreValue::Object(fields), PathSegment::Key(key)) => fields.get(&**key),
            (StoreValue::List(items), PathSegment::Index(index)) => items.get(*index),
            _ => None,
        }
    }

    /// The value at `path`, if there is one.
    pub fn pointer(&self, path: &Path) -> Option<&StoreValue> {
        path.segments()
            .iter()
            .try_fold(self, |node, segment| node.child(segment))
    }

    /// The value at `path`, or why it cannot be reached.
    pub(crate) fn resolve(&self, path: &Path) -> Result<&StoreValue, StoreError> {
        path.segments()
            .iter()
            .try_fold(self, |node, segment| node.child_at(segment, path))
    }

    fn child_at(&self, segment: &PathSegment, path: &Path) -> Result<&StoreValue, StoreError> {
        match (self, segment) {
            (StoreValue::Object(fields), PathSegment::Key(key)) => {
                fields.get(&**key).ok_or_else(|| StoreError::PathNotFound {
                    path: path.to_string(),
                })
            }
            (StoreValue::List(items), PathSegment::Index(index)) => {
                items.get(*index).ok_or_else(|| StoreError::IndexOutOfBounds {
                    path: path.to_string(),
                    index: *index,
                    len: items.len(),
                })
            }
            _ => Err(self.mismatch(segment, path)),
        }
    }

    fn mismatch(&self, segment: &PathSegment, path: &Path) -> StoreError {
        StoreError::SegmentMismatch {
            path: path.to_string(),
            segment: segment.to_string(),
            kind: self.kind(),
        }
    }

    /// A copy of this tree with `value` stored at `path`.
    ///
    /// The last segment may name a missing object key (inserted) or the index
    /// one past the end of a list (appended).
    pub(crate) fn set_in(&self, path: &Path, value: StoreValue) -> Result<StoreValue, StoreError> {
        if path.is_root() {
            return Ok(value);
        }
        let (next, ()) = self.rebuild(path.segments(), path, |parent, last| {
            Ok((parent.with_child(last, value, path)?, ()))
        })?;
        Ok(next)
    }

    /// A copy of this tree without the node at `path`, and the removed node.
    pub(crate) fn remove_in(&self, path: &Path) -> Result<(StoreValue, StoreValue), StoreError> {
        self.rebuild(path.segments(), path, |parent, last| {
            parent.without_child(last, path)
        })
    }

    /// Apply `edit` to the parent of the last segment and copy the spine
    /// above it.
    fn rebuild<R>(
        &self,
        segments: &[PathSegment],
        path: &Path,
        edit: impl FnOnce(&StoreValue, &PathSegment) -> Result<(StoreValue, R), StoreError>,
    ) -> Result<(StoreValue, R), StoreError> {
        match segments {
            [] => Err(StoreError::PathNotFound {
                path: path.to_string(),
            }),
            [last] => edit(self, last),
            [first, rest @ ..] => {
                let (child, out) = self.child_at(first, path)?.rebuild(rest, path, edit)?;
                Ok((self.with_child(first, child, path)?, out))
            }
        }
    }

    fn with_child(
        &self,
        segment: &PathSegment,
        value: StoreValue,
        path: &Path,
    ) -> Result<StoreValue, StoreError> {
        match (self, segment) {
            (StoreValue::Object(fields), PathSegment::Key(key)) => {
                let mut fields = (**fields).clone();
                fields.insert(Arc::clone(key), value);
                Ok(StoreValue::Object(Arc::new(fields)))
            }
            (StoreValue::List(items), PathSegment::Index(index)) => {
                let mut items = (**items).clone();
                match index.cmp(&items.len()) {
                    Ordering::Less => items[*index] = value,
                    Ordering::Equal => items.push(value),
                    Ordering::Greater => {
                        return Err(StoreError::IndexOutOfBounds {
                            path: path.to_string(),
                            index: *index,
                            len: items.len(),
                        })
                    }
                }
                Ok(StoreValue::List(Arc::new(items)))
            }
            _ => Err(self.mismatch(segment, path)),
        }
    }

    fn without_child(
        &self,
        segment: &PathSegment,
        path: &Path,
    ) -> Result<(StoreValue, StoreValue), StoreError> {
        match (self, segment) {
            (StoreValue::Object(fields), PathSegment::Key(key)) => {
                let mut fields = (**fields).clone();
                let removed = fields
                    .shift_remove(&**key)
                    .ok_or_else(|| StoreError::PathNotFound {
                        path: path.to_string(),
                    })?;
                Ok((StoreValue::Object(Arc::new(fields)), removed))
            }
            (StoreValue::List(items), PathSegment::Index(index)) => {
                if *index >= items.len() {
                    return Err(StoreError::IndexOutOfBounds {
                        path: path.to_string(),
                        index: *index,
                        len: items.len(),
                    });
                }
                let mut items = (**items).clone();
                let removed = items.remove(*index);
                Ok((StoreValue::List(Arc::new(items)), removed))
            }
            _ => Err(self.mismatch(segment, path)),
        }
    }
}

impl PartialEq for StoreValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (StoreValue::Null, StoreValue::Null) => true,
            (StoreValue::Bool(a), StoreValue::Bool(b)) => a == b,
            (StoreValue::Int(a), StoreValue::Int(b)) => a == b,
            (StoreValue::Float(a), StoreValue::Float(b)) => a == b,
            (StoreValue::Str(a), StoreValue::Str(b)) => a == b,
            (StoreValue::List(a), StoreValue::List(b)) => Arc::ptr_eq(a, b) || a == b,
            (StoreValue::Object(a), StoreValue::Object(b)) => Arc::ptr_eq(a, b) || a == b,
            _ => false,
        }
    }
}

// ----------------------------------------------------------------------------
// Conversions
// ----------------------------------------------------------------------------

impl From<bool> for StoreValue {
    fn from(value: bool) -> Self {
        StoreValue::Bool(value)
    }
}

impl From<i64> for StoreValue {
    fn from(value: i64) -> Self {
        StoreValue::Int(value)
    }
}

impl From<i32> for StoreValue {
    fn from(value: i32) -> Self {
        StoreValue::Int(i64::from(value))
    }
}

impl From<u32> for StoreValue {
    fn from(value: u32) -> Self {
        StoreValue::Int(i64::from(value))
    }
}

impl From<f64> for StoreValue {
    fn from(value: f64) -> Self {
        StoreValue::Float(value)
    }
}

impl From<&str> for StoreValue {
    fn from(value: &str) -> Self {
        StoreValue::Str(Arc::from(value))
    }
}

impl From<String> for StoreValue {
    fn from(value: String) -> Self {
        StoreValue::Str(Arc::from(value))
    }
}

impl From<Arc<str>> for StoreValue {
    fn from(value: Arc<str>) -> Self {
        StoreValue::Str(value)
    }
}

impl From<Vec<StoreValue>> for StoreValue {
    fn from(items: Vec<StoreValue>) -> Self {
        StoreValue::List(Arc::new(items))
    }
}

impl From<StoreMap> for StoreValue {
    fn from(fields: StoreMap) -> Self {
        StoreValue::Object(Arc::new(fields))
    }
}

impl<T: Into<StoreValue>> From<Option<T>> for StoreValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(StoreValue::Null, Into::into)
    }
}

impl FromIterator<StoreValue> for StoreValue {
    fn from_iter<I: IntoIterator<Item = StoreValue>>(iter: I) -> Self {
        StoreValue::List(Arc::new(iter.into_iter().collect()))
    }
}

impl<K: Into<Arc<str>>> FromIterator<(K, StoreValue)> for StoreValue {
    fn from_iter<I: IntoIterator<Item = (K, StoreValue)>>(iter: I) -> Self {
        StoreValue::Object(Arc::new(
            iter.into_iter().map(|(key, value)| (key.into(), value)).collect(),
        ))
    }
}

impl From<serde_json::Value> for StoreValue {
    fn from(value: serde_json::Value) -> Self {
        use serde_json::Value;

        match value {
            Value::Null => StoreValue::Null,
            Value::Bool(value) => StoreValue::Bool(value),
            Value::Number(number) => match number.as_i64() {
                Some(value) => StoreValue::Int(value),
                None => StoreValue::Float(number.as_f64().unwrap_or_default()),
            },
            Value::String(value) => StoreValue::Str(Arc::from(value)),
            Value::Array(items) => items.into_iter().map(StoreValue::from).collect(),
            Value::Object(fields) => fields
                .into_iter()
                .map(|(key, value)| (key, StoreValue::from(value)))
                .collect(),
        }
    }
}

impl From<&StoreValue> for serde_json::Value {
    fn from(value: &StoreValue) -> Self {
        use serde_json::{Number, Value};

        match value {
            StoreValue::Null => Value::Null,
            StoreValue::Bool(value) => Value::Bool(*value),
            StoreValue::Int(value) => Value::Number(Number::from(*value)),
            // JSON has no NaN or infinity.
            StoreValue::Float(value) => Number::from_f64(*value).map_or(Value::Null, Value::Number),
            StoreValue::Str(value) => Value::String(value.to_string()),
            StoreValue::List(items) => Value::Array(items.iter().map(Value::from).collect()),
            StoreValue::Object(fields) => Value::Object(
                fields
                    .iter()
                    .map(|(key, value)| (key.to_string(), Value::from(value)))
                    .collect(),
            ),
        }
    }
}

impl Serialize for StoreValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            StoreValue::Null => serializer.serialize_unit(),
            StoreValue::Bool(value) => serializer.serialize_bool(*value),
            StoreValue::Int(value) => serializer.serialize_i64(*value),
            StoreValue::Float(value) => serializer.serialize_f64(*value),
            StoreValue::Str(value) => serializer.serialize_str(value),
            StoreValue::List(items) => serializer.collect_seq(items.iter()),
            StoreValue::Object(fields) => {
                serializer.collect_map(fields.iter().map(|(key, value)| (&**key, value)))
            }
        }
    }
}

impl<'de> Deserialize<'de> for StoreValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        serde_json::Value::deserialize(deserializer).map(StoreValue::from)
    }
}
