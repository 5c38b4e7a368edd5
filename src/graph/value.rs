//! Stored field values
//!
//! Every field of a normalized record holds a [`StoredValue`]. The variant set
//! is closed so the tracer and policy executor can match exhaustively.

use super::RecordId;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// A logical edge to another record
///
/// The target may be missing from the store (a dangling reference). That is
/// a valid state, not an error.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Reference {
    #[serde(rename = "__ref")]
    pub id: RecordId,
}

impl Reference {
    /// Create a reference to `id`
    pub fn new(id: impl Into<RecordId>) -> Self {
        Self { id: id.into() }
    }
}

/// Value held by one field key of a record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum StoredValue {
    /// Any JSON leaf (or a JSON structure treated opaquely)
    Scalar(Value),

    /// Edge to another record
    Reference(Reference),

    /// Ordered list
    List(Vec<StoredValue>),

    /// Embedded object without an id of its own
    Object(BTreeMap<String, StoredValue>),

    /// Field was explicitly deleted (distinct from never written)
    Absent,
}

impl StoredValue {
    /// Build a scalar value
    pub fn scalar(value: impl Into<Value>) -> Self {
        Self::Scalar(value.into())
    }

    /// Build a reference value
    pub fn reference(id: impl Into<RecordId>) -> Self {
        Self::Reference(Reference::new(id))
    }

    /// Build a list of references
    pub fn references<I, T>(ids: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<RecordId>,
    {
        Self::List(ids.into_iter().map(Self::reference).collect())
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, Self::Absent)
    }

    pub fn as_reference(&self) -> Option<&Reference> {
        match self {
            Self::Reference(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[StoredValue]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_scalar(&self) -> Option<&Value> {
        match self {
            Self::Scalar(v) => Some(v),
            _ => None,
        }
    }

    /// Visit every reference nested anywhere inside this value
    pub fn for_each_reference<F: FnMut(&Reference)>(&self, f: &mut F) {
        match self {
            Self::Reference(r) => f(r),
            Self::List(items) => items.iter().for_each(|item| item.for_each_reference(f)),
            Self::Object(fields) => fields.values().for_each(|v| v.for_each_reference(f)),
            Self::Scalar(_) | Self::Absent => {}
        }
    }

    /// Convert plain JSON into a stored value without normalizing nested objects
    ///
    /// Objects of the form `{"__ref": "id"}` become references.
    pub fn from_json(value: Value) -> Self {
        match value {
            Value::Array(items) => Self::List(items.into_iter().map(Self::from_json).collect()),
            Value::Object(map) => {
                if map.len() == 1 {
                    if let Some(Value::String(id)) = map.get("__ref") {
                        return Self::reference(id.as_str());
                    }
                }
                Self::Object(
                    map.into_iter()
                        .map(|(k, v)| (k, Self::from_json(v)))
                        .collect(),
                )
            }
            other => Self::Scalar(other),
        }
    }

    /// Convert back into plain JSON; references become `{"__ref": id}`
    pub fn to_json(&self) -> Value {
        match self {
            Self::Scalar(v) => v.clone(),
            Self::Reference(r) => serde_json::json!({ "__ref": r.id.as_str() }),
            Self::List(items) => Value::Array(items.iter().map(Self::to_json).collect()),
            Self::Object(fields) => Value::Object(
                fields
                    .iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect(),
            ),
            Self::Absent => Value::Null,
        }
    }
}

impl From<Reference> for StoredValue {
    fn from(r: Reference) -> Self {
        Self::Reference(r)
    }
}
