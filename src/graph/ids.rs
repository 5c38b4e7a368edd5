//! Type-safe record identifiers

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;

/// Id of the root record every query reads from
pub const ROOT_QUERY: &str = "ROOT_QUERY";

/// Id of the root record mutation results are written under
pub const ROOT_MUTATION: &str = "ROOT_MUTATION";

/// Type-safe wrapper for record ids
///
/// Ids are opaque. Identified records use `Typename:key` (e.g. "Person:7",
/// `Book:{"isbn":"0441013597"}`); well-known roots use plain names.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(String);

impl RecordId {
    /// Create a new RecordId from a string
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the underlying string
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Typename implied by the id itself
    ///
    /// Well-known roots map to their operation type; identified records
    /// yield their `Typename:` prefix.
    pub fn typename(&self) -> Option<&str> {
        match self.0.as_str() {
            ROOT_QUERY => Some("Query"),
            ROOT_MUTATION => Some("Mutation"),
            id => id.split_once(':').map(|(typename, _)| typename),
        }
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Borrow<str> for RecordId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<String> for RecordId {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<&str> for RecordId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<&RecordId> for RecordId {
    fn from(id: &RecordId) -> Self {
        id.clone()
    }
}
