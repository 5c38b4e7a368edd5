//! Core graph data structures
//!
//! Defines record ids, references and the closed set of stored field values.

mod ids;
mod value;

pub use ids::{RecordId, ROOT_MUTATION, ROOT_QUERY};
pub use value::{Reference, StoredValue};
