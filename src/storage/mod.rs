//! Storage layer
//!
//! The normalized record store and its serializable snapshots.

mod snapshot;
mod store;

pub use snapshot::Snapshot;
pub use store::{NormalizedStore, Record, TYPENAME_FIELD};
