//! Cache facade over the normalized store
//!
//! [`InMemoryCache`] owns the store, policies, retention counts, and memoized
//! results. [`SharedCache`] wraps it for use across threads.

mod in_memory;
mod reader;
mod shared;
mod writer;

pub use in_memory::{CacheStats, InMemoryCache, Modification};
pub use reader::ReadRequest;
pub use shared::SharedCache;
pub use writer::WriteRequest;
