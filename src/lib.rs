//! graphcache - Normalized client-side graph cache
//!
//! Stores query results as flat records keyed by id, with references between
//! them. Reachability-based garbage collection, targeted eviction, and
//! per-field read/merge policies keep the store consistent while memoized
//! result trees are invalidated per record.
//!
//! # Architecture
//!
//! - **graph**: Record ids, references, and stored values
//! - **storage**: The normalized record store and snapshots
//! - **gc**: Retention counts, reference tracing, collection, and eviction
//! - **policies**: Field key derivation plus read and merge functions
//! - **results**: Result trees, canonicalization, and the result cache
//! - **cache**: `InMemoryCache` and the thread-safe `SharedCache`
//! - **config**: YAML configuration and validation
//!
//! # Example
//!
//! ```
//! use graphcache::cache::InMemoryCache;
//! use graphcache::gc::GcOptions;
//! use serde_json::json;
//!
//! let mut cache = InMemoryCache::default();
//! cache
//!     .write_object("ROOT_QUERY", "Query", &json!({
//!         "me": { "__typename": "Person", "id": 1, "name": "Ada" }
//!     }))
//!     .unwrap();
//! cache.put("Person:2", "name", graphcache::graph::StoredValue::scalar("Alan"));
//!
//! let removed = cache.gc(GcOptions::default());
//! assert_eq!(removed.len(), 1);
//! assert!(cache.store().contains("Person:1"));
//! ```

// Core modules
pub mod config;
pub mod error;
pub mod graph;
pub mod logging;
pub mod storage;

// Cache machinery
pub mod cache;
pub mod gc;
pub mod policies;
pub mod results;

// Re-exports
pub use error::{CacheError, Result};
