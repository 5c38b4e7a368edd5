//! Garbage collection and eviction
//!
//! Retention counts, the reachability tracer, the collector that prunes
//! unreachable records, and targeted eviction.

mod collector;
mod evict;
mod retention;
mod tracer;

pub use collector::{GarbageCollector, GcOptions};
pub use evict::{EvictSpec, Eviction, Evictor};
pub use retention::RetentionRegistry;
pub use tracer::ReferenceTracer;
