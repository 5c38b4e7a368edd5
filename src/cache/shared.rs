//! Thread-safe handle to an [`InMemoryCache`]
//!
//! Every public operation takes the lock once and runs to completion, so a
//! collection never observes a half-applied write. Read and merge functions
//! run while the lock is held: calling back into the same `SharedCache` from
//! inside a policy function deadlocks.

use super::in_memory::{CacheStats, InMemoryCache, Modification};
use super::reader::ReadRequest;
use super::writer::WriteRequest;
use crate::config::CacheConfig;
use crate::gc::{EvictSpec, GcOptions};
use crate::graph::{RecordId, StoredValue};
use crate::policies::{FieldPolicy, TypePolicy};
use crate::results::{ReadResult, Selection};
use crate::storage::Snapshot;
use crate::Result;
use parking_lot::Mutex;
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::sync::Arc;

/// Cloneable, lock-protected cache
#[derive(Debug, Clone, Default)]
pub struct SharedCache {
    inner: Arc<Mutex<InMemoryCache>>,
}

impl SharedCache {
    pub fn new(config: CacheConfig) -> Result<Self> {
        Ok(Self::from_cache(InMemoryCache::new(config)?))
    }

    pub fn from_cache(cache: InMemoryCache) -> Self {
        Self {
            inner: Arc::new(Mutex::new(cache)),
        }
    }

    /// Run several operations under a single lock
    pub fn with<R>(&self, f: impl FnOnce(&mut InMemoryCache) -> R) -> R {
        f(&mut self.inner.lock())
    }

    pub fn register_policy(
        &self,
        typename: impl Into<String>,
        field_name: impl Into<String>,
        policy: FieldPolicy,
    ) {
        self.inner.lock().register_policy(typename, field_name, policy);
    }

    pub fn register_type_policy(&self, typename: impl Into<String>, policy: TypePolicy) {
        self.inner.lock().register_type_policy(typename, policy);
    }

    pub fn get(&self, id: &str, field_key: &str) -> Option<StoredValue> {
        self.inner.lock().get(id, field_key).cloned()
    }

    pub fn put(&self, id: impl Into<RecordId>, field_key: impl Into<String>, value: StoredValue) {
        self.inner.lock().put(id, field_key, value);
    }

    pub fn write_field(&self, request: WriteRequest) -> Result<()> {
        self.inner.lock().write_field(request)
    }

    pub fn write_object(&self, id: impl Into<RecordId>, typename: &str, data: &Value) -> Result<()> {
        self.inner.lock().write_object(id, typename, data)
    }

    pub fn read_field(&self, request: &ReadRequest) -> Result<Option<StoredValue>> {
        self.inner.lock().read_field(request)
    }

    pub fn read_tree(
        &self,
        root: impl Into<RecordId>,
        selection: &Selection,
        variables: &Map<String, Value>,
    ) -> Result<ReadResult> {
        self.inner.lock().read_tree(root, selection, variables)
    }

    pub fn retain(&self, id: impl Into<RecordId>) -> usize {
        self.inner.lock().retain(id)
    }

    pub fn release(&self, id: &str) -> usize {
        self.inner.lock().release(id)
    }

    pub fn reachable(&self) -> HashSet<RecordId> {
        self.inner.lock().reachable()
    }

    pub fn gc(&self, options: GcOptions) -> Vec<RecordId> {
        self.inner.lock().gc(options)
    }

    pub fn evict(&self, spec: &EvictSpec) -> bool {
        self.inner.lock().evict(spec)
    }

    pub fn modify<F>(&self, id: &str, field_name: &str, f: F) -> bool
    where
        F: FnMut(&str, &StoredValue) -> Modification,
    {
        self.inner.lock().modify(id, field_name, f)
    }

    pub fn extract(&self) -> Snapshot {
        self.inner.lock().extract()
    }

    pub fn restore(&self, snapshot: Snapshot) {
        self.inner.lock().restore(snapshot);
    }

    pub fn stats(&self) -> CacheStats {
        self.inner.lock().stats()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::thread;

    #[test]
    fn test_concurrent_writes_and_gc() {
        let cache = SharedCache::default();

        let handles: Vec<_> = (0..4)
            .map(|n| {
                let cache = cache.clone();
                thread::spawn(move || {
                    for i in 0..25 {
                        let id = format!("Item:{}-{}", n, i);
                        // Link before creating so a concurrent collection can't reclaim it
                        if i % 2 == 0 {
                            cache.put("ROOT_QUERY", id.clone(), StoredValue::reference(id.as_str()));
                        }
                        cache.put(id.as_str(), "value", StoredValue::scalar(i));
                        cache.gc(GcOptions::default());
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        cache.gc(GcOptions::default());
        let stats = cache.stats();
        // ROOT_QUERY plus the 13 even items of each thread
        assert_eq!(stats.records, 1 + 4 * 13);
        assert_eq!(stats.dangling_references, 0);
    }

    #[test]
    fn test_with_runs_under_one_lock() {
        let cache = SharedCache::default();
        let id = cache.with(|inner| {
            inner
                .write_entity(&json!({ "__typename": "Person", "id": 1, "name": "Ada" }))
                .unwrap()
        });
        assert_eq!(cache.get(id.as_str(), "name"), Some(StoredValue::scalar("Ada")));
    }
}
