//! Memoized result trees with per-record dependency tracking

use super::canon::Canonicalizer;
use super::tree::{MissingField, ResultObject, Selection};
use crate::graph::RecordId;
use fieldkey::canonical_stringify;
use lru::LruCache;
use serde_json::{Map, Value};
use std::collections::{HashMap, HashSet};
use std::num::NonZeroUsize;
use std::sync::Arc;

/// Memoized tree plus everything needed to serve it again
#[derive(Debug, Clone)]
pub struct CachedResult {
    pub tree: Arc<ResultObject>,
    pub missing: Vec<MissingField>,
}

#[derive(Debug)]
struct Entry {
    result: CachedResult,
    dependencies: HashSet<RecordId>,
}

/// LRU cache of result trees keyed by (root id, selection, variables)
///
/// Each entry records the ids its read touched, including ids whose records
/// were missing at the time. Invalidating an id drops exactly the entries
/// that depended on it.
#[derive(Debug)]
pub struct ResultCache {
    entries: LruCache<String, Entry>,
    dependents: HashMap<RecordId, HashSet<String>>,
    canon: Option<Canonicalizer>,
}

impl ResultCache {
    /// Create a cache holding at most `capacity` trees (minimum 1)
    pub fn new(capacity: usize, canonize: bool) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: LruCache::new(capacity),
            dependents: HashMap::new(),
            canon: canonize.then(Canonicalizer::new),
        }
    }

    /// Build the lookup key for a read
    pub fn key(root: &RecordId, selection: &Selection, variables: &Map<String, Value>) -> String {
        format!(
            "{}|{}|{}",
            root,
            selection.fingerprint(),
            canonical_stringify(&Value::Object(variables.clone()))
        )
    }

    pub fn lookup(&mut self, key: &str) -> Option<CachedResult> {
        self.entries.get(key).map(|entry| entry.result.clone())
    }

    /// Memoize a tree with the ids it depended on
    pub fn insert(&mut self, key: String, result: CachedResult, dependencies: HashSet<RecordId>) {
        for id in &dependencies {
            self.dependents
                .entry(id.clone())
                .or_default()
                .insert(key.clone());
        }

        let entry = Entry {
            result,
            dependencies,
        };
        if let Some((old_key, old)) = self.entries.push(key.clone(), entry) {
            // Same-key replacement keeps the dependents just registered
            if old_key != key {
                tracing::trace!(key = %old_key, "Result cache entry evicted by capacity");
                self.forget_dependencies(&old_key, &old.dependencies);
            }
        }
    }

    fn forget_dependencies(&mut self, key: &str, dependencies: &HashSet<RecordId>) {
        for id in dependencies {
            if let Some(keys) = self.dependents.get_mut(id) {
                keys.remove(key);
                if keys.is_empty() {
                    self.dependents.remove(id);
                }
            }
        }
    }

    /// Drop every entry that depended on any of `ids`, returning how many were dropped
    pub fn invalidate<'i, I>(&mut self, ids: I) -> usize
    where
        I: IntoIterator<Item = &'i RecordId>,
    {
        let mut dropped = 0;
        for id in ids {
            let Some(keys) = self.dependents.remove(id) else {
                continue;
            };
            for key in keys {
                if let Some(entry) = self.entries.pop(&key) {
                    dropped += 1;
                    for dep in entry.dependencies.iter().filter(|dep| *dep != id) {
                        if let Some(others) = self.dependents.get_mut(dep) {
                            others.remove(&key);
                            if others.is_empty() {
                                self.dependents.remove(dep);
                            }
                        }
                    }
                }
            }
        }

        if dropped > 0 {
            tracing::debug!(dropped, "Invalidated result cache entries");
        }
        dropped
    }

    /// Drop every memoized tree
    pub fn clear(&mut self) {
        self.entries.clear();
        self.dependents.clear();
    }

    /// Clear the canonicalizer's sharing table
    ///
    /// Returns false when canonicalization is disabled.
    pub fn reset_identities(&mut self) -> bool {
        match self.canon.as_mut() {
            Some(canon) => {
                canon.reset();
                true
            }
            None => false,
        }
    }

    pub fn canonicalizer_mut(&mut self) -> Option<&mut Canonicalizer> {
        self.canon.as_mut()
    }

    /// Live objects in the canonical pool, 0 when canonicalization is off
    pub fn canonical_len(&self) -> usize {
        self.canon.as_ref().map_or(0, Canonicalizer::len)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result() -> CachedResult {
        CachedResult {
            tree: Arc::new(ResultObject::default()),
            missing: Vec::new(),
        }
    }

    fn deps(ids: &[&str]) -> HashSet<RecordId> {
        ids.iter().map(|s| RecordId::new(*s)).collect()
    }

    #[test]
    fn test_invalidate_is_per_id() {
        let mut cache = ResultCache::new(16, false);
        cache.insert("a".to_string(), result(), deps(&["ROOT_QUERY", "A"]));
        cache.insert("b".to_string(), result(), deps(&["ROOT_QUERY", "B"]));

        assert_eq!(cache.invalidate(&[RecordId::new("A")]), 1);
        assert!(cache.lookup("a").is_none());
        assert!(cache.lookup("b").is_some());

        assert_eq!(cache.invalidate(&[RecordId::new("ROOT_QUERY")]), 1);
        assert!(cache.is_empty());
        assert!(cache.dependents.is_empty());
    }

    #[test]
    fn test_capacity_evicts_least_recent() {
        let mut cache = ResultCache::new(1, false);
        cache.insert("a".to_string(), result(), deps(&["A"]));
        cache.insert("b".to_string(), result(), deps(&["B"]));

        assert_eq!(cache.len(), 1);
        assert!(cache.lookup("a").is_none());
        assert!(!cache.dependents.contains_key("A"));
    }

    #[test]
    fn test_reinsert_same_key_keeps_dependencies() {
        let mut cache = ResultCache::new(4, false);
        cache.insert("a".to_string(), result(), deps(&["A"]));
        cache.insert("a".to_string(), result(), deps(&["A"]));

        assert_eq!(cache.invalidate(&[RecordId::new("A")]), 1);
    }

    #[test]
    fn test_reset_identities_requires_canonicalization() {
        let mut plain = ResultCache::new(4, false);
        assert!(!plain.reset_identities());

        let mut canonical = ResultCache::new(4, true);
        assert!(canonical.reset_identities());
    }

    #[test]
    fn test_key_includes_variables() {
        let selection = Selection::new().field("name");
        let root = RecordId::new("ROOT_QUERY");

        let mut vars = Map::new();
        let empty = ResultCache::key(&root, &selection, &vars);
        vars.insert("id".to_string(), Value::from(1));
        let with_id = ResultCache::key(&root, &selection, &vars);

        assert_ne!(empty, with_id);
    }
}
