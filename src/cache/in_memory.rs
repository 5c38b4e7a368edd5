//! Single-threaded cache facade
//!
//! Ties the store, policies, retention, and memoized results together so
//! every mutation invalidates exactly the result trees that depended on the
//! records it touched.

use super::reader::{typename_for, ReadRequest, TreeReader};
use super::writer::{StagedWrite, WriteRequest};
use crate::config::{validate_config_result, CacheConfig};
use crate::gc::{EvictSpec, Evictor, GarbageCollector, GcOptions, RetentionRegistry};
use crate::graph::{RecordId, StoredValue};
use crate::policies::{FieldPolicy, FieldPolicyRegistry, FieldTarget, PolicyExecutor, TypePolicy};
use crate::results::{CachedResult, ReadResult, ResultCache, Selection};
use crate::storage::{NormalizedStore, Snapshot};
use crate::{CacheError, Result};
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::HashSet;

/// Outcome of a [`InMemoryCache::modify`] callback for one field key
#[derive(Debug, Clone, PartialEq)]
pub enum Modification {
    Keep,
    Replace(StoredValue),
    Delete,
}

/// Summary counts over the store
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub records: usize,
    pub fields: usize,
    pub dangling_references: usize,
    pub retained: usize,
    pub result_entries: usize,
    pub canonical_objects: usize,
}

/// Normalized cache with policies, retention, and memoized reads
#[derive(Debug)]
pub struct InMemoryCache {
    config: CacheConfig,
    root_ids: Vec<RecordId>,
    store: NormalizedStore,
    retention: RetentionRegistry,
    policies: FieldPolicyRegistry,
    executor: PolicyExecutor,
    results: ResultCache,
}

impl InMemoryCache {
    /// Create a cache from a validated configuration
    pub fn new(config: CacheConfig) -> Result<Self> {
        validate_config_result(&config)?;

        tracing::debug!(
            roots = ?config.root_ids,
            canonize = config.canonize_results,
            "Creating cache"
        );

        Ok(Self::from_valid_config(config))
    }

    fn from_valid_config(config: CacheConfig) -> Self {
        Self {
            root_ids: config.root_record_ids(),
            results: ResultCache::new(config.result_cache_max_size, config.canonize_results),
            store: NormalizedStore::new(),
            retention: RetentionRegistry::new(),
            policies: FieldPolicyRegistry::new(),
            executor: PolicyExecutor::new(),
            config,
        }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Read-only view of the store
    pub fn store(&self) -> &NormalizedStore {
        &self.store
    }

    pub fn policies(&self) -> &FieldPolicyRegistry {
        &self.policies
    }

    pub fn register_policy(
        &mut self,
        typename: impl Into<String>,
        field_name: impl Into<String>,
        policy: FieldPolicy,
    ) {
        self.policies.register(typename, field_name, policy);
    }

    pub fn register_type_policy(&mut self, typename: impl Into<String>, policy: TypePolicy) {
        self.policies.register_type(typename, policy);
    }

    /// Id an object would be stored under, if it can be identified
    pub fn identify(&self, object: &Value) -> Option<RecordId> {
        self.policies.identify(object.as_object()?)
    }

    // ---- raw store access ----

    pub fn get(&self, id: &str, field_key: &str) -> Option<&StoredValue> {
        self.store.get(id, field_key)
    }

    /// Store a value under an exact field key, bypassing merge functions
    pub fn put(&mut self, id: impl Into<RecordId>, field_key: impl Into<String>, value: StoredValue) {
        let id = id.into();
        self.store.put(id.clone(), field_key, value);
        self.results.invalidate([&id]);
    }

    pub fn delete_field(&mut self, id: impl Into<RecordId>, field_key: &str) -> bool {
        let id = id.into();
        let deleted = self.store.delete_field(id.as_str(), field_key);
        if deleted {
            self.executor.drop_field(&id, field_key);
            self.results.invalidate([&id]);
        }
        deleted
    }

    pub fn delete_record(&mut self, id: impl Into<RecordId>) -> bool {
        let id = id.into();
        let deleted = self.store.delete_record(id.as_str());
        if deleted {
            self.executor.drop_records(&HashSet::from([id.clone()]));
            self.results.invalidate([&id]);
        }
        deleted
    }

    pub fn ids(&self) -> impl Iterator<Item = &RecordId> + '_ {
        self.store.ids()
    }

    // ---- writes ----

    /// Write one field through its merge function
    pub fn write_field(&mut self, request: WriteRequest) -> Result<()> {
        let mut staged = StagedWrite::new(
            &self.store,
            &self.policies,
            &mut self.executor,
            &request.variables,
            self.config.add_typename,
        );
        staged.field(
            &request.id,
            &request.typename,
            &request.field_name,
            request.args.as_ref(),
            request.value,
        )?;
        let fields = staged.into_staged();
        self.apply(fields);
        Ok(())
    }

    /// Normalize a JSON object into the record `id`
    ///
    /// Either every field of the write lands in the store or none does.
    pub fn write_object(&mut self, id: impl Into<RecordId>, typename: &str, data: &Value) -> Result<()> {
        self.write_object_with(id, typename, data, &Map::new())
    }

    /// Like [`write_object`](Self::write_object) with variables visible to merge functions
    pub fn write_object_with(
        &mut self,
        id: impl Into<RecordId>,
        typename: &str,
        data: &Value,
        variables: &Map<String, Value>,
    ) -> Result<()> {
        let id = id.into();
        let object = data.as_object().ok_or_else(|| {
            CacheError::InvalidArgument(format!("Data written to {} must be an object", id))
        })?;

        let mut staged = StagedWrite::new(
            &self.store,
            &self.policies,
            &mut self.executor,
            variables,
            self.config.add_typename,
        );
        staged.object(&id, typename, object)?;
        let fields = staged.into_staged();
        self.apply(fields);
        Ok(())
    }

    /// Write an identifiable object under its own id
    pub fn write_entity(&mut self, data: &Value) -> Result<RecordId> {
        let object = data.as_object().ok_or_else(|| {
            CacheError::InvalidArgument("Entity data must be an object".to_string())
        })?;
        let id = self.policies.identify(object).ok_or_else(|| {
            CacheError::InvalidArgument("Entity data cannot be identified".to_string())
        })?;
        let typename = object
            .get(crate::storage::TYPENAME_FIELD)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        self.write_object(id.clone(), &typename, data)?;
        Ok(id)
    }

    fn apply(&mut self, fields: super::writer::StagedFields) {
        let mut touched = HashSet::new();
        let count = fields.len();
        for ((id, key), value) in fields {
            touched.insert(id.clone());
            self.store.put(id, key, value);
        }
        self.results.invalidate(&touched);
        tracing::debug!(fields = count, records = touched.len(), "Applied write");
    }

    // ---- reads ----

    /// Read one field through its read function
    pub fn read_field(&mut self, request: &ReadRequest) -> Result<Option<StoredValue>> {
        let typename = match request.typename.as_deref() {
            Some(typename) => typename,
            None => typename_for(&self.store, &request.id),
        };
        let target = FieldTarget {
            id: &request.id,
            typename,
            field_name: &request.field_name,
            args: request.args.as_ref(),
            variables: &request.variables,
        };
        self.executor.read(&self.store, &self.policies, target)
    }

    /// Read a selection rooted at `root`, memoizing the result tree
    pub fn read_tree(
        &mut self,
        root: impl Into<RecordId>,
        selection: &Selection,
        variables: &Map<String, Value>,
    ) -> Result<ReadResult> {
        let root = root.into();
        let key = ResultCache::key(&root, selection, variables);

        if let Some(hit) = self.results.lookup(&key) {
            tracing::trace!(%root, "Result cache hit");
            return Ok(ReadResult {
                tree: hit.tree,
                missing: hit.missing,
                from_cache: true,
            });
        }

        let mut reader = TreeReader::new(
            &self.store,
            &self.policies,
            &mut self.executor,
            variables,
            self.results.canonicalizer_mut(),
        );
        let tree = reader.read_root(&root, selection)?;
        let (dependencies, missing) = reader.into_parts();

        self.results.insert(
            key,
            CachedResult {
                tree: tree.clone(),
                missing: missing.clone(),
            },
            dependencies,
        );

        Ok(ReadResult {
            tree,
            missing,
            from_cache: false,
        })
    }

    // ---- retention and collection ----

    pub fn retain(&mut self, id: impl Into<RecordId>) -> usize {
        let id = id.into();
        let count = self.retention.retain(id.clone());
        tracing::debug!(%id, count, "Retained");
        count
    }

    pub fn release(&mut self, id: &str) -> usize {
        let count = self.retention.release(id);
        tracing::debug!(id, count, "Released");
        count
    }

    pub fn retained_ids(&self) -> HashSet<RecordId> {
        self.retention.retained_ids()
    }

    /// Ids a collection would keep right now
    pub fn reachable(&self) -> HashSet<RecordId> {
        GarbageCollector::new(&self.root_ids, &self.retention).reachable(&self.store)
    }

    /// Remove unreachable records, returning their ids
    pub fn gc(&mut self, options: GcOptions) -> Vec<RecordId> {
        let removed = GarbageCollector::new(&self.root_ids, &self.retention).collect(
            &mut self.store,
            &mut self.results,
            options,
        );
        self.executor.drop_records(&removed.iter().cloned().collect());
        removed
    }

    /// Remove a record or some of its fields; returns true if anything was removed
    pub fn evict(&mut self, spec: &EvictSpec) -> bool {
        let eviction = Evictor::new(&self.policies).evict(&mut self.store, spec);
        if !eviction.any() {
            return false;
        }

        if eviction.record_removed {
            self.executor.drop_records(&HashSet::from([spec.id.clone()]));
        }
        for key in &eviction.field_keys {
            self.executor.drop_field(&spec.id, key);
        }
        self.results.invalidate([&spec.id]);
        true
    }

    /// Rewrite every live key of `field_name` on a record
    ///
    /// `f` receives the storage key and the current value. Returns true if
    /// any key was replaced or deleted.
    pub fn modify<F>(&mut self, id: &str, field_name: &str, mut f: F) -> bool
    where
        F: FnMut(&str, &StoredValue) -> Modification,
    {
        let keys: Vec<String> = self
            .store
            .live_keys(id)
            .filter(|key| fieldkey::field_name_of(key) == field_name)
            .map(str::to_string)
            .collect();

        let record_id = RecordId::new(id);
        let mut changed = false;
        for key in keys {
            let Some(current) = self.store.get_live(id, &key) else {
                continue;
            };
            match f(&key, current) {
                Modification::Keep => {}
                Modification::Replace(value) => {
                    if self.store.get_live(id, &key) != Some(&value) {
                        self.store.put(record_id.clone(), key, value);
                        changed = true;
                    }
                }
                Modification::Delete => {
                    self.store.delete_field(id, &key);
                    self.executor.drop_field(&record_id, &key);
                    changed = true;
                }
            }
        }

        if changed {
            self.results.invalidate([&record_id]);
        }
        changed
    }

    // ---- snapshots ----

    pub fn extract(&self) -> Snapshot {
        self.store.extract()
    }

    /// Replace the store contents, dropping every memoized result and policy scratch
    pub fn restore(&mut self, snapshot: Snapshot) {
        self.store.restore(snapshot);
        self.results.clear();
        self.results.reset_identities();
        self.executor.clear();
        tracing::info!(records = self.store.len(), "Restored cache snapshot");
    }

    pub fn stats(&self) -> CacheStats {
        let mut stats = CacheStats {
            records: self.store.len(),
            retained: self.retention.retained_ids().len(),
            result_entries: self.results.len(),
            canonical_objects: self.results.canonical_len(),
            ..CacheStats::default()
        };

        for id in self.store.ids() {
            for key in self.store.live_keys(id.as_str()) {
                stats.fields += 1;
                if let Some(value) = self.store.get_live(id.as_str(), key) {
                    value.for_each_reference(&mut |r| {
                        if !self.store.contains(r.id.as_str()) {
                            stats.dangling_references += 1;
                        }
                    });
                }
            }
        }

        stats
    }
}

impl Default for InMemoryCache {
    /// Cache with the default config, which always validates
    fn default() -> Self {
        Self::from_valid_config(CacheConfig::default())
    }
}
