//! Normalized record store
//!
//! Pure key/value storage: record id -> field key -> [`StoredValue`].
//! Reference targets are never validated at write time, so a record may be
//! written before (or without) the records it points at.

use super::Snapshot;
use crate::graph::{RecordId, StoredValue};
use std::collections::BTreeMap;

/// Fields of a single record, keyed by field key
pub type Record = BTreeMap<String, StoredValue>;

/// Field key holding a record's typename
pub const TYPENAME_FIELD: &str = "__typename";

/// Graph of normalized records
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NormalizedStore {
    records: BTreeMap<RecordId, Record>,
}

impl NormalizedStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Read one field
    ///
    /// Returns `None` when the record or the field was never written, and
    /// `Some(StoredValue::Absent)` when the field was deleted.
    pub fn get(&self, id: &str, field_key: &str) -> Option<&StoredValue> {
        self.records.get(id)?.get(field_key)
    }

    /// Read one field, treating deleted fields as missing
    pub fn get_live(&self, id: &str, field_key: &str) -> Option<&StoredValue> {
        self.get(id, field_key).filter(|v| !v.is_absent())
    }

    /// Write one field, creating the record on first write
    pub fn put(&mut self, id: impl Into<RecordId>, field_key: impl Into<String>, value: StoredValue) {
        self.records
            .entry(id.into())
            .or_default()
            .insert(field_key.into(), value);
    }

    /// Mark a field as deleted
    ///
    /// Returns true if the field held a live value. Unknown records are left
    /// alone rather than created.
    pub fn delete_field(&mut self, id: &str, field_key: &str) -> bool {
        let Some(record) = self.records.get_mut(id) else {
            return false;
        };

        match record.get_mut(field_key) {
            Some(value) if !value.is_absent() => {
                *value = StoredValue::Absent;
                true
            }
            _ => false,
        }
    }

    /// Remove a record and all of its fields
    ///
    /// Returns true if the record existed.
    pub fn delete_record(&mut self, id: &str) -> bool {
        self.records.remove(id).is_some()
    }

    /// All record ids
    ///
    /// The iterator borrows the store, so no mutation can interleave with a
    /// traversal of it.
    pub fn ids(&self) -> impl Iterator<Item = &RecordId> + '_ {
        self.records.keys()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.records.contains_key(id)
    }

    /// All fields of a record, including deleted ones
    pub fn record(&self, id: &str) -> Option<&Record> {
        self.records.get(id)
    }

    /// Field keys of a record that hold live values
    pub fn live_keys<'a>(&'a self, id: &str) -> impl Iterator<Item = &'a str> + 'a {
        self.records
            .get(id)
            .into_iter()
            .flat_map(|record| record.iter())
            .filter(|(_, v)| !v.is_absent())
            .map(|(k, _)| k.as_str())
    }

    /// Typename stored on a record's `__typename` field
    pub fn typename_of(&self, id: &str) -> Option<&str> {
        self.get_live(id, TYPENAME_FIELD)?.as_scalar()?.as_str()
    }

    /// Number of records
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Remove every record
    pub fn clear(&mut self) {
        self.records.clear();
    }

    /// Copy the whole store into a serializable snapshot
    pub fn extract(&self) -> Snapshot {
        Snapshot::new(self.records.clone())
    }

    /// Replace the store contents with a snapshot
    pub fn restore(&mut self, snapshot: Snapshot) {
        self.records = snapshot.records;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_put_creates_record() {
        let mut store = NormalizedStore::new();
        assert!(!store.contains("Person:1"));

        store.put("Person:1", "name", StoredValue::scalar("Ada"));
        assert!(store.contains("Person:1"));
        assert_eq!(store.get("Person:1", "name"), Some(&StoredValue::scalar("Ada")));
        assert_eq!(store.get("Person:1", "age"), None);
    }

    #[test]
    fn test_forward_references_are_legal() {
        let mut store = NormalizedStore::new();
        store.put("ROOT_QUERY", "me", StoredValue::reference("Person:1"));

        assert!(!store.contains("Person:1"));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_delete_field_sets_absent() {
        let mut store = NormalizedStore::new();
        store.put("D", "offspring", StoredValue::references(["E"]));
        store.put("D", "name", StoredValue::scalar("d"));

        assert!(store.delete_field("D", "offspring"));
        assert_eq!(store.get("D", "offspring"), Some(&StoredValue::Absent));
        assert_eq!(store.get_live("D", "offspring"), None);
        assert_eq!(store.get("D", "name"), Some(&StoredValue::scalar("d")));

        // Second delete finds nothing live
        assert!(!store.delete_field("D", "offspring"));
        assert!(!store.delete_field("missing", "offspring"));
        assert!(!store.contains("missing"));
    }

    #[test]
    fn test_delete_record() {
        let mut store = NormalizedStore::new();
        store.put("A", "x", StoredValue::scalar(1));

        assert!(store.delete_record("A"));
        assert!(!store.delete_record("A"));
        assert!(store.is_empty());
    }

    #[test]
    fn test_live_keys_and_typename() {
        let mut store = NormalizedStore::new();
        store.put("Person:1", TYPENAME_FIELD, StoredValue::scalar("Person"));
        store.put("Person:1", "name", StoredValue::scalar("Ada"));
        store.put("Person:1", "age", StoredValue::scalar(36));
        store.delete_field("Person:1", "age");

        let keys: Vec<&str> = store.live_keys("Person:1").collect();
        assert_eq!(keys, vec!["__typename", "name"]);
        assert_eq!(store.typename_of("Person:1"), Some("Person"));
        assert_eq!(store.typename_of("ROOT_QUERY"), None);
    }

    #[test]
    fn test_extract_and_restore() {
        let mut store = NormalizedStore::new();
        store.put("A", "b", StoredValue::reference("B"));
        let snapshot = store.extract();

        let mut restored = NormalizedStore::new();
        restored.restore(snapshot);
        assert_eq!(restored, store);
    }
}
