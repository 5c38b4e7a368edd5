//! Serializable store snapshots
//!
//! A snapshot is the whole record graph in one JSON document. External
//! persistence layers own where it is kept; the CLI reads and writes files.

use super::Record;
use crate::graph::RecordId;
use crate::{CacheError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

const SNAPSHOT_VERSION: u32 = 1;

/// Versioned copy of every record in a store
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Format version (for backwards compatibility)
    #[serde(default = "default_version")]
    pub version: u32,

    /// Records keyed by id
    #[serde(default)]
    pub records: BTreeMap<RecordId, Record>,
}

fn default_version() -> u32 {
    SNAPSHOT_VERSION
}

impl Snapshot {
    /// Wrap a set of records with the current version
    pub fn new(records: BTreeMap<RecordId, Record>) -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            records,
        }
    }

    /// Parse a snapshot from a JSON string
    pub fn from_json(json: &str) -> Result<Self> {
        let snapshot: Self = serde_json::from_str(json)
            .map_err(|e| CacheError::Snapshot(format!("Invalid snapshot: {}", e)))?;

        if snapshot.version != SNAPSHOT_VERSION {
            tracing::warn!(
                version = snapshot.version,
                "Unknown snapshot version, attempting to use it anyway"
            );
        }

        Ok(snapshot)
    }

    /// Serialize as pretty JSON
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Load a snapshot file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        tracing::debug!(path = %path.display(), "Loading snapshot");

        let content = fs::read_to_string(path)?;
        let snapshot = Self::from_json(&content)?;

        tracing::debug!(records = snapshot.records.len(), "Snapshot loaded");
        Ok(snapshot)
    }

    /// Write a snapshot file, creating parent directories as needed
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        tracing::debug!(path = %path.display(), records = self.records.len(), "Saving snapshot");
        fs::write(path, self.to_json()?)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::StoredValue;
    use tempfile::TempDir;

    fn sample() -> Snapshot {
        let mut person = Record::new();
        person.insert("name".to_string(), StoredValue::scalar("Ada"));
        person.insert("friend".to_string(), StoredValue::reference("Person:2"));

        let mut records = BTreeMap::new();
        records.insert(RecordId::new("Person:1"), person);
        Snapshot::new(records)
    }

    #[test]
    fn test_save_and_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("snapshot.json");

        let snapshot = sample();
        snapshot.save(&path).unwrap();

        let loaded = Snapshot::load(&path).unwrap();
        assert_eq!(loaded, snapshot);
    }

    #[test]
    fn test_missing_version_defaults() {
        let snapshot = Snapshot::from_json(r#"{ "records": {} }"#).unwrap();
        assert_eq!(snapshot.version, SNAPSHOT_VERSION);
        assert!(snapshot.records.is_empty());
    }

    #[test]
    fn test_invalid_snapshot() {
        let err = Snapshot::from_json("[1, 2]").unwrap_err();
        assert!(matches!(err, CacheError::Snapshot(_)));
    }
}
