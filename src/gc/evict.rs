//! Targeted removal of a record or of single fields
//!
//! Eviction never cascades. Records that pointed at an evicted id keep a
//! dangling reference; run a collection afterwards to reclaim anything the
//! eviction made unreachable.

use crate::graph::RecordId;
use crate::policies::FieldPolicyRegistry;
use crate::storage::NormalizedStore;
use serde_json::{Map, Value};

/// What to evict
#[derive(Debug, Clone, PartialEq)]
pub struct EvictSpec {
    pub id: RecordId,
    pub field_name: Option<String>,
    pub args: Option<Map<String, Value>>,
}

impl EvictSpec {
    /// Evict a whole record
    pub fn record(id: impl Into<RecordId>) -> Self {
        Self {
            id: id.into(),
            field_name: None,
            args: None,
        }
    }

    /// Evict every key of a field, whatever its arguments
    pub fn field(id: impl Into<RecordId>, field_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            field_name: Some(field_name.into()),
            args: None,
        }
    }

    /// Narrow a field eviction to the key derived from `args`
    pub fn with_args(mut self, args: Map<String, Value>) -> Self {
        self.args = Some(args);
        self
    }
}

/// What an eviction removed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Eviction {
    pub record_removed: bool,
    pub field_keys: Vec<String>,
}

impl Eviction {
    /// True if anything was removed
    pub fn any(&self) -> bool {
        self.record_removed || !self.field_keys.is_empty()
    }
}

/// Applies [`EvictSpec`]s to a store
pub struct Evictor<'a> {
    policies: &'a FieldPolicyRegistry,
}

impl<'a> Evictor<'a> {
    pub fn new(policies: &'a FieldPolicyRegistry) -> Self {
        Self { policies }
    }

    pub fn evict(&self, store: &mut NormalizedStore, spec: &EvictSpec) -> Eviction {
        let id = spec.id.as_str();

        let Some(field_name) = spec.field_name.as_deref() else {
            let record_removed = store.delete_record(id);
            tracing::debug!(%id, record_removed, "Evicted record");
            return Eviction {
                record_removed,
                field_keys: Vec::new(),
            };
        };

        let keys: Vec<String> = match &spec.args {
            Some(args) => {
                let typename = store
                    .typename_of(id)
                    .or_else(|| spec.id.typename())
                    .unwrap_or_default();
                vec![self
                    .policies
                    .compute_field_key(typename, field_name, Some(args))]
            }
            None => store
                .live_keys(id)
                .filter(|key| fieldkey::field_name_of(key) == field_name)
                .map(str::to_string)
                .collect(),
        };

        let field_keys: Vec<String> = keys
            .into_iter()
            .filter(|key| store.delete_field(id, key))
            .collect();

        tracing::debug!(%id, field_name, removed = field_keys.len(), "Evicted field");
        Eviction {
            record_removed: false,
            field_keys,
        }
    }
}
