//! Invokes read and merge functions with a well-defined context

use super::context::{FieldContext, FieldStorage};
use super::FieldPolicyRegistry;
use crate::graph::{RecordId, StoredValue};
use crate::storage::NormalizedStore;
use crate::{CacheError, Result};
use serde_json::{Map, Value};
use std::collections::{HashMap, HashSet};

/// Field being read or written
#[derive(Debug, Clone, Copy)]
pub struct FieldTarget<'a> {
    pub id: &'a RecordId,
    pub typename: &'a str,
    pub field_name: &'a str,
    pub args: Option<&'a Map<String, Value>>,
    pub variables: &'a Map<String, Value>,
}

/// Runs field policies and owns their per-field scratch storage
#[derive(Debug, Default)]
pub struct PolicyExecutor {
    storage: HashMap<(RecordId, String), FieldStorage>,
}

impl PolicyExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read a field through its policy
    ///
    /// Without a custom read, the stored value passes through unchanged,
    /// except that list elements failing `can_read` are dropped.
    pub fn read(
        &mut self,
        store: &NormalizedStore,
        policies: &FieldPolicyRegistry,
        target: FieldTarget<'_>,
    ) -> Result<Option<StoredValue>> {
        self.read_tracked(store, policies, target, &mut HashSet::new())
    }

    /// Like `read`, also collecting the ids the policy looked at
    pub(crate) fn read_tracked(
        &mut self,
        store: &NormalizedStore,
        policies: &FieldPolicyRegistry,
        target: FieldTarget<'_>,
        dependencies: &mut HashSet<RecordId>,
    ) -> Result<Option<StoredValue>> {
        let key = policies.compute_field_key(target.typename, target.field_name, target.args);
        let existing = store.get_live(target.id.as_str(), &key);
        let policy = policies.get(target.typename, target.field_name);

        let storage = self.storage_for(target.id, &key);
        let mut ctx = FieldContext::new(
            target.typename,
            target.field_name,
            &key,
            target.args,
            target.variables,
            storage,
            store,
            policies,
            None,
        );

        let value = match policy.and_then(|p| p.read.as_ref()) {
            Some(read) => read(existing, &mut ctx)
                .map_err(|e| CacheError::policy(target.typename, target.field_name, e)),
            None => Ok(existing.map(|value| compact(value, &ctx))),
        };
        dependencies.extend(ctx.into_touched());
        value
    }

    /// Compute the value a write should store
    ///
    /// Without a custom merge, incoming overwrites existing. Nothing is
    /// written here; the caller stores the returned value.
    #[allow(clippy::too_many_arguments)]
    pub fn merge(
        &mut self,
        store: &NormalizedStore,
        policies: &FieldPolicyRegistry,
        target: FieldTarget<'_>,
        key: &str,
        existing: Option<&StoredValue>,
        incoming: StoredValue,
        pending: Option<&HashSet<RecordId>>,
    ) -> Result<StoredValue> {
        let Some(merge) = policies
            .get(target.typename, target.field_name)
            .and_then(|p| p.merge.as_ref())
        else {
            return Ok(incoming);
        };

        let existing = existing.filter(|v| !v.is_absent());
        let storage = self.storage_for(target.id, key);
        let mut ctx = FieldContext::new(
            target.typename,
            target.field_name,
            key,
            target.args,
            target.variables,
            storage,
            store,
            policies,
            pending,
        );

        merge(existing, incoming, &mut ctx)
            .map_err(|e| CacheError::policy(target.typename, target.field_name, e))
    }

    fn storage_for(&mut self, id: &RecordId, key: &str) -> &mut FieldStorage {
        self.storage
            .entry((id.clone(), key.to_string()))
            .or_default()
    }

    /// Drop scratch storage of one field key
    pub fn drop_field(&mut self, id: &RecordId, key: &str) {
        self.storage.remove(&(id.clone(), key.to_string()));
    }

    /// Drop scratch storage of every field of the given records
    pub fn drop_records(&mut self, ids: &HashSet<RecordId>) {
        if ids.is_empty() {
            return;
        }
        self.storage.retain(|(id, _), _| !ids.contains(id));
    }

    /// Drop all scratch storage
    pub fn clear(&mut self) {
        self.storage.clear();
    }
}

fn compact(value: &StoredValue, ctx: &FieldContext<'_>) -> StoredValue {
    match value {
        StoredValue::List(items) => StoredValue::List(
            items
                .iter()
                .filter(|item| ctx.can_read(item))
                .cloned()
                .collect(),
        ),
        other => other.clone(),
    }
}
