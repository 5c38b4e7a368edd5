//! Staged writes
//!
//! Every merge of a write runs against the unmodified store plus the values
//! already staged by the same write. Nothing reaches the store until every
//! merge has succeeded, so a failing merge leaves it untouched.

use crate::graph::{RecordId, StoredValue};
use crate::policies::{FieldPolicyRegistry, FieldTarget, PolicyExecutor};
use crate::storage::{NormalizedStore, TYPENAME_FIELD};
use crate::Result;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashSet};

/// A single-field write
#[derive(Debug, Clone)]
pub struct WriteRequest {
    pub id: RecordId,
    pub typename: String,
    pub field_name: String,
    pub args: Option<Map<String, Value>>,
    pub variables: Map<String, Value>,
    pub value: StoredValue,
}

impl WriteRequest {
    pub fn new(
        id: impl Into<RecordId>,
        typename: impl Into<String>,
        field_name: impl Into<String>,
        value: StoredValue,
    ) -> Self {
        Self {
            id: id.into(),
            typename: typename.into(),
            field_name: field_name.into(),
            args: None,
            variables: Map::new(),
            value,
        }
    }

    /// Set arguments from a JSON object; non-object values are ignored
    pub fn args(mut self, args: Value) -> Self {
        if let Value::Object(map) = args {
            self.args = Some(map);
        }
        self
    }

    pub fn variables(mut self, variables: Map<String, Value>) -> Self {
        self.variables = variables;
        self
    }
}

pub(crate) type StagedFields = BTreeMap<(RecordId, String), StoredValue>;

pub(crate) struct StagedWrite<'a> {
    store: &'a NormalizedStore,
    policies: &'a FieldPolicyRegistry,
    executor: &'a mut PolicyExecutor,
    variables: &'a Map<String, Value>,
    add_typename: bool,
    staged: StagedFields,
    pending: HashSet<RecordId>,
}

impl<'a> StagedWrite<'a> {
    pub fn new(
        store: &'a NormalizedStore,
        policies: &'a FieldPolicyRegistry,
        executor: &'a mut PolicyExecutor,
        variables: &'a Map<String, Value>,
        add_typename: bool,
    ) -> Self {
        Self {
            store,
            policies,
            executor,
            variables,
            add_typename,
            staged: StagedFields::new(),
            pending: HashSet::new(),
        }
    }

    /// Merge one incoming value into its field
    pub fn field(
        &mut self,
        id: &RecordId,
        typename: &str,
        field_name: &str,
        args: Option<&Map<String, Value>>,
        incoming: StoredValue,
    ) -> Result<()> {
        let key = self.policies.compute_field_key(typename, field_name, args);
        let slot = (id.clone(), key);

        let existing = self
            .staged
            .get(&slot)
            .or_else(|| self.store.get(id.as_str(), &slot.1));
        let target = FieldTarget {
            id,
            typename,
            field_name,
            args,
            variables: self.variables,
        };

        let merged = self.executor.merge(
            self.store,
            self.policies,
            target,
            &slot.1,
            existing,
            incoming,
            Some(&self.pending),
        )?;

        self.staged.insert(slot, merged);
        Ok(())
    }

    /// Normalize a JSON object into the record `id`
    ///
    /// Keys may carry arguments in field key form, e.g. `feed({"offset":0})`.
    /// Nested objects that can be identified become records of their own and
    /// are linked by reference; the rest are embedded.
    pub fn object(&mut self, id: &RecordId, typename: &str, object: &Map<String, Value>) -> Result<()> {
        self.pending.insert(id.clone());

        if self.add_typename {
            self.field(id, typename, TYPENAME_FIELD, None, StoredValue::scalar(typename))?;
        }

        for (name, value) in object {
            if name == TYPENAME_FIELD {
                continue;
            }
            let (field_name, args) = fieldkey::split_key(name)?;
            let incoming = self.normalize(value)?;
            self.field(id, typename, field_name, args.as_ref(), incoming)?;
        }

        Ok(())
    }

    fn normalize(&mut self, value: &Value) -> Result<StoredValue> {
        match value {
            Value::Array(items) => Ok(StoredValue::List(
                items
                    .iter()
                    .map(|item| self.normalize(item))
                    .collect::<Result<Vec<_>>>()?,
            )),
            Value::Object(map) => {
                if let Some(id) = map.get("__ref").and_then(Value::as_str) {
                    if map.len() == 1 {
                        return Ok(StoredValue::reference(id));
                    }
                }

                if let Some(child_id) = self.policies.identify(map) {
                    let child_typename = map
                        .get(TYPENAME_FIELD)
                        .and_then(Value::as_str)
                        .unwrap_or_default();
                    self.object(&child_id, child_typename, map)?;
                    return Ok(StoredValue::reference(child_id));
                }

                let mut fields = BTreeMap::new();
                for (name, value) in map {
                    fields.insert(name.clone(), self.normalize(value)?);
                }
                Ok(StoredValue::Object(fields))
            }
            other => Ok(StoredValue::Scalar(other.clone())),
        }
    }

    /// Staged values, ready to apply
    pub fn into_staged(self) -> StagedFields {
        self.staged
    }
}
