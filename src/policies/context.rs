//! Context handed to read and merge functions

use super::FieldPolicyRegistry;
use crate::graph::{RecordId, Reference, StoredValue};
use crate::storage::NormalizedStore;
use serde_json::{Map, Value};
use std::cell::RefCell;
use std::collections::HashSet;

/// Scratch space scoped to one (record, field key)
///
/// Lives until the field key or its record is deleted, evicted or collected.
pub type FieldStorage = Map<String, Value>;

/// Fixed-shape context built fresh for every read or merge call
///
/// The store is borrowed immutably, so policy functions cannot mutate it
/// while they run.
pub struct FieldContext<'a> {
    pub typename: &'a str,
    pub field_name: &'a str,
    pub field_key: &'a str,

    /// Canonicalized arguments (keys sorted)
    pub args: Option<&'a Map<String, Value>>,
    pub variables: &'a Map<String, Value>,
    pub storage: &'a mut FieldStorage,

    store: &'a NormalizedStore,
    policies: &'a FieldPolicyRegistry,
    pending: Option<&'a HashSet<RecordId>>,

    /// Ids looked at through `can_read` and `read_field`
    touched: RefCell<HashSet<RecordId>>,
}

impl<'a> FieldContext<'a> {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        typename: &'a str,
        field_name: &'a str,
        field_key: &'a str,
        args: Option<&'a Map<String, Value>>,
        variables: &'a Map<String, Value>,
        storage: &'a mut FieldStorage,
        store: &'a NormalizedStore,
        policies: &'a FieldPolicyRegistry,
        pending: Option<&'a HashSet<RecordId>>,
    ) -> Self {
        Self {
            typename,
            field_name,
            field_key,
            args,
            variables,
            storage,
            store,
            policies,
            pending,
            touched: RefCell::new(HashSet::new()),
        }
    }

    /// Consume the context, returning every record id it looked at
    pub(crate) fn into_touched(self) -> HashSet<RecordId> {
        self.touched.into_inner()
    }

    /// Look up one argument
    pub fn arg(&self, name: &str) -> Option<&'a Value> {
        self.args?.get(name)
    }

    /// False for `Absent` and for references whose target is missing
    ///
    /// Records being created by the write in progress count as present.
    pub fn can_read(&self, value: &StoredValue) -> bool {
        match value {
            StoredValue::Absent => false,
            StoredValue::Reference(r) => {
                self.touched.borrow_mut().insert(r.id.clone());
                self.exists(&r.id)
            }
            _ => true,
        }
    }

    fn exists(&self, id: &RecordId) -> bool {
        self.store.contains(id.as_str()) || self.pending.is_some_and(|p| p.contains(id))
    }

    /// Reference for an object literal carrying `__typename` and key fields
    pub fn to_reference(&self, object: &Value) -> Option<Reference> {
        let id = self.policies.identify(object.as_object()?)?;
        Some(Reference { id })
    }

    /// Raw value of an argument-less field on a referenced record
    ///
    /// The record becomes a dependency of any result built from this read.
    pub fn read_field(&self, field_name: &str, from: &Reference) -> Option<&'a StoredValue> {
        self.touched.borrow_mut().insert(from.id.clone());
        self.store.get_live(from.id.as_str(), field_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_can_read() {
        let mut store = NormalizedStore::new();
        store.put("Person:1", "name", StoredValue::scalar("Ada"));
        let policies = FieldPolicyRegistry::new();
        let variables = Map::new();
        let mut storage = FieldStorage::new();
        let pending: HashSet<RecordId> = [RecordId::new("Person:3")].into_iter().collect();

        let ctx = FieldContext::new(
            "Query", "people", "people", None, &variables, &mut storage, &store, &policies,
            Some(&pending),
        );

        assert!(ctx.can_read(&StoredValue::reference("Person:1")));
        assert!(!ctx.can_read(&StoredValue::reference("Person:2")));
        assert!(ctx.can_read(&StoredValue::reference("Person:3")));
        assert!(!ctx.can_read(&StoredValue::Absent));
        assert!(ctx.can_read(&StoredValue::scalar(json!(null))));
        assert!(ctx.can_read(&StoredValue::references(["Person:2"])));
    }

    #[test]
    fn test_to_reference_and_read_field() {
        let mut store = NormalizedStore::new();
        store.put("Person:1", "name", StoredValue::scalar("Ada"));
        let policies = FieldPolicyRegistry::new();
        let variables = Map::new();
        let mut storage = FieldStorage::new();
        let args = json!({ "id": 1 }).as_object().cloned().unwrap();

        let ctx = FieldContext::new(
            "Query", "person", "person", Some(&args), &variables, &mut storage, &store,
            &policies, None,
        );

        let reference = ctx
            .to_reference(&json!({ "__typename": "Person", "id": ctx.arg("id").unwrap() }))
            .unwrap();
        assert_eq!(reference, Reference::new("Person:1"));
        assert_eq!(
            ctx.read_field("name", &reference),
            Some(&StoredValue::scalar("Ada"))
        );
        assert!(ctx.to_reference(&json!({ "name": "no type" })).is_none());
    }

    #[test]
    fn test_lookups_are_recorded_as_touched() {
        let mut store = NormalizedStore::new();
        store.put("Person:1", "name", StoredValue::scalar("Ada"));
        let policies = FieldPolicyRegistry::new();
        let variables = Map::new();
        let mut storage = FieldStorage::new();

        let ctx = FieldContext::new(
            "Query", "people", "people", None, &variables, &mut storage, &store, &policies, None,
        );

        ctx.read_field("name", &Reference::new("Person:1"));
        ctx.read_field("name", &Reference::new("Person:9"));
        ctx.can_read(&StoredValue::reference("Person:2"));
        ctx.can_read(&StoredValue::scalar("not an id"));

        let touched = ctx.into_touched();
        let expected: HashSet<RecordId> = ["Person:1", "Person:9", "Person:2"]
            .into_iter()
            .map(RecordId::new)
            .collect();
        assert_eq!(touched, expected);
    }
}
