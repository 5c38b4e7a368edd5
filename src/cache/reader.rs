//! Reading fields and selections through policies

use crate::graph::{RecordId, StoredValue};
use crate::policies::{FieldPolicyRegistry, FieldTarget, PolicyExecutor};
use crate::results::{Canonicalizer, MissingField, ResultObject, ResultValue, Selection};
use crate::storage::NormalizedStore;
use crate::Result;
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::sync::Arc;

/// A single-field read
#[derive(Debug, Clone)]
pub struct ReadRequest {
    pub id: RecordId,

    /// Typename used for policy lookup; defaults to the record's `__typename`
    pub typename: Option<String>,
    pub field_name: String,
    pub args: Option<Map<String, Value>>,
    pub variables: Map<String, Value>,
}

impl ReadRequest {
    pub fn new(id: impl Into<RecordId>, field_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            typename: None,
            field_name: field_name.into(),
            args: None,
            variables: Map::new(),
        }
    }

    pub fn typename(mut self, typename: impl Into<String>) -> Self {
        self.typename = Some(typename.into());
        self
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

/// Typename for policy lookup: stored `__typename`, else implied by the id
pub(crate) fn typename_for<'s>(store: &'s NormalizedStore, id: &'s RecordId) -> &'s str {
    store
        .typename_of(id.as_str())
        .or_else(|| id.typename())
        .unwrap_or_default()
}

/// Walks a selection from a root record, collecting the ids it depends on
pub(crate) struct TreeReader<'a> {
    store: &'a NormalizedStore,
    policies: &'a FieldPolicyRegistry,
    executor: &'a mut PolicyExecutor,
    variables: &'a Map<String, Value>,
    canon: Option<&'a mut Canonicalizer>,
    dependencies: HashSet<RecordId>,
    missing: Vec<MissingField>,
}

impl<'a> TreeReader<'a> {
    pub fn new(
        store: &'a NormalizedStore,
        policies: &'a FieldPolicyRegistry,
        executor: &'a mut PolicyExecutor,
        variables: &'a Map<String, Value>,
        canon: Option<&'a mut Canonicalizer>,
    ) -> Self {
        Self {
            store,
            policies,
            executor,
            variables,
            canon,
            dependencies: HashSet::new(),
            missing: Vec::new(),
        }
    }

    pub fn read_root(&mut self, id: &RecordId, selection: &Selection) -> Result<Arc<ResultObject>> {
        let object = self.read_record(id, selection, "")?;
        Ok(self.finish(object))
    }

    /// Ids the read depended on, and the fields it could not satisfy
    pub fn into_parts(self) -> (HashSet<RecordId>, Vec<MissingField>) {
        (self.dependencies, self.missing)
    }

    fn finish(&mut self, object: ResultObject) -> Arc<ResultObject> {
        match self.canon.as_deref_mut() {
            Some(canon) => canon.admit(object),
            None => Arc::new(object),
        }
    }

    fn read_record(&mut self, id: &RecordId, selection: &Selection, path: &str) -> Result<ResultObject> {
        self.dependencies.insert(id.clone());
        let typename = typename_for(self.store, id);

        let mut object = ResultObject::default();
        for field in &selection.fields {
            let field_path = join(path, field.result_key());

            // Depend on everything the stored value points at, including
            // targets a read function filtered out
            let key = self
                .policies
                .compute_field_key(typename, &field.name, field.args.as_ref());
            if let Some(raw) = self.store.get_live(id.as_str(), &key) {
                raw.for_each_reference(&mut |r| {
                    self.dependencies.insert(r.id.clone());
                });
            }

            let target = FieldTarget {
                id,
                typename,
                field_name: &field.name,
                args: field.args.as_ref(),
                variables: self.variables,
            };
            let value = match self.executor.read_tracked(
                self.store,
                self.policies,
                target,
                &mut self.dependencies,
            )? {
                Some(value) => self.resolve(&value, field.selection.as_ref(), &field_path)?,
                None => {
                    self.missing.push(MissingField::new(
                        &field_path,
                        format!("Can't find field '{}' on {}", key, id),
                    ));
                    ResultValue::Null
                }
            };
            object.fields.insert(field.result_key().to_string(), value);
        }

        Ok(object)
    }

    fn resolve(
        &mut self,
        value: &StoredValue,
        selection: Option<&Selection>,
        path: &str,
    ) -> Result<ResultValue> {
        match value {
            StoredValue::Scalar(Value::Null) => Ok(ResultValue::Null),
            StoredValue::Scalar(v) => Ok(ResultValue::Scalar(v.clone())),
            StoredValue::Absent => {
                self.missing
                    .push(MissingField::new(path, "Field was deleted"));
                Ok(ResultValue::Null)
            }
            StoredValue::List(items) => {
                let mut out = Vec::with_capacity(items.len());
                for (i, item) in items.iter().enumerate() {
                    out.push(self.resolve(item, selection, &join(path, &i.to_string()))?);
                }
                Ok(ResultValue::List(out))
            }
            StoredValue::Reference(reference) => {
                self.dependencies.insert(reference.id.clone());
                let Some(selection) = selection else {
                    return Ok(ResultValue::Scalar(value.to_json()));
                };
                if !self.store.contains(reference.id.as_str()) {
                    self.missing.push(MissingField::new(
                        path,
                        format!("Dangling reference to {}", reference.id),
                    ));
                    return Ok(ResultValue::Null);
                }
                let object = self.read_record(&reference.id, selection, path)?;
                Ok(ResultValue::Object(self.finish(object)))
            }
            StoredValue::Object(fields) => {
                let Some(selection) = selection else {
                    return Ok(ResultValue::Scalar(value.to_json()));
                };
                let mut object = ResultObject::default();
                for field in &selection.fields {
                    let field_path = join(path, field.result_key());
                    let key = fieldkey::field_key(&field.name, field.args.as_ref());
                    let resolved = match fields.get(&key).filter(|v| !v.is_absent()) {
                        Some(v) => self.resolve(v, field.selection.as_ref(), &field_path)?,
                        None => {
                            self.missing.push(MissingField::new(
                                &field_path,
                                format!("Can't find field '{}' on embedded object", key),
                            ));
                            ResultValue::Null
                        }
                    };
                    object.fields.insert(field.result_key().to_string(), resolved);
                }
                Ok(ResultValue::Object(self.finish(object)))
            }
        }
    }
}

fn join(path: &str, segment: &str) -> String {
    if path.is_empty() {
        segment.to_string()
    } else {
        format!("{}.{}", path, segment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::results::FieldSelection;
    use serde_json::json;

    fn store() -> NormalizedStore {
        let mut store = NormalizedStore::new();
        store.put("ROOT_QUERY", "me", StoredValue::reference("Person:1"));
        store.put("ROOT_QUERY", "friends", StoredValue::references(["Person:2", "Person:9"]));
        store.put("Person:1", "__typename", StoredValue::scalar("Person"));
        store.put("Person:1", "name", StoredValue::scalar("Ada"));
        store.put("Person:2", "__typename", StoredValue::scalar("Person"));
        store.put("Person:2", "name", StoredValue::scalar("Alan"));
        store
    }

    #[test]
    fn test_reads_nested_selection_and_tracks_dependencies() {
        let store = store();
        let policies = FieldPolicyRegistry::new();
        let mut executor = PolicyExecutor::new();
        let variables = Map::new();

        let selection = Selection::new()
            .with(FieldSelection::new("me").select(Selection::new().field("name")))
            .with(FieldSelection::new("friends").select(Selection::new().field("name")));

        let mut reader = TreeReader::new(&store, &policies, &mut executor, &variables, None);
        let tree = reader
            .read_root(&RecordId::new("ROOT_QUERY"), &selection)
            .unwrap();
        let (deps, missing) = reader.into_parts();

        assert_eq!(
            tree.to_json(),
            json!({ "me": { "name": "Ada" }, "friends": [ { "name": "Alan" } ] })
        );
        assert!(missing.is_empty());
        // The compacted-away dangling id is still a dependency
        assert!(deps.contains("Person:9"));
        assert!(deps.contains("Person:1"));
    }

    #[test]
    fn test_missing_fields_are_reported() {
        let store = store();
        let policies = FieldPolicyRegistry::new();
        let mut executor = PolicyExecutor::new();
        let variables = Map::new();

        let selection = Selection::new()
            .with(FieldSelection::new("me").select(Selection::new().field("age")));

        let mut reader = TreeReader::new(&store, &policies, &mut executor, &variables, None);
        let tree = reader
            .read_root(&RecordId::new("ROOT_QUERY"), &selection)
            .unwrap();
        let (_, missing) = reader.into_parts();

        assert_eq!(tree.to_json(), json!({ "me": { "age": null } }));
        assert_eq!(missing.len(), 1);
        assert_eq!(missing[0].path, "me.age");
    }

    #[test]
    fn test_canonical_reads_share_objects() {
        let store = store();
        let policies = FieldPolicyRegistry::new();
        let mut executor = PolicyExecutor::new();
        let variables = Map::new();
        let mut canon = Canonicalizer::new();

        let selection = Selection::new()
            .with(FieldSelection::new("me").select(Selection::new().field("name")))
            .with(
                FieldSelection::new("me")
                    .alias("again")
                    .select(Selection::new().field("name")),
            );

        let mut reader =
            TreeReader::new(&store, &policies, &mut executor, &variables, Some(&mut canon));
        let tree = reader
            .read_root(&RecordId::new("ROOT_QUERY"), &selection)
            .unwrap();

        let me = tree.get("me").and_then(ResultValue::as_object).unwrap();
        let again = tree.get("again").and_then(ResultValue::as_object).unwrap();
        assert!(Arc::ptr_eq(me, again));
    }

    #[test]
    fn test_typename_for_falls_back_to_id() {
        let store = store();
        assert_eq!(typename_for(&store, &RecordId::new("Person:1")), "Person");
        assert_eq!(typename_for(&store, &RecordId::new("ROOT_QUERY")), "Query");
        assert_eq!(typename_for(&store, &RecordId::new("Thing:3")), "Thing");
        assert_eq!(typename_for(&store, &RecordId::new("opaque")), "");
    }
}
