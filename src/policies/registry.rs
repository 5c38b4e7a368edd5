//! Policy table keyed by (typename, field name)

use super::policy::{EffectiveKeyArgs, FieldPolicy, KeyFields, TypePolicy};
use crate::graph::RecordId;
use crate::storage::TYPENAME_FIELD;
use serde_json::{Map, Value};
use std::collections::HashMap;

/// Registered field and type policies
#[derive(Debug, Clone, Default)]
pub struct FieldPolicyRegistry {
    fields: HashMap<(String, String), FieldPolicy>,
    types: HashMap<String, TypePolicy>,
}

impl FieldPolicyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) the policy for `typename.field_name`
    pub fn register(
        &mut self,
        typename: impl Into<String>,
        field_name: impl Into<String>,
        policy: FieldPolicy,
    ) {
        let typename = typename.into();
        let field_name = field_name.into();
        tracing::debug!(%typename, %field_name, ?policy, "Registering field policy");
        self.fields.insert((typename, field_name), policy);
    }

    /// Register (or replace) the policy for a typename
    pub fn register_type(&mut self, typename: impl Into<String>, policy: TypePolicy) {
        self.types.insert(typename.into(), policy);
    }

    pub fn get(&self, typename: &str, field_name: &str) -> Option<&FieldPolicy> {
        self.fields
            .get(&(typename.to_string(), field_name.to_string()))
    }

    /// Derive the storage key of a field
    ///
    /// Identical arguments always canonicalize to the same key.
    pub fn compute_field_key(
        &self,
        typename: &str,
        field_name: &str,
        args: Option<&Map<String, Value>>,
    ) -> String {
        let key_args = self
            .get(typename, field_name)
            .map(FieldPolicy::effective_key_args)
            .unwrap_or(EffectiveKeyArgs::All);

        match key_args {
            EffectiveKeyArgs::All => fieldkey::field_key(field_name, args),
            EffectiveKeyArgs::None => field_name.to_string(),
            EffectiveKeyArgs::Names(names) => fieldkey::field_key_for(field_name, args, names),
        }
    }

    /// Derive a record id from an object carrying `__typename`
    pub fn identify(&self, object: &Map<String, Value>) -> Option<RecordId> {
        let typename = object.get(TYPENAME_FIELD)?.as_str()?;
        self.identify_as(typename, object)
    }

    /// Derive a record id for an object of a known typename
    ///
    /// Returns `None` when the object lacks the type's key fields.
    pub fn identify_as(&self, typename: &str, object: &Map<String, Value>) -> Option<RecordId> {
        let key_fields = self
            .types
            .get(typename)
            .map(|policy| &policy.key_fields)
            .unwrap_or(&KeyFields::Default);

        match key_fields {
            KeyFields::None => None,
            KeyFields::Fields(fields) => {
                let key = fieldkey::key_object(object, fields)?;
                Some(RecordId::new(format!("{}:{}", typename, key)))
            }
            KeyFields::Default => {
                let id = object.get("id").or_else(|| object.get("_id"))?;
                let id = match id {
                    Value::String(s) => s.clone(),
                    Value::Number(n) => n.to_string(),
                    _ => return None,
                };
                Some(RecordId::new(format!("{}:{}", typename, id)))
            }
        }
    }
}
