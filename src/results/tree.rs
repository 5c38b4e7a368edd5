//! Selections and the result trees read through them

use fieldkey::canonical_stringify;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Fields to read from a record, built programmatically
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Selection {
    pub fields: Vec<FieldSelection>,
}

/// One selected field
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSelection {
    /// Field name as registered in policies
    pub name: String,

    /// Name used in the result tree (defaults to `name`)
    pub alias: Option<String>,

    /// Field arguments
    pub args: Option<Map<String, Value>>,

    /// Sub-selection applied to referenced or embedded objects
    pub selection: Option<Selection>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a leaf field without arguments
    pub fn field(mut self, name: impl Into<String>) -> Self {
        self.fields.push(FieldSelection::new(name));
        self
    }

    /// Add a fully specified field
    pub fn with(mut self, field: FieldSelection) -> Self {
        self.fields.push(field);
        self
    }

    /// Stable identity of this selection, used as part of result cache keys
    pub fn fingerprint(&self) -> String {
        let mut out = String::new();
        self.write_fingerprint(&mut out);
        out
    }

    fn write_fingerprint(&self, out: &mut String) {
        out.push('{');
        for (i, field) in self.fields.iter().enumerate() {
            if i > 0 {
                out.push(' ');
            }
            if let Some(alias) = &field.alias {
                out.push_str(alias);
                out.push(':');
            }
            out.push_str(&fieldkey::field_key(&field.name, field.args.as_ref()));
            if let Some(selection) = &field.selection {
                selection.write_fingerprint(out);
            }
        }
        out.push('}');
    }
}

impl FieldSelection {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            alias: None,
            args: None,
            selection: None,
        }
    }

    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    /// Set arguments from a JSON object; non-object values are ignored
    pub fn args(mut self, args: Value) -> Self {
        if let Value::Object(map) = args {
            self.args = Some(map);
        }
        self
    }

    pub fn select(mut self, selection: Selection) -> Self {
        self.selection = Some(selection);
        self
    }

    /// Key of this field in the result tree
    pub fn result_key(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.name)
    }
}

/// Value in a computed result tree
#[derive(Debug, Clone, PartialEq)]
pub enum ResultValue {
    Null,
    Scalar(Value),
    List(Vec<ResultValue>),
    Object(Arc<ResultObject>),
}

impl ResultValue {
    pub fn as_object(&self) -> Option<&Arc<ResultObject>> {
        match self {
            Self::Object(obj) => Some(obj),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[ResultValue]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_scalar(&self) -> Option<&Value> {
        match self {
            Self::Scalar(v) => Some(v),
            _ => None,
        }
    }

    /// Plain JSON view of this value
    pub fn to_json(&self) -> Value {
        match self {
            Self::Null => Value::Null,
            Self::Scalar(v) => v.clone(),
            Self::List(items) => Value::Array(items.iter().map(Self::to_json).collect()),
            Self::Object(obj) => obj.to_json(),
        }
    }
}

/// Object node of a result tree
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultObject {
    pub fields: BTreeMap<String, ResultValue>,
}

impl ResultObject {
    pub fn get(&self, key: &str) -> Option<&ResultValue> {
        self.fields.get(key)
    }

    pub fn to_json(&self) -> Value {
        Value::Object(
            self.fields
                .iter()
                .map(|(k, v)| (k.clone(), v.to_json()))
                .collect(),
        )
    }

    /// Canonical JSON text of this object
    pub fn to_canonical_string(&self) -> String {
        canonical_stringify(&self.to_json())
    }
}

/// A selected field the store could not satisfy
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissingField {
    /// Dotted path from the root of the read
    pub path: String,

    pub message: String,
}

impl MissingField {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Outcome of reading a selection
#[derive(Debug, Clone)]
pub struct ReadResult {
    pub tree: Arc<ResultObject>,
    pub missing: Vec<MissingField>,

    /// True when served from the result cache without re-reading the store
    pub from_cache: bool,
}

impl ReadResult {
    /// True when every selected field was found
    pub fn is_complete(&self) -> bool {
        self.missing.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_fingerprint_ignores_argument_order() {
        let a = Selection::new().with(
            FieldSelection::new("feed")
                .args(json!({ "offset": 0, "limit": 10 }))
                .select(Selection::new().field("id")),
        );
        let b = Selection::new().with(
            FieldSelection::new("feed")
                .args(json!({ "limit": 10, "offset": 0 }))
                .select(Selection::new().field("id")),
        );
        assert_eq!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn test_fingerprint_distinguishes_aliases_and_subselections() {
        let plain = Selection::new().field("name");
        let aliased = Selection::new().with(FieldSelection::new("name").alias("title"));
        assert_ne!(plain.fingerprint(), aliased.fingerprint());

        let nested = Selection::new()
            .with(FieldSelection::new("friend").select(Selection::new().field("name")));
        assert_eq!(nested.fingerprint(), "{friend{name}}");
    }

    #[test]
    fn test_result_to_json() {
        let mut obj = ResultObject::default();
        obj.fields.insert("name".to_string(), ResultValue::Scalar(json!("Ada")));
        obj.fields.insert(
            "tags".to_string(),
            ResultValue::List(vec![ResultValue::Scalar(json!("x")), ResultValue::Null]),
        );
        assert_eq!(obj.to_json(), json!({ "name": "Ada", "tags": ["x", null] }));
    }
}
