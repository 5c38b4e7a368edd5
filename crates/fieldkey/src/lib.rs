//! Deterministic field keys for normalized caches
//!
//! A field key is the field name, optionally followed by a parenthesized,
//! canonically serialized argument object. Identical arguments always produce
//! the same key, regardless of the order they were supplied in.
//!
//! # Example
//!
//! ```
//! use fieldkey::{field_key, field_name_of};
//! use serde_json::json;
//!
//! let args = json!({ "b": 2, "a": { "y": true, "x": null } });
//! let key = field_key("feed", args.as_object());
//! assert_eq!(key, r#"feed({"a":{"x":null,"y":true},"b":2})"#);
//! assert_eq!(field_name_of(&key), "feed");
//! ```

use serde_json::{Map, Value};
use thiserror::Error;

/// Errors that can occur when decoding a field key
#[derive(Error, Debug)]
pub enum Error {
    #[error("Malformed field key: {0}")]
    MalformedKey(String),

    #[error("Field key arguments are not a JSON object: {0}")]
    NotAnObject(String),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for field key operations
pub type Result<T> = std::result::Result<T, Error>;

/// Serialize a JSON value with object keys sorted lexicographically at every depth
pub fn canonical_stringify(value: &Value) -> String {
    let mut out = String::new();
    write_canonical(value, &mut out);
    out
}

fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            out.push('{');
            for (i, key) in keys.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_string(key, out);
                out.push(':');
                write_canonical(&map[key], out);
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        Value::String(s) => write_string(s, out),
        // Scalars have a single serialization
        other => out.push_str(&other.to_string()),
    }
}

fn write_string(s: &str, out: &mut String) {
    out.push_str(&Value::String(s.to_string()).to_string());
}

/// Build a key that includes every argument
///
/// Returns just `name` when `args` is `None` or empty.
pub fn field_key(name: &str, args: Option<&Map<String, Value>>) -> String {
    match args {
        Some(args) if !args.is_empty() => {
            let canonical = canonical_stringify(&Value::Object(args.clone()));
            format!("{}({})", name, canonical)
        }
        _ => name.to_string(),
    }
}

/// Build a key from only the listed argument names, in list order
///
/// Arguments missing from `args` are skipped. When no listed argument is
/// present the key is just `name`.
pub fn field_key_for(name: &str, args: Option<&Map<String, Value>>, key_args: &[String]) -> String {
    let Some(args) = args else {
        return name.to_string();
    };

    let mut parts = Vec::new();
    for arg in key_args {
        if let Some(value) = args.get(arg) {
            let mut part = String::new();
            write_string(arg, &mut part);
            part.push(':');
            write_canonical(value, &mut part);
            parts.push(part);
        }
    }

    if parts.is_empty() {
        name.to_string()
    } else {
        format!("{}({{{}}})", name, parts.join(","))
    }
}

/// Serialize the listed fields of `object`, in list order, as a JSON object
///
/// Returns `None` if any listed field is missing. Used to derive record ids
/// from key fields.
pub fn key_object(object: &Map<String, Value>, fields: &[String]) -> Option<String> {
    let mut out = String::from("{");
    for (i, field) in fields.iter().enumerate() {
        let value = object.get(field)?;
        if i > 0 {
            out.push(',');
        }
        write_string(field, &mut out);
        out.push(':');
        write_canonical(value, &mut out);
    }
    out.push('}');
    Some(out)
}

/// Extract the field name component of a key
pub fn field_name_of(key: &str) -> &str {
    match key.find('(') {
        Some(pos) => &key[..pos],
        None => key,
    }
}

/// Split a key into its name and decoded argument object
pub fn split_key(key: &str) -> Result<(&str, Option<Map<String, Value>>)> {
    let Some(pos) = key.find('(') else {
        return Ok((key, None));
    };

    let name = &key[..pos];
    let rest = &key[pos + 1..];
    let Some(body) = rest.strip_suffix(')') else {
        return Err(Error::MalformedKey(key.to_string()));
    };

    match serde_json::from_str::<Value>(body)? {
        Value::Object(map) => Ok((name, Some(map))),
        _ => Err(Error::NotAnObject(key.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_canonical_sorts_nested_keys() {
        let a = json!({ "z": 1, "a": { "d": [ { "q": 1, "p": 2 } ], "c": "x" } });
        assert_eq!(
            canonical_stringify(&a),
            r#"{"a":{"c":"x","d":[{"p":2,"q":1}]},"z":1}"#
        );
    }

    #[test]
    fn test_field_key_is_order_independent() {
        let mut first = Map::new();
        first.insert("limit".to_string(), json!(10));
        first.insert("after".to_string(), json!("c1"));

        let mut second = Map::new();
        second.insert("after".to_string(), json!("c1"));
        second.insert("limit".to_string(), json!(10));

        assert_eq!(
            field_key("feed", Some(&first)),
            field_key("feed", Some(&second))
        );
    }

    #[test]
    fn test_field_key_without_args() {
        assert_eq!(field_key("name", None), "name");
        assert_eq!(field_key("name", Some(&Map::new())), "name");
    }

    #[test]
    fn test_field_key_for_uses_list_order() {
        let args = json!({ "a": 1, "b": { "y": 2, "x": 1 }, "c": 3 });
        let keys = vec!["b".to_string(), "a".to_string()];
        assert_eq!(
            field_key_for("search", args.as_object(), &keys),
            r#"search({"b":{"x":1,"y":2},"a":1})"#
        );
    }

    #[test]
    fn test_field_key_for_empty_list() {
        let args = json!({ "offset": 0, "limit": 2 });
        assert_eq!(field_key_for("feed", args.as_object(), &[]), "feed");
    }

    #[test]
    fn test_key_object() {
        let book = json!({ "title": "Dune", "isbn": "0441013597", "meta": { "b": 1, "a": 2 } });
        let book = book.as_object().unwrap();

        assert_eq!(
            key_object(book, &["isbn".to_string(), "meta".to_string()]),
            Some(r#"{"isbn":"0441013597","meta":{"a":2,"b":1}}"#.to_string())
        );
        assert_eq!(key_object(book, &["author".to_string()]), None);
    }

    #[test]
    fn test_field_name_of() {
        assert_eq!(field_name_of("offspring"), "offspring");
        assert_eq!(field_name_of(r#"offspring({"first":2})"#), "offspring");
    }

    #[test]
    fn test_split_key() {
        let (name, args) = split_key(r#"feed({"offset":2})"#).unwrap();
        assert_eq!(name, "feed");
        assert_eq!(args.unwrap().get("offset"), Some(&json!(2)));

        let (name, args) = split_key("feed").unwrap();
        assert_eq!(name, "feed");
        assert!(args.is_none());

        assert!(matches!(split_key("feed({\"a\":1}"), Err(Error::MalformedKey(_))));
        assert!(matches!(split_key("feed([1])"), Err(Error::NotAnObject(_))));
    }
}
