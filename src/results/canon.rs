//! Structural sharing of result objects
//!
//! Objects are admitted bottom-up, so every child object of an admitted
//! parent is already the pooled instance. A parent's pool key can therefore
//! name children by address instead of re-serializing whole subtrees.
//!
//! The pool holds weak handles only. An object stays shareable while some
//! memoized tree or caller still holds it, and dead handles are pruned as the
//! pool grows. A pooled `Weak` pins its allocation, so a dead child's address
//! is never reused while a parent key naming it is still in the pool.

use super::tree::{ResultObject, ResultValue};
use fieldkey::canonical_stringify;
use std::collections::HashMap;
use std::sync::{Arc, Weak};

/// Pool size below which dead handles are left in place
const MIN_PRUNE_AT: usize = 64;

/// Pool of canonical result objects
#[derive(Debug)]
pub struct Canonicalizer {
    pool: HashMap<String, Weak<ResultObject>>,
    prune_at: usize,
}

impl Default for Canonicalizer {
    fn default() -> Self {
        Self {
            pool: HashMap::new(),
            prune_at: MIN_PRUNE_AT,
        }
    }
}

impl Canonicalizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the shared instance structurally equal to `object`
    pub fn admit(&mut self, object: ResultObject) -> Arc<ResultObject> {
        let key = pool_key(&object);
        if let Some(shared) = self.pool.get(&key).and_then(Weak::upgrade) {
            return shared;
        }

        if self.pool.len() >= self.prune_at {
            self.prune();
        }
        let shared = Arc::new(object);
        self.pool.insert(key, Arc::downgrade(&shared));
        shared
    }

    /// Drop handles whose objects are gone
    fn prune(&mut self) {
        let before = self.pool.len();
        self.pool.retain(|_, handle| handle.strong_count() > 0);
        self.prune_at = (self.pool.len() * 2).max(MIN_PRUNE_AT);
        tracing::trace!(
            pruned = before - self.pool.len(),
            live = self.pool.len(),
            "Pruned canonical pool"
        );
    }

    /// Forget every pooled instance
    pub fn reset(&mut self) {
        self.pool.clear();
        self.prune_at = MIN_PRUNE_AT;
    }

    /// Number of pooled objects still alive
    pub fn len(&self) -> usize {
        self.pool
            .values()
            .filter(|handle| handle.strong_count() > 0)
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn pool_key(object: &ResultObject) -> String {
    let mut out = String::from("{");
    for (i, (name, value)) in object.fields.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        out.push_str(&serde_json::Value::String(name.clone()).to_string());
        out.push(':');
        write_value_key(value, &mut out);
    }
    out.push('}');
    out
}

fn write_value_key(value: &ResultValue, out: &mut String) {
    match value {
        ResultValue::Null => out.push_str("null"),
        ResultValue::Scalar(v) => out.push_str(&canonical_stringify(v)),
        ResultValue::List(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_value_key(item, out);
            }
            out.push(']');
        }
        ResultValue::Object(obj) => {
            out.push('@');
            out.push_str(&format!("{:p}", Arc::as_ptr(obj)));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn leaf(name: &str) -> ResultObject {
        let mut obj = ResultObject::default();
        obj.fields
            .insert("name".to_string(), ResultValue::Scalar(json!(name)));
        obj
    }

    #[test]
    fn test_equal_objects_share_an_instance() {
        let mut canon = Canonicalizer::new();
        let a = canon.admit(leaf("x"));
        let b = canon.admit(leaf("x"));
        let c = canon.admit(leaf("y"));

        assert!(Arc::ptr_eq(&a, &b));
        assert!(!Arc::ptr_eq(&a, &c));
        assert_eq!(canon.len(), 2);
    }

    #[test]
    fn test_parents_share_when_children_are_canonical() {
        let mut canon = Canonicalizer::new();

        let parent = |canon: &mut Canonicalizer| {
            let child = canon.admit(leaf("x"));
            let mut obj = ResultObject::default();
            obj.fields
                .insert("child".to_string(), ResultValue::Object(child));
            canon.admit(obj)
        };

        let first = parent(&mut canon);
        let second = parent(&mut canon);
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_dropped_objects_are_not_kept_alive() {
        let mut canon = Canonicalizer::new();
        let kept = canon.admit(leaf("kept"));

        for i in 0..10_000 {
            let object = canon.admit(leaf(&format!("item-{}", i)));
            assert_eq!(object.fields.len(), 1);
        }

        assert!(canon.pool.len() <= MIN_PRUNE_AT);
        assert_eq!(canon.len(), 1);
        assert!(Arc::ptr_eq(&kept, &canon.admit(leaf("kept"))));
    }

    #[test]
    fn test_dead_entry_is_replaced() {
        let mut canon = Canonicalizer::new();
        drop(canon.admit(leaf("x")));
        assert!(canon.is_empty());

        let again = canon.admit(leaf("x"));
        assert_eq!(again.fields.get("name"), Some(&ResultValue::Scalar(json!("x"))));
        assert_eq!(canon.len(), 1);
    }

    #[test]
    fn test_reset_breaks_sharing() {
        let mut canon = Canonicalizer::new();
        let a = canon.admit(leaf("x"));
        canon.reset();
        assert!(canon.is_empty());

        let b = canon.admit(leaf("x"));
        assert!(!Arc::ptr_eq(&a, &b));
        assert_eq!(a, b);
    }
}
