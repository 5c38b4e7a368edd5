//! Reachability over the record graph

use crate::graph::RecordId;
use crate::storage::NormalizedStore;
use std::collections::{HashSet, VecDeque};

/// Breadth-first tracer from a set of root ids
///
/// The visited set makes traversal terminate on arbitrary cycles. Dangling
/// reference targets are never enqueued.
pub struct ReferenceTracer<'a> {
    store: &'a NormalizedStore,
}

impl<'a> ReferenceTracer<'a> {
    pub fn new(store: &'a NormalizedStore) -> Self {
        Self { store }
    }

    /// Compute every id reachable from `roots`
    ///
    /// The result always contains the roots themselves, even roots that have
    /// no record in the store.
    pub fn trace<'r, I>(&self, roots: I) -> HashSet<RecordId>
    where
        I: IntoIterator<Item = &'r RecordId>,
    {
        let mut reachable: HashSet<RecordId> = HashSet::new();
        let mut queue: VecDeque<RecordId> = VecDeque::new();

        for root in roots {
            if reachable.insert(root.clone()) {
                queue.push_back(root.clone());
            }
        }

        while let Some(id) = queue.pop_front() {
            let Some(record) = self.store.record(id.as_str()) else {
                continue;
            };

            for value in record.values() {
                value.for_each_reference(&mut |reference| {
                    if self.store.contains(reference.id.as_str())
                        && !reachable.contains(&reference.id)
                    {
                        reachable.insert(reference.id.clone());
                        queue.push_back(reference.id.clone());
                    }
                });
            }
        }

        tracing::trace!(reachable = reachable.len(), "Trace complete");
        reachable
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::StoredValue;
    use std::collections::BTreeMap;

    fn ids(items: &[&str]) -> Vec<RecordId> {
        items.iter().map(|s| RecordId::new(*s)).collect()
    }

    #[test]
    fn test_trace_follows_nested_values() {
        let mut store = NormalizedStore::new();
        store.put("ROOT_QUERY", "people", StoredValue::references(["A", "B"]));
        store.put(
            "A",
            "address",
            StoredValue::Object(BTreeMap::from([(
                "city".to_string(),
                StoredValue::reference("City:1"),
            )])),
        );
        store.put("B", "name", StoredValue::scalar("b"));
        store.put("City:1", "name", StoredValue::scalar("Oslo"));
        store.put("Orphan", "name", StoredValue::scalar("o"));

        let roots = ids(&["ROOT_QUERY"]);
        let reachable = ReferenceTracer::new(&store).trace(&roots);

        assert_eq!(reachable.len(), 4);
        assert!(reachable.contains("City:1"));
        assert!(!reachable.contains("Orphan"));
    }

    #[test]
    fn test_trace_terminates_on_cycles() {
        let mut store = NormalizedStore::new();
        store.put("ROOT_QUERY", "a", StoredValue::reference("A"));
        store.put("A", "b", StoredValue::reference("B"));
        store.put("B", "a", StoredValue::reference("A"));
        store.put("B", "self", StoredValue::reference("B"));

        let roots = ids(&["ROOT_QUERY"]);
        let reachable = ReferenceTracer::new(&store).trace(&roots);
        assert_eq!(reachable.len(), 3);
    }

    #[test]
    fn test_dangling_targets_are_skipped() {
        let mut store = NormalizedStore::new();
        store.put("ROOT_QUERY", "gone", StoredValue::reference("Gone:1"));

        let roots = ids(&["ROOT_QUERY"]);
        let reachable = ReferenceTracer::new(&store).trace(&roots);
        assert!(!reachable.contains("Gone:1"));
    }

    #[test]
    fn test_roots_without_records_are_reachable() {
        let store = NormalizedStore::new();
        let roots = ids(&["ROOT_QUERY", "ROOT_MUTATION"]);
        let reachable = ReferenceTracer::new(&store).trace(&roots);
        assert_eq!(reachable.len(), 2);
    }

    #[test]
    fn test_absent_fields_hold_no_edges() {
        let mut store = NormalizedStore::new();
        store.put("ROOT_QUERY", "a", StoredValue::reference("A"));
        store.put("A", "x", StoredValue::scalar(1));
        store.delete_field("ROOT_QUERY", "a");

        let roots = ids(&["ROOT_QUERY"]);
        let reachable = ReferenceTracer::new(&store).trace(&roots);
        assert!(!reachable.contains("A"));
    }
}
