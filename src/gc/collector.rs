//! Reachability-based garbage collection

use super::{ReferenceTracer, RetentionRegistry};
use crate::graph::RecordId;
use crate::results::ResultCache;
use crate::storage::NormalizedStore;
use std::collections::HashSet;

/// Options for one collection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GcOptions {
    /// Drop every memoized result tree, not only those touching removed ids
    pub reset_result_cache: bool,

    /// Clear the canonicalizer's sharing table (no-op when canonicalization is off)
    pub reset_result_identities: bool,
}

/// Prunes records unreachable from the configured roots and retained ids
///
/// The collector holds `&mut` to the store for the whole run, so no read,
/// merge or external mutation can interleave with the trace.
pub struct GarbageCollector<'a> {
    root_ids: &'a [RecordId],
    retention: &'a RetentionRegistry,
}

impl<'a> GarbageCollector<'a> {
    pub fn new(root_ids: &'a [RecordId], retention: &'a RetentionRegistry) -> Self {
        Self {
            root_ids,
            retention,
        }
    }

    /// Configured roots plus every retained id
    pub fn roots(&self) -> HashSet<RecordId> {
        let mut roots = self.retention.retained_ids();
        roots.extend(self.root_ids.iter().cloned());
        roots
    }

    /// Ids reachable from the current root set
    pub fn reachable(&self, store: &NormalizedStore) -> HashSet<RecordId> {
        ReferenceTracer::new(store).trace(&self.roots())
    }

    /// Remove every unreachable record, returning the removed ids
    ///
    /// The order of the returned ids carries no meaning.
    pub fn collect(
        &self,
        store: &mut NormalizedStore,
        results: &mut ResultCache,
        options: GcOptions,
    ) -> Vec<RecordId> {
        let reachable = self.reachable(store);

        let removed: Vec<RecordId> = store
            .ids()
            .filter(|id| !reachable.contains(*id))
            .cloned()
            .collect();

        for id in &removed {
            store.delete_record(id.as_str());
        }

        results.invalidate(&removed);

        if options.reset_result_cache {
            results.clear();
        }
        if options.reset_result_identities && !results.reset_identities() {
            tracing::debug!("Canonicalization disabled, no result identities to reset");
        }

        tracing::info!(
            removed = removed.len(),
            reachable = reachable.len(),
            remaining = store.len(),
            "Garbage collection finished"
        );
        removed
    }
}
