//! Reference-counted pins against garbage collection

use crate::graph::RecordId;
use std::collections::{HashMap, HashSet};

/// Ids explicitly retained by callers
///
/// Every id with a positive count joins the root set at the next collection.
/// Counts never go negative; an entry disappears once its count reaches zero.
#[derive(Debug, Clone, Default)]
pub struct RetentionRegistry {
    counts: HashMap<RecordId, usize>,
}

impl RetentionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Increment the count for `id`, returning the new count
    pub fn retain(&mut self, id: impl Into<RecordId>) -> usize {
        let count = self.counts.entry(id.into()).or_insert(0);
        *count += 1;
        *count
    }

    /// Decrement the count for `id`, returning the new count
    ///
    /// Releasing an id that is not retained is a no-op returning 0.
    pub fn release(&mut self, id: &str) -> usize {
        let Some(count) = self.counts.get_mut(id) else {
            return 0;
        };

        *count = count.saturating_sub(1);
        let remaining = *count;
        if remaining == 0 {
            self.counts.remove(id);
        }
        remaining
    }

    /// Current count for `id` (0 when not retained)
    pub fn count(&self, id: &str) -> usize {
        self.counts.get(id).copied().unwrap_or(0)
    }

    /// Ids with a positive count
    pub fn retained_ids(&self) -> HashSet<RecordId> {
        self.counts
            .iter()
            .filter(|(_, &count)| count > 0)
            .map(|(id, _)| id.clone())
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }
}
