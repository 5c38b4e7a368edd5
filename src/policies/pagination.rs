//! Ready-made policies for paginated list fields

use super::{FieldPolicy, KeyArgs};
use crate::graph::StoredValue;
use anyhow::bail;

/// How far past the end of the stored list a page may start
pub const MAX_OFFSET_GAP: usize = 1024;

fn existing_items(existing: Option<&StoredValue>) -> Vec<StoredValue> {
    existing
        .and_then(StoredValue::as_list)
        .map(<[StoredValue]>::to_vec)
        .unwrap_or_default()
}

fn incoming_items(incoming: StoredValue) -> anyhow::Result<Vec<StoredValue>> {
    match incoming {
        StoredValue::List(items) => Ok(items),
        other => bail!("paginated field expected a list, got {:?}", other),
    }
}

/// Append every incoming page to the existing list
pub fn concat_pagination(key_args: KeyArgs) -> FieldPolicy {
    FieldPolicy::new()
        .key_args(key_args)
        .merge(|existing, incoming, _ctx| {
            let mut merged = existing_items(existing);
            merged.extend(incoming_items(incoming)?);
            Ok(StoredValue::List(merged))
        })
}

/// Place each incoming page at its `offset` argument
///
/// Pages land at `offset..offset + len`, so re-applying a page is idempotent.
/// Gaps before an offset are padded with `Absent`, which the default read
/// drops. An offset more than `MAX_OFFSET_GAP` past the end of the stored
/// list fails the merge. Without arguments the page is appended.
pub fn offset_limit_pagination(key_args: KeyArgs) -> FieldPolicy {
    FieldPolicy::new()
        .key_args(key_args)
        .merge(|existing, incoming, ctx| {
            let mut merged = existing_items(existing);
            let items = incoming_items(incoming)?;

            let Some(args) = ctx.args else {
                merged.extend(items);
                return Ok(StoredValue::List(merged));
            };

            let offset = match args.get("offset") {
                None => 0,
                Some(value) => match value.as_u64().and_then(|o| usize::try_from(o).ok()) {
                    Some(offset) => offset,
                    None => bail!("offset must be a non-negative integer, got {}", value),
                },
            };

            if offset.saturating_sub(merged.len()) > MAX_OFFSET_GAP {
                bail!(
                    "offset {} is too far past the {} stored item(s)",
                    offset,
                    merged.len()
                );
            }
            let Some(end) = offset.checked_add(items.len()) else {
                bail!("offset {} overflows with {} item(s)", offset, items.len());
            };
            if merged.len() < end {
                merged.resize(end, StoredValue::Absent);
            }
            for (slot, item) in merged[offset..end].iter_mut().zip(items) {
                *slot = item;
            }

            Ok(StoredValue::List(merged))
        })
}
