//! Merging freshly fetched pages into the accumulated result list.

use std::collections::HashSet;

use crate::item::{ItemId, ResultItem};

/// Combines a fetched page with the items already shown.
///
/// With `is_reset` the page replaces everything (deduplicated against
/// itself). Otherwise the page's items that are not already present are
/// appended after `previous`, in the order received.
pub fn merge_items(previous: &[ResultItem], new: &[ResultItem], is_reset: bool) -> Vec<ResultItem> {
    let (mut merged, mut seen) = if is_reset {
        (Vec::with_capacity(new.len()), HashSet::with_capacity(new.len()))
    } else {
        let seen: HashSet<&ItemId> = previous.iter().map(|item| &item.id).collect();
        (previous.to_vec(), seen)
    };

    for item in new {
        if seen.insert(&item.id) {
            merged.push(item.clone());
        }
    }

    merged
}
