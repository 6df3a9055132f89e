use std::collections::HashSet;

use crate::models::CandidateItem;

/// Stable, first-seen-wins deduplication on the exact URL string.
///
/// No URL normalization happens: `https://x.com/a` and `https://x.com/a/`
/// are different items.
pub fn dedupe(items: Vec<CandidateItem>) -> Vec<CandidateItem> {
    let mut seen = HashSet::with_capacity(items.len());
    items
        .into_iter()
        .filter(|item| seen.insert(item.url.clone()))
        .collect()
}

/// Truncate to at most `max` items.
pub fn cap(mut items: Vec<CandidateItem>, max: usize) -> Vec<CandidateItem> {
    items.truncate(max);
    items
}
