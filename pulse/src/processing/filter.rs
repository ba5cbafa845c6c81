use std::collections::HashSet;

use crate::models::{normalize_terms, FilterConfig, Mention};

/// Apply the include, exclude and reach predicates in that order, then drop
/// ids already in `existing_ids` or repeated within `mentions`.
pub fn filter_mentions(
    mentions: Vec<Mention>,
    filter: &FilterConfig,
    existing_ids: &HashSet<String>,
) -> Vec<Mention> {
    let include = normalize_terms(&filter.include_keywords);
    let exclude = normalize_terms(&filter.exclude_keywords);
    let mut batch_ids = HashSet::new();

    mentions
        .into_iter()
        .filter(|mention| {
            let text = mention.content.to_lowercase();
            if !include.is_empty() && !include.iter().any(|k| text.contains(k.as_str())) {
                return false;
            }
            if exclude.iter().any(|k| text.contains(k.as_str())) {
                return false;
            }
            mention.reach >= filter.min_reach
        })
        .filter(|mention| !existing_ids.contains(&mention.id) && batch_ids.insert(mention.id.clone()))
        .collect()
}

/// New items first, then the existing working set, truncated to `cap`.
/// The tail (oldest entries) is what gets evicted.
pub fn merge_capped(new_items: Vec<Mention>, existing: Vec<Mention>, cap: usize) -> (Vec<Mention>, usize) {
    let mut merged = new_items;
    merged.extend(existing);
    let evicted = merged.len().saturating_sub(cap);
    merged.truncate(cap);
    (merged, evicted)
}
