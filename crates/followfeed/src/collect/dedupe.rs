//! Order-preserving deduplication.

use std::collections::HashSet;
use std::hash::Hash;

/// Keep the first occurrence of each distinct value, preserving order.
pub fn dedupe<T, I>(items: I) -> Vec<T>
where
    T: Eq + Hash + Clone,
    I: IntoIterator<Item = T>,
{
    let mut seen = HashSet::new();
    items
        .into_iter()
        .filter(|item| seen.insert(item.clone()))
        .collect()
}
