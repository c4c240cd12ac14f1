//! Eviction Ordering Module
//!
//! Chooses which entries a compaction pass removes: least recently used first.

use std::time::Instant;

// == Oldest First ==
/// Orders candidate keys from least to most recently accessed.
///
/// Ties on the access instant are broken by key so compaction is deterministic.
pub fn oldest_first(mut candidates: Vec<(String, Instant)>) -> Vec<String> {
    candidates.sort_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.cmp(&b.0)));
    candidates.into_iter().map(|(key, _)| key).collect()
}

// == Compaction Target ==
/// Number of entries one compaction pass removes from a store holding `len`.
///
/// Always at least one entry when the store is non-empty, never more than `len`.
pub fn compaction_target(len: usize, percentage: f64) -> usize {
    if len == 0 {
        return 0;
    }
    let target = (len as f64 * percentage).ceil() as usize;
    target.clamp(1, len)
}
