//! Cache Module
//!
//! Provides the concurrent TTL store, LRU compaction ordering and statistics.

mod entry;
mod eviction;
mod stats;
mod store;

#[cfg(test)]
mod property_tests;

// Re-export public types
pub use entry::{value_size, CacheEntry, CachedItem};
pub use stats::{hit_ratio, CacheMetrics, CategoryStats, CategoryStatsSnapshot, StatisticsTracker};
pub use store::{CacheStore, RemovalCause, StoreListener, StoreSettings};

// == Public Constants ==
/// Maximum allowed key length in bytes
pub const MAX_KEY_LENGTH: usize = 256;

/// Maximum allowed serialized value size in bytes
pub const MAX_VALUE_SIZE: usize = 1024 * 1024; // 1 MB

/// Separates the category prefix from the identifier in a key
pub const CATEGORY_DELIMITER: &str = "::";

/// Category for keys without a prefix
pub const DEFAULT_CATEGORY: &str = "General";

// == Category ==
/// Returns the statistics category of a key: the text before the first
/// `"::"`, or `"General"` when there is no (non-empty) prefix.
pub fn category_of(key: &str) -> &str {
    match key.find(CATEGORY_DELIMITER) {
        Some(idx) if idx > 0 => &key[..idx],
        _ => DEFAULT_CATEGORY,
    }
}
