//! Cache Statistics Module
//!
//! Tracks hits, misses, sets and removals globally and per key category,
//! plus the inventory of live keys and their memory footprint.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use serde::Serialize;

use crate::cache::store::{RemovalCause, StoreListener};
use crate::cache::category_of;

// == Category Stats ==
/// Lock-free counters for one category (or for the whole engine).
#[derive(Debug, Default)]
pub struct CategoryStats {
    hits: AtomicU64,
    misses: AtomicU64,
    sets: AtomicU64,
    removals: AtomicU64,
}

impl CategoryStats {
    pub fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_set(&self) {
        self.sets.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_removal(&self) {
        self.removals.fetch_add(1, Ordering::Relaxed);
    }

    fn reset(&self) {
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
        self.sets.store(0, Ordering::Relaxed);
        self.removals.store(0, Ordering::Relaxed);
    }

    // == Snapshot ==
    /// Reads the counters into an immutable snapshot.
    pub fn snapshot(&self) -> CategoryStatsSnapshot {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        CategoryStatsSnapshot {
            hits,
            misses,
            sets: self.sets.load(Ordering::Relaxed),
            removals: self.removals.load(Ordering::Relaxed),
            hit_ratio: hit_ratio(hits, misses),
        }
    }
}

/// Point-in-time copy of a [`CategoryStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct CategoryStatsSnapshot {
    pub hits: u64,
    pub misses: u64,
    pub sets: u64,
    pub removals: u64,
    pub hit_ratio: f64,
}

// == Cache Metrics ==
/// Aggregated statistics returned by `get_statistics`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CacheMetrics {
    pub total_hits: u64,
    pub total_misses: u64,
    pub total_sets: u64,
    pub total_removals: u64,
    pub hit_ratio: f64,
    pub category_stats: BTreeMap<String, CategoryStatsSnapshot>,
    /// Distinct keys currently stored in any provider
    pub active_keys_count: usize,
    /// Approximate bytes held by stored keys and values
    pub memory_pressure: u64,
}

// == Hit Ratio ==
/// Returns hits / (hits + misses), or 0.0 if no lookups have been made.
pub fn hit_ratio(hits: u64, misses: u64) -> f64 {
    let total = hits + misses;
    if total == 0 {
        0.0
    } else {
        hits as f64 / total as f64
    }
}

// == Statistics Tracker ==
/// Engine-wide statistics fed by store events.
///
/// The key inventory counts how many stores hold each key, so one key cached
/// in two tiers stays active until both copies are gone.
#[derive(Debug, Default)]
pub struct StatisticsTracker {
    global: CategoryStats,
    categories: DashMap<String, CategoryStats>,
    key_inventory: DashMap<String, usize>,
    memory_bytes: AtomicU64,
}

impl StatisticsTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_hit(&self, key: &str) {
        self.global.record_hit();
        self.with_category(key, CategoryStats::record_hit);
    }

    pub fn record_miss(&self, key: &str) {
        self.global.record_miss();
        self.with_category(key, CategoryStats::record_miss);
    }

    pub fn record_set(&self, key: &str) {
        self.global.record_set();
        self.with_category(key, CategoryStats::record_set);
    }

    pub fn record_removal(&self, key: &str) {
        self.global.record_removal();
        self.with_category(key, CategoryStats::record_removal);
    }

    /// Number of distinct keys currently stored.
    pub fn active_keys_count(&self) -> usize {
        self.key_inventory.len()
    }

    pub fn is_tracked(&self, key: &str) -> bool {
        self.key_inventory.contains_key(key)
    }

    pub fn memory_pressure(&self) -> u64 {
        self.memory_bytes.load(Ordering::Relaxed)
    }

    // == Get Cache Metrics ==
    /// Aggregates global counters, per-category snapshots and inventory data.
    pub fn get_cache_metrics(&self) -> CacheMetrics {
        let global = self.global.snapshot();
        let category_stats = self
            .categories
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().snapshot()))
            .collect();

        CacheMetrics {
            total_hits: global.hits,
            total_misses: global.misses,
            total_sets: global.sets,
            total_removals: global.removals,
            hit_ratio: global.hit_ratio,
            category_stats,
            active_keys_count: self.active_keys_count(),
            memory_pressure: self.memory_pressure(),
        }
    }

    // == Reset Statistics ==
    /// Zeroes all counters and forgets categories. Stored entries, the key
    /// inventory and memory accounting are left alone.
    pub fn reset_statistics(&self) {
        self.global.reset();
        self.categories.clear();
    }

    /// Category lookups take the shard read lock; only a first sighting of a
    /// category takes the write lock.
    fn with_category(&self, key: &str, record: impl FnOnce(&CategoryStats)) {
        let category = category_of(key);
        if let Some(stats) = self.categories.get(category) {
            record(stats.value());
            return;
        }
        let stats = self.categories.entry(category.to_string()).or_default();
        record(stats.value());
    }

    fn track_key(&self, key: &str) {
        *self.key_inventory.entry(key.to_string()).or_insert(0) += 1;
    }

    fn release_key(&self, key: &str) {
        if let Some(mut count) = self.key_inventory.get_mut(key) {
            *count = count.saturating_sub(1);
        }
        self.key_inventory.remove_if(key, |_, count| *count == 0);
    }

    fn release_bytes(&self, bytes: u64) {
        let _ = self
            .memory_bytes
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |current| {
                Some(current.saturating_sub(bytes))
            });
    }
}

impl StoreListener for StatisticsTracker {
    fn on_lookup(&self, key: &str, hit: bool) {
        if hit {
            self.record_hit(key);
        } else {
            self.record_miss(key);
        }
    }

    fn on_insert(&self, key: &str, size_bytes: u64, replaced_bytes: Option<u64>) {
        self.record_set(key);
        self.memory_bytes.fetch_add(size_bytes, Ordering::Relaxed);
        match replaced_bytes {
            Some(old) => self.release_bytes(old),
            None => self.track_key(key),
        }
    }

    fn on_remove(&self, key: &str, size_bytes: u64, _cause: RemovalCause) {
        self.record_removal(key);
        self.release_key(key);
        self.release_bytes(size_bytes);
    }
}
