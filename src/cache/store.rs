//! Cache Store Module
//!
//! Concurrent key/value table combining sharded storage, TTL expiration and
//! LRU-ordered compaction under a weight limit.

use std::collections::HashSet;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde_json::Value;
use tracing::debug;

use crate::cache::{eviction, CacheEntry, CachedItem};
use crate::clock::Clock;

// == Removal Cause ==
/// Why an entry left the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemovalCause {
    /// Removed by a caller
    Explicit,
    /// TTL elapsed
    Expired,
    /// Unused for longer than the idle threshold
    Idle,
    /// Chosen by a compaction pass
    Compacted,
    /// Matched a tag or pattern invalidation
    Invalidated,
    /// Dropped by a full clear
    Cleared,
}

// == Store Listener ==
/// Receives every lookup, insert and removal a store performs.
///
/// `on_remove` fires exactly once per removed entry.
pub trait StoreListener: Send + Sync {
    fn on_lookup(&self, key: &str, hit: bool);

    /// `replaced_bytes` is the size of the overwritten entry, if any.
    fn on_insert(&self, key: &str, size_bytes: u64, replaced_bytes: Option<u64>);

    fn on_remove(&self, key: &str, size_bytes: u64, cause: RemovalCause);
}

// == Store Settings ==
/// Capacity settings for one store.
#[derive(Debug, Clone, Copy)]
pub struct StoreSettings {
    /// Total weight allowed before compaction, None = unbounded
    pub size_limit: Option<u64>,
    /// Fraction of entries removed per compaction pass
    pub compaction_percentage: f64,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            size_limit: None,
            compaction_percentage: 0.25,
        }
    }
}

// == Cache Store ==
/// Sharded cache storage with TTL support and weight-bounded compaction.
pub struct CacheStore {
    /// Key-value storage
    entries: DashMap<String, CacheEntry>,
    /// Sum of the weights of all stored entries
    total_weight: AtomicU64,
    settings: StoreSettings,
    /// Set while a compaction pass runs
    compacting: AtomicBool,
    clock: Arc<dyn Clock>,
    listener: Option<Arc<dyn StoreListener>>,
}

impl CacheStore {
    // == Constructor ==
    /// Creates an empty store reading time from `clock`.
    pub fn new(settings: StoreSettings, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: DashMap::new(),
            total_weight: AtomicU64::new(0),
            settings,
            compacting: AtomicBool::new(false),
            clock,
            listener: None,
        }
    }

    /// Attaches the listener that observes this store's events.
    pub fn with_listener(mut self, listener: Arc<dyn StoreListener>) -> Self {
        self.listener = Some(listener);
        self
    }

    // == Set ==
    /// Stores a value, replacing any existing entry under the same key.
    ///
    /// Triggers compaction when the total weight exceeds the size limit.
    pub fn set(
        &self,
        key: &str,
        value: Value,
        ttl: Option<Duration>,
        tags: HashSet<String>,
        weight: u64,
    ) {
        let weight = weight.max(1);
        let entry = CacheEntry::new(key, value, self.clock.now(), ttl, tags, weight);
        let size_bytes = entry.size_bytes;

        self.total_weight.fetch_add(weight, Ordering::AcqRel);
        // The listener runs under the shard lock so a concurrent removal of
        // this key is always reported after the insert.
        match self.entries.entry(key.to_string()) {
            Entry::Occupied(mut occupied) => {
                let old = occupied.insert(entry);
                self.total_weight.fetch_sub(old.weight, Ordering::AcqRel);
                if let Some(listener) = &self.listener {
                    listener.on_insert(key, size_bytes, Some(old.size_bytes));
                }
            }
            Entry::Vacant(vacant) => {
                let _inserted = vacant.insert(entry);
                if let Some(listener) = &self.listener {
                    listener.on_insert(key, size_bytes, None);
                }
            }
        }

        if self.is_over_limit() {
            self.compact();
        }
    }

    // == Try Get ==
    /// Retrieves an unexpired entry and marks it as accessed.
    ///
    /// An expired entry found here is removed and reported as a miss.
    pub fn try_get(&self, key: &str) -> Option<CachedItem> {
        let now = self.clock.now();
        let lookup = self.entries.get(key).map(|entry| {
            if entry.is_expired(now) {
                None
            } else {
                entry.touch(now);
                Some(entry.to_item())
            }
        });

        let item = match lookup {
            Some(Some(item)) => Some(item),
            Some(None) => {
                self.remove_if(key, RemovalCause::Expired, |entry| entry.is_expired(now));
                None
            }
            None => None,
        };

        if let Some(listener) = &self.listener {
            listener.on_lookup(key, item.is_some());
        }
        item
    }

    // == Remove ==
    /// Removes an entry by key. Returns false if the key was absent.
    pub fn remove(&self, key: &str) -> bool {
        self.remove_if(key, RemovalCause::Explicit, |_| true)
    }

    /// Removes every entry matching `predicate`, returning the count.
    ///
    /// The predicate is re-checked at removal time, so an entry replaced
    /// concurrently with a non-matching one survives.
    pub fn remove_where<F>(&self, cause: RemovalCause, predicate: F) -> usize
    where
        F: Fn(&str, &CacheEntry) -> bool,
    {
        let keys: Vec<String> = self
            .entries
            .iter()
            .filter(|entry| predicate(entry.key().as_str(), entry.value()))
            .map(|entry| entry.key().clone())
            .collect();

        keys.into_iter()
            .filter(|key| self.remove_if(key, cause, |entry| predicate(key.as_str(), entry)))
            .count()
    }

    /// Removes all entries.
    pub fn clear(&self) -> usize {
        self.remove_where(RemovalCause::Cleared, |_, _| true)
    }

    // == Scan Expired ==
    /// Removes all expired entries, returning the count.
    pub fn scan_expired(&self) -> usize {
        let now = self.clock.now();
        self.remove_where(RemovalCause::Expired, |_, entry| entry.is_expired(now))
    }

    // == Prune Idle ==
    /// Removes up to `max_removals` entries not accessed for `idle_for`,
    /// least recently used first.
    pub fn prune_idle(&self, idle_for: Duration, max_removals: usize) -> usize {
        if max_removals == 0 {
            return 0;
        }
        let now = self.clock.now();
        let candidates: Vec<(String, Instant)> = self
            .entries
            .iter()
            .filter(|entry| entry.idle_for(now) >= idle_for)
            .map(|entry| (entry.key().clone(), entry.last_accessed()))
            .collect();

        eviction::oldest_first(candidates)
            .into_iter()
            .filter(|key| {
                self.remove_if(key, RemovalCause::Idle, |entry| entry.idle_for(now) >= idle_for)
            })
            .take(max_removals)
            .count()
    }

    // == Compact ==
    /// Runs one compaction pass and returns the number of entries removed.
    ///
    /// Expired entries go first, then least recently used entries until the
    /// configured fraction is removed and the weight is back under the limit.
    /// Only one pass runs at a time; a concurrent call returns 0.
    pub fn compact(&self) -> usize {
        if self.compacting.swap(true, Ordering::AcqRel) {
            return 0;
        }

        let target = eviction::compaction_target(
            self.entries.len(),
            self.settings.compaction_percentage,
        );
        let mut removed = self.scan_expired();

        let candidates: Vec<(String, Instant)> = self
            .entries
            .iter()
            .map(|entry| (entry.key().clone(), entry.last_accessed()))
            .collect();

        for key in eviction::oldest_first(candidates) {
            if removed >= target && !self.is_over_limit() {
                break;
            }
            if self.remove_if(&key, RemovalCause::Compacted, |_| true) {
                removed += 1;
            }
        }

        self.compacting.store(false, Ordering::Release);
        debug!(
            removed,
            total_weight = self.total_weight(),
            "Compaction pass finished"
        );
        removed
    }

    // == Accessors ==
    /// Returns the current number of entries, expired ones included until scanned.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn total_weight(&self) -> u64 {
        self.total_weight.load(Ordering::Acquire)
    }

    /// Sum of entry footprints in bytes.
    pub fn approximate_bytes(&self) -> u64 {
        self.entries.iter().map(|entry| entry.size_bytes).sum()
    }

    pub fn settings(&self) -> StoreSettings {
        self.settings
    }

    fn is_over_limit(&self) -> bool {
        self.settings
            .size_limit
            .is_some_and(|limit| self.total_weight() > limit)
    }

    /// Single removal path: weight and listener are updated only when the
    /// map actually yielded the entry.
    fn remove_if<F>(&self, key: &str, cause: RemovalCause, predicate: F) -> bool
    where
        F: FnOnce(&CacheEntry) -> bool,
    {
        match self.entries.remove_if(key, |_, entry| predicate(entry)) {
            Some((key, entry)) => {
                self.total_weight.fetch_sub(entry.weight, Ordering::AcqRel);
                if let Some(listener) = &self.listener {
                    listener.on_remove(&key, entry.size_bytes, cause);
                }
                true
            }
            None => false,
        }
    }
}

impl fmt::Debug for CacheStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheStore")
            .field("len", &self.entries.len())
            .field("total_weight", &self.total_weight())
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}
