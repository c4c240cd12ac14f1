//! Property-Based Tests for Cache Module
//!
//! Uses proptest to check store and statistics invariants over random
//! operation sequences.

use proptest::prelude::*;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use serde_json::json;

use crate::cache::{CacheStore, StatisticsTracker, StoreSettings};
use crate::clock::ManualClock;

// == Strategies ==
/// Generates keys drawn from a small space so operations collide often
fn key_strategy() -> impl Strategy<Value = String> {
    ("(User|Order|Cfg)", 0u8..8).prop_map(|(category, id)| format!("{category}::{id}"))
}

#[derive(Debug, Clone)]
enum CacheOp {
    Set { key: String, weight: u64 },
    Get { key: String },
    Remove { key: String },
    Advance { secs: u64 },
}

fn cache_op_strategy() -> impl Strategy<Value = CacheOp> {
    prop_oneof![
        (key_strategy(), 1u64..4).prop_map(|(key, weight)| CacheOp::Set { key, weight }),
        key_strategy().prop_map(|key| CacheOp::Get { key }),
        key_strategy().prop_map(|key| CacheOp::Remove { key }),
        (0u64..3).prop_map(|secs| CacheOp::Advance { secs }),
    ]
}

fn tracked_store(limit: Option<u64>) -> (CacheStore, Arc<StatisticsTracker>, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new());
    let tracker = Arc::new(StatisticsTracker::new());
    let settings = StoreSettings {
        size_limit: limit,
        compaction_percentage: 0.25,
    };
    let store = CacheStore::new(settings, clock.clone()).with_listener(tracker.clone());
    (store, tracker, clock)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    // Hit and miss counters match what the caller observed, globally and per category.
    #[test]
    fn prop_statistics_accuracy(ops in prop::collection::vec(cache_op_strategy(), 1..80)) {
        let (store, tracker, clock) = tracked_store(None);
        let mut expected: HashMap<String, (u64, u64)> = HashMap::new();

        for op in ops {
            match op {
                CacheOp::Set { key, weight } => {
                    store.set(&key, json!(weight), Some(Duration::from_secs(4)), HashSet::new(), weight);
                }
                CacheOp::Get { key } => {
                    let category = crate::cache::category_of(&key).to_string();
                    let counts = expected.entry(category).or_default();
                    match store.try_get(&key) {
                        Some(_) => counts.0 += 1,
                        None => counts.1 += 1,
                    }
                }
                CacheOp::Remove { key } => {
                    store.remove(&key);
                }
                CacheOp::Advance { secs } => clock.advance(Duration::from_secs(secs)),
            }
        }

        let metrics = tracker.get_cache_metrics();
        let hits: u64 = expected.values().map(|c| c.0).sum();
        let misses: u64 = expected.values().map(|c| c.1).sum();
        prop_assert_eq!(metrics.total_hits, hits);
        prop_assert_eq!(metrics.total_misses, misses);
        for (category, (hits, misses)) in expected {
            let stats = metrics.category_stats[&category];
            prop_assert_eq!(stats.hits, hits);
            prop_assert_eq!(stats.misses, misses);
        }
    }

    // Every fresh insert is removed at most once: removals plus live entries
    // equals the number of inserts that did not replace an existing key.
    #[test]
    fn prop_removal_exactly_once(ops in prop::collection::vec(cache_op_strategy(), 1..120)) {
        let (store, tracker, clock) = tracked_store(Some(6));
        let mut fresh_inserts: u64 = 0;

        for op in ops {
            match op {
                CacheOp::Set { key, weight } => {
                    // Expired entries still occupy the map, so peek without a lookup
                    if !tracker.is_tracked(&key) {
                        fresh_inserts += 1;
                    }
                    store.set(&key, json!(1), Some(Duration::from_secs(3)), HashSet::new(), weight);
                }
                CacheOp::Get { key } => {
                    store.try_get(&key);
                }
                CacheOp::Remove { key } => {
                    store.remove(&key);
                }
                CacheOp::Advance { secs } => {
                    clock.advance(Duration::from_secs(secs));
                    store.scan_expired();
                }
            }
        }

        let metrics = tracker.get_cache_metrics();
        prop_assert_eq!(metrics.total_removals + store.len() as u64, fresh_inserts);
        prop_assert_eq!(metrics.active_keys_count, store.len());
        prop_assert_eq!(metrics.memory_pressure, store.approximate_bytes());
    }

    // The weight limit holds after every write.
    #[test]
    fn prop_weight_limit_enforced(
        entries in prop::collection::vec((key_strategy(), 1u64..5), 1..200)
    ) {
        let limit = 12;
        let (store, _, clock) = tracked_store(Some(limit));

        for (key, weight) in entries {
            store.set(&key, json!(weight), None, HashSet::new(), weight);
            clock.advance(Duration::from_millis(1));
            prop_assert!(
                store.total_weight() <= limit,
                "Total weight {} exceeds limit {}",
                store.total_weight(),
                limit
            );
        }
    }

    // The most recently read entry survives a compaction it did not trigger.
    #[test]
    fn prop_compaction_spares_recently_used(count in 4usize..20) {
        let (store, _, clock) = tracked_store(Some(count as u64));

        for i in 0..count {
            store.set(&format!("User::{i}"), json!(i), None, HashSet::new(), 1);
            clock.advance(Duration::from_millis(1));
        }
        // Promote the oldest key to most recently used
        prop_assert!(store.try_get("User::0").is_some());
        clock.advance(Duration::from_millis(1));

        store.set("User::new", json!("new"), None, HashSet::new(), 1);

        prop_assert!(store.len() <= count);
        prop_assert!(store.try_get("User::0").is_some());
        prop_assert!(store.try_get("User::1").is_none());
    }
}

// Separate block with fewer cases for TTL behaviour
proptest! {
    #![proptest_config(ProptestConfig::with_cases(20))]

    // After the TTL elapses the entry is gone; just before, it is still there.
    #[test]
    fn prop_ttl_expiration_behavior(key in key_strategy(), ttl_ms in 1u64..5_000) {
        let (store, _, clock) = tracked_store(None);
        let ttl = Duration::from_millis(ttl_ms);

        store.set(&key, json!("value"), Some(ttl), HashSet::new(), 1);
        clock.advance(ttl - Duration::from_millis(1));
        prop_assert!(store.try_get(&key).is_some(), "Entry should exist before TTL expires");

        clock.advance(Duration::from_millis(1));
        prop_assert!(store.try_get(&key).is_none(), "Entry should be gone after TTL");
        prop_assert!(store.is_empty());
    }
}
