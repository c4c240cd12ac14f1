//! Cache Engine - An in-process caching engine
//!
//! Provides a concurrent TTL store with LRU compaction, per-category
//! statistics, named providers and higher-level caching patterns
//! (read-through, multi-level, conditional, refresh-ahead, warm-up and
//! tag/pattern invalidation). An axum admin API exposes a running engine.

pub mod api;
pub mod cache;
pub mod clock;
pub mod config;
pub mod engine;
pub mod error;
pub mod models;
pub mod provider;
pub mod tasks;

pub use api::{create_router, AppState};
pub use cache::{CacheMetrics, CachedItem, CategoryStatsSnapshot};
pub use clock::{Clock, ManualClock, MonotonicClock};
pub use config::Config;
pub use engine::{CacheEngine, CacheOptions, WarmupEntry, WarmupReport};
pub use error::{CacheError, Result};
pub use provider::{CacheProvider, EntryOptions, MemoryCacheProvider};
