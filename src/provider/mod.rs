//! Provider Module
//!
//! The uniform contract every cache backend implements, the local in-memory
//! backend, and the named registry the engine resolves providers from.
//!
//! Values cross the provider boundary as `serde_json::Value`; a remote
//! provider serializes that value for its own wire format.

mod memory;
mod registry;

use std::collections::HashSet;
use std::fmt::Debug;
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use serde_json::Value;

use crate::cache::CachedItem;
use crate::error::Result;

pub use memory::MemoryCacheProvider;
pub use registry::{ProviderRegistry, DEFAULT_PROVIDER};

// == Entry Options ==
/// How a value should be stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryOptions {
    /// Time to live, None = never expires
    pub ttl: Option<Duration>,
    /// Labels for bulk invalidation
    pub tags: HashSet<String>,
    /// Units counted against the store's size limit
    pub weight: u64,
}

impl EntryOptions {
    pub fn new() -> Self {
        Self {
            ttl: None,
            tags: HashSet::new(),
            weight: 1,
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags.extend(tags.into_iter().map(Into::into));
        self
    }

    pub fn with_weight(mut self, weight: u64) -> Self {
        self.weight = weight;
        self
    }
}

impl Default for EntryOptions {
    fn default() -> Self {
        Self::new()
    }
}

// == Cache Provider ==
/// Contract for a named cache backend.
///
/// `get` returns the entry with its metadata so callers can distinguish a
/// cached `null` from an absent key and inspect the entry's age.
#[async_trait]
pub trait CacheProvider: Send + Sync + Debug {
    /// Name the provider was created with
    fn name(&self) -> &str;

    async fn get(&self, key: &str) -> Result<Option<CachedItem>>;

    async fn set(&self, key: &str, value: Value, options: EntryOptions) -> Result<()>;

    /// Returns false if the key was absent
    async fn remove(&self, key: &str) -> Result<bool>;

    /// Removes entries carrying any of `tags`; returns the count.
    async fn invalidate_by_tags(&self, tags: &[String]) -> Result<usize>;

    /// Removes entries whose key matches `pattern`; returns the count.
    async fn invalidate_by_pattern(&self, pattern: &Regex) -> Result<usize>;

    async fn clear(&self) -> Result<usize>;

    async fn len(&self) -> Result<usize>;

    /// Drops expired entries. Backends that expire on their own keep the default.
    async fn scan_expired(&self) -> usize {
        0
    }

    /// Drops up to `max_removals` entries idle for at least `idle_for`.
    async fn prune_idle(&self, _idle_for: Duration, _max_removals: usize) -> usize {
        0
    }
}
