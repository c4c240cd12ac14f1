//! Cache Entry Module
//!
//! Defines individual cache entries with TTL, tag and access-time metadata.

use std::collections::HashSet;
use std::io;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::Result;

// == Cache Entry ==
/// A single stored value plus the metadata used for expiry, eviction and
/// invalidation.
#[derive(Debug)]
pub struct CacheEntry {
    /// The stored value
    pub value: Arc<Value>,
    /// Instant the entry was written
    pub created_at: Instant,
    /// Instant the entry expires, None = no expiration
    pub expires_at: Option<Instant>,
    /// Labels used for bulk invalidation
    pub tags: Arc<HashSet<String>>,
    /// Units counted against the store's size limit
    pub weight: u64,
    /// Approximate footprint: key length plus serialized value length
    pub size_bytes: u64,
    /// Nanoseconds between `created_at` and the most recent access
    last_access_offset: AtomicU64,
}

impl CacheEntry {
    // == Constructor ==
    /// Creates a new cache entry written at `now`.
    ///
    /// A TTL too large to represent as an instant is treated as no expiration.
    pub fn new(
        key: &str,
        value: Value,
        now: Instant,
        ttl: Option<Duration>,
        tags: HashSet<String>,
        weight: u64,
    ) -> Self {
        let size_bytes = key.len() as u64 + value_size(&value);

        Self {
            value: Arc::new(value),
            created_at: now,
            expires_at: ttl.and_then(|ttl| now.checked_add(ttl)),
            tags: Arc::new(tags),
            weight,
            size_bytes,
            last_access_offset: AtomicU64::new(0),
        }
    }

    // == Is Expired ==
    /// Checks if the entry has expired at `now`.
    ///
    /// An entry is expired once `now` reaches its expiration instant.
    pub fn is_expired(&self, now: Instant) -> bool {
        match self.expires_at {
            Some(expires) => now >= expires,
            None => false,
        }
    }

    // == Access Tracking ==
    /// Most recent read or write of this entry.
    pub fn last_accessed(&self) -> Instant {
        self.created_at + Duration::from_nanos(self.last_access_offset.load(Ordering::Relaxed))
    }

    /// Records an access at `now`. Concurrent touches keep the latest instant.
    pub fn touch(&self, now: Instant) {
        let offset = now.saturating_duration_since(self.created_at).as_nanos();
        let offset = u64::try_from(offset).unwrap_or(u64::MAX);
        self.last_access_offset.fetch_max(offset, Ordering::Relaxed);
    }

    /// Time since the entry was last read or written.
    pub fn idle_for(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.last_accessed())
    }

    pub fn has_any_tag(&self, tags: &[String]) -> bool {
        tags.iter().any(|tag| self.tags.contains(tag))
    }

    /// Copies the entry out as a read-only snapshot.
    pub fn to_item(&self) -> CachedItem {
        CachedItem {
            value: Arc::clone(&self.value),
            created_at: self.created_at,
            expires_at: self.expires_at,
            last_accessed: self.last_accessed(),
            tags: Arc::clone(&self.tags),
            weight: self.weight,
        }
    }
}

// == Cached Item ==
/// Snapshot of an entry returned by lookups.
///
/// Carries the metadata alongside the value so callers can tell a cached
/// `null` apart from an absent key, and can reason about the entry's age.
#[derive(Debug, Clone)]
pub struct CachedItem {
    pub value: Arc<Value>,
    pub created_at: Instant,
    pub expires_at: Option<Instant>,
    pub last_accessed: Instant,
    pub tags: Arc<HashSet<String>>,
    pub weight: u64,
}

impl CachedItem {
    /// Deserializes the stored value into `T`.
    pub fn deserialize<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(T::deserialize(self.value.as_ref())?)
    }

    /// Time elapsed since the entry was written.
    pub fn age(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.created_at)
    }

    /// Remaining lifetime, `Some(ZERO)` once expired, None without expiry.
    pub fn ttl_remaining(&self, now: Instant) -> Option<Duration> {
        self.expires_at
            .map(|expires| expires.saturating_duration_since(now))
    }
}

// == Utility Functions ==
/// Serialized length of a value in bytes, computed without allocating.
pub fn value_size(value: &Value) -> u64 {
    let mut counter = ByteCounter(0);
    match serde_json::to_writer(&mut counter, value) {
        Ok(()) => counter.0,
        Err(_) => 0,
    }
}

struct ByteCounter(u64);

impl io::Write for ByteCounter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0 += buf.len() as u64;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
