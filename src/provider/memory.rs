//! In-memory cache provider backed by a local [`CacheStore`].

use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use serde_json::Value;

use crate::cache::{CacheStore, CachedItem, RemovalCause};
use crate::error::Result;
use crate::provider::{CacheProvider, EntryOptions};

/// Local provider; every operation completes synchronously on the store.
#[derive(Debug)]
pub struct MemoryCacheProvider {
    name: String,
    store: CacheStore,
}

impl MemoryCacheProvider {
    pub fn new(name: impl Into<String>, store: CacheStore) -> Self {
        Self {
            name: name.into(),
            store,
        }
    }

    pub fn store(&self) -> &CacheStore {
        &self.store
    }
}

#[async_trait]
impl CacheProvider for MemoryCacheProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn get(&self, key: &str) -> Result<Option<CachedItem>> {
        Ok(self.store.try_get(key))
    }

    async fn set(&self, key: &str, value: Value, options: EntryOptions) -> Result<()> {
        self.store
            .set(key, value, options.ttl, options.tags, options.weight);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<bool> {
        Ok(self.store.remove(key))
    }

    async fn invalidate_by_tags(&self, tags: &[String]) -> Result<usize> {
        if tags.is_empty() {
            return Ok(0);
        }
        Ok(self
            .store
            .remove_where(RemovalCause::Invalidated, |_, entry| entry.has_any_tag(tags)))
    }

    async fn invalidate_by_pattern(&self, pattern: &Regex) -> Result<usize> {
        Ok(self
            .store
            .remove_where(RemovalCause::Invalidated, |key, _| pattern.is_match(key)))
    }

    async fn clear(&self) -> Result<usize> {
        Ok(self.store.clear())
    }

    async fn len(&self) -> Result<usize> {
        Ok(self.store.len())
    }

    async fn scan_expired(&self) -> usize {
        self.store.scan_expired()
    }

    async fn prune_idle(&self, idle_for: Duration, max_removals: usize) -> usize {
        self.store.prune_idle(idle_for, max_removals)
    }
}
