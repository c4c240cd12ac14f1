//! Cache Engine Module
//!
//! [`CacheEngine`] owns the provider registry, the statistics tracker, the
//! maintenance tasks and the refresh worker. Each engine is independent, so
//! several can coexist in one process.
//!
//! The caching patterns live in submodules:
//! - `patterns`: read-through, multi-level, conditional and refresh-ahead caching
//! - `warmup`: single and batched cache warming
//! - `invalidation`: tag and pattern based invalidation

mod invalidation;
mod options;
mod patterns;
mod warmup;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashSet;
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::task::JoinHandle;
use tracing::info;

use crate::cache::{CacheMetrics, CacheStore, CachedItem, StatisticsTracker, StoreSettings};
use crate::clock::{Clock, MonotonicClock};
use crate::config::Config;
use crate::error::Result;
use crate::provider::{
    CacheProvider, EntryOptions, MemoryCacheProvider, ProviderRegistry, DEFAULT_PROVIDER,
};
use crate::tasks::{spawn_expiration_task, spawn_idle_prune_task, RefreshWorker};

pub use invalidation::compile_pattern;
pub use options::CacheOptions;
pub use warmup::{WarmupEntry, WarmupReport};

// == Cache Engine ==
/// Entry point for all caching operations.
pub struct CacheEngine {
    config: Config,
    clock: Arc<dyn Clock>,
    tracker: Arc<StatisticsTracker>,
    registry: Arc<ProviderRegistry>,
    refresher: RefreshWorker,
    /// `provider/key` pairs with a refresh currently queued or running
    refreshes_in_flight: Arc<DashSet<String>>,
    maintenance: Mutex<Vec<JoinHandle<()>>>,
    running: AtomicBool,
}

impl CacheEngine {
    // == Constructors ==
    /// Creates an engine on the system monotonic clock.
    pub fn new(config: Config) -> Self {
        Self::with_clock(config, Arc::new(MonotonicClock))
    }

    /// Creates an engine reading time from `clock`.
    pub fn with_clock(config: Config, clock: Arc<dyn Clock>) -> Self {
        let tracker = Arc::new(StatisticsTracker::new());
        let default_provider = Arc::new(MemoryCacheProvider::new(
            DEFAULT_PROVIDER,
            new_store(&config, &clock, &tracker),
        ));

        Self {
            registry: Arc::new(ProviderRegistry::new(default_provider)),
            config,
            clock,
            tracker,
            refresher: RefreshWorker::new(),
            refreshes_in_flight: Arc::new(DashSet::new()),
            maintenance: Mutex::new(Vec::new()),
            running: AtomicBool::new(false),
        }
    }

    // == Lifecycle ==
    /// Starts the expiration scan, the idle prune and the refresh worker.
    ///
    /// Must be called from within a tokio runtime. Calling it twice is a no-op.
    pub fn start(&self) {
        if self.running.swap(true, Ordering::AcqRel) {
            return;
        }

        let mut maintenance = self.maintenance.lock();
        maintenance.push(spawn_expiration_task(
            Arc::clone(&self.registry),
            self.config.expiration_scan_interval,
        ));
        maintenance.push(spawn_idle_prune_task(
            Arc::clone(&self.registry),
            self.config.idle_prune_interval,
            self.config.idle_threshold,
            self.config.idle_prune_max_removals,
        ));
        self.refresher.start();

        info!(
            providers = ?self.registry.names(),
            "Cache engine started"
        );
    }

    /// Stops background work. Refreshes still in flight are aborted and
    /// refresh-ahead reads serve stale values without refreshing them until
    /// [`start`](Self::start) is called again.
    pub fn shutdown(&self) {
        for handle in self.maintenance.lock().drain(..) {
            handle.abort();
        }
        self.refresher.shutdown();
        if self.running.swap(false, Ordering::AcqRel) {
            info!("Cache engine stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    // == Providers ==
    /// Registers a provider under `name`, replacing any previous one.
    pub fn register_cache_provider(&self, name: impl Into<String>, provider: Arc<dyn CacheProvider>) {
        self.registry.register(name, provider);
    }

    /// Resolves a provider by name; None selects the default `"memory"` provider.
    pub fn get_cache_provider(&self, name: Option<&str>) -> Result<Arc<dyn CacheProvider>> {
        self.registry.get(name)
    }

    pub fn unregister_cache_provider(&self, name: &str) -> Result<()> {
        self.registry.unregister(name).map(|_| ())
    }

    /// Builds an in-memory provider wired to this engine's clock and
    /// statistics, and registers it under `name`.
    pub fn create_memory_provider(&self, name: &str) -> Arc<MemoryCacheProvider> {
        let provider = Arc::new(MemoryCacheProvider::new(
            name,
            new_store(&self.config, &self.clock, &self.tracker),
        ));
        self.registry.register(name, provider.clone());
        provider
    }

    pub fn provider_names(&self) -> Vec<String> {
        self.registry.names()
    }

    // == Direct Access ==
    /// Reads and deserializes a value.
    pub async fn get<T: DeserializeOwned>(&self, key: &str, provider: Option<&str>) -> Result<Option<T>> {
        match self.get_with_metadata(key, provider).await? {
            Some(item) => item.deserialize().map(Some),
            None => Ok(None),
        }
    }

    /// Reads a value together with its entry metadata.
    pub async fn get_with_metadata(&self, key: &str, provider: Option<&str>) -> Result<Option<CachedItem>> {
        self.registry.get(provider)?.get(key).await
    }

    /// Stores a value; `ttl` None applies the configured default TTL.
    pub async fn set<T: Serialize>(
        &self,
        key: &str,
        value: &T,
        ttl: Option<Duration>,
        provider: Option<&str>,
        tags: &[String],
    ) -> Result<()> {
        let provider = self.registry.get(provider)?;
        let value = serde_json::to_value(value)?;
        let options = self.entry_options(ttl).with_tags(tags.iter().cloned());
        provider.set(key, value, options).await
    }

    pub async fn remove(&self, key: &str, provider: Option<&str>) -> Result<bool> {
        self.registry.get(provider)?.remove(key).await
    }

    pub async fn clear(&self, provider: Option<&str>) -> Result<usize> {
        self.registry.get(provider)?.clear().await
    }

    // == Statistics ==
    pub fn get_statistics(&self) -> CacheMetrics {
        self.tracker.get_cache_metrics()
    }

    pub fn reset_statistics(&self) {
        self.tracker.reset_statistics();
    }

    fn entry_options(&self, ttl: Option<Duration>) -> EntryOptions {
        EntryOptions::new().with_ttl(ttl.unwrap_or(self.config.default_ttl))
    }
}

impl Drop for CacheEngine {
    fn drop(&mut self) {
        for handle in self.maintenance.get_mut().drain(..) {
            handle.abort();
        }
    }
}

fn new_store(config: &Config, clock: &Arc<dyn Clock>, tracker: &Arc<StatisticsTracker>) -> CacheStore {
    let settings = StoreSettings {
        size_limit: config.size_limit,
        compaction_percentage: config.compaction_percentage,
    };
    CacheStore::new(settings, Arc::clone(clock)).with_listener(tracker.clone())
}
