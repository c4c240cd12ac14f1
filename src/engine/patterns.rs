//! Read-through caching patterns.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashSet;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use super::{CacheEngine, CacheOptions};
use crate::error::{CacheError, Result};
use crate::provider::{CacheProvider, EntryOptions, DEFAULT_PROVIDER};
use crate::tasks::RefreshJob;

impl CacheEngine {
    // == Cache Async ==
    /// Returns the cached value for `key`, computing and storing it on a miss.
    ///
    /// A cached JSON `null` counts as a hit. Null, empty-string and
    /// empty-collection results are only stored when `options` allows them.
    /// Factory errors are returned as [`CacheError::Factory`].
    pub async fn cache_async<T, F, Fut, E>(
        &self,
        key: &str,
        ttl: Option<Duration>,
        provider: Option<&str>,
        options: &CacheOptions,
        factory: F,
    ) -> Result<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = std::result::Result<T, E>>,
        E: Into<anyhow::Error>,
    {
        let provider = self.registry.get(provider)?;
        if let Some(item) = provider.get(key).await? {
            return item.deserialize();
        }

        let value = factory().await.map_err(CacheError::factory)?;
        let serialized = serde_json::to_value(&value)?;
        if options.allows(&serialized) {
            let entry = self.entry_options(ttl).with_tags(options.tags.iter().cloned());
            provider.set(key, serialized, entry).await?;
        } else {
            debug!(key, "Factory result not cached under the current options");
        }
        Ok(value)
    }

    // == Multi-Level Cache Async ==
    /// Looks `key` up in `l1`, then `l2`, then calls the factory once.
    ///
    /// An L2 hit is promoted into L1 with `l1_ttl`. A factory result is
    /// written to both tiers.
    pub async fn multi_level_cache_async<T, F, Fut, E>(
        &self,
        key: &str,
        l1_ttl: Option<Duration>,
        l2_ttl: Option<Duration>,
        l1: &str,
        l2: &str,
        factory: F,
    ) -> Result<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = std::result::Result<T, E>>,
        E: Into<anyhow::Error>,
    {
        let l1 = self.registry.get(Some(l1))?;
        let l2 = self.registry.get(Some(l2))?;

        if let Some(item) = l1.get(key).await? {
            return item.deserialize();
        }

        if let Some(item) = l2.get(key).await? {
            let promoted = self.entry_options(l1_ttl).with_tags(item.tags.iter().cloned());
            l1.set(key, item.value.as_ref().clone(), promoted).await?;
            debug!(key, from = l2.name(), to = l1.name(), "Promoted cache entry");
            return item.deserialize();
        }

        let value = factory().await.map_err(CacheError::factory)?;
        let serialized = serde_json::to_value(&value)?;
        l2.set(key, serialized.clone(), self.entry_options(l2_ttl)).await?;
        l1.set(key, serialized, self.entry_options(l1_ttl)).await?;
        Ok(value)
    }

    // == Cache If Async ==
    /// Always runs `factory` and stores its result only when `predicate`
    /// accepts it.
    ///
    /// The cache is written but never read here; every call returns a freshly
    /// computed value.
    pub async fn cache_if_async<T, P, F, Fut, E>(
        &self,
        key: &str,
        ttl: Option<Duration>,
        provider: Option<&str>,
        predicate: P,
        factory: F,
    ) -> Result<T>
    where
        T: Serialize + DeserializeOwned,
        P: FnOnce(&T) -> bool,
        F: FnOnce() -> Fut,
        Fut: Future<Output = std::result::Result<T, E>>,
        E: Into<anyhow::Error>,
    {
        let provider = self.registry.get(provider)?;
        let value = factory().await.map_err(CacheError::factory)?;
        if predicate(&value) {
            provider
                .set(key, serde_json::to_value(&value)?, self.entry_options(ttl))
                .await?;
        }
        Ok(value)
    }

    // == Refresh Behind Async ==
    /// Serves cached values while refreshing them in the background.
    ///
    /// A missing entry is computed in the foreground. An entry older than
    /// `refresh_threshold` is returned as is, and a detached job recomputes
    /// and overwrites it. Only one refresh per provider and key runs at a
    /// time. Refresh failures are logged by the refresh worker.
    pub async fn refresh_behind_async<T, F, Fut, E>(
        &self,
        key: &str,
        ttl: Option<Duration>,
        refresh_threshold: Duration,
        provider: Option<&str>,
        factory: F,
    ) -> Result<T>
    where
        T: Serialize + DeserializeOwned + Send + 'static,
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = std::result::Result<T, E>> + Send + 'static,
        E: Into<anyhow::Error> + Send + 'static,
    {
        let provider_name = provider.unwrap_or(DEFAULT_PROVIDER);
        let provider = self.registry.get(Some(provider_name))?;

        let Some(item) = provider.get(key).await? else {
            let value = factory().await.map_err(CacheError::factory)?;
            provider
                .set(key, serde_json::to_value(&value)?, self.entry_options(ttl))
                .await?;
            return Ok(value);
        };

        if item.age(self.clock.now()) >= refresh_threshold {
            let options = self.entry_options(ttl).with_tags(item.tags.iter().cloned());
            self.schedule_refresh(provider_name, provider, key, options, factory);
        }
        item.deserialize()
    }

    fn schedule_refresh<T, F, Fut, E>(
        &self,
        provider_name: &str,
        provider: Arc<dyn CacheProvider>,
        key: &str,
        options: EntryOptions,
        factory: F,
    ) where
        T: Serialize + Send + 'static,
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = std::result::Result<T, E>> + Send + 'static,
        E: Into<anyhow::Error> + Send + 'static,
    {
        let id = format!("{provider_name}/{key}");
        if !self.refreshes_in_flight.insert(id.clone()) {
            debug!(key, provider = provider_name, "Refresh already in flight");
            return;
        }

        let guard = InFlight {
            refreshes: Arc::clone(&self.refreshes_in_flight),
            id: id.clone(),
        };
        let key = key.to_string();
        let job = async move {
            let _guard = guard;
            let value = factory().await.map_err(Into::<anyhow::Error>::into)?;
            provider.set(&key, serde_json::to_value(&value)?, options).await?;
            Ok::<(), anyhow::Error>(())
        };

        self.refresher.dispatch(RefreshJob::new(format!("refresh {id}"), job));
    }
}

/// Releases a refresh slot when the job finishes or is dropped unrun.
struct InFlight {
    refreshes: Arc<DashSet<String>>,
    id: String,
}

impl Drop for InFlight {
    fn drop(&mut self) {
        self.refreshes.remove(&self.id);
    }
}
