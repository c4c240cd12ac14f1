//! Cache warming.
//!
//! Pre-populates a provider before traffic arrives. Failures are logged and
//! counted, never returned, so one bad factory cannot abort a batch.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use super::CacheEngine;
use crate::error::Result;
use crate::provider::{CacheProvider, EntryOptions};

type WarmupFuture<T> = Pin<Box<dyn Future<Output = anyhow::Result<T>> + Send>>;

// == Warmup Entry ==
/// A key plus the factory that produces its value.
pub struct WarmupEntry<T> {
    pub key: String,
    pub tags: Vec<String>,
    factory: WarmupFuture<T>,
}

impl<T: Send + 'static> WarmupEntry<T> {
    /// The factory is not called until the batch runs.
    pub fn new<F, Fut, E>(key: impl Into<String>, factory: F) -> Self
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = std::result::Result<T, E>> + Send + 'static,
        E: Into<anyhow::Error> + 'static,
    {
        Self {
            key: key.into(),
            tags: Vec::new(),
            factory: Box::pin(async move { factory().await.map_err(Into::into) }),
        }
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags.extend(tags.into_iter().map(Into::into));
        self
    }
}

// == Warmup Report ==
/// Outcome of a batch warm-up.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WarmupReport {
    pub succeeded: usize,
    pub failed: usize,
}

impl CacheEngine {
    /// Computes and stores one value. Returns false when the factory failed.
    pub async fn warm_cache_async<T, F, Fut, E>(
        &self,
        key: &str,
        ttl: Option<Duration>,
        provider: Option<&str>,
        factory: F,
    ) -> Result<bool>
    where
        T: Serialize,
        F: FnOnce() -> Fut,
        Fut: Future<Output = std::result::Result<T, E>>,
        E: Into<anyhow::Error>,
    {
        let provider = self.registry.get(provider)?;
        let value = match factory().await {
            Ok(value) => value,
            Err(err) => {
                let err = err.into();
                warn!(key, error = %format!("{err:#}"), "Cache warm-up failed");
                return Ok(false);
            }
        };

        provider
            .set(key, serde_json::to_value(&value)?, self.entry_options(ttl))
            .await?;
        debug!(key, "Cache entry warmed");
        Ok(true)
    }

    /// Runs all factories with at most `max_concurrency` in flight and
    /// stores their results.
    ///
    /// `max_concurrency` defaults to the configured warm-up limit; zero is
    /// treated as one. Failing or panicking factories are skipped.
    pub async fn warm_cache_batch_async<T>(
        &self,
        entries: Vec<WarmupEntry<T>>,
        ttl: Option<Duration>,
        provider: Option<&str>,
        max_concurrency: Option<usize>,
    ) -> Result<WarmupReport>
    where
        T: Serialize + Send + 'static,
    {
        let provider = self.registry.get(provider)?;
        let limit = max_concurrency
            .unwrap_or(self.config.warmup_max_concurrency)
            .max(1);
        let ttl = ttl.unwrap_or(self.config.default_ttl);
        let semaphore = Arc::new(Semaphore::new(limit));

        info!(entries = entries.len(), max_concurrency = limit, "Starting cache warm-up");

        let mut tasks = JoinSet::new();
        for entry in entries {
            let semaphore = Arc::clone(&semaphore);
            let provider = Arc::clone(&provider);
            tasks.spawn(async move {
                let key = entry.key.clone();
                let outcome = warm_entry(semaphore, provider, entry, ttl).await;
                (key, outcome)
            });
        }

        let mut report = WarmupReport::default();
        while let Some(finished) = tasks.join_next().await {
            match finished {
                Ok((_, Ok(()))) => report.succeeded += 1,
                Ok((key, Err(err))) => {
                    warn!(key = %key, error = %format!("{err:#}"), "Cache warm-up failed");
                    report.failed += 1;
                }
                Err(err) => {
                    warn!(error = %err, "Cache warm-up factory panicked");
                    report.failed += 1;
                }
            }
        }

        info!(
            succeeded = report.succeeded,
            failed = report.failed,
            "Cache warm-up finished"
        );
        Ok(report)
    }
}

async fn warm_entry<T: Serialize>(
    semaphore: Arc<Semaphore>,
    provider: Arc<dyn CacheProvider>,
    entry: WarmupEntry<T>,
    ttl: Duration,
) -> anyhow::Result<()> {
    let _permit = semaphore.acquire_owned().await?;
    let value = entry.factory.await?;
    let options = EntryOptions::new().with_ttl(ttl).with_tags(entry.tags);
    provider
        .set(&entry.key, serde_json::to_value(&value)?, options)
        .await?;
    Ok(())
}
