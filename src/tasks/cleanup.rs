//! Maintenance Tasks
//!
//! Background jobs that periodically remove expired and idle cache entries
//! from every registered provider.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::provider::ProviderRegistry;

/// Spawns a task that scans all providers for expired entries every `interval`.
///
/// The task runs until aborted; the returned handle is used for shutdown.
///
/// # Example
/// ```ignore
/// let handle = spawn_expiration_task(registry.clone(), Duration::from_secs(120));
/// // Later, during shutdown:
/// handle.abort();
/// ```
pub fn spawn_expiration_task(registry: Arc<ProviderRegistry>, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!(?interval, "Starting expiration scan task");

        loop {
            tokio::time::sleep(interval).await;

            let mut removed = 0;
            for provider in registry.providers() {
                removed += provider.scan_expired().await;
            }

            if removed > 0 {
                info!("Expiration scan: removed {} expired entries", removed);
            } else {
                debug!("Expiration scan: no expired entries found");
            }
        }
    })
}

/// Spawns a task that prunes entries idle for at least `idle_for`.
///
/// Each pass removes at most `max_removals` entries across all providers.
pub fn spawn_idle_prune_task(
    registry: Arc<ProviderRegistry>,
    interval: Duration,
    idle_for: Duration,
    max_removals: usize,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!(?interval, ?idle_for, max_removals, "Starting idle prune task");

        loop {
            tokio::time::sleep(interval).await;

            let mut removed = 0;
            for provider in registry.providers() {
                let budget = max_removals.saturating_sub(removed);
                if budget == 0 {
                    break;
                }
                removed += provider.prune_idle(idle_for, budget).await;
            }

            if removed > 0 {
                info!("Idle prune: removed {} idle entries", removed);
            } else {
                debug!("Idle prune: no idle entries found");
            }
        }
    })
}
