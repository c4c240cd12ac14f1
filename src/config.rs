//! Configuration Module
//!
//! Handles loading engine and server configuration from environment variables.

use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Engine and server configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// TTL applied when an operation does not specify one
    pub default_ttl: Duration,
    /// Total entry weight a store may hold before compaction, None = unbounded
    pub size_limit: Option<u64>,
    /// Fraction of entries removed by one compaction pass, in (0, 1]
    pub compaction_percentage: f64,
    /// Interval between expiration scans
    pub expiration_scan_interval: Duration,
    /// Interval between idle-key pruning passes
    pub idle_prune_interval: Duration,
    /// Entries untouched for longer than this are pruned
    pub idle_threshold: Duration,
    /// Upper bound on removals per pruning pass
    pub idle_prune_max_removals: usize,
    /// Concurrency limit for batched warm-up when the caller gives none
    pub warmup_max_concurrency: usize,
    /// HTTP server port
    pub server_port: u16,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `DEFAULT_TTL` - Default TTL in seconds (default: 300)
    /// - `SIZE_LIMIT` - Weight limit per store, 0 disables it (default: 10000)
    /// - `COMPACTION_PERCENTAGE` - Fraction removed per compaction (default: 0.25)
    /// - `EXPIRATION_SCAN_INTERVAL` - Expiry scan frequency in seconds (default: 120)
    /// - `IDLE_PRUNE_INTERVAL` - Idle pruning frequency in seconds (default: 300)
    /// - `IDLE_THRESHOLD` - Idle age in seconds before pruning (default: 1800)
    /// - `IDLE_PRUNE_MAX_REMOVALS` - Removals per pruning pass (default: 100)
    /// - `WARMUP_MAX_CONCURRENCY` - Default warm-up concurrency (default: 4)
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let size_limit = match env_parse::<u64>("SIZE_LIMIT") {
            Some(0) => None,
            Some(limit) => Some(limit),
            None => defaults.size_limit,
        };

        let compaction_percentage = env_parse::<f64>("COMPACTION_PERCENTAGE")
            .filter(|pct| *pct > 0.0 && *pct <= 1.0)
            .unwrap_or(defaults.compaction_percentage);

        Self {
            default_ttl: env_secs("DEFAULT_TTL").unwrap_or(defaults.default_ttl),
            size_limit,
            compaction_percentage,
            expiration_scan_interval: env_secs("EXPIRATION_SCAN_INTERVAL")
                .unwrap_or(defaults.expiration_scan_interval),
            idle_prune_interval: env_secs("IDLE_PRUNE_INTERVAL")
                .unwrap_or(defaults.idle_prune_interval),
            idle_threshold: env_secs("IDLE_THRESHOLD").unwrap_or(defaults.idle_threshold),
            idle_prune_max_removals: env_parse("IDLE_PRUNE_MAX_REMOVALS")
                .unwrap_or(defaults.idle_prune_max_removals),
            warmup_max_concurrency: env_parse::<usize>("WARMUP_MAX_CONCURRENCY")
                .filter(|n| *n > 0)
                .unwrap_or(defaults.warmup_max_concurrency),
            server_port: env_parse("SERVER_PORT").unwrap_or(defaults.server_port),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_ttl: Duration::from_secs(300),
            size_limit: Some(10_000),
            compaction_percentage: 0.25,
            expiration_scan_interval: Duration::from_secs(120),
            idle_prune_interval: Duration::from_secs(300),
            idle_threshold: Duration::from_secs(1800),
            idle_prune_max_removals: 100,
            warmup_max_concurrency: 4,
            server_port: 3000,
        }
    }
}

fn env_parse<T: FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.trim().parse().ok())
}

fn env_secs(name: &str) -> Option<Duration> {
    env_parse::<u64>(name).map(Duration::from_secs)
}
