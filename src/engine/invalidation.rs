//! Tag and pattern based invalidation.

use regex::Regex;
use tracing::info;

use super::CacheEngine;
use crate::error::{CacheError, Result};

/// Compiles an invalidation pattern.
///
/// Any pattern containing `*` is a glob: `*` matches any run of characters,
/// everything else matches literally, and the whole key must match. A
/// pattern without `*` is used as an unanchored regular expression.
///
/// # Example
/// ```
/// use cache_engine::engine::compile_pattern;
///
/// let glob = compile_pattern("User::*").unwrap();
/// assert!(glob.is_match("User::42"));
/// assert!(!glob.is_match("Order::User::42"));
///
/// let dotted = compile_pattern("Cfg.v1::*").unwrap();
/// assert!(dotted.is_match("Cfg.v1::1"));
/// assert!(!dotted.is_match("Cfgxv1::1"));
///
/// let regex = compile_pattern(r"^Order::\d+$").unwrap();
/// assert!(regex.is_match("Order::7"));
/// ```
pub fn compile_pattern(pattern: &str) -> Result<Regex> {
    if pattern.is_empty() {
        return Err(CacheError::InvalidPattern {
            pattern: String::new(),
            reason: "pattern is empty".to_string(),
        });
    }

    let source = if pattern.contains('*') {
        let segments: Vec<String> = pattern.split('*').map(regex::escape).collect();
        format!("^{}$", segments.join(".*"))
    } else {
        pattern.to_string()
    };

    Regex::new(&source).map_err(|err| CacheError::InvalidPattern {
        pattern: pattern.to_string(),
        reason: err.to_string(),
    })
}

impl CacheEngine {
    /// Removes every entry carrying at least one of `tags`.
    pub async fn invalidate_by_tags_async(&self, tags: &[String], provider: Option<&str>) -> Result<usize> {
        let provider = self.registry.get(provider)?;
        if tags.is_empty() {
            return Ok(0);
        }

        let removed = provider.invalidate_by_tags(tags).await?;
        info!(?tags, removed, provider = provider.name(), "Invalidated entries by tag");
        Ok(removed)
    }

    /// Removes every entry whose key matches `pattern`.
    ///
    /// Malformed patterns fail with [`CacheError::InvalidPattern`] before any
    /// entry is touched.
    pub async fn invalidate_by_pattern_async(&self, pattern: &str, provider: Option<&str>) -> Result<usize> {
        let regex = compile_pattern(pattern)?;
        let provider = self.registry.get(provider)?;

        let removed = provider.invalidate_by_pattern(&regex).await?;
        info!(pattern, removed, provider = provider.name(), "Invalidated entries by pattern");
        Ok(removed)
    }
}
