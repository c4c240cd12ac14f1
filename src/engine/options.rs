//! Caching options for `cache_async`.

use serde_json::Value;

/// Controls which "empty" factory results are worth caching.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheOptions {
    pub cache_null_values: bool,
    pub cache_empty_strings: bool,
    /// Applies to empty arrays and empty objects
    pub cache_empty_collections: bool,
    pub tags: Vec<String>,
}

impl CacheOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cache_null_values(mut self, enabled: bool) -> Self {
        self.cache_null_values = enabled;
        self
    }

    pub fn cache_empty_strings(mut self, enabled: bool) -> Self {
        self.cache_empty_strings = enabled;
        self
    }

    pub fn cache_empty_collections(mut self, enabled: bool) -> Self {
        self.cache_empty_collections = enabled;
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

    /// Whether a serialized factory result may be stored under these options.
    pub fn allows(&self, value: &Value) -> bool {
        match value {
            Value::Null => self.cache_null_values,
            Value::String(s) if s.is_empty() => self.cache_empty_strings,
            Value::Array(items) if items.is_empty() => self.cache_empty_collections,
            Value::Object(fields) if fields.is_empty() => self.cache_empty_collections,
            _ => true,
        }
    }
}
