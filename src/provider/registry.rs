//! Named provider registry.

use std::sync::Arc;

use dashmap::DashMap;
use tracing::info;

use crate::error::{CacheError, Result};
use crate::provider::CacheProvider;

/// Name of the provider every registry starts with
pub const DEFAULT_PROVIDER: &str = "memory";

/// Maps provider names to instances. The default provider can be replaced
/// but never removed.
#[derive(Debug)]
pub struct ProviderRegistry {
    providers: DashMap<String, Arc<dyn CacheProvider>>,
}

impl ProviderRegistry {
    /// Creates a registry whose default slot holds `default_provider`.
    pub fn new(default_provider: Arc<dyn CacheProvider>) -> Self {
        let providers = DashMap::new();
        providers.insert(DEFAULT_PROVIDER.to_string(), default_provider);
        Self { providers }
    }

    /// Registers `provider` under `name`, returning the one it replaced.
    pub fn register(
        &self,
        name: impl Into<String>,
        provider: Arc<dyn CacheProvider>,
    ) -> Option<Arc<dyn CacheProvider>> {
        let name = name.into();
        info!(provider = %name, "Registering cache provider");
        self.providers.insert(name, provider)
    }

    /// Resolves `name`, or the default provider when `name` is None.
    pub fn get(&self, name: Option<&str>) -> Result<Arc<dyn CacheProvider>> {
        let name = name.unwrap_or(DEFAULT_PROVIDER);
        self.providers
            .get(name)
            .map(|provider| Arc::clone(provider.value()))
            .ok_or_else(|| CacheError::ProviderNotFound(name.to_string()))
    }

    pub fn unregister(&self, name: &str) -> Result<Arc<dyn CacheProvider>> {
        if name == DEFAULT_PROVIDER {
            return Err(CacheError::Configuration(format!(
                "the default provider '{DEFAULT_PROVIDER}' cannot be unregistered"
            )));
        }
        self.providers
            .remove(name)
            .map(|(_, provider)| provider)
            .ok_or_else(|| CacheError::ProviderNotFound(name.to_string()))
    }

    /// Registered names in sorted order.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.providers.iter().map(|p| p.key().clone()).collect();
        names.sort();
        names
    }

    pub fn providers(&self) -> Vec<Arc<dyn CacheProvider>> {
        self.providers
            .iter()
            .map(|provider| Arc::clone(provider.value()))
            .collect()
    }
}
