//! Application bootstrap
//!
//! Runs registered providers against a shared container.

use crate::container::Container;
use crate::provider::{Provider, ProviderRegistry};
use crate::{Result, TetherError};
use std::any::Any;
use std::sync::Arc;
use tracing::{debug, info};

/// Application builder
pub struct App {
    registry: ProviderRegistry,
    container: Container,
}

impl App {
    pub fn new() -> Self {
        Self {
            registry: ProviderRegistry::new(),
            container: Container::new(),
        }
    }

    /// Adds a provider. Duplicate names are rejected.
    pub fn add_provider(mut self, provider: impl Provider + 'static) -> Result<Self> {
        self.registry.add(Box::new(provider))?;
        Ok(self)
    }

    /// Seeds the container before any provider runs.
    pub fn with_instance<T>(mut self, name: impl Into<String>, value: Arc<T>) -> Self
    where
        T: Any + Send + Sync,
    {
        self.container.instance(name, value);
        self
    }

    /// Registers then boots every provider in dependency order.
    pub async fn boot(mut self) -> Result<Container> {
        self.registry.validate_dependencies()?;
        let order = self.registry.initialization_order()?;

        for name in &order {
            let provider = self
                .registry
                .get_mut(name)
                .ok_or_else(|| TetherError::provider(format!("unknown provider {}", name)))?;
            debug!(provider = %name, "registering provider");
            provider
                .register(&mut self.container)
                .map_err(|e| e.with_context(("provider", name.clone())))?;
        }

        for name in &order {
            let provider = self
                .registry
                .get_mut(name)
                .ok_or_else(|| TetherError::provider(format!("unknown provider {}", name)))?;
            debug!(provider = %name, "booting provider");
            provider
                .boot(&mut self.container)
                .await
                .map_err(|e| e.with_context(("provider", name.clone())))?;
        }

        info!(
            providers = order.len(),
            instances = self.container.len(),
            "application booted"
        );
        Ok(self.container)
    }

    pub fn provider_count(&self) -> usize {
        self.registry.count()
    }
}

impl Default for App {
    fn default() -> Self {
        Self::new()
    }
}
