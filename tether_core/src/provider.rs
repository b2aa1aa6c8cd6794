//! Service providers
//!
//! Defines the `Provider` trait and the registry that orders providers by
//! their declared dependencies.

use crate::container::Container;
use crate::{Result, TetherError};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};

/// A unit of wiring: publishes services into the container.
///
/// `register` runs for every provider first, then `boot` runs for every
/// provider, both in dependency order.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Unique provider name
    fn name(&self) -> &'static str;

    /// Names of providers that must run first
    fn requires(&self) -> &'static [&'static str] {
        &[]
    }

    /// Publishes services. Must not perform network I/O.
    fn register(&mut self, container: &mut Container) -> Result<()>;

    /// Finishes setup once every provider has registered.
    async fn boot(&mut self, _container: &mut Container) -> Result<()> {
        Ok(())
    }

    /// Names this provider has published so far
    fn provides(&self) -> Vec<String> {
        Vec::new()
    }
}

/// Provider registry
pub struct ProviderRegistry {
    providers: Vec<Box<dyn Provider>>,
    names: HashMap<String, usize>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self {
            providers: Vec::new(),
            names: HashMap::new(),
        }
    }

    /// Registers a provider. Names must be unique.
    pub fn add(&mut self, provider: Box<dyn Provider>) -> Result<&mut Self> {
        let name = provider.name().to_string();

        if self.names.contains_key(&name) {
            return Err(TetherError::provider(format!("provider already registered: {}", name)));
        }

        self.names.insert(name, self.providers.len());
        self.providers.push(provider);
        Ok(self)
    }

    pub fn providers(&self) -> &[Box<dyn Provider>] {
        &self.providers
    }

    pub(crate) fn get_mut(&mut self, name: &str) -> Option<&mut Box<dyn Provider>> {
        let index = *self.names.get(name)?;
        self.providers.get_mut(index)
    }

    /// Checks that every declared dependency is registered.
    pub fn validate_dependencies(&self) -> Result<()> {
        for provider in &self.providers {
            for dep in provider.requires() {
                if !self.names.contains_key(*dep) {
                    return Err(TetherError::provider(format!(
                        "provider {} requires {}, which is not registered",
                        provider.name(),
                        dep
                    )));
                }
            }
        }
        Ok(())
    }

    /// Returns provider names in dependency order.
    ///
    /// Ties keep registration order. Cycles are an error.
    pub fn initialization_order(&self) -> Result<Vec<String>> {
        let mut order = Vec::with_capacity(self.providers.len());
        let mut done = HashSet::new();
        let mut visiting = HashSet::new();

        for provider in &self.providers {
            self.visit(provider.name(), &mut order, &mut done, &mut visiting)?;
        }

        Ok(order)
    }

    fn visit(
        &self,
        name: &str,
        order: &mut Vec<String>,
        done: &mut HashSet<String>,
        visiting: &mut HashSet<String>,
    ) -> Result<()> {
        if done.contains(name) {
            return Ok(());
        }
        if !visiting.insert(name.to_string()) {
            return Err(TetherError::provider(format!("dependency cycle at {}", name)));
        }

        if let Some(&index) = self.names.get(name) {
            for dep in self.providers[index].requires() {
                self.visit(dep, order, done, visiting)?;
            }
        }

        visiting.remove(name);
        done.insert(name.to_string());
        order.push(name.to_string());
        Ok(())
    }

    pub fn count(&self) -> usize {
        self.providers.len()
    }
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::new()
    }
}
