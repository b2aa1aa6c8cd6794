//! Service providers that publish configuration and connections into a
//! [`Container`].

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use tether_config::Config;
use tether_core::{Container, Provider, Result, TetherError};
use tracing::info;

use crate::backend::Connector;
use crate::error::ClientError;
use crate::manager::Manager;
use crate::redis_backend::RedisConnector;

/// Container name of the loaded [`Config`].
pub const CONFIG_SERVICE: &str = "config";
/// Container name of the [`Manager`].
pub const MANAGER_SERVICE: &str = "redis";
/// Container name of the verified direct client.
pub const DIRECT_SERVICE: &str = "redis.direct";
/// Container name of the verified topology client.
pub const TOPOLOGY_SERVICE: &str = "redis.topology";

enum Source {
    Value(Config),
    File {
        path: PathBuf,
        section: Option<String>,
        env: bool,
    },
}

/// Loads a [`Config`] and publishes it as `"config"`.
pub struct ConfigProvider {
    source: Option<Source>,
}

impl ConfigProvider {
    /// Publishes an in-memory configuration.
    pub fn from_value(config: Config) -> Self {
        Self {
            source: Some(Source::Value(config)),
        }
    }

    /// Loads the configuration from a TOML file at registration time.
    pub fn from_file(path: impl Into<PathBuf>) -> Self {
        Self {
            source: Some(Source::File {
                path: path.into(),
                section: None,
                env: false,
            }),
        }
    }

    /// Reads the named table instead of the file root.
    pub fn section(mut self, name: impl Into<String>) -> Self {
        if let Some(Source::File { section, .. }) = &mut self.source {
            *section = Some(name.into());
        }
        self
    }

    /// Applies `TETHER_*` environment overrides after loading.
    pub fn with_env(mut self) -> Self {
        if let Some(Source::File { env, .. }) = &mut self.source {
            *env = true;
        }
        self
    }

    fn load(source: Source) -> std::result::Result<Config, tether_config::ConfigError> {
        match source {
            Source::Value(config) => Ok(config),
            Source::File { path, section, env } => {
                let config = match section {
                    Some(section) => Config::from_file_section(&path, &section)?,
                    None => Config::from_file(&path)?,
                };
                if env {
                    config.load_with_env_override()
                } else {
                    Ok(config)
                }
            }
        }
    }
}

#[async_trait]
impl Provider for ConfigProvider {
    fn name(&self) -> &'static str {
        CONFIG_SERVICE
    }

    fn register(&mut self, container: &mut Container) -> Result<()> {
        let source = self
            .source
            .take()
            .ok_or_else(|| TetherError::provider("configuration already registered"))?;
        let config = Self::load(source).map_err(|e| TetherError::config(e.to_string()))?;

        container.instance(CONFIG_SERVICE, Arc::new(config));
        Ok(())
    }

    fn provides(&self) -> Vec<String> {
        vec![CONFIG_SERVICE.to_string()]
    }
}

/// Publishes a [`Manager`] as `"redis"` and, at boot, a verified client per
/// enabled mode.
///
/// Registration validates the configuration and fails fast. Nothing is
/// registered when no mode is enabled.
pub struct KvProvider<C: Connector = RedisConnector> {
    connector: Option<C>,
    config: Option<Arc<Config>>,
    manager: Option<Arc<Manager<C>>>,
    provides: Vec<String>,
}

impl KvProvider<RedisConnector> {
    pub fn new() -> Self {
        Self::with_connector(RedisConnector)
    }
}

impl Default for KvProvider<RedisConnector> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Connector> KvProvider<C> {
    pub fn with_connector(connector: C) -> Self {
        Self {
            connector: Some(connector),
            config: None,
            manager: None,
            provides: Vec::new(),
        }
    }
}

#[async_trait]
impl<C: Connector> Provider for KvProvider<C> {
    fn name(&self) -> &'static str {
        MANAGER_SERVICE
    }

    fn requires(&self) -> &'static [&'static str] {
        &[CONFIG_SERVICE]
    }

    fn register(&mut self, container: &mut Container) -> Result<()> {
        let config = container.make::<Config>(CONFIG_SERVICE)?;
        config.validate().map_err(ClientError::from)?;

        if config.enabled() {
            let connector = self
                .connector
                .take()
                .ok_or_else(|| TetherError::provider("connection manager already registered"))?;
            let manager = Arc::new(Manager::with_connector((*config).clone(), connector));

            container.instance(MANAGER_SERVICE, manager.clone());
            self.manager = Some(manager);
            self.provides.push(MANAGER_SERVICE.to_string());
        } else {
            info!("no connection mode enabled, skipping connection manager");
        }

        self.config = Some(config);
        Ok(())
    }

    async fn boot(&mut self, container: &mut Container) -> Result<()> {
        let (Some(config), Some(manager)) = (&self.config, &self.manager) else {
            return Ok(());
        };

        if config.direct.as_ref().is_some_and(|d| d.enabled) {
            let client = manager.direct().await?;
            container.instance(DIRECT_SERVICE, client);
            self.provides.push(DIRECT_SERVICE.to_string());
        }

        if config.topology.as_ref().is_some_and(|t| t.enabled) {
            let client = manager.topology().await?;
            container.instance(TOPOLOGY_SERVICE, client);
            self.provides.push(TOPOLOGY_SERVICE.to_string());
        }

        Ok(())
    }

    fn provides(&self) -> Vec<String> {
        self.provides.clone()
    }
}
