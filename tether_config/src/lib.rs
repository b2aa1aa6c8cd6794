//! Connection configuration for tether.
//!
//! Holds the parameters for the two connection modes (direct and topology),
//! their optional TLS settings, defaults, validation, and loading from TOML
//! files with environment variable overrides.

mod defaults;
mod direct;
pub mod env;
mod tls;
mod topology;
mod transport;

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

pub use crate::direct::DirectConfig;
pub use crate::tls::TlsConfig;
pub use crate::topology::TopologyConfig;
pub use crate::transport::TransportConfig;

/// Configuration error type
#[derive(Error, Debug)]
pub enum ConfigError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// File could not be parsed
    #[error("failed to parse configuration: {0}")]
    Parse(String),

    /// A field violates a range or relation rule
    #[error("configuration validation failed: {0}")]
    Validation(String),

    /// An environment override could not be parsed
    #[error("invalid environment variable: {0}")]
    EnvVar(String),
}

impl ConfigError {
    /// Prefixes a validation message with the section it came from.
    pub fn with_prefix(self, prefix: &str) -> Self {
        match self {
            ConfigError::Validation(msg) => ConfigError::Validation(format!("{}: {}", prefix, msg)),
            other => other,
        }
    }
}

/// Configuration result type
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Top-level configuration record.
///
/// Either mode may be absent; an absent mode is simply unavailable.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Single-endpoint mode.
    #[serde(default = "default_direct", alias = "client")]
    pub direct: Option<DirectConfig>,

    /// Cluster / sentinel / multi-node mode.
    #[serde(default = "default_topology", alias = "universal")]
    pub topology: Option<TopologyConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            direct: default_direct(),
            topology: default_topology(),
        }
    }
}

/// Returns a fresh default configuration with both modes present and disabled.
pub fn default_config() -> Config {
    Config::default()
}

impl Config {
    /// Configuration with only direct mode, enabled, pointing at `addr`.
    pub fn direct_only(addr: impl Into<String>) -> Self {
        Self {
            direct: Some(DirectConfig {
                enabled: true,
                addr: addr.into(),
                ..Default::default()
            }),
            topology: None,
        }
    }

    /// Configuration with only topology mode, enabled, over `addrs`.
    pub fn topology_only<I, S>(addrs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            direct: None,
            topology: Some(TopologyConfig {
                enabled: true,
                addrs: addrs.into_iter().map(Into::into).collect(),
                master_name: String::new(),
                ..Default::default()
            }),
        }
    }

    /// Loads configuration from a TOML file with `direct` / `topology` tables
    /// at the root.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Loads configuration from a named table of a larger TOML file.
    ///
    /// A missing table yields the defaults.
    pub fn from_file_section<P: AsRef<Path>>(path: P, section: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_section(&content, section)
    }

    /// Parses a named table out of TOML text.
    pub fn from_toml_section(content: &str, section: &str) -> Result<Self> {
        let mut root: toml::Table =
            toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;

        match root.remove(section) {
            Some(toml::Value::Table(table)) => table
                .try_into()
                .map_err(|e: toml::de::Error| ConfigError::Parse(e.to_string())),
            Some(_) => Err(ConfigError::Parse(format!("[{}] is not a table", section))),
            None => Ok(Self::default()),
        }
    }

    /// Applies `TETHER_*` environment variable overrides.
    ///
    /// See [`env`] for the variable names.
    pub fn load_with_env_override(self) -> Result<Self> {
        self.apply_env_from(|key| std::env::var(key).ok())
    }

    /// Applies overrides from an arbitrary lookup.
    pub fn apply_env_from<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        env::apply(&mut self, lookup)?;
        Ok(self)
    }

    /// Loads a file and applies environment overrides.
    pub fn from_file_with_env<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::from_file(path)?.load_with_env_override()
    }

    /// Validates each present mode independently.
    pub fn validate(&self) -> Result<()> {
        if let Some(direct) = &self.direct {
            direct
                .validate()
                .map_err(|e| e.with_prefix("direct configuration error"))?;
        }

        if let Some(topology) = &self.topology {
            topology
                .validate()
                .map_err(|e| e.with_prefix("topology configuration error"))?;
        }

        Ok(())
    }

    /// Returns true when at least one mode is enabled.
    pub fn enabled(&self) -> bool {
        self.direct.as_ref().is_some_and(|d| d.enabled)
            || self.topology.as_ref().is_some_and(|t| t.enabled)
    }

    /// Human readable summary. Credentials are never included.
    pub fn summary(&self) -> String {
        let direct = match &self.direct {
            Some(d) => format!(
                "{} {}://{} db={} tls={}",
                if d.enabled { "enabled" } else { "disabled" },
                if d.network.is_empty() { "tcp" } else { d.network.as_str() },
                d.addr,
                d.db,
                d.tls.is_some()
            ),
            None => "not configured".to_string(),
        };
        let topology = match &self.topology {
            Some(t) => format!(
                "{} addrs=[{}] master={:?} cluster={} tls={}",
                if t.enabled { "enabled" } else { "disabled" },
                t.addrs.join(", "),
                t.master_name,
                t.is_cluster_mode,
                t.tls.is_some()
            ),
            None => "not configured".to_string(),
        };
        format!("tether configuration:\n  direct: {}\n  topology: {}", direct, topology)
    }
}

fn default_direct() -> Option<DirectConfig> {
    Some(DirectConfig::default())
}

fn default_topology() -> Option<TopologyConfig> {
    Some(TopologyConfig::default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert!(!config.enabled());
        assert_eq!(config.direct.as_ref().unwrap().addr, "localhost:6379");
        assert_eq!(config.topology.as_ref().unwrap().addrs, vec!["localhost:6379"]);
    }

    #[test]
    fn test_default_config_is_independent() {
        let mut first = default_config();
        first.direct.as_mut().unwrap().addr = "changed:1".to_string();
        let second = default_config();
        assert_eq!(second.direct.unwrap().addr, "localhost:6379");
    }

    #[test]
    fn test_absent_sections_validate() {
        let config = Config { direct: None, topology: None };
        assert!(config.validate().is_ok());
        assert!(!config.enabled());
    }

    #[test]
    fn test_section_prefix() {
        let mut config = Config::default();
        config.topology.as_mut().unwrap().addrs.clear();
        let message = config.validate().unwrap_err().to_string();
        assert!(message.contains("topology configuration error: addrs cannot be empty"));
    }

    #[test]
    fn test_enabled() {
        assert!(Config::direct_only("127.0.0.1:6379").enabled());
        assert!(Config::topology_only(["a:1", "b:2"]).enabled());
    }

    #[test]
    fn test_parse_partial_toml() {
        let config: Config = toml::from_str(
            r#"
            [direct]
            enabled = true
            addr = "10.0.0.5:6380"
            pool_size = 32
            "#,
        )
        .unwrap();
        let direct = config.direct.unwrap();
        assert!(direct.enabled);
        assert_eq!(direct.addr, "10.0.0.5:6380");
        assert_eq!(direct.transport.pool_size, 32);
        assert_eq!(direct.transport.dial_timeout_ms, 5_000);
        assert_eq!(direct.protocol, 3);
        // Untouched section keeps its defaults.
        assert!(!config.topology.unwrap().enabled);
    }

    #[test]
    fn test_legacy_table_names() {
        let config: Config = toml::from_str(
            r#"
            [universal]
            enabled = true
            addrs = ["n1:7000", "n2:7000"]
            master_name = ""
            "#,
        )
        .unwrap();
        assert_eq!(config.topology.unwrap().addrs.len(), 2);
    }

    #[test]
    fn test_from_toml_section() {
        let text = r#"
            [app]
            name = "demo"

            [redis.direct]
            enabled = true
            addr = "cache:6379"

            [redis.direct.tls]
            insecure_skip_verify = true
        "#;
        let config = Config::from_toml_section(text, "redis").unwrap();
        let direct = config.direct.unwrap();
        assert_eq!(direct.addr, "cache:6379");
        assert!(direct.tls.unwrap().insecure_skip_verify);
    }

    #[test]
    fn test_missing_section_is_default() {
        let config = Config::from_toml_section("[other]\nkey = 1\n", "redis").unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_section_not_a_table() {
        let result = Config::from_toml_section("redis = 5\n", "redis");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_env_override_direct() {
        let config = Config::default()
            .apply_env_from(lookup(&[
                (env::ENV_DIRECT_ENABLED, "true"),
                (env::ENV_DIRECT_ADDR, "127.0.0.1:7001"),
                (env::ENV_DIRECT_DB, "4"),
            ]))
            .unwrap();
        let direct = config.direct.unwrap();
        assert!(direct.enabled);
        assert_eq!(direct.addr, "127.0.0.1:7001");
        assert_eq!(direct.db, 4);
    }

    #[test]
    fn test_env_override_topology_addrs() {
        let config = Config { direct: None, topology: None }
            .apply_env_from(lookup(&[
                (env::ENV_TOPOLOGY_ADDRS, "a:1, b:2,,c:3"),
                (env::ENV_TOPOLOGY_CLUSTER_MODE, "true"),
            ]))
            .unwrap();
        assert!(config.direct.is_none());
        let topology = config.topology.unwrap();
        assert_eq!(topology.addrs, vec!["a:1", "b:2", "c:3"]);
        assert!(topology.is_cluster_mode);
    }

    #[test]
    fn test_env_override_invalid_value() {
        let result = Config::default().apply_env_from(lookup(&[(env::ENV_DIRECT_DB, "zero")]));
        assert!(matches!(result, Err(ConfigError::EnvVar(_))));
    }

    #[test]
    fn test_summary_hides_password() {
        let mut config = Config::direct_only("127.0.0.1:6379");
        config.direct.as_mut().unwrap().password = "hunter2".to_string();
        let summary = config.summary();
        assert!(summary.contains("127.0.0.1:6379"));
        assert!(summary.contains("topology: not configured"));
        assert!(!summary.contains("hunter2"));
    }
}
