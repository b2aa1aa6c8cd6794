//! Topology mode: cluster, sentinel or plain multi-node deployments.

use serde::{Deserialize, Serialize};

use crate::defaults::*;
use crate::tls::TlsConfig;
use crate::transport::{validate_db, validate_protocol, TransportConfig};
use crate::{ConfigError, Result};

/// Parameters for a multi-address connection.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopologyConfig {
    /// Activates this mode.
    #[serde(default)]
    pub enabled: bool,

    /// Seed addresses. Sentinel addresses when `master_name` is set.
    #[serde(default = "default_addrs")]
    pub addrs: Vec<String>,

    #[serde(default)]
    pub username: String,

    #[serde(default)]
    pub password: String,

    /// Credentials for the sentinel nodes themselves.
    #[serde(default)]
    pub sentinel_username: String,

    #[serde(default)]
    pub sentinel_password: String,

    /// Logical database index. Ignored by clusters.
    #[serde(default)]
    pub db: i64,

    #[serde(default)]
    pub client_name: String,

    /// RESP version, 2 or 3. Zero means the client default.
    #[serde(default = "default_protocol")]
    pub protocol: u8,

    #[serde(flatten)]
    pub transport: TransportConfig,

    #[serde(default)]
    pub tls: Option<TlsConfig>,

    /// Maximum MOVED/ASK redirects followed per command.
    #[serde(default = "default_max_redirects")]
    pub max_redirects: i32,

    /// Allow reads from replicas.
    #[serde(default)]
    pub read_only: bool,

    /// Route reads to the closest node. Implies `read_only`.
    #[serde(default)]
    pub route_by_latency: bool,

    /// Route reads to a random node. Implies `read_only`.
    #[serde(default)]
    pub route_randomly: bool,

    /// Monitored group name. Non-empty selects sentinel mode.
    #[serde(default = "default_master_name")]
    pub master_name: String,

    /// Use cluster semantics even with a single address.
    #[serde(default)]
    pub is_cluster_mode: bool,
}

impl Default for TopologyConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            addrs: default_addrs(),
            username: String::new(),
            password: String::new(),
            sentinel_username: String::new(),
            sentinel_password: String::new(),
            db: 0,
            client_name: String::new(),
            protocol: default_protocol(),
            transport: TransportConfig::default(),
            tls: None,
            max_redirects: default_max_redirects(),
            read_only: false,
            route_by_latency: false,
            route_randomly: false,
            master_name: default_master_name(),
            is_cluster_mode: false,
        }
    }
}

impl TopologyConfig {
    /// Validates every field, enabled or not.
    pub fn validate(&self) -> Result<()> {
        if self.addrs.is_empty() {
            return Err(ConfigError::Validation("addrs cannot be empty".to_string()));
        }
        for (i, addr) in self.addrs.iter().enumerate() {
            if addr.trim().is_empty() {
                return Err(ConfigError::Validation(format!("addrs[{}] cannot be empty", i)));
            }
        }

        validate_db(self.db)?;
        validate_protocol(self.protocol)?;
        self.transport.validate()?;

        if self.max_redirects < 0 {
            return Err(ConfigError::Validation(format!(
                "max_redirects must be non-negative, got: {}",
                self.max_redirects
            )));
        }

        if !self.master_name.is_empty() && self.master_name.trim().is_empty() {
            return Err(ConfigError::Validation(
                "master_name cannot be blank when specified".to_string(),
            ));
        }

        if let Some(tls) = &self.tls {
            tls.validate()
                .map_err(|e| e.with_prefix("TLS configuration error"))?;
        }

        Ok(())
    }
}
