//! Direct (single endpoint) mode.

use serde::{Deserialize, Serialize};

use crate::defaults::*;
use crate::tls::TlsConfig;
use crate::transport::{validate_db, validate_protocol, TransportConfig};
use crate::{ConfigError, Result};

/// Parameters for a single-endpoint connection.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectConfig {
    /// Activates this mode.
    #[serde(default)]
    pub enabled: bool,

    /// `tcp` or `unix`. Empty means `tcp`.
    #[serde(default = "default_network")]
    pub network: String,

    /// `host:port`, or a socket path for `unix`.
    #[serde(default = "default_addr")]
    pub addr: String,

    #[serde(default)]
    pub username: String,

    #[serde(default)]
    pub password: String,

    /// Logical database index.
    #[serde(default)]
    pub db: i64,

    /// Name announced with `CLIENT SETNAME`.
    #[serde(default)]
    pub client_name: String,

    /// RESP version, 2 or 3. Zero means the client default.
    #[serde(default = "default_protocol")]
    pub protocol: u8,

    #[serde(flatten)]
    pub transport: TransportConfig,

    #[serde(default)]
    pub tls: Option<TlsConfig>,
}

impl Default for DirectConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            network: default_network(),
            addr: default_addr(),
            username: String::new(),
            password: String::new(),
            db: 0,
            client_name: String::new(),
            protocol: default_protocol(),
            transport: TransportConfig::default(),
            tls: None,
        }
    }
}

impl DirectConfig {
    /// Validates every field, enabled or not.
    pub fn validate(&self) -> Result<()> {
        match self.network.as_str() {
            "" | "tcp" | "unix" => {}
            other => {
                return Err(ConfigError::Validation(format!(
                    "invalid network type: {}, must be 'tcp' or 'unix'",
                    other
                )));
            }
        }

        if self.addr.trim().is_empty() {
            return Err(ConfigError::Validation("addr cannot be empty".to_string()));
        }

        validate_db(self.db)?;
        validate_protocol(self.protocol)?;
        self.transport.validate()?;

        if let Some(tls) = &self.tls {
            tls.validate()
                .map_err(|e| e.with_prefix("TLS configuration error"))?;
        }

        Ok(())
    }
}
