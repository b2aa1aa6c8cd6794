//! Transport-security parameters shared by both connection modes.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::{ConfigError, Result};

/// TLS settings for a connection mode.
///
/// Only paths are stored here. Certificate material is read when the
/// connection options are assembled, never during validation.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TlsConfig {
    /// Client certificate (PEM). Requires `key_file`.
    pub cert_file: String,

    /// Client private key (PEM). Requires `cert_file`.
    pub key_file: String,

    /// CA bundle (PEM) used to verify the server.
    pub ca_file: String,

    /// Expected server name, when it differs from the dialed host.
    pub server_name: String,

    /// Disables peer verification. Must be set explicitly.
    pub insecure_skip_verify: bool,
}

impl TlsConfig {
    /// Checks the cert/key pairing and that every configured path exists.
    ///
    /// `insecure_skip_verify` is accepted as an explicit opt-in.
    pub fn validate(&self) -> Result<()> {
        if !self.cert_file.is_empty() && self.key_file.is_empty() {
            return Err(ConfigError::Validation(
                "key_file must be specified when cert_file is provided".to_string(),
            ));
        }
        if !self.key_file.is_empty() && self.cert_file.is_empty() {
            return Err(ConfigError::Validation(
                "cert_file must be specified when key_file is provided".to_string(),
            ));
        }

        require_file("cert_file", &self.cert_file)?;
        require_file("key_file", &self.key_file)?;
        require_file("ca_file", &self.ca_file)?;

        Ok(())
    }

    /// Returns true when a client certificate pair is configured.
    pub fn has_client_identity(&self) -> bool {
        !self.cert_file.is_empty() && !self.key_file.is_empty()
    }
}

fn require_file(field: &str, path: &str) -> Result<()> {
    if path.is_empty() {
        return Ok(());
    }
    match std::fs::metadata(Path::new(path)) {
        Ok(meta) if meta.is_file() => Ok(()),
        Ok(_) => Err(ConfigError::Validation(format!(
            "{} is not a regular file: {}",
            field, path
        ))),
        Err(_) => Err(ConfigError::Validation(format!(
            "{} does not exist: {}",
            field, path
        ))),
    }
}
