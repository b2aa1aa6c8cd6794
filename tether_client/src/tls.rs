//! TLS material loading.
//!
//! Reads the certificate, key and CA files named by a [`TlsConfig`] and
//! checks that each one actually parses as PEM before any client is built.

use std::fs;
use std::io::BufReader;
use std::path::Path;

use tether_config::TlsConfig;

use crate::error::{ClientError, Result};

/// PEM-encoded TLS material ready to hand to a client.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct TlsMaterial {
    /// Client certificate chain, present together with `client_key`.
    pub client_cert: Option<Vec<u8>>,
    pub client_key: Option<Vec<u8>>,
    /// Additional trusted roots.
    pub root_cert: Option<Vec<u8>>,
    /// Expected server name, when it differs from the dialed host.
    pub server_name: Option<String>,
    pub insecure_skip_verify: bool,
}

impl std::fmt::Debug for TlsMaterial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TlsMaterial")
            .field("client_cert", &self.client_cert.as_ref().map(Vec::len))
            .field("client_key", &self.client_key.as_ref().map(|_| "<redacted>"))
            .field("root_cert", &self.root_cert.as_ref().map(Vec::len))
            .field("server_name", &self.server_name)
            .field("insecure_skip_verify", &self.insecure_skip_verify)
            .finish()
    }
}

impl TlsMaterial {
    /// Loads and parses the files named by `config`.
    pub fn load(config: &TlsConfig) -> Result<Self> {
        let mut material = TlsMaterial {
            server_name: non_blank(&config.server_name),
            insecure_skip_verify: config.insecure_skip_verify,
            ..Default::default()
        };

        if config.has_client_identity() {
            let cert = read(&config.cert_file, "client certificate")?;
            let key = read(&config.key_file, "client key")?;
            parse_certs(&cert, "client certificate", &config.cert_file)?;
            parse_key(&key, &config.key_file)?;
            material.client_cert = Some(cert);
            material.client_key = Some(key);
        }

        if !config.ca_file.is_empty() {
            let ca = read(&config.ca_file, "CA certificate")?;
            parse_certs(&ca, "CA certificate", &config.ca_file)?;
            material.root_cert = Some(ca);
        }

        Ok(material)
    }

    pub fn has_client_identity(&self) -> bool {
        self.client_cert.is_some() && self.client_key.is_some()
    }

    /// True when nothing beyond the system defaults is configured.
    pub fn uses_default_roots(&self) -> bool {
        self.client_cert.is_none() && self.root_cert.is_none()
    }
}

fn read(path: &str, what: &str) -> Result<Vec<u8>> {
    fs::read(Path::new(path))
        .map_err(|e| ClientError::InvalidConfig(format!("failed to read {} {}: {}", what, path, e)))
}

fn parse_certs(pem: &[u8], what: &str, path: &str) -> Result<()> {
    let mut reader = BufReader::new(pem);
    let certs = rustls_pemfile::certs(&mut reader)
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| ClientError::InvalidConfig(format!("failed to parse {} {}: {}", what, path, e)))?;

    if certs.is_empty() {
        return Err(ClientError::InvalidConfig(format!(
            "failed to parse {} {}: no certificates found",
            what, path
        )));
    }
    Ok(())
}

fn parse_key(pem: &[u8], path: &str) -> Result<()> {
    let mut reader = BufReader::new(pem);
    match rustls_pemfile::private_key(&mut reader) {
        Ok(Some(_)) => Ok(()),
        Ok(None) => Err(ClientError::InvalidConfig(format!(
            "failed to parse client key {}: no private key found",
            path
        ))),
        Err(e) => Err(ClientError::InvalidConfig(format!(
            "failed to parse client key {}: {}",
            path, e
        ))),
    }
}

pub(crate) fn non_blank(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
