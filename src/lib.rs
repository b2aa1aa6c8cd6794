//! # Tether - connection lifecycle manager for key-value servers
//!
//! Tether owns the clients an application uses to reach a key-value server.
//! It builds each client on first use, verifies it with a short reachability
//! probe, caches it, and tears it down on shutdown or configuration change.
//!
//! ## Features
//!
//! - Direct mode: one endpoint over TCP or a Unix socket
//! - Topology mode: cluster, sentinel or multi-node deployments
//! - Optional TLS with client certificates and custom roots
//! - TOML configuration with environment overrides
//! - Service providers for container-based wiring
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use tether::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> tether::Result<()> {
//!     let manager = Manager::new(Config::direct_only("127.0.0.1:6379"));
//!
//!     manager.ping_direct(&CallContext::background()).await?;
//!     manager.close().await?;
//!     Ok(())
//! }
//! ```
//!
//! ### With providers
//!
//! ```rust,no_run
//! #[tokio::main]
//! async fn main() -> tether::Result<()> {
//!     let container = tether::boot_from_file("app.toml", "redis").await?;
//!     assert!(container.has("config"));
//!     Ok(())
//! }
//! ```
//!
//! ## Crates
//!
//! - `tether_config` - configuration records, defaults, validation, loading
//! - `tether_core` - error taxonomy, providers, container, application
//! - `tether_client` - manager, option translation, redis backend, providers

use std::path::Path;

// ============================================================================
// Crate Re-exports
// ============================================================================

pub use tether_config;
pub use tether_core;

#[cfg(feature = "client")]
pub use tether_client;

pub use tether_config::{Config, ConfigError, DirectConfig, TlsConfig, TopologyConfig};
pub use tether_core::{App, Container, TetherError, TetherErrorKind};

#[cfg(feature = "client")]
pub use tether_client::{CallContext, ClientError, Manager, Mode, SlotState};

// ============================================================================
// Prelude Module
// ============================================================================

/// Common imports
///
/// `use tether::prelude::*;`
pub mod prelude {
    pub use std::result::Result as StdResult;

    pub use tether_config::{Config, ConfigError, DirectConfig, TlsConfig, TopologyConfig};
    pub use tether_core::{App, Container, Provider, TetherErrorKind};

    #[cfg(feature = "client")]
    pub use tether_client::prelude::*;
}

// ============================================================================
// Bootstrap
// ============================================================================

/// Loads `section` of a TOML file with environment overrides, then boots the
/// configuration and connection providers.
///
/// Every enabled mode is connected before this returns.
#[cfg(feature = "client")]
pub async fn boot_from_file<P: AsRef<Path>>(path: P, section: &str) -> Result<Container> {
    let container = App::new()
        .add_provider(tether_client::ConfigProvider::from_file(path.as_ref()).section(section).with_env())?
        .add_provider(tether_client::KvProvider::new())?
        .boot()
        .await?;
    Ok(container)
}

/// Loads and validates a configuration file without connecting.
pub fn load_config<P: AsRef<Path>>(path: P, section: Option<&str>) -> Result<Config> {
    let config = match section {
        Some(section) => Config::from_file_section(path, section)?.load_with_env_override()?,
        None => Config::from_file_with_env(path)?,
    };
    config.validate()?;
    Ok(config)
}

// ============================================================================
// Error Types
// ============================================================================

/// Tether result type
pub type Result<T> = std::result::Result<T, Error>;

/// Tether top-level error
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Framework error
    #[error(transparent)]
    Core(#[from] tether_core::TetherError),

    /// Connection manager error
    #[cfg(feature = "client")]
    #[error(transparent)]
    Client(#[from] tether_client::ClientError),

    /// Configuration error
    #[error(transparent)]
    Config(#[from] tether_config::ConfigError),

    /// IO error
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Classification shared with [`TetherErrorKind`].
    pub fn kind(&self) -> TetherErrorKind {
        match self {
            Error::Core(err) => err.kind(),
            #[cfg(feature = "client")]
            Error::Client(err) => err.kind(),
            Error::Config(_) => TetherErrorKind::ConfigurationInvalid,
            Error::Io(_) => TetherErrorKind::Io,
        }
    }
}

// ============================================================================
// Version Information
// ============================================================================

/// Tether version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Tether package name
pub const NAME: &str = env!("CARGO_PKG_NAME");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
        assert_eq!(NAME, "tether");
    }

    #[test]
    fn test_error_kind_passthrough() {
        let err: Error = ConfigError::Validation("addr cannot be empty".into()).into();
        assert_eq!(err.kind(), TetherErrorKind::ConfigurationInvalid);

        let err: Error = TetherError::unreachable("refused").into();
        assert_eq!(err.kind(), TetherErrorKind::ConnectionUnreachable);
    }
}
