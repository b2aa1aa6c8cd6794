//! Client-specific error types

use std::time::Duration;

use tether_core::{TetherError, TetherErrorKind};
use thiserror::Error;

use crate::mode::Mode;

/// Errors raised by the underlying key-value client.
#[derive(Error, Debug)]
pub enum BackendError {
    /// Protocol or server error from the redis client
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The operation did not finish in time
    #[error("timed out after {0:?}")]
    Timeout(Duration),

    /// The handle was closed
    #[error("client is closed")]
    Closed,

    #[error("{0}")]
    Other(String),
}

/// Errors returned by the connection manager.
#[derive(Error, Debug)]
pub enum ClientError {
    /// Validation or option translation rejected the configuration
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// The mode has no configuration record
    #[error("{0} mode is not configured")]
    NotConfigured(Mode),

    /// The mode is configured but disabled
    #[error("{0} mode is not enabled")]
    NotEnabled(Mode),

    /// The reachability probe failed while constructing a client
    #[error("{mode} client unreachable: {source}")]
    Unreachable {
        mode: Mode,
        #[source]
        source: BackendError,
    },

    /// A health check failed
    #[error("{mode} ping failed: {source}")]
    Ping {
        mode: Mode,
        #[source]
        source: BackendError,
    },

    /// Closing a cached client failed
    #[error("failed to close {mode} client: {source}")]
    TeardownFailed {
        mode: Mode,
        #[source]
        source: BackendError,
    },

    /// The caller cancelled the call
    #[error("operation cancelled")]
    Cancelled,

    /// The caller's deadline elapsed
    #[error("operation timed out after {0:?}")]
    TimedOut(Duration),
}

impl ClientError {
    pub fn kind(&self) -> TetherErrorKind {
        match self {
            ClientError::InvalidConfig(_) => TetherErrorKind::ConfigurationInvalid,
            ClientError::NotConfigured(_) => TetherErrorKind::ModeNotConfigured,
            ClientError::NotEnabled(_) => TetherErrorKind::ModeNotEnabled,
            ClientError::Unreachable { .. } | ClientError::Ping { .. } => {
                TetherErrorKind::ConnectionUnreachable
            }
            ClientError::TeardownFailed { .. } => TetherErrorKind::TeardownFailed,
            ClientError::Cancelled | ClientError::TimedOut(_) => TetherErrorKind::CancelledOrTimedOut,
        }
    }

    /// The mode this error concerns, when there is one.
    pub fn mode(&self) -> Option<Mode> {
        match self {
            ClientError::NotConfigured(mode) | ClientError::NotEnabled(mode) => Some(*mode),
            ClientError::Unreachable { mode, .. }
            | ClientError::Ping { mode, .. }
            | ClientError::TeardownFailed { mode, .. } => Some(*mode),
            _ => None,
        }
    }
}

impl From<tether_config::ConfigError> for ClientError {
    fn from(err: tether_config::ConfigError) -> Self {
        ClientError::InvalidConfig(err.to_string())
    }
}

impl From<ClientError> for TetherError {
    fn from(err: ClientError) -> Self {
        let message = err.to_string();
        let mode = err.mode();
        let converted = match err {
            ClientError::InvalidConfig(msg) => return TetherError::config(msg),
            ClientError::NotConfigured(mode) => return TetherError::NotConfigured(mode.to_string()),
            ClientError::NotEnabled(mode) => return TetherError::NotEnabled(mode.to_string()),
            ClientError::Unreachable { .. } | ClientError::Ping { .. } => {
                TetherError::unreachable(message)
            }
            ClientError::TeardownFailed { .. } => TetherError::teardown(message),
            ClientError::Cancelled | ClientError::TimedOut(_) => TetherError::cancelled(message),
        };
        match mode {
            Some(mode) => converted.with_context(("mode", mode.as_str())),
            None => converted,
        }
    }
}

/// Client result type
pub type Result<T> = std::result::Result<T, ClientError>;
