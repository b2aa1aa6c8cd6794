//! Tether framework error type
//!
//! Every failure a caller can observe maps onto one [`TetherErrorKind`].

use super::context::ErrorContext;
use std::io;
use thiserror::Error;

/// Tether framework error type
#[derive(Error, Debug)]
pub enum TetherError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Structural or range violation in the configuration
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Requested mode has no configuration record
    #[error("{0} mode is not configured")]
    NotConfigured(String),

    /// Requested mode is present but disabled
    #[error("{0} mode is not enabled")]
    NotEnabled(String),

    /// Reachability probe or health check failed
    #[error("connection unreachable: {0}")]
    Unreachable(String),

    /// Closing an underlying client failed
    #[error("teardown failed: {0}")]
    Teardown(String),

    /// Caller deadline elapsed or the call was cancelled
    #[error("cancelled or timed out: {0}")]
    Cancelled(String),

    /// Provider registration or boot failure
    #[error("provider error: {0}")]
    Provider(String),

    /// Container lookup failure
    #[error("container error: {0}")]
    Container(String),

    /// Error with context
    #[error("{0} ({1})")]
    WithContext(#[source] Box<TetherError>, ErrorContext),
}

impl TetherError {
    /// Returns the error kind
    pub fn kind(&self) -> TetherErrorKind {
        match self {
            TetherError::Io(_) => TetherErrorKind::Io,
            TetherError::Config(_) => TetherErrorKind::ConfigurationInvalid,
            TetherError::NotConfigured(_) => TetherErrorKind::ModeNotConfigured,
            TetherError::NotEnabled(_) => TetherErrorKind::ModeNotEnabled,
            TetherError::Unreachable(_) => TetherErrorKind::ConnectionUnreachable,
            TetherError::Teardown(_) => TetherErrorKind::TeardownFailed,
            TetherError::Cancelled(_) => TetherErrorKind::CancelledOrTimedOut,
            TetherError::Provider(_) => TetherErrorKind::Provider,
            TetherError::Container(_) => TetherErrorKind::Container,
            TetherError::WithContext(inner, _) => inner.kind(),
        }
    }

    /// Adds context information
    pub fn with_context<C>(self, context: C) -> Self
    where
        C: Into<ErrorContext>,
    {
        TetherError::WithContext(Box::new(self), context.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        TetherError::Config(msg.into())
    }

    pub fn unreachable(msg: impl Into<String>) -> Self {
        TetherError::Unreachable(msg.into())
    }

    pub fn teardown(msg: impl Into<String>) -> Self {
        TetherError::Teardown(msg.into())
    }

    pub fn cancelled(msg: impl Into<String>) -> Self {
        TetherError::Cancelled(msg.into())
    }

    pub fn provider(msg: impl Into<String>) -> Self {
        TetherError::Provider(msg.into())
    }

    pub fn container(msg: impl Into<String>) -> Self {
        TetherError::Container(msg.into())
    }
}

/// Error classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TetherErrorKind {
    /// Validation or translation rejected the configuration. Never retried.
    ConfigurationInvalid,
    /// The requested mode has no configuration record.
    ModeNotConfigured,
    /// The requested mode is disabled.
    ModeNotEnabled,
    /// The probe or a health check could not reach the server.
    ConnectionUnreachable,
    /// An underlying client failed to close.
    TeardownFailed,
    /// A caller-supplied deadline or cancellation fired.
    CancelledOrTimedOut,
    /// Provider wiring failed.
    Provider,
    /// Container lookup failed.
    Container,
    /// IO error
    Io,
}

impl TetherErrorKind {
    /// Whether a caller may reasonably retry the same call later.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            TetherErrorKind::ConnectionUnreachable | TetherErrorKind::CancelledOrTimedOut
        )
    }
}
