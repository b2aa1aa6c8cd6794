//! Timeout, retry and pool settings shared by both connection modes.

use serde::{Deserialize, Serialize};

use crate::defaults::*;
use crate::{ConfigError, Result};

/// Transport tuning, flattened into each mode's table.
///
/// Durations are in milliseconds. Zero means "use the client default".
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransportConfig {
    /// Dial timeout.
    #[serde(default = "default_dial_timeout_ms")]
    pub dial_timeout_ms: u64,

    /// Socket read timeout.
    #[serde(default = "default_read_timeout_ms")]
    pub read_timeout_ms: u64,

    /// Socket write timeout.
    #[serde(default = "default_write_timeout_ms")]
    pub write_timeout_ms: u64,

    /// Command retries. `-1` disables retries.
    #[serde(default = "default_max_retries")]
    pub max_retries: i32,

    /// Minimum backoff between retries.
    #[serde(default = "default_min_retry_backoff_ms")]
    pub min_retry_backoff_ms: u64,

    /// Maximum backoff between retries.
    #[serde(default = "default_max_retry_backoff_ms")]
    pub max_retry_backoff_ms: u64,

    /// FIFO instead of LIFO pool ordering.
    #[serde(default)]
    pub pool_fifo: bool,

    /// Base number of socket connections.
    #[serde(default = "default_pool_size")]
    pub pool_size: i32,

    /// Time to wait for a pooled connection.
    #[serde(default = "default_pool_timeout_ms")]
    pub pool_timeout_ms: u64,

    /// Minimum idle connections.
    #[serde(default)]
    pub min_idle_conns: i32,

    /// Maximum idle connections (0 = unlimited).
    #[serde(default)]
    pub max_idle_conns: i32,

    /// Maximum connections in use at once (0 = unlimited).
    #[serde(default)]
    pub max_active_conns: i32,

    /// Close connections idle for longer than this.
    #[serde(default = "default_conn_max_idle_time_ms")]
    pub conn_max_idle_time_ms: u64,

    /// Close connections older than this (0 = never).
    #[serde(default)]
    pub conn_max_lifetime_ms: u64,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            dial_timeout_ms: default_dial_timeout_ms(),
            read_timeout_ms: default_read_timeout_ms(),
            write_timeout_ms: default_write_timeout_ms(),
            max_retries: default_max_retries(),
            min_retry_backoff_ms: default_min_retry_backoff_ms(),
            max_retry_backoff_ms: default_max_retry_backoff_ms(),
            pool_fifo: false,
            pool_size: default_pool_size(),
            pool_timeout_ms: default_pool_timeout_ms(),
            min_idle_conns: 0,
            max_idle_conns: 0,
            max_active_conns: 0,
            conn_max_idle_time_ms: default_conn_max_idle_time_ms(),
            conn_max_lifetime_ms: 0,
        }
    }
}

impl TransportConfig {
    /// Validates pool counts and the retry bound.
    pub fn validate(&self) -> Result<()> {
        non_negative("pool_size", self.pool_size)?;
        non_negative("min_idle_conns", self.min_idle_conns)?;
        non_negative("max_idle_conns", self.max_idle_conns)?;
        non_negative("max_active_conns", self.max_active_conns)?;

        if self.max_idle_conns > 0 && self.min_idle_conns > self.max_idle_conns {
            return Err(ConfigError::Validation(format!(
                "min_idle_conns ({}) cannot be greater than max_idle_conns ({})",
                self.min_idle_conns, self.max_idle_conns
            )));
        }

        if self.max_retries < -1 {
            return Err(ConfigError::Validation(format!(
                "max_retries must be >= -1, got: {}",
                self.max_retries
            )));
        }

        Ok(())
    }
}

pub(crate) fn non_negative(field: &str, value: i32) -> Result<()> {
    if value < 0 {
        return Err(ConfigError::Validation(format!(
            "{} must be non-negative, got: {}",
            field, value
        )));
    }
    Ok(())
}

pub(crate) fn validate_protocol(protocol: u8) -> Result<()> {
    match protocol {
        0 | 2 | 3 => Ok(()),
        other => Err(ConfigError::Validation(format!(
            "invalid protocol version: {}, must be 2 or 3",
            other
        ))),
    }
}

pub(crate) fn validate_db(db: i64) -> Result<()> {
    if db < 0 {
        return Err(ConfigError::Validation(format!(
            "db must be non-negative, got: {}",
            db
        )));
    }
    Ok(())
}
