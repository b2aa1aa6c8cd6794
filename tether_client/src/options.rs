//! Translation from configuration records to client options.
//!
//! Options are a pure function of a validated record plus the TLS files it
//! names. Zero values take the client defaults listed on each constant.

use std::time::Duration;

use tether_config::{DirectConfig, TopologyConfig, TransportConfig};

use crate::error::{ClientError, Result};
use crate::tls::{non_blank, TlsMaterial};

pub const DEFAULT_DIAL_TIMEOUT: Duration = Duration::from_secs(5);
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(3);
pub const DEFAULT_MAX_RETRIES: u32 = 3;
pub const DEFAULT_MIN_RETRY_BACKOFF: Duration = Duration::from_millis(8);
pub const DEFAULT_MAX_RETRY_BACKOFF: Duration = Duration::from_millis(512);
/// Connections per logical CPU when `pool_size` is zero.
pub const DEFAULT_POOL_SIZE_PER_CPU: usize = 10;

/// Transport used to reach a direct endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Network {
    Tcp,
    Unix,
}

/// Wire protocol version.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Protocol {
    Resp2,
    Resp3,
}

impl Protocol {
    fn from_config(version: u8) -> Result<Self> {
        match version {
            0 | 3 => Ok(Protocol::Resp3),
            2 => Ok(Protocol::Resp2),
            other => Err(ClientError::InvalidConfig(format!(
                "invalid protocol version: {}, must be 2 or 3",
                other
            ))),
        }
    }
}

/// Username and password, each absent when blank.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    pub username: Option<String>,
    pub password: Option<String>,
}

impl Credentials {
    pub fn new(username: &str, password: &str) -> Self {
        Self {
            username: non_blank(username),
            password: if password.is_empty() { None } else { Some(password.to_string()) },
        }
    }

    pub fn is_empty(&self) -> bool {
        self.username.is_none() && self.password.is_none()
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    pub dial: Duration,
    pub read: Duration,
    pub write: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt. Zero disables retries.
    pub max_retries: u32,
    pub min_backoff: Duration,
    pub max_backoff: Duration,
}

impl RetryPolicy {
    /// Delay before retry `attempt` (zero-based): the minimum backoff doubled
    /// per attempt, capped at the maximum.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt).unwrap_or(u32::MAX);
        self.min_backoff.saturating_mul(factor).min(self.max_backoff)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolOptions {
    pub fifo: bool,
    pub size: usize,
    pub timeout: Duration,
    pub min_idle: usize,
    pub max_idle: usize,
    /// Zero means unbounded.
    pub max_active: usize,
    pub conn_max_idle_time: Option<Duration>,
    pub conn_max_lifetime: Option<Duration>,
}

/// Transport settings shared by both modes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportOptions {
    pub timeouts: Timeouts,
    pub retry: RetryPolicy,
    pub pool: PoolOptions,
}

impl TransportOptions {
    pub fn from_config(config: &TransportConfig) -> Result<Self> {
        let read = millis_or(config.read_timeout_ms, DEFAULT_READ_TIMEOUT);
        let timeouts = Timeouts {
            dial: millis_or(config.dial_timeout_ms, DEFAULT_DIAL_TIMEOUT),
            read,
            write: millis_or(config.write_timeout_ms, read),
        };

        let max_retries = match config.max_retries {
            0 => DEFAULT_MAX_RETRIES,
            -1 => 0,
            n if n > 0 => n as u32,
            n => {
                return Err(ClientError::InvalidConfig(format!(
                    "max_retries must be -1 or greater, got: {}",
                    n
                )));
            }
        };
        let retry = RetryPolicy {
            max_retries,
            min_backoff: millis_or(config.min_retry_backoff_ms, DEFAULT_MIN_RETRY_BACKOFF),
            max_backoff: millis_or(config.max_retry_backoff_ms, DEFAULT_MAX_RETRY_BACKOFF),
        };

        let size = match count(config.pool_size, "pool_size")? {
            0 => DEFAULT_POOL_SIZE_PER_CPU * num_cpus::get(),
            n => n,
        };
        let pool = PoolOptions {
            fifo: config.pool_fifo,
            size,
            // Zero pool timeout means read timeout plus one second.
            timeout: millis_or(config.pool_timeout_ms, timeouts.read + Duration::from_secs(1)),
            min_idle: count(config.min_idle_conns, "min_idle_conns")?,
            max_idle: count(config.max_idle_conns, "max_idle_conns")?,
            max_active: count(config.max_active_conns, "max_active_conns")?,
            conn_max_idle_time: optional_millis(config.conn_max_idle_time_ms),
            conn_max_lifetime: optional_millis(config.conn_max_lifetime_ms),
        };

        Ok(Self { timeouts, retry, pool })
    }
}

/// Options for a single-endpoint client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectOptions {
    pub network: Network,
    /// `host:port` for TCP, a socket path for Unix.
    pub addr: String,
    pub credentials: Credentials,
    pub db: i64,
    pub client_name: Option<String>,
    pub protocol: Protocol,
    pub transport: TransportOptions,
    pub tls: Option<TlsMaterial>,
}

impl DirectOptions {
    /// Translates a direct record. TLS files are read here.
    pub fn from_config(config: &DirectConfig) -> Result<Self> {
        let network = match config.network.as_str() {
            "" | "tcp" => Network::Tcp,
            "unix" => Network::Unix,
            other => {
                return Err(ClientError::InvalidConfig(format!(
                    "invalid network type: {}, must be 'tcp' or 'unix'",
                    other
                )));
            }
        };

        let tls = config.tls.as_ref().map(TlsMaterial::load).transpose()?;
        if network == Network::Unix && tls.is_some() {
            return Err(ClientError::InvalidConfig(
                "TLS is not supported over unix sockets".to_string(),
            ));
        }

        Ok(Self {
            network,
            addr: config.addr.trim().to_string(),
            credentials: Credentials::new(&config.username, &config.password),
            db: config.db,
            client_name: non_blank(&config.client_name),
            protocol: Protocol::from_config(config.protocol)?,
            transport: TransportOptions::from_config(&config.transport)?,
            tls,
        })
    }
}

/// Deployment shape behind a topology client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Topology {
    /// One node, possibly listed once.
    Standalone,
    Cluster,
    /// Sentinels monitoring the named primary.
    Sentinel { master_name: String },
}

impl Topology {
    pub fn as_str(&self) -> &'static str {
        match self {
            Topology::Standalone => "standalone",
            Topology::Cluster => "cluster",
            Topology::Sentinel { .. } => "sentinel",
        }
    }
}

/// Read routing for cluster replicas.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReadRouting {
    pub read_only: bool,
    pub by_latency: bool,
    pub randomly: bool,
}

/// Options for a topology-aware client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopologyOptions {
    pub addrs: Vec<String>,
    pub topology: Topology,
    pub credentials: Credentials,
    pub sentinel_credentials: Credentials,
    pub db: i64,
    pub client_name: Option<String>,
    pub protocol: Protocol,
    pub transport: TransportOptions,
    pub tls: Option<TlsMaterial>,
    pub max_redirects: u32,
    pub routing: ReadRouting,
}

impl TopologyOptions {
    /// Translates a topology record. TLS files are read here.
    pub fn from_config(config: &TopologyConfig) -> Result<Self> {
        let addrs: Vec<String> = config.addrs.iter().map(|a| a.trim().to_string()).collect();

        let topology = if !config.master_name.is_empty() {
            Topology::Sentinel {
                master_name: config.master_name.trim().to_string(),
            }
        } else if addrs.len() > 1 || config.is_cluster_mode {
            Topology::Cluster
        } else {
            Topology::Standalone
        };

        let max_redirects = u32::try_from(config.max_redirects).map_err(|_| {
            ClientError::InvalidConfig(format!(
                "max_redirects must be non-negative, got: {}",
                config.max_redirects
            ))
        })?;

        let by_latency = config.route_by_latency;
        let randomly = config.route_randomly;
        let routing = ReadRouting {
            read_only: config.read_only || by_latency || randomly,
            by_latency,
            randomly,
        };

        Ok(Self {
            addrs,
            topology,
            credentials: Credentials::new(&config.username, &config.password),
            sentinel_credentials: Credentials::new(&config.sentinel_username, &config.sentinel_password),
            db: config.db,
            client_name: non_blank(&config.client_name),
            protocol: Protocol::from_config(config.protocol)?,
            transport: TransportOptions::from_config(&config.transport)?,
            tls: config.tls.as_ref().map(TlsMaterial::load).transpose()?,
            max_redirects,
            routing,
        })
    }
}

fn millis_or(ms: u64, default: Duration) -> Duration {
    if ms == 0 {
        default
    } else {
        Duration::from_millis(ms)
    }
}

fn optional_millis(ms: u64) -> Option<Duration> {
    if ms == 0 {
        None
    } else {
        Some(Duration::from_millis(ms))
    }
}

fn count(value: i32, field: &str) -> Result<usize> {
    usize::try_from(value).map_err(|_| {
        ClientError::InvalidConfig(format!("{} must be non-negative, got: {}", field, value))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tether_config::TlsConfig;

    #[test]
    fn test_direct_defaults() {
        let options = DirectOptions::from_config(&DirectConfig::default()).unwrap();
        assert_eq!(options.network, Network::Tcp);
        assert_eq!(options.addr, "localhost:6379");
        assert!(options.credentials.is_empty());
        assert_eq!(options.protocol, Protocol::Resp3);
        assert_eq!(options.transport.timeouts.dial, Duration::from_secs(5));
        assert_eq!(options.transport.retry.max_retries, 3);
        assert_eq!(options.transport.pool.size, 10);
        assert_eq!(options.transport.pool.timeout, Duration::from_secs(4));
        assert_eq!(options.transport.pool.conn_max_idle_time, Some(Duration::from_secs(1800)));
        assert_eq!(options.transport.pool.conn_max_lifetime, None);
        assert!(options.tls.is_none());
    }

    #[test]
    fn test_zero_values_take_client_defaults() {
        let transport = TransportConfig {
            dial_timeout_ms: 0,
            read_timeout_ms: 0,
            write_timeout_ms: 0,
            max_retries: 0,
            min_retry_backoff_ms: 0,
            max_retry_backoff_ms: 0,
            pool_size: 0,
            pool_timeout_ms: 0,
            ..Default::default()
        };
        let options = TransportOptions::from_config(&transport).unwrap();
        assert_eq!(options.timeouts.dial, DEFAULT_DIAL_TIMEOUT);
        assert_eq!(options.timeouts.read, DEFAULT_READ_TIMEOUT);
        assert_eq!(options.timeouts.write, DEFAULT_READ_TIMEOUT);
        assert_eq!(options.retry.max_retries, 3);
        assert_eq!(options.retry.min_backoff, Duration::from_millis(8));
        assert_eq!(options.retry.max_backoff, Duration::from_millis(512));
        assert_eq!(options.pool.size, DEFAULT_POOL_SIZE_PER_CPU * num_cpus::get());
        assert_eq!(options.pool.timeout, Duration::from_secs(4));
    }

    #[test]
    fn test_write_timeout_follows_read() {
        let transport = TransportConfig {
            read_timeout_ms: 750,
            write_timeout_ms: 0,
            ..Default::default()
        };
        let options = TransportOptions::from_config(&transport).unwrap();
        assert_eq!(options.timeouts.write, Duration::from_millis(750));
    }

    #[test]
    fn test_backoff_doubles_up_to_cap() {
        let retry = RetryPolicy {
            max_retries: 3,
            min_backoff: Duration::from_millis(8),
            max_backoff: Duration::from_millis(50),
        };
        assert_eq!(retry.backoff(0), Duration::from_millis(8));
        assert_eq!(retry.backoff(1), Duration::from_millis(16));
        assert_eq!(retry.backoff(2), Duration::from_millis(32));
        assert_eq!(retry.backoff(3), Duration::from_millis(50));
        assert_eq!(retry.backoff(40), Duration::from_millis(50));
    }

    #[test]
    fn test_retries_disabled() {
        let transport = TransportConfig { max_retries: -1, ..Default::default() };
        assert_eq!(TransportOptions::from_config(&transport).unwrap().retry.max_retries, 0);
    }

    #[test]
    fn test_blank_strings_become_none() {
        let config = DirectConfig {
            network: String::new(),
            username: "  ".to_string(),
            client_name: "".to_string(),
            ..Default::default()
        };
        let options = DirectOptions::from_config(&config).unwrap();
        assert_eq!(options.network, Network::Tcp);
        assert_eq!(options.credentials.username, None);
        assert_eq!(options.client_name, None);
    }

    #[test]
    fn test_protocol_two() {
        let config = DirectConfig { protocol: 2, ..Default::default() };
        assert_eq!(DirectOptions::from_config(&config).unwrap().protocol, Protocol::Resp2);
    }

    #[test]
    fn test_unix_with_tls_rejected() {
        let config = DirectConfig {
            network: "unix".to_string(),
            addr: "/tmp/redis.sock".to_string(),
            tls: Some(TlsConfig::default()),
            ..Default::default()
        };
        assert!(matches!(
            DirectOptions::from_config(&config),
            Err(ClientError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_missing_tls_file_is_invalid_config() {
        let config = DirectConfig {
            tls: Some(TlsConfig {
                ca_file: "/missing/ca.pem".to_string(),
                ..Default::default()
            }),
            ..Default::default()
        };
        let err = DirectOptions::from_config(&config).unwrap_err();
        assert!(err.to_string().contains("failed to read CA certificate"));
    }

    #[test]
    fn test_topology_kind_selection() {
        let sentinel = TopologyConfig::default();
        assert_eq!(
            TopologyOptions::from_config(&sentinel).unwrap().topology,
            Topology::Sentinel { master_name: "mymaster".to_string() }
        );

        let single = TopologyConfig {
            master_name: String::new(),
            ..Default::default()
        };
        assert_eq!(TopologyOptions::from_config(&single).unwrap().topology, Topology::Standalone);

        let many = TopologyConfig {
            addrs: vec!["a:1".to_string(), "b:2".to_string()],
            master_name: String::new(),
            ..Default::default()
        };
        assert_eq!(TopologyOptions::from_config(&many).unwrap().topology, Topology::Cluster);

        let forced = TopologyConfig {
            master_name: String::new(),
            is_cluster_mode: true,
            ..Default::default()
        };
        assert_eq!(TopologyOptions::from_config(&forced).unwrap().topology, Topology::Cluster);
    }

    #[test]
    fn test_routing_implies_read_only() {
        let config = TopologyConfig {
            route_randomly: true,
            master_name: String::new(),
            ..Default::default()
        };
        let routing = TopologyOptions::from_config(&config).unwrap().routing;
        assert!(routing.read_only);
        assert!(routing.randomly);
        assert!(!routing.by_latency);
    }

    #[test]
    fn test_sentinel_credentials_kept_apart() {
        let config = TopologyConfig {
            password: "data".to_string(),
            sentinel_password: "watch".to_string(),
            ..Default::default()
        };
        let options = TopologyOptions::from_config(&config).unwrap();
        assert_eq!(options.credentials.password.as_deref(), Some("data"));
        assert_eq!(options.sentinel_credentials.password.as_deref(), Some("watch"));
        assert!(!format!("{:?}", options).contains("watch"));
    }
}
