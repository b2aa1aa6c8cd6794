//! `redis` crate backend.
//!
//! Clients are built without touching the network. The first `ping` (or
//! `connection`) call dials, and the resulting connection is shared by every
//! later caller until the handle is closed. Single-node connections are
//! wrapped in a [`ConnectionManager`], which redials in the background after
//! a drop using the configured retry policy.

use async_trait::async_trait;
use redis::aio::{ConnectionLike, ConnectionManager, ConnectionManagerConfig};
use redis::cluster::{ClusterClient, ClusterClientBuilder};
use redis::cluster_async::ClusterConnection;
use redis::sentinel::{Sentinel, SentinelNodeConnectionInfo};
use redis::{
    Client, ClientTlsConfig, Cmd, ConnectionInfo, IntoConnectionInfo, Pipeline, ProtocolVersion,
    RedisFuture, TlsCertificates, TlsMode, Value,
};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::backend::{ClientHandle, Connector};
use crate::error::BackendError;
use crate::options::{
    Credentials, DirectOptions, Network, Protocol, RetryPolicy, Topology, TopologyOptions,
    TransportOptions,
};
use crate::tls::TlsMaterial;

/// Builds clients from the `redis` crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct RedisConnector;

impl Connector for RedisConnector {
    type Direct = DirectClient;
    type Topology = TopologyClient;

    fn build_direct(&self, options: &DirectOptions) -> Result<DirectClient, BackendError> {
        DirectClient::build(options)
    }

    fn build_topology(&self, options: &TopologyOptions) -> Result<TopologyClient, BackendError> {
        TopologyClient::build(options)
    }
}

/// Connection state shared by both client kinds.
enum Link<C> {
    Idle,
    Open(C),
    Closed,
}

impl<C: Clone> Link<C> {
    /// The open connection, `None` when a dial is needed.
    fn current(&self) -> Result<Option<C>, BackendError> {
        match self {
            Link::Open(conn) => Ok(Some(conn.clone())),
            Link::Closed => Err(BackendError::Closed),
            Link::Idle => Ok(None),
        }
    }

    fn close(&mut self) -> Result<(), BackendError> {
        match std::mem::replace(self, Link::Closed) {
            Link::Closed => Err(BackendError::Closed),
            Link::Open(_) | Link::Idle => Ok(()),
        }
    }
}

/// Single-endpoint client.
pub struct DirectClient {
    client: Client,
    transport: TransportOptions,
    client_name: Option<String>,
    link: Mutex<Link<ConnectionManager>>,
}

impl DirectClient {
    fn build(options: &DirectOptions) -> Result<Self, BackendError> {
        let scheme = match (options.network, options.tls.is_some()) {
            (Network::Unix, _) => "redis+unix",
            (Network::Tcp, false) => "redis",
            (Network::Tcp, true) => "rediss",
        };
        let insecure = options.tls.as_ref().is_some_and(|t| t.insecure_skip_verify);
        let mut info = connection_info(scheme, &options.addr, insecure)?;
        apply_auth(&mut info, &options.credentials, options.db, options.protocol);

        report_unsupported(&options.transport, options.tls.as_ref());

        let client = match options.tls.as_ref().and_then(certificates) {
            Some(certs) => Client::build_with_tls(info, certs)?,
            None => Client::open(info)?,
        };

        Ok(Self {
            client,
            transport: options.transport.clone(),
            client_name: options.client_name.clone(),
            link: Mutex::new(Link::Idle),
        })
    }

    /// Returns the shared connection, dialing when none is open.
    pub async fn connection(&self) -> Result<ConnectionManager, BackendError> {
        let mut link = self.link.lock().await;
        if let Some(conn) = link.current()? {
            return Ok(conn);
        }

        let conn = dial(self.client.clone(), &self.transport, self.client_name.as_deref()).await?;
        *link = Link::Open(conn.clone());
        Ok(conn)
    }
}

#[async_trait]
impl ClientHandle for DirectClient {
    async fn ping(&self) -> Result<(), BackendError> {
        let mut conn = self.connection().await?;
        ping_with_retry(&mut conn, self.transport.retry, self.client_name.as_deref()).await
    }

    async fn close(&self) -> Result<(), BackendError> {
        self.link.lock().await.close()
    }
}

/// Connection to a standalone, sentinel-resolved or clustered deployment.
#[derive(Clone)]
pub enum TopologyConnection {
    Single(ConnectionManager),
    Cluster(ClusterConnection),
}

impl ConnectionLike for TopologyConnection {
    fn req_packed_command<'a>(&'a mut self, cmd: &'a Cmd) -> RedisFuture<'a, Value> {
        match self {
            TopologyConnection::Single(c) => c.req_packed_command(cmd),
            TopologyConnection::Cluster(c) => c.req_packed_command(cmd),
        }
    }

    fn req_packed_commands<'a>(
        &'a mut self,
        cmd: &'a Pipeline,
        offset: usize,
        count: usize,
    ) -> RedisFuture<'a, Vec<Value>> {
        match self {
            TopologyConnection::Single(c) => c.req_packed_commands(cmd, offset, count),
            TopologyConnection::Cluster(c) => c.req_packed_commands(cmd, offset, count),
        }
    }

    fn get_db(&self) -> i64 {
        match self {
            TopologyConnection::Single(c) => c.get_db(),
            TopologyConnection::Cluster(_) => 0,
        }
    }
}

enum Dialer {
    Single(Client),
    Cluster(ClusterClient),
    Sentinel {
        // `async_master_for` takes `&mut self`.
        sentinel: Mutex<Sentinel>,
        master_name: String,
        node: SentinelNodeConnectionInfo,
    },
}

/// Topology-aware client.
pub struct TopologyClient {
    dialer: Dialer,
    topology: Topology,
    transport: TransportOptions,
    client_name: Option<String>,
    link: Mutex<Link<TopologyConnection>>,
}

impl TopologyClient {
    fn build(options: &TopologyOptions) -> Result<Self, BackendError> {
        report_unsupported(&options.transport, options.tls.as_ref());

        let dialer = match &options.topology {
            Topology::Standalone => Dialer::Single(build_standalone(options)?),
            Topology::Cluster => Dialer::Cluster(build_cluster(options)?),
            Topology::Sentinel { master_name } => build_sentinel(options, master_name)?,
        };

        Ok(Self {
            dialer,
            topology: options.topology.clone(),
            transport: options.transport.clone(),
            client_name: options.client_name.clone(),
            link: Mutex::new(Link::Idle),
        })
    }

    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    /// Returns the shared connection, dialing when none is open.
    pub async fn connection(&self) -> Result<TopologyConnection, BackendError> {
        let mut link = self.link.lock().await;
        if let Some(conn) = link.current()? {
            return Ok(conn);
        }

        let name = self.client_name.as_deref();
        let conn = match &self.dialer {
            Dialer::Single(client) => {
                TopologyConnection::Single(dial(client.clone(), &self.transport, name).await?)
            }
            Dialer::Cluster(client) => TopologyConnection::Cluster(client.get_async_connection().await?),
            Dialer::Sentinel { sentinel, master_name, node } => {
                let dial_timeout = self.transport.timeouts.dial;
                let mut sentinel = sentinel.lock().await;
                let primary = tokio::time::timeout(
                    dial_timeout,
                    sentinel.async_master_for(master_name, Some(node)),
                )
                .await
                .map_err(|_| BackendError::Timeout(dial_timeout))??;
                debug!(
                    master_name = master_name.as_str(),
                    addr = %primary.get_connection_info().addr,
                    "sentinels resolved primary"
                );
                TopologyConnection::Single(dial(primary, &self.transport, name).await?)
            }
        };

        *link = Link::Open(conn.clone());
        Ok(conn)
    }
}

#[async_trait]
impl ClientHandle for TopologyClient {
    async fn ping(&self) -> Result<(), BackendError> {
        let mut conn = self.connection().await?;
        let result =
            ping_with_retry(&mut conn, self.transport.retry, self.client_name.as_deref()).await;

        // A primary that stays unreachable may have failed over. Ask the
        // sentinels again on the next call.
        if let (Err(err), Dialer::Sentinel { .. }) = (&result, &self.dialer) {
            if is_retryable(err) {
                let mut link = self.link.lock().await;
                if matches!(*link, Link::Open(_)) {
                    *link = Link::Idle;
                }
            }
        }
        result
    }

    async fn close(&self) -> Result<(), BackendError> {
        self.link.lock().await.close()
    }
}

fn build_standalone(options: &TopologyOptions) -> Result<Client, BackendError> {
    let addr = first_addr(options)?;
    let insecure = options.tls.as_ref().is_some_and(|t| t.insecure_skip_verify);
    let mut info = connection_info(scheme(options.tls.is_some()), addr, insecure)?;
    apply_auth(&mut info, &options.credentials, options.db, options.protocol);

    match options.tls.as_ref().and_then(certificates) {
        Some(certs) => Ok(Client::build_with_tls(info, certs)?),
        None => Ok(Client::open(info)?),
    }
}

fn build_cluster(options: &TopologyOptions) -> Result<ClusterClient, BackendError> {
    let insecure = options.tls.as_ref().is_some_and(|t| t.insecure_skip_verify);
    let nodes = options
        .addrs
        .iter()
        .map(|addr| connection_info(scheme(options.tls.is_some()), addr, insecure))
        .collect::<Result<Vec<_>, _>>()?;

    if options.db != 0 {
        warn!(db = options.db, "cluster deployments only serve db 0, ignoring db");
    }
    if options.routing.by_latency || options.routing.randomly {
        debug!("replica routing collapses to read_from_replicas");
    }
    debug!(
        max_redirects = options.max_redirects,
        "cluster redirects are bounded by the retry budget"
    );

    let retry = options.transport.retry;
    let mut builder = ClusterClientBuilder::new(nodes)
        .retries(retry.max_retries)
        .min_retry_wait(retry.min_backoff.as_millis() as u64)
        .max_retry_wait(retry.max_backoff.as_millis() as u64)
        .connection_timeout(options.transport.timeouts.dial)
        .response_timeout(options.transport.timeouts.read)
        .use_protocol(protocol_version(options.protocol));

    if let Some(username) = &options.credentials.username {
        builder = builder.username(username.clone());
    }
    if let Some(password) = &options.credentials.password {
        builder = builder.password(password.clone());
    }
    if options.routing.read_only {
        builder = builder.read_from_replicas();
    }
    if let Some(tls) = &options.tls {
        builder = builder.tls(tls_mode(tls));
        if let Some(certs) = certificates(tls) {
            builder = builder.certs(certs);
        }
    }

    Ok(builder.build()?)
}

fn build_sentinel(options: &TopologyOptions, master_name: &str) -> Result<Dialer, BackendError> {
    let insecure = options.tls.as_ref().is_some_and(|t| t.insecure_skip_verify);
    let sentinels = options
        .addrs
        .iter()
        .map(|addr| {
            let mut info = connection_info(scheme(options.tls.is_some()), addr, insecure)?;
            info.redis.username = options.sentinel_credentials.username.clone();
            info.redis.password = options.sentinel_credentials.password.clone();
            Ok(info)
        })
        .collect::<Result<Vec<_>, BackendError>>()?;

    if options.tls.as_ref().is_some_and(|t| !t.uses_default_roots()) {
        warn!("sentinel connections use the system trust store, custom certificates are ignored");
    }

    // Credentials for the resolved primary.
    let mut primary = connection_info("redis", first_addr(options)?, false)?.redis;
    primary.username = options.credentials.username.clone();
    primary.password = options.credentials.password.clone();
    primary.db = options.db;
    primary.protocol = protocol_version(options.protocol);

    Ok(Dialer::Sentinel {
        sentinel: Mutex::new(Sentinel::build(sentinels)?),
        master_name: master_name.to_string(),
        node: SentinelNodeConnectionInfo {
            tls_mode: options.tls.as_ref().map(tls_mode),
            redis_connection_info: Some(primary),
        },
    })
}

fn first_addr(options: &TopologyOptions) -> Result<&str, BackendError> {
    options
        .addrs
        .first()
        .map(String::as_str)
        .ok_or_else(|| BackendError::Other("no addresses configured".to_string()))
}

fn scheme(tls: bool) -> &'static str {
    if tls { "rediss" } else { "redis" }
}

fn connection_info(scheme: &str, addr: &str, insecure: bool) -> Result<ConnectionInfo, BackendError> {
    let url = match scheme {
        "redis+unix" => format!("redis+unix://{}", addr),
        "rediss" if insecure => format!("rediss://{}/#insecure", addr),
        _ => format!("{}://{}", scheme, addr),
    };
    Ok(url.as_str().into_connection_info()?)
}

fn apply_auth(info: &mut ConnectionInfo, credentials: &Credentials, db: i64, protocol: Protocol) {
    info.redis.username = credentials.username.clone();
    info.redis.password = credentials.password.clone();
    info.redis.db = db;
    info.redis.protocol = protocol_version(protocol);
}

fn protocol_version(protocol: Protocol) -> ProtocolVersion {
    match protocol {
        Protocol::Resp2 => ProtocolVersion::RESP2,
        Protocol::Resp3 => ProtocolVersion::RESP3,
    }
}

fn tls_mode(tls: &TlsMaterial) -> TlsMode {
    if tls.insecure_skip_verify {
        TlsMode::Insecure
    } else {
        TlsMode::Secure
    }
}

fn certificates(tls: &TlsMaterial) -> Option<TlsCertificates> {
    if tls.uses_default_roots() {
        return None;
    }
    let client_tls = match (&tls.client_cert, &tls.client_key) {
        (Some(cert), Some(key)) => Some(ClientTlsConfig {
            client_cert: cert.clone(),
            client_key: key.clone(),
        }),
        _ => None,
    };
    Some(TlsCertificates {
        client_tls,
        root_cert: tls.root_cert.clone(),
    })
}

/// Logs settings that the `redis` crate has no knob for.
fn report_unsupported(transport: &TransportOptions, tls: Option<&TlsMaterial>) {
    debug!(
        pool_size = transport.pool.size,
        min_idle = transport.pool.min_idle,
        max_idle = transport.pool.max_idle,
        "multiplexed connections ignore pool sizing"
    );
    if transport.timeouts.write != transport.timeouts.read {
        debug!(
            write_timeout = ?transport.timeouts.write,
            "write timeout is covered by the response timeout"
        );
    }
    if let Some(name) = tls.and_then(|t| t.server_name.as_deref()) {
        warn!(server_name = name, "TLS server name override is not supported, using the dialed host");
    }
}

/// Reconnect settings for single-node connections.
fn manager_config(transport: &TransportOptions) -> ConnectionManagerConfig {
    let retry = transport.retry;
    // Delays grow as `factor * 2^n` milliseconds, capped at `max_delay`.
    ConnectionManagerConfig::new()
        .set_number_of_retries(retry.max_retries as usize)
        .set_factor(retry.min_backoff.as_millis().max(1) as u64)
        .set_max_delay(retry.max_backoff.as_millis() as u64)
        .set_connection_timeout(transport.timeouts.dial)
        .set_response_timeout(transport.timeouts.read)
}

async fn dial(
    client: Client,
    transport: &TransportOptions,
    client_name: Option<&str>,
) -> Result<ConnectionManager, BackendError> {
    let mut conn = ConnectionManager::new_with_config(client, manager_config(transport)).await?;
    set_client_name(&mut conn, client_name).await?;
    Ok(conn)
}

async fn set_client_name<C>(conn: &mut C, name: Option<&str>) -> Result<(), BackendError>
where
    C: ConnectionLike + Send,
{
    if let Some(name) = name {
        let _: () = redis::cmd("CLIENT").arg("SETNAME").arg(name).query_async(conn).await?;
    }
    Ok(())
}

async fn ping<C>(conn: &mut C) -> Result<(), BackendError>
where
    C: ConnectionLike + Send,
{
    let _: String = redis::cmd("PING").query_async(conn).await?;
    Ok(())
}

/// Pings, retrying dropped connections up to `retry.max_retries` times.
///
/// The connection redials on its own after a drop, so a retried command
/// lands on the new connection. The client name is sent again first.
async fn ping_with_retry<C>(
    conn: &mut C,
    retry: RetryPolicy,
    client_name: Option<&str>,
) -> Result<(), BackendError>
where
    C: ConnectionLike + Send,
{
    let mut attempt = 0;
    loop {
        let result = if attempt == 0 {
            ping(conn).await
        } else {
            match set_client_name(conn, client_name).await {
                Ok(()) => ping(conn).await,
                Err(err) => Err(err),
            }
        };

        match result {
            Err(err) if attempt < retry.max_retries && is_retryable(&err) => {
                let delay = retry.backoff(attempt);
                debug!(attempt = attempt + 1, ?delay, error = %err, "retrying ping");
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            other => return other,
        }
    }
}

fn is_retryable(err: &BackendError) -> bool {
    match err {
        BackendError::Redis(e) => {
            e.is_io_error() || e.is_connection_dropped() || e.is_connection_refusal()
        }
        BackendError::Io(_) => true,
        BackendError::Timeout(_) | BackendError::Closed | BackendError::Other(_) => false,
    }
}

impl std::fmt::Debug for DirectClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DirectClient")
            .field("addr", &self.client.get_connection_info().addr)
            .finish()
    }
}

impl std::fmt::Debug for TopologyClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TopologyClient")
            .field("topology", &self.topology.as_str())
            .finish()
    }
}
