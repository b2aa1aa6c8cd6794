//! Connection lifecycle manager.
//!
//! Owns at most one verified client per mode. A client is built on first
//! access, probed with [`PROBE_TIMEOUT`], and cached only when the probe
//! succeeds. Each mode has its own slot lock, held across the whole
//! check-build-probe-cache sequence, so concurrent first accesses construct
//! exactly one client.
//!
//! Lock order is direct slot, then topology slot, then configuration.

use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};
use std::time::Duration;

use tether_config::Config;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::backend::{ClientHandle, Connector};
use crate::context::CallContext;
use crate::error::{BackendError, ClientError, Result};
use crate::mode::Mode;
use crate::options::{DirectOptions, TopologyOptions};
use crate::redis_backend::RedisConnector;

/// Deadline for the reachability probe run during construction.
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(2);

/// Lifecycle state of one mode's slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotState {
    Uninitialized,
    Connecting,
    Ready,
}

impl SlotState {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => SlotState::Connecting,
            2 => SlotState::Ready,
            _ => SlotState::Uninitialized,
        }
    }
}

struct Slot<H> {
    handle: Mutex<Option<Arc<H>>>,
    state: AtomicU8,
}

impl<H> Slot<H> {
    fn new() -> Self {
        Self {
            handle: Mutex::new(None),
            state: AtomicU8::new(SlotState::Uninitialized as u8),
        }
    }

    fn state(&self) -> SlotState {
        SlotState::from_u8(self.state.load(Ordering::Acquire))
    }

    fn set(&self, state: SlotState) {
        self.state.store(state as u8, Ordering::Release);
    }
}

/// Returns the slot to `Uninitialized` unless construction finished.
///
/// Covers callers that drop an accessor future mid-probe.
struct Connecting<'a> {
    state: &'a AtomicU8,
    done: bool,
}

impl<'a> Connecting<'a> {
    fn enter(state: &'a AtomicU8) -> Self {
        state.store(SlotState::Connecting as u8, Ordering::Release);
        Self { state, done: false }
    }

    fn ready(mut self) {
        self.state.store(SlotState::Ready as u8, Ordering::Release);
        self.done = true;
    }
}

impl Drop for Connecting<'_> {
    fn drop(&mut self) {
        if !self.done {
            self.state.store(SlotState::Uninitialized as u8, Ordering::Release);
        }
    }
}

/// Result of a configuration replacement.
#[derive(Debug, Default)]
pub struct ReplaceOutcome {
    /// Close failures of the discarded clients. The new configuration is
    /// installed regardless.
    pub teardown_errors: Vec<ClientError>,
}

impl ReplaceOutcome {
    pub fn is_clean(&self) -> bool {
        self.teardown_errors.is_empty()
    }
}

/// Connection lifecycle manager for the direct and topology modes.
pub struct Manager<C: Connector = RedisConnector> {
    connector: C,
    config: RwLock<Arc<Config>>,
    direct: Slot<C::Direct>,
    topology: Slot<C::Topology>,
}

impl Manager<RedisConnector> {
    /// Creates a manager backed by the `redis` crate. No I/O happens here.
    pub fn new(config: Config) -> Self {
        Self::with_connector(config, RedisConnector)
    }
}

impl<C: Connector> Manager<C> {
    pub fn with_connector(config: Config, connector: C) -> Self {
        Self {
            connector,
            config: RwLock::new(Arc::new(config)),
            direct: Slot::new(),
            topology: Slot::new(),
        }
    }

    pub fn connector(&self) -> &C {
        &self.connector
    }

    /// Snapshot of the active configuration.
    pub async fn config(&self) -> Arc<Config> {
        self.config.read().await.clone()
    }

    pub fn state(&self, mode: Mode) -> SlotState {
        match mode {
            Mode::Direct => self.direct.state(),
            Mode::Topology => self.topology.state(),
        }
    }

    /// Returns the verified direct client, constructing it on first use.
    pub async fn direct(&self) -> Result<Arc<C::Direct>> {
        self.acquire(Mode::Direct, &self.direct, |config| self.build_direct(config))
            .await
    }

    /// Returns the verified topology client, constructing it on first use.
    pub async fn topology(&self) -> Result<Arc<C::Topology>> {
        self.acquire(Mode::Topology, &self.topology, |config| self.build_topology(config))
            .await
    }

    /// Health check for the direct client under the caller's context.
    pub async fn ping_direct(&self, ctx: &CallContext) -> Result<()> {
        let handle = self.direct().await?;
        ping(Mode::Direct, handle.as_ref(), ctx).await
    }

    /// Health check for the topology client under the caller's context.
    pub async fn ping_topology(&self, ctx: &CallContext) -> Result<()> {
        let handle = self.topology().await?;
        ping(Mode::Topology, handle.as_ref(), ctx).await
    }

    /// Swaps in a new configuration.
    ///
    /// The new record is validated first; on failure nothing changes. Cached
    /// clients are closed before the new configuration becomes visible, so
    /// the next access builds from the new record.
    pub async fn replace_config(&self, config: Config) -> Result<ReplaceOutcome> {
        config.validate()?;

        let mut direct = self.direct.handle.lock().await;
        let mut topology = self.topology.handle.lock().await;

        let mut outcome = ReplaceOutcome::default();
        if let Err(err) = teardown(Mode::Direct, &self.direct, &mut direct).await {
            outcome.teardown_errors.push(err);
        }
        if let Err(err) = teardown(Mode::Topology, &self.topology, &mut topology).await {
            outcome.teardown_errors.push(err);
        }

        *self.config.write().await = Arc::new(config);
        info!(
            teardown_errors = outcome.teardown_errors.len(),
            "configuration replaced"
        );
        Ok(outcome)
    }

    /// Closes every cached client.
    ///
    /// Every slot is attempted and cleared; the first failure is returned.
    /// Calling it again, or with nothing cached, is a no-op.
    pub async fn close(&self) -> Result<()> {
        let mut direct = self.direct.handle.lock().await;
        let mut topology = self.topology.handle.lock().await;

        let first = teardown(Mode::Direct, &self.direct, &mut direct).await;
        let second = teardown(Mode::Topology, &self.topology, &mut topology).await;
        first.and(second)
    }

    async fn acquire<H, F>(&self, mode: Mode, slot: &Slot<H>, build: F) -> Result<Arc<H>>
    where
        H: ClientHandle,
        F: FnOnce(&Config) -> Result<H>,
    {
        let mut cached = slot.handle.lock().await;
        if let Some(handle) = cached.as_ref() {
            debug!(mode = %mode, "using cached client");
            return Ok(handle.clone());
        }

        let config = self.config().await;
        let connecting = Connecting::enter(&slot.state);
        let client = build(&config)?;

        match tokio::time::timeout(PROBE_TIMEOUT, client.ping()).await {
            Ok(Ok(())) => {
                let handle = Arc::new(client);
                *cached = Some(handle.clone());
                connecting.ready();
                info!(mode = %mode, "client connected");
                Ok(handle)
            }
            Ok(Err(source)) => Err(discard(mode, client, source).await),
            Err(_) => Err(discard(mode, client, BackendError::Timeout(PROBE_TIMEOUT)).await),
        }
    }

    fn build_direct(&self, config: &Config) -> Result<C::Direct> {
        let record = config
            .direct
            .as_ref()
            .ok_or(ClientError::NotConfigured(Mode::Direct))?;
        if !record.enabled {
            return Err(ClientError::NotEnabled(Mode::Direct));
        }
        record
            .validate()
            .map_err(|e| e.with_prefix("direct configuration error"))?;

        let options = DirectOptions::from_config(record)?;
        self.connector
            .build_direct(&options)
            .map_err(|e| ClientError::InvalidConfig(format!("direct client rejected options: {}", e)))
    }

    fn build_topology(&self, config: &Config) -> Result<C::Topology> {
        let record = config
            .topology
            .as_ref()
            .ok_or(ClientError::NotConfigured(Mode::Topology))?;
        if !record.enabled {
            return Err(ClientError::NotEnabled(Mode::Topology));
        }
        record
            .validate()
            .map_err(|e| e.with_prefix("topology configuration error"))?;

        let options = TopologyOptions::from_config(record)?;
        debug!(topology = options.topology.as_str(), addrs = options.addrs.len(), "building topology client");
        self.connector
            .build_topology(&options)
            .map_err(|e| ClientError::InvalidConfig(format!("topology client rejected options: {}", e)))
    }
}

async fn ping<H: ClientHandle>(mode: Mode, handle: &H, ctx: &CallContext) -> Result<()> {
    ctx.run(async {
        handle
            .ping()
            .await
            .map_err(|source| ClientError::Ping { mode, source })
    })
    .await
}

/// Closes a client that failed its probe.
async fn discard<H: ClientHandle>(mode: Mode, client: H, source: BackendError) -> ClientError {
    warn!(mode = %mode, error = %source, "reachability probe failed");
    if let Err(err) = client.close().await {
        warn!(mode = %mode, error = %err, "failed to close unverified client");
    }
    ClientError::Unreachable { mode, source }
}

/// Closes and clears a slot. The slot is cleared even when close fails.
async fn teardown<H: ClientHandle>(
    mode: Mode,
    slot: &Slot<H>,
    cached: &mut Option<Arc<H>>,
) -> Result<()> {
    let Some(handle) = cached.take() else {
        return Ok(());
    };
    slot.set(SlotState::Uninitialized);

    match handle.close().await {
        Ok(()) => {
            info!(mode = %mode, "client closed");
            Ok(())
        }
        Err(source) => {
            warn!(mode = %mode, error = %source, "failed to close client");
            Err(ClientError::TeardownFailed { mode, source })
        }
    }
}
