//! Backend seam between the manager and the key-value client library.
//!
//! The manager only ever builds, pings and closes clients. [`Connector`]
//! is injected so tests can observe those calls without a server.

use async_trait::async_trait;

use crate::error::BackendError;
use crate::options::{DirectOptions, TopologyOptions};

/// A constructed client the manager can probe, health check and close.
#[async_trait]
pub trait ClientHandle: Send + Sync + 'static {
    /// Issues a PING round trip. Dials first when no connection is open.
    async fn ping(&self) -> Result<(), BackendError>;

    /// Releases the client's connections. Later calls fail with
    /// [`BackendError::Closed`].
    async fn close(&self) -> Result<(), BackendError>;
}

/// Builds clients from translated options.
///
/// Building must not perform network I/O; the first `ping` does.
pub trait Connector: Send + Sync + 'static {
    type Direct: ClientHandle;
    type Topology: ClientHandle;

    fn build_direct(&self, options: &DirectOptions) -> Result<Self::Direct, BackendError>;

    fn build_topology(&self, options: &TopologyOptions) -> Result<Self::Topology, BackendError>;
}
