//! # Tether Client
//!
//! Connection lifecycle manager for key-value servers.
//!
//! ## Features
//!
//! - Lazily constructed, probed and cached client per mode
//! - Direct mode (single endpoint) and topology mode (cluster, sentinel or
//!   multi-node)
//! - Health checks with caller cancellation and deadlines
//! - Configuration replacement and idempotent shutdown
//! - Service providers for container wiring
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use tether_client::{CallContext, Manager};
//! use tether_config::Config;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let manager = Manager::new(Config::direct_only("127.0.0.1:6379"));
//!
//!     let client = manager.direct().await?;
//!     let _conn = client.connection().await?;
//!
//!     manager.ping_direct(&CallContext::background()).await?;
//!     manager.close().await?;
//!     Ok(())
//! }
//! ```

pub mod backend;
pub mod context;
pub mod error;
pub mod manager;
pub mod mode;
pub mod options;
pub mod provider;
pub mod redis_backend;
pub mod tls;

// Re-export main types
pub use crate::backend::{ClientHandle, Connector};
pub use crate::context::CallContext;
pub use crate::error::{BackendError, ClientError, Result};
pub use crate::manager::{Manager, ReplaceOutcome, SlotState, PROBE_TIMEOUT};
pub use crate::mode::Mode;
pub use crate::options::{DirectOptions, Topology, TopologyOptions};
pub use crate::provider::{ConfigProvider, KvProvider};
pub use crate::redis_backend::{DirectClient, RedisConnector, TopologyClient, TopologyConnection};
pub use crate::tls::TlsMaterial;

// Re-export the cancellation token used by CallContext
pub use tokio_util::sync::CancellationToken;

// Prelude module for common imports
pub mod prelude {
    pub use crate::backend::{ClientHandle, Connector};
    pub use crate::context::CallContext;
    pub use crate::error::{ClientError, Result};
    pub use crate::manager::{Manager, SlotState};
    pub use crate::mode::Mode;
    pub use crate::provider::{ConfigProvider, KvProvider};
}
