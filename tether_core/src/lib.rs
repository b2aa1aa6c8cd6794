//! Tether core: error taxonomy, service providers and the instance
//! container used to wire connection managers into an application.

pub mod app;
pub mod container;
pub mod error;
pub mod provider;

pub use crate::app::App;
pub use crate::container::Container;
pub use crate::error::{ErrorContext, Result, TetherError, TetherErrorKind};
pub use crate::provider::{Provider, ProviderRegistry};

pub mod prelude {
    pub use crate::app::App;
    pub use crate::container::Container;
    pub use crate::error::{ErrorContext, Result, TetherError, TetherErrorKind};
    pub use crate::provider::{Provider, ProviderRegistry};
}
