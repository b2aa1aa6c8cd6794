//! Framework-level error handling.
//!
//! Defines the error taxonomy shared by every tether crate.

pub mod context;
pub mod framework;

pub use context::ErrorContext;
pub use framework::{TetherError, TetherErrorKind};

/// Tether result type
pub type Result<T> = std::result::Result<T, TetherError>;
