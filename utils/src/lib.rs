//! Shared utilities for the Hyperdrive workspace.

pub mod logging;
pub mod shutdown;

pub use logging::{init_logging, LogFormat};
pub use shutdown::{or_shutdown, ShutdownCause, ShutdownController};
