//! # Refinery Utilities
//!
//! Shared logging helpers for the refinery workspace.
//!
//! The command line front end and any embedding tool initialize `tracing`
//! through this crate so that console and file output look the same
//! everywhere.

pub mod logging;

// Re-export commonly used logging functions for convenience
pub use logging::{
    init_logging, init_logging_with_level, init_logging_with_overrides, LogFormat, LogLevel, LoggingError, LoggingGuard,
};
pub use tracing::{debug, error, info, trace, warn};
