//! # Dwarview Utilities
//!
//! Shared helpers for the Dwarview workspace.
//!
//! Currently this is the logging setup built on `tracing`: console logging for
//! the headless commands and file-only logging for the terminal browser.

pub mod logging;

pub use logging::{
    init_logging, init_logging_for_tui, init_logging_with_level, init_with_config, LogConfig, LogFormat, LogLevel,
    LoggingError, LoggingGuard,
};
pub use tracing::{debug, error, info, trace, warn};
