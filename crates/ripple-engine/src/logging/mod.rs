//! Logging utilities.
//!
//! Centralizes logger initialization. Everything else in the workspace logs through
//! the `log` facade; `env_logger` is the only backend wired here.

mod init;

pub use init::{init_logging, LoggingConfig};
