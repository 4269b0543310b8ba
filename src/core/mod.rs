//! Core foundations: error handling, configuration, and logging.

/// Error types and result handling.
pub mod error;
/// Configuration management.
pub mod config;
/// Cross-platform-style logging macros (tracing-backed).
pub mod logging;

pub use error::{Result, SimError};
pub use config::Config;
