//! Error types for the KV-cache allocation simulator.
//!
//! Only the caller-recoverable conditions from the error-handling design
//! (arena mapping failure at construction time, and config validation) are
//! represented as a `Result`. The purely-internal fatal conditions —
//! out-of-pages, refcount underflow, allocation failure while growing a
//! slot or sequence table — panic with a message naming the offending
//! counters: they indicate a bookkeeping bug in the allocator or slot
//! table, not a condition a caller could sensibly recover from.

use thiserror::Error;

/// Result type used throughout the crate.
pub type Result<T> = std::result::Result<T, SimError>;

/// Caller-recoverable error conditions.
#[derive(Error, Debug)]
pub enum SimError {
    /// The OS refused to reserve the page allocator's arena.
    #[error("failed to map a {arena_bytes}-byte arena: {source}")]
    ArenaMappingFailed {
        /// Requested arena size, in bytes.
        arena_bytes: usize,
        /// Underlying I/O error from the mapping syscall.
        #[source]
        source: std::io::Error,
    },

    /// A configuration value is out of range or inconsistent.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}
