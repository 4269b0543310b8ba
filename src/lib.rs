//! KV-cache allocation simulator.
//!
//! Compares two strategies for managing the per-sequence key/value activation
//! cache used during concurrent autoregressive decoding: a monolithic backend
//! that pre-reserves a fixed maximum-context-sized buffer per sequence, and a
//! paged backend that allocates fixed-size pages lazily and lets sequences in
//! the same group alias a shared, page-aligned prompt prefix.
#![warn(missing_docs)]

// Configure global allocator so the monolithic backend's eager buffers show
// up as real resident memory, not just notional byte counts.
#[global_allocator]
static GLOBAL: jemallocator::Jemalloc = jemallocator::Jemalloc;

/// Error types, configuration, and logging macros.
pub mod core;

/// Backend contract and the two concrete backends (monolithic, paged).
pub mod backend;

/// Synthetic per-sequence workload generation.
pub mod workload;

/// Per-sequence worker driver.
pub mod driver;

/// Statistics record and human-readable reporting.
pub mod stats;

pub use crate::core::config::Config;
pub use crate::core::error::{Result, SimError};
pub use backend::{Backend, BackendKind, SequenceWork, Stats};
