//! Backend contract shared by the monolithic and paged KV-cache backends.

use serde::{Deserialize, Serialize};

/// Monolithic baseline backend.
pub mod monolithic;
/// Paged backend: allocator, shared-prefix table, per-sequence slot table.
pub mod paged;

pub use monolithic::MonolithicBackend;
pub use paged::PagedBackend;

/// Selects which backend(s) a run exercises.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    /// Fixed-capacity buffer per sequence.
    Monolithic,
    /// Lazily-paged, reference-counted sharing.
    Paged,
    /// Run both and compare.
    Both,
}

/// A sequence's prompt/generation shape and sharing request, as produced by
/// the workload generator and consumed by `Backend::init_sequence`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SequenceWork {
    /// Number of prompt tokens (excluding any shared prefix).
    pub prompt_tokens: usize,
    /// Number of tokens the worker will generate after the prompt.
    pub gen_tokens: usize,
    /// Tokens of the prompt that are a shared, page-aligned group prefix.
    /// Zero means "no sharing," regardless of `shared_prompt_id`.
    pub shared_prompt_tokens: usize,
    /// Group id to share a prefix with, or `None` for no sharing.
    pub shared_prompt_id: Option<usize>,
}

/// A point-in-time statistics snapshot.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Stats {
    /// Sum of `cur_tokens` across all live sequences.
    pub logical_tokens: usize,
    /// `logical_tokens * bytes_per_token`.
    pub logical_bytes: usize,
    /// Memory actually reserved by the backend to hold those tokens.
    pub physical_bytes: usize,
}

/// Opaque handle identifying a sequence within a backend.
pub type SeqId = usize;

/// The contract both backends implement. The driver depends only on this
/// trait, never on which concrete backend it is holding.
pub trait Backend {
    /// Register a new sequence and return its id.
    fn init_sequence(&self, work: SequenceWork) -> SeqId;

    /// Append one token to the given sequence. A no-op past
    /// `max_context_tokens` or for an out-of-range id.
    fn append_token(&self, seq_id: SeqId);

    /// Release a sequence's resources. Idempotent.
    fn finish_sequence(&self, seq_id: SeqId);

    /// A consistent point-in-time snapshot of memory usage.
    fn stats(&self) -> Stats;

    /// Tear the backend down: release every sequence's resources, then any
    /// backend-held state (e.g. group prefix pages), then the allocator
    /// itself. Behavior after `destroy()` is undefined.
    fn destroy(&self);
}
