//! Paged backend: composes the page allocator, shared-prefix table, and
//! per-sequence slot tables behind the `Backend` contract.
//!
//! Concurrency uses a per-sequence lock (`parking_lot::Mutex<PagedSequenceState>`)
//! plus the allocator's own free-list lock, rather than one global backend
//! mutex. `PageAllocator::alloc` already serializes the only state shared
//! across sequences (the free-list), so a per-sequence lock is sufficient
//! and the observable behavior is identical to a single backend mutex, with
//! less contention across concurrent `append_token` calls.

/// Fixed-arena page allocator with refcount-based reclamation.
pub mod allocator;
/// Per-sequence page-slot table.
pub mod sequence;
/// Per-group shared-prefix table.
pub mod shared_prefix;

use std::sync::Arc;

use parking_lot::Mutex;

use self::allocator::PageAllocator;
use self::sequence::PagedSequenceState;
use self::shared_prefix::SharedPrefixTable;
use crate::backend::{Backend, SeqId, SequenceWork, Stats};
use crate::core::config::Config;
use crate::core::error::Result;

/// Paged KV-cache backend: fixed-size pages, lazily allocated, with
/// reference-counted sharing of page-aligned group prefixes.
pub struct PagedBackend {
    allocator: PageAllocator,
    shared: SharedPrefixTable,
    tokens_per_page: usize,
    max_context_tokens: usize,
    num_groups: usize,
    bytes_per_token: usize,
    // Growth of this Vec (pushing a new sequence) is guarded by its own
    // lock; each element is reached through an `Arc` so the Vec's own
    // reallocation never invalidates an already-issued seq_id's address.
    sequences: Mutex<Vec<Arc<Mutex<PagedSequenceState>>>>,
}

impl PagedBackend {
    /// Build a paged backend sized per `config`.
    pub fn new(config: &Config) -> Result<Self> {
        let page_bytes = config.page_bytes();
        let allocator = PageAllocator::create(page_bytes, config.arena_bytes)?;
        crate::log_info!(
            "paged backend: {} pages of {} bytes ({} total)",
            allocator.num_pages(),
            page_bytes,
            config.arena_bytes
        );
        Ok(Self {
            allocator,
            shared: SharedPrefixTable::new(config.num_groups),
            tokens_per_page: config.tokens_per_page,
            max_context_tokens: config.max_context_tokens,
            num_groups: config.num_groups,
            bytes_per_token: config.bytes_per_token(),
            sequences: Mutex::new(Vec::with_capacity(config.num_sequences)),
        })
    }

    fn get_sequence(&self, seq_id: SeqId) -> Option<Arc<Mutex<PagedSequenceState>>> {
        self.sequences.lock().get(seq_id).cloned()
    }

    /// Floor `work.shared_prompt_tokens` to a `tokens_per_page` multiple,
    /// per the page-aligned-sharing invariant. Sharing requires both a
    /// positive token count *and* a non-negative group id -- a zero token
    /// count attaches no prefix regardless of the declared group.
    fn shared_tokens_for(&self, work: &SequenceWork) -> Option<(usize, usize)> {
        if self.num_groups == 0 {
            return None;
        }
        let gid = work.shared_prompt_id?;
        if work.shared_prompt_tokens == 0 {
            return None;
        }
        let floored = (work.shared_prompt_tokens / self.tokens_per_page) * self.tokens_per_page;
        if floored == 0 {
            return None;
        }
        Some((gid % self.num_groups, floored))
    }
}

impl Backend for PagedBackend {
    fn init_sequence(&self, work: SequenceWork) -> SeqId {
        let mut seq = PagedSequenceState::new();

        if let Some((gid, floored_tokens)) = self.shared_tokens_for(&work) {
            let (pages, prefix_tokens) =
                self.shared.attach(gid, floored_tokens, &self.allocator, self.tokens_per_page);
            seq.attach_shared(&pages, prefix_tokens);
        }

        let mut sequences = self.sequences.lock();
        sequences.push(Arc::new(Mutex::new(seq)));
        sequences.len() - 1
    }

    fn append_token(&self, seq_id: SeqId) {
        let Some(seq) = self.get_sequence(seq_id) else {
            debug_assert!(false, "append_token: out-of-range seq id {seq_id}");
            return;
        };
        seq.lock().append(self.max_context_tokens, self.tokens_per_page, &self.allocator);
    }

    fn finish_sequence(&self, seq_id: SeqId) {
        if let Some(seq) = self.get_sequence(seq_id) {
            seq.lock().finish(&self.allocator);
        }
        // Out-of-range ids are a no-op: finishing a sequence that was never
        // (or no longer) registered has nothing to release.
    }

    fn stats(&self) -> Stats {
        let logical_tokens: usize = self
            .sequences
            .lock()
            .iter()
            .map(|s| s.lock().cur_tokens())
            .sum();
        let physical_bytes = self.allocator.pages_in_use() * self.allocator.page_bytes();
        Stats {
            logical_tokens,
            logical_bytes: logical_tokens * self.bytes_per_token,
            physical_bytes,
        }
    }

    fn destroy(&self) {
        for seq in self.sequences.lock().iter() {
            seq.lock().finish(&self.allocator);
        }
        self.shared.release_all(&self.allocator);
        // The allocator's arena mapping is released when `self` drops.
    }
}
