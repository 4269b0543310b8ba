//! Monolithic baseline backend: a fixed-capacity buffer per sequence,
//! allocated eagerly at `init_sequence` and never resized.
//!
//! Buffers are real allocated bytes (not just a notional byte count) so
//! that a curious operator watching resident-set size from the outside
//! sees the same footprint `stats()` predicts.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::backend::{Backend, SeqId, SequenceWork, Stats};
use crate::core::config::Config;

struct MonolithicSequenceState {
    cur_tokens: AtomicUsize,
    // Never read; exists only to reserve real bytes.
    _backing: Vec<u8>,
}

/// Fixed-capacity-per-sequence baseline backend.
pub struct MonolithicBackend {
    max_context_tokens: usize,
    bytes_per_token: usize,
    sequences: Mutex<Vec<Arc<MonolithicSequenceState>>>,
}

impl MonolithicBackend {
    /// Build a monolithic backend sized per `config`.
    pub fn new(config: &Config) -> Self {
        Self {
            max_context_tokens: config.max_context_tokens,
            bytes_per_token: config.bytes_per_token(),
            sequences: Mutex::new(Vec::with_capacity(config.num_sequences)),
        }
    }

    fn get_sequence(&self, seq_id: SeqId) -> Option<Arc<MonolithicSequenceState>> {
        self.sequences.lock().get(seq_id).cloned()
    }
}

impl Backend for MonolithicBackend {
    fn init_sequence(&self, _work: SequenceWork) -> SeqId {
        let backing_bytes = self.max_context_tokens * self.bytes_per_token;
        let state = Arc::new(MonolithicSequenceState {
            cur_tokens: AtomicUsize::new(0),
            _backing: vec![0u8; backing_bytes],
        });
        let mut sequences = self.sequences.lock();
        sequences.push(state);
        sequences.len() - 1
    }

    fn append_token(&self, seq_id: SeqId) {
        let Some(seq) = self.get_sequence(seq_id) else {
            debug_assert!(false, "append_token: out-of-range seq id {seq_id}");
            return;
        };
        let _ = seq.cur_tokens.fetch_update(Ordering::AcqRel, Ordering::Acquire, |t| {
            (t < self.max_context_tokens).then_some(t + 1)
        });
    }

    fn finish_sequence(&self, _seq_id: SeqId) {
        // Buffers persist until destroy so stats() observes peak reservation.
    }

    fn stats(&self) -> Stats {
        let sequences = self.sequences.lock();
        let logical_tokens: usize = sequences.iter().map(|s| s.cur_tokens.load(Ordering::Acquire)).sum();
        let physical_bytes = sequences.len() * self.max_context_tokens * self.bytes_per_token;
        Stats {
            logical_tokens,
            logical_bytes: logical_tokens * self.bytes_per_token,
            physical_bytes,
        }
    }

    fn destroy(&self) {
        self.sequences.lock().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg() -> Config {
        let mut c = Config::default();
        c.backend = crate::backend::BackendKind::Monolithic;
        c
    }

    #[test]
    fn physical_bytes_is_exact_and_workload_independent() {
        let backend = MonolithicBackend::new(&cfg());
        let mut ids = Vec::new();
        for _ in 0..128 {
            ids.push(backend.init_sequence(SequenceWork::default()));
        }
        for &id in &ids {
            for _ in 0..512 {
                backend.append_token(id);
            }
        }
        let stats = backend.stats();
        assert_eq!(stats.physical_bytes, 128 * 2048 * 8192);
        assert_eq!(stats.logical_bytes, 128 * 512 * 8192);
    }

    #[test]
    fn context_clamp_stops_at_max_tokens() {
        let backend = MonolithicBackend::new(&cfg());
        let id = backend.init_sequence(SequenceWork::default());
        for _ in 0..(2048 + 100) {
            backend.append_token(id);
        }
        assert_eq!(backend.stats().logical_tokens, 2048);
    }

    #[test]
    fn finish_does_not_shrink_physical_footprint() {
        let backend = MonolithicBackend::new(&cfg());
        let id = backend.init_sequence(SequenceWork::default());
        for _ in 0..100 {
            backend.append_token(id);
        }
        let before = backend.stats().physical_bytes;
        backend.finish_sequence(id);
        assert_eq!(backend.stats().physical_bytes, before);
    }

    #[test]
    fn destroy_drops_every_buffer() {
        let backend = MonolithicBackend::new(&cfg());
        for _ in 0..4 {
            backend.init_sequence(SequenceWork::default());
        }
        backend.destroy();
        assert_eq!(backend.stats().physical_bytes, 0);
    }
}
