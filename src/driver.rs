//! Per-sequence worker driver.
//!
//! Drives a `Backend` the way a real decoding loop would: one OS thread per
//! sequence, each appending tokens until its full context (shared prefix +
//! remaining prompt + generated tokens) has been pushed through
//! `append_token`, then releasing the sequence. Thread-per-sequence mirrors
//! the concurrency model the backends themselves assume -- one producer per
//! sequence, many sequences concurrently -- so there is no pooling or
//! batching at this layer, and any scheduling unfairness shows up as a real
//! timing artifact rather than an averaged-out one.

use std::thread;

use crate::backend::{Backend, SequenceWork, Stats};

/// Run `work` to completion against `backend`, returning the final snapshot.
///
/// Each `SequenceWork`'s iteration count is `shared_prompt_tokens +
/// prompt_tokens + gen_tokens` -- the shared prefix counts toward a
/// sequence's context length the same as any other token, it is just
/// already backed by an aliased page by the time `append_token` reaches it.
pub fn run(backend: &(dyn Backend + Sync), work: Vec<SequenceWork>) -> Stats {
    thread::scope(|scope| {
        for w in work {
            scope.spawn(move || {
                let seq_id = backend.init_sequence(w);
                let total = w.shared_prompt_tokens + w.prompt_tokens + w.gen_tokens;
                for _ in 0..total {
                    backend.append_token(seq_id);
                }
                backend.finish_sequence(seq_id);
            });
        }
    });
    backend.stats()
}
