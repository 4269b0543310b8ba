//! Synthetic per-sequence workload generation.
//!
//! Not part of the core memory-accounting logic, but needed to drive a
//! runnable comparison. Consumes only the configuration fields that are
//! generator-facing (`max_prompt_extra`, `min_gen_tokens`,
//! `max_gen_tokens`) plus `tokens_per_page`/`num_groups` to keep any
//! generated sharing request page-aligned and in range.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::backend::SequenceWork;
use crate::core::config::Config;

/// Seed a `StdRng` from `config.seed`, or from the thread RNG when unset.
fn make_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(s) => StdRng::seed_from_u64(s),
        None => StdRng::seed_from_u64(rand::rng().random::<u64>()),
    }
}

/// Base prompt length (in `tokens_per_page` units) before `max_prompt_extra`
/// is added. An implementation detail of the generator, not a recognized
/// configuration option.
const BASE_PROMPT_PAGES: usize = 16;

/// Fraction of a sequence's prompt offered to the group as a shared prefix
/// when sharing is enabled.
const SHARED_PREFIX_FRACTION: f64 = 1.0;

/// Build `config.num_sequences` sequence-work records.
pub fn generate(config: &Config) -> Vec<SequenceWork> {
    let mut rng = make_rng(config.seed);

    (0..config.num_sequences)
        .map(|i| generate_one(config, i, &mut rng))
        .collect()
}

fn generate_one(config: &Config, index: usize, rng: &mut StdRng) -> SequenceWork {
    let base_prompt = BASE_PROMPT_PAGES * config.tokens_per_page;
    let extra = if config.max_prompt_extra > 0 {
        rng.random_range(0..=config.max_prompt_extra)
    } else {
        0
    };
    let total_prompt = base_prompt + extra;

    let gen_tokens = if config.min_gen_tokens == config.max_gen_tokens {
        config.min_gen_tokens
    } else {
        rng.random_range(config.min_gen_tokens..=config.max_gen_tokens)
    };

    let (shared_prompt_tokens, shared_prompt_id, prompt_tokens) = if config.num_groups > 0 {
        let shared_raw = ((total_prompt as f64) * SHARED_PREFIX_FRACTION) as usize;
        let shared = (shared_raw / config.tokens_per_page) * config.tokens_per_page;
        let gid = index % config.num_groups;
        (shared, Some(gid), total_prompt - shared)
    } else {
        (0, None, total_prompt)
    };

    SequenceWork {
        prompt_tokens,
        gen_tokens,
        shared_prompt_tokens,
        shared_prompt_id,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generates_requested_batch_size() {
        let config = Config::default();
        assert_eq!(generate(&config).len(), config.num_sequences);
    }

    #[test]
    fn shared_tokens_are_always_page_aligned() {
        let mut config = Config::default();
        config.num_groups = 4;
        config.max_prompt_extra = 37; // deliberately not a multiple of tokens_per_page
        for work in generate(&config) {
            assert_eq!(work.shared_prompt_tokens % config.tokens_per_page, 0);
        }
    }

    #[test]
    fn no_groups_means_no_sharing_requests() {
        let config = Config::default(); // num_groups == 0
        for work in generate(&config) {
            assert_eq!(work.shared_prompt_id, None);
            assert_eq!(work.shared_prompt_tokens, 0);
        }
    }

    #[test]
    fn seeded_runs_are_reproducible() {
        let mut config = Config::default();
        config.seed = Some(42);
        config.max_prompt_extra = 100;
        let a: Vec<_> = generate(&config).into_iter().map(|w| w.gen_tokens).collect();
        let b: Vec<_> = generate(&config).into_iter().map(|w| w.gen_tokens).collect();
        assert_eq!(a, b);
    }
}
