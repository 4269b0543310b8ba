//! Configuration for the KV-cache allocation simulator.
//!
//! Mirrors the recognized configuration options one-for-one: the model
//! shape determines `bytes_per_token`, `tokens_per_page` determines
//! `page_bytes`, and the rest size the arena, the batch, and the sharing
//! groups. `bytes_per_token` and `page_bytes` are derived, never read
//! directly from a config file.

use serde::{Deserialize, Serialize};

use crate::backend::BackendKind;
use crate::core::error::{Result, SimError};

/// Main configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Number of transformer layers.
    pub num_layers: usize,
    /// Number of attention heads.
    pub num_heads: usize,
    /// Per-head dimension.
    pub head_dim: usize,

    /// Page granularity, in tokens.
    pub tokens_per_page: usize,
    /// Size of the paged allocator's arena, in bytes.
    pub arena_bytes: usize,
    /// Per-sequence token ceiling; both backends clamp to this.
    pub max_context_tokens: usize,

    /// Batch size: number of sequences simulated concurrently.
    pub num_sequences: usize,
    /// Modulus for group id; zero disables prefix sharing entirely.
    pub num_groups: usize,

    /// Extra prompt tokens added on top of the base prompt length, uniform
    /// in `[0, max_prompt_extra]`. Consumed by the workload generator.
    pub max_prompt_extra: usize,
    /// Minimum number of generated tokens per sequence.
    pub min_gen_tokens: usize,
    /// Maximum number of generated tokens per sequence.
    pub max_gen_tokens: usize,

    /// Which backend(s) a CLI run should exercise.
    pub backend: BackendKind,
    /// Seed for the workload RNG; `None` seeds from entropy.
    pub seed: Option<u64>,
}

impl Config {
    /// `bytes_per_token = num_layers * num_heads * head_dim * 2 (K,V) * 2 (halves)`.
    pub fn bytes_per_token(&self) -> usize {
        self.num_layers * self.num_heads * self.head_dim * 2 * 2
    }

    /// `page_bytes = tokens_per_page * bytes_per_token`.
    pub fn page_bytes(&self) -> usize {
        self.tokens_per_page * self.bytes_per_token()
    }

    /// `num_pages = floor(arena_bytes / page_bytes)`.
    pub fn num_pages(&self) -> usize {
        self.arena_bytes / self.page_bytes()
    }

    /// Validate the configuration, rejecting values that would make the
    /// derived quantities above meaningless (zero page size, zero arena).
    pub fn validate(&self) -> Result<()> {
        if self.num_layers == 0 || self.num_heads == 0 || self.head_dim == 0 {
            return Err(SimError::InvalidConfig(
                "num_layers, num_heads, and head_dim must all be nonzero".into(),
            ));
        }
        if self.tokens_per_page == 0 {
            return Err(SimError::InvalidConfig("tokens_per_page must be nonzero".into()));
        }
        if self.page_bytes() == 0 || self.arena_bytes < self.page_bytes() {
            return Err(SimError::InvalidConfig(format!(
                "arena_bytes ({}) must hold at least one page ({} bytes)",
                self.arena_bytes,
                self.page_bytes()
            )));
        }
        if self.max_context_tokens == 0 {
            return Err(SimError::InvalidConfig("max_context_tokens must be nonzero".into()));
        }
        if self.num_sequences == 0 {
            return Err(SimError::InvalidConfig("num_sequences must be nonzero".into()));
        }
        if self.min_gen_tokens > self.max_gen_tokens {
            return Err(SimError::InvalidConfig(
                "min_gen_tokens must be <= max_gen_tokens".into(),
            ));
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            num_layers: 4,
            num_heads: 8,
            head_dim: 64,
            tokens_per_page: 16,
            arena_bytes: 2 * 1024 * 1024 * 1024,
            max_context_tokens: 2048,
            num_sequences: 128,
            num_groups: 0,
            max_prompt_extra: 0,
            min_gen_tokens: 256,
            max_gen_tokens: 256,
            backend: BackendKind::Both,
            seed: None,
        }
    }
}

/// Load configuration from a TOML file.
pub fn load_config(path: &str) -> Result<Config> {
    let config_str = std::fs::read_to_string(path).map_err(|e| {
        SimError::InvalidConfig(format!("failed to read config file {path}: {e}"))
    })?;
    let config: Config = toml::from_str(&config_str)
        .map_err(|e| SimError::InvalidConfig(format!("failed to parse {path}: {e}")))?;
    config.validate()?;
    Ok(config)
}

/// Load configuration from a file, or fall back to defaults.
pub fn load_config_or_default(path: Option<&str>) -> Config {
    match path {
        Some(path) => match load_config(path) {
            Ok(config) => {
                crate::log_info!("Loaded configuration from: {}", path);
                config
            }
            Err(e) => {
                crate::log_warn!("Failed to load config from {}: {}. Using defaults.", path, e);
                Config::default()
            }
        },
        None => {
            crate::log_info!("No config file specified, using defaults");
            Config::default()
        }
    }
}
