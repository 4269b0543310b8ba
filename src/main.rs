//! CLI entry point for the KV-cache allocation simulator.

use clap::Parser;

use kvsim::core::config::load_config_or_default;
use kvsim::{driver, stats, workload, Backend, BackendKind, Config};

/// Compare monolithic and paged KV-cache backends under a synthetic workload.
#[derive(Parser, Debug)]
#[command(name = "kvsim", version, about)]
struct Cli {
    /// Path to a TOML configuration file. Falls back to built-in defaults.
    #[arg(short, long)]
    config: Option<String>,

    /// Override: number of sequences to simulate.
    #[arg(long)]
    num_sequences: Option<usize>,

    /// Override: number of sharing groups (0 disables prefix sharing).
    #[arg(long)]
    num_groups: Option<usize>,

    /// Override: paged allocator's arena size, in bytes.
    #[arg(long)]
    arena_bytes: Option<usize>,

    /// Override: page granularity, in tokens.
    #[arg(long)]
    tokens_per_page: Option<usize>,

    /// Override: workload RNG seed, for reproducible runs.
    #[arg(long)]
    seed: Option<u64>,

    /// Override: which backend(s) to run.
    #[arg(long, value_enum)]
    backend: Option<CliBackendKind>,

    /// Print the comparison as JSON instead of a human-readable summary.
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum CliBackendKind {
    Monolithic,
    Paged,
    Both,
}

impl From<CliBackendKind> for BackendKind {
    fn from(kind: CliBackendKind) -> Self {
        match kind {
            CliBackendKind::Monolithic => BackendKind::Monolithic,
            CliBackendKind::Paged => BackendKind::Paged,
            CliBackendKind::Both => BackendKind::Both,
        }
    }
}

fn apply_overrides(mut config: Config, cli: &Cli) -> Config {
    if let Some(n) = cli.num_sequences {
        config.num_sequences = n;
    }
    if let Some(n) = cli.num_groups {
        config.num_groups = n;
    }
    if let Some(n) = cli.arena_bytes {
        config.arena_bytes = n;
    }
    if let Some(n) = cli.tokens_per_page {
        config.tokens_per_page = n;
    }
    if cli.seed.is_some() {
        config.seed = cli.seed;
    }
    if let Some(kind) = cli.backend {
        config.backend = kind.into();
    }
    config
}

fn run_monolithic(config: &Config, work: Vec<kvsim::SequenceWork>) -> kvsim::Stats {
    let backend = kvsim::backend::monolithic::MonolithicBackend::new(config);
    let stats = driver::run(&backend, work);
    backend.destroy();
    stats
}

fn run_paged(config: &Config, work: Vec<kvsim::SequenceWork>) -> anyhow::Result<kvsim::Stats> {
    let backend = kvsim::backend::paged::PagedBackend::new(config)?;
    let stats = driver::run(&backend, work);
    backend.destroy();
    Ok(stats)
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let config = apply_overrides(load_config_or_default(cli.config.as_deref()), &cli);
    config.validate()?;

    kvsim::log_info!(
        "kvsim starting: {} sequences, {} groups, backend={:?}",
        config.num_sequences,
        config.num_groups,
        config.backend
    );

    let report = match config.backend {
        BackendKind::Monolithic => {
            let work = workload::generate(&config);
            let stats = run_monolithic(&config, work);
            stats::Report::new(stats, kvsim::Stats::default())
        }
        BackendKind::Paged => {
            let work = workload::generate(&config);
            let stats = run_paged(&config, work)?;
            stats::Report::new(kvsim::Stats::default(), stats)
        }
        BackendKind::Both => {
            let mono_stats = run_monolithic(&config, workload::generate(&config));
            let paged_stats = run_paged(&config, workload::generate(&config))?;
            stats::Report::new(mono_stats, paged_stats)
        }
    };

    if cli.json {
        println!("{}", report.to_json()?);
    } else {
        report.print();
    }

    Ok(())
}
