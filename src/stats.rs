//! Statistics record and human-readable reporting.

use serde::Serialize;

use crate::backend::Stats;

/// A monolithic/paged comparison, derived from two end-of-run `Stats`
/// snapshots taken over the same workload.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct Report {
    /// Monolithic backend's final snapshot.
    pub monolithic: Stats,
    /// Paged backend's final snapshot.
    pub paged: Stats,
}

impl Report {
    /// Pair up two snapshots taken over the same workload.
    pub fn new(monolithic: Stats, paged: Stats) -> Self {
        Self { monolithic, paged }
    }

    /// Waste/saved figure for one backend's snapshot, relative to its own
    /// logical token count. Waste is reported as a fraction of
    /// `physical_bytes` when physical exceeds logical; saved is reported as
    /// a fraction of `logical_bytes` when logical exceeds physical. The two
    /// fractions are never both nonzero for the same snapshot.
    fn waste_saved(stats: &Stats) -> (f64, f64) {
        if stats.physical_bytes > stats.logical_bytes {
            let waste = (stats.physical_bytes - stats.logical_bytes) as f64 / stats.physical_bytes as f64;
            (waste, 0.0)
        } else if stats.logical_bytes > stats.physical_bytes {
            let saved = (stats.logical_bytes - stats.physical_bytes) as f64 / stats.logical_bytes as f64;
            (0.0, saved)
        } else {
            (0.0, 0.0)
        }
    }

    /// Serialize the comparison as pretty-printed JSON, for callers that
    /// want to feed a run's results into another tool rather than read them.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Render a human-readable comparison to stdout via `tracing`.
    pub fn print(&self) {
        for (label, stats) in [("monolithic", &self.monolithic), ("paged", &self.paged)] {
            let (waste, saved) = Self::waste_saved(stats);
            crate::log_info!(
                "{label}: logical={} bytes physical={} bytes waste={:.1}% saved={:.1}%",
                stats.logical_bytes,
                stats.physical_bytes,
                waste * 100.0,
                saved * 100.0,
            );
        }
        if self.paged.physical_bytes < self.monolithic.physical_bytes {
            let reduction = (self.monolithic.physical_bytes - self.paged.physical_bytes) as f64
                / self.monolithic.physical_bytes as f64;
            crate::log_info!("paged backend reduced physical footprint by {:.1}%", reduction * 100.0);
        }
    }
}
