//! Tunables for the benchmark cases and the harness run.
//!
//! Every constant the workload uses lives here with its default, so tests can run
//! the full driver in well under a second and the binary can expose the
//! interesting ones as flags.

use std::{path::PathBuf, thread, time::Duration};

use crate::errors::GraphBenchError;

/// Shape of the mixed read/write workload.
///
/// # Default Configuration
///
/// ```rust
/// use graphbench::config::MixedLoadConfig;
/// let config = MixedLoadConfig::default();
/// assert_eq!(config.bulk_threads, 2);
/// assert_eq!(config.sample_read_ops, 400);
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct MixedLoadConfig {
    /// Measured time, split between the concurrent and the bulk phase.
    pub total_duration: Duration,
    /// Share of `total_duration` given to the concurrent mixed phase.
    pub concurrent_share: f64,
    /// Worker threads for the concurrent phase; `None` uses available parallelism + 2.
    pub concurrent_threads: Option<usize>,
    pub bulk_threads: usize,
    /// Longest a backpressured submission loop blocks before re-checking.
    pub backpressure_wait: Duration,
    /// Bounded wait per in-flight task when a phase ends.
    pub drain_wait: Duration,
    pub warmup_entities: usize,
    pub warmup_properties: usize,
    pub create_ops: usize,
    pub property_add_ops: usize,
    pub delete_ops: usize,
    pub sample_read_ops: usize,
    pub bulk_create_ops: usize,
    pub bulk_read_ops: usize,
    /// Entities per unit of work in bulk tasks.
    pub bulk_commit_interval: usize,
    /// A task updates the peak rate only if it ran at least this fraction of the
    /// average task time.
    pub peak_fraction: f64,
    /// Same as `peak_fraction` for the sustained rate of bulk tasks.
    pub sustained_fraction: f64,
    /// Intermediate throughput is logged every this many submissions.
    pub report_every: usize,
}

impl Default for MixedLoadConfig {
    fn default() -> Self {
        Self {
            total_duration: Duration::from_secs(60 * 60),
            concurrent_share: 2.0 / 3.0,
            concurrent_threads: None,
            bulk_threads: 2,
            backpressure_wait: Duration::from_millis(100),
            drain_wait: Duration::from_secs(5),
            warmup_entities: 100_000,
            warmup_properties: 10_000,
            create_ops: 100,
            property_add_ops: 100,
            delete_ops: 20,
            sample_read_ops: 400,
            bulk_create_ops: 2_000,
            bulk_read_ops: 2_000,
            bulk_commit_interval: 1_000,
            peak_fraction: 0.1,
            sustained_fraction: 0.9,
            report_every: 20,
        }
    }
}

impl MixedLoadConfig {
    /// Thread count of the concurrent phase.
    pub fn concurrency_cap(&self) -> usize {
        self.concurrent_threads.unwrap_or_else(|| {
            thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
                + 2
        })
    }

    pub fn concurrent_phase(&self) -> Duration {
        self.total_duration.mul_f64(self.concurrent_share)
    }

    pub fn validate(&self) -> Result<(), GraphBenchError> {
        if !(0.0..=1.0).contains(&self.concurrent_share) {
            return Err(GraphBenchError::invalid_input(
                "concurrent_share must be within [0, 1]",
            ));
        }
        if self.concurrency_cap() < 3 {
            return Err(GraphBenchError::invalid_input(
                "concurrent phase needs at least 3 threads",
            ));
        }
        if self.bulk_threads == 0 {
            return Err(GraphBenchError::invalid_input("bulk_threads must be positive"));
        }
        if self.bulk_commit_interval == 0 {
            return Err(GraphBenchError::invalid_input(
                "bulk_commit_interval must be positive",
            ));
        }
        for (name, fraction) in [
            ("peak_fraction", self.peak_fraction),
            ("sustained_fraction", self.sustained_fraction),
        ] {
            if !(0.0..=1.0).contains(&fraction) {
                return Err(GraphBenchError::invalid_input(format!(
                    "{name} must be within [0, 1]"
                )));
            }
        }
        Ok(())
    }
}

/// Query-latency case over a prepopulated graph.
#[derive(Clone, Debug, PartialEq)]
pub struct TraversalConfig {
    pub entities: usize,
    /// Every n-th entity also links to the entity n positions ahead.
    pub shortcut_every: usize,
    pub start_points: usize,
    pub depth: u32,
    pub repetitions: usize,
}

impl Default for TraversalConfig {
    fn default() -> Self {
        Self {
            entities: 10_000,
            shortcut_every: 7,
            start_points: 20,
            depth: 3,
            repetitions: 100,
        }
    }
}

/// Everything one harness invocation needs.
#[derive(Clone, Debug, PartialEq)]
pub struct RunConfig {
    pub threshold: f64,
    pub tested_version: String,
    pub build_ref: String,
    pub history_dir: PathBuf,
    /// Compare only against stable releases.
    pub ga_only: bool,
    /// Where stores are created; a fresh temporary directory when `None`.
    pub store_dir: Option<PathBuf>,
    pub export_history: Option<PathBuf>,
    pub mixed_load: MixedLoadConfig,
    pub traversal: TraversalConfig,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            threshold: 0.1,
            tested_version: "N/A".to_string(),
            build_ref: "Unknown build url".to_string(),
            history_dir: PathBuf::from("ops-per-second"),
            ga_only: true,
            store_dir: None,
            export_history: None,
            mixed_load: MixedLoadConfig::default(),
            traversal: TraversalConfig::default(),
        }
    }
}

impl RunConfig {
    pub fn validate(&self) -> Result<(), GraphBenchError> {
        if !(self.threshold > 0.0 && self.threshold <= 1.0) {
            return Err(GraphBenchError::invalid_input(
                "threshold must be a fraction within (0, 1]",
            ));
        }
        self.mixed_load.validate()
    }
}
