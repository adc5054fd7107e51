//! Throughput bookkeeping for the mixed-load case.
//!
//! Only the draining driver thread folds outcomes, so the aggregator is a plain
//! owned value.

use std::time::Duration;

use crate::{
    domain::{
        CaseResult, Comparer, Metric,
        units::{reads_per_ms, writes_per_ms},
    },
    errors::GraphBenchError,
};

use super::workers::TaskOutcome;

pub const AVERAGE_READS: &str = "Average reads";
pub const AVERAGE_WRITES: &str = "Average writes";
pub const PEAK_READS: &str = "Peak reads";
pub const PEAK_WRITES: &str = "Peak writes";
pub const SUSTAINED_READS: &str = "Sustained reads";
pub const SUSTAINED_WRITES: &str = "Sustained writes";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoadPhase {
    Concurrent,
    Bulk,
}

/// Rates derived from the folded outcomes, all in operations per millisecond.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Throughput {
    pub average_reads: f64,
    pub average_writes: f64,
    pub peak_reads: f64,
    pub peak_writes: f64,
    pub sustained_reads: f64,
    pub sustained_writes: f64,
}

#[derive(Clone, Debug)]
pub struct StatsAggregator {
    peak_fraction: f64,
    sustained_fraction: f64,
    total_reads: u64,
    total_writes: u64,
    read_tasks: u64,
    write_tasks: u64,
    folded: u64,
    failed_ops: u64,
    peak_reads: f64,
    peak_writes: f64,
    sustained_reads: f64,
    sustained_writes: f64,
}

impl StatsAggregator {
    pub fn new(peak_fraction: f64, sustained_fraction: f64) -> Self {
        Self {
            peak_fraction,
            sustained_fraction,
            total_reads: 0,
            total_writes: 0,
            read_tasks: 0,
            write_tasks: 0,
            folded: 0,
            failed_ops: 0,
            peak_reads: 0.0,
            peak_writes: 0.0,
            sustained_reads: 0.0,
            sustained_writes: 0.0,
        }
    }

    /// Folds one completed task.
    ///
    /// `since_start` is the measured wall clock at fold time. The average task
    /// duration for a counter is `since_start / tasks that produced the counter`;
    /// a task must have run for at least the peak (or, for bulk tasks, the
    /// sustained) fraction of that average before its rate may raise the
    /// watermark. Totals only grow for concurrent-phase tasks.
    pub fn fold(&mut self, outcome: &TaskOutcome, phase: LoadPhase, since_start: Duration) {
        self.folded += 1;
        self.failed_ops += outcome.failed_ops;
        if outcome.reads > 0 {
            self.read_tasks += 1;
        }
        if outcome.writes > 0 {
            self.write_tasks += 1;
        }

        let elapsed = outcome.elapsed_ms.max(1) as f64;
        let read_rate = outcome.reads as f64 / elapsed;
        let write_rate = outcome.writes as f64 / elapsed;
        let since_start_ms = since_start.as_secs_f64() * 1000.0;
        let ran = outcome.elapsed_ms as f64;

        let eligible = |fraction: f64, tasks: u64| {
            tasks > 0 && ran >= since_start_ms * fraction / tasks as f64
        };

        match phase {
            LoadPhase::Concurrent => {
                self.total_reads += outcome.reads;
                self.total_writes += outcome.writes;
            }
            LoadPhase::Bulk => {
                if outcome.reads > 0 && eligible(self.sustained_fraction, self.read_tasks) {
                    self.sustained_reads = self.sustained_reads.max(read_rate);
                }
                if outcome.writes > 0 && eligible(self.sustained_fraction, self.write_tasks) {
                    self.sustained_writes = self.sustained_writes.max(write_rate);
                }
            }
        }
        if outcome.reads > 0 && eligible(self.peak_fraction, self.read_tasks) {
            self.peak_reads = self.peak_reads.max(read_rate);
        }
        if outcome.writes > 0 && eligible(self.peak_fraction, self.write_tasks) {
            self.peak_writes = self.peak_writes.max(write_rate);
        }
    }

    pub fn total_reads(&self) -> u64 {
        self.total_reads
    }

    pub fn total_writes(&self) -> u64 {
        self.total_writes
    }

    pub fn folded(&self) -> u64 {
        self.folded
    }

    pub fn failed_ops(&self) -> u64 {
        self.failed_ops
    }

    /// Averages divide the concurrent totals by `concurrent_wall`.
    pub fn throughput(&self, concurrent_wall: Duration) -> Throughput {
        let wall_ms = (concurrent_wall.as_secs_f64() * 1000.0).max(1.0);
        Throughput {
            average_reads: self.total_reads as f64 / wall_ms,
            average_writes: self.total_writes as f64 / wall_ms,
            peak_reads: self.peak_reads,
            peak_writes: self.peak_writes,
            sustained_reads: self.sustained_reads,
            sustained_writes: self.sustained_writes,
        }
    }

    /// Six bigger-is-better rate metrics; only the averages are tracked.
    pub fn into_case_result(
        self,
        case_name: &str,
        concurrent_wall: Duration,
    ) -> Result<CaseResult, GraphBenchError> {
        let t = self.throughput(concurrent_wall);
        let rate = |name: &str, value: f64, reads: bool, tracked: bool| {
            let unit = if reads { reads_per_ms() } else { writes_per_ms() };
            Metric::new(name, value, unit)
                .with_comparer(Comparer::BiggerIsBetter)
                .with_tracking(tracked)
        };
        CaseResult::new(
            case_name,
            vec![
                rate(AVERAGE_READS, t.average_reads, true, true),
                rate(AVERAGE_WRITES, t.average_writes, false, true),
                rate(PEAK_READS, t.peak_reads, true, false),
                rate(PEAK_WRITES, t.peak_writes, false, false),
                rate(SUSTAINED_READS, t.sustained_reads, true, false),
                rate(SUSTAINED_WRITES, t.sustained_writes, false, false),
            ],
        )
    }
}
