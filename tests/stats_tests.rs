use std::time::Duration;

use graphbench::{
    Comparer,
    cases::mixedload::{
        LoadPhase, StatsAggregator, TaskKind, TaskOutcome,
        stats::{AVERAGE_READS, AVERAGE_WRITES, PEAK_READS, SUSTAINED_READS},
    },
    domain::units,
};
use proptest::prelude::*;

fn outcome(reads: u64, writes: u64, elapsed_ms: u64) -> TaskOutcome {
    TaskOutcome {
        kind: TaskKind::SampleRead,
        reads,
        writes,
        failed_ops: 0,
        elapsed_ms,
    }
}

fn secs(s: u64) -> Duration {
    Duration::from_secs(s)
}

#[test]
fn test_totals_only_count_concurrent_phase() {
    let mut stats = StatsAggregator::new(0.1, 0.9);
    stats.fold(&outcome(10, 5, 100), LoadPhase::Concurrent, secs(1));
    stats.fold(&outcome(1_000, 1_000, 100), LoadPhase::Bulk, secs(2));
    assert_eq!(stats.total_reads(), 10);
    assert_eq!(stats.total_writes(), 5);
    assert_eq!(stats.folded(), 2);
}

#[test]
fn test_short_tasks_do_not_set_the_peak() {
    let mut stats = StatsAggregator::new(0.1, 0.9);
    // Average task time is 1000 ms, so 50 ms is below the 10% bar.
    stats.fold(&outcome(500, 0, 50), LoadPhase::Concurrent, secs(1));
    assert_eq!(stats.throughput(secs(1)).peak_reads, 0.0);
    // Two read tasks: the bar drops to 50 ms.
    stats.fold(&outcome(400, 0, 200), LoadPhase::Concurrent, secs(1));
    assert_eq!(stats.throughput(secs(1)).peak_reads, 2.0);
    assert_eq!(stats.throughput(secs(1)).peak_writes, 0.0);
}

#[test]
fn test_sustained_only_from_long_bulk_tasks() {
    let mut stats = StatsAggregator::new(0.1, 0.9);
    stats.fold(&outcome(1_900, 950, 950), LoadPhase::Concurrent, secs(1));
    assert_eq!(stats.throughput(secs(1)).sustained_reads, 0.0);

    let mut stats = StatsAggregator::new(0.1, 0.9);
    stats.fold(&outcome(1_900, 950, 950), LoadPhase::Bulk, secs(1));
    let t = stats.throughput(secs(1));
    assert_eq!(t.sustained_reads, 2.0);
    assert_eq!(t.sustained_writes, 1.0);
    assert_eq!(t.peak_reads, 2.0);

    // 500 ms is below 90% of the 1000 ms average.
    stats.fold(&outcome(5_000, 0, 500), LoadPhase::Bulk, secs(2));
    let t = stats.throughput(secs(1));
    assert_eq!(t.sustained_reads, 2.0);
    assert_eq!(t.peak_reads, 10.0);
}

#[test]
fn test_zero_elapsed_uses_one_millisecond() {
    let mut stats = StatsAggregator::new(0.0, 0.0);
    stats.fold(&outcome(7, 3, 0), LoadPhase::Bulk, Duration::ZERO);
    let t = stats.throughput(secs(1));
    assert_eq!(t.peak_reads, 7.0);
    assert_eq!(t.peak_writes, 3.0);
    assert_eq!(t.sustained_reads, 7.0);
}

#[test]
fn test_case_result_has_six_rate_metrics() {
    let mut stats = StatsAggregator::new(0.1, 0.9);
    stats.fold(&outcome(2_000, 1_000, 1_000), LoadPhase::Concurrent, secs(1));
    let result = stats
        .into_case_result("MixedLoadBenchCase", Duration::from_millis(500))
        .expect("case result");
    assert_eq!(result.metrics().len(), 6);

    let reads = result.metric(AVERAGE_READS).expect("average reads");
    assert_eq!(reads.value(), 4.0);
    assert!(reads.should_track_regression());
    assert_eq!(reads.unit(), &units::reads_per_ms());

    let writes = result.metric(AVERAGE_WRITES).expect("average writes");
    assert_eq!(writes.value(), 2.0);
    assert_eq!(writes.unit(), &units::writes_per_ms());

    for name in [PEAK_READS, SUSTAINED_READS] {
        assert!(!result.metric(name).expect("metric").should_track_regression());
    }
    assert!(result.metrics().iter().all(|m| m.comparer() == Comparer::BiggerIsBetter));
    let tracked = result.metrics().iter().filter(|m| m.should_track_regression()).count();
    assert_eq!(tracked, 2);
}

proptest! {
    #[test]
    fn prop_watermarks_never_decrease(
        folds in proptest::collection::vec((0u64..5_000, 0u64..5_000, 0u64..2_000, any::<bool>(), 1u64..5_000), 1..40),
    ) {
        let mut stats = StatsAggregator::new(0.1, 0.9);
        let mut last = stats.throughput(secs(1));
        for (reads, writes, elapsed, bulk, since) in folds {
            let phase = if bulk { LoadPhase::Bulk } else { LoadPhase::Concurrent };
            stats.fold(&outcome(reads, writes, elapsed), phase, Duration::from_millis(since));
            let now = stats.throughput(secs(1));
            prop_assert!(now.peak_reads >= last.peak_reads);
            prop_assert!(now.peak_writes >= last.peak_writes);
            prop_assert!(now.sustained_reads >= last.sustained_reads);
            prop_assert!(now.sustained_writes >= last.sustained_writes);
            prop_assert!(now.average_reads >= last.average_reads);
            last = now;
        }
    }
}
