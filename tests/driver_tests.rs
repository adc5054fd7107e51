use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use graphbench::{
    BenchmarkCase, GraphBenchError, MixedLoadBenchCase, MixedLoadConfig, SqliteStore, Store,
    UnitOfWork,
    cases::{
        mixedload::{
            CASE_NAME, DriverState, EntityPool, LoadPhase, MixedLoadDriver, StatsAggregator,
            TaskExecutor, TaskKind, WorkerTask, choose_bulk_task, choose_concurrent_task,
            fold_completions,
            stats::{AVERAGE_READS, AVERAGE_WRITES},
        },
        run_cases,
    },
    domain::RunResult,
    store::SqliteUnitOfWork,
};

/// A store whose every unit of work blows up inside the worker.
struct PanickingStore;

impl Store for PanickingStore {
    type UnitOfWork<'a> = SqliteUnitOfWork<'a>;

    fn begin_unit_of_work(&self) -> Result<SqliteUnitOfWork<'_>, GraphBenchError> {
        panic!("store went away");
    }
}

fn quick_config() -> MixedLoadConfig {
    MixedLoadConfig {
        total_duration: Duration::from_millis(600),
        concurrent_threads: Some(4),
        backpressure_wait: Duration::from_millis(10),
        drain_wait: Duration::from_secs(5),
        warmup_entities: 300,
        warmup_properties: 50,
        create_ops: 5,
        property_add_ops: 5,
        delete_ops: 2,
        sample_read_ops: 20,
        bulk_create_ops: 50,
        bulk_read_ops: 50,
        bulk_commit_interval: 25,
        report_every: 5,
        ..MixedLoadConfig::default()
    }
}

#[test]
fn test_probability_table() {
    let config = MixedLoadConfig::default();
    let kind = |d| choose_concurrent_task(d, &config).kind();
    assert_eq!(kind(0.99), TaskKind::Create);
    assert_eq!(kind(0.826), TaskKind::Create);
    assert_eq!(kind(0.825), TaskKind::PropertyAdd);
    assert_eq!(kind(0.76), TaskKind::PropertyAdd);
    assert_eq!(kind(0.75), TaskKind::Delete);
    assert_eq!(kind(0.61), TaskKind::Delete);
    assert_eq!(kind(0.6), TaskKind::SampleRead);
    assert_eq!(kind(0.0), TaskKind::SampleRead);
    assert_eq!(choose_concurrent_task(0.1, &config).ops(), 400);
    assert_eq!(choose_concurrent_task(0.9, &config).ops(), 100);
    assert_eq!(choose_concurrent_task(0.7, &config).ops(), 20);

    assert_eq!(choose_bulk_task(0.41, &config).kind(), TaskKind::BulkRead);
    assert_eq!(choose_bulk_task(0.4, &config).kind(), TaskKind::BulkCreate);
    assert_eq!(choose_bulk_task(0.0, &config).ops(), 2_000);
}

#[test]
fn test_table_weights_are_close_to_expected() {
    let config = MixedLoadConfig::default();
    let mut counts = [0usize; 4];
    let steps = 10_000;
    for i in 0..steps {
        let d = i as f64 / steps as f64;
        match choose_concurrent_task(d, &config).kind() {
            TaskKind::Create => counts[0] += 1,
            TaskKind::PropertyAdd => counts[1] += 1,
            TaskKind::Delete => counts[2] += 1,
            _ => counts[3] += 1,
        }
    }
    let share = |n: usize| n as f64 / steps as f64;
    assert!((share(counts[0]) - 0.175).abs() < 0.01);
    assert!((share(counts[1]) - 0.075).abs() < 0.01);
    assert!((share(counts[2]) - 0.15).abs() < 0.01);
    assert!((share(counts[3]) - 0.6).abs() < 0.01);
}

#[test]
fn test_config_validation() {
    assert!(quick_config().validate().is_ok());
    let too_narrow = MixedLoadConfig {
        concurrent_threads: Some(2),
        ..quick_config()
    };
    assert!(too_narrow.validate().is_err());
    let bad_fraction = MixedLoadConfig {
        peak_fraction: 1.5,
        ..quick_config()
    };
    assert!(bad_fraction.validate().is_err());
    let concurrent = quick_config().concurrent_phase().as_secs_f64();
    assert!((concurrent - 0.4).abs() < 1e-6);
}

#[test]
fn test_executor_collects_every_task() {
    let store = Arc::new(SqliteStore::open_in_memory().expect("store"));
    let entities = Arc::new(EntityPool::new());
    let mut executor =
        TaskExecutor::new(3, Arc::clone(&store), Arc::clone(&entities)).expect("executor");
    for _ in 0..6 {
        executor.submit(WorkerTask::create(5));
    }
    let done = executor.drain_all(Duration::from_secs(10));
    assert_eq!(done.len(), 6);
    assert_eq!(executor.in_flight(), 0);
    assert_eq!(executor.abandoned(), 0);
    assert!(done.iter().all(|c| c.kind == TaskKind::Create && c.result.is_ok()));
    assert_eq!(entities.size(), 30);
}

#[test]
fn test_executor_abandons_slow_tasks() {
    let store = Arc::new(SqliteStore::open_in_memory().expect("store"));
    let entities = Arc::new(EntityPool::new());
    let mut executor =
        TaskExecutor::new(1, Arc::clone(&store), Arc::clone(&entities)).expect("executor");
    // Holding the store lock stalls every worker.
    let guard = store.begin_unit_of_work().expect("uow");
    executor.submit(WorkerTask::create(1));
    executor.submit(WorkerTask::create(1));
    let started = Instant::now();
    let done = executor.drain_all(Duration::from_millis(50));
    assert!(done.is_empty());
    assert_eq!(executor.abandoned(), 2);
    assert_eq!(executor.in_flight(), 0);
    assert!(started.elapsed() < Duration::from_secs(5));
    guard.rollback().expect("rollback");

    // Late completions of abandoned tasks are ignored.
    std::thread::sleep(Duration::from_millis(200));
    assert!(executor.try_drain().is_empty());
}

#[test]
fn test_panicking_task_is_reported_and_left_out_of_stats() {
    let entities = Arc::new(EntityPool::new());
    let mut broken =
        TaskExecutor::new(1, Arc::new(PanickingStore), Arc::clone(&entities)).expect("executor");
    broken.submit(WorkerTask::create(3));
    let failed = broken.drain_all(Duration::from_secs(10));
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].kind, TaskKind::Create);
    assert!(
        matches!(&failed[0].result, Err(GraphBenchError::TaskFailed(msg)) if msg.contains("store went away"))
    );
    assert_eq!(broken.in_flight(), 0);
    assert_eq!(broken.abandoned(), 0);

    let store = Arc::new(SqliteStore::open_in_memory().expect("store"));
    let mut healthy =
        TaskExecutor::new(1, Arc::clone(&store), Arc::clone(&entities)).expect("executor");
    healthy.submit(WorkerTask::create(3));
    let succeeded = healthy.drain_all(Duration::from_secs(10));
    assert_eq!(succeeded.len(), 1);

    let mut stats = StatsAggregator::new(0.1, 0.9);
    let since_start = Duration::from_millis(100);
    assert_eq!(fold_completions(&mut stats, failed, LoadPhase::Concurrent, since_start), 1);
    assert_eq!(stats.folded(), 0);
    assert_eq!(stats.total_writes(), 0);

    assert_eq!(fold_completions(&mut stats, succeeded, LoadPhase::Concurrent, since_start), 0);
    assert_eq!(stats.folded(), 1);
    assert!(stats.total_writes() >= 3);
    assert_eq!(entities.size(), 3);
}

#[test]
fn test_driver_runs_all_phases() {
    let store = Arc::new(SqliteStore::open_in_memory().expect("store"));
    let mut driver = MixedLoadDriver::new(Arc::clone(&store), quick_config());
    assert_eq!(driver.state(), DriverState::NotStarted);

    let started = Instant::now();
    let result = driver.run().expect("run");
    assert_eq!(driver.state(), DriverState::Finished);
    assert!(started.elapsed() >= Duration::from_millis(600));

    assert_eq!(result.case_name(), CASE_NAME);
    assert_eq!(result.metrics().len(), 6);
    assert!(result.metric(AVERAGE_READS).expect("reads").value() > 0.0);
    assert!(result.metric(AVERAGE_WRITES).expect("writes").value() >= 0.0);
    assert!(driver.stats().folded() > 0);
    assert!(driver.entities().size() >= 2);

    let uow = store.begin_unit_of_work().expect("uow");
    assert!(!uow.entity_ids(0, 10).expect("ids").is_empty());
    drop(uow);

    assert!(driver.run().is_err());
}

#[test]
fn test_driver_rejects_invalid_config() {
    let store = Arc::new(SqliteStore::open_in_memory().expect("store"));
    let config = MixedLoadConfig {
        bulk_threads: 0,
        ..quick_config()
    };
    assert!(MixedLoadDriver::new(store, config).run().is_err());
}

#[test]
fn test_run_cases_collects_results() {
    let mut cases: Vec<Box<dyn BenchmarkCase>> =
        vec![Box::new(MixedLoadBenchCase::new(quick_config(), None))];
    let mut run = RunResult::new("1.0", chrono::Utc::now(), "local");
    run_cases(&mut cases, &mut run).expect("run cases");
    assert_eq!(run.results().len(), 1);
    assert!(run.case(CASE_NAME).is_some());
}
