//! Concurrent mixed read/write workload.
//!
//! The driver seeds the store, then runs a concurrent phase of small tasks drawn
//! from a fixed probability table, followed by a narrower bulk phase. Phase
//! deadlines are checked only before each submission, so a phase may overrun by
//! one task.

use std::{
    path::PathBuf,
    sync::Arc,
    time::{Duration, Instant},
};

use rand::Rng;
use tracing::{debug, info, warn};

use crate::{
    config::MixedLoadConfig,
    domain::CaseResult,
    errors::GraphBenchError,
    store::{SqliteStore, Store},
};

use super::{BenchmarkCase, StoreFixture};

pub mod executor;
pub mod pool;
pub mod stats;
pub mod workers;

pub use executor::{Completion, TaskExecutor};
pub use pool::EntityPool;
pub use stats::{LoadPhase, StatsAggregator, Throughput};
pub use workers::{TaskKind, TaskOutcome, WorkerTask};

pub const CASE_NAME: &str = "MixedLoadBenchCase";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DriverState {
    NotStarted,
    WarmUp,
    ConcurrentMixed,
    Bulk,
    Finished,
}

/// Maps a uniform draw `d` in `[0, 1)` onto the concurrent task table:
/// 17.5% create, 7.5% property add, 15% delete, 60% indexed sample read.
pub fn choose_concurrent_task(d: f64, config: &MixedLoadConfig) -> WorkerTask {
    if d > 0.825 {
        WorkerTask::create(config.create_ops)
    } else if d > 0.75 {
        WorkerTask::property_add(config.property_add_ops, false)
    } else if d > 0.6 {
        WorkerTask::delete(config.delete_ops)
    } else {
        WorkerTask::sample_read(config.sample_read_ops, true)
    }
}

/// 60% bulk read, 40% bulk create.
pub fn choose_bulk_task(d: f64, config: &MixedLoadConfig) -> WorkerTask {
    if d > 0.4 {
        WorkerTask::bulk_read(config.bulk_read_ops, config.bulk_commit_interval)
    } else {
        WorkerTask::bulk_create(config.bulk_create_ops, config.bulk_commit_interval)
    }
}

pub struct MixedLoadDriver<S> {
    store: Arc<S>,
    entities: Arc<EntityPool>,
    config: MixedLoadConfig,
    state: DriverState,
    stats: StatsAggregator,
}

impl<S: Store + 'static> MixedLoadDriver<S> {
    pub fn new(store: Arc<S>, config: MixedLoadConfig) -> Self {
        let stats = StatsAggregator::new(config.peak_fraction, config.sustained_fraction);
        Self {
            store,
            entities: Arc::new(EntityPool::new()),
            config,
            state: DriverState::NotStarted,
            stats,
        }
    }

    pub fn state(&self) -> DriverState {
        self.state
    }

    pub fn entities(&self) -> &EntityPool {
        &self.entities
    }

    pub fn stats(&self) -> &StatsAggregator {
        &self.stats
    }

    /// Runs every phase once and builds the case result.
    pub fn run(&mut self) -> Result<CaseResult, GraphBenchError> {
        if self.state != DriverState::NotStarted {
            return Err(GraphBenchError::invalid_input("mixed load driver already ran"));
        }
        self.config.validate()?;
        self.warm_up();

        let start = Instant::now();
        let concurrent_wall = self.run_phase(LoadPhase::Concurrent, start)?;
        self.run_phase(LoadPhase::Bulk, start)?;
        self.state = DriverState::Finished;

        self.log_throughput("final results", concurrent_wall);
        info!(
            folded = self.stats.folded(),
            failed_ops = self.stats.failed_ops(),
            entities = self.entities.size(),
            "mixed load finished"
        );
        let stats = std::mem::replace(
            &mut self.stats,
            StatsAggregator::new(self.config.peak_fraction, self.config.sustained_fraction),
        );
        stats.into_case_result(CASE_NAME, concurrent_wall)
    }

    fn warm_up(&mut self) {
        self.state = DriverState::WarmUp;
        let seeded = WorkerTask::bulk_create(
            self.config.warmup_entities,
            self.config.bulk_commit_interval,
        )
        .run(&*self.store, &self.entities);
        info!(
            entities = self.entities.size(),
            elapsed_ms = seeded.elapsed_ms,
            "store seeded"
        );

        info!("starting indexing");
        let indexed = WorkerTask::property_add(self.config.warmup_properties, true)
            .run(&*self.store, &self.entities);
        info!(elapsed_ms = indexed.elapsed_ms, "indexing finished");
        let failed = seeded.failed_ops + indexed.failed_ops;
        if failed > 0 {
            warn!(failed_ops = failed, "warm-up operations rolled back");
        }
    }

    /// Returns the measured wall clock at the end of the phase.
    fn run_phase(&mut self, phase: LoadPhase, start: Instant) -> Result<Duration, GraphBenchError> {
        let (threads, deadline, admit) = match phase {
            LoadPhase::Concurrent => {
                let cap = self.config.concurrency_cap();
                (cap, self.config.concurrent_phase(), cap.saturating_sub(2))
            }
            LoadPhase::Bulk => (
                self.config.bulk_threads,
                self.config.total_duration,
                self.config.bulk_threads,
            ),
        };
        self.state = match phase {
            LoadPhase::Concurrent => DriverState::ConcurrentMixed,
            LoadPhase::Bulk => DriverState::Bulk,
        };
        info!(?phase, threads, deadline_ms = deadline.as_millis() as u64, "phase started");

        let mut executor =
            TaskExecutor::new(threads, Arc::clone(&self.store), Arc::clone(&self.entities))?;
        let mut rng = rand::thread_rng();
        let report_every = self.config.report_every.max(1);
        let mut submitted = 0usize;

        while start.elapsed() < deadline {
            let d: f64 = rng.r#gen();
            let task = match phase {
                LoadPhase::Concurrent => choose_concurrent_task(d, &self.config),
                LoadPhase::Bulk => choose_bulk_task(d, &self.config),
            };
            executor.submit(task);
            let ready = executor.try_drain();
            self.absorb(ready, phase, start);
            while executor.in_flight() > admit {
                let ready = executor.wait(self.config.backpressure_wait);
                self.absorb(ready, phase, start);
            }
            if submitted % report_every == 0 {
                self.log_throughput("intermediate results", start.elapsed());
            }
            submitted += 1;
        }

        let rest = executor.drain_all(self.config.drain_wait);
        self.absorb(rest, phase, start);
        let wall = start.elapsed();
        info!(
            ?phase,
            submitted,
            abandoned = executor.abandoned(),
            wall_ms = wall.as_millis() as u64,
            "phase finished"
        );
        Ok(wall)
    }

    fn absorb(&mut self, completions: Vec<Completion>, phase: LoadPhase, start: Instant) {
        fold_completions(&mut self.stats, completions, phase, start.elapsed());
    }

    fn log_throughput(&self, header: &str, wall: Duration) {
        let t = self.stats.throughput(wall);
        info!(
            average_reads = t.average_reads,
            average_writes = t.average_writes,
            peak_reads = t.peak_reads,
            peak_writes = t.peak_writes,
            sustained_reads = t.sustained_reads,
            sustained_writes = t.sustained_writes,
            "{header}"
        );
    }
}

/// Folds successful completions into `stats`. Failed tasks are logged and left
/// out; returns how many there were.
pub fn fold_completions(
    stats: &mut StatsAggregator,
    completions: Vec<Completion>,
    phase: LoadPhase,
    since_start: Duration,
) -> usize {
    let mut failed = 0;
    for completion in completions {
        match completion.result {
            Ok(outcome) => {
                if outcome.failed_ops > 0 {
                    debug!(
                        kind = ?outcome.kind,
                        failed_ops = outcome.failed_ops,
                        "operations rolled back"
                    );
                }
                stats.fold(&outcome, phase, since_start);
            }
            Err(err) => {
                failed += 1;
                warn!(kind = ?completion.kind, %err, "task failed, excluded from results");
            }
        }
    }
    failed
}

/// Runs [`MixedLoadDriver`] against a fresh SQLite store.
pub struct MixedLoadBenchCase {
    config: MixedLoadConfig,
    store_dir: Option<PathBuf>,
    in_memory: bool,
    fixture: Option<StoreFixture>,
}

impl MixedLoadBenchCase {
    /// File-backed store under `store_dir`, or a temporary directory.
    pub fn new(config: MixedLoadConfig, store_dir: Option<PathBuf>) -> Self {
        Self {
            config,
            store_dir,
            in_memory: false,
            fixture: None,
        }
    }

    pub fn in_memory(config: MixedLoadConfig) -> Self {
        Self {
            in_memory: true,
            ..Self::new(config, None)
        }
    }
}

impl BenchmarkCase for MixedLoadBenchCase {
    fn name(&self) -> &str {
        CASE_NAME
    }

    fn set_up(&mut self) -> Result<(), GraphBenchError> {
        let fixture = if self.in_memory {
            StoreFixture::in_memory()?
        } else {
            StoreFixture::on_disk(
                self.store_dir.as_deref(),
                CASE_NAME,
                self.config.concurrency_cap(),
            )?
        };
        self.fixture = Some(fixture);
        Ok(())
    }

    fn run(&mut self) -> Result<CaseResult, GraphBenchError> {
        let store: Arc<SqliteStore> = self
            .fixture
            .as_ref()
            .map(StoreFixture::store)
            .ok_or_else(|| GraphBenchError::invalid_input("mixed load case was not set up"))?;
        MixedLoadDriver::new(store, self.config.clone()).run()
    }

    fn tear_down(&mut self) -> Result<(), GraphBenchError> {
        self.fixture = None;
        Ok(())
    }
}
