//! Performance-regression harness for a transactional graph store.
//!
//! Benchmark cases drive workloads against [`store::SqliteStore`] and produce
//! [`domain::CaseResult`]s. A run's results are compared against the stored
//! history by [`regression::RegressionDetector`]; the `graphbench` binary exits
//! non-zero when a tracked metric degraded beyond the threshold.
//! Run Criterion benchmarks with `cargo bench` to inspect store costs under `target/criterion`.

pub mod bfs;
pub mod cases;
pub mod config;
pub mod domain;
pub mod errors;
pub mod logging;
pub mod regression;
pub mod store;

pub use crate::cases::{BenchmarkCase, MixedLoadBenchCase, TraversalQueriesCase, run_cases};
pub use crate::config::{MixedLoadConfig, RunConfig, TraversalConfig};
pub use crate::domain::{CaseResult, Comparer, Metric, RunResult, RunResultSet, VersionFilter};
pub use crate::errors::GraphBenchError;
pub use crate::regression::{PerformanceHistoryRepository, RegressionDetector, RegressionReport};
pub use crate::store::{SqliteStore, Store, UnitOfWork};
