//! Result model shared by the benchmark cases, the history repository and the
//! regression detector.

pub mod case_result;
pub mod metric;
pub mod run_result;
pub mod units;

pub use case_result::CaseResult;
pub use metric::{Comparer, Metric};
pub use run_result::{RunResult, RunResultFilter, RunResultSet, VersionFilter, is_ga_version};
pub use units::Unit;
