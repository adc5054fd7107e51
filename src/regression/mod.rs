pub mod detector;
pub mod history;
pub mod report;

pub use detector::{RegressionDetector, detect};
pub use history::PerformanceHistoryRepository;
pub use report::{Regression, RegressionReport};
