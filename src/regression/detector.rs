use tracing::info;

use crate::{
    domain::{RunResult, RunResultFilter, RunResultSet, VersionFilter},
    regression::report::{Regression, RegressionReport},
};

/// Compares every tracked metric of a run against the best value any accepted
/// historical run achieved for the same case and metric.
#[derive(Clone, Debug)]
pub struct RegressionDetector<F = VersionFilter> {
    threshold: f64,
    filter: F,
}

impl RegressionDetector<VersionFilter> {
    pub fn new(threshold: f64) -> Self {
        Self::with_filter(threshold, VersionFilter::Any)
    }
}

impl<F: RunResultFilter> RegressionDetector<F> {
    pub fn with_filter(threshold: f64, filter: F) -> Self {
        Self { threshold, filter }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn detect_regression(&self, history: &RunResultSet, current: &RunResult) -> RegressionReport {
        detect(history, current, self.threshold, &self.filter)
    }
}

pub fn detect<F: RunResultFilter + ?Sized>(
    history: &RunResultSet,
    current: &RunResult,
    threshold: f64,
    history_filter: &F,
) -> RegressionReport {
    let mut report = RegressionReport::new(current);
    for case in current.results() {
        for metric in case.metrics() {
            if !metric.should_track_regression() {
                continue;
            }
            let Some((best, best_run)) =
                history.best_value_of(case.case_name(), metric.name(), history_filter)
            else {
                let notice = format!(
                    "No appropriate runs found for '{}:{}' to compare regression against. \
                     Skipping regression check for this metric.",
                    case.case_name(),
                    metric.name()
                );
                info!("{notice}");
                report.add_notice(notice);
                continue;
            };
            if metric.has_regressed_from(best, threshold) {
                report.add(Regression::new(
                    case.case_name(),
                    metric.name(),
                    current,
                    best_run,
                    threshold,
                    metric.value(),
                    best.value(),
                    metric.comparer(),
                ));
            }
        }
    }
    report
}
