use std::{collections::BTreeMap, fmt};

use crate::domain::{Comparer, RunResult};

#[derive(Clone, Debug, PartialEq)]
pub struct Regression {
    case_name: String,
    metric_name: String,
    current_run: RunResult,
    trumping_run: RunResult,
    threshold: f64,
    current_value: f64,
    trumping_value: f64,
    comparer: Comparer,
}

impl Regression {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        case_name: &str,
        metric_name: &str,
        current_run: &RunResult,
        trumping_run: &RunResult,
        threshold: f64,
        current_value: f64,
        trumping_value: f64,
        comparer: Comparer,
    ) -> Self {
        Self {
            case_name: case_name.to_string(),
            metric_name: metric_name.to_string(),
            current_run: current_run.clone(),
            trumping_run: trumping_run.clone(),
            threshold,
            current_value,
            trumping_value,
            comparer,
        }
    }

    pub fn case_name(&self) -> &str {
        &self.case_name
    }

    pub fn metric_name(&self) -> &str {
        &self.metric_name
    }

    pub fn current_run(&self) -> &RunResult {
        &self.current_run
    }

    pub fn trumping_run(&self) -> &RunResult {
        &self.trumping_run
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn allowed_value(&self) -> f64 {
        self.comparer
            .allowed_regression(self.trumping_value, self.threshold)
    }

    pub fn render_with_prefix(&self, prefix: &str) -> String {
        let bound = match self.comparer {
            Comparer::BiggerIsBetter => "at least",
            Comparer::SmallerIsBetter => "at most",
        };
        format!(
            "{prefix}Metric: '{}' has regressed since version {} ({})\n\
             {prefix}  Was: {:.4}\n\
             {prefix}  Is now: {:.4}\n\
             {prefix}  (Needs to be {bound} {:.4})\n",
            self.metric_name,
            self.trumping_run.tested_version(),
            self.trumping_run.build_ref(),
            self.trumping_value,
            self.current_value,
            self.allowed_value(),
        )
    }
}

impl fmt::Display for Regression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render_with_prefix(""))
    }
}

#[derive(Clone, Debug)]
pub struct RegressionReport {
    tested: RunResult,
    regressions: Vec<Regression>,
    notices: Vec<String>,
}

impl RegressionReport {
    pub fn new(tested: &RunResult) -> Self {
        Self {
            tested: tested.clone(),
            regressions: Vec::new(),
            notices: Vec::new(),
        }
    }

    pub fn add(&mut self, regression: Regression) {
        self.regressions.push(regression);
    }

    pub fn add_notice<T: Into<String>>(&mut self, notice: T) {
        self.notices.push(notice.into());
    }

    pub fn regression_detected(&self) -> bool {
        !self.regressions.is_empty()
    }

    pub fn regressions(&self) -> &[Regression] {
        &self.regressions
    }

    /// Metrics that had no baseline to compare against.
    pub fn notices(&self) -> &[String] {
        &self.notices
    }
}

impl fmt::Display for RegressionReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "REGRESSION REPORT")?;
        writeln!(f, "-----------------")?;
        writeln!(
            f,
            "Tested version {} on {}.",
            self.tested.tested_version(),
            self.tested.timestamp().format("%Y-%m-%d %H:%M:%S UTC")
        )?;
        writeln!(f, "{}", self.tested.build_ref())?;
        if !self.regression_detected() {
            return writeln!(f, "All metrics are within allowed thresholds.");
        }
        writeln!(f, "{} metric(s) have regressed.", self.regressions.len())?;
        writeln!(f)?;

        let mut by_case: BTreeMap<&str, Vec<&Regression>> = BTreeMap::new();
        for regression in &self.regressions {
            by_case
                .entry(regression.case_name())
                .or_default()
                .push(regression);
        }
        for (case_name, mut regressions) in by_case {
            regressions.sort_by(|a, b| a.metric_name().cmp(b.metric_name()));
            writeln!(f, "Case: '{case_name}'")?;
            for regression in regressions {
                f.write_str(&regression.render_with_prefix("  "))?;
                writeln!(f)?;
            }
        }
        Ok(())
    }
}
