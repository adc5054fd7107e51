use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{case_result::CaseResult, metric::Metric};

/// Everything measured in one harness invocation against one tested version.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunResult {
    tested_version: String,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    timestamp: DateTime<Utc>,
    #[serde(default, alias = "buildUrl")]
    build_ref: String,
    #[serde(default)]
    results: Vec<CaseResult>,
}

impl RunResult {
    /// `timestamp` is kept at millisecond precision, the precision it is stored with.
    pub fn new<V, B>(tested_version: V, timestamp: DateTime<Utc>, build_ref: B) -> Self
    where
        V: Into<String>,
        B: Into<String>,
    {
        Self {
            tested_version: tested_version.into(),
            timestamp: DateTime::from_timestamp_millis(timestamp.timestamp_millis())
                .unwrap_or(timestamp),
            build_ref: build_ref.into(),
            results: Vec::new(),
        }
    }

    pub fn add_result(&mut self, result: CaseResult) {
        self.results.push(result);
    }

    pub fn tested_version(&self) -> &str {
        &self.tested_version
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn build_ref(&self) -> &str {
        &self.build_ref
    }

    pub fn results(&self) -> &[CaseResult] {
        &self.results
    }

    pub fn case(&self, case_name: &str) -> Option<&CaseResult> {
        self.results
            .iter()
            .find(|result| result.case_name() == case_name)
    }

    pub fn metric(&self, case_name: &str, metric_name: &str) -> Option<&Metric> {
        self.case(case_name)?.metric(metric_name)
    }

    pub fn is_ga_release(&self) -> bool {
        is_ga_version(&self.tested_version)
    }
}

/// Stable releases only: no snapshot, milestone or release-candidate marker, and a
/// known version.
pub fn is_ga_version(version: &str) -> bool {
    let version = version.to_lowercase();
    !version.contains("-snapshot")
        && !version.contains('m')
        && !version.contains("rc")
        && version != "n/a"
}

pub trait RunResultFilter {
    fn accept(&self, run: &RunResult) -> bool;
}

impl<F> RunResultFilter for F
where
    F: Fn(&RunResult) -> bool,
{
    fn accept(&self, run: &RunResult) -> bool {
        self(run)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VersionFilter {
    Any,
    GaOnly,
}

impl RunResultFilter for VersionFilter {
    fn accept(&self, run: &RunResult) -> bool {
        match self {
            VersionFilter::Any => true,
            VersionFilter::GaOnly => run.is_ga_release(),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunResultSet {
    results: Vec<RunResult>,
}

impl RunResultSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, run: RunResult) {
        self.results.push(run);
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &RunResult> {
        self.results.iter()
    }

    pub fn filter<F: RunResultFilter + ?Sized>(&self, filter: &F) -> RunResultSet {
        self.results
            .iter()
            .filter(|run| filter.accept(run))
            .cloned()
            .collect()
    }

    pub fn sort_by_timestamp(&mut self) {
        self.results.sort_by_key(|run| run.timestamp());
    }

    pub fn latest(&self) -> Option<&RunResult> {
        self.results.iter().max_by_key(|run| run.timestamp())
    }

    /// Best value of `(case_name, metric_name)` among runs accepted by `filter`,
    /// ranked by each metric's own comparer. The earliest run wins ties.
    pub fn best_value_of<F: RunResultFilter + ?Sized>(
        &self,
        case_name: &str,
        metric_name: &str,
        filter: &F,
    ) -> Option<(&Metric, &RunResult)> {
        let mut best: Option<(&Metric, &RunResult)> = None;
        for run in self.results.iter().filter(|run| filter.accept(run)) {
            let Some(candidate) = run.metric(case_name, metric_name) else {
                continue;
            };
            let replace = match best {
                None => true,
                Some((top, top_run)) => {
                    match candidate.comparer().compare(candidate.value(), top.value()) {
                        Ordering::Less => true,
                        Ordering::Equal => run.timestamp() < top_run.timestamp(),
                        Ordering::Greater => false,
                    }
                }
            };
            if replace {
                best = Some((candidate, run));
            }
        }
        best
    }
}

impl FromIterator<RunResult> for RunResultSet {
    fn from_iter<I: IntoIterator<Item = RunResult>>(iter: I) -> Self {
        Self {
            results: iter.into_iter().collect(),
        }
    }
}

impl From<Vec<RunResult>> for RunResultSet {
    fn from(results: Vec<RunResult>) -> Self {
        Self { results }
    }
}

impl<'a> IntoIterator for &'a RunResultSet {
    type Item = &'a RunResult;
    type IntoIter = std::slice::Iter<'a, RunResult>;

    fn into_iter(self) -> Self::IntoIter {
        self.results.iter()
    }
}
