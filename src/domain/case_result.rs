use ahash::AHashSet;
use serde::{Deserialize, Serialize};

use crate::{domain::metric::Metric, errors::GraphBenchError};

/// Metrics produced by one benchmark case. Metric names are unique within a case.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "CaseResultRecord")]
pub struct CaseResult {
    case_name: String,
    metrics: Vec<Metric>,
}

impl CaseResult {
    pub fn new<T: Into<String>>(case_name: T, metrics: Vec<Metric>) -> Result<Self, GraphBenchError> {
        let case_name = case_name.into();
        let mut seen = AHashSet::with_capacity(metrics.len());
        for metric in &metrics {
            if !seen.insert(metric.name()) {
                return Err(GraphBenchError::invalid_input(format!(
                    "duplicate metric '{}' in case '{case_name}'",
                    metric.name()
                )));
            }
        }
        Ok(Self { case_name, metrics })
    }

    pub fn empty<T: Into<String>>(case_name: T) -> Self {
        Self {
            case_name: case_name.into(),
            metrics: Vec::new(),
        }
    }

    pub fn add_metric(&mut self, metric: Metric) -> Result<(), GraphBenchError> {
        if self.contains_metric(metric.name()) {
            return Err(GraphBenchError::invalid_input(format!(
                "duplicate metric '{}' in case '{}'",
                metric.name(),
                self.case_name
            )));
        }
        self.metrics.push(metric);
        Ok(())
    }

    pub fn case_name(&self) -> &str {
        &self.case_name
    }

    pub fn metrics(&self) -> &[Metric] {
        &self.metrics
    }

    pub fn metric(&self, name: &str) -> Option<&Metric> {
        self.metrics.iter().find(|metric| metric.name() == name)
    }

    pub fn contains_metric(&self, name: &str) -> bool {
        self.metric(name).is_some()
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CaseResultRecord {
    case_name: String,
    #[serde(default)]
    metrics: Vec<Metric>,
}

impl TryFrom<CaseResultRecord> for CaseResult {
    type Error = GraphBenchError;

    fn try_from(record: CaseResultRecord) -> Result<Self, Self::Error> {
        CaseResult::new(record.case_name, record.metrics)
    }
}
