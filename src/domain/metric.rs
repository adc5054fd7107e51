use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::domain::units::{self, Unit};

/// Prefix of latency metrics emitted by query cases; such metrics are
/// smaller-is-better when older records carry no comparer.
pub const AVERAGE_FOR_PREFIX: &str = "Average for: ";

/// Direction policy for a metric. The allowed-regression floor is the exact value
/// at which [`Comparer::has_regressed`] flips.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Comparer {
    BiggerIsBetter,
    SmallerIsBetter,
}

impl Comparer {
    /// Orders `a` before `b` when `a` is the better value.
    pub fn compare(self, a: f64, b: f64) -> Ordering {
        match self {
            Comparer::BiggerIsBetter => b.total_cmp(&a),
            Comparer::SmallerIsBetter => a.total_cmp(&b),
        }
    }

    pub fn is_better(self, candidate: f64, incumbent: f64) -> bool {
        self.compare(candidate, incumbent) == Ordering::Less
    }

    /// Worst value still accepted against `old_value` for the given threshold fraction.
    pub fn allowed_regression(self, old_value: f64, threshold: f64) -> f64 {
        match self {
            Comparer::BiggerIsBetter => old_value - old_value * threshold,
            Comparer::SmallerIsBetter => old_value + old_value * threshold,
        }
    }

    pub fn has_regressed(self, new_value: f64, old_value: f64, threshold: f64) -> bool {
        let floor = self.allowed_regression(old_value, threshold);
        match self {
            Comparer::BiggerIsBetter => new_value < floor,
            Comparer::SmallerIsBetter => new_value > floor,
        }
    }

    /// Comparer for records written before comparers were persisted.
    pub fn derive_from(name: &str, unit: &Unit) -> Comparer {
        if name.starts_with(AVERAGE_FOR_PREFIX) || unit.is_time() {
            Comparer::SmallerIsBetter
        } else {
            Comparer::BiggerIsBetter
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "MetricRecord")]
pub struct Metric {
    name: String,
    value: f64,
    unit: Unit,
    track_regression: bool,
    comparer: Comparer,
}

impl Metric {
    /// Untracked metric whose comparer is derived from its name and unit.
    pub fn new<T: Into<String>>(name: T, value: f64, unit: Unit) -> Self {
        let name = name.into();
        let comparer = Comparer::derive_from(&name, &unit);
        Self {
            name,
            value,
            unit,
            track_regression: false,
            comparer,
        }
    }

    pub fn tracked<T: Into<String>>(name: T, value: f64, unit: Unit, comparer: Comparer) -> Self {
        Self {
            name: name.into(),
            value,
            unit,
            track_regression: true,
            comparer,
        }
    }

    pub fn with_comparer(mut self, comparer: Comparer) -> Self {
        self.comparer = comparer;
        self
    }

    pub fn with_tracking(mut self, track_regression: bool) -> Self {
        self.track_regression = track_regression;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn unit(&self) -> &Unit {
        &self.unit
    }

    pub fn comparer(&self) -> Comparer {
        self.comparer
    }

    pub fn should_track_regression(&self) -> bool {
        self.track_regression
    }

    pub fn allowed_regression(&self, threshold: f64) -> f64 {
        self.comparer.allowed_regression(self.value, threshold)
    }

    /// Uses this metric's comparer against the historical `best`.
    pub fn has_regressed_from(&self, best: &Metric, threshold: f64) -> bool {
        self.comparer.has_regressed(self.value, best.value, threshold)
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct MetricRecord {
    name: String,
    value: f64,
    #[serde(default)]
    unit: Option<Unit>,
    #[serde(default)]
    track_regression: bool,
    #[serde(default)]
    comparer: Option<Comparer>,
}

impl From<MetricRecord> for Metric {
    fn from(record: MetricRecord) -> Self {
        let unit = record.unit.unwrap_or_else(|| default_unit(&record.name));
        let comparer = record
            .comparer
            .unwrap_or_else(|| Comparer::derive_from(&record.name, &unit));
        Metric {
            name: record.name,
            value: record.value,
            unit,
            track_regression: record.track_regression,
            comparer,
        }
    }
}

fn default_unit(name: &str) -> Unit {
    let lowered = name.to_lowercase();
    if name.starts_with(AVERAGE_FOR_PREFIX) {
        units::MILLISECOND
    } else if lowered.contains("read") {
        units::reads_per_ms()
    } else if lowered.contains("write") {
        units::writes_per_ms()
    } else {
        units::UNKNOWN
    }
}
