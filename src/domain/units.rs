use std::{borrow::Cow, fmt};

use serde::{Deserialize, Serialize};

/// Measurement dimension of a metric value, e.g. `Core API read / ms`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Unit {
    key: Cow<'static, str>,
}

impl Unit {
    pub const fn from_static(key: &'static str) -> Self {
        Self {
            key: Cow::Borrowed(key),
        }
    }

    pub fn new<T: Into<String>>(key: T) -> Self {
        Self {
            key: Cow::Owned(key.into()),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Rate unit `self / denominator`.
    pub fn per(&self, denominator: &Unit) -> Unit {
        Unit::new(format!("{} / {}", self.key, denominator.key))
    }

    pub fn is_time(&self) -> bool {
        *self == MILLISECOND || *self == SECOND
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key)
    }
}

/// One committed unit of work that wrote through the store API.
pub const CORE_API_WRITE_TRANSACTION: Unit = Unit::from_static("Core API write tx");
/// One read through the store API, including index reads.
pub const CORE_API_READ: Unit = Unit::from_static("Core API read");

pub const SECOND: Unit = Unit::from_static("s");
pub const MILLISECOND: Unit = Unit::from_static("ms");

pub const UNKNOWN: Unit = Unit::from_static("unknown");

pub fn reads_per_ms() -> Unit {
    CORE_API_READ.per(&MILLISECOND)
}

pub fn writes_per_ms() -> Unit {
    CORE_API_WRITE_TRANSACTION.per(&MILLISECOND)
}
