use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single flat numeric sample.
///
/// `path` is a non-empty dot-separated metric name, `value` is always a
/// finite number (non-numeric source data is dropped before a `Metric` is
/// ever constructed), and `timestamp` is the capture time of the collection
/// cycle that produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metric {
    pub path: String,
    pub value: f64,
    pub timestamp: DateTime<Utc>,
}

impl Metric {
    /// Builds a metric, rejecting empty paths and non-finite values.
    pub fn new(path: impl Into<String>, value: f64, timestamp: DateTime<Utc>) -> Option<Self> {
        let path = path.into();
        if path.is_empty() || !value.is_finite() {
            return None;
        }
        Some(Self {
            path,
            value,
            timestamp,
        })
    }

    /// Returns a copy with `prefix.` prepended to the path.
    pub fn with_prefix(&self, prefix: &str) -> Self {
        if prefix.is_empty() {
            return self.clone();
        }
        Self {
            path: format!("{}.{}", prefix, self.path),
            value: self.value,
            timestamp: self.timestamp,
        }
    }

    pub fn epoch_seconds(&self) -> i64 {
        self.timestamp.timestamp()
    }

    pub fn epoch_millis(&self) -> i64 {
        self.timestamp.timestamp_millis()
    }

    /// Age of this metric relative to `now`, in milliseconds. Samples with a
    /// future timestamp report zero age.
    pub fn age_millis(&self, now: DateTime<Utc>) -> i64 {
        (now.timestamp_millis() - self.epoch_millis()).max(0)
    }
}

/// Formats a metric value for wire and buffer output.
///
/// Never produces scientific notation; integral values lose the trailing
/// `.0` so counters round-trip as plain integers.
pub fn format_value(value: f64) -> String {
    if value == value.trunc() && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{value}")
    }
}

impl std::fmt::Display for Metric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} {} {}",
            self.path,
            format_value(self.value),
            self.epoch_millis()
        )
    }
}
