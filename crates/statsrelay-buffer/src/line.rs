//! The buffer file line codec.
//!
//! One metric per line, space-delimited, fields ordered path / value /
//! epoch-milliseconds. Human-inspectable and fully round-trip parseable.

use crate::error::BufferError;
use chrono::{TimeZone, Utc};
use statsrelay_common::types::{format_value, Metric};

pub fn encode_line(metric: &Metric) -> String {
    format!(
        "{} {} {}\n",
        metric.path,
        format_value(metric.value),
        metric.epoch_millis()
    )
}

pub fn parse_line(line: &str) -> Result<Metric, BufferError> {
    let malformed = || BufferError::MalformedLine(line.to_string());

    let mut fields = line.trim_end().split(' ');
    let path = fields.next().filter(|p| !p.is_empty()).ok_or_else(malformed)?;
    let value: f64 = fields
        .next()
        .and_then(|v| v.parse().ok())
        .ok_or_else(malformed)?;
    let millis: i64 = fields
        .next()
        .and_then(|t| t.parse().ok())
        .ok_or_else(malformed)?;
    if fields.next().is_some() {
        return Err(malformed());
    }

    let timestamp = Utc
        .timestamp_millis_opt(millis)
        .single()
        .ok_or_else(malformed)?;
    Metric::new(path, value, timestamp).ok_or_else(malformed)
}
