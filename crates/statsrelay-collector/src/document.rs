//! The filter/flatten engine over nested, heterogeneously-typed documents.
//!
//! A source response is modeled as a [`DocValue`] tree. The filter pass
//! prunes metadata and non-numeric data, the flatten pass walks what is left
//! and emits `(dotted.path, value)` pairs. Both passes are pure; one capture
//! timestamp is applied by the caller to everything a document produced.

use chrono::{DateTime, Utc};
use statsrelay_common::sanitize::sanitize_path;
use statsrelay_common::types::Metric;
use std::collections::BTreeMap;

/// A node of a tagged-value document.
#[derive(Debug, Clone, PartialEq)]
pub enum DocValue {
    Number(f64),
    Text(String),
    Map(BTreeMap<String, DocValue>),
    List(Vec<DocValue>),
    Null,
}

impl DocValue {
    pub fn map(entries: impl IntoIterator<Item = (String, DocValue)>) -> Self {
        DocValue::Map(entries.into_iter().collect())
    }

    pub fn is_empty_map(&self) -> bool {
        matches!(self, DocValue::Map(m) if m.is_empty())
    }

    pub fn get(&self, key: &str) -> Option<&DocValue> {
        match self {
            DocValue::Map(m) => m.get(key),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            DocValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            DocValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl From<serde_json::Value> for DocValue {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Number(n) => match n.as_f64() {
                Some(f) if f.is_finite() => DocValue::Number(f),
                _ => DocValue::Null,
            },
            // Booleans are status flags, not measurements.
            serde_json::Value::Bool(_) => DocValue::Null,
            serde_json::Value::String(s) => DocValue::Text(s),
            serde_json::Value::Array(items) => {
                DocValue::List(items.into_iter().map(DocValue::from).collect())
            }
            serde_json::Value::Object(entries) => DocValue::Map(
                entries
                    .into_iter()
                    .map(|(k, v)| (k, DocValue::from(v)))
                    .collect(),
            ),
            serde_json::Value::Null => DocValue::Null,
        }
    }
}

/// Map keys whose subtrees are never emitted, regardless of verbosity.
const PERMANENT_EXCLUSIONS: &[&str] = &["commands"];

/// Map keys dropped unless verbose output is requested or the origin is in
/// the always-verbose exception set.
const CONDITIONAL_EXCLUSIONS: &[&str] = &["indexdetails", "wiredtiger"];

/// Origins whose conditional exclusions are always kept.
const ALWAYS_VERBOSE_ORIGINS: &[&str] = &["serverstatus"];

/// Number keys that are status metadata, not metrics.
const RESERVED_STATUS_KEYS: &[&str] = &["ok"];

fn always_verbose(origin: &str) -> bool {
    let origin = origin.to_ascii_lowercase();
    ALWAYS_VERBOSE_ORIGINS
        .iter()
        .any(|prefix| origin.starts_with(prefix))
}

/// The filter pass: drops excluded subtrees, status-code fields, and every
/// non-numeric leaf. Maps that end up empty are dropped by their parent.
pub fn filter_document(doc: &DocValue, origin: &str, verbose: bool) -> DocValue {
    let DocValue::Map(entries) = doc else {
        return DocValue::Map(BTreeMap::new());
    };

    let mut kept = BTreeMap::new();
    for (key, child) in entries {
        let key_lower = key.to_ascii_lowercase();
        match child {
            DocValue::Map(_) => {
                if PERMANENT_EXCLUSIONS.contains(&key_lower.as_str()) {
                    continue;
                }
                if CONDITIONAL_EXCLUSIONS.contains(&key_lower.as_str())
                    && !verbose
                    && !always_verbose(origin)
                {
                    continue;
                }
                let filtered = filter_document(child, origin, verbose);
                if !filtered.is_empty_map() {
                    kept.insert(key.clone(), filtered);
                }
            }
            DocValue::Number(n) => {
                if RESERVED_STATUS_KEYS.contains(&key_lower.as_str()) {
                    continue;
                }
                kept.insert(key.clone(), DocValue::Number(*n));
            }
            // Strings, lists, and nulls are not numeric.
            _ => {}
        }
    }
    DocValue::Map(kept)
}

/// The flatten pass: depth-first path accumulation over an already-filtered
/// tree, emitting every number leaf as `(prefix.key, value)`.
pub fn flatten_document(prefix: &str, doc: &DocValue, out: &mut Vec<(String, f64)>) {
    let DocValue::Map(entries) = doc else {
        return;
    };

    for (key, child) in entries {
        let path = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{prefix}.{key}")
        };
        match child {
            DocValue::Number(n) => out.push((path, *n)),
            DocValue::Map(_) => flatten_document(&path, child, out),
            _ => {}
        }
    }
}

/// Filters, flattens, sanitizes, and stamps one document.
///
/// Sanitization collisions (two paths mapping to the same clean path) are
/// resolved last-write-wins in document order; no merging.
pub fn document_to_metrics(
    doc: &DocValue,
    origin: &str,
    verbose: bool,
    timestamp: DateTime<Utc>,
) -> Vec<Metric> {
    let filtered = filter_document(doc, origin, verbose);
    let mut pairs = Vec::new();
    flatten_document(origin, &filtered, &mut pairs);

    let mut metrics: Vec<Metric> = Vec::with_capacity(pairs.len());
    let mut seen: std::collections::HashMap<String, usize> = std::collections::HashMap::new();
    for (path, value) in pairs {
        let Some(metric) = Metric::new(sanitize_path(&path), value, timestamp) else {
            continue;
        };
        match seen.get(&metric.path) {
            Some(&idx) => metrics[idx] = metric,
            None => {
                seen.insert(metric.path.clone(), metrics.len());
                metrics.push(metric);
            }
        }
    }
    metrics
}
