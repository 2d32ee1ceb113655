//! MongoDB status collector.
//!
//! The wire commands live behind [`MongoStatusSource`]; this module only
//! turns the answers into metrics: flatten `replSetStatus` and
//! `serverStatus` through the document engine, and derive the replication
//! metrics (oplog window, per-peer lag and headroom) by cross-referencing
//! the primary's optime against each peer's.

use crate::document::{document_to_metrics, DocValue};
use crate::Collector;
use anyhow::Result;
use chrono::{DateTime, Utc};
use statsrelay_common::sanitize::sanitize_peer_name;
use statsrelay_common::types::Metric;
use std::collections::BTreeMap;
use std::time::Duration;

/// Oplog bounds as reported by the source.
#[derive(Debug, Clone)]
pub struct OplogInfo {
    pub max_size_bytes: f64,
    pub used_bytes: f64,
    pub first_entry: DateTime<Utc>,
    pub last_entry: DateTime<Utc>,
}

/// Statistics for one database and its collections.
#[derive(Debug, Clone)]
pub struct DatabaseStats {
    pub name: String,
    /// The `dbStats` document.
    pub stats: DocValue,
    /// `(collection name, collStats document)` pairs.
    pub collections: Vec<(String, DocValue)>,
}

/// The narrow interface to one MongoDB instance. Implementations issue the
/// actual wire commands; the collector never sees a connection.
pub trait MongoStatusSource: Send + Sync {
    /// The `serverStatus` document.
    fn server_status(&mut self) -> Result<DocValue>;

    /// The `replSetGetStatus` document, or `None` when the instance is not
    /// part of a replica set.
    fn repl_set_status(&mut self) -> Result<Option<DocValue>>;

    /// Oplog bounds, or `None` when the instance carries no oplog.
    fn oplog_info(&mut self) -> Result<Option<OplogInfo>>;

    /// `dbStats` and `collStats` for every database on the instance.
    fn database_stats(&mut self) -> Result<Vec<DatabaseStats>>;
}

/// Replica set member state used for the arbiter check.
const STATE_ARBITER: i64 = 7;

/// serverStatus path prefixes still emitted for an arbiter in non-verbose
/// mode.
const ARBITER_KEEP_PREFIXES: &[&str] = &[
    "serverStatus.network",
    "serverStatus.connections",
    "serverStatus.uptime",
    "serverStatus.pid",
];

pub struct MongoCollector<S> {
    name: String,
    enabled: bool,
    interval: Duration,
    verbose: bool,
    source: S,
}

impl<S: MongoStatusSource> MongoCollector<S> {
    pub fn new(name: impl Into<String>, enabled: bool, interval: Duration, verbose: bool, source: S) -> Self {
        Self {
            name: name.into(),
            enabled,
            interval,
            verbose,
            source,
        }
    }

    fn repl_metrics(&mut self, now: DateTime<Utc>) -> (Option<DocValue>, Vec<Metric>) {
        let repl = match self.source.repl_set_status() {
            Ok(repl) => repl,
            Err(e) => {
                tracing::warn!(collector = %self.name, error = %e, "replSetGetStatus failed");
                None
            }
        };

        let Some(repl) = repl else {
            return (None, Vec::new());
        };

        // Only a healthy status document is worth flattening.
        if repl.get("ok").and_then(DocValue::as_number) != Some(1.0) {
            return (Some(repl), Vec::new());
        }

        let mut metrics = document_to_metrics(&repl, "replSetStatus", self.verbose, now);

        match self.source.oplog_info() {
            Ok(Some(oplog)) => {
                let derived = replication_document(&oplog, &repl);
                metrics.extend(document_to_metrics(&derived, "replSetStatus", self.verbose, now));
            }
            Ok(None) => {}
            Err(e) => {
                tracing::warn!(collector = %self.name, error = %e, "oplog inspection failed");
            }
        }

        (Some(repl), metrics)
    }

    fn database_metrics(&mut self, now: DateTime<Utc>) -> Vec<Metric> {
        let databases = match self.source.database_stats() {
            Ok(databases) => databases,
            Err(e) => {
                tracing::warn!(collector = %self.name, error = %e, "Database stats failed");
                return Vec::new();
            }
        };

        let mut metrics = Vec::new();
        for db in &databases {
            metrics.extend(document_to_metrics(
                &db.stats,
                &format!("dbStats.{}", db.name),
                self.verbose,
                now,
            ));
            for (collection, stats) in &db.collections {
                metrics.extend(document_to_metrics(
                    stats,
                    &format!("collectionStats.{}.{}", db.name, collection),
                    self.verbose,
                    now,
                ));
            }
        }
        metrics
    }

    fn is_arbiter(repl: Option<&DocValue>) -> bool {
        let my_state = repl
            .and_then(|r| r.get("myState"))
            .and_then(DocValue::as_number);
        matches!(my_state, Some(s) if s as i64 == STATE_ARBITER)
    }
}

impl<S: MongoStatusSource> Collector for MongoCollector<S> {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn interval(&self) -> Duration {
        self.interval
    }

    fn collect(&mut self) -> Result<Vec<Metric>> {
        let now = Utc::now();
        let mut metrics = Vec::new();

        let server_status = match self.source.server_status() {
            Ok(doc) => {
                metrics.extend(Metric::new("Available", 1.0, now));
                Some(doc)
            }
            Err(e) => {
                tracing::warn!(collector = %self.name, error = %e, "serverStatus failed");
                metrics.extend(Metric::new("Available", 0.0, now));
                None
            }
        };

        let (repl, repl_metrics) = self.repl_metrics(now);
        metrics.extend(repl_metrics);

        // Arbiters hold no data; skip database and collection statistics.
        if !Self::is_arbiter(repl.as_ref()) {
            metrics.extend(self.database_metrics(now));
        }

        if let Some(doc) = server_status {
            if doc.get("ok").and_then(DocValue::as_number) == Some(1.0) {
                let flattened = document_to_metrics(&doc, "serverStatus", self.verbose, now);
                if Self::is_arbiter(repl.as_ref()) && !self.verbose {
                    // Arbiters hold no data; limit output to connectivity
                    // and process-level paths.
                    metrics.extend(flattened.into_iter().filter(|m| {
                        ARBITER_KEEP_PREFIXES
                            .iter()
                            .any(|prefix| m.path.starts_with(prefix))
                    }));
                } else {
                    metrics.extend(flattened);
                }
            }
        }

        Ok(metrics)
    }
}

/// Builds the derived replication document from the oplog bounds and the
/// replica set status.
///
/// Lag for one peer is `primary_optime - peer_optime`; headroom is the oplog
/// window minus that lag. Peers are classified by their reported state
/// string; an unmatched state is skipped. If no primary can be identified
/// the per-peer section is omitted entirely.
pub fn replication_document(oplog: &OplogInfo, repl: &DocValue) -> DocValue {
    const MB: f64 = 1024.0 * 1024.0;

    let window_secs =
        (oplog.last_entry.timestamp() - oplog.first_entry.timestamp()).max(0);

    let mut entries: BTreeMap<String, DocValue> = BTreeMap::new();
    entries.insert(
        "oplog_maxsizeMB".to_string(),
        DocValue::Number((oplog.max_size_bytes / MB).floor()),
    );
    entries.insert(
        "oplog_usedMb".to_string(),
        DocValue::Number((oplog.used_bytes / MB).ceil()),
    );
    entries.insert(
        "oplogWindowTimeDiff-Sec".to_string(),
        DocValue::Number(window_secs as f64),
    );
    entries.insert(
        "oplogWindowtimeDiff-Hour".to_string(),
        DocValue::Number((window_secs / 3600) as f64),
    );

    if let Some((primary_optime, peers)) = classify_members(repl) {
        for peer in peers {
            let lag_millis = primary_optime - peer.optime_millis;
            let headroom_millis = window_secs * 1000 - lag_millis;
            entries.insert(
                format!("replicationLag-Sec.{}.{}", peer.role, peer.name),
                DocValue::Number((lag_millis / 1000) as f64),
            );
            entries.insert(
                format!("replicationHeadroom-Sec.{}.{}", peer.role, peer.name),
                DocValue::Number((headroom_millis / 1000) as f64),
            );
        }
    }

    entries.insert("ok".to_string(), DocValue::Number(1.0));
    DocValue::Map(entries)
}

struct Peer {
    name: String,
    role: &'static str,
    optime_millis: i64,
}

/// Finds the primary's optime and every classifiable peer. Returns `None`
/// when no member reports the primary state.
fn classify_members(repl: &DocValue) -> Option<(i64, Vec<Peer>)> {
    let Some(DocValue::List(members)) = repl.get("members") else {
        return None;
    };

    let mut primary_optime: Option<i64> = None;
    let mut peers = Vec::new();

    for member in members {
        let Some(state) = member.get("stateStr").and_then(DocValue::as_text) else {
            continue;
        };
        let Some(optime) = member.get("optimeDate").and_then(DocValue::as_number) else {
            continue;
        };
        let optime_millis = optime as i64;

        let state_upper = state.to_ascii_uppercase();
        if state_upper == "PRIMARY" {
            primary_optime = Some(optime_millis);
            continue;
        }

        let role = if state_upper.contains("SECONDARY") {
            "secondary"
        } else if state_upper == "STARTUP2" {
            "startup2"
        } else if state_upper == "RECOVERING" {
            "recovering"
        } else {
            // Unknown member state; not a failure.
            continue;
        };

        let Some(name) = member.get("name").and_then(DocValue::as_text) else {
            continue;
        };
        peers.push(Peer {
            name: sanitize_peer_name(name),
            role,
            optime_millis,
        });
    }

    primary_optime.map(|optime| (optime, peers))
}
