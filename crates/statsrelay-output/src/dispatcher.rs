//! The dispatcher: drains buffer files, prunes stale samples, batches, and
//! fans out to every enabled sink.
//!
//! Consumption policy: a captured buffer prefix is consumed once at least
//! one enabled sink delivered every batch built from it (or when no sink is
//! enabled, a deliberate discard). If every enabled sink exhausted its
//! retries the prefix stays in the file for the next tick, so sustained
//! backend outages show up as growing buffer files, never as lost
//! collection. Once consumed, delivery is at-most-once per physical line.

use crate::OutputSink;
use chrono::Utc;
use statsrelay_buffer::line::parse_line;
use statsrelay_buffer::MetricBuffer;
use statsrelay_common::types::Metric;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

/// How often the continuous mode re-scans the buffers.
const ALWAYS_CHECK_INTERVAL: Duration = Duration::from_millis(500);

/// Per-tick accounting, used for logging and tests.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct TickStats {
    pub parsed: usize,
    pub malformed: usize,
    pub stale_dropped: usize,
    pub forwarded: usize,
    pub buffers_left_pending: usize,
}

pub struct Dispatcher {
    buffers: Vec<Arc<MetricBuffer>>,
    sinks: Vec<Arc<dyn OutputSink>>,
    max_metric_age: Duration,
    check_interval: Duration,
    always_check: bool,
}

impl Dispatcher {
    pub fn new(
        buffers: Vec<Arc<MetricBuffer>>,
        sinks: Vec<Arc<dyn OutputSink>>,
        max_metric_age: Duration,
        check_interval: Duration,
        always_check: bool,
    ) -> Self {
        Self {
            buffers,
            sinks,
            max_metric_age,
            check_interval,
            always_check,
        }
    }

    /// Runs ticks until the shutdown flag flips. The flag is observed only
    /// between ticks; an in-flight tick finishes.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        let interval = if self.always_check {
            ALWAYS_CHECK_INTERVAL
        } else {
            self.check_interval
        };

        loop {
            if *shutdown.borrow() {
                break;
            }

            let stats = self.tick().await;
            if stats.parsed > 0 || stats.malformed > 0 {
                tracing::debug!(
                    parsed = stats.parsed,
                    malformed = stats.malformed,
                    stale = stats.stale_dropped,
                    forwarded = stats.forwarded,
                    pending = stats.buffers_left_pending,
                    "Dispatcher tick"
                );
            }

            tokio::select! {
                _ = shutdown.changed() => break,
                _ = tokio::time::sleep(interval) => {}
            }
        }
    }

    /// One pass over every buffer file.
    pub async fn tick(&self) -> TickStats {
        let mut stats = TickStats::default();
        for buffer in &self.buffers {
            self.process_buffer(buffer, &mut stats).await;
        }
        stats
    }

    async fn process_buffer(&self, buffer: &MetricBuffer, stats: &mut TickStats) {
        let captured = match buffer.capture() {
            Ok(captured) => captured,
            Err(e) => {
                tracing::error!(path = %buffer.path().display(), error = %e, "Buffer read failed");
                return;
            }
        };
        if captured.consumed_bytes == 0 {
            return;
        }

        let now = Utc::now();
        let max_age_millis = self.max_metric_age.as_millis() as i64;
        let mut fresh = Vec::new();
        for line in &captured.lines {
            let metric = match parse_line(line) {
                Ok(metric) => metric,
                Err(e) => {
                    stats.malformed += 1;
                    tracing::warn!(path = %buffer.path().display(), error = %e, "Skipping malformed buffer line");
                    continue;
                }
            };
            stats.parsed += 1;

            // Stale samples are dropped whether or not a send is attempted.
            if metric.age_millis(now) > max_age_millis {
                stats.stale_dropped += 1;
                continue;
            }
            fresh.push(metric);
        }

        let enabled: Vec<&Arc<dyn OutputSink>> =
            self.sinks.iter().filter(|s| s.is_enabled()).collect();

        if fresh.is_empty() || enabled.is_empty() {
            // Nothing deliverable (or nowhere to deliver): consume.
            if let Err(e) = buffer.consume(captured.consumed_bytes) {
                tracing::error!(path = %buffer.path().display(), error = %e, "Buffer consume failed");
            }
            return;
        }

        let mut any_success = false;
        for sink in enabled {
            if self.send_all_batches(sink.as_ref(), &fresh).await {
                any_success = true;
            }
        }

        if any_success {
            stats.forwarded += fresh.len();
            if let Err(e) = buffer.consume(captured.consumed_bytes) {
                tracing::error!(path = %buffer.path().display(), error = %e, "Buffer consume failed");
            }
        } else {
            stats.buffers_left_pending += 1;
            tracing::warn!(
                path = %buffer.path().display(),
                metrics = fresh.len(),
                "Every sink failed; leaving buffer for next tick"
            );
        }
    }

    /// Sends `metrics` to one sink in batches no larger than the sink's
    /// configured maximum. True only if every batch was delivered.
    async fn send_all_batches(&self, sink: &dyn OutputSink, metrics: &[Metric]) -> bool {
        let batch_size = sink.max_batch_size().max(1);
        for batch in metrics.chunks(batch_size) {
            if let Err(e) = sink.send_batch(batch).await {
                tracing::warn!(sink = sink.id(), error = %e, "Batch delivery failed");
                return false;
            }
        }
        true
    }
}
