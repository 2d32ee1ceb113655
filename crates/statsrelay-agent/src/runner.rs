//! The per-collector run loop.
//!
//! One task per enabled collector: poll, prefix, append to the collector's
//! buffer file, sleep out the rest of the interval. Cadence is wall-clock
//! based: a cycle that overruns its interval is followed by an immediate
//! re-poll, never by overlap. The shutdown flag is checked only at cycle
//! boundaries; an in-flight poll finishes.

use statsrelay_buffer::MetricBuffer;
use statsrelay_collector::Collector;
use statsrelay_common::types::Metric;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::watch;
use tokio::task::JoinHandle;

pub struct CollectorRunner {
    collector: Box<dyn Collector>,
    buffer: Arc<MetricBuffer>,
    prefix: String,
}

impl CollectorRunner {
    pub fn new(collector: Box<dyn Collector>, buffer: Arc<MetricBuffer>, prefix: String) -> Self {
        Self {
            collector,
            buffer,
            prefix,
        }
    }

    /// Spawns the run loop. A disabled collector never starts; the returned
    /// task completes immediately.
    pub fn spawn(self, shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        tokio::spawn(self.run(shutdown))
    }

    async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        if !self.collector.is_enabled() {
            return;
        }
        let name = self.collector.name().to_string();
        tracing::info!(
            collector = %name,
            interval_secs = self.collector.interval().as_secs(),
            "Collector starting"
        );

        loop {
            if *shutdown.borrow() {
                break;
            }

            let started = Instant::now();
            let metrics = match self.collector.collect() {
                Ok(metrics) => metrics,
                Err(e) => {
                    tracing::warn!(collector = %name, error = %e, "Poll failed");
                    Vec::new()
                }
            };

            let prefixed: Vec<Metric> = metrics
                .iter()
                .map(|m| m.with_prefix(&self.prefix))
                .collect();
            if let Err(e) = self.buffer.append(&prefixed) {
                tracing::error!(collector = %name, error = %e, "Buffer append failed");
            }

            let elapsed = started.elapsed();
            tracing::debug!(
                collector = %name,
                metrics = prefixed.len(),
                elapsed_ms = elapsed.as_millis() as u64,
                "Finished collection cycle"
            );

            // interval - elapsed, clamped: an overrun cycle re-polls with
            // zero additional delay.
            let sleep_for = self.collector.interval().saturating_sub(elapsed);
            tokio::select! {
                _ = shutdown.changed() => break,
                _ = tokio::time::sleep(sleep_for) => {}
            }
        }

        tracing::info!(collector = %name, "Collector stopped");
    }
}
