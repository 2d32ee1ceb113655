//! Output sinks and the dispatcher.
//!
//! A sink is a batching, retrying network client for one backend instance;
//! the dispatcher drains the per-collector buffer files, prunes stale
//! samples, and fans batches out to every enabled sink independently.

pub mod dispatcher;
pub mod error;
pub mod graphite;
pub mod opentsdb_http;
pub mod opentsdb_telnet;
pub(crate) mod retry;


use async_trait::async_trait;
use error::SendError;
use statsrelay_common::types::Metric;

/// A network-facing destination implementing one wire protocol.
///
/// One configured backend maps to one running sink instance; multiple sinks
/// run concurrently, each independently receiving the same metric stream. A
/// disabled sink is a no-op that always reports success; its data is
/// deliberately discarded.
#[async_trait]
pub trait OutputSink: Send + Sync {
    /// Human-readable identifier, used only for diagnostics.
    fn id(&self) -> &str;

    fn is_enabled(&self) -> bool;

    /// The dispatcher never hands this sink more metrics than this in one
    /// batch.
    fn max_batch_size(&self) -> usize;

    /// Delivers one batch, retrying internally per the sink's retry policy.
    /// An `Err` means every attempt was exhausted; the batch stays in the
    /// buffer for the next dispatcher tick.
    async fn send_batch(&self, metrics: &[Metric]) -> Result<(), SendError>;
}

/// Applies the sink's sanitize/substitute flags to a metric path.
pub(crate) fn wire_path(path: &str, sanitize: bool, substitute: bool) -> String {
    use statsrelay_common::sanitize::{sanitize_path, substitute_characters};
    let substituted = if substitute {
        substitute_characters(path)
    } else {
        path.to_string()
    };
    if sanitize {
        sanitize_path(&substituted)
    } else {
        substituted
    }
}

fn default_retry_attempts() -> u32 {
    2
}

fn default_max_batch_size() -> usize {
    1000
}

fn default_timeout_secs() -> u64 {
    10
}
