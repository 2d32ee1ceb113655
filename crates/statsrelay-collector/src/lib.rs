//! Metric collection framework for the statsrelay agent.
//!
//! Each [`Collector`] implementation polls one external source on its own
//! cadence and returns flat numeric [`Metric`]s. Sources that answer with a
//! nested document go through the filter/flatten engine in [`document`];
//! the built-in host collectors (cpu, memory, disk, network, load) read
//! straight from `sysinfo`.

pub mod cpu;
pub mod disk;
pub mod document;
pub mod load;
pub mod memory;
pub mod mongo;
pub mod network;


use anyhow::Result;
use statsrelay_common::types::Metric;
use std::time::Duration;

/// An independently scheduled polling unit producing samples from one
/// external source.
///
/// Implementations are driven by the agent's per-collector run loop: one
/// `collect` call per cycle, strictly serial. A failed poll is reported as
/// an `Err`, logged by the loop, and treated as an empty result; it never
/// terminates the loop.
pub trait Collector: Send + Sync {
    /// Collector name, used for logging and as the metric path prefix
    /// (e.g., `"cpu"`, `"mongo"`).
    fn name(&self) -> &str;

    /// A disabled collector never enters its run loop.
    fn is_enabled(&self) -> bool;

    /// Polling interval. The loop sleeps `interval - elapsed` after each
    /// cycle, clamped to zero, so a slow poll delays but never overlaps the
    /// next one.
    fn interval(&self) -> Duration;

    /// Polls the source once and converts the response into metrics.
    ///
    /// # Errors
    ///
    /// Returns an error if the source is unreachable or answers with
    /// something unusable. The caller logs and continues on schedule.
    fn collect(&mut self) -> Result<Vec<Metric>>;
}
