//! Shared value types for the statsrelay agent.
//!
//! The central type is [`types::Metric`], the immutable sample that flows
//! from collectors through buffer files to the output sinks. Path
//! sanitization lives here because both the flattening engine and the
//! Graphite wire format depend on it.

pub mod sanitize;
pub mod types;

#[cfg(test)]
mod tests;
