//! OpenTSDB HTTP sink.
//!
//! One POST per batch, carrying a JSON array of
//! `{metric, timestamp, value, tags}` objects.

use crate::error::SendError;
use crate::retry::send_with_retry;
use crate::{default_max_batch_size, default_retry_attempts, default_timeout_secs, wire_path, OutputSink};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use statsrelay_common::types::Metric;
use std::collections::BTreeMap;
use std::time::Duration;

fn default_enabled() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
pub struct OpenTsdbHttpConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Full endpoint URL, e.g. `http://tsdb.internal:4242/api/put`.
    pub url: String,
    #[serde(default = "default_retry_attempts")]
    pub retry_attempts: u32,
    #[serde(default = "default_max_batch_size")]
    pub max_batch_size: usize,
    #[serde(default)]
    pub sanitize_metrics: bool,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Static tags attached to every data point.
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
    pub id: String,
}

#[derive(Debug, Serialize)]
struct DataPoint<'a> {
    metric: String,
    timestamp: i64,
    value: f64,
    tags: &'a BTreeMap<String, String>,
}

pub struct OpenTsdbHttpSink {
    config: OpenTsdbHttpConfig,
    client: reqwest::Client,
}

impl OpenTsdbHttpSink {
    pub fn new(config: OpenTsdbHttpConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_default();
        Self { config, client }
    }

    fn body<'a>(&'a self, metrics: &[Metric]) -> Vec<DataPoint<'a>> {
        metrics
            .iter()
            .map(|metric| DataPoint {
                metric: wire_path(&metric.path, self.config.sanitize_metrics, false),
                timestamp: metric.epoch_millis(),
                value: metric.value,
                tags: &self.config.tags,
            })
            .collect()
    }

    async fn attempt(&self, body: &[DataPoint<'_>]) -> Result<(), SendError> {
        let response = self
            .client
            .post(&self.config.url)
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(SendError::Status {
                endpoint: self.config.url.clone(),
                status: status.as_u16(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl OutputSink for OpenTsdbHttpSink {
    fn id(&self) -> &str {
        &self.config.id
    }

    fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    fn max_batch_size(&self) -> usize {
        self.config.max_batch_size
    }

    async fn send_batch(&self, metrics: &[Metric]) -> Result<(), SendError> {
        if !self.config.enabled || metrics.is_empty() {
            return Ok(());
        }

        let body = self.body(metrics);
        send_with_retry(&self.config.id, self.config.retry_attempts, || {
            self.attempt(&body)
        })
        .await
    }
}
