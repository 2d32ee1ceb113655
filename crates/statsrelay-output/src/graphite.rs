//! Graphite plaintext protocol sink.
//!
//! One metric per line: `<sanitized.dotted.path> <value> <epoch-seconds>`,
//! the whole batch in a single write over a per-send TCP connection.

use crate::error::SendError;
use crate::retry::send_with_retry;
use crate::{default_max_batch_size, default_retry_attempts, default_timeout_secs, wire_path, OutputSink};
use async_trait::async_trait;
use serde::Deserialize;
use statsrelay_common::types::{format_value, Metric};
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;

#[derive(Debug, Clone, Deserialize)]
pub struct GraphiteConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_retry_attempts")]
    pub retry_attempts: u32,
    #[serde(default = "default_max_batch_size")]
    pub max_batch_size: usize,
    #[serde(default)]
    pub sanitize_metrics: bool,
    #[serde(default)]
    pub substitute_characters: bool,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    pub id: String,
}

pub(crate) fn default_enabled() -> bool {
    true
}

fn default_port() -> u16 {
    2003
}

pub struct GraphiteSink {
    config: GraphiteConfig,
}

impl GraphiteSink {
    pub fn new(config: GraphiteConfig) -> Self {
        Self { config }
    }

    fn endpoint(&self) -> String {
        format!("{}:{}", self.config.host, self.config.port)
    }

    fn render(&self, metrics: &[Metric]) -> String {
        let mut payload = String::new();
        for metric in metrics {
            let path = wire_path(
                &metric.path,
                self.config.sanitize_metrics,
                self.config.substitute_characters,
            );
            payload.push_str(&format!(
                "{} {} {}\n",
                path,
                format_value(metric.value),
                metric.epoch_seconds()
            ));
        }
        payload
    }

    async fn attempt(&self, payload: &str) -> Result<(), SendError> {
        let endpoint = self.endpoint();
        let io = |source| SendError::Io {
            endpoint: endpoint.clone(),
            source,
        };

        let connect = TcpStream::connect(&endpoint);
        let timeout = Duration::from_secs(self.config.timeout_secs);
        let mut stream = tokio::time::timeout(timeout, connect)
            .await
            .map_err(|_| SendError::Timeout {
                endpoint: endpoint.clone(),
                seconds: self.config.timeout_secs,
            })?
            .map_err(io)?;

        let write = async {
            stream.write_all(payload.as_bytes()).await?;
            stream.flush().await?;
            stream.shutdown().await
        };
        tokio::time::timeout(timeout, write)
            .await
            .map_err(|_| SendError::Timeout {
                endpoint: endpoint.clone(),
                seconds: self.config.timeout_secs,
            })?
            .map_err(io)?;
        Ok(())
    }
}

#[async_trait]
impl OutputSink for GraphiteSink {
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

        let payload = self.render(metrics);
        send_with_retry(&self.config.id, self.config.retry_attempts, || {
            self.attempt(&payload)
        })
        .await
    }
}
