//! Agent configuration.
//!
//! One immutable [`AgentConfig`] is built from a TOML file at startup and
//! passed explicitly into collectors, buffers, sinks, and the dispatcher.
//! Configuration problems are the only fatal errors in the agent; anything
//! that goes wrong later degrades to log-and-continue.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use statsrelay_common::sanitize::sanitize_path;
use statsrelay_output::graphite::GraphiteConfig;
use statsrelay_output::opentsdb_http::OpenTsdbHttpConfig;
use statsrelay_output::opentsdb_telnet::OpenTsdbTelnetConfig;
use std::path::PathBuf;

#[derive(Debug, Deserialize)]
pub struct AgentConfig {
    pub agent: AgentSection,
    /// Explicit, finite, ordered list of collector definitions.
    #[serde(default)]
    pub collectors: Vec<CollectorConfig>,
    #[serde(default)]
    pub sinks: SinksConfig,
}

#[derive(Debug, Deserialize)]
pub struct AgentSection {
    /// Prefix applied to every metric path. `$HOSTNAME` expands to the OS
    /// hostname.
    #[serde(default = "default_metric_prefix")]
    pub metric_prefix: String,
    #[serde(default = "default_buffer_dir")]
    pub buffer_dir: PathBuf,
    #[serde(default = "default_max_metric_age_secs")]
    pub max_metric_age_secs: u64,
    #[serde(default = "default_check_buffers_interval_secs")]
    pub check_buffers_interval_secs: u64,
    #[serde(default = "default_always_check_buffers")]
    pub always_check_buffers: bool,
}

fn default_metric_prefix() -> String {
    "$HOSTNAME".to_string()
}

fn default_buffer_dir() -> PathBuf {
    PathBuf::from("./buffers")
}

fn default_max_metric_age_secs() -> u64 {
    90
}

fn default_check_buffers_interval_secs() -> u64 {
    5
}

fn default_always_check_buffers() -> bool {
    true
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CollectorKind {
    Cpu,
    Memory,
    Disk,
    Network,
    Load,
}

impl CollectorKind {
    pub fn default_name(&self) -> &'static str {
        match self {
            CollectorKind::Cpu => "cpu",
            CollectorKind::Memory => "memory",
            CollectorKind::Disk => "disk",
            CollectorKind::Network => "network",
            CollectorKind::Load => "load",
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CollectorConfig {
    pub kind: CollectorKind,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
    /// Path prefix for this collector's metrics; defaults to the kind name.
    #[serde(default)]
    pub prefix: Option<String>,
}

fn default_enabled() -> bool {
    true
}

fn default_interval_secs() -> u64 {
    30
}

impl CollectorConfig {
    pub fn prefix(&self) -> &str {
        self.prefix.as_deref().unwrap_or(self.kind.default_name())
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct SinksConfig {
    #[serde(default)]
    pub graphite: Vec<GraphiteConfig>,
    #[serde(default)]
    pub opentsdb_telnet: Vec<OpenTsdbTelnetConfig>,
    #[serde(default)]
    pub opentsdb_http: Vec<OpenTsdbHttpConfig>,
}

impl AgentConfig {
    pub fn load(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading config file {path}"))?;
        let mut config: Self =
            toml::from_str(&content).with_context(|| format!("parsing config file {path}"))?;
        config.agent.metric_prefix = expand_hostname(&config.agent.metric_prefix);
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        // The buffer line codec is space-delimited; whitespace anywhere in
        // a path prefix would make every line unparseable.
        if self.agent.metric_prefix.chars().any(char::is_whitespace) {
            bail!(
                "agent.metric_prefix {:?} must not contain whitespace",
                self.agent.metric_prefix
            );
        }
        for collector in &self.collectors {
            if collector.prefix().chars().any(char::is_whitespace) {
                bail!(
                    "collector prefix {:?} must not contain whitespace",
                    collector.prefix()
                );
            }
            if collector.interval_secs == 0 {
                bail!(
                    "collector {}: interval_secs must be greater than zero",
                    collector.prefix()
                );
            }
        }
        for sink in &self.sinks.graphite {
            if sink.max_batch_size == 0 {
                bail!("sink {}: max_batch_size must be greater than zero", sink.id);
            }
        }
        for sink in &self.sinks.opentsdb_telnet {
            if sink.max_batch_size == 0 {
                bail!("sink {}: max_batch_size must be greater than zero", sink.id);
            }
        }
        for sink in &self.sinks.opentsdb_http {
            if sink.max_batch_size == 0 {
                bail!("sink {}: max_batch_size must be greater than zero", sink.id);
            }
        }
        if self.agent.max_metric_age_secs == 0 {
            bail!("agent.max_metric_age_secs must be greater than zero");
        }
        Ok(())
    }

    pub fn sink_count(&self) -> usize {
        self.sinks.graphite.len() + self.sinks.opentsdb_telnet.len() + self.sinks.opentsdb_http.len()
    }
}

fn expand_hostname(prefix: &str) -> String {
    if !prefix.contains("$HOSTNAME") {
        return prefix.to_string();
    }
    prefix.replace("$HOSTNAME", &os_hostname())
}

fn os_hostname() -> String {
    for var in ["COMPUTERNAME", "HOSTNAME"] {
        if let Ok(name) = std::env::var(var) {
            if !name.trim().is_empty() {
                return sanitize_path(&name);
            }
        }
    }
    hostname::get()
        .ok()
        .and_then(|h| h.into_string().ok())
        .filter(|h| !h.trim().is_empty())
        .map(|h| sanitize_path(&h))
        .unwrap_or_else(|| "UNKNOWN-HOST".to_string())
}
