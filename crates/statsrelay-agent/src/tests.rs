use crate::config::{AgentConfig, CollectorKind};
use crate::runner::CollectorRunner;
use chrono::Utc;
use statsrelay_buffer::MetricBuffer;
use statsrelay_collector::Collector;
use statsrelay_common::types::Metric;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::sync::watch;

fn write_config(dir: &TempDir, content: &str) -> String {
    let path = dir.path().join("statsrelay.toml");
    std::fs::write(&path, content).unwrap();
    path.to_string_lossy().into_owned()
}

#[test]
fn full_config_parses() {
    let dir = TempDir::new().unwrap();
    let path = write_config(
        &dir,
        r#"
[agent]
metric_prefix = "prod.app1"
buffer_dir = "/var/lib/statsrelay"
max_metric_age_secs = 120
check_buffers_interval_secs = 2
always_check_buffers = false

[[collectors]]
kind = "cpu"
interval_secs = 15

[[collectors]]
kind = "disk"
enabled = false
prefix = "storage"

[[sinks.graphite]]
id = "graphite-main"
host = "graphite.example.com"
port = 2013
retry_attempts = 4

[[sinks.opentsdb_telnet]]
id = "tsdb-telnet"
host = "tsdb.example.com"
tags = { env = "prod" }

[[sinks.opentsdb_http]]
id = "tsdb-http"
url = "http://tsdb.example.com:4242/api/put"
"#,
    );

    let config = AgentConfig::load(&path).unwrap();
    assert_eq!(config.agent.metric_prefix, "prod.app1");
    assert_eq!(config.agent.max_metric_age_secs, 120);
    assert_eq!(config.agent.check_buffers_interval_secs, 2);
    assert!(!config.agent.always_check_buffers);

    assert_eq!(config.collectors.len(), 2);
    assert_eq!(config.collectors[0].kind, CollectorKind::Cpu);
    assert_eq!(config.collectors[0].interval_secs, 15);
    assert!(config.collectors[0].enabled);
    assert_eq!(config.collectors[0].prefix(), "cpu");
    assert!(!config.collectors[1].enabled);
    assert_eq!(config.collectors[1].prefix(), "storage");

    assert_eq!(config.sink_count(), 3);
    assert_eq!(config.sinks.graphite[0].port, 2013);
    assert_eq!(config.sinks.graphite[0].retry_attempts, 4);
    assert_eq!(
        config.sinks.opentsdb_telnet[0].tags.get("env"),
        Some(&"prod".to_string())
    );
}

#[test]
fn minimal_config_gets_defaults() {
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, "[agent]\nmetric_prefix = \"host1\"\n");

    let config = AgentConfig::load(&path).unwrap();
    assert_eq!(config.agent.max_metric_age_secs, 90);
    assert_eq!(config.agent.check_buffers_interval_secs, 5);
    assert!(config.agent.always_check_buffers);
    assert!(config.collectors.is_empty());
    assert_eq!(config.sink_count(), 0);
}

#[test]
fn hostname_placeholder_is_expanded() {
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, "[agent]\nmetric_prefix = \"$HOSTNAME.app\"\n");

    let config = AgentConfig::load(&path).unwrap();
    assert!(!config.agent.metric_prefix.contains("$HOSTNAME"));
    assert!(config.agent.metric_prefix.ends_with(".app"));
    assert!(config.agent.metric_prefix.len() > ".app".len());
}

#[test]
fn zero_collector_interval_is_rejected() {
    let dir = TempDir::new().unwrap();
    let path = write_config(
        &dir,
        r#"
[agent]
[[collectors]]
kind = "memory"
interval_secs = 0
"#,
    );
    assert!(AgentConfig::load(&path).is_err());
}

#[test]
fn zero_batch_size_is_rejected() {
    let dir = TempDir::new().unwrap();
    let path = write_config(
        &dir,
        r#"
[agent]
[[sinks.graphite]]
id = "g"
host = "localhost"
max_batch_size = 0
"#,
    );
    assert!(AgentConfig::load(&path).is_err());
}

#[test]
fn whitespace_in_metric_prefix_is_rejected() {
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, "[agent]\nmetric_prefix = \"my host\"\n");
    assert!(AgentConfig::load(&path).is_err());
}

#[test]
fn whitespace_in_collector_prefix_is_rejected() {
    let dir = TempDir::new().unwrap();
    let path = write_config(
        &dir,
        r#"
[agent]
metric_prefix = "host1"
[[collectors]]
kind = "cpu"
prefix = "cpu stats"
"#,
    );
    assert!(AgentConfig::load(&path).is_err());
}

#[test]
fn expanded_hostname_is_path_safe() {
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, "[agent]\nmetric_prefix = \"$HOSTNAME\"\n");

    let config = AgentConfig::load(&path).unwrap();
    assert!(!config.agent.metric_prefix.chars().any(char::is_whitespace));
}

#[test]
fn missing_config_file_is_an_error() {
    assert!(AgentConfig::load("/nonexistent/statsrelay.toml").is_err());
}

struct FakeCollector {
    enabled: bool,
    interval: Duration,
    polls: Arc<AtomicUsize>,
}

impl Collector for FakeCollector {
    fn name(&self) -> &str {
        "fake"
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn interval(&self) -> Duration {
        self.interval
    }

    fn collect(&mut self) -> anyhow::Result<Vec<Metric>> {
        self.polls.fetch_add(1, Ordering::SeqCst);
        let metric = Metric::new("value", 1.0, Utc::now()).unwrap();
        Ok(vec![metric])
    }
}

#[tokio::test]
async fn disabled_collector_never_polls() {
    let dir = TempDir::new().unwrap();
    let buffer = Arc::new(MetricBuffer::open(dir.path().join("fake.buf")).unwrap());
    let polls = Arc::new(AtomicUsize::new(0));

    let runner = CollectorRunner::new(
        Box::new(FakeCollector {
            enabled: false,
            interval: Duration::from_secs(1),
            polls: polls.clone(),
        }),
        buffer,
        "host1.fake".to_string(),
    );
    let (_tx, rx) = watch::channel(false);
    runner.spawn(rx).await.unwrap();

    assert_eq!(polls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn runner_prefixes_and_appends() {
    let dir = TempDir::new().unwrap();
    let buffer = Arc::new(MetricBuffer::open(dir.path().join("fake.buf")).unwrap());
    let polls = Arc::new(AtomicUsize::new(0));

    let runner = CollectorRunner::new(
        Box::new(FakeCollector {
            enabled: true,
            interval: Duration::from_secs(3600),
            polls: polls.clone(),
        }),
        buffer.clone(),
        "host1.fake".to_string(),
    );
    let (tx, rx) = watch::channel(false);
    let handle = runner.spawn(rx);

    // One poll happens immediately; the long interval keeps it at one.
    while polls.load(Ordering::SeqCst) == 0 {
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    tx.send(true).unwrap();
    handle.await.unwrap();

    assert_eq!(polls.load(Ordering::SeqCst), 1);
    let captured = buffer.capture().unwrap();
    assert_eq!(captured.lines.len(), 1);
    assert!(captured.lines[0].starts_with("host1.fake.value 1 "));
}

#[tokio::test]
async fn runner_repolls_on_its_interval() {
    let dir = TempDir::new().unwrap();
    let buffer = Arc::new(MetricBuffer::open(dir.path().join("fake.buf")).unwrap());
    let polls = Arc::new(AtomicUsize::new(0));

    let runner = CollectorRunner::new(
        Box::new(FakeCollector {
            enabled: true,
            interval: Duration::from_millis(5),
            polls: polls.clone(),
        }),
        buffer.clone(),
        "host1.fake".to_string(),
    );
    let (tx, rx) = watch::channel(false);
    let handle = runner.spawn(rx);

    while polls.load(Ordering::SeqCst) < 3 {
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    tx.send(true).unwrap();
    handle.await.unwrap();

    assert!(polls.load(Ordering::SeqCst) >= 3);
    assert!(buffer.capture().unwrap().lines.len() >= 3);
}

/// A collector whose poll takes longer than its interval.
struct SlowCollector {
    interval: Duration,
    poll_duration: Duration,
    polls: Arc<AtomicUsize>,
}

impl Collector for SlowCollector {
    fn name(&self) -> &str {
        "slow"
    }

    fn is_enabled(&self) -> bool {
        true
    }

    fn interval(&self) -> Duration {
        self.interval
    }

    fn collect(&mut self) -> anyhow::Result<Vec<Metric>> {
        std::thread::sleep(self.poll_duration);
        self.polls.fetch_add(1, Ordering::SeqCst);
        Ok(Vec::new())
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn overrun_cycle_repolls_without_extra_delay() {
    let dir = TempDir::new().unwrap();
    let buffer = Arc::new(MetricBuffer::open(dir.path().join("slow.buf")).unwrap());
    let polls = Arc::new(AtomicUsize::new(0));

    // Every poll overruns the interval; the loop must keep re-polling
    // back to back instead of waiting out full intervals.
    let runner = CollectorRunner::new(
        Box::new(SlowCollector {
            interval: Duration::from_millis(1),
            poll_duration: Duration::from_millis(30),
            polls: polls.clone(),
        }),
        buffer,
        "host1.slow".to_string(),
    );
    let (tx, rx) = watch::channel(false);
    let handle = runner.spawn(rx);

    let deadline = std::time::Instant::now() + Duration::from_secs(5);
    while polls.load(Ordering::SeqCst) < 3 {
        assert!(std::time::Instant::now() < deadline, "re-poll stalled");
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    tx.send(true).unwrap();
    handle.await.unwrap();
}

#[tokio::test]
async fn shutdown_set_before_start_stops_without_polling() {
    let dir = TempDir::new().unwrap();
    let buffer = Arc::new(MetricBuffer::open(dir.path().join("fake.buf")).unwrap());
    let polls = Arc::new(AtomicUsize::new(0));

    let runner = CollectorRunner::new(
        Box::new(FakeCollector {
            enabled: true,
            interval: Duration::from_secs(1),
            polls: polls.clone(),
        }),
        buffer,
        "host1.fake".to_string(),
    );
    let (tx, rx) = watch::channel(false);
    tx.send(true).unwrap();
    runner.spawn(rx).await.unwrap();

    assert_eq!(polls.load(Ordering::SeqCst), 0);
}
