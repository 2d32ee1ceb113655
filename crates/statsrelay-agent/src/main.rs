mod config;
mod runner;

#[cfg(test)]
mod tests;

use anyhow::Result;
use config::{AgentConfig, CollectorKind};
use runner::CollectorRunner;
use statsrelay_buffer::MetricBuffer;
use statsrelay_collector::cpu::CpuCollector;
use statsrelay_collector::disk::DiskCollector;
use statsrelay_collector::load::LoadCollector;
use statsrelay_collector::memory::MemoryCollector;
use statsrelay_collector::network::NetworkCollector;
use statsrelay_collector::Collector;
use statsrelay_output::dispatcher::Dispatcher;
use statsrelay_output::graphite::GraphiteSink;
use statsrelay_output::opentsdb_http::OpenTsdbHttpSink;
use statsrelay_output::opentsdb_telnet::OpenTsdbTelnetSink;
use statsrelay_output::OutputSink;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tokio::sync::watch;
use tracing_subscriber::EnvFilter;

fn build_collector(kind: CollectorKind, enabled: bool, interval: Duration) -> Box<dyn Collector> {
    match kind {
        CollectorKind::Cpu => Box::new(CpuCollector::new(enabled, interval)),
        CollectorKind::Memory => Box::new(MemoryCollector::new(enabled, interval)),
        CollectorKind::Disk => Box::new(DiskCollector::new(enabled, interval)),
        CollectorKind::Network => Box::new(NetworkCollector::new(enabled, interval)),
        CollectorKind::Load => Box::new(LoadCollector::new(enabled, interval)),
    }
}

fn build_sinks(config: &AgentConfig) -> Vec<Arc<dyn OutputSink>> {
    let mut sinks: Vec<Arc<dyn OutputSink>> = Vec::new();
    for sink in &config.sinks.graphite {
        sinks.push(Arc::new(GraphiteSink::new(sink.clone())));
    }
    for sink in &config.sinks.opentsdb_telnet {
        sinks.push(Arc::new(OpenTsdbTelnetSink::new(sink.clone())));
    }
    for sink in &config.sinks.opentsdb_http {
        sinks.push(Arc::new(OpenTsdbHttpSink::new(sink.clone())));
    }
    sinks
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("statsrelay=info".parse()?))
        .init();

    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config/statsrelay.toml".to_string());

    // Configuration problems are the only fatal errors; everything after
    // this point degrades to log-and-continue.
    let config = AgentConfig::load(&config_path)?;
    tracing::info!(
        metric_prefix = %config.agent.metric_prefix,
        collectors = config.collectors.len(),
        sinks = config.sink_count(),
        "statsrelay starting"
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let mut tasks = Vec::new();
    let mut buffers = Vec::new();

    for collector_config in &config.collectors {
        if !collector_config.enabled {
            tracing::info!(collector = collector_config.prefix(), "Collector disabled");
            continue;
        }
        let interval = Duration::from_secs(collector_config.interval_secs);
        let collector = build_collector(collector_config.kind, true, interval);

        let buffer_path = config
            .agent
            .buffer_dir
            .join(format!("{}.buf", collector_config.prefix()));
        let buffer = Arc::new(MetricBuffer::open(buffer_path)?);
        buffers.push(buffer.clone());

        let prefix = if config.agent.metric_prefix.is_empty() {
            collector_config.prefix().to_string()
        } else {
            format!("{}.{}", config.agent.metric_prefix, collector_config.prefix())
        };

        let runner = CollectorRunner::new(collector, buffer, prefix);
        tasks.push(runner.spawn(shutdown_rx.clone()));
    }

    let sinks = build_sinks(&config);
    let dispatcher = Arc::new(Dispatcher::new(
        buffers,
        sinks,
        Duration::from_secs(config.agent.max_metric_age_secs),
        Duration::from_secs(config.agent.check_buffers_interval_secs),
        config.agent.always_check_buffers,
    ));
    tasks.push({
        let dispatcher = dispatcher.clone();
        let shutdown_rx = shutdown_rx.clone();
        tokio::spawn(async move { dispatcher.run(shutdown_rx).await })
    });

    signal::ctrl_c().await?;
    tracing::info!("Shutting down gracefully");
    let _ = shutdown_tx.send(true);

    for task in tasks {
        let _ = task.await;
    }

    Ok(())
}
