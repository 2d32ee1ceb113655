use crate::Collector;
use anyhow::Result;
use chrono::Utc;
use statsrelay_common::types::Metric;
use std::time::Duration;
use sysinfo::System;

pub struct CpuCollector {
    enabled: bool,
    interval: Duration,
    system: System,
}

impl CpuCollector {
    pub fn new(enabled: bool, interval: Duration) -> Self {
        let mut system = System::new();
        system.refresh_cpu_all();
        Self {
            enabled,
            interval,
            system,
        }
    }
}

impl Collector for CpuCollector {
    fn name(&self) -> &str {
        "cpu"
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn interval(&self) -> Duration {
        self.interval
    }

    fn collect(&mut self) -> Result<Vec<Metric>> {
        self.system.refresh_cpu_all();
        let now = Utc::now();
        let mut metrics = Vec::new();

        metrics.extend(Metric::new(
            "usage_percent",
            self.system.global_cpu_usage() as f64,
            now,
        ));

        for (i, cpu) in self.system.cpus().iter().enumerate() {
            metrics.extend(Metric::new(
                format!("core.{i}.usage_percent"),
                cpu.cpu_usage() as f64,
                now,
            ));
        }

        Ok(metrics)
    }
}
