use crate::Collector;
use anyhow::Result;
use chrono::Utc;
use statsrelay_common::types::Metric;
use std::time::Duration;
use sysinfo::System;

pub struct MemoryCollector {
    enabled: bool,
    interval: Duration,
    system: System,
}

impl MemoryCollector {
    pub fn new(enabled: bool, interval: Duration) -> Self {
        Self {
            enabled,
            interval,
            system: System::new(),
        }
    }
}

impl Collector for MemoryCollector {
    fn name(&self) -> &str {
        "memory"
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn interval(&self) -> Duration {
        self.interval
    }

    fn collect(&mut self) -> Result<Vec<Metric>> {
        self.system.refresh_memory();
        let now = Utc::now();
        let mut metrics = Vec::new();

        let total = self.system.total_memory();
        let used = self.system.used_memory();
        let available = self.system.available_memory();
        let usage_pct = if total > 0 {
            (used as f64 / total as f64) * 100.0
        } else {
            0.0
        };

        metrics.extend(Metric::new("total_bytes", total as f64, now));
        metrics.extend(Metric::new("used_bytes", used as f64, now));
        metrics.extend(Metric::new("available_bytes", available as f64, now));
        metrics.extend(Metric::new("used_percent", usage_pct, now));

        let swap_total = self.system.total_swap();
        let swap_used = self.system.used_swap();
        let swap_pct = if swap_total > 0 {
            (swap_used as f64 / swap_total as f64) * 100.0
        } else {
            0.0
        };

        metrics.extend(Metric::new("swap.total_bytes", swap_total as f64, now));
        metrics.extend(Metric::new("swap.used_bytes", swap_used as f64, now));
        metrics.extend(Metric::new("swap.used_percent", swap_pct, now));

        Ok(metrics)
    }
}
