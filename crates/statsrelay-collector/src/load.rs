use crate::Collector;
use anyhow::Result;
use chrono::Utc;
use statsrelay_common::types::Metric;
use std::time::Duration;
use sysinfo::System;

pub struct LoadCollector {
    enabled: bool,
    interval: Duration,
}

impl LoadCollector {
    pub fn new(enabled: bool, interval: Duration) -> Self {
        Self { enabled, interval }
    }
}

impl Collector for LoadCollector {
    fn name(&self) -> &str {
        "load"
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn interval(&self) -> Duration {
        self.interval
    }

    fn collect(&mut self) -> Result<Vec<Metric>> {
        let now = Utc::now();
        let load_avg = System::load_average();
        let uptime = System::uptime();

        let metrics = [
            Metric::new("load_1", load_avg.one, now),
            Metric::new("load_5", load_avg.five, now),
            Metric::new("load_15", load_avg.fifteen, now),
            Metric::new("uptime_seconds", uptime as f64, now),
        ]
        .into_iter()
        .flatten()
        .collect();

        Ok(metrics)
    }
}
