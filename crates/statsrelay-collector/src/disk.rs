use crate::Collector;
use anyhow::Result;
use chrono::Utc;
use statsrelay_common::sanitize::sanitize_path;
use statsrelay_common::types::Metric;
use std::time::Duration;
use sysinfo::Disks;

pub struct DiskCollector {
    enabled: bool,
    interval: Duration,
    disks: Disks,
}

impl DiskCollector {
    pub fn new(enabled: bool, interval: Duration) -> Self {
        Self {
            enabled,
            interval,
            disks: Disks::new_with_refreshed_list(),
        }
    }
}

impl Collector for DiskCollector {
    fn name(&self) -> &str {
        "disk"
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn interval(&self) -> Duration {
        self.interval
    }

    fn collect(&mut self) -> Result<Vec<Metric>> {
        self.disks.refresh();
        let now = Utc::now();
        let mut metrics = Vec::new();

        for disk in self.disks.iter() {
            let mount = sanitize_path(&disk.mount_point().to_string_lossy().replace('/', "_"));
            let mount = if mount.is_empty() {
                "root".to_string()
            } else {
                mount
            };

            let total = disk.total_space();
            let available = disk.available_space();
            let used = total.saturating_sub(available);
            let usage_pct = if total > 0 {
                (used as f64 / total as f64) * 100.0
            } else {
                0.0
            };

            metrics.extend(Metric::new(format!("{mount}.total_bytes"), total as f64, now));
            metrics.extend(Metric::new(format!("{mount}.used_bytes"), used as f64, now));
            metrics.extend(Metric::new(
                format!("{mount}.available_bytes"),
                available as f64,
                now,
            ));
            metrics.extend(Metric::new(format!("{mount}.used_percent"), usage_pct, now));
        }

        Ok(metrics)
    }
}
