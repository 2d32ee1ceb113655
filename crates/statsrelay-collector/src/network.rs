use crate::Collector;
use anyhow::Result;
use chrono::Utc;
use statsrelay_common::sanitize::sanitize_path;
use statsrelay_common::types::Metric;
use std::collections::HashMap;
use std::time::Duration;
use sysinfo::Networks;

pub struct NetworkCollector {
    enabled: bool,
    interval: Duration,
    networks: Networks,
    prev_received: HashMap<String, u64>,
    prev_transmitted: HashMap<String, u64>,
    prev_packets_received: HashMap<String, u64>,
    prev_packets_transmitted: HashMap<String, u64>,
}

impl NetworkCollector {
    pub fn new(enabled: bool, interval: Duration) -> Self {
        Self {
            enabled,
            interval,
            networks: Networks::new_with_refreshed_list(),
            prev_received: HashMap::new(),
            prev_transmitted: HashMap::new(),
            prev_packets_received: HashMap::new(),
            prev_packets_transmitted: HashMap::new(),
        }
    }
}

impl Collector for NetworkCollector {
    fn name(&self) -> &str {
        "network"
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn interval(&self) -> Duration {
        self.interval
    }

    fn collect(&mut self) -> Result<Vec<Metric>> {
        self.networks.refresh();
        let now = Utc::now();
        let mut metrics = Vec::new();

        for (name, data) in self.networks.iter() {
            let iface = sanitize_path(name);
            if iface.is_empty() {
                continue;
            }

            let received = data.total_received();
            let transmitted = data.total_transmitted();
            let packets_received = data.total_packets_received();
            let packets_transmitted = data.total_packets_transmitted();

            // Deltas since the previous cycle; first cycle reports zero.
            let rx_delta =
                received.saturating_sub(*self.prev_received.get(name).unwrap_or(&received));
            let tx_delta = transmitted
                .saturating_sub(*self.prev_transmitted.get(name).unwrap_or(&transmitted));
            let prx_delta = packets_received.saturating_sub(
                *self
                    .prev_packets_received
                    .get(name)
                    .unwrap_or(&packets_received),
            );
            let ptx_delta = packets_transmitted.saturating_sub(
                *self
                    .prev_packets_transmitted
                    .get(name)
                    .unwrap_or(&packets_transmitted),
            );

            self.prev_received.insert(name.clone(), received);
            self.prev_transmitted.insert(name.clone(), transmitted);
            self.prev_packets_received
                .insert(name.clone(), packets_received);
            self.prev_packets_transmitted
                .insert(name.clone(), packets_transmitted);

            metrics.extend(Metric::new(
                format!("{iface}.bytes_recv"),
                rx_delta as f64,
                now,
            ));
            metrics.extend(Metric::new(
                format!("{iface}.bytes_sent"),
                tx_delta as f64,
                now,
            ));
            metrics.extend(Metric::new(
                format!("{iface}.packets_recv"),
                prx_delta as f64,
                now,
            ));
            metrics.extend(Metric::new(
                format!("{iface}.packets_sent"),
                ptx_delta as f64,
                now,
            ));
        }

        Ok(metrics)
    }
}
