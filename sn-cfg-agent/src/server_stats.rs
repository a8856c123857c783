use std::time::Instant;

use snic_stats::{BlockSpec, DomainSpec, MetricFlags, MetricSpec, MetricType, StatsTree, ZoneSpec};

/// `start_time`/`up_time`, exposed via `GetServerStatus`. Both `NEVER_CLEAR`:
/// they describe the process's own lifetime, not a device counter.
pub struct ServerClock {
    pub start_unix_seconds: u64,
    start_instant: Instant,
}

impl ServerClock {
    pub fn now() -> Self {
        let start_unix_seconds = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        ServerClock { start_unix_seconds, start_instant: Instant::now() }
    }

    pub fn up_time_seconds(&self) -> u64 {
        self.start_instant.elapsed().as_secs()
    }
}

pub fn register(tree: &StatsTree, domain_name: &'static str, clock: std::sync::Arc<ServerClock>) {
    let latch_clock = clock.clone();
    let latch_metrics = move |scratch: &mut [u8]| {
        scratch[0..8].copy_from_slice(&latch_clock.start_unix_seconds.to_le_bytes());
        scratch[8..16].copy_from_slice(&latch_clock.up_time_seconds().to_le_bytes());
    };

    let read_metric = |scratch: &[u8], index: usize, _n: usize, out: &mut [u64]| {
        let offset = index * 8;
        out[0] = u64::from_le_bytes(scratch[offset..offset + 8].try_into().unwrap());
    };

    let block = BlockSpec {
        name: "status",
        metrics: vec![
            MetricSpec::scalar("start_time_sec", MetricType::Gauge, MetricFlags::NEVER_CLEAR),
            MetricSpec::scalar("up_time_sec", MetricType::Gauge, MetricFlags::NEVER_CLEAR),
        ],
        latch_data_size: 16,
        latch_metrics: Some(Box::new(latch_metrics)),
        read_metric: Box::new(read_metric),
        convert_metric: None,
        release_metrics: None,
    };

    tree.register_domain(DomainSpec {
        name: domain_name,
        zones: vec![ZoneSpec { name: "server", blocks: vec![block] }],
    });
}
