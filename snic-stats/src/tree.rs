use std::sync::{Mutex, RwLock};
use std::time::Instant;

use crate::spec::{BlockSpec, DomainSpec, MetricFlags, MetricSpec, ZoneSpec};

struct MetricState {
    spec: MetricSpec,
    values: Mutex<Vec<u64>>,
    converted: Mutex<Vec<f64>>,
    last_update: Mutex<Option<Instant>>,
}

pub struct Block {
    pub name: &'static str,
    metrics: Vec<MetricState>,
    scratch: Mutex<Vec<u8>>,
    latch_data_size: usize,
    latch_metrics: Option<Box<crate::spec::LatchFn>>,
    read_metric: Box<crate::spec::ReadMetricFn>,
    convert_metric: Option<Box<crate::spec::ConvertMetricFn>>,
    release_metrics: Option<Box<crate::spec::ReleaseMetricsFn>>,
}

pub struct Zone {
    pub name: &'static str,
    pub blocks: Vec<Block>,
}

pub struct Domain {
    pub name: &'static str,
    pub zones: Vec<Zone>,
}

/// The immutable-in-shape stats tree: `Domain -> Zone -> Block -> Metric`.
///
/// Built once at init from a list of [`DomainSpec`]s; thereafter only the
/// metric values mutate, under per-metric locks.
pub struct StatsTree {
    domains: RwLock<Vec<Domain>>,
}

impl Default for StatsTree {
    fn default() -> Self {
        Self::new()
    }
}

impl StatsTree {
    pub fn new() -> Self {
        StatsTree {
            domains: RwLock::new(Vec::new()),
        }
    }

    pub fn register_domain(&self, spec: DomainSpec) {
        let domain = Domain {
            name: spec.name,
            zones: spec
                .zones
                .into_iter()
                .map(Self::build_zone)
                .collect(),
        };
        self.domains.write().unwrap().push(domain);
    }

    fn build_zone(spec: ZoneSpec) -> Zone {
        Zone {
            name: spec.name,
            blocks: spec.blocks.into_iter().map(Self::build_block).collect(),
        }
    }

    fn build_block(spec: BlockSpec) -> Block {
        let metrics = spec
            .metrics
            .into_iter()
            .map(|m| {
                let n = m.nelements;
                MetricState {
                    spec: m,
                    values: Mutex::new(vec![0u64; n]),
                    converted: Mutex::new(vec![0f64; n]),
                    last_update: Mutex::new(None),
                }
            })
            .collect();

        Block {
            name: spec.name,
            metrics,
            scratch: Mutex::new(vec![0u8; spec.latch_data_size]),
            latch_data_size: spec.latch_data_size,
            latch_metrics: spec.latch_metrics,
            read_metric: spec.read_metric,
            convert_metric: spec.convert_metric,
            release_metrics: spec.release_metrics,
        }
    }

    /// Latches every block in every zone of `domain_name`.
    pub fn latch_domain(&self, domain_name: &str) {
        let domains = self.domains.read().unwrap();
        for domain in domains.iter().filter(|d| d.name == domain_name) {
            for zone in &domain.zones {
                for block in &zone.blocks {
                    block.latch();
                }
            }
        }
    }

    /// Clears every clearable metric in `zone_name` of `domain_name`
    /// (`domain_name = None` searches every domain).
    pub fn clear_zone(&self, domain_name: Option<&str>, zone_name: &str) {
        let domains = self.domains.read().unwrap();
        for domain in domains
            .iter()
            .filter(|d| domain_name.map(|n| n == d.name).unwrap_or(true))
        {
            for zone in domain.zones.iter().filter(|z| z.name == zone_name) {
                for block in &zone.blocks {
                    block.clear();
                }
            }
        }
    }

    pub fn for_each_metric(
        &self,
        domain_name: Option<&str>,
        zone_name: Option<&str>,
        mut filter: impl FnMut(&MetricSample) -> bool,
        mut visit: impl FnMut(&MetricSample),
    ) {
        let domains = self.domains.read().unwrap();
        for domain in domains
            .iter()
            .filter(|d| domain_name.map(|n| n == d.name).unwrap_or(true))
        {
            for zone in domain
                .zones
                .iter()
                .filter(|z| zone_name.map(|n| n == z.name).unwrap_or(true))
            {
                for block in &zone.blocks {
                    for metric in &block.metrics {
                        let values = metric.values.lock().unwrap().clone();
                        let converted = metric.converted.lock().unwrap().clone();
                        let last_update = *metric.last_update.lock().unwrap();
                        let sample = MetricSample {
                            domain: domain.name,
                            zone: zone.name,
                            block: block.name,
                            metric: metric.spec.name,
                            kind: metric.spec.kind,
                            flags: metric.spec.flags,
                            labels: &metric.spec.labels,
                            values,
                            converted,
                            last_update,
                        };
                        if filter(&sample) {
                            visit(&sample);
                        }
                    }
                }
            }
        }
    }
}

impl Block {
    fn latch(&self) {
        let mut scratch = self.scratch.lock().unwrap();
        if self.latch_data_size > 0 {
            if let Some(latch_metrics) = &self.latch_metrics {
                latch_metrics(&mut scratch);
            }
        }

        let now = Instant::now();
        let mut clear_on_read_present = false;
        for (index, metric) in self.metrics.iter().enumerate() {
            let mut raw = vec![0u64; metric.spec.nelements];
            (self.read_metric)(&scratch, index, metric.spec.nelements, &mut raw);

            if let Some(convert) = &self.convert_metric {
                let mut converted = metric.converted.lock().unwrap();
                converted.clear();
                converted.extend(raw.iter().map(|v| convert(*v)));
            }

            *metric.values.lock().unwrap() = raw;
            *metric.last_update.lock().unwrap() = Some(now);

            if metric.spec.flags.contains(MetricFlags::CLEAR_ON_READ) {
                clear_on_read_present = true;
            }
        }

        // CLEAR_ON_READ metrics are cleared as part of this same latch, not
        // only via an explicit clear RPC, so the values just read reflect
        // this cycle's count and the next latch starts from zero.
        if clear_on_read_present {
            if let Some(release) = &self.release_metrics {
                release();
            }
        }
    }

    fn clear(&self) {
        let has_clearable = self
            .metrics
            .iter()
            .any(|m| !m.spec.flags.contains(MetricFlags::NEVER_CLEAR));
        if !has_clearable {
            return;
        }

        if let Some(release) = &self.release_metrics {
            release();
        }

        for metric in &self.metrics {
            if metric.spec.flags.contains(MetricFlags::NEVER_CLEAR) {
                continue;
            }
            metric.values.lock().unwrap().iter_mut().for_each(|v| *v = 0);
            metric
                .converted
                .lock()
                .unwrap()
                .iter_mut()
                .for_each(|v| *v = 0.0);
        }
    }
}

/// One metric's values as observed during a [`StatsTree::for_each_metric`] walk.
pub struct MetricSample<'a> {
    pub domain: &'static str,
    pub zone: &'static str,
    pub block: &'static str,
    pub metric: &'static str,
    pub kind: crate::spec::MetricType,
    pub flags: MetricFlags,
    pub labels: &'a [(&'static str, String)],
    pub values: Vec<u64>,
    pub converted: Vec<f64>,
    pub last_update: Option<Instant>,
}
