use bitflags::bitflags;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricType {
    Counter,
    Gauge,
    Flag,
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct MetricFlags: u32 {
        /// `nelements > 1`; `read_metric` fills every element in one call.
        const ARRAY = 1 << 0;
        /// Value must read as zero on the next latch (hardware read-to-clear).
        const CLEAR_ON_READ = 1 << 1;
        /// Exempt from explicit `clear` operations (e.g. cumulative uptime).
        const NEVER_CLEAR = 1 << 2;
    }
}

/// Static description of one metric, as registered at init time.
#[derive(Debug, Clone)]
pub struct MetricSpec {
    pub name: &'static str,
    pub kind: MetricType,
    pub flags: MetricFlags,
    pub nelements: usize,
    pub labels: Vec<(&'static str, String)>,
}

impl MetricSpec {
    pub fn scalar(name: &'static str, kind: MetricType, flags: MetricFlags) -> Self {
        MetricSpec {
            name,
            kind,
            flags,
            nelements: 1,
            labels: Vec::new(),
        }
    }

    pub fn array(name: &'static str, kind: MetricType, flags: MetricFlags, nelements: usize) -> Self {
        MetricSpec {
            name,
            kind,
            flags: flags | MetricFlags::ARRAY,
            nelements,
            labels: Vec::new(),
        }
    }

    pub fn with_label(mut self, key: &'static str, value: impl Into<String>) -> Self {
        self.labels.push((key, value.into()));
        self
    }
}

/// Captures raw hardware state into a caller-allocated scratch buffer.
pub type LatchFn = dyn Fn(&mut [u8]) + Send + Sync;
/// Fills `out` (one entry per declared element) from the latched scratch
/// buffer for the metric at `metric_index` within the block's declared
/// metric list, so one block can host several differently-shaped metrics
/// (e.g. packets and bytes) over the same scratch buffer.
pub type ReadMetricFn = dyn Fn(&[u8], usize, usize, &mut [u64]) + Send + Sync;
/// Produces the `f64` companion value for a single raw sample.
pub type ConvertMetricFn = dyn Fn(u64) -> f64 + Send + Sync;
/// Clears a block's underlying hardware counters: invoked by `clear_zone`,
/// and automatically after latching a block with any `CLEAR_ON_READ` metric.
pub type ReleaseMetricsFn = dyn Fn() + Send + Sync;

pub struct BlockSpec {
    pub name: &'static str,
    pub metrics: Vec<MetricSpec>,
    pub latch_data_size: usize,
    pub latch_metrics: Option<Box<LatchFn>>,
    pub read_metric: Box<ReadMetricFn>,
    pub convert_metric: Option<Box<ConvertMetricFn>>,
    pub release_metrics: Option<Box<ReleaseMetricsFn>>,
}

pub struct ZoneSpec {
    pub name: &'static str,
    pub blocks: Vec<BlockSpec>,
}

pub struct DomainSpec {
    pub name: &'static str,
    pub zones: Vec<ZoneSpec>,
}
