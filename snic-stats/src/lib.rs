mod spec;
mod tree;

pub use spec::{
    BlockSpec, ConvertMetricFn, DomainSpec, LatchFn, MetricFlags, MetricSpec, MetricType,
    ReadMetricFn, ReleaseMetricsFn, ZoneSpec,
};
pub use tree::{Block, Domain, MetricSample, StatsTree, Zone};

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::Arc;

    fn counter_block(counter: Arc<AtomicU64>) -> BlockSpec {
        BlockSpec {
            name: "rx",
            metrics: vec![MetricSpec::scalar(
                "packets",
                MetricType::Counter,
                MetricFlags::CLEAR_ON_READ,
            )],
            latch_data_size: 0,
            latch_metrics: None,
            read_metric: Box::new(move |_scratch, _index, _n, out| {
                out[0] = counter.load(Ordering::SeqCst);
            }),
            convert_metric: None,
            release_metrics: Some(Box::new(move || {})),
        }
    }

    #[test]
    fn latch_reads_current_hardware_value() {
        let counter = Arc::new(AtomicU64::new(0));
        let tree = StatsTree::new();
        tree.register_domain(DomainSpec {
            name: "port0",
            zones: vec![ZoneSpec {
                name: "cmac",
                blocks: vec![counter_block(counter.clone())],
            }],
        });

        counter.store(42, Ordering::SeqCst);
        tree.latch_domain("port0");

        let mut seen = Vec::new();
        tree.for_each_metric(
            Some("port0"),
            None,
            |_| true,
            |sample| seen.push(sample.values.clone()),
        );
        assert_eq!(seen, vec![vec![42]]);
    }

    #[test]
    fn clear_on_read_metric_zeroes_after_explicit_clear() {
        let counter = Arc::new(AtomicU64::new(7));
        let tree = StatsTree::new();
        tree.register_domain(DomainSpec {
            name: "port0",
            zones: vec![ZoneSpec {
                name: "cmac",
                blocks: vec![counter_block(counter.clone())],
            }],
        });

        tree.latch_domain("port0");
        tree.clear_zone(Some("port0"), "cmac");

        let mut seen = Vec::new();
        tree.for_each_metric(
            Some("port0"),
            None,
            |_| true,
            |sample| seen.push(sample.values.clone()),
        );
        assert_eq!(seen, vec![vec![0]]);
    }

    #[test]
    fn clear_on_read_metric_resets_without_an_explicit_clear_call() {
        let counter = Arc::new(AtomicU64::new(7));
        let release_counter = counter.clone();
        let block = BlockSpec {
            name: "rx",
            metrics: vec![MetricSpec::scalar(
                "packets",
                MetricType::Counter,
                MetricFlags::CLEAR_ON_READ,
            )],
            latch_data_size: 0,
            latch_metrics: None,
            read_metric: {
                let counter = counter.clone();
                Box::new(move |_scratch, _index, _n, out| out[0] = counter.load(Ordering::SeqCst))
            },
            convert_metric: None,
            release_metrics: Some(Box::new(move || release_counter.store(0, Ordering::SeqCst))),
        };

        let tree = StatsTree::new();
        tree.register_domain(DomainSpec {
            name: "port0",
            zones: vec![ZoneSpec {
                name: "cmac",
                blocks: vec![block],
            }],
        });

        tree.latch_domain("port0");
        let mut first = Vec::new();
        tree.for_each_metric(Some("port0"), None, |_| true, |sample| first.push(sample.values.clone()));
        assert_eq!(first, vec![vec![7]]);

        tree.latch_domain("port0");
        let mut second = Vec::new();
        tree.for_each_metric(Some("port0"), None, |_| true, |sample| second.push(sample.values.clone()));
        assert_eq!(second, vec![vec![0]]);
    }

    #[test]
    fn never_clear_metric_survives_clear_zone() {
        let counter = Arc::new(AtomicU64::new(99));
        let block = BlockSpec {
            name: "uptime",
            metrics: vec![MetricSpec::scalar(
                "seconds",
                MetricType::Gauge,
                MetricFlags::NEVER_CLEAR,
            )],
            latch_data_size: 0,
            latch_metrics: None,
            read_metric: {
                let counter = counter.clone();
                Box::new(move |_scratch, _index, _n, out| out[0] = counter.load(Ordering::SeqCst))
            },
            convert_metric: None,
            release_metrics: None,
        };

        let tree = StatsTree::new();
        tree.register_domain(DomainSpec {
            name: "server",
            zones: vec![ZoneSpec {
                name: "lifecycle",
                blocks: vec![block],
            }],
        });

        tree.latch_domain("server");
        tree.clear_zone(Some("server"), "lifecycle");

        let mut seen = Vec::new();
        tree.for_each_metric(None, None, |_| true, |sample| seen.push(sample.values.clone()));
        assert_eq!(seen, vec![vec![99]]);
    }

    #[test]
    fn for_each_metric_filter_excludes_nonmatching_samples() {
        let counter = Arc::new(AtomicU64::new(1));
        let tree = StatsTree::new();
        tree.register_domain(DomainSpec {
            name: "port0",
            zones: vec![ZoneSpec {
                name: "cmac",
                blocks: vec![counter_block(counter)],
            }],
        });
        tree.latch_domain("port0");

        let mut seen = 0;
        tree.for_each_metric(
            Some("port0"),
            None,
            |sample| sample.metric == "nonexistent",
            |_| seen += 1,
        );
        assert_eq!(seen, 0);
    }

    #[test]
    fn array_metric_reports_one_value_per_element() {
        let block = BlockSpec {
            name: "queues",
            metrics: vec![MetricSpec::array(
                "descriptors",
                MetricType::Gauge,
                MetricFlags::empty(),
                4,
            )],
            latch_data_size: 0,
            latch_metrics: None,
            read_metric: Box::new(|_scratch, _index, n, out| {
                for (i, slot) in out.iter_mut().enumerate().take(n) {
                    *slot = i as u64;
                }
            }),
            convert_metric: None,
            release_metrics: None,
        };

        let tree = StatsTree::new();
        tree.register_domain(DomainSpec {
            name: "host0",
            zones: vec![ZoneSpec {
                name: "qdma",
                blocks: vec![block],
            }],
        });
        tree.latch_domain("host0");

        let mut seen = Vec::new();
        tree.for_each_metric(None, None, |_| true, |sample| seen.push(sample.values.clone()));
        assert_eq!(seen, vec![vec![0, 1, 2, 3]]);
    }
}
