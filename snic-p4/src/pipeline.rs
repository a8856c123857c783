use std::sync::{Arc, Mutex};

use snic_stats::{BlockSpec, DomainSpec, MetricFlags, MetricSpec, MetricType, StatsTree, ZoneSpec};

use crate::facade::PipelineFacade;
use crate::model::CounterKind;

/// Registers the two stats zones a pipeline needs: per-pipeline user
/// counters and per-table ECC counters. Call once per present pipeline
/// at init, after `PipelineFacade::init` and `reset_all_tables`.
pub fn register_pipeline_stats(tree: &StatsTree, domain_name: &'static str, facade: Arc<Mutex<PipelineFacade>>) {
    let info = facade.lock().unwrap().info.clone();
    let pipeline_name = info.name.clone();

    let mut counters_blocks = Vec::new();
    for block in &info.counter_blocks {
        counters_blocks.push(counter_block_spec(facade.clone(), &pipeline_name, block));
    }

    let mut ecc_blocks = Vec::new();
    for table in info.tables.iter().filter(|t| t.mode.has_ecc_counters()) {
        ecc_blocks.push(table_ecc_block_spec(facade.clone(), &pipeline_name, table));
    }

    tree.register_domain(DomainSpec {
        name: domain_name,
        zones: vec![
            ZoneSpec { name: "counters", blocks: counters_blocks },
            ZoneSpec { name: "table_ecc", blocks: ecc_blocks },
        ],
    });
}

fn counter_block_spec(
    facade: Arc<Mutex<PipelineFacade>>,
    pipeline_name: &str,
    block: &crate::model::CounterBlock,
) -> BlockSpec {
    let num_counters = block.num_counters as usize;
    let kind = block.kind;
    let block_name: &'static str = Box::leak(block.name.clone().into_boxed_str());
    let label_pipeline = pipeline_name.to_string();

    let latch_facade = facade.clone();
    let latch_block_name = block.name.clone();
    let latch_data_size = match kind {
        CounterKind::PacketsAndBytes => num_counters * 16,
        _ => num_counters * 8,
    };

    let latch_metrics: Box<snic_stats::LatchFn> = Box::new(move |scratch: &mut [u8]| {
        let facade = latch_facade.lock().unwrap();
        match kind {
            CounterKind::PacketsAndBytes => {
                let mut buf = vec![(0u64, 0u64); num_counters];
                facade.block_combo_read(&latch_block_name, &mut buf);
                for (i, (packets, bytes)) in buf.into_iter().enumerate() {
                    scratch[i * 16..i * 16 + 8].copy_from_slice(&packets.to_le_bytes());
                    scratch[i * 16 + 8..i * 16 + 16].copy_from_slice(&bytes.to_le_bytes());
                }
            }
            _ => {
                let mut buf = vec![0u64; num_counters];
                facade.block_simple_read(&latch_block_name, &mut buf);
                for (i, v) in buf.into_iter().enumerate() {
                    scratch[i * 8..i * 8 + 8].copy_from_slice(&v.to_le_bytes());
                }
            }
        }
    });

    let read_metric: Box<snic_stats::ReadMetricFn> = Box::new(move |scratch, metric_index, n, out| {
        match kind {
            CounterKind::PacketsAndBytes => {
                let byte_offset = if metric_index == 0 { 0 } else { 8 };
                for i in 0..n {
                    let base = i * 16 + byte_offset;
                    out[i] = u64::from_le_bytes(scratch[base..base + 8].try_into().unwrap());
                }
            }
            _ => {
                for i in 0..n {
                    let base = i * 8;
                    out[i] = u64::from_le_bytes(scratch[base..base + 8].try_into().unwrap());
                }
            }
        }
    });

    let metrics = match kind {
        CounterKind::Packets => vec![MetricSpec::array(
            "packets",
            MetricType::Counter,
            MetricFlags::CLEAR_ON_READ,
            num_counters,
        )
        .with_label("pipeline", label_pipeline)],
        CounterKind::Bytes => vec![MetricSpec::array(
            "bytes",
            MetricType::Counter,
            MetricFlags::CLEAR_ON_READ,
            num_counters,
        )
        .with_label("pipeline", label_pipeline)],
        CounterKind::PacketsAndBytes => vec![
            MetricSpec::array("packets", MetricType::Counter, MetricFlags::CLEAR_ON_READ, num_counters)
                .with_label("pipeline", label_pipeline.clone()),
            MetricSpec::array("bytes", MetricType::Counter, MetricFlags::CLEAR_ON_READ, num_counters)
                .with_label("pipeline", label_pipeline),
        ],
        CounterKind::Flag => vec![MetricSpec::array(
            "flag",
            MetricType::Flag,
            MetricFlags::CLEAR_ON_READ,
            num_counters,
        )
        .with_label("pipeline", label_pipeline)],
    };

    let release_facade = facade.clone();
    let release_block_name = block.name.clone();
    let release_metrics: Box<snic_stats::ReleaseMetricsFn> = Box::new(move || {
        release_facade.lock().unwrap().block_reset(&release_block_name);
    });

    BlockSpec {
        name: block_name,
        metrics,
        latch_data_size,
        latch_metrics: Some(latch_metrics),
        read_metric,
        convert_metric: None,
        release_metrics: Some(release_metrics),
    }
}

fn table_ecc_block_spec(
    facade: Arc<Mutex<PipelineFacade>>,
    pipeline_name: &str,
    table: &crate::model::Table,
) -> BlockSpec {
    let block_name: &'static str = Box::leak(table.name.clone().into_boxed_str());
    let table_name = table.name.clone();
    let mode = table.mode.as_str();
    let label_pipeline = pipeline_name.to_string();

    let latch_facade = facade.clone();
    let latch_table_name = table_name.clone();
    let latch_metrics: Box<snic_stats::LatchFn> = Box::new(move |scratch: &mut [u8]| {
        let facade = latch_facade.lock().unwrap();
        let (corrected, detected) = facade.table_ecc_counters(&latch_table_name).unwrap_or((0, 0));
        scratch[0..4].copy_from_slice(&corrected.to_le_bytes());
        scratch[4..8].copy_from_slice(&detected.to_le_bytes());
    });

    let read_metric: Box<snic_stats::ReadMetricFn> = Box::new(move |scratch, metric_index, _n, out| {
        let base = metric_index * 4;
        out[0] = u32::from_le_bytes(scratch[base..base + 4].try_into().unwrap()) as u64;
    });

    let release_facade = facade.clone();
    let release_table_name = table_name.clone();
    let release_metrics: Box<snic_stats::ReleaseMetricsFn> = Box::new(move || {
        release_facade.lock().unwrap().reset_table_ecc_counters(&release_table_name);
    });

    BlockSpec {
        name: block_name,
        metrics: vec![
            MetricSpec::scalar("corrected_single_bit_errors", MetricType::Counter, MetricFlags::CLEAR_ON_READ)
                .with_label("pipeline", label_pipeline.clone())
                .with_label("mode", mode),
            MetricSpec::scalar("detected_double_bit_errors", MetricType::Counter, MetricFlags::CLEAR_ON_READ)
                .with_label("pipeline", label_pipeline)
                .with_label("mode", mode),
        ],
        latch_data_size: 8,
        latch_metrics: Some(latch_metrics),
        read_metric,
        convert_metric: None,
        release_metrics: Some(release_metrics),
    }
}
