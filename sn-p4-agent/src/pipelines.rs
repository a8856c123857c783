use std::fs;
use std::path::Path;

use serde::Deserialize;
use snic_p4::{
    Action, CounterBlock, CounterKind, Endian, FieldKind, MatchField, ParamSpec, PipelineInfo,
    Table, TableMode,
};

/// On-disk description of the pipeline(s) a device's compiled P4 program
/// presents, in lieu of the vendor-side `sdnet_count`/`sdnet_present`/
/// `snp4_info_get_pipeline` discovery a fuller vendor SDK would provide: the
/// driver this crate binds (`vendor_ffi`) exposes table insert/delete/reset by name but
/// not a schema query, so the schema is supplied out of band instead. Every
/// managed device is assumed to run the same compiled program.
#[derive(Debug, Deserialize)]
struct ConfigFile {
    pipelines: Vec<PipelineDef>,
}

#[derive(Debug, Deserialize)]
struct PipelineDef {
    pipeline_id: i32,
    name: String,
    tables: Vec<TableDef>,
    #[serde(default)]
    counter_blocks: Vec<CounterBlockDef>,
}

#[derive(Debug, Deserialize)]
struct TableDef {
    name: String,
    mode: String,
    endian: String,
    num_entries: u32,
    #[serde(default)]
    num_masks: u32,
    key_bits: u16,
    #[serde(default)]
    response_bits: u16,
    #[serde(default)]
    priority_bits: u16,
    action_id_bits: u16,
    match_fields: Vec<MatchFieldDef>,
    actions: Vec<ActionDef>,
}

#[derive(Debug, Deserialize)]
struct MatchFieldDef {
    width: u16,
    kind: String,
}

#[derive(Debug, Deserialize)]
struct ActionDef {
    name: String,
    #[serde(default)]
    params: Vec<ParamSpecDef>,
}

#[derive(Debug, Deserialize)]
struct ParamSpecDef {
    name: String,
    width: u16,
}

#[derive(Debug, Deserialize)]
struct CounterBlockDef {
    name: String,
    counter_width_bits: u16,
    num_counters: u32,
    kind: String,
}

fn parse_mode(s: &str) -> TableMode {
    match s {
        "bcam" => TableMode::Bcam,
        "stcam" => TableMode::Stcam,
        "tcam" => TableMode::Tcam,
        "dcam" => TableMode::Dcam,
        "tiny_bcam" => TableMode::TinyBcam,
        "tiny_tcam" => TableMode::TinyTcam,
        other => {
            eprintln!("ERROR: unknown table mode '{other}' in pipeline config file");
            std::process::exit(1);
        }
    }
}

fn parse_endian(s: &str) -> Endian {
    match s {
        "big" => Endian::Big,
        "little" => Endian::Little,
        other => {
            eprintln!("ERROR: unknown endian '{other}' in pipeline config file");
            std::process::exit(1);
        }
    }
}

fn parse_field_kind(s: &str) -> FieldKind {
    match s {
        "bitfield" => FieldKind::Bitfield,
        "constant" => FieldKind::Constant,
        "prefix" => FieldKind::Prefix,
        "range" => FieldKind::Range,
        "ternary" => FieldKind::Ternary,
        "unused" => FieldKind::Unused,
        other => {
            eprintln!("ERROR: unknown match field kind '{other}' in pipeline config file");
            std::process::exit(1);
        }
    }
}

fn parse_counter_kind(s: &str) -> CounterKind {
    match s {
        "packets" => CounterKind::Packets,
        "bytes" => CounterKind::Bytes,
        "packets_and_bytes" => CounterKind::PacketsAndBytes,
        "flag" => CounterKind::Flag,
        other => {
            eprintln!("ERROR: unknown counter kind '{other}' in pipeline config file");
            std::process::exit(1);
        }
    }
}

impl From<TableDef> for Table {
    fn from(t: TableDef) -> Self {
        Table {
            name: t.name,
            mode: parse_mode(&t.mode),
            endian: parse_endian(&t.endian),
            num_entries: t.num_entries,
            num_masks: t.num_masks,
            key_bits: t.key_bits,
            response_bits: t.response_bits,
            priority_bits: t.priority_bits,
            action_id_bits: t.action_id_bits,
            match_fields: t
                .match_fields
                .into_iter()
                .map(|f| MatchField { width: f.width, kind: parse_field_kind(&f.kind) })
                .collect(),
            actions: t.actions.into_iter().map(Action::from).collect(),
        }
    }
}

impl From<ActionDef> for Action {
    fn from(a: ActionDef) -> Self {
        let params: Vec<ParamSpec> =
            a.params.into_iter().map(|p| ParamSpec { name: p.name, width: p.width }).collect();
        Action { name: a.name, param_bits: params.iter().map(|p| p.width).sum(), params }
    }
}

impl From<CounterBlockDef> for CounterBlock {
    fn from(c: CounterBlockDef) -> Self {
        CounterBlock {
            name: c.name,
            counter_width_bits: c.counter_width_bits,
            num_counters: c.num_counters,
            kind: parse_counter_kind(&c.kind),
        }
    }
}

/// Every `(pipeline_id, PipelineInfo)` a managed device presents, in
/// declaration order. Identical for every device this agent instance
/// manages (see module doc).
pub fn load(path: &str) -> Vec<(i32, PipelineInfo)> {
    if !Path::new(path).exists() {
        eprintln!("ERROR: pipeline config file '{path}' not found");
        std::process::exit(1);
    }
    let text = fs::read_to_string(path).unwrap_or_else(|e| {
        eprintln!("ERROR: failed to read pipeline config file '{path}': {e}");
        std::process::exit(1);
    });
    let config: ConfigFile = serde_json::from_str(&text).unwrap_or_else(|e| {
        eprintln!("ERROR: failed to parse pipeline config file '{path}': {e}");
        std::process::exit(1);
    });
    config
        .pipelines
        .into_iter()
        .map(|p| {
            let tables: Vec<Table> = p.tables.into_iter().map(Table::from).collect();
            let counter_blocks: Vec<CounterBlock> =
                p.counter_blocks.into_iter().map(CounterBlock::from).collect();
            (p.pipeline_id, PipelineInfo { name: p.name, tables, counter_blocks })
        })
        .collect()
}
