use num_bigint::BigUint;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endian {
    Big,
    Little,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableMode {
    Bcam,
    Stcam,
    Tcam,
    Dcam,
    TinyBcam,
    TinyTcam,
}

impl TableMode {
    /// Modes that reject a non-null mask at rule-submission time; the
    /// packer still produces one, and the facade discards it for these.
    pub fn rejects_mask(self) -> bool {
        matches!(self, TableMode::Bcam | TableMode::Dcam | TableMode::TinyBcam)
    }

    /// Modes that carry per-table ECC counters in the pipeline stats zone.
    pub fn has_ecc_counters(self) -> bool {
        matches!(
            self,
            TableMode::Bcam
                | TableMode::Stcam
                | TableMode::Tcam
                | TableMode::TinyBcam
                | TableMode::TinyTcam
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TableMode::Bcam => "bcam",
            TableMode::Stcam => "stcam",
            TableMode::Tcam => "tcam",
            TableMode::Dcam => "dcam",
            TableMode::TinyBcam => "tiny_bcam",
            TableMode::TinyTcam => "tiny_tcam",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Bitfield,
    Constant,
    Prefix,
    Range,
    Ternary,
    Unused,
}

#[derive(Debug, Clone)]
pub struct MatchField {
    pub width: u16,
    pub kind: FieldKind,
}

#[derive(Debug, Clone)]
pub struct ParamSpec {
    pub name: String,
    pub width: u16,
}

#[derive(Debug, Clone)]
pub struct Action {
    pub name: String,
    pub param_bits: u16,
    pub params: Vec<ParamSpec>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CounterKind {
    Packets,
    Bytes,
    PacketsAndBytes,
    Flag,
}

#[derive(Debug, Clone)]
pub struct CounterBlock {
    pub name: String,
    pub counter_width_bits: u16,
    pub num_counters: u32,
    pub kind: CounterKind,
}

#[derive(Debug, Clone)]
pub struct Table {
    pub name: String,
    pub mode: TableMode,
    pub endian: Endian,
    pub num_entries: u32,
    pub num_masks: u32,
    pub key_bits: u16,
    pub response_bits: u16,
    pub priority_bits: u16,
    pub action_id_bits: u16,
    pub match_fields: Vec<MatchField>,
    pub actions: Vec<Action>,
}

impl Table {
    pub fn action(&self, name: &str) -> Option<&Action> {
        self.actions.iter().find(|a| a.name == name)
    }
}

#[derive(Debug, Clone)]
pub enum Match {
    KeyMask { key: BigUint, mask: BigUint },
    KeyOnly { key: BigUint },
    Prefix { key: BigUint, prefix_len: u16 },
    Range { lower: u16, upper: u16 },
    Unused,
}

/// A semantic table rule, constructed, packed and released within a single
/// RPC. `matches` must be given in the table's declared field order.
#[derive(Debug, Clone)]
pub struct Rule {
    pub table_name: String,
    pub matches: Vec<Match>,
    pub action_name: String,
    pub params: Vec<BigUint>,
    pub priority: Option<u32>,
}

/// The byte-serialized form a vendor table driver consumes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackedRule {
    pub key: Vec<u8>,
    pub mask: Vec<u8>,
    pub action_parameters: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct PipelineInfo {
    pub name: String,
    pub tables: Vec<Table>,
    pub counter_blocks: Vec<CounterBlock>,
}

impl PipelineInfo {
    pub fn table(&self, name: &str) -> Option<&Table> {
        self.tables.iter().find(|t| t.name == name)
    }

    pub fn table_index(&self, name: &str) -> Option<usize> {
        self.tables.iter().position(|t| t.name == name)
    }
}
