use thiserror::Error;

/// Rule-packing failures, named after the taxonomy's `TableRule*` error
/// codes so an agent handler can map them one-to-one onto a response.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PackError {
    #[error("rule has {actual} matches, table {table} expects {expected}")]
    TooFewMatches {
        table: String,
        expected: usize,
        actual: usize,
    },
    #[error("rule has {actual} matches, table {table} expects {expected}")]
    TooManyMatches {
        table: String,
        expected: usize,
        actual: usize,
    },
    #[error("match {index} has a form incompatible with its field type")]
    UnknownMatchType { index: usize },
    #[error("match {index}: key has bits set outside of its mask")]
    InvalidKeyFormat { index: usize },
    #[error("match {index}: mask does not fit within the field width")]
    InvalidMaskFormat { index: usize },
    #[error("match {index}: prefix length exceeds field width")]
    InvalidPrefixLength { index: usize },
    #[error("match {index}: range lower bound does not fit within the field width")]
    RangeLowerTooBig { index: usize },
    #[error("match {index}: range upper bound does not fit within the field width")]
    RangeUpperTooBig { index: usize },
    #[error("match {index}: range lower bound exceeds upper bound")]
    RangeLowerExceedsUpper { index: usize },
    #[error("packed key is {packed_bits} bits, table key is {table_key_bits} bits")]
    PackKeyTooBig { packed_bits: u32, table_key_bits: u32 },
    #[error("action {action} unknown for table {table}")]
    UnknownAction { table: String, action: String },
    #[error("rule has {actual} parameters, action {action} expects {expected}")]
    TooFewParams {
        action: String,
        expected: usize,
        actual: usize,
    },
    #[error("rule has {actual} parameters, action {action} expects {expected}")]
    TooManyParams {
        action: String,
        expected: usize,
        actual: usize,
    },
    #[error("parameter {index} does not fit within its declared width")]
    ParamTooBig { index: usize },
}
