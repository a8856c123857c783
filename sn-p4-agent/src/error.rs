use snic_p4::PackError;
use snic_proto::sn::v2::ErrorCode;

/// Maps a rule-packing failure onto the stable numeric error taxonomy.
pub fn pack_error_code(err: &PackError) -> ErrorCode {
    match err {
        PackError::TooFewMatches { .. } => ErrorCode::TableRuleTooFewMatches,
        PackError::TooManyMatches { .. } => ErrorCode::TableRuleTooManyMatches,
        PackError::UnknownMatchType { .. } => ErrorCode::UnknownTableRuleMatchType,
        PackError::InvalidKeyFormat { .. } => ErrorCode::TableRuleMatchInvalidKeyFormat,
        PackError::InvalidMaskFormat { .. } => ErrorCode::TableRuleMatchInvalidMaskFormat,
        PackError::InvalidPrefixLength { .. } => ErrorCode::TableRuleMatchInvalidPrefixLength,
        PackError::RangeLowerTooBig { .. } => ErrorCode::TableRuleMatchRangeLowerTooBig,
        PackError::RangeUpperTooBig { .. } => ErrorCode::TableRuleMatchRangeUpperTooBig,
        PackError::RangeLowerExceedsUpper { .. } => ErrorCode::TableRuleMatchRangeLowerTooBig,
        PackError::PackKeyTooBig { .. } => ErrorCode::TableRuleMatchInvalidKeyFormat,
        PackError::UnknownAction { .. } => ErrorCode::InvalidActionName,
        PackError::TooFewParams { .. } => ErrorCode::TableRuleTooFewActionParameters,
        PackError::TooManyParams { .. } => ErrorCode::TableRuleTooManyActionParameters,
        PackError::ParamTooBig { .. } => ErrorCode::TableRuleTooManyActionParameters,
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn range_lower_exceeds_upper_reuses_range_lower_too_big() {
        let err = PackError::RangeLowerExceedsUpper { index: 0 };
        assert_eq!(pack_error_code(&err), ErrorCode::TableRuleMatchRangeLowerTooBig);
    }

    #[test]
    fn pack_key_too_big_reuses_invalid_key_format() {
        let err = PackError::PackKeyTooBig { packed_bits: 40, table_key_bits: 32 };
        assert_eq!(pack_error_code(&err), ErrorCode::TableRuleMatchInvalidKeyFormat);
    }

    #[test]
    fn unknown_action_maps_to_invalid_action_name() {
        let err = PackError::UnknownAction { table: "t0".into(), action: "drop".into() };
        assert_eq!(pack_error_code(&err), ErrorCode::InvalidActionName);
    }
}
