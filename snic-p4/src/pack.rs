use num_bigint::BigUint;
use num_traits::{One, Zero};

use crate::error::PackError;
use crate::model::{Endian, FieldKind, Match, MatchField, PackedRule, Rule, Table};

fn all_ones(width: u32) -> BigUint {
    (BigUint::one() << width as usize) - BigUint::one()
}

fn compute_field(
    index: usize,
    field: &MatchField,
    m: &Match,
) -> Result<(BigUint, BigUint), PackError> {
    let width = field.width as u32;

    match m {
        Match::Unused => {
            if field.kind != FieldKind::Unused {
                return Err(PackError::UnknownMatchType { index });
            }
            Ok((BigUint::zero(), BigUint::zero()))
        }
        Match::KeyOnly { key } => Ok((key.clone(), all_ones(width))),
        Match::Prefix { key, prefix_len } => {
            if field.kind != FieldKind::Prefix {
                return Err(PackError::UnknownMatchType { index });
            }
            let prefix_len = *prefix_len as u32;
            if prefix_len > width {
                return Err(PackError::InvalidPrefixLength { index });
            }
            let mask = &all_ones(width) ^ &((BigUint::one() << (width - prefix_len) as usize) - BigUint::one());
            Ok((key & &mask, mask))
        }
        Match::Range { lower, upper } => {
            if field.kind != FieldKind::Range {
                return Err(PackError::UnknownMatchType { index });
            }
            let max = if width < 16 { (1u32 << width) - 1 } else { u16::MAX as u32 };
            if *lower as u32 > max {
                return Err(PackError::RangeLowerTooBig { index });
            }
            if *upper as u32 > max {
                return Err(PackError::RangeUpperTooBig { index });
            }
            if lower > upper {
                return Err(PackError::RangeLowerExceedsUpper { index });
            }
            Ok((BigUint::from(*lower), BigUint::from(*upper)))
        }
        Match::KeyMask { key, mask } => {
            if !matches!(field.kind, FieldKind::Bitfield | FieldKind::Ternary) {
                return Err(PackError::UnknownMatchType { index });
            }
            if *mask >= (BigUint::one() << width as usize) {
                return Err(PackError::InvalidMaskFormat { index });
            }
            // Key is taken literally, not ANDed with mask: a caller-supplied
            // key/mask pair is passed through to the table as given.
            Ok((key.clone(), mask.clone()))
        }
    }
}

fn biguint_to_bytes(value: &BigUint, bits: u32, endian: Endian) -> Vec<u8> {
    let len = ((bits + 7) / 8) as usize;
    if len == 0 {
        return Vec::new();
    }
    let mut be = value.to_bytes_be();
    if be.len() < len {
        let mut padded = vec![0u8; len - be.len()];
        padded.extend_from_slice(&be);
        be = padded;
    } else if be.len() > len {
        be = be[be.len() - len..].to_vec();
    }
    match endian {
        Endian::Big => be,
        Endian::Little => {
            be.reverse();
            be
        }
    }
}

/// Packs a semantic rule into the byte buffers a vendor table driver
/// consumes, enforcing the table's match/action widths exactly.
pub fn pack(table: &Table, rule: &Rule) -> Result<PackedRule, PackError> {
    let expected_matches = table.match_fields.len();
    let actual_matches = rule.matches.len();
    if actual_matches < expected_matches {
        return Err(PackError::TooFewMatches {
            table: table.name.clone(),
            expected: expected_matches,
            actual: actual_matches,
        });
    }
    if actual_matches > expected_matches {
        return Err(PackError::TooManyMatches {
            table: table.name.clone(),
            expected: expected_matches,
            actual: actual_matches,
        });
    }

    let mut key = BigUint::zero();
    let mut mask = BigUint::zero();
    let mut bit_offset: u32 = 0;
    for (index, (field, m)) in table.match_fields.iter().zip(rule.matches.iter()).enumerate() {
        let (field_key, field_mask) = compute_field(index, field, m)?;
        key |= field_key << bit_offset as usize;
        mask |= field_mask << bit_offset as usize;
        bit_offset += field.width as u32;
    }
    if bit_offset != table.key_bits as u32 {
        return Err(PackError::PackKeyTooBig {
            packed_bits: bit_offset,
            table_key_bits: table.key_bits as u32,
        });
    }

    let action = table.action(&rule.action_name).ok_or_else(|| PackError::UnknownAction {
        table: table.name.clone(),
        action: rule.action_name.clone(),
    })?;

    let expected_params = action.params.len();
    let actual_params = rule.params.len();
    if actual_params < expected_params {
        return Err(PackError::TooFewParams {
            action: action.name.clone(),
            expected: expected_params,
            actual: actual_params,
        });
    }
    if actual_params > expected_params {
        return Err(PackError::TooManyParams {
            action: action.name.clone(),
            expected: expected_params,
            actual: actual_params,
        });
    }

    let mut params_val = BigUint::zero();
    let mut param_bit_offset: u32 = 0;
    for (index, (param_spec, value)) in action.params.iter().zip(rule.params.iter()).enumerate() {
        let width = param_spec.width as u32;
        if value.bits() as u32 > width {
            return Err(PackError::ParamTooBig { index });
        }
        params_val |= value << param_bit_offset as usize;
        param_bit_offset += width;
    }

    Ok(PackedRule {
        key: biguint_to_bytes(&key, table.key_bits as u32, table.endian),
        mask: biguint_to_bytes(&mask, table.key_bits as u32, table.endian),
        action_parameters: biguint_to_bytes(&params_val, action.param_bits as u32, table.endian),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Action, ParamSpec, TableMode};

    fn two_field_table(endian: Endian) -> Table {
        Table {
            name: "t_two".into(),
            mode: TableMode::Tcam,
            endian,
            num_entries: 1024,
            num_masks: 0,
            key_bits: 24,
            response_bits: 0,
            priority_bits: 16,
            action_id_bits: 8,
            match_fields: vec![
                MatchField { width: 16, kind: FieldKind::Bitfield },
                MatchField { width: 8, kind: FieldKind::Bitfield },
            ],
            actions: vec![Action {
                name: "a_one".into(),
                param_bits: 24,
                params: vec![ParamSpec { name: "p0".into(), width: 24 }],
            }],
        }
    }

    fn rule(matches: Vec<Match>, params: Vec<BigUint>) -> Rule {
        Rule {
            table_name: "t_two".into(),
            matches,
            action_name: "a_one".into(),
            params,
            priority: None,
        }
    }

    #[test]
    fn packs_bitfield_and_key_only_matches_big_endian() {
        let table = two_field_table(Endian::Big);
        let r = rule(
            vec![
                Match::KeyMask { key: BigUint::from(0x1200u32), mask: BigUint::from(0xff00u32) },
                Match::KeyOnly { key: BigUint::from(0xabu32) },
            ],
            vec![BigUint::from(0xdeadbeu32)],
        );
        let packed = pack(&table, &r).unwrap();
        assert_eq!(packed.key, vec![0xab, 0x12, 0x00]);
        assert_eq!(packed.mask, vec![0xff, 0xff, 0x00]);
        assert_eq!(packed.action_parameters, vec![0xde, 0xad, 0xbe]);
    }

    #[test]
    fn packs_little_endian_table() {
        let table = two_field_table(Endian::Little);
        let r = rule(
            vec![
                Match::KeyMask { key: BigUint::from(0x1200u32), mask: BigUint::from(0xff00u32) },
                Match::KeyOnly { key: BigUint::from(0xabu32) },
            ],
            vec![BigUint::from(0x1u32)],
        );
        let packed = pack(&table, &r).unwrap();
        assert_eq!(packed.key, vec![0x00, 0x12, 0xab]);
        assert_eq!(packed.mask, vec![0x00, 0xff, 0xff]);
    }

    #[test]
    fn key_mask_with_key_bits_outside_mask_passes_key_through_unmodified() {
        // Matches the worked example: key 0x1234 over mask 0xff00 keeps its
        // low byte verbatim rather than being ANDed down to 0x1200.
        let table = two_field_table(Endian::Big);
        let r = rule(
            vec![
                Match::KeyMask { key: BigUint::from(0x1234u32), mask: BigUint::from(0xff00u32) },
                Match::KeyOnly { key: BigUint::from(0xabu32) },
            ],
            vec![BigUint::from(0xdeadbeu32)],
        );
        let packed = pack(&table, &r).unwrap();
        assert_eq!(packed.key, vec![0xab, 0x12, 0x34]);
        assert_eq!(packed.mask, vec![0xff, 0xff, 0x00]);
    }

    #[test]
    fn prefix_mask_covers_top_bits_of_field_width() {
        let mut table = two_field_table(Endian::Big);
        table.match_fields[0].kind = FieldKind::Prefix;
        table.match_fields[1] = MatchField { width: 8, kind: FieldKind::Unused };
        let r = rule(
            vec![
                Match::Prefix { key: BigUint::from(0x1234u32), prefix_len: 8 },
                Match::Unused,
            ],
            vec![BigUint::from(0x1u32)],
        );
        let packed = pack(&table, &r).unwrap();
        // The key is ANDed with its derived mask: only the top 8 bits of the
        // 16-bit field survive.
        assert_eq!(packed.key, vec![0x00, 0x12, 0x00]);
        assert_eq!(packed.mask, vec![0x00, 0xff, 0x00]);
    }

    #[test]
    fn prefix_pack_matches_wide_field_worked_example() {
        let mut table = two_field_table(Endian::Big);
        table.key_bits = 31;
        table.match_fields = vec![MatchField { width: 31, kind: FieldKind::Prefix }];
        let r = rule(vec![Match::Prefix { key: BigUint::from(0x7fffffffu32), prefix_len: 16 }], vec![BigUint::from(0x1u32)]);
        let packed = pack(&table, &r).unwrap();
        assert_eq!(packed.key, vec![0x7f, 0xff, 0x80, 0x00]);
        assert_eq!(packed.mask, vec![0x7f, 0xff, 0x80, 0x00]);
    }

    #[test]
    fn range_packs_lower_into_key_and_upper_into_mask() {
        let mut table = two_field_table(Endian::Big);
        table.match_fields[0] = MatchField { width: 16, kind: FieldKind::Range };
        table.match_fields[1] = MatchField { width: 8, kind: FieldKind::Unused };
        let r = rule(
            vec![Match::Range { lower: 10, upper: 20 }, Match::Unused],
            vec![BigUint::from(0x1u32)],
        );
        let packed = pack(&table, &r).unwrap();
        assert_eq!(packed.key, vec![0x00, 0x00, 0x0a]);
        assert_eq!(packed.mask, vec![0x00, 0x00, 0x14]);
    }

    #[test]
    fn range_with_lower_above_upper_is_rejected() {
        let mut table = two_field_table(Endian::Big);
        table.match_fields[0] = MatchField { width: 16, kind: FieldKind::Range };
        table.match_fields[1] = MatchField { width: 8, kind: FieldKind::Unused };
        let r = rule(
            vec![Match::Range { lower: 20, upper: 10 }, Match::Unused],
            vec![BigUint::from(0x1u32)],
        );
        assert_eq!(pack(&table, &r), Err(PackError::RangeLowerExceedsUpper { index: 0 }));
    }

    #[test]
    fn wrong_match_count_is_rejected() {
        let table = two_field_table(Endian::Big);
        let r = rule(vec![Match::KeyOnly { key: BigUint::zero() }], vec![BigUint::from(0x1u32)]);
        assert_eq!(
            pack(&table, &r),
            Err(PackError::TooFewMatches { table: "t_two".into(), expected: 2, actual: 1 })
        );
    }

    #[test]
    fn unused_field_paired_with_non_unused_match_is_rejected() {
        let mut table = two_field_table(Endian::Big);
        table.match_fields[1] = MatchField { width: 8, kind: FieldKind::Unused };
        let r = rule(
            vec![
                Match::KeyOnly { key: BigUint::from(0x1u32) },
                Match::KeyMask { key: BigUint::from(0x1u32), mask: BigUint::from(0x1u32) },
            ],
            vec![BigUint::from(0x1u32)],
        );
        assert_eq!(pack(&table, &r), Err(PackError::UnknownMatchType { index: 1 }));
    }
}
