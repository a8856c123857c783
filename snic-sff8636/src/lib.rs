mod lower;
mod types;
mod upper;

pub use lower::{
    ChannelMonitor, LaneFlags, LowerPage, Masks, StatusFlags, ThresholdFlags, TxDisable, PAGE_SIZE,
};
pub use upper::{
    CdrOptions, ComplianceCodes, DeviceOptions, DeviceTechnology, DeviceTechnologyFlags,
    EqualizerOptions, EthernetCompliance, FibreChannelLink, FibreChannelMedia, FibreChannelSpeed,
    GigabitEthernetCompliance, LinkLength, Options, PowerClass, SasCompliance, SonetCompliance,
    TxTechnology, UpperPage00,
};

/// A module's full two-page SFF-8636 memory map: the fixed lower page plus
/// upper page 00, as read via `snic-cms`'s module page transfer.
#[derive(Debug, Clone)]
pub struct ModuleMemory {
    pub lower: [u8; PAGE_SIZE],
    pub upper_page_00: [u8; upper::PAGE_SIZE],
}

#[derive(Debug, Clone)]
pub struct ModuleInfo {
    pub lower: LowerPage,
    pub upper: UpperPage00,
}

pub fn decode(memory: &ModuleMemory) -> ModuleInfo {
    ModuleInfo {
        lower: lower::parse(&memory.lower),
        upper: upper::parse(&memory.upper_page_00),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn empty_memory() -> ModuleMemory {
        ModuleMemory {
            lower: [0u8; PAGE_SIZE],
            upper_page_00: [0u8; upper::PAGE_SIZE],
        }
    }

    #[test]
    fn decodes_status_flags_from_lower_page() {
        let mut mem = empty_memory();
        mem.lower[2] = StatusFlags::DATA_NOT_READY.bits() | StatusFlags::FLAT_MEM.bits();
        let info = decode(&mem);
        assert!(info.lower.status.contains(StatusFlags::DATA_NOT_READY));
        assert!(info.lower.status.contains(StatusFlags::FLAT_MEM));
        assert!(!info.lower.status.contains(StatusFlags::INT_L));
    }

    #[test]
    fn decodes_rx_power_per_lane_in_milliwatts() {
        let mut mem = empty_memory();
        // 10000 raw units * 0.0001 mW/unit = 1.0 mW on lane 1.
        mem.lower[34] = 0x27;
        mem.lower[35] = 0x10;
        let info = decode(&mem);
        assert!((info.lower.rx_power_mw.lane[0] - 1.0).abs() < 1e-9);
    }

    #[test]
    fn power_class_4_requires_extended_bits_to_reach_5_through_7() {
        let mut mem = empty_memory();
        mem.upper_page_00[129 - 128] = 0b1100_0001; // power_class_lo=11, power_class_hi=01 -> class 5
        let info = decode(&mem);
        assert_eq!(info.upper.power_class, PowerClass::Class5);
    }

    #[test]
    fn power_class_8_bit_overrides_everything_else() {
        let mut mem = empty_memory();
        mem.upper_page_00[129 - 128] = 1 << 5;
        let info = decode(&mem);
        assert_eq!(info.upper.power_class, PowerClass::Class8);
    }

    #[test]
    fn baud_rate_falls_back_to_extended_byte_when_saturated() {
        let mut mem = empty_memory();
        mem.upper_page_00[140 - 128] = 0xff;
        mem.upper_page_00[222 - 128] = 103; // 103 * 250 = 25750 Mbd
        let info = decode(&mem);
        assert_eq!(info.upper.baud_rate_mbd, 25_750);
    }

    #[test]
    fn vendor_fields_trim_trailing_padding() {
        let mut mem = empty_memory();
        let name = b"ACME OPTICS     ";
        mem.upper_page_00[148 - 128..164 - 128].copy_from_slice(name);
        let info = decode(&mem);
        assert_eq!(info.upper.vendor_name, "ACME OPTICS");
    }

    #[test]
    fn decodes_mask_bits_from_lower_page() {
        let mut mem = empty_memory();
        mem.lower[100] = LaneFlags::LANE2.bits();
        mem.lower[104] = ThresholdFlags::HIGH_ALARM.bits();
        let info = decode(&mem);
        assert!(info.lower.masks.los.contains(LaneFlags::LANE2));
        assert!(!info.lower.masks.los.contains(LaneFlags::LANE1));
        assert!(info.lower.masks.vcc.contains(ThresholdFlags::HIGH_ALARM));
    }

    #[test]
    fn decodes_ethernet_and_fibre_compliance_codes() {
        let mut mem = empty_memory();
        mem.upper_page_00[131 - 128] = EthernetCompliance::BASE_SR4_40G.bits();
        mem.upper_page_00[137 - 128] = FibreChannelMedia::OM3.bits();
        let info = decode(&mem);
        assert!(info
            .upper
            .compliance
            .ethernet
            .contains(EthernetCompliance::BASE_SR4_40G));
        assert!(info.upper.compliance.fibre_media.contains(FibreChannelMedia::OM3));
    }

    #[test]
    fn decodes_link_length_per_media_type() {
        let mut mem = empty_memory();
        mem.upper_page_00[142 - 128] = 10; // smf
        mem.upper_page_00[146 - 128] = 3; // passive copper
        let info = decode(&mem);
        assert_eq!(info.upper.link_length.smf, 10);
        assert_eq!(info.upper.link_length.passive_copper, 3);
    }

    #[test]
    fn decodes_device_technology_flags_and_tx_technology() {
        let mut mem = empty_memory();
        // tx_technology = 11 (COPPER_PASSIVE_EQ) in bits [7:4], cooled_tx in bit 2.
        mem.upper_page_00[147 - 128] = (11 << 4) | DeviceTechnologyFlags::COOLED_TX.bits();
        let info = decode(&mem);
        assert_eq!(info.upper.device_technology.tx_technology, TxTechnology::CopperPassiveEqualized);
        assert!(info
            .upper
            .device_technology
            .flags
            .contains(DeviceTechnologyFlags::COOLED_TX));
    }

    #[test]
    fn decodes_options_bytes() {
        let mut mem = empty_memory();
        mem.upper_page_00[193 - 128] = EqualizerOptions::TX_INPUT_FREEZE.bits();
        mem.upper_page_00[195 - 128] = DeviceOptions::TX_DISABLE.bits();
        let info = decode(&mem);
        assert!(info.upper.options.equalizer.contains(EqualizerOptions::TX_INPUT_FREEZE));
        assert!(info.upper.options.device.contains(DeviceOptions::TX_DISABLE));
    }
}
