use bitflags::bitflags;

use crate::types::{ascii_field, be16};

pub const PAGE_SIZE: usize = 128;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PowerClass {
    Class1,
    Class2,
    Class3,
    Class4,
    Class5,
    Class6,
    Class7,
    Class8,
}

impl PowerClass {
    /// Maximum power draw in watts for this class (SFF-8636 table 6-16).
    pub fn max_watts(self) -> f64 {
        match self {
            PowerClass::Class1 => 1.5,
            PowerClass::Class2 => 2.0,
            PowerClass::Class3 => 2.5,
            PowerClass::Class4 => 3.5,
            PowerClass::Class5 => 4.0,
            PowerClass::Class6 => 4.5,
            PowerClass::Class7 => 5.0,
            PowerClass::Class8 => 6.0,
        }
    }
}

fn power_class_from_raw(n: u8) -> PowerClass {
    match n {
        1 => PowerClass::Class1,
        2 => PowerClass::Class2,
        3 => PowerClass::Class3,
        4 => PowerClass::Class4,
        5 => PowerClass::Class5,
        6 => PowerClass::Class6,
        7 => PowerClass::Class7,
        _ => PowerClass::Class8,
    }
}

/// Decodes the split power-class encoding from byte 129
/// (`extended_identifier`): `power_class_lo` at `[7:6]`, `power_class_hi` at
/// `[1:0]`, with bit `[5]` extending into class 8.
///
/// `power_class_8 ? 8 : power_class_hi == 0 ? power_class_lo + 1 : power_class_hi + 4`.
fn power_class(extended_identifier: u8) -> PowerClass {
    let lo = (extended_identifier >> 6) & 0x3;
    let hi = extended_identifier & 0x3;
    let class_8 = extended_identifier & (1 << 5) != 0;

    if class_8 {
        PowerClass::Class8
    } else if hi == 0 {
        power_class_from_raw(lo + 1)
    } else {
        power_class_from_raw(hi + 4)
    }
}

/// Nominal signaling rate in Mbd, from byte 140 (or the extended byte 222
/// when byte 140 saturates at 0xff, in units of 250 Mbd).
fn baud_rate_mbd(baud_rate: u8, extended_baud_rate: u8) -> u32 {
    if baud_rate == 0xff {
        extended_baud_rate as u32 * 250
    } else {
        baud_rate as u32 * 100
    }
}

bitflags! {
    /// Ethernet compliance codes, byte 131.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct EthernetCompliance: u8 {
        const ACTIVE_CABLE_40G = 1 << 0;
        const BASE_LR4_40G = 1 << 1;
        const BASE_SR4_40G = 1 << 2;
        const BASE_CR4_40G = 1 << 3;
        const BASE_SR_10G = 1 << 4;
        const BASE_LR_10G = 1 << 5;
        const BASE_LRM_10G = 1 << 6;
        const EXTENDED = 1 << 7;
    }
}

bitflags! {
    /// SONET compliance codes, byte 132.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct SonetCompliance: u8 {
        const OC48_SR = 1 << 0;
        const OC48_IR = 1 << 1;
        const OC48_LR = 1 << 2;
    }
}

bitflags! {
    /// SAS/SATA compliance codes, byte 133.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct SasCompliance: u8 {
        const SAS_3_GBPS = 1 << 4;
        const SAS_6_GBPS = 1 << 5;
        const SAS_12_GBPS = 1 << 6;
        const SAS_24_GBPS = 1 << 7;
    }
}

bitflags! {
    /// Gigabit Ethernet compliance codes, byte 134.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct GigabitEthernetCompliance: u8 {
        const BASE_SX = 1 << 0;
        const BASE_LX = 1 << 1;
        const BASE_CX = 1 << 2;
        const BASE_T = 1 << 3;
    }
}

bitflags! {
    /// Fibre Channel link length/transmitter technology codes, bytes 135-136.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct FibreChannelLink: u16 {
        const TX_EL_INTER = 1 << 0;
        const TX_LC = 1 << 1;
        const LENGTH_MEDIUM = 1 << 3;
        const LENGTH_LONG = 1 << 4;
        const LENGTH_INTERMEDIATE = 1 << 5;
        const LENGTH_SHORT = 1 << 6;
        const LENGTH_VERY_LONG = 1 << 7;
        const TX_LL = 1 << 12;
        const TX_SL = 1 << 13;
        const TX_SN = 1 << 14;
        const TX_EL_INTRA = 1 << 15;
    }
}

bitflags! {
    /// Fibre Channel transmission media codes, byte 137.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct FibreChannelMedia: u8 {
        const SM = 1 << 0;
        const OM3 = 1 << 1;
        const M5 = 1 << 2;
        const M6 = 1 << 3;
        const TV = 1 << 4;
        const MI = 1 << 5;
        const TP = 1 << 6;
        const TW = 1 << 7;
    }
}

bitflags! {
    /// Fibre Channel speed codes, byte 138.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct FibreChannelSpeed: u8 {
        const MBPS_100 = 1 << 0;
        const EXTENDED = 1 << 1;
        const MBPS_200 = 1 << 2;
        const MBPS_3200 = 1 << 3;
        const MBPS_400 = 1 << 4;
        const MBPS_1600 = 1 << 5;
        const MBPS_800 = 1 << 6;
        const MBPS_1200 = 1 << 7;
    }
}

/// Compliance codes, bytes 131-138.
#[derive(Debug, Clone, Copy)]
pub struct ComplianceCodes {
    pub ethernet: EthernetCompliance,
    pub sonet: SonetCompliance,
    pub sas: SasCompliance,
    pub gigabit_ethernet: GigabitEthernetCompliance,
    pub fibre_link: FibreChannelLink,
    pub fibre_media: FibreChannelMedia,
    pub fibre_speed: FibreChannelSpeed,
}

/// Supported link length by media type, bytes 142-146 (SFF-8636 table 6-19).
/// Units are media-dependent and not given by the register layout itself.
#[derive(Debug, Clone, Copy, Default)]
pub struct LinkLength {
    pub smf: u8,
    pub om3: u8,
    pub om2: u8,
    pub om1: u8,
    pub passive_copper: u8,
}

bitflags! {
    /// Device technology control bits, byte 147 bits [3:0].
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct DeviceTechnologyFlags: u8 {
        const TX_TUNABLE = 1 << 0;
        const APD_DETECTOR = 1 << 1;
        const COOLED_TX = 1 << 2;
        const ACTIVE_WAVELENGTH_CONTROL = 1 << 3;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxTechnology {
    Vcsel850nm,
    Vcsel1310nm,
    Vcsel1550nm,
    Fp1310nm,
    Dfb1310nm,
    Dfb1550nm,
    Eml1310nm,
    Eml1550nm,
    Other,
    Dfb1490nm,
    CopperUnequalized,
    CopperPassiveEqualized,
    CopperNearAndFarEndActiveEqualized,
    CopperFarEndActiveEqualized,
    CopperNearEndActiveEqualized,
    CopperLinearActiveEqualized,
}

/// Decodes byte 147 bits [7:4] (enum `sff_8636_tx_technology`).
fn tx_technology(raw: u8) -> TxTechnology {
    match raw & 0x0f {
        0 => TxTechnology::Vcsel850nm,
        1 => TxTechnology::Vcsel1310nm,
        2 => TxTechnology::Vcsel1550nm,
        3 => TxTechnology::Fp1310nm,
        4 => TxTechnology::Dfb1310nm,
        5 => TxTechnology::Dfb1550nm,
        6 => TxTechnology::Eml1310nm,
        7 => TxTechnology::Eml1550nm,
        8 => TxTechnology::Other,
        9 => TxTechnology::Dfb1490nm,
        10 => TxTechnology::CopperUnequalized,
        11 => TxTechnology::CopperPassiveEqualized,
        12 => TxTechnology::CopperNearAndFarEndActiveEqualized,
        13 => TxTechnology::CopperFarEndActiveEqualized,
        14 => TxTechnology::CopperNearEndActiveEqualized,
        _ => TxTechnology::CopperLinearActiveEqualized,
    }
}

/// Transmitter/device technology, byte 147.
#[derive(Debug, Clone, Copy)]
pub struct DeviceTechnology {
    pub flags: DeviceTechnologyFlags,
    pub tx_technology: TxTechnology,
}

bitflags! {
    /// Equalizer/emphasis option bits, byte 193.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct EqualizerOptions: u8 {
        const RX_AMPLITUDE_PROGRAMMABLE = 1 << 0;
        const RX_EMPHASIS_PROGRAMMABLE = 1 << 1;
        const TX_INPUT_PROGRAMMABLE = 1 << 2;
        const TX_INPUT_AUTO_ADAPTIVE = 1 << 3;
        const TX_INPUT_FREEZE = 1 << 4;
        const INT_L_OR_LOS_L_CONFIGURABLE = 1 << 5;
        const LP_MODE_OR_TX_DIS_CONFIGURABLE = 1 << 6;
    }
}

bitflags! {
    /// CDR/squelch option bits, byte 194.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct CdrOptions: u8 {
        const TX_SQUELCH = 1 << 0;
        const TX_SQUELCH_DISABLE = 1 << 1;
        const RX_OUTPUT_DISABLE = 1 << 2;
        const RX_SQUELCH_DISABLE = 1 << 3;
        const RX_LOL = 1 << 4;
        const TX_LOL = 1 << 5;
        const RX_ON_OFF_CONTROL = 1 << 6;
        const TX_ON_OFF_CONTROL = 1 << 7;
    }
}

bitflags! {
    /// Device capability option bits, byte 195.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct DeviceOptions: u8 {
        const PAGES_20_21 = 1 << 0;
        const TX_LOS = 1 << 1;
        const TX_SQUELCH = 1 << 2;
        const TX_FAULT = 1 << 3;
        const TX_DISABLE = 1 << 4;
        const RATE_SELECT = 1 << 5;
        const PAGE_01 = 1 << 6;
        const PAGE_02 = 1 << 7;
    }
}

/// Option bits, bytes 193-195.
#[derive(Debug, Clone, Copy)]
pub struct Options {
    pub equalizer: EqualizerOptions,
    pub cdr: CdrOptions,
    pub device: DeviceOptions,
}

#[derive(Debug, Clone)]
pub struct UpperPage00 {
    pub identifier: u8,
    pub connector_type: u8,
    pub compliance: ComplianceCodes,
    pub encoding: u8,
    pub baud_rate_mbd: u32,
    pub power_class: PowerClass,
    pub link_length: LinkLength,
    pub device_technology: DeviceTechnology,
    pub options: Options,
    pub vendor_name: String,
    pub vendor_oui: [u8; 3],
    pub vendor_pn: String,
    pub vendor_rev: String,
    pub vendor_sn: String,
    pub date_code: String,
}

/// Parses SFF-8636 upper page 00 (offsets 128-255), the module's static
/// identity and compliance page.
pub fn parse(page: &[u8; PAGE_SIZE]) -> UpperPage00 {
    let o = |abs: usize| abs - 128;

    UpperPage00 {
        identifier: page[o(128)],
        connector_type: page[o(130)],
        compliance: ComplianceCodes {
            ethernet: EthernetCompliance::from_bits_truncate(page[o(131)]),
            sonet: SonetCompliance::from_bits_truncate(page[o(132)]),
            sas: SasCompliance::from_bits_truncate(page[o(133)]),
            gigabit_ethernet: GigabitEthernetCompliance::from_bits_truncate(page[o(134)]),
            fibre_link: FibreChannelLink::from_bits_truncate(be16(page[o(135)], page[o(136)])),
            fibre_media: FibreChannelMedia::from_bits_truncate(page[o(137)]),
            fibre_speed: FibreChannelSpeed::from_bits_truncate(page[o(138)]),
        },
        encoding: page[o(139)],
        baud_rate_mbd: baud_rate_mbd(page[o(140)], page[o(222)]),
        power_class: power_class(page[o(129)]),
        link_length: LinkLength {
            smf: page[o(142)],
            om3: page[o(143)],
            om2: page[o(144)],
            om1: page[o(145)],
            passive_copper: page[o(146)],
        },
        device_technology: DeviceTechnology {
            flags: DeviceTechnologyFlags::from_bits_truncate(page[o(147)]),
            tx_technology: tx_technology(page[o(147)] >> 4),
        },
        options: Options {
            equalizer: EqualizerOptions::from_bits_truncate(page[o(193)]),
            cdr: CdrOptions::from_bits_truncate(page[o(194)]),
            device: DeviceOptions::from_bits_truncate(page[o(195)]),
        },
        vendor_name: ascii_field(&page[o(148)..o(164)]),
        vendor_oui: [page[o(165)], page[o(166)], page[o(167)]],
        vendor_pn: ascii_field(&page[o(168)..o(184)]),
        vendor_rev: ascii_field(&page[o(184)..o(186)]),
        vendor_sn: ascii_field(&page[o(196)..o(212)]),
        date_code: ascii_field(&page[o(212)..o(220)]),
    }
}
