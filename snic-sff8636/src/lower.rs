use bitflags::bitflags;

use crate::types::{be16, rx_power_mw, tx_bias_ma, tx_power_mw, temp_celsius, vcc_volts};

pub const PAGE_SIZE: usize = 128;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct StatusFlags: u8 {
        const DATA_NOT_READY = 1 << 0;
        const INT_L = 1 << 1;
        const FLAT_MEM = 1 << 2;
    }
}

bitflags! {
    /// Per-lane loss-of-signal / fault / loss-of-lock flags, one bit per
    /// lane (rx1..rx4 or tx1..tx4 depending on the field).
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct LaneFlags: u8 {
        const LANE1 = 1 << 0;
        const LANE2 = 1 << 1;
        const LANE3 = 1 << 2;
        const LANE4 = 1 << 3;
        const LANE1_ALT = 1 << 4;
        const LANE2_ALT = 1 << 5;
        const LANE3_ALT = 1 << 6;
        const LANE4_ALT = 1 << 7;
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ThresholdFlags: u8 {
        const LOW_WARNING = 1 << 4;
        const HIGH_WARNING = 1 << 5;
        const LOW_ALARM = 1 << 6;
        const HIGH_ALARM = 1 << 7;
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct TxDisable: u8 {
        const TX1 = 1 << 0;
        const TX2 = 1 << 1;
        const TX3 = 1 << 2;
        const TX4 = 1 << 3;
    }
}

/// One of the four channel-monitor value blocks: rx power, tx bias, or tx
/// power, always stored lane1..lane4 regardless of on-wire byte order.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChannelMonitor {
    pub lane: [f64; 4],
}

/// Interrupt masks, bytes 100-104: one mask bit per interrupt-flag bit in
/// bytes 3-7, same bit layout as `los`/`tx_fault`/`lol`/`temp_alarm`/`vcc_alarm`.
#[derive(Debug, Clone, Copy)]
pub struct Masks {
    pub los: LaneFlags,
    pub fault: LaneFlags,
    pub lol: LaneFlags,
    pub temp: ThresholdFlags,
    pub vcc: ThresholdFlags,
}

#[derive(Debug, Clone)]
pub struct LowerPage {
    pub identifier: u8,
    pub revision_compliance: u8,
    pub status: StatusFlags,

    pub los: LaneFlags,
    pub tx_fault: LaneFlags,
    pub lol: LaneFlags,

    pub temp_alarm: ThresholdFlags,
    pub vcc_alarm: ThresholdFlags,

    pub temp_celsius: f64,
    pub vcc_volts: f64,
    pub rx_power_mw: ChannelMonitor,
    pub tx_bias_ma: ChannelMonitor,
    pub tx_power_mw: ChannelMonitor,

    pub tx_disable: TxDisable,
    pub rate_select: u16,
    pub masks: Masks,
    pub page_select: u8,
}

/// Parses one 128-byte SFF-8636 lower memory page (offsets 0-127).
pub fn parse(page: &[u8; PAGE_SIZE]) -> LowerPage {
    LowerPage {
        identifier: page[0],
        revision_compliance: page[1],
        status: StatusFlags::from_bits_truncate(page[2]),

        los: LaneFlags::from_bits_truncate(page[3]),
        tx_fault: LaneFlags::from_bits_truncate(page[4]),
        lol: LaneFlags::from_bits_truncate(page[5]),

        temp_alarm: ThresholdFlags::from_bits_truncate(page[6]),
        vcc_alarm: ThresholdFlags::from_bits_truncate(page[7]),

        temp_celsius: temp_celsius(be16(page[22], page[23])),
        vcc_volts: vcc_volts(be16(page[26], page[27])),

        rx_power_mw: ChannelMonitor {
            lane: [
                rx_power_mw(be16(page[34], page[35])),
                rx_power_mw(be16(page[36], page[37])),
                rx_power_mw(be16(page[38], page[39])),
                rx_power_mw(be16(page[40], page[41])),
            ],
        },
        tx_bias_ma: ChannelMonitor {
            lane: [
                tx_bias_ma(be16(page[42], page[43])),
                tx_bias_ma(be16(page[44], page[45])),
                tx_bias_ma(be16(page[46], page[47])),
                tx_bias_ma(be16(page[48], page[49])),
            ],
        },
        tx_power_mw: ChannelMonitor {
            lane: [
                tx_power_mw(be16(page[50], page[51])),
                tx_power_mw(be16(page[52], page[53])),
                tx_power_mw(be16(page[54], page[55])),
                tx_power_mw(be16(page[56], page[57])),
            ],
        },

        tx_disable: TxDisable::from_bits_truncate(page[86]),
        rate_select: be16(page[87], page[88]),

        masks: Masks {
            los: LaneFlags::from_bits_truncate(page[100]),
            fault: LaneFlags::from_bits_truncate(page[101]),
            lol: LaneFlags::from_bits_truncate(page[102]),
            temp: ThresholdFlags::from_bits_truncate(page[103]),
            vcc: ThresholdFlags::from_bits_truncate(page[104]),
        },

        page_select: page[127],
    }
}
