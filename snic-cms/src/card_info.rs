use crate::profile::CmsProfile;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigMode {
    SlaveSerialX1,
    SlaveSelectMapX8,
    SlaveSelectMapX16,
    SlaveSelectMapX32,
    JtagBoundaryScanX1,
    MasterSpiX1,
    MasterSpiX2,
    MasterSpiX4,
    MasterSpiX8,
    MasterBpiX8,
    MasterBpiX16,
    MasterSerialX1,
    MasterSelectMapX8,
    MasterSelectMapX16,
    Unknown(u8),
}

impl ConfigMode {
    fn from_u8(v: u8) -> Self {
        match v {
            0 => ConfigMode::SlaveSerialX1,
            1 => ConfigMode::SlaveSelectMapX8,
            2 => ConfigMode::SlaveSelectMapX16,
            3 => ConfigMode::SlaveSelectMapX32,
            4 => ConfigMode::JtagBoundaryScanX1,
            5 => ConfigMode::MasterSpiX1,
            6 => ConfigMode::MasterSpiX2,
            7 => ConfigMode::MasterSpiX4,
            8 => ConfigMode::MasterSpiX8,
            9 => ConfigMode::MasterBpiX8,
            10 => ConfigMode::MasterBpiX16,
            11 => ConfigMode::MasterSerialX1,
            12 => ConfigMode::MasterSelectMapX8,
            13 => ConfigMode::MasterSelectMapX16,
            other => ConfigMode::Unknown(other),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CageType {
    Qsfp,
    Dsfp,
    Sfp,
    Unknown(u8),
}

impl CageType {
    fn from_u8(v: u8) -> Self {
        match v {
            0 => CageType::Qsfp,
            1 => CageType::Dsfp,
            2 => CageType::Sfp,
            other => CageType::Unknown(other),
        }
    }
}

pub const MAX_CAGES: usize = 4;
pub const MAX_LEGACY_MACS: usize = 4;

#[derive(Debug, Clone, Default)]
pub struct CardInfo {
    pub profile: Option<CmsProfile>,
    pub name: Option<String>,
    pub serial_number: Option<String>,
    pub revision: Option<String>,
    pub sc_version: Option<String>,
    pub fan_present: Option<bool>,
    pub total_power_avail: Option<u32>,
    pub config_mode: Option<ConfigMode>,
    pub cage_types: [Option<CageType>; MAX_CAGES],
    pub legacy_mac_addrs: [Option<[u8; 6]>; MAX_LEGACY_MACS],
    pub mac_block_count: Option<u8>,
    pub mac_block_base: Option<[u8; 6]>,
}

mod key {
    pub const CARD_SN: u8 = 0x21;
    pub const MAC_ADDRESS0: u8 = 0x22;
    pub const MAC_ADDRESS1: u8 = 0x23;
    pub const MAC_ADDRESS2: u8 = 0x24;
    pub const MAC_ADDRESS3: u8 = 0x25;
    pub const CARD_REV: u8 = 0x26;
    pub const CARD_NAME: u8 = 0x27;
    pub const SAT_VERSION: u8 = 0x28;
    pub const TOTAL_POWER_AVAIL: u8 = 0x29;
    pub const FAN_PRESENCE: u8 = 0x2a;
    pub const CONFIG_MODE: u8 = 0x2b;
    pub const NEW_MAC_SCHEME: u8 = 0x4b;
    pub const CAGE_TYPE_00: u8 = 0x50;
    pub const CAGE_TYPE_01: u8 = 0x51;
    pub const CAGE_TYPE_02: u8 = 0x52;
    pub const CAGE_TYPE_03: u8 = 0x53;
}

fn parse_mac_str(s: &str) -> Option<[u8; 6]> {
    let mut mac = [0u8; 6];
    let mut parts = s.split(':');
    for slot in mac.iter_mut() {
        *slot = u8::from_str_radix(parts.next()?.trim(), 16).ok()?;
    }
    if parts.next().is_some() {
        return None;
    }
    Some(mac)
}

fn c_str(bytes: &[u8]) -> String {
    let end = bytes.iter().position(|b| *b == 0).unwrap_or(bytes.len());
    String::from_utf8_lossy(&bytes[..end]).into_owned()
}

/// Parses the TLV-encoded `CARD_INFO_REQ` response payload.
///
/// `payload` is the raw response bytes (header word's declared length); each
/// field is `[key: u8][length: u8][value: length bytes]`.
pub fn parse_card_info(payload: &[u8]) -> CardInfo {
    let mut info = CardInfo::default();
    let mut pos = 0usize;

    while pos + 2 <= payload.len() {
        let field_key = payload[pos];
        let len = payload[pos + 1] as usize;
        let value_start = pos + 2;
        let value_end = value_start + len;
        if value_end > payload.len() {
            break;
        }
        let value = &payload[value_start..value_end];

        match field_key {
            key::CARD_SN => info.serial_number = Some(c_str(value)),
            key::CARD_REV => info.revision = Some(c_str(value)),
            key::CARD_NAME => info.name = Some(c_str(value)),
            key::SAT_VERSION => info.sc_version = Some(c_str(value)),
            key::TOTAL_POWER_AVAIL if len == 1 => {
                info.total_power_avail = match value[0] {
                    0 => Some(75),
                    1 => Some(150),
                    2 => Some(225),
                    4 => Some(300),
                    _ => None,
                };
            }
            key::FAN_PRESENCE if len == 1 => info.fan_present = Some(value[0] != 0),
            key::CONFIG_MODE if len == 1 => info.config_mode = Some(ConfigMode::from_u8(value[0])),
            key::MAC_ADDRESS0 | key::MAC_ADDRESS1 | key::MAC_ADDRESS2 | key::MAC_ADDRESS3
                if len == 18 =>
            {
                let n = (field_key - key::MAC_ADDRESS0) as usize;
                if n < MAX_LEGACY_MACS {
                    info.legacy_mac_addrs[n] = parse_mac_str(&c_str(value));
                }
            }
            key::NEW_MAC_SCHEME if len == 8 => {
                info.mac_block_count = Some(value[0]);
                let mut base = [0u8; 6];
                base.copy_from_slice(&value[2..8]);
                info.mac_block_base = Some(base);
            }
            key::CAGE_TYPE_00 | key::CAGE_TYPE_01 | key::CAGE_TYPE_02 | key::CAGE_TYPE_03
                if len == 1 =>
            {
                let n = (field_key - key::CAGE_TYPE_00) as usize;
                if n < MAX_CAGES {
                    info.cage_types[n] = Some(CageType::from_u8(value[0]));
                }
            }
            _ => {}
        }

        pos = value_end;
    }

    info
}
