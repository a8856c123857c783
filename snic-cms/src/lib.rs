mod card_info;
mod cms;
mod error;
mod mailbox;
mod module;
mod profile;
mod regs;

pub use card_info::{CageType, CardInfo, ConfigMode, MAX_CAGES, MAX_LEGACY_MACS};
pub use cms::Cms;
pub use error::CmsError;
pub use mailbox::CmsBlock;
pub use module::{read_byte, read_gpio, read_page, write_byte, write_gpio};
pub use module::{ModuleGpio, ModuleGpioKind, ModuleId, MODULE_PAGE_SIZE};
pub use profile::CmsProfile;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn profile_decodes_known_ascii_codes() {
        assert_eq!(CmsProfile::from_reg(0x55323830), CmsProfile::U280);
        assert_eq!(CmsProfile::from_reg(0x5535354e), CmsProfile::U55);
        assert_eq!(CmsProfile::from_reg(0), CmsProfile::None);
    }

    #[test]
    fn card_info_parses_string_and_scalar_fields() {
        let mut payload = Vec::new();
        payload.extend_from_slice(&[0x21, 3]);
        payload.extend_from_slice(b"SN1");
        payload.extend_from_slice(&[0x29, 1, 2]); // TOTAL_POWER_AVAIL -> 225
        payload.extend_from_slice(&[0x2a, 1, 1]); // FAN_PRESENCE -> true

        let info = card_info::parse_card_info(&payload);
        assert_eq!(info.serial_number.as_deref(), Some("SN1"));
        assert_eq!(info.total_power_avail, Some(225));
        assert_eq!(info.fan_present, Some(true));
    }

    #[test]
    fn card_info_parses_cage_types() {
        let mut payload = Vec::new();
        payload.extend_from_slice(&[0x50, 1, 0]); // CAGE_TYPE_00 -> QSFP
        payload.extend_from_slice(&[0x51, 1, 2]); // CAGE_TYPE_01 -> SFP

        let info = card_info::parse_card_info(&payload);
        assert_eq!(info.cage_types[0], Some(CageType::Qsfp));
        assert_eq!(info.cage_types[1], Some(CageType::Sfp));
        assert_eq!(info.cage_types[2], None);
    }

    #[test]
    fn card_info_ignores_truncated_trailing_field() {
        let payload = vec![0x21, 10, b'x'];
        let info = card_info::parse_card_info(&payload);
        assert!(info.serial_number.is_none());
    }
}
