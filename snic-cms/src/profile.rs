#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmsProfile {
    None,
    U200U250,
    U280,
    U50,
    U55,
    Ul3524,
    U45n,
    X3522,
}

impl CmsProfile {
    /// Maps the 4-byte ASCII `profile_name_reg` code to a known profile.
    /// Unrecognized codes (including freshly-reset cards) map to `None`.
    pub fn from_reg(reg: u32) -> Self {
        match reg {
            0x55325858 => CmsProfile::U200U250,
            0x55323830 => CmsProfile::U280,
            0x55353041 => CmsProfile::U50,
            0x5535354e => CmsProfile::U55,
            0x55333234 => CmsProfile::Ul3524,
            0x55323641 => CmsProfile::U45n,
            0x58334100 => CmsProfile::X3522,
            _ => CmsProfile::None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            CmsProfile::None => "NONE",
            CmsProfile::U200U250 => "U200_U250",
            CmsProfile::U280 => "U280",
            CmsProfile::U50 => "U50",
            CmsProfile::U55 => "U55",
            CmsProfile::Ul3524 => "UL3524",
            CmsProfile::U45n => "U45N",
            CmsProfile::X3522 => "X3522",
        }
    }
}
