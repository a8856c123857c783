use crate::error::CmsError;
use crate::mailbox::{opcode, CmsBlock};

pub const MODULE_PAGE_SIZE: usize = 128;

/// Identifies one addressable page of one QSFP/DSFP/SFP cage's memory map.
#[derive(Debug, Clone, Copy)]
pub struct ModuleId {
    pub cage: u8,
    pub page: u8,
    pub upper: bool,
    pub cmis: bool,
    pub bank: u8,
    pub sfp_diag: bool,
}

impl ModuleId {
    /// Packs cage/page/upper/diag/bank into the single select word our
    /// mailbox layout carries it in (the original spans 3 words; we fold
    /// the bitfields that matter into one since the rest is reserved).
    fn select_word(&self, page_override: Option<u8>) -> u32 {
        let page = page_override.unwrap_or(if self.upper { self.page } else { 0 });
        let bank = if self.cmis { self.bank as u32 } else { 0 };
        ((self.cage as u32) & 0x3)
            | ((page as u32) << 8)
            | ((self.upper as u32) << 16)
            | ((self.sfp_diag as u32) << 17)
            | ((self.cmis as u32) << 18)
            | (bank << 19)
    }
}

/// Reads one 128-byte page (lower or upper, per `id.upper`) of module memory.
pub fn read_page(cms: &CmsBlock, id: &ModuleId) -> Result<[u8; MODULE_PAGE_SIZE], CmsError> {
    let request = [id.select_word(None), 0, 0];
    let (_len, words) = cms.post(opcode::BLOCK_READ_MODULE_I2C, &request, 1 + MODULE_PAGE_SIZE / 4)?;

    if words.is_empty() {
        return Err(CmsError::ModuleNotPresent { cage: id.cage });
    }
    let reported_size = words[0] as usize;
    if reported_size != MODULE_PAGE_SIZE {
        return Err(CmsError::ModuleNotPresent { cage: id.cage });
    }

    let mut page = [0u8; MODULE_PAGE_SIZE];
    for (n, word) in words[1..].iter().enumerate().take(MODULE_PAGE_SIZE / 4) {
        page[n * 4..n * 4 + 4].copy_from_slice(&word.to_le_bytes());
    }
    Ok(page)
}

pub fn read_byte(cms: &CmsBlock, id: &ModuleId, offset: u8) -> Result<u8, CmsError> {
    let upper = offset as usize >= MODULE_PAGE_SIZE;
    let select = id.select_word(Some(if upper { id.page } else { 0 }));
    let request = [select, offset as u32, 0];
    let (_len, words) = cms.post(opcode::BYTE_READ_MODULE_I2C, &request, 1)?;
    words
        .first()
        .map(|w| *w as u8)
        .ok_or(CmsError::ModuleNotPresent { cage: id.cage })
}

pub fn write_byte(cms: &CmsBlock, id: &ModuleId, offset: u8, value: u8) -> Result<(), CmsError> {
    let upper = offset as usize >= MODULE_PAGE_SIZE;
    let select = id.select_word(Some(if upper { id.page } else { 0 }));
    let request = [select, offset as u32, value as u32];
    cms.post(opcode::BYTE_WRITE_MODULE_I2C, &request, 0)?;
    Ok(())
}

/// Low-speed GPIO lines for one cage, decoded per module family.
///
/// Active-low pins (`*_l` on QSFP) are inverted here so that the field
/// always reads `true` == asserted, matching the DSFP naming convention.
#[derive(Debug, Clone, Copy)]
pub enum ModuleGpio {
    Sfp { present: bool },
    Dsfp { reset: bool, low_power_mode: bool, present: bool, interrupt: bool },
    Qsfp {
        reset: bool,
        low_power_mode: bool,
        select: bool,
        present: bool,
        interrupt: bool,
    },
}

pub fn read_gpio(cms: &CmsBlock, cage: u8, kind: ModuleGpioKind) -> Result<ModuleGpio, CmsError> {
    let request = [(cage as u32) & 0x3, 0, 0];
    let (_len, words) = cms.post(opcode::READ_MODULE_LOW_SPEED_IO, &request, 2)?;
    let raw = *words.get(1).or_else(|| words.get(0)).ok_or(CmsError::InvalidCage(cage))?;

    Ok(match kind {
        ModuleGpioKind::Sfp => ModuleGpio::Sfp {
            present: raw & (1 << 3) != 0,
        },
        ModuleGpioKind::Dsfp => ModuleGpio::Dsfp {
            reset: raw & (1 << 0) != 0,
            low_power_mode: raw & (1 << 1) != 0,
            present: raw & (1 << 3) != 0,
            interrupt: raw & (1 << 4) != 0,
        },
        ModuleGpioKind::Qsfp => ModuleGpio::Qsfp {
            reset: raw & (1 << 0) == 0,
            low_power_mode: raw & (1 << 1) != 0,
            select: raw & (1 << 2) == 0,
            present: raw & (1 << 3) == 0,
            interrupt: raw & (1 << 4) == 0,
        },
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModuleGpioKind {
    Sfp,
    Dsfp,
    Qsfp,
}

pub fn write_gpio(cms: &CmsBlock, cage: u8, gpio: &ModuleGpio) -> Result<(), CmsError> {
    let second = match gpio {
        ModuleGpio::Dsfp { reset, low_power_mode, .. } => {
            (*reset as u32) | ((*low_power_mode as u32) << 1)
        }
        ModuleGpio::Qsfp { reset, low_power_mode, .. } => {
            ((!*reset as u32) & 0x1) | ((*low_power_mode as u32) << 1)
        }
        ModuleGpio::Sfp { .. } => return Err(CmsError::InvalidCage(cage)),
    };
    let request = [(cage as u32) & 0x3, second, 0];
    cms.post(opcode::WRITE_MODULE_LOW_SPEED_IO, &request, 0)?;
    Ok(())
}
