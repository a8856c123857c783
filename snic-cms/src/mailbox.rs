use std::sync::Arc;
use std::thread;
use std::time::Duration;

use snic_device::Bar2;

use crate::error::CmsError;
use crate::regs::{control, error as error_reg, host_status2, mailbox_header, status, mailbox_base};
use crate::regs::{CONTROL, ERROR, HOST_MSG_ERROR, HOST_MSG_OFFSET, HOST_STATUS2, MB_RESETN, STATUS};

const ITER_TIMEOUT: Duration = Duration::from_secs(2);
const ITER_DELAY: Duration = Duration::from_millis(100);
const MAX_ITER: u32 = (ITER_TIMEOUT.as_millis() / ITER_DELAY.as_millis()) as u32;
const MAX_ATTEMPTS: u32 = 5;

/// Delay after deasserting the microblaze reset to let it fully boot.
///
/// Without this, register reads can return stale values while the
/// microblaze is still booting; see original_source/libopennic/src/cms.c.
const BOOT_DELAY: Duration = Duration::from_secs(5);
const RESET_PULSE: Duration = Duration::from_millis(10);

fn poll_until(timeout_err: impl Fn(Duration) -> CmsError, mut predicate: impl FnMut() -> bool) -> Result<(), CmsError> {
    for _ in 0..MAX_ITER {
        if predicate() {
            return Ok(());
        }
        thread::sleep(ITER_DELAY);
    }
    Err(timeout_err(ITER_TIMEOUT))
}

/// Thin wrapper over the CMS block's register file, offering the mailbox
/// post protocol and lifecycle controls. Holds no lock of its own; callers
/// serialize access via [`snic_device::Device::with_cms_lock`].
pub struct CmsBlock {
    bar2: Arc<Bar2>,
    base: usize,
}

impl CmsBlock {
    pub fn new(bar2: Arc<Bar2>, base: usize) -> Self {
        CmsBlock { bar2, base }
    }

    fn reg_map_is_ready(&self) -> bool {
        self.bar2.read_u32(self.base + HOST_STATUS2) & host_status2::REG_MAP_READY != 0
    }

    fn sc_is_ready(&self) -> bool {
        match status::sat_ctrl_mode(self.bar2.read_u32(self.base + STATUS)) {
            status::SAT_CTRL_MODE_NORMAL | status::SAT_CTRL_MODE_NORMAL_SC_NOT_UPGRADABLE => true,
            _ => false,
        }
    }

    fn mailbox_is_ready(&self) -> bool {
        self.bar2.read_u32(self.base + CONTROL) & control::MAILBOX_MSG_STATUS == 0
    }

    fn error_is_cleared(&self) -> bool {
        self.bar2.read_u32(self.base + CONTROL) & control::RESET_ERROR_REG == 0
    }

    fn clear_error(&self) {
        let mut v = self.bar2.read_u32(self.base + CONTROL);
        v |= control::RESET_ERROR_REG;
        self.bar2.write_u32(self.base + CONTROL, v);
        self.bar2.barrier();
    }

    pub fn is_ready(&self) -> Result<(), CmsError> {
        poll_until(CmsError::RegMapTimeout, || self.reg_map_is_ready())?;
        poll_until(CmsError::SatelliteControllerTimeout, || self.sc_is_ready())?;
        poll_until(CmsError::MailboxTimeout, || self.mailbox_is_ready())?;
        Ok(())
    }

    fn reset_assert(&self) {
        self.bar2.write_u32(self.base + MB_RESETN, 0);
        self.bar2.barrier();
    }

    fn reset_deassert(&self) {
        self.bar2.write_u32(self.base + MB_RESETN, 1);
        self.bar2.barrier();
    }

    fn reset_release(&self) {
        if self.bar2.read_u32(self.base + MB_RESETN) == 0 {
            self.reset_deassert();
            thread::sleep(BOOT_DELAY);
        }
    }

    /// Pulses the embedded microblaze's reset line and waits for it to come
    /// back up. Blocks for roughly [`BOOT_DELAY`].
    pub fn reset(&self) -> Result<(), CmsError> {
        self.reset_assert();
        thread::sleep(RESET_PULSE);
        self.reset_release();
        self.is_ready()
    }

    /// Releases the reset line if held and waits for readiness, without
    /// forcing a fresh reset pulse.
    pub fn enable(&self) -> Result<(), CmsError> {
        self.reset_release();
        self.is_ready()
    }

    pub fn disable(&self) {
        self.reset_assert();
    }

    pub fn profile_name_reg(&self) -> u32 {
        self.bar2.read_u32(self.base + crate::regs::PROFILE_NAME)
    }

    fn mailbox_offset(&self) -> usize {
        mailbox_base(self.bar2.read_u32(self.base + HOST_MSG_OFFSET))
    }

    /// Posts `opcode` with `payload` words and returns the response header's
    /// length plus up to `max_response_words` of its payload, retrying up to
    /// [`MAX_ATTEMPTS`] times on any transient mailbox error.
    pub fn post(
        &self,
        opcode: u8,
        payload: &[u32],
        max_response_words: usize,
    ) -> Result<(u16, Vec<u32>), CmsError> {
        let mut last_err = None;

        for attempt in 1..=MAX_ATTEMPTS {
            match self.post_once(opcode, payload, max_response_words) {
                Ok(result) => return Ok(result),
                Err(e) => {
                    log::warn!("CMS mailbox attempt {attempt}/{MAX_ATTEMPTS} failed: {e}");
                    last_err = Some(e);
                }
            }
        }

        Err(last_err.unwrap_or(CmsError::AttemptsExhausted {
            attempts: MAX_ATTEMPTS,
        }))
    }

    fn post_once(
        &self,
        opcode: u8,
        payload: &[u32],
        max_response_words: usize,
    ) -> Result<(u16, Vec<u32>), CmsError> {
        poll_until(CmsError::MailboxTimeout, || self.mailbox_is_ready())?;

        self.clear_error();
        poll_until(CmsError::ErrorClearTimeout, || self.error_is_cleared())?;

        let mailbox = self.mailbox_offset();
        let header = mailbox_header::encode(opcode, (payload.len() * 4) as u16);
        self.bar2.write_u32(mailbox, header);
        for (n, word) in payload.iter().enumerate() {
            self.bar2.write_u32(mailbox + 4 + n * 4, *word);
        }
        self.bar2.barrier();

        let mut ctl = self.bar2.read_u32(self.base + CONTROL);
        ctl |= control::MAILBOX_MSG_STATUS;
        self.bar2.write_u32(self.base + CONTROL, ctl);
        self.bar2.barrier();

        poll_until(CmsError::MailboxTimeout, || self.mailbox_is_ready())?;

        let err = self.bar2.read_u32(self.base + ERROR);
        if err & error_reg::PKT_ERROR != 0 {
            let code = self.bar2.read_u32(self.base + HOST_MSG_ERROR) as u8;
            return Err(CmsError::PacketError {
                code,
                name: msg_error_name(code),
            });
        }
        if err & error_reg::SAT_CTRL_ERR != 0 {
            let code = error_reg::sat_ctrl_err_code(err) as u8;
            return Err(CmsError::SatelliteControllerError {
                code,
                name: sc_error_name(code),
            });
        }

        let resp_header = self.bar2.read_u32(mailbox);
        let resp_len = mailbox_header::length(resp_header);
        let nwords = (resp_len as usize + 3) / 4;
        let take = nwords.min(max_response_words);
        let words = (0..take)
            .map(|n| self.bar2.read_u32(mailbox + 4 + n * 4))
            .collect();

        Ok((resp_len, words))
    }
}

fn msg_error_name(code: u8) -> &'static str {
    match code {
        0 => "NONE",
        1 => "BAD_OPCODE_ERR",
        2 => "BRD_INFO_MISSING_ERR",
        3 => "LENGTH_ERR",
        4 => "SAT_FW_WRITE_FAIL",
        5 => "SAT_FW_UPDATE_FAIL",
        6 => "SAT_FW_LOAD_FAIL",
        7 => "SAT_FW_ERASE_FAIL",
        8 => "RESERVED0",
        9 => "CSDR_FAILED",
        10 => "QSFP_FAIL",
        _ => "UNKNOWN",
    }
}

fn sc_error_name(code: u8) -> &'static str {
    match code {
        0 => "NONE",
        1 => "SAT_COMMS_CHKUM_ERR",
        2 => "SAT_COMMS_EOP_ERR",
        3 => "SAT_COMMS_SOP_ERR",
        4 => "SAT_COMMS_ESQ_SEQ_ERR",
        5 => "SAT_COMMS_BAD_MSG_ID",
        6 => "SAT_COMMS_BAD_VERSION",
        7 => "SAT_COMMS_RX_BUF_OVERFLOW",
        8 => "SAT_COMMS_BAD_SENSOR_ID",
        9 => "SAT_COMMS_NS_MSG_ID",
        10 => "SAT_COMMS_SC_FUN_ERR",
        11 => "SAT_COMMS_FAIL_TO_EN_BSL",
        _ => "UNKNOWN",
    }
}

pub mod opcode {
    pub const CARD_INFO_REQ: u8 = 0x04;
    pub const BLOCK_READ_MODULE_I2C: u8 = 0x0b;
    pub const READ_MODULE_LOW_SPEED_IO: u8 = 0x0d;
    pub const WRITE_MODULE_LOW_SPEED_IO: u8 = 0x0e;
    pub const BYTE_READ_MODULE_I2C: u8 = 0x0f;
    pub const BYTE_WRITE_MODULE_I2C: u8 = 0x10;
}
