use std::sync::Arc;

use snic_device::Device;

use crate::card_info::{parse_card_info, CardInfo};
use crate::error::CmsError;
use crate::mailbox::{opcode, CmsBlock};
use crate::profile::CmsProfile;

/// High-level CMS client for one device: lifecycle control plus the mailbox
/// operations layered on top of it. All operations are serialized against
/// the device's CMS lock.
pub struct Cms {
    device: Arc<Device>,
    block: CmsBlock,
}

impl Cms {
    pub fn new(device: Arc<Device>, base: usize) -> Self {
        let bar2 = device.bar2_handle();
        Cms {
            device,
            block: CmsBlock::new(bar2, base),
        }
    }

    pub fn is_ready(&self) -> Result<(), CmsError> {
        self.device.with_cms_lock(|| self.block.is_ready())
    }

    pub fn reset(&self) -> Result<(), CmsError> {
        self.device.with_cms_lock(|| self.block.reset())
    }

    pub fn enable(&self) -> Result<(), CmsError> {
        self.device.with_cms_lock(|| self.block.enable())
    }

    pub fn disable(&self) {
        self.device.with_cms_lock(|| self.block.disable())
    }

    pub fn profile(&self) -> CmsProfile {
        self.device
            .with_cms_lock(|| CmsProfile::from_reg(self.block.profile_name_reg()))
    }

    pub fn card_info(&self) -> Result<CardInfo, CmsError> {
        self.device.with_cms_lock(|| {
            let (len, words) = self.block.post(opcode::CARD_INFO_REQ, &[], 256)?;
            let mut bytes = Vec::with_capacity(words.len() * 4);
            for w in &words {
                bytes.extend_from_slice(&w.to_le_bytes());
            }
            bytes.truncate(len as usize);
            let mut info = parse_card_info(&bytes);
            info.profile = Some(CmsProfile::from_reg(self.block.profile_name_reg()));
            Ok(info)
        })
    }

    pub fn block(&self) -> &CmsBlock {
        &self.block
    }
}
