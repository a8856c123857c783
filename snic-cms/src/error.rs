use thiserror::Error;

#[derive(Debug, Error)]
pub enum CmsError {
    #[error("CMS register map did not become ready within {0:?}")]
    RegMapTimeout(std::time::Duration),

    #[error("satellite controller did not become ready within {0:?}")]
    SatelliteControllerTimeout(std::time::Duration),

    #[error("mailbox did not become ready within {0:?}")]
    MailboxTimeout(std::time::Duration),

    #[error("mailbox error register did not clear within {0:?}")]
    ErrorClearTimeout(std::time::Duration),

    #[error("mailbox packet error {code}: {name}")]
    PacketError { code: u8, name: &'static str },

    #[error("satellite controller error {code}: {name}")]
    SatelliteControllerError { code: u8, name: &'static str },

    #[error("mailbox request exceeded all {attempts} attempts")]
    AttemptsExhausted { attempts: u32 },

    #[error("module at cage {cage} does not respond to I2C")]
    ModuleNotPresent { cage: u8 },

    #[error("module cage index {0} is out of range")]
    InvalidCage(u8),
}
