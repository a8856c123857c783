use snic_cms::CmsError;
use snic_proto::sn::v2::ErrorCode;

/// Maps a CMS mailbox failure onto the stable numeric error taxonomy:
/// timeouts and exhausted retries surface as busy/io, while in-band error
/// codes reported by the controller keep their sub-code via the log line
/// (the wire `ErrorCode` itself carries no payload).
pub fn cms_error_code(err: &CmsError) -> ErrorCode {
    match err {
        CmsError::RegMapTimeout(_)
        | CmsError::SatelliteControllerTimeout(_)
        | CmsError::MailboxTimeout(_)
        | CmsError::ErrorClearTimeout(_) => ErrorCode::CmsBusy,
        CmsError::AttemptsExhausted { .. } => ErrorCode::CmsIo,
        CmsError::PacketError { code, name } => {
            log::warn!("CMS packet error {code}: {name}");
            ErrorCode::CmsMsgError
        }
        CmsError::SatelliteControllerError { code, name } => {
            log::warn!("CMS satellite controller error {code}: {name}");
            ErrorCode::CmsScError
        }
        CmsError::ModuleNotPresent { cage } => {
            log::warn!("module at cage {cage} not present");
            ErrorCode::ModulePageRead
        }
        CmsError::InvalidCage(cage) => {
            log::warn!("cage index {cage} out of range");
            ErrorCode::InvalidModuleId
        }
    }
}

#[cfg(test)]
mod test {
    use std::time::Duration;

    use super::*;

    #[test]
    fn timeouts_map_to_busy() {
        assert_eq!(cms_error_code(&CmsError::RegMapTimeout(Duration::from_secs(1))), ErrorCode::CmsBusy);
        assert_eq!(cms_error_code(&CmsError::MailboxTimeout(Duration::from_secs(1))), ErrorCode::CmsBusy);
    }

    #[test]
    fn attempts_exhausted_maps_to_io() {
        assert_eq!(cms_error_code(&CmsError::AttemptsExhausted { attempts: 3 }), ErrorCode::CmsIo);
    }

    #[test]
    fn invalid_cage_maps_to_invalid_module_id() {
        assert_eq!(cms_error_code(&CmsError::InvalidCage(9)), ErrorCode::InvalidModuleId);
    }
}
