use std::collections::HashSet;
use std::sync::RwLock;

/// Recognized values for `SetDebugFlag`'s `flag` field. Unknown names are
/// rejected with `EC_SERVER_INVALID_DEBUG_FLAG` rather than silently
/// accepted, mirroring the original agent's fixed `ServerDebugFlag` enum.
const KNOWN_FLAGS: &[&str] = &["DEVICE_INFO", "PORT_CONFIG", "HOST_CONFIG", "SWITCH_CONFIG", "MODULE_INFO", "BATCH", "STATS"];

pub struct DebugFlags {
    enabled: RwLock<HashSet<&'static str>>,
}

impl DebugFlags {
    pub fn new() -> Self {
        DebugFlags { enabled: RwLock::new(HashSet::new()) }
    }

    pub fn enabled(&self, flag: &str) -> bool {
        self.enabled.read().unwrap().contains(flag)
    }

    /// Returns `false` if `flag` isn't one of `KNOWN_FLAGS`.
    pub fn set(&self, flag: &str, on: bool) -> bool {
        let Some(&known) = KNOWN_FLAGS.iter().find(|&&f| f == flag) else {
            return false;
        };
        let mut set = self.enabled.write().unwrap();
        if on {
            set.insert(known);
        } else {
            set.remove(known);
        }
        true
    }
}
