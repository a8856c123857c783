use std::collections::HashSet;
use std::sync::RwLock;

/// Mirrors the original agent's `ServerDebugFlag` enum (server.cpp).
const KNOWN_FLAGS: &[&str] = &["PIPELINE_INFO", "TABLE_CLEAR", "TABLE_RULE_INSERT", "TABLE_RULE_DELETE", "BATCH", "STATS"];

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
