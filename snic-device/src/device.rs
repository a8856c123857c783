use std::sync::{Arc, Mutex};

use crate::bar2::Bar2;
use crate::bus_id::PciBusId;

/// One FPGA accelerator: a bus address, its mapped BAR2 register window, and
/// the coarse lock serializing multi-word CMS mailbox transactions.
///
/// All other hardware blocks (CMAC, switch, QDMA, P4 pipelines) are
/// word-atomic and need no lock of their own.
pub struct Device {
    pub bus_id: PciBusId,
    bar2: Arc<Bar2>,
    cms_lock: Mutex<()>,
}

impl Device {
    pub fn new(bus_id: PciBusId, bar2: Bar2) -> Self {
        Device {
            bus_id,
            bar2: Arc::new(bar2),
            cms_lock: Mutex::new(()),
        }
    }

    pub fn bar2(&self) -> &Bar2 {
        &self.bar2
    }

    pub fn bar2_handle(&self) -> Arc<Bar2> {
        self.bar2.clone()
    }

    /// Serializes one CMS mailbox transaction against every other
    /// transaction issued against this device.
    pub fn with_cms_lock<T>(&self, f: impl FnOnce() -> T) -> T {
        let _guard = self.cms_lock.lock().unwrap_or_else(|e| e.into_inner());
        f()
    }
}
