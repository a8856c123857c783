use std::sync::Arc;

use snic_device::Bar2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InterfaceType {
    Port,
    Host,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InterfaceId {
    pub kind: InterfaceType,
    pub index: u8,
}

impl InterfaceId {
    pub fn port(index: u8) -> Self {
        InterfaceId { kind: InterfaceType::Port, index }
    }

    pub fn host(index: u8) -> Self {
        InterfaceId { kind: InterfaceType::Host, index }
    }

    /// Hardware TID: 0=CMAC0, 1=CMAC1, 2=HOST0, 3=HOST1.
    fn tid(self) -> Option<usize> {
        match (self.kind, self.index) {
            (InterfaceType::Port, 0) => Some(0),
            (InterfaceType::Port, 1) => Some(1),
            (InterfaceType::Host, 0) => Some(2),
            (InterfaceType::Host, 1) => Some(3),
            _ => None,
        }
    }

    fn from_tid(tid: u32) -> Option<Self> {
        match tid {
            0 => Some(InterfaceId::port(0)),
            1 => Some(InterfaceId::port(1)),
            2 => Some(InterfaceId::host(0)),
            3 => Some(InterfaceId::host(1)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessorType {
    Bypass,
    Drop,
    App(u8),
}

const TDEST_DROP: u32 = 0;
const TDEST_BYPASS: u32 = 1;
const TDEST_APP0: u32 = 2;
const TDEST_APP1: u32 = 3;

impl ProcessorType {
    fn to_tdest(self) -> Option<u32> {
        match self {
            ProcessorType::Drop => Some(TDEST_DROP),
            ProcessorType::Bypass => Some(TDEST_BYPASS),
            ProcessorType::App(0) => Some(TDEST_APP0),
            ProcessorType::App(1) => Some(TDEST_APP1),
            ProcessorType::App(_) => None,
        }
    }

    fn from_tdest(tdest: u32) -> Option<Self> {
        match tdest {
            TDEST_DROP => Some(ProcessorType::Drop),
            TDEST_BYPASS => Some(ProcessorType::Bypass),
            TDEST_APP0 => Some(ProcessorType::App(0)),
            TDEST_APP1 => Some(ProcessorType::App(1)),
            _ => None,
        }
    }
}

const NUM_INTERFACES: usize = 4;

mod regs {
    pub const IGR_SW_TDEST: usize = 0x00; // 4 words, indexed by source TID
    pub const BYPASS_TDEST: usize = 0x10; // 4 words
    pub const APP_0_TDEST_REMAP: usize = 0x20; // 4 words
    pub const APP_1_TDEST_REMAP: usize = 0x30; // 4 words
}

/// Ingress/egress selector programming for the packet switch: which
/// processor a source interface's traffic is steered to, and where each
/// processor's output is remapped to.
pub struct Switch {
    bar2: Arc<Bar2>,
    base: usize,
}

impl Switch {
    pub fn new(bar2: Arc<Bar2>, base: usize) -> Self {
        Switch { bar2, base }
    }

    fn egress_table_base(&self, on: ProcessorType) -> Option<usize> {
        match on {
            ProcessorType::Bypass => Some(regs::BYPASS_TDEST),
            ProcessorType::App(0) => Some(regs::APP_0_TDEST_REMAP),
            ProcessorType::App(1) => Some(regs::APP_1_TDEST_REMAP),
            ProcessorType::App(_) | ProcessorType::Drop => None,
        }
    }

    pub fn set_ingress_connection(&self, from: InterfaceId, to: ProcessorType) -> bool {
        let (Some(tid), Some(tdest)) = (from.tid(), to.to_tdest()) else {
            return false;
        };
        self.bar2
            .write_u32(self.base + regs::IGR_SW_TDEST + tid * 4, tdest);
        true
    }

    pub fn get_ingress_connection(&self, from: InterfaceId) -> Option<ProcessorType> {
        let tid = from.tid()?;
        let tdest = self.bar2.read_u32(self.base + regs::IGR_SW_TDEST + tid * 4);
        ProcessorType::from_tdest(tdest)
    }

    pub fn set_egress_connection(
        &self,
        on: ProcessorType,
        from: InterfaceId,
        to: InterfaceId,
    ) -> bool {
        let (Some(table), Some(tid), Some(tid_to)) = (self.egress_table_base(on), from.tid(), to.tid()) else {
            return false;
        };
        self.bar2
            .write_u32(self.base + table + tid * 4, tid_to as u32);
        true
    }

    pub fn get_egress_connection(&self, on: ProcessorType, from: InterfaceId) -> Option<InterfaceId> {
        let table = self.egress_table_base(on)?;
        let tid = from.tid()?;
        let raw = self.bar2.read_u32(self.base + table + tid * 4);
        InterfaceId::from_tid(raw)
    }

    /// Resets every ingress connection to `DROP`, barriers, then applies
    /// the canonical one-to-one mapping: CMAC0<->HOST0 and CMAC1<->HOST1
    /// via application processor 0, with each host's own ingress routed to
    /// bypass.
    pub fn set_defaults_one_to_one(&self) {
        for tid in 0..NUM_INTERFACES {
            self.bar2
                .write_u32(self.base + regs::IGR_SW_TDEST + tid * 4, TDEST_DROP);
        }
        self.bar2.barrier();

        let ingress_defaults = [
            (InterfaceId::port(0), ProcessorType::App(0)),
            (InterfaceId::port(1), ProcessorType::App(0)),
            (InterfaceId::host(0), ProcessorType::Bypass),
            (InterfaceId::host(1), ProcessorType::Bypass),
        ];
        for (from, to) in ingress_defaults {
            self.set_ingress_connection(from, to);
        }

        let bypass_defaults = [
            (InterfaceId::port(0), InterfaceId::host(0)),
            (InterfaceId::port(1), InterfaceId::host(1)),
            (InterfaceId::host(0), InterfaceId::port(0)),
            (InterfaceId::host(1), InterfaceId::port(1)),
        ];
        for (from, to) in bypass_defaults {
            self.set_egress_connection(ProcessorType::Bypass, from, to);
        }

        let app0_defaults = [
            (InterfaceId::port(0), InterfaceId::host(0)),
            (InterfaceId::port(1), InterfaceId::host(1)),
            (InterfaceId::host(0), InterfaceId::port(0)),
            (InterfaceId::host(1), InterfaceId::port(1)),
        ];
        for (from, to) in app0_defaults {
            self.set_egress_connection(ProcessorType::App(0), from, to);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interface_tid_round_trips() {
        for intf in [
            InterfaceId::port(0),
            InterfaceId::port(1),
            InterfaceId::host(0),
            InterfaceId::host(1),
        ] {
            let tid = intf.tid().unwrap();
            assert_eq!(InterfaceId::from_tid(tid as u32), Some(intf));
        }
    }

    #[test]
    fn processor_tdest_round_trips() {
        for proc in [ProcessorType::Bypass, ProcessorType::Drop, ProcessorType::App(0), ProcessorType::App(1)] {
            let tdest = proc.to_tdest().unwrap();
            assert_eq!(ProcessorType::from_tdest(tdest), Some(proc));
        }
    }

    #[test]
    fn unsupported_app_index_has_no_tdest() {
        assert_eq!(ProcessorType::App(2).to_tdest(), None);
    }
}
