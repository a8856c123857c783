use std::str::FromStr;
use std::sync::Arc;

use snic_cms::Cms;
use snic_device::{Bar2, Device, PciBusId};
use snic_hw::{Host, Port, Switch};

/// Register-space layout for the blocks this agent manages. Offsets are the
/// fixed BAR2 windows the bitstream places these blocks at; they are not
/// configurable per device.
mod base {
    pub const CMS: usize = 0x0000;
    pub const SWITCH: usize = 0x1_0000;
    pub const PORT: [usize; 2] = [0x2_0000, 0x2_1000];
    pub const HOST: [usize; 2] = [0x3_0000, 0x3_1000];
}

/// One managed card: its register window plus the block drivers layered on
/// top of it. `nports`/`nhosts` both fixed at 2 for the dual-CMAC,
/// dual-PF card profile.
pub struct ManagedDevice {
    pub bus_id: PciBusId,
    pub device: Arc<Device>,
    pub cms: Cms,
    pub switch: Switch,
    pub ports: [Port; 2],
    pub hosts: [Host; 2],
}

impl ManagedDevice {
    fn open(bus_id: PciBusId) -> Result<Self, String> {
        let resource_path = bus_id.resource_path(2);
        let bar2 = Bar2::open(&resource_path)
            .map_err(|e| format!("failed to map BAR2 for {bus_id}: {e}"))?;
        let device = Arc::new(Device::new(bus_id, bar2));
        let handle = device.bar2_handle();

        Ok(ManagedDevice {
            bus_id,
            cms: Cms::new(device.clone(), base::CMS),
            switch: Switch::new(handle.clone(), base::SWITCH),
            ports: [
                Port::new(handle.clone(), base::PORT[0]),
                Port::new(handle.clone(), base::PORT[1]),
            ],
            hosts: [
                Host::new(handle.clone(), base::HOST[0]),
                Host::new(handle.clone(), base::HOST[1]),
            ],
            device,
        })
    }
}

/// The set of devices this agent instance is responsible for, indexed by
/// the `dev_id` RPC clients address them with (position in the `--bus-ids`
/// argument list).
pub struct Fleet {
    pub devices: Vec<ManagedDevice>,
}

impl Fleet {
    pub fn open(bus_ids: &[String]) -> Result<Self, String> {
        let mut devices = Vec::with_capacity(bus_ids.len());
        for raw in bus_ids {
            let bus_id = PciBusId::from_str(raw).map_err(|e| e.to_string())?;
            devices.push(ManagedDevice::open(bus_id)?);
        }
        Ok(Fleet { devices })
    }

    /// `dev_id == -1` means "every device"; any other value must name one
    /// device by its position in the fleet.
    pub fn resolve(&self, dev_id: i32) -> Result<Vec<(i32, &ManagedDevice)>, ()> {
        if dev_id == -1 {
            return Ok(self.devices.iter().enumerate().map(|(i, d)| (i as i32, d)).collect());
        }
        self.devices
            .get(dev_id as usize)
            .map(|d| vec![(dev_id, d)])
            .ok_or(())
    }
}
