use std::str::FromStr;
use std::sync::{Arc, Mutex};

use snic_device::{Bar2, Device, PciBusId};
use snic_p4::{PipelineFacade, PipelineInfo};
use snic_stats::StatsTree;

use crate::vendor_ffi::FfiVendor;

/// Fixed per-pipeline BAR2 windows the bitstream places the `snp4` target
/// register block at. Not configurable per device; no concrete offsets are
/// given elsewhere, so this mirrors `sn-cfg-agent::fleet::base`.
const PIPELINE_BASE: [usize; 4] = [0x10_0000, 0x11_0000, 0x12_0000, 0x13_0000];

pub struct ManagedPipeline {
    pub pipeline_id: i32,
    pub facade: Arc<Mutex<PipelineFacade>>,
    /// Stats domain this pipeline is registered under; `dev{dev_id}_pipe{id}`.
    pub domain_name: &'static str,
}

pub struct ManagedDevice {
    pub bus_id: PciBusId,
    pub device: Arc<Device>,
    pub pipelines: Vec<ManagedPipeline>,
}

impl ManagedDevice {
    fn open(dev_id: i32, bus_id: PciBusId, pipelines: &[(i32, PipelineInfo)]) -> Result<Self, String> {
        let resource_path = bus_id.resource_path(2);
        let bar2 = Bar2::open(&resource_path).map_err(|e| format!("failed to map BAR2 for {bus_id}: {e}"))?;
        let device = Arc::new(Device::new(bus_id, bar2));

        let mut managed = Vec::with_capacity(pipelines.len());
        for (pipeline_id, info) in pipelines {
            let base = *PIPELINE_BASE
                .get(*pipeline_id as usize)
                .ok_or_else(|| format!("no BAR2 window reserved for pipeline {pipeline_id}"))?;
            let table_list: Vec<(String, snic_p4::TableMode)> =
                info.tables.iter().map(|t| (t.name.clone(), t.mode)).collect();
            let vendor = FfiVendor::new(base, table_list);
            let mut facade = PipelineFacade::init(Box::new(vendor), info.clone())
                .ok_or_else(|| format!("failed to initialize pipeline {pipeline_id} on {bus_id}"))?;
            if !facade.reset_all_tables() {
                return Err(format!("failed to reset tables for pipeline {pipeline_id} on {bus_id}"));
            }
            let domain_name: &'static str =
                Box::leak(format!("p4_dev{dev_id}_pipe{pipeline_id}").into_boxed_str());
            managed.push(ManagedPipeline {
                pipeline_id: *pipeline_id,
                facade: Arc::new(Mutex::new(facade)),
                domain_name,
            });
        }

        Ok(ManagedDevice { bus_id, device, pipelines: managed })
    }

    pub fn pipeline(&self, pipeline_id: i32) -> Option<&ManagedPipeline> {
        self.pipelines.iter().find(|p| p.pipeline_id == pipeline_id)
    }
}

/// The set of devices this agent instance is responsible for, indexed by
/// the `dev_id` RPC clients address them with (position in the `--bus-ids`
/// argument list). Every device is assumed to run the same pipeline set.
pub struct Fleet {
    pub devices: Vec<ManagedDevice>,
}

impl Fleet {
    pub fn open(bus_ids: &[String], pipelines: &[(i32, PipelineInfo)]) -> Result<Self, String> {
        let mut devices = Vec::with_capacity(bus_ids.len());
        for (dev_id, raw) in bus_ids.iter().enumerate() {
            let bus_id = PciBusId::from_str(raw).map_err(|e| e.to_string())?;
            devices.push(ManagedDevice::open(dev_id as i32, bus_id, pipelines)?);
        }
        Ok(Fleet { devices })
    }

    /// `dev_id == -1` means "every device"; any other value must name one
    /// device by its position in the fleet.
    pub fn resolve(&self, dev_id: i32) -> Result<Vec<(i32, &ManagedDevice)>, ()> {
        if dev_id == -1 {
            return Ok(self.devices.iter().enumerate().map(|(i, d)| (i as i32, d)).collect());
        }
        self.devices.get(dev_id as usize).map(|d| vec![(dev_id, d)]).ok_or(())
    }

    /// Registers each managed pipeline's two stats zones under its
    /// `domain_name`.
    pub fn register_stats(&self, tree: &StatsTree) {
        for dev in &self.devices {
            for pipeline in &dev.pipelines {
                snic_p4::register_pipeline_stats(tree, pipeline.domain_name, pipeline.facade.clone());
            }
        }
    }
}
