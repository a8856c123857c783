use std::pin::Pin;
use std::sync::Arc;

use futures::{Stream, StreamExt};
use snic_cms::{read_gpio, read_page, ModuleGpioKind, ModuleId};
use snic_hw::{InterfaceId, InterfaceType, ProcessorType};
use snic_proto::sn::v2::{DebugFlagRequest, DebugFlagResponse, ErrorCode, ServerStatusRequest, ServerStatusResponse};
use snic_proto::sn_cfg::v2::smartnic_config_server::SmartnicConfig;
use snic_proto::sn_cfg::v2::*;
use snic_sff8636::ModuleMemory;
use tonic::{Request, Response, Status, Streaming};

use crate::debug::DebugFlags;
use crate::error::cms_error_code;
use crate::fleet::Fleet;
use crate::server_stats::ServerClock;

type Resp<T> = Pin<Box<dyn Stream<Item = Result<T, Status>> + Send + 'static>>;

pub struct CfgService {
    pub fleet: Fleet,
    pub clock: Arc<ServerClock>,
    pub debug: DebugFlags,
    pub stats: snic_stats::StatsTree,
}

/// Zones registered under the server-wide "cfg" domain (`server_stats::register`).
const CFG_STATS_ZONES: &[&str] = &["server"];

fn stream_of<T: Send + 'static>(items: Vec<T>) -> Resp<T> {
    futures::stream::iter(items.into_iter().map(Ok)).boxed()
}

impl CfgService {
    fn device_info_one(&self, dev_id: i32) -> DeviceInfoResponse {
        let Ok(resolved) = self.fleet.resolve(dev_id) else {
            return DeviceInfoResponse { error_code: ErrorCode::InvalidDeviceId as i32, dev_id, info: None };
        };
        let (dev_id, dev) = resolved[0];
        match dev.cms.card_info() {
            Ok(info) => DeviceInfoResponse {
                error_code: ErrorCode::Ok as i32,
                dev_id,
                info: Some(DeviceInfo {
                    dev_id,
                    bus_id: dev.bus_id.to_string(),
                    card_profile: dev.cms.profile().as_str().to_string(),
                    card_name: info.name.unwrap_or_default(),
                    card_serial_number: info.serial_number.unwrap_or_default(),
                    card_revision: info.revision.unwrap_or_default(),
                    sat_controller_version: info.sc_version.unwrap_or_default(),
                    fan_present: info.fan_present.unwrap_or(false),
                    total_power_avail_watts: info.total_power_avail.unwrap_or(0),
                }),
            },
            Err(e) => DeviceInfoResponse { error_code: cms_error_code(&e) as i32, dev_id, info: None },
        }
    }

    fn port_status_one(&self, dev_id: i32, port_id: i32) -> Vec<PortStatusResponse> {
        let Ok(resolved) = self.fleet.resolve(dev_id) else {
            return vec![PortStatusResponse { error_code: ErrorCode::InvalidDeviceId as i32, dev_id, status: None }];
        };
        resolved
            .into_iter()
            .flat_map(|(dev_id, dev)| {
                let ids: Vec<i32> = if port_id == -1 { vec![0, 1] } else { vec![port_id] };
                ids.into_iter().map(move |pid| {
                    let Some(port) = dev.ports.get(pid as usize) else {
                        return PortStatusResponse { error_code: ErrorCode::InvalidPortId as i32, dev_id, status: None };
                    };
                    PortStatusResponse {
                        error_code: ErrorCode::Ok as i32,
                        dev_id,
                        status: Some(PortStatus {
                            port_id: pid,
                            config: Some(PortConfig {
                                enable: port.is_enabled(),
                                loopback: port.loopback_is_enabled(),
                                rsfec: port.rsfec_is_enabled(),
                            }),
                            link_up: port.link_up(),
                        }),
                    }
                })
            })
            .collect()
    }

    fn set_port_config_one(&self, dev_id: i32, req: &PortStatusRequest) -> Vec<PortStatusResponse> {
        let Ok(resolved) = self.fleet.resolve(dev_id) else {
            return vec![PortStatusResponse { error_code: ErrorCode::InvalidDeviceId as i32, dev_id, status: None }];
        };
        let Some(config) = req.status.as_ref().and_then(|s| s.config.as_ref()) else {
            return vec![PortStatusResponse { error_code: ErrorCode::MissingConfig as i32, dev_id, status: None }];
        };
        resolved
            .into_iter()
            .flat_map(|(dev_id, dev)| {
                let ids: Vec<i32> = if req.port_id == -1 { vec![0, 1] } else { vec![req.port_id] };
                ids.into_iter().map(move |pid| {
                    let Some(port) = dev.ports.get(pid as usize) else {
                        return PortStatusResponse { error_code: ErrorCode::InvalidPortId as i32, dev_id, status: None };
                    };
                    if config.enable {
                        port.enable();
                    } else {
                        port.disable();
                    }
                    if config.loopback {
                        port.loopback_enable();
                    } else {
                        port.loopback_disable();
                    }
                    if config.rsfec {
                        port.rsfec_enable();
                    } else {
                        port.rsfec_disable();
                    }
                    PortStatusResponse {
                        error_code: ErrorCode::Ok as i32,
                        dev_id,
                        status: Some(PortStatus {
                            port_id: pid,
                            config: Some(config.clone()),
                            link_up: port.link_up(),
                        }),
                    }
                })
            })
            .collect()
    }

    fn host_config_one(&self, req: &HostConfigRequest) -> HostConfigResponse {
        let Ok(resolved) = self.fleet.resolve(req.dev_id) else {
            return HostConfigResponse { error_code: ErrorCode::InvalidDeviceId as i32, dev_id: req.dev_id, host_id: req.host_id, base_queue: 0, num_queues: 0 };
        };
        let (dev_id, dev) = resolved[0];
        let Some(host) = dev.hosts.get(req.host_id as usize) else {
            return HostConfigResponse { error_code: ErrorCode::InvalidHostId as i32, dev_id, host_id: req.host_id, base_queue: 0, num_queues: 0 };
        };
        let (base_queue, num_queues) = host.get_queues();
        HostConfigResponse { error_code: ErrorCode::Ok as i32, dev_id, host_id: req.host_id, base_queue, num_queues }
    }

    fn set_host_config_one(&self, req: &HostConfigRequest) -> HostConfigResponse {
        let Ok(resolved) = self.fleet.resolve(req.dev_id) else {
            return HostConfigResponse { error_code: ErrorCode::InvalidDeviceId as i32, dev_id: req.dev_id, host_id: req.host_id, base_queue: 0, num_queues: 0 };
        };
        let (dev_id, dev) = resolved[0];
        let Some(host) = dev.hosts.get(req.host_id as usize) else {
            return HostConfigResponse { error_code: ErrorCode::InvalidHostId as i32, dev_id, host_id: req.host_id, base_queue: 0, num_queues: 0 };
        };
        match host.set_queues(req.base_queue, req.num_queues) {
            Ok(()) => HostConfigResponse { error_code: ErrorCode::Ok as i32, dev_id, host_id: req.host_id, base_queue: req.base_queue, num_queues: req.num_queues },
            Err(_) => HostConfigResponse { error_code: ErrorCode::UnsupportedValue as i32, dev_id, host_id: req.host_id, base_queue: 0, num_queues: 0 },
        }
    }

    fn switch_config_one(&self, dev_id: i32) -> SwitchConfigResponse {
        let Ok(resolved) = self.fleet.resolve(dev_id) else {
            return SwitchConfigResponse { error_code: ErrorCode::InvalidDeviceId as i32, dev_id, connections: vec![] };
        };
        let (dev_id, dev) = resolved[0];
        let interfaces = [InterfaceId::port(0), InterfaceId::port(1), InterfaceId::host(0), InterfaceId::host(1)];
        let mut connections = Vec::new();
        for from in interfaces {
            let Some(proc) = dev.switch.get_ingress_connection(from) else { continue };
            let egress = match proc {
                ProcessorType::App(0) => dev.switch.get_egress_connection(ProcessorType::App(0), from),
                ProcessorType::App(1) => dev.switch.get_egress_connection(ProcessorType::App(1), from),
                ProcessorType::Bypass => dev.switch.get_egress_connection(ProcessorType::Bypass, from),
                ProcessorType::Drop => None,
            };
            connections.push(SwitchConnection {
                interface: Some(interface_to_proto(from)),
                ingress_processor: processor_to_proto(proc) as i32,
                app_index: match proc { ProcessorType::App(n) => n as u32, _ => 0 },
                egress_interface: egress.map(interface_to_proto),
            });
        }
        SwitchConfigResponse { error_code: ErrorCode::Ok as i32, dev_id, connections }
    }

    fn module_info_one(&self, dev_id: i32, module_id: i32) -> Vec<ModuleInfoResponse> {
        let Ok(resolved) = self.fleet.resolve(dev_id) else {
            return vec![ModuleInfoResponse { error_code: ErrorCode::InvalidDeviceId as i32, dev_id, info: None }];
        };
        resolved
            .into_iter()
            .flat_map(|(dev_id, dev)| {
                let ids: Vec<i32> = if module_id == -1 { vec![0, 1] } else { vec![module_id] };
                ids.into_iter().map(move |mid| self.read_one_module(dev_id, &dev.cms, mid))
            })
            .collect()
    }

    fn read_one_module(&self, dev_id: i32, cms: &snic_cms::Cms, module_id: i32) -> ModuleInfoResponse {
        let cage = module_id as u8;
        let present = matches!(
            read_gpio(cms.block(), cage, ModuleGpioKind::Qsfp),
            Ok(snic_cms::ModuleGpio::Qsfp { present: true, .. })
        );
        if !present {
            return ModuleInfoResponse {
                error_code: ErrorCode::Ok as i32,
                dev_id,
                info: Some(ModuleInfo { module_id, present: false, ..Default::default() }),
            };
        }

        let lower_id = ModuleId { cage, page: 0, upper: false, cmis: false, bank: 0, sfp_diag: false };
        let upper_id = ModuleId { cage, page: 0, upper: true, cmis: false, bank: 0, sfp_diag: false };
        let (Ok(lower), Ok(upper_page_00)) = (read_page(cms.block(), &lower_id), read_page(cms.block(), &upper_id)) else {
            return ModuleInfoResponse { error_code: ErrorCode::ModulePageRead as i32, dev_id, info: None };
        };

        let decoded = snic_sff8636::decode(&ModuleMemory { lower, upper_page_00 });
        ModuleInfoResponse {
            error_code: ErrorCode::Ok as i32,
            dev_id,
            info: Some(ModuleInfo {
                module_id,
                present: true,
                vendor_name: decoded.upper.vendor_name,
                vendor_part_number: decoded.upper.vendor_pn,
                vendor_serial_number: decoded.upper.vendor_sn,
                temperature_celsius: decoded.lower.temp_celsius,
                vcc_volts: decoded.lower.vcc_volts,
                rx_power_mw: decoded.lower.rx_power_mw.lane.to_vec(),
                tx_bias_ma: decoded.lower.tx_bias_ma.lane.to_vec(),
                tx_power_mw: decoded.lower.tx_power_mw.lane.to_vec(),
            }),
        }
    }

    /// `dev_id` only selects which devices the fan-out returns a response
    /// per; the "cfg" domain itself is server-wide, not per-device.
    fn stats_one(&self, dev_id: i32, zone: &str, clear: bool) -> Vec<StatsResponse> {
        let Ok(resolved) = self.fleet.resolve(dev_id) else {
            return vec![StatsResponse { error_code: ErrorCode::InvalidDeviceId as i32, dev_id, samples: vec![] }];
        };

        if clear {
            for z in CFG_STATS_ZONES.iter().filter(|z| zone.is_empty() || **z == zone) {
                self.stats_tree().clear_zone(Some("cfg"), z);
            }
        }
        self.stats_tree().latch_domain("cfg");

        let zone_filter = if zone.is_empty() { None } else { Some(zone) };
        let mut samples = Vec::new();
        self.stats_tree().for_each_metric(Some("cfg"), zone_filter, |_| true, |sample| {
            samples.push(StatsSample {
                zone: sample.zone.to_string(),
                block: sample.block.to_string(),
                metric: sample.metric.to_string(),
                values: sample.values.clone(),
                converted: sample.converted.clone(),
                labels: sample.labels.iter().map(|(k, v)| (k.to_string(), v.clone())).collect(),
            });
        });

        resolved
            .into_iter()
            .map(|(dev_id, _)| StatsResponse { error_code: ErrorCode::Ok as i32, dev_id, samples: samples.clone() })
            .collect()
    }

    fn stats_tree(&self) -> &snic_stats::StatsTree {
        &self.stats
    }
}

fn interface_to_proto(id: InterfaceId) -> SwitchInterface {
    SwitchInterface {
        kind: match id.kind {
            InterfaceType::Port => switch_interface::Kind::Port as i32,
            InterfaceType::Host => switch_interface::Kind::Host as i32,
        },
        index: id.index as u32,
    }
}

fn processor_to_proto(p: ProcessorType) -> ProcessorKind {
    match p {
        ProcessorType::Drop => ProcessorKind::ProcDrop,
        ProcessorType::Bypass => ProcessorKind::ProcBypass,
        ProcessorType::App(_) => ProcessorKind::ProcApp,
    }
}

#[tonic::async_trait]
impl SmartnicConfig for CfgService {
    type GetDeviceInfoStream = Resp<DeviceInfoResponse>;
    type GetPortStatusStream = Resp<PortStatusResponse>;
    type SetPortConfigStream = Resp<PortStatusResponse>;
    type GetHostConfigStream = Resp<HostConfigResponse>;
    type SetHostConfigStream = Resp<HostConfigResponse>;
    type GetModuleInfoStream = Resp<ModuleInfoResponse>;
    type GetStatsStream = Resp<StatsResponse>;
    type BatchStream = Resp<BatchResponse>;

    async fn get_device_info(&self, request: Request<DeviceInfoRequest>) -> Result<Response<Self::GetDeviceInfoStream>, Status> {
        let dev_id = request.into_inner().dev_id;
        let ids: Vec<i32> = if dev_id == -1 { (0..self.fleet.devices.len() as i32).collect() } else { vec![dev_id] };
        let items: Vec<_> = ids.into_iter().map(|id| self.device_info_one(id)).collect();
        Ok(Response::new(stream_of(items)))
    }

    async fn get_port_status(&self, request: Request<PortStatusRequest>) -> Result<Response<Self::GetPortStatusStream>, Status> {
        let req = request.into_inner();
        Ok(Response::new(stream_of(self.port_status_one(req.dev_id, req.port_id))))
    }

    async fn set_port_config(&self, request: Request<PortStatusRequest>) -> Result<Response<Self::SetPortConfigStream>, Status> {
        let req = request.into_inner();
        if self.debug.enabled("PORT_CONFIG") {
            log::debug!("SetPortConfig {req:?}");
        }
        Ok(Response::new(stream_of(self.set_port_config_one(req.dev_id, &req))))
    }

    async fn get_host_config(&self, request: Request<HostConfigRequest>) -> Result<Response<Self::GetHostConfigStream>, Status> {
        let req = request.into_inner();
        Ok(Response::new(stream_of(vec![self.host_config_one(&req)])))
    }

    async fn set_host_config(&self, request: Request<HostConfigRequest>) -> Result<Response<Self::SetHostConfigStream>, Status> {
        let req = request.into_inner();
        Ok(Response::new(stream_of(vec![self.set_host_config_one(&req)])))
    }

    async fn get_switch_config(&self, request: Request<SwitchConfigRequest>) -> Result<Response<SwitchConfigResponse>, Status> {
        Ok(Response::new(self.switch_config_one(request.into_inner().dev_id)))
    }

    async fn set_switch_defaults(&self, request: Request<SwitchConfigRequest>) -> Result<Response<SwitchConfigResponse>, Status> {
        let dev_id = request.into_inner().dev_id;
        if let Ok(resolved) = self.fleet.resolve(dev_id) {
            for (_, dev) in &resolved {
                dev.switch.set_defaults_one_to_one();
            }
        }
        Ok(Response::new(self.switch_config_one(dev_id)))
    }

    async fn get_module_info(&self, request: Request<ModuleInfoRequest>) -> Result<Response<Self::GetModuleInfoStream>, Status> {
        let req = request.into_inner();
        Ok(Response::new(stream_of(self.module_info_one(req.dev_id, req.module_id))))
    }

    async fn get_stats(&self, request: Request<StatsRequest>) -> Result<Response<Self::GetStatsStream>, Status> {
        let req = request.into_inner();
        Ok(Response::new(stream_of(self.stats_one(req.dev_id, &req.zone, false))))
    }

    async fn get_server_status(&self, _request: Request<ServerStatusRequest>) -> Result<Response<ServerStatusResponse>, Status> {
        Ok(Response::new(ServerStatusResponse {
            error_code: ErrorCode::Ok as i32,
            start_time_unix_seconds: self.clock.start_unix_seconds,
            up_time_seconds: self.clock.up_time_seconds(),
        }))
    }

    async fn set_debug_flag(&self, request: Request<DebugFlagRequest>) -> Result<Response<DebugFlagResponse>, Status> {
        let req = request.into_inner();
        let error_code = if self.debug.set(&req.flag, req.enabled) { ErrorCode::Ok } else { ErrorCode::ServerInvalidDebugFlag };
        Ok(Response::new(DebugFlagResponse { error_code: error_code as i32 }))
    }

    async fn batch(&self, request: Request<Streaming<BatchRequest>>) -> Result<Response<Self::BatchStream>, Status> {
        let mut inbound = request.into_inner();
        let mut out = Vec::new();
        while let Some(req) = inbound.message().await? {
            out.push(self.dispatch_batch(req));
        }
        Ok(Response::new(stream_of(out)))
    }
}

impl CfgService {
    fn dispatch_batch(&self, req: BatchRequest) -> BatchResponse {
        use batch_request::Payload;
        let op = req.op;
        match req.payload {
            Some(Payload::DeviceInfo(r)) => {
                let resp = self.device_info_one(r.dev_id);
                BatchResponse { error_code: resp.error_code, op, payload: Some(batch_response::Payload::DeviceInfo(resp)) }
            }
            Some(Payload::PortStatus(r)) => {
                let items = if op == BatchOp::OpSet as i32 {
                    self.set_port_config_one(r.dev_id, &r)
                } else {
                    self.port_status_one(r.dev_id, r.port_id)
                };
                let resp = items.into_iter().next().unwrap_or(PortStatusResponse { error_code: ErrorCode::InvalidDeviceId as i32, dev_id: r.dev_id, status: None });
                BatchResponse { error_code: resp.error_code, op, payload: Some(batch_response::Payload::PortStatus(resp)) }
            }
            Some(Payload::HostConfig(r)) => {
                let resp = if op == BatchOp::OpSet as i32 { self.set_host_config_one(&r) } else { self.host_config_one(&r) };
                BatchResponse { error_code: resp.error_code, op, payload: Some(batch_response::Payload::HostConfig(resp)) }
            }
            Some(Payload::SwitchConfig(r)) => {
                let resp = if op == BatchOp::OpSet as i32 {
                    if let Ok(resolved) = self.fleet.resolve(r.dev_id) {
                        for (_, dev) in &resolved {
                            dev.switch.set_defaults_one_to_one();
                        }
                    }
                    self.switch_config_one(r.dev_id)
                } else {
                    self.switch_config_one(r.dev_id)
                };
                BatchResponse { error_code: resp.error_code, op, payload: Some(batch_response::Payload::SwitchConfig(resp)) }
            }
            Some(Payload::ModuleInfo(r)) => {
                let resp = self
                    .module_info_one(r.dev_id, r.module_id)
                    .into_iter()
                    .next()
                    .unwrap_or(ModuleInfoResponse { error_code: ErrorCode::InvalidDeviceId as i32, dev_id: r.dev_id, info: None });
                BatchResponse { error_code: resp.error_code, op, payload: Some(batch_response::Payload::ModuleInfo(resp)) }
            }
            Some(Payload::Stats(r)) => {
                let resp = self
                    .stats_one(r.dev_id, &r.zone, op == BatchOp::OpClear as i32)
                    .into_iter()
                    .next()
                    .unwrap_or(StatsResponse { error_code: ErrorCode::InvalidDeviceId as i32, dev_id: r.dev_id, samples: vec![] });
                BatchResponse { error_code: resp.error_code, op, payload: Some(batch_response::Payload::Stats(resp)) }
            }
            None => BatchResponse { error_code: ErrorCode::UnknownBatchRequest as i32, op, payload: None },
        }
    }
}
