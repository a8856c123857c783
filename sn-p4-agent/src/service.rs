use std::pin::Pin;
use std::sync::Arc;

use futures::{Stream, StreamExt};
use num_bigint::BigUint;
use snic_p4::{CounterKind, Endian, FieldKind, Match, Rule};
use snic_proto::sn::v2::{DebugFlagRequest, DebugFlagResponse, ErrorCode, ServerStatusRequest, ServerStatusResponse};
use snic_proto::sn_p4::v2::smartnic_p4_server::SmartnicP4;
use snic_proto::sn_p4::v2::*;
use tonic::{Request, Response, Status, Streaming};

use crate::debug::DebugFlags;
use crate::error::pack_error_code;
use crate::fleet::Fleet;
use crate::server_stats::ServerClock;

type Resp<T> = Pin<Box<dyn Stream<Item = Result<T, Status>> + Send + 'static>>;

pub struct P4Service {
    pub fleet: Fleet,
    pub clock: Arc<ServerClock>,
    pub debug: DebugFlags,
    pub stats: snic_stats::StatsTree,
}

fn stream_of<T: Send + 'static>(items: Vec<T>) -> Resp<T> {
    futures::stream::iter(items.into_iter().map(Ok)).boxed()
}

fn endian_str(e: Endian) -> &'static str {
    match e {
        Endian::Big => "big",
        Endian::Little => "little",
    }
}

fn field_kind_str(k: FieldKind) -> &'static str {
    match k {
        FieldKind::Bitfield => "bitfield",
        FieldKind::Constant => "constant",
        FieldKind::Prefix => "prefix",
        FieldKind::Range => "range",
        FieldKind::Ternary => "ternary",
        FieldKind::Unused => "unused",
    }
}

fn counter_kind_str(k: CounterKind) -> &'static str {
    match k {
        CounterKind::Packets => "packets",
        CounterKind::Bytes => "bytes",
        CounterKind::PacketsAndBytes => "packets_and_bytes",
        CounterKind::Flag => "flag",
    }
}

fn match_value_to_match(mv: &MatchValue) -> Match {
    match &mv.form {
        Some(match_value::Form::KeyMask(m)) => {
            Match::KeyMask { key: BigUint::from_bytes_be(&m.key), mask: BigUint::from_bytes_be(&m.mask) }
        }
        Some(match_value::Form::KeyOnly(bytes)) => Match::KeyOnly { key: BigUint::from_bytes_be(bytes) },
        Some(match_value::Form::Prefix(p)) => {
            Match::Prefix { key: BigUint::from_bytes_be(&p.key), prefix_len: p.prefix_len as u16 }
        }
        Some(match_value::Form::Range(r)) => Match::Range { lower: r.lower as u16, upper: r.upper as u16 },
        Some(match_value::Form::Unused(_)) | None => Match::Unused,
    }
}

impl P4Service {
    fn pipeline_info_one(&self, dev_id: i32, pipeline_id: i32) -> Vec<PipelineInfoResponse> {
        let Ok(resolved) = self.fleet.resolve(dev_id) else {
            return vec![PipelineInfoResponse { error_code: ErrorCode::InvalidDeviceId as i32, dev_id, info: None }];
        };
        resolved
            .into_iter()
            .flat_map(|(dev_id, dev)| {
                let ids: Vec<i32> = if pipeline_id == -1 {
                    dev.pipelines.iter().map(|p| p.pipeline_id).collect()
                } else {
                    vec![pipeline_id]
                };
                ids.into_iter().map(move |pid| {
                    let Some(pipeline) = dev.pipeline(pid) else {
                        return PipelineInfoResponse { error_code: ErrorCode::InvalidPipelineId as i32, dev_id, info: None };
                    };
                    let facade = pipeline.facade.lock().unwrap();
                    let tables = facade
                        .info
                        .tables
                        .iter()
                        .map(|t| {
                            let (ecc_corrected, ecc_detected) =
                                if t.mode.has_ecc_counters() { facade.table_ecc_counters(&t.name).unwrap_or((0, 0)) } else { (0, 0) };
                            TableInfo {
                                name: t.name.clone(),
                                mode: t.mode.as_str().to_string(),
                                endian: endian_str(t.endian).to_string(),
                                num_entries: t.num_entries,
                                key_bits: t.key_bits as u32,
                                match_fields: t
                                    .match_fields
                                    .iter()
                                    .map(|f| MatchFieldInfo { name: String::new(), width_bits: f.width as u32, kind: field_kind_str(f.kind).to_string() })
                                    .collect(),
                                actions: t
                                    .actions
                                    .iter()
                                    .map(|a| ActionInfo {
                                        name: a.name.clone(),
                                        params: a
                                            .params
                                            .iter()
                                            .map(|p| ActionParamInfo { name: p.name.clone(), width_bits: p.width as u32 })
                                            .collect(),
                                    })
                                    .collect(),
                                ecc_corrected_single_bit_errors: ecc_corrected,
                                ecc_detected_double_bit_errors: ecc_detected,
                            }
                        })
                        .collect();
                    let counter_blocks = facade
                        .info
                        .counter_blocks
                        .iter()
                        .map(|c| CounterBlockInfo {
                            name: c.name.clone(),
                            counter_width_bits: c.counter_width_bits as u32,
                            num_counters: c.num_counters,
                            kind: counter_kind_str(c.kind).to_string(),
                        })
                        .collect();
                    PipelineInfoResponse {
                        error_code: ErrorCode::Ok as i32,
                        dev_id,
                        info: Some(PipelineInfo {
                            pipeline_id: pid,
                            name: facade.info.name.clone(),
                            tables,
                            counter_blocks,
                        }),
                    }
                })
            })
            .collect()
    }

    fn insert_table_rule_one(&self, req: &InsertTableRuleRequest) -> InsertTableRuleResponse {
        let dev_id = req.dev_id;
        let pipeline_id = req.pipeline_id;
        let Ok(resolved) = self.fleet.resolve(dev_id) else {
            return InsertTableRuleResponse { error_code: ErrorCode::InvalidDeviceId as i32, dev_id, pipeline_id };
        };
        let (dev_id, dev) = resolved[0];
        let Some(pipeline) = dev.pipeline(pipeline_id) else {
            return InsertTableRuleResponse { error_code: ErrorCode::InvalidPipelineId as i32, dev_id, pipeline_id };
        };
        let Some(rule) = &req.rule else {
            return InsertTableRuleResponse { error_code: ErrorCode::MissingConfig as i32, dev_id, pipeline_id };
        };
        if self.debug.enabled("TABLE_RULE_INSERT") {
            log::debug!("InsertTableRule dev={dev_id} pipeline={pipeline_id} table={}", rule.table_name);
        }

        let mut facade = pipeline.facade.lock().unwrap();
        let Some(table) = facade.info.table(&rule.table_name).cloned() else {
            return InsertTableRuleResponse { error_code: ErrorCode::InvalidTableName as i32, dev_id, pipeline_id };
        };
        let semantic_rule = Rule {
            table_name: rule.table_name.clone(),
            matches: rule.matches.iter().map(match_value_to_match).collect(),
            action_name: rule.action_name.clone(),
            params: rule.params.iter().map(|b| BigUint::from_bytes_be(b)).collect(),
            priority: Some(rule.priority),
        };
        let packed = match snic_p4::pack(&table, &semantic_rule) {
            Ok(p) => p,
            Err(e) => return InsertTableRuleResponse { error_code: pack_error_code(&e) as i32, dev_id, pipeline_id },
        };
        let Some(action_id) = facade.action_id(&rule.table_name, &rule.action_name) else {
            return InsertTableRuleResponse { error_code: ErrorCode::InvalidActionName as i32, dev_id, pipeline_id };
        };
        let ok = facade.insert_kma(&rule.table_name, &packed, action_id, rule.priority, req.replace);
        let error_code = if ok { ErrorCode::Ok } else { ErrorCode::FailedInsertTableRule };
        InsertTableRuleResponse { error_code: error_code as i32, dev_id, pipeline_id }
    }

    fn delete_table_rule_one(&self, req: &DeleteTableRuleRequest) -> DeleteTableRuleResponse {
        let dev_id = req.dev_id;
        let pipeline_id = req.pipeline_id;
        let Ok(resolved) = self.fleet.resolve(dev_id) else {
            return DeleteTableRuleResponse { error_code: ErrorCode::InvalidDeviceId as i32, dev_id, pipeline_id };
        };
        let (dev_id, dev) = resolved[0];
        let Some(pipeline) = dev.pipeline(pipeline_id) else {
            return DeleteTableRuleResponse { error_code: ErrorCode::InvalidPipelineId as i32, dev_id, pipeline_id };
        };
        if self.debug.enabled("TABLE_RULE_DELETE") {
            log::debug!("DeleteTableRule dev={dev_id} pipeline={pipeline_id} table={}", req.table_name);
        }

        let mut facade = pipeline.facade.lock().unwrap();
        let Some(table) = facade.info.table(&req.table_name).cloned() else {
            return DeleteTableRuleResponse { error_code: ErrorCode::InvalidTableName as i32, dev_id, pipeline_id };
        };
        let Some(action) = table.actions.first() else {
            return DeleteTableRuleResponse { error_code: ErrorCode::InvalidActionName as i32, dev_id, pipeline_id };
        };
        let semantic_rule = Rule {
            table_name: req.table_name.clone(),
            matches: req.matches.iter().map(match_value_to_match).collect(),
            action_name: action.name.clone(),
            params: action.params.iter().map(|_| BigUint::from(0u8)).collect(),
            priority: None,
        };
        let packed = match snic_p4::pack(&table, &semantic_rule) {
            Ok(p) => p,
            Err(e) => return DeleteTableRuleResponse { error_code: pack_error_code(&e) as i32, dev_id, pipeline_id },
        };
        let ok = facade.delete_k(&req.table_name, &packed);
        let error_code = if ok { ErrorCode::Ok } else { ErrorCode::FailedDeleteTableRule };
        DeleteTableRuleResponse { error_code: error_code as i32, dev_id, pipeline_id }
    }

    fn clear_table_one(&self, req: &TableRequest) -> Vec<TableResponse> {
        let dev_id = req.dev_id;
        let pipeline_id = req.pipeline_id;
        let Ok(resolved) = self.fleet.resolve(dev_id) else {
            return vec![TableResponse { error_code: ErrorCode::InvalidDeviceId as i32, dev_id, pipeline_id }];
        };
        resolved
            .into_iter()
            .map(|(dev_id, dev)| {
                let Some(pipeline) = dev.pipeline(pipeline_id) else {
                    return TableResponse { error_code: ErrorCode::InvalidPipelineId as i32, dev_id, pipeline_id };
                };
                if self.debug.enabled("TABLE_CLEAR") {
                    log::debug!("ClearTable dev={dev_id} pipeline={pipeline_id} table={:?}", req.table_name);
                }
                let mut facade = pipeline.facade.lock().unwrap();
                let ok = if req.table_name.is_empty() {
                    facade.reset_all_tables()
                } else if facade.info.table(&req.table_name).is_some() {
                    facade.reset_table(&req.table_name)
                } else {
                    return TableResponse { error_code: ErrorCode::InvalidTableName as i32, dev_id, pipeline_id };
                };
                let error_code = if ok {
                    ErrorCode::Ok
                } else if req.table_name.is_empty() {
                    ErrorCode::FailedClearAllTables
                } else {
                    ErrorCode::FailedClearTable
                };
                TableResponse { error_code: error_code as i32, dev_id, pipeline_id }
            })
            .collect()
    }

    fn pipeline_stats_one(&self, dev_id: i32, pipeline_id: i32, clear: bool) -> Vec<PipelineStatsResponse> {
        let Ok(resolved) = self.fleet.resolve(dev_id) else {
            return vec![PipelineStatsResponse { error_code: ErrorCode::InvalidDeviceId as i32, dev_id, pipeline_id, samples: vec![] }];
        };
        resolved
            .into_iter()
            .map(|(dev_id, dev)| {
                let Some(pipeline) = dev.pipeline(pipeline_id) else {
                    return PipelineStatsResponse { error_code: ErrorCode::InvalidPipelineId as i32, dev_id, pipeline_id, samples: vec![] };
                };
                if clear {
                    self.stats_tree().clear_zone(Some(pipeline.domain_name), "counters");
                    self.stats_tree().clear_zone(Some(pipeline.domain_name), "table_ecc");
                }
                self.stats_tree().latch_domain(pipeline.domain_name);
                let mut samples = Vec::new();
                self.stats_tree().for_each_metric(Some(pipeline.domain_name), None, |_| true, |sample| {
                    samples.push(PipelineStatsSample {
                        zone: sample.zone.to_string(),
                        block: sample.block.to_string(),
                        metric: sample.metric.to_string(),
                        values: sample.values.clone(),
                        labels: sample.labels.iter().map(|(k, v)| (k.to_string(), v.clone())).collect(),
                    });
                });
                PipelineStatsResponse { error_code: ErrorCode::Ok as i32, dev_id, pipeline_id, samples }
            })
            .collect()
    }

    fn stats_tree(&self) -> &snic_stats::StatsTree {
        &self.stats
    }
}

#[tonic::async_trait]
impl SmartnicP4 for P4Service {
    type GetPipelineInfoStream = Resp<PipelineInfoResponse>;
    type ClearTableStream = Resp<TableResponse>;
    type GetPipelineStatsStream = Resp<PipelineStatsResponse>;
    type ClearPipelineStatsStream = Resp<PipelineStatsResponse>;
    type BatchStream = Resp<BatchResponse>;

    async fn get_pipeline_info(&self, request: Request<PipelineInfoRequest>) -> Result<Response<Self::GetPipelineInfoStream>, Status> {
        let req = request.into_inner();
        if self.debug.enabled("PIPELINE_INFO") {
            log::debug!("GetPipelineInfo {req:?}");
        }
        Ok(Response::new(stream_of(self.pipeline_info_one(req.dev_id, req.pipeline_id))))
    }

    async fn insert_table_rule(&self, request: Request<InsertTableRuleRequest>) -> Result<Response<InsertTableRuleResponse>, Status> {
        Ok(Response::new(self.insert_table_rule_one(&request.into_inner())))
    }

    async fn delete_table_rule(&self, request: Request<DeleteTableRuleRequest>) -> Result<Response<DeleteTableRuleResponse>, Status> {
        Ok(Response::new(self.delete_table_rule_one(&request.into_inner())))
    }

    async fn clear_table(&self, request: Request<TableRequest>) -> Result<Response<Self::ClearTableStream>, Status> {
        Ok(Response::new(stream_of(self.clear_table_one(&request.into_inner()))))
    }

    async fn get_pipeline_stats(&self, request: Request<PipelineStatsRequest>) -> Result<Response<Self::GetPipelineStatsStream>, Status> {
        let req = request.into_inner();
        Ok(Response::new(stream_of(self.pipeline_stats_one(req.dev_id, req.pipeline_id, false))))
    }

    async fn clear_pipeline_stats(&self, request: Request<PipelineStatsRequest>) -> Result<Response<Self::ClearPipelineStatsStream>, Status> {
        let req = request.into_inner();
        Ok(Response::new(stream_of(self.pipeline_stats_one(req.dev_id, req.pipeline_id, true))))
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

impl P4Service {
    fn dispatch_batch(&self, req: BatchRequest) -> BatchResponse {
        use batch_request::Payload;
        let op = req.op;
        match req.payload {
            Some(Payload::PipelineInfo(r)) => {
                let items = self.pipeline_info_one(r.dev_id, r.pipeline_id);
                let resp = items.into_iter().next().unwrap_or(PipelineInfoResponse {
                    error_code: ErrorCode::InvalidDeviceId as i32,
                    dev_id: r.dev_id,
                    info: None,
                });
                BatchResponse { error_code: resp.error_code, op, payload: Some(batch_response::Payload::PipelineInfo(resp)) }
            }
            Some(Payload::InsertRule(r)) => {
                let resp = self.insert_table_rule_one(&r);
                BatchResponse { error_code: resp.error_code, op, payload: Some(batch_response::Payload::InsertRule(resp)) }
            }
            Some(Payload::DeleteRule(r)) => {
                let resp = self.delete_table_rule_one(&r);
                BatchResponse { error_code: resp.error_code, op, payload: Some(batch_response::Payload::DeleteRule(resp)) }
            }
            Some(Payload::ClearTable(r)) => {
                let items = self.clear_table_one(&r);
                let resp = items.into_iter().next().unwrap_or(TableResponse {
                    error_code: ErrorCode::InvalidDeviceId as i32,
                    dev_id: r.dev_id,
                    pipeline_id: r.pipeline_id,
                });
                BatchResponse { error_code: resp.error_code, op, payload: Some(batch_response::Payload::ClearTable(resp)) }
            }
            Some(Payload::Stats(r)) => {
                let clear = op == BatchOp::OpClear as i32;
                let items = self.pipeline_stats_one(r.dev_id, r.pipeline_id, clear);
                let resp = items.into_iter().next().unwrap_or(PipelineStatsResponse {
                    error_code: ErrorCode::InvalidDeviceId as i32,
                    dev_id: r.dev_id,
                    pipeline_id: r.pipeline_id,
                    samples: vec![],
                });
                BatchResponse { error_code: resp.error_code, op, payload: Some(batch_response::Payload::Stats(resp)) }
            }
            None => BatchResponse { error_code: ErrorCode::UnknownBatchRequest as i32, op, payload: None },
        }
    }
}
