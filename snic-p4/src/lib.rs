mod error;
mod facade;
mod model;
mod pack;
mod pipeline;
mod vendor;

pub use error::PackError;
pub use facade::PipelineFacade;
pub use model::{
    Action, CounterBlock, CounterKind, Endian, FieldKind, Match, MatchField, PackedRule,
    ParamSpec, PipelineInfo, Rule, Table, TableMode,
};
pub use pack::pack;
pub use pipeline::register_pipeline_stats;
pub use vendor::{CounterHandle, TableHandle, VendorP4Table};

#[cfg(test)]
mod tests {
    use super::*;
    use num_bigint::BigUint;
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    /// An in-memory vendor driver stand-in for exercising the facade and
    /// pipeline stats wiring without real hardware.
    struct FakeVendor {
        tables: Vec<(String, TableMode)>,
        rules: HashMap<(u32, Vec<u8>, Option<Vec<u8>>), (u32, Vec<u8>)>,
        ecc: HashMap<u32, (u32, u32)>,
        counters: HashMap<CounterHandle, Vec<(u64, u64)>>,
        next_counter_handle: u32,
    }

    impl FakeVendor {
        fn new(tables: Vec<(String, TableMode)>) -> Self {
            FakeVendor {
                tables,
                rules: HashMap::new(),
                ecc: HashMap::new(),
                counters: HashMap::new(),
                next_counter_handle: 0,
            }
        }
    }

    impl VendorP4Table for FakeVendor {
        fn target_init(&mut self) -> bool {
            true
        }
        fn target_exit(&mut self) -> bool {
            true
        }
        fn table_count(&self) -> usize {
            self.tables.len()
        }
        fn table_by_name(&self, name: &str) -> Option<TableHandle> {
            self.tables.iter().position(|(n, _)| n == name).map(|i| i as u32)
        }
        fn table_by_index(&self, index: usize) -> Option<TableHandle> {
            if index < self.tables.len() {
                Some(index as u32)
            } else {
                None
            }
        }
        fn table_reset(&mut self, handle: TableHandle) -> bool {
            self.rules.retain(|(h, _, _), _| *h != handle);
            true
        }
        fn table_insert(
            &mut self,
            handle: TableHandle,
            key: &[u8],
            mask: Option<&[u8]>,
            _priority: u32,
            action_id: u32,
            params: &[u8],
        ) -> bool {
            self.rules.insert(
                (handle, key.to_vec(), mask.map(|m| m.to_vec())),
                (action_id, params.to_vec()),
            );
            true
        }
        fn table_update(
            &mut self,
            handle: TableHandle,
            key: &[u8],
            mask: Option<&[u8]>,
            action_id: u32,
            params: &[u8],
        ) -> bool {
            self.table_insert(handle, key, mask, 0, action_id, params)
        }
        fn table_delete(&mut self, handle: TableHandle, key: &[u8], mask: Option<&[u8]>) -> bool {
            self.rules
                .remove(&(handle, key.to_vec(), mask.map(|m| m.to_vec())))
                .is_some()
        }
        fn table_mode(&self, handle: TableHandle) -> TableMode {
            self.tables[handle as usize].1
        }
        fn table_action_id(&self, _handle: TableHandle, action_name: &str) -> Option<u32> {
            Some(action_name.len() as u32)
        }
        fn table_ecc_counters(&self, handle: TableHandle) -> (u32, u32) {
            self.ecc.get(&handle).copied().unwrap_or((0, 0))
        }
        fn table_ecc_counters_reset(&mut self, handle: TableHandle) -> bool {
            self.ecc.insert(handle, (0, 0));
            true
        }
        fn counter_init(&mut self, _block_name: &str) -> Option<CounterHandle> {
            let handle = self.next_counter_handle;
            self.next_counter_handle += 1;
            self.counters.insert(handle, vec![(0, 0); 4]);
            Some(handle)
        }
        fn counter_exit(&mut self, _ctx: CounterHandle) -> bool {
            true
        }
        fn counter_reset(&mut self, ctx: CounterHandle) -> bool {
            if let Some(v) = self.counters.get_mut(&ctx) {
                v.iter_mut().for_each(|c| *c = (0, 0));
                true
            } else {
                false
            }
        }
        fn counter_simple_read(&self, ctx: CounterHandle, index: u32) -> u64 {
            self.counters.get(&ctx).and_then(|v| v.get(index as usize)).map(|c| c.0).unwrap_or(0)
        }
        fn counter_simple_write(&mut self, ctx: CounterHandle, index: u32, value: u64) -> bool {
            if let Some(v) = self.counters.get_mut(&ctx) {
                if let Some(c) = v.get_mut(index as usize) {
                    c.0 = value;
                    return true;
                }
            }
            false
        }
        fn counter_combo_read(&self, ctx: CounterHandle, index: u32) -> (u64, u64) {
            self.counters.get(&ctx).and_then(|v| v.get(index as usize)).copied().unwrap_or((0, 0))
        }
        fn counter_combo_write(&mut self, ctx: CounterHandle, index: u32, packets: u64, bytes: u64) -> bool {
            if let Some(v) = self.counters.get_mut(&ctx) {
                if let Some(c) = v.get_mut(index as usize) {
                    *c = (packets, bytes);
                    return true;
                }
            }
            false
        }
        fn counter_collect_simple_read(&self, ctx: CounterHandle, start: u32, out: &mut [u64]) -> usize {
            let Some(v) = self.counters.get(&ctx) else { return 0 };
            let mut n = 0;
            for (i, slot) in out.iter_mut().enumerate() {
                if let Some(c) = v.get(start as usize + i) {
                    *slot = c.0;
                    n += 1;
                }
            }
            n
        }
        fn counter_collect_combo_read(&self, ctx: CounterHandle, start: u32, out: &mut [(u64, u64)]) -> usize {
            let Some(v) = self.counters.get(&ctx) else { return 0 };
            let mut n = 0;
            for (i, slot) in out.iter_mut().enumerate() {
                if let Some(c) = v.get(start as usize + i) {
                    *slot = *c;
                    n += 1;
                }
            }
            n
        }
    }

    fn bcam_table() -> Table {
        Table {
            name: "t_bcam".into(),
            mode: TableMode::Bcam,
            endian: Endian::Big,
            num_entries: 64,
            num_masks: 0,
            key_bits: 8,
            response_bits: 0,
            priority_bits: 0,
            action_id_bits: 4,
            match_fields: vec![MatchField { width: 8, kind: FieldKind::Bitfield }],
            actions: vec![
                Action { name: "a_nop".into(), param_bits: 0, params: vec![] },
                Action {
                    name: "a_one".into(),
                    param_bits: 8,
                    params: vec![ParamSpec { name: "p0".into(), width: 8 }],
                },
            ],
        }
    }

    #[test]
    fn insert_then_replace_with_different_action_overwrites_rule() {
        let table = bcam_table();
        let vendor = FakeVendor::new(vec![(table.name.clone(), table.mode)]);
        let info = PipelineInfo { name: "pipe0".into(), tables: vec![table.clone()], counter_blocks: vec![] };
        let mut facade = PipelineFacade::init(Box::new(vendor), info).unwrap();

        let rule1 = Rule {
            table_name: "t_bcam".into(),
            matches: vec![Match::KeyOnly { key: BigUint::from(0x01u32) }],
            action_name: "a_nop".into(),
            params: vec![],
            priority: Some(5),
        };
        let packed1 = pack(&table, &rule1).unwrap();
        assert!(facade.insert_kma("t_bcam", &packed1, 0, 5, false));

        let rule2 = Rule {
            table_name: "t_bcam".into(),
            matches: vec![Match::KeyOnly { key: BigUint::from(0x01u32) }],
            action_name: "a_one".into(),
            params: vec![BigUint::from(0xaau32)],
            priority: Some(5),
        };
        let packed2 = pack(&table, &rule2).unwrap();
        assert!(facade.insert_kma("t_bcam", &packed2, 1, 5, true));
    }

    #[test]
    fn bcam_table_discards_mask_at_facade_layer() {
        let table = bcam_table();
        let vendor = FakeVendor::new(vec![(table.name.clone(), table.mode)]);
        let info = PipelineInfo { name: "pipe0".into(), tables: vec![table.clone()], counter_blocks: vec![] };
        let mut facade = PipelineFacade::init(Box::new(vendor), info).unwrap();

        let rule = Rule {
            table_name: "t_bcam".into(),
            matches: vec![Match::KeyOnly { key: BigUint::from(0x01u32) }],
            action_name: "a_nop".into(),
            params: vec![],
            priority: Some(0),
        };
        let packed = pack(&table, &rule).unwrap();
        assert_ne!(packed.mask, vec![0x00]);
        assert!(facade.insert_kma("t_bcam", &packed, 0, 0, false));
        assert!(facade.delete_k("t_bcam", &packed));
    }

    #[test]
    fn pipeline_stats_register_counters_and_ecc_zones() {
        let table = bcam_table();
        let counter_blocks = vec![CounterBlock {
            name: "rx".into(),
            counter_width_bits: 32,
            num_counters: 4,
            kind: CounterKind::PacketsAndBytes,
        }];
        let vendor = FakeVendor::new(vec![(table.name.clone(), table.mode)]);
        let info = PipelineInfo { name: "pipe0".into(), tables: vec![table], counter_blocks };
        let facade = Arc::new(Mutex::new(PipelineFacade::init(Box::new(vendor), info).unwrap()));

        let tree = snic_stats::StatsTree::new();
        register_pipeline_stats(&tree, "counters_domain", facade);
        tree.latch_domain("counters_domain");

        let mut packets_seen = None;
        let mut ecc_seen = 0;
        tree.for_each_metric(
            Some("counters_domain"),
            None,
            |_| true,
            |sample| {
                if sample.block == "rx" && sample.metric == "packets" {
                    packets_seen = Some(sample.values.clone());
                }
                if sample.metric == "corrected_single_bit_errors" || sample.metric == "detected_double_bit_errors" {
                    ecc_seen += 1;
                }
            },
        );
        assert_eq!(packets_seen, Some(vec![0, 0, 0, 0]));
        assert_eq!(ecc_seen, 2);
    }

    #[test]
    fn clear_on_read_stats_reset_the_vendor_driver_not_just_the_cache() {
        let table = bcam_table();
        let counter_blocks = vec![CounterBlock {
            name: "rx".into(),
            counter_width_bits: 32,
            num_counters: 1,
            kind: CounterKind::Packets,
        }];
        let mut vendor = FakeVendor::new(vec![(table.name.clone(), table.mode)]);
        vendor.ecc.insert(0, (3, 1));
        let info = PipelineInfo { name: "pipe0".into(), tables: vec![table], counter_blocks };
        let facade = Arc::new(Mutex::new(PipelineFacade::init(Box::new(vendor), info).unwrap()));
        facade.lock().unwrap().counter_combo_write("rx", 0, 9, 0);

        let tree = snic_stats::StatsTree::new();
        register_pipeline_stats(&tree, "counters_domain", facade.clone());

        tree.latch_domain("counters_domain");
        let mut first_packets = None;
        let mut first_ecc = None;
        tree.for_each_metric(
            Some("counters_domain"),
            None,
            |_| true,
            |sample| {
                if sample.block == "rx" && sample.metric == "packets" {
                    first_packets = Some(sample.values.clone());
                }
                if sample.metric == "corrected_single_bit_errors" {
                    first_ecc = Some(sample.values.clone());
                }
            },
        );
        assert_eq!(first_packets, Some(vec![9]));
        assert_eq!(first_ecc, Some(vec![3]));

        // release_metrics reached the vendor driver itself, so the next
        // latch's fresh read comes back zero without a separate clear call.
        tree.latch_domain("counters_domain");
        let mut second_packets = None;
        let mut second_ecc = None;
        tree.for_each_metric(
            Some("counters_domain"),
            None,
            |_| true,
            |sample| {
                if sample.block == "rx" && sample.metric == "packets" {
                    second_packets = Some(sample.values.clone());
                }
                if sample.metric == "corrected_single_bit_errors" {
                    second_ecc = Some(sample.values.clone());
                }
            },
        );
        assert_eq!(second_packets, Some(vec![0]));
        assert_eq!(second_ecc, Some(vec![0]));
        assert_eq!(facade.lock().unwrap().table_ecc_counters("t_bcam"), Some((0, 0)));
    }
}
