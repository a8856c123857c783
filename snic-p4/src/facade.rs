use std::collections::HashMap;

use crate::model::{CounterKind, PackedRule, PipelineInfo};
use crate::vendor::{CounterHandle, TableHandle, VendorP4Table};

/// Wraps a vendor P4 driver through the capability interface,
/// keeping it ignorant of the gRPC surface above it. One facade per
/// present pipeline, held for the server's lifetime.
pub struct PipelineFacade {
    pub info: PipelineInfo,
    driver: Box<dyn VendorP4Table>,
    counter_contexts: HashMap<String, CounterHandle>,
}

impl PipelineFacade {
    /// Initializes the vendor target and allocates a counter context per
    /// declared counter block. Returns `None` if target init or any
    /// counter-context allocation fails.
    pub fn init(mut driver: Box<dyn VendorP4Table>, info: PipelineInfo) -> Option<Self> {
        if !driver.target_init() {
            return None;
        }
        let mut counter_contexts = HashMap::new();
        for block in &info.counter_blocks {
            let ctx = driver.counter_init(&block.name)?;
            counter_contexts.insert(block.name.clone(), ctx);
        }
        Some(PipelineFacade { info, driver, counter_contexts })
    }

    pub fn table_handle(&self, table_name: &str) -> Option<TableHandle> {
        self.driver.table_by_name(table_name)
    }

    pub fn reset_all_tables(&mut self) -> bool {
        let mut ok = true;
        for index in 0..self.info.tables.len() {
            match self.driver.table_by_index(index) {
                Some(h) => ok &= self.driver.table_reset(h),
                None => ok = false,
            }
        }
        ok
    }

    pub fn reset_table(&mut self, table_name: &str) -> bool {
        match self.driver.table_by_name(table_name) {
            Some(h) => self.driver.table_reset(h),
            None => false,
        }
    }

    fn mask_for(&self, table_name: &str, packed: &PackedRule) -> Option<Vec<u8>> {
        let table = self.info.table(table_name)?;
        if table.mode.rejects_mask() {
            None
        } else {
            Some(packed.mask.clone())
        }
    }

    /// Lowers to `table_update` when `replace` is set, else `table_insert`.
    pub fn insert_kma(
        &mut self,
        table_name: &str,
        packed: &PackedRule,
        action_id: u32,
        priority: u32,
        replace: bool,
    ) -> bool {
        let Some(handle) = self.driver.table_by_name(table_name) else {
            return false;
        };
        let mask = self.mask_for(table_name, packed);
        if replace {
            self.driver
                .table_update(handle, &packed.key, mask.as_deref(), action_id, &packed.action_parameters)
        } else {
            self.driver.table_insert(
                handle,
                &packed.key,
                mask.as_deref(),
                priority,
                action_id,
                &packed.action_parameters,
            )
        }
    }

    pub fn delete_k(&mut self, table_name: &str, packed: &PackedRule) -> bool {
        let Some(handle) = self.driver.table_by_name(table_name) else {
            return false;
        };
        let mask = self.mask_for(table_name, packed);
        self.driver.table_delete(handle, &packed.key, mask.as_deref())
    }

    pub fn action_id(&self, table_name: &str, action_name: &str) -> Option<u32> {
        let handle = self.driver.table_by_name(table_name)?;
        self.driver.table_action_id(handle, action_name)
    }

    pub fn table_ecc_counters(&self, table_name: &str) -> Option<(u32, u32)> {
        let handle = self.driver.table_by_name(table_name)?;
        Some(self.driver.table_ecc_counters(handle))
    }

    pub fn reset_table_ecc_counters(&mut self, table_name: &str) -> bool {
        match self.driver.table_by_name(table_name) {
            Some(h) => self.driver.table_ecc_counters_reset(h),
            None => false,
        }
    }

    pub fn counter_simple_read(&self, block_name: &str, index: u32) -> Option<u64> {
        let ctx = *self.counter_contexts.get(block_name)?;
        Some(self.driver.counter_simple_read(ctx, index))
    }

    pub fn counter_simple_write(&mut self, block_name: &str, index: u32, value: u64) -> bool {
        match self.counter_contexts.get(block_name).copied() {
            Some(ctx) => self.driver.counter_simple_write(ctx, index, value),
            None => false,
        }
    }

    pub fn counter_combo_read(&self, block_name: &str, index: u32) -> Option<(u64, u64)> {
        let ctx = *self.counter_contexts.get(block_name)?;
        Some(self.driver.counter_combo_read(ctx, index))
    }

    pub fn counter_combo_write(&mut self, block_name: &str, index: u32, packets: u64, bytes: u64) -> bool {
        match self.counter_contexts.get(block_name).copied() {
            Some(ctx) => self.driver.counter_combo_write(ctx, index, packets, bytes),
            None => false,
        }
    }

    /// Reads `out.len()` simple counters starting at 0, zero-padding the
    /// tail if the caller's buffer is larger than the block.
    pub fn block_simple_read(&self, block_name: &str, out: &mut [u64]) -> bool {
        let Some(&ctx) = self.counter_contexts.get(block_name) else {
            return false;
        };
        let filled = self.driver.counter_collect_simple_read(ctx, 0, out);
        out[filled..].iter_mut().for_each(|v| *v = 0);
        true
    }

    pub fn block_combo_read(&self, block_name: &str, out: &mut [(u64, u64)]) -> bool {
        let Some(&ctx) = self.counter_contexts.get(block_name) else {
            return false;
        };
        let filled = self.driver.counter_collect_combo_read(ctx, 0, out);
        out[filled..].iter_mut().for_each(|v| *v = (0, 0));
        true
    }

    pub fn block_reset(&mut self, block_name: &str) -> bool {
        match self.counter_contexts.get(block_name).copied() {
            Some(ctx) => self.driver.counter_reset(ctx),
            None => false,
        }
    }

    pub fn counter_kind(&self, block_name: &str) -> Option<CounterKind> {
        self.info.counter_blocks.iter().find(|b| b.name == block_name).map(|b| b.kind)
    }
}
