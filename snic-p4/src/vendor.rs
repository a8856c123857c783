use crate::model::TableMode;

/// A handle to one table within a vendor P4 target, opaque to the facade.
pub type TableHandle = u32;

/// Capability interface a vendor P4 driver must expose. The facade
/// depends only on this trait, never on a specific vendor SDK; it must
/// honor the packed key/mask byte ordering the packer produces.
pub trait VendorP4Table: Send + Sync {
    fn target_init(&mut self) -> bool;
    fn target_exit(&mut self) -> bool;

    fn table_count(&self) -> usize;
    fn table_by_name(&self, name: &str) -> Option<TableHandle>;
    fn table_by_index(&self, index: usize) -> Option<TableHandle>;

    fn table_reset(&mut self, handle: TableHandle) -> bool;
    fn table_insert(
        &mut self,
        handle: TableHandle,
        key: &[u8],
        mask: Option<&[u8]>,
        priority: u32,
        action_id: u32,
        params: &[u8],
    ) -> bool;
    fn table_update(
        &mut self,
        handle: TableHandle,
        key: &[u8],
        mask: Option<&[u8]>,
        action_id: u32,
        params: &[u8],
    ) -> bool;
    fn table_delete(&mut self, handle: TableHandle, key: &[u8], mask: Option<&[u8]>) -> bool;
    fn table_mode(&self, handle: TableHandle) -> TableMode;
    fn table_action_id(&self, handle: TableHandle, action_name: &str) -> Option<u32>;
    fn table_ecc_counters(&self, handle: TableHandle) -> (u32, u32);
    fn table_ecc_counters_reset(&mut self, handle: TableHandle) -> bool;

    fn counter_init(&mut self, block_name: &str) -> Option<CounterHandle>;
    fn counter_exit(&mut self, ctx: CounterHandle) -> bool;
    fn counter_reset(&mut self, ctx: CounterHandle) -> bool;

    fn counter_simple_read(&self, ctx: CounterHandle, index: u32) -> u64;
    fn counter_simple_write(&mut self, ctx: CounterHandle, index: u32, value: u64) -> bool;
    fn counter_combo_read(&self, ctx: CounterHandle, index: u32) -> (u64, u64);
    fn counter_combo_write(&mut self, ctx: CounterHandle, index: u32, packets: u64, bytes: u64) -> bool;

    /// Reads `count` consecutive simple counters starting at `start` into
    /// a caller-allocated buffer, returning how many were filled.
    fn counter_collect_simple_read(&self, ctx: CounterHandle, start: u32, out: &mut [u64]) -> usize;
    /// As above, but for packet/byte pairs.
    fn counter_collect_combo_read(&self, ctx: CounterHandle, start: u32, out: &mut [(u64, u64)]) -> usize;
}

pub type CounterHandle = u32;
