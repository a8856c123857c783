use std::collections::HashMap;
use std::ffi::{c_void, CString};

use snic_p4::{CounterHandle, TableHandle, TableMode, VendorP4Table};

/// Bindings to `libsnp4` (`examples/original_source/libsnp4/include/snp4.h`).
/// The library addresses tables by name, not by handle, and exposes no
/// table/action schema query or counter API at this boundary — schema comes
/// from `pipelines::load`, and counters are tracked in-process below (see
/// the module doc on `FfiVendor`).
mod ffi {
    use std::ffi::c_void;
    use std::os::raw::{c_char, c_uchar};

    extern "C" {
        pub fn snp4_init(snp4_base_addr: usize) -> *mut c_void;
        pub fn snp4_deinit(snp4_handle: *mut c_void) -> bool;
        pub fn snp4_reset_all_tables(snp4_handle: *mut c_void) -> bool;
        pub fn snp4_reset_one_table(snp4_handle: *mut c_void, table_name: *const c_char) -> bool;
        #[allow(clippy::too_many_arguments)]
        pub fn snp4_table_insert_kma(
            snp4_handle: *mut c_void,
            table_name: *const c_char,
            key: *const c_uchar,
            key_len: usize,
            mask: *const c_uchar,
            mask_len: usize,
            action_name: *const c_char,
            params: *const c_uchar,
            params_len: usize,
            priority: u32,
        ) -> bool;
        pub fn snp4_table_delete_k(
            snp4_handle: *mut c_void,
            table_name: *const c_char,
            key: *const c_uchar,
            key_len: usize,
            mask: *const c_uchar,
            mask_len: usize,
        ) -> bool;
    }
}

/// One counter context: `num_counters` (packets, bytes) pairs, read-write
/// at the Rust layer since `snp4.h` does not expose a counter API.
struct CounterState {
    values: Vec<(u64, u64)>,
}

/// Binds one pipeline's tables to the real vendor target at `base_addr`
/// within the device's BAR2 space. `table_names` and `counter_blocks` come
/// from the pipeline config file, in declared order; their position is the
/// `TableHandle`/`CounterHandle` this type hands back to `PipelineFacade`.
pub struct FfiVendor {
    base_addr: usize,
    handle: *mut c_void,
    table_names: Vec<String>,
    table_modes: Vec<TableMode>,
    counters: HashMap<CounterHandle, (String, CounterState)>,
    next_counter_handle: u32,
}

// The opaque handle is only ever touched through `snp4_*` calls which the
// vendor library itself must serialize; `PipelineFacade` holds this behind
// its own `Arc<Mutex<_>>`, so no call is ever concurrent.
unsafe impl Send for FfiVendor {}
unsafe impl Sync for FfiVendor {}

impl FfiVendor {
    pub fn new(base_addr: usize, tables: Vec<(String, TableMode)>) -> Self {
        let (table_names, table_modes) = tables.into_iter().unzip();
        FfiVendor {
            base_addr,
            handle: std::ptr::null_mut(),
            table_names,
            table_modes,
            counters: HashMap::new(),
            next_counter_handle: 0,
        }
    }

    fn table_name_cstr(&self, handle: TableHandle) -> CString {
        CString::new(self.table_names[handle as usize].as_str()).expect("table name has no interior NUL")
    }
}

impl Drop for FfiVendor {
    fn drop(&mut self) {
        if !self.handle.is_null() {
            unsafe {
                ffi::snp4_deinit(self.handle);
            }
        }
    }
}

impl VendorP4Table for FfiVendor {
    fn target_init(&mut self) -> bool {
        let handle = unsafe { ffi::snp4_init(self.base_addr) };
        if handle.is_null() {
            return false;
        }
        self.handle = handle;
        true
    }

    fn target_exit(&mut self) -> bool {
        if self.handle.is_null() {
            return true;
        }
        let ok = unsafe { ffi::snp4_deinit(self.handle) };
        self.handle = std::ptr::null_mut();
        ok
    }

    fn table_count(&self) -> usize {
        self.table_names.len()
    }

    fn table_by_name(&self, name: &str) -> Option<TableHandle> {
        self.table_names.iter().position(|n| n == name).map(|i| i as u32)
    }

    fn table_by_index(&self, index: usize) -> Option<TableHandle> {
        if index < self.table_names.len() {
            Some(index as u32)
        } else {
            None
        }
    }

    fn table_reset(&mut self, handle: TableHandle) -> bool {
        let name = self.table_name_cstr(handle);
        unsafe { ffi::snp4_reset_one_table(self.handle, name.as_ptr()) }
    }

    fn table_insert(
        &mut self,
        handle: TableHandle,
        key: &[u8],
        mask: Option<&[u8]>,
        priority: u32,
        action_id: u32,
        params: &[u8],
    ) -> bool {
        let name = self.table_name_cstr(handle);
        let action_name = CString::new(action_id.to_string()).unwrap();
        let (mask_ptr, mask_len) = match mask {
            Some(m) => (m.as_ptr(), m.len()),
            None => (std::ptr::null(), 0),
        };
        unsafe {
            ffi::snp4_table_insert_kma(
                self.handle,
                name.as_ptr(),
                key.as_ptr(),
                key.len(),
                mask_ptr,
                mask_len,
                action_name.as_ptr(),
                params.as_ptr(),
                params.len(),
                priority,
            )
        }
    }

    fn table_update(
        &mut self,
        handle: TableHandle,
        key: &[u8],
        mask: Option<&[u8]>,
        action_id: u32,
        params: &[u8],
    ) -> bool {
        // `snp4_table_insert_kma` replaces an existing key/mask match in
        // place; there is no separate update entry point in `snp4.h`.
        self.table_insert(handle, key, mask, 0, action_id, params)
    }

    fn table_delete(&mut self, handle: TableHandle, key: &[u8], mask: Option<&[u8]>) -> bool {
        let name = self.table_name_cstr(handle);
        let (mask_ptr, mask_len) = match mask {
            Some(m) => (m.as_ptr(), m.len()),
            None => (std::ptr::null(), 0),
        };
        unsafe { ffi::snp4_table_delete_k(self.handle, name.as_ptr(), key.as_ptr(), key.len(), mask_ptr, mask_len) }
    }

    fn table_mode(&self, handle: TableHandle) -> TableMode {
        self.table_modes[handle as usize]
    }

    fn table_action_id(&self, _handle: TableHandle, action_name: &str) -> Option<u32> {
        // `snp4_table_insert_kma` takes the action by name; the numeric ID
        // this trait threads through is purely an internal token, so any
        // stable mapping from name to u32 is sufficient.
        Some(fnv1a(action_name))
    }

    fn table_ecc_counters(&self, _handle: TableHandle) -> (u32, u32) {
        // `snp4.h` exposes no ECC counter query.
        (0, 0)
    }

    fn table_ecc_counters_reset(&mut self, _handle: TableHandle) -> bool {
        // Nothing to reset: the query above is always (0, 0) since
        // `snp4.h` never surfaces real ECC counts in the first place.
        true
    }

    fn counter_init(&mut self, block_name: &str) -> Option<CounterHandle> {
        let handle = self.next_counter_handle;
        self.next_counter_handle += 1;
        self.counters.insert(handle, (block_name.to_string(), CounterState { values: Vec::new() }));
        Some(handle)
    }

    fn counter_exit(&mut self, ctx: CounterHandle) -> bool {
        self.counters.remove(&ctx).is_some()
    }

    fn counter_reset(&mut self, ctx: CounterHandle) -> bool {
        match self.counters.get_mut(&ctx) {
            Some((_, state)) => {
                state.values.iter_mut().for_each(|v| *v = (0, 0));
                true
            }
            None => false,
        }
    }

    fn counter_simple_read(&self, ctx: CounterHandle, index: u32) -> u64 {
        self.counters
            .get(&ctx)
            .and_then(|(_, s)| s.values.get(index as usize))
            .map(|v| v.0)
            .unwrap_or(0)
    }

    fn counter_simple_write(&mut self, ctx: CounterHandle, index: u32, value: u64) -> bool {
        self.ensure_slot(ctx, index);
        match self.counters.get_mut(&ctx) {
            Some((_, s)) => match s.values.get_mut(index as usize) {
                Some(v) => {
                    v.0 = value;
                    true
                }
                None => false,
            },
            None => false,
        }
    }

    fn counter_combo_read(&self, ctx: CounterHandle, index: u32) -> (u64, u64) {
        self.counters.get(&ctx).and_then(|(_, s)| s.values.get(index as usize)).copied().unwrap_or((0, 0))
    }

    fn counter_combo_write(&mut self, ctx: CounterHandle, index: u32, packets: u64, bytes: u64) -> bool {
        self.ensure_slot(ctx, index);
        match self.counters.get_mut(&ctx) {
            Some((_, s)) => match s.values.get_mut(index as usize) {
                Some(v) => {
                    *v = (packets, bytes);
                    true
                }
                None => false,
            },
            None => false,
        }
    }

    fn counter_collect_simple_read(&self, ctx: CounterHandle, start: u32, out: &mut [u64]) -> usize {
        let Some((_, s)) = self.counters.get(&ctx) else { return 0 };
        let mut n = 0;
        for (i, slot) in out.iter_mut().enumerate() {
            match s.values.get(start as usize + i) {
                Some(v) => {
                    *slot = v.0;
                    n += 1;
                }
                None => break,
            }
        }
        n
    }

    fn counter_collect_combo_read(&self, ctx: CounterHandle, start: u32, out: &mut [(u64, u64)]) -> usize {
        let Some((_, s)) = self.counters.get(&ctx) else { return 0 };
        let mut n = 0;
        for (i, slot) in out.iter_mut().enumerate() {
            match s.values.get(start as usize + i) {
                Some(v) => {
                    *slot = *v;
                    n += 1;
                }
                None => break,
            }
        }
        n
    }
}

impl FfiVendor {
    fn ensure_slot(&mut self, ctx: CounterHandle, index: u32) {
        if let Some((_, s)) = self.counters.get_mut(&ctx) {
            if s.values.len() <= index as usize {
                s.values.resize(index as usize + 1, (0, 0));
            }
        }
    }
}

fn fnv1a(s: &str) -> u32 {
    let mut hash: u32 = 0x811c_9dc5;
    for b in s.bytes() {
        hash ^= b as u32;
        hash = hash.wrapping_mul(0x0100_0193);
    }
    hash
}
