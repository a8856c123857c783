use std::sync::Arc;

use snic_device::Bar2;
use thiserror::Error;

/// Number of queue-indirection-table entries per function, and hence the
/// per-function queue ceiling. The original driver carries this as a TODO
/// ("what is the actual total?") rather than a confirmed hardware limit.
pub const FUNCTION_QUEUES: u32 = 2048;
pub const QDMA_MAX_QUEUES: u32 = 2 * FUNCTION_QUEUES;

mod regs {
    pub const QCONF: usize = 0x00;
    pub const INDIR_TABLE: usize = 0x04;

    pub const QBASE_MASK: u32 = 0x0000_ffff;
    pub const NUMQ_SHIFT: u32 = 16;
    pub const NUMQ_MASK: u32 = 0xffff;

    pub fn encode_qconf(base_queue: u32, num_queues: u32) -> u32 {
        (base_queue & QBASE_MASK) | ((num_queues & NUMQ_MASK) << NUMQ_SHIFT)
    }

    pub fn decode_qconf(qconf: u32) -> (u32, u32) {
        (qconf & QBASE_MASK, (qconf >> NUMQ_SHIFT) & NUMQ_MASK)
    }
}

#[derive(Debug, Error)]
pub enum HostError {
    #[error("requested {num_queues} queues exceeds FUNCTION_QUEUES ({FUNCTION_QUEUES})")]
    TooManyQueues { num_queues: u32 },
    #[error("base_queue {base_queue} + num_queues {num_queues} exceeds QDMA_MAX_QUEUES ({QDMA_MAX_QUEUES})")]
    RangeExceedsMax { base_queue: u32, num_queues: u32 },
}

/// One PF/VF's QDMA queue-range configuration: a `qconf` register plus its
/// indirection table, both word-atomic.
pub struct Host {
    bar2: Arc<Bar2>,
    base: usize,
}

impl Host {
    pub fn new(bar2: Arc<Bar2>, base: usize) -> Self {
        Host { bar2, base }
    }

    pub fn get_queues(&self) -> (u32, u32) {
        let qconf = self.bar2.read_u32(self.base + regs::QCONF);
        regs::decode_qconf(qconf)
    }

    /// Sets the function's queue range and fills its indirection table with
    /// `q % max(num_queues, 1)` so every entry maps into the requested
    /// range, matching the upstream RSS fallback behavior.
    pub fn set_queues(&self, base_queue: u32, num_queues: u32) -> Result<(), HostError> {
        if num_queues > FUNCTION_QUEUES {
            return Err(HostError::TooManyQueues { num_queues });
        }
        if base_queue + num_queues > QDMA_MAX_QUEUES {
            return Err(HostError::RangeExceedsMax { base_queue, num_queues });
        }

        let spread = num_queues.max(1);
        for q in 0..FUNCTION_QUEUES {
            self.bar2
                .write_u32(self.base + regs::INDIR_TABLE + (q as usize) * 4, q % spread);
        }
        self.bar2.barrier();

        self.bar2
            .write_u32(self.base + regs::QCONF, regs::encode_qconf(base_queue, num_queues));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::regs::{decode_qconf, encode_qconf};

    #[test]
    fn qconf_round_trips_through_encode_decode() {
        let encoded = encode_qconf(128, 64);
        assert_eq!(decode_qconf(encoded), (128, 64));
    }
}
