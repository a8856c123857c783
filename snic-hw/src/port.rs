use std::sync::Arc;

use snic_device::Bar2;

mod regs {
    pub const RESET: usize = 0x00;
    pub const GT_LOOPBACK: usize = 0x04;
    pub const CONF_RX_1: usize = 0x08;
    pub const CONF_TX_1: usize = 0x0c;
    pub const STAT_TX_STATUS: usize = 0x10;
    pub const STAT_RX_STATUS: usize = 0x14;
    pub const RSFEC_CONF_IND_CORRECTION: usize = 0x18;
    pub const RSFEC_CONF_ENABLE: usize = 0x1c;

    pub const RESET_USR_TX: u32 = 1 << 0;
    pub const RESET_USR_RX: u32 = 1 << 1;

    pub const CTL_RX_ENABLE: u32 = 1 << 0;
    pub const CTL_TX_ENABLE: u32 = 1 << 0;

    pub const STAT_RX_STATUS_BIT: u32 = 1 << 0;
    pub const STAT_RX_ALIGNED: u32 = 1 << 1;

    pub const RSFEC_IEEE_ERR_IND_MODE: u32 = 1 << 0;
    pub const RSFEC_EN_IND: u32 = 1 << 1;
    pub const RSFEC_EN_COR: u32 = 1 << 2;
    pub const RSFEC_TX_ENABLE: u32 = 1 << 0;
    pub const RSFEC_RX_ENABLE: u32 = 1 << 1;
}

/// One 100Gb Ethernet MAC (CMAC). Holds no lock of its own: every register
/// it owns is word-atomic, so concurrent callers only need the barrier the
/// register primitive already provides.
pub struct Port {
    bar2: Arc<Bar2>,
    base: usize,
}

impl Port {
    pub fn new(bar2: Arc<Bar2>, base: usize) -> Self {
        Port { bar2, base }
    }

    fn reg(&self, offset: usize) -> usize {
        self.base + offset
    }

    /// Pulses `usr_tx_reset`/`usr_rx_reset` high then low.
    pub fn reset(&self) {
        self.bar2.write_u32(
            self.reg(regs::RESET),
            regs::RESET_USR_TX | regs::RESET_USR_RX,
        );
        self.bar2.barrier();
        self.bar2.write_u32(self.reg(regs::RESET), 0);
    }

    pub fn loopback_enable(&self) {
        self.bar2.write_u32(self.reg(regs::GT_LOOPBACK), 1);
    }

    pub fn loopback_disable(&self) {
        self.bar2.write_u32(self.reg(regs::GT_LOOPBACK), 0);
    }

    pub fn loopback_is_enabled(&self) -> bool {
        self.bar2.read_u32(self.reg(regs::GT_LOOPBACK)) != 0
    }

    /// Enables rx/tx and confirms the status registers settle to the
    /// expected steady state; two reads of `stat_rx_status` clear sticky
    /// link-down bits before the real read.
    pub fn enable(&self) -> bool {
        self.bar2
            .write_u32(self.reg(regs::CONF_RX_1), regs::CTL_RX_ENABLE);
        self.bar2
            .write_u32(self.reg(regs::CONF_TX_1), regs::CTL_TX_ENABLE);
        self.bar2.barrier();

        let tx_status = self.bar2.read_u32_latched(self.reg(regs::STAT_TX_STATUS));
        let rx_status = self.bar2.read_u32_latched(self.reg(regs::STAT_RX_STATUS));

        tx_status == 0 && rx_status == (regs::STAT_RX_STATUS_BIT | regs::STAT_RX_ALIGNED)
    }

    pub fn disable(&self) {
        self.bar2.write_u32(self.reg(regs::CONF_RX_1), 0);
        self.bar2.write_u32(self.reg(regs::CONF_TX_1), 0);
        self.bar2.barrier();
    }

    pub fn is_enabled(&self) -> bool {
        let rx = self.bar2.read_u32(self.reg(regs::CONF_RX_1)) & regs::CTL_RX_ENABLE != 0;
        let tx = self.bar2.read_u32(self.reg(regs::CONF_TX_1)) & regs::CTL_TX_ENABLE != 0;
        rx && tx
    }

    pub fn rsfec_enable(&self) {
        self.bar2.write_u32(
            self.reg(regs::RSFEC_CONF_IND_CORRECTION),
            regs::RSFEC_IEEE_ERR_IND_MODE | regs::RSFEC_EN_IND | regs::RSFEC_EN_COR,
        );
        self.bar2.write_u32(
            self.reg(regs::RSFEC_CONF_ENABLE),
            regs::RSFEC_TX_ENABLE | regs::RSFEC_RX_ENABLE,
        );
        self.bar2.barrier();
        self.reset();
    }

    pub fn rsfec_disable(&self) {
        self.bar2
            .write_u32(self.reg(regs::RSFEC_CONF_IND_CORRECTION), 0);
        self.bar2.write_u32(self.reg(regs::RSFEC_CONF_ENABLE), 0);
        self.bar2.barrier();
    }

    pub fn rsfec_is_enabled(&self) -> bool {
        let reg = self.bar2.read_u32(self.reg(regs::RSFEC_CONF_ENABLE));
        reg & regs::RSFEC_TX_ENABLE != 0 && reg & regs::RSFEC_RX_ENABLE != 0
    }

    /// Link up requires both `stat_rx_status` and `stat_rx_aligned`; reads
    /// twice first to clear the sticky bits per the CMAC's read-to-clear
    /// semantics.
    pub fn link_up(&self) -> bool {
        let status = self.bar2.read_u32_latched(self.reg(regs::STAT_RX_STATUS));
        status & regs::STAT_RX_STATUS_BIT != 0 && status & regs::STAT_RX_ALIGNED != 0
    }
}
