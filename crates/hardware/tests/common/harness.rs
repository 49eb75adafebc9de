use spmsim_core::common::Tick;
use spmsim_core::common::constants::{
    REG_COMMAND, REG_DST_ADDR, REG_SIZE, REG_SRC_ADDR, REG_STATUS,
};
use spmsim_core::config::{Config, ScratchpadConfig};
use spmsim_core::soc::System;
use spmsim_core::stats::DmaStats;
use spmsim_core::Result;
use tracing_subscriber::EnvFilter;

/// Base of the single scratchpad used by [`small_config`].
pub const SPM_BASE: u64 = 0x0;

/// Size of the single scratchpad used by [`small_config`].
pub const SPM_SIZE: u64 = 64 * 1024;

/// Source address used by most scenarios.
pub const SRC: u64 = 0x1000;

/// Destination address used by most scenarios.
pub const DST: u64 = 0x2000;

/// Installs a test-writer subscriber once per process; later calls are no-ops.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter(EnvFilter::new("spmsim_core=debug"))
        .try_init();
}

/// One identity-mapped 64 KiB scratchpad at address zero, engine at its default base.
pub fn small_config() -> Config {
    let mut config = Config::default();
    config.scratchpads = vec![ScratchpadConfig::new("spm", SPM_BASE, SPM_SIZE)];
    config
}

/// Little-endian words `0xDEAD0000 + i`, truncated to `len` bytes.
pub fn pattern(len: usize) -> Vec<u8> {
    (0u32..)
        .flat_map(|i| 0xDEAD_0000u32.wrapping_add(i).to_le_bytes())
        .take(len)
        .collect()
}

pub struct TestContext {
    pub sys: System,
}

impl Default for TestContext {
    fn default() -> Self {
        Self::new()
    }
}

impl TestContext {
    pub fn new() -> Self {
        Self::with_config(&small_config())
    }

    pub fn with_config(config: &Config) -> Self {
        init_tracing();
        Self {
            sys: System::new(config).unwrap(),
        }
    }

    /// Register window base.
    pub fn base(&self) -> u64 {
        self.sys.idma().base()
    }

    pub fn write_reg(&mut self, offset: u64, width: usize, value: u64) -> Result<Tick> {
        let addr = self.base() + offset;
        self.sys.mmio_write(addr, width, value)
    }

    pub fn read_reg(&mut self, offset: u64, width: usize) -> Result<u64> {
        let addr = self.base() + offset;
        self.sys.mmio_read(addr, width).map(|r| r.value)
    }

    /// Writes SRC_ADDR, DST_ADDR and SIZE without starting.
    pub fn program(&mut self, src: u64, dst: u64, len: u32) {
        let _ = self.write_reg(REG_SRC_ADDR, 8, src).unwrap();
        let _ = self.write_reg(REG_DST_ADDR, 8, dst).unwrap();
        let _ = self.write_reg(REG_SIZE, 4, u64::from(len)).unwrap();
    }

    /// Writes the start bit.
    pub fn start(&mut self) -> Result<Tick> {
        self.write_reg(REG_COMMAND, 4, 1)
    }

    pub fn status(&mut self) -> u64 {
        self.read_reg(REG_STATUS, 4).unwrap()
    }

    pub fn load(&mut self, addr: u64, data: &[u8]) {
        self.sys.load(addr, data).unwrap();
    }

    pub fn dump(&mut self, addr: u64, len: usize) -> Vec<u8> {
        self.sys.dump(addr, len).unwrap()
    }

    pub fn run_to_idle(&mut self) -> Tick {
        self.sys.run_until_idle().unwrap()
    }

    pub fn stats(&self) -> DmaStats {
        self.sys.stats()
    }
}
