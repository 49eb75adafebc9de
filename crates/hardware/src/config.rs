//! Configuration system for the scratchpad DMA simulator.
//!
//! This module defines all configuration structures and enums used to parameterize
//! the simulator. It provides:
//! 1. **Defaults:** Baseline constants (IDMA base, PIO latency, staging capacity, the
//!    scratchpad memory map).
//! 2. **Structures:** Hierarchical config for general, IDMA, scratchpad, and page-table
//!    settings.
//! 3. **Enums:** Simulation mode, oversize policy, and latency model.
//!
//! Configuration is supplied as JSON (`Config::from_json`) or taken from
//! `Config::default()`, which reproduces the standard L1I/L1D/L2 scratchpad layout.

use serde::{Deserialize, Serialize};

use crate::common::{AddrRange, Result, SimError};
use crate::common::constants::{IDMA_WINDOW_SIZE, PAGE_OFFSET_MASK};

/// Default configuration constants for the simulator.
mod defaults {
    /// Base address of the IDMA register window.
    pub const IDMA_BASE: u64 = 0x8006_0000;

    /// Latency of every IDMA register access, in ticks.
    pub const PIO_LATENCY: u64 = crate::common::constants::PIO_LATENCY;

    /// Staging buffer capacity (1 MiB).
    pub const STAGING_CAPACITY: usize = crate::common::constants::STAGING_CAPACITY;

    /// Largest DMA request in bytes (one cache line).
    pub const CHUNK_SIZE: u64 = 64;

    /// Ticks between consecutive DMA requests.
    pub const ISSUE_INTERVAL: u64 = 1;

    /// Ticks the engine's receive path stays busy per response (0 = never busy).
    pub const RECV_OCCUPANCY: u64 = 0;

    /// Fixed scratchpad access latency in ticks.
    pub const SPM_LATENCY: u64 = 2;

    /// CAS latency for DRAM-modeled scratchpads.
    pub const T_CAS: u64 = 14;

    /// RAS latency for DRAM-modeled scratchpads.
    pub const T_RAS: u64 = 14;

    /// Precharge latency for DRAM-modeled scratchpads.
    pub const T_PRE: u64 = 14;

    /// Write recovery for DRAM-modeled scratchpads.
    pub const T_WR: u64 = 0;

    /// Row size for DRAM-modeled scratchpads (2 KiB).
    pub const ROW_BYTES: u64 = 2048;

    /// Instruction scratchpad base (64 KiB).
    pub const L1I_BASE: u64 = 0x8000_0000;
    /// Data scratchpad base (64 KiB).
    pub const L1D_BASE: u64 = 0x8001_0000;
    /// Level-2 scratchpad base (256 KiB).
    pub const L2_BASE: u64 = 0x8002_0000;
    /// Size of each level-1 scratchpad.
    pub const L1_SIZE: u64 = 64 * 1024;
    /// Size of the level-2 scratchpad.
    pub const L2_SIZE: u64 = 256 * 1024;
}

/// Addressing mode of the simulated workload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum SimMode {
    /// Syscall emulation: DMA addresses are process virtual addresses translated through
    /// the emulation page table.
    #[default]
    #[serde(alias = "SE")]
    SyscallEmulation,
    /// Full system: DMA address translation is not available.
    #[serde(alias = "FS")]
    FullSystem,
}

impl SimMode {
    /// Mode name used in messages.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::SyscallEmulation => "syscall-emulation",
            Self::FullSystem => "full-system",
        }
    }
}

/// What to do with a transfer longer than the staging buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum OversizePolicy {
    /// Abort the simulation.
    #[default]
    Fatal,
    /// Copy only the first `staging_capacity` bytes and warn.
    Clamp,
}

/// Scratchpad latency model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum LatencyModel {
    /// Every access takes `latency` ticks.
    #[default]
    Simple,
    /// Open-row model using `t_cas`, `t_ras`, `t_pre`, `t_wr` and `row_bytes`.
    #[serde(alias = "DRAM")]
    Dram,
}

/// Root configuration structure.
///
/// Every section may be omitted and falls back to its defaults.
///
/// # Examples
///
/// ```
/// use spmsim_core::config::{Config, OversizePolicy};
///
/// let json = r#"{
///     "idma": { "oversize_policy": "Clamp", "chunk_size": 32 },
///     "scratchpads": [
///         { "name": "spm", "base": 0, "size": 65536 }
///     ]
/// }"#;
///
/// let config = Config::from_json(json).unwrap();
/// assert_eq!(config.idma.oversize_policy, OversizePolicy::Clamp);
/// assert_eq!(config.idma.base, 0x8006_0000);
/// assert_eq!(config.scratchpads[0].latency, 2);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// General simulation settings.
    #[serde(default)]
    pub general: GeneralConfig,
    /// DMA engine parameters.
    #[serde(default)]
    pub idma: IdmaConfig,
    /// Scratchpad memories reachable by the engine.
    #[serde(default = "Config::default_scratchpads")]
    pub scratchpads: Vec<ScratchpadConfig>,
    /// Emulation page table contents.
    #[serde(default)]
    pub page_table: PageTableConfig,
}

impl Config {
    fn default_scratchpads() -> Vec<ScratchpadConfig> {
        vec![
            ScratchpadConfig::new("l1i", defaults::L1I_BASE, defaults::L1_SIZE),
            ScratchpadConfig::new("l1d", defaults::L1D_BASE, defaults::L1_SIZE),
            ScratchpadConfig::new("l2", defaults::L2_BASE, defaults::L2_SIZE),
        ]
    }

    /// Parses and validates a JSON configuration.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::ConfigParse`] for malformed JSON and [`SimError::Config`] for
    /// inconsistent values.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Serializes the configuration as pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::ConfigParse`] if serialization fails.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Checks cross-field consistency.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::Config`] describing the first problem found.
    pub fn validate(&self) -> Result<()> {
        let idma = &self.idma;
        if idma.staging_capacity == 0 {
            return Err(SimError::Config("idma.staging_capacity must be non-zero".into()));
        }
        if !idma.chunk_size.is_power_of_two() {
            return Err(SimError::Config(format!(
                "idma.chunk_size {} is not a power of two",
                idma.chunk_size
            )));
        }
        if idma.base & (IDMA_WINDOW_SIZE - 1) != 0 {
            return Err(SimError::Config(format!(
                "idma.base {:#x} is not aligned to the register window",
                idma.base
            )));
        }
        if self.scratchpads.is_empty() {
            return Err(SimError::Config("at least one scratchpad is required".into()));
        }

        let window = AddrRange::new(idma.base, IDMA_WINDOW_SIZE);
        for (i, spm) in self.scratchpads.iter().enumerate() {
            if spm.size == 0 {
                return Err(SimError::Config(format!("scratchpad {} has zero size", spm.name)));
            }
            if spm.base.checked_add(spm.size).is_none() {
                return Err(SimError::Config(format!(
                    "scratchpad {} wraps the address space",
                    spm.name
                )));
            }
            if spm.range().overlaps(&window) {
                return Err(SimError::Config(format!(
                    "scratchpad {} overlaps the IDMA register window",
                    spm.name
                )));
            }
            if self.scratchpads[..i].iter().any(|other| other.name == spm.name) {
                return Err(SimError::Config(format!(
                    "duplicate scratchpad name {}",
                    spm.name
                )));
            }
        }

        for m in &self.page_table.mappings {
            if m.vaddr & PAGE_OFFSET_MASK != 0 || m.paddr & PAGE_OFFSET_MASK != 0 {
                return Err(SimError::Config(format!(
                    "page mapping {:#x} -> {:#x} is not page aligned",
                    m.vaddr, m.paddr
                )));
            }
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            general: GeneralConfig::default(),
            idma: IdmaConfig::default(),
            scratchpads: Self::default_scratchpads(),
            page_table: PageTableConfig::default(),
        }
    }
}

/// General simulation settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Addressing mode (`"SyscallEmulation"`/`"SE"` or `"FullSystem"`/`"FS"`).
    #[serde(default)]
    pub mode: SimMode,

    /// Tick limit for runs that do not give their own; `None` means unbounded.
    #[serde(default)]
    pub max_ticks: Option<u64>,
}

/// DMA engine parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdmaConfig {
    /// Physical base address of the register window.
    #[serde(default = "IdmaConfig::default_base")]
    pub base: u64,

    /// Latency of every register access, in ticks.
    #[serde(default = "IdmaConfig::default_pio_latency")]
    pub pio_latency: u64,

    /// Staging buffer capacity in bytes.
    #[serde(default = "IdmaConfig::default_staging_capacity")]
    pub staging_capacity: usize,

    /// Handling of transfers longer than the staging buffer.
    #[serde(default)]
    pub oversize_policy: OversizePolicy,

    /// Largest DMA request in bytes; must be a power of two.
    #[serde(default = "IdmaConfig::default_chunk_size")]
    pub chunk_size: u64,

    /// Ticks between consecutive requests.
    #[serde(default = "IdmaConfig::default_issue_interval")]
    pub issue_interval: u64,

    /// Ticks the receive path stays busy after accepting a response.
    #[serde(default = "IdmaConfig::default_recv_occupancy")]
    pub recv_occupancy: u64,
}

impl IdmaConfig {
    fn default_base() -> u64 {
        defaults::IDMA_BASE
    }

    fn default_pio_latency() -> u64 {
        defaults::PIO_LATENCY
    }

    fn default_staging_capacity() -> usize {
        defaults::STAGING_CAPACITY
    }

    fn default_chunk_size() -> u64 {
        defaults::CHUNK_SIZE
    }

    fn default_issue_interval() -> u64 {
        defaults::ISSUE_INTERVAL
    }

    fn default_recv_occupancy() -> u64 {
        defaults::RECV_OCCUPANCY
    }
}

impl Default for IdmaConfig {
    fn default() -> Self {
        Self {
            base: defaults::IDMA_BASE,
            pio_latency: defaults::PIO_LATENCY,
            staging_capacity: defaults::STAGING_CAPACITY,
            oversize_policy: OversizePolicy::default(),
            chunk_size: defaults::CHUNK_SIZE,
            issue_interval: defaults::ISSUE_INTERVAL,
            recv_occupancy: defaults::RECV_OCCUPANCY,
        }
    }
}

/// One scratchpad memory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScratchpadConfig {
    /// Name used in traces and statistics.
    pub name: String,

    /// Physical base address.
    pub base: u64,

    /// Size in bytes.
    pub size: u64,

    /// Latency model.
    #[serde(default)]
    pub latency_model: LatencyModel,

    /// Fixed latency for the `Simple` model.
    #[serde(default = "ScratchpadConfig::default_latency")]
    pub latency: u64,

    /// CAS latency for the `Dram` model.
    #[serde(default = "ScratchpadConfig::default_t_cas")]
    pub t_cas: u64,

    /// RAS latency for the `Dram` model.
    #[serde(default = "ScratchpadConfig::default_t_ras")]
    pub t_ras: u64,

    /// Precharge latency for the `Dram` model.
    #[serde(default = "ScratchpadConfig::default_t_pre")]
    pub t_pre: u64,

    /// Write recovery for the `Dram` model.
    #[serde(default = "ScratchpadConfig::default_t_wr")]
    pub t_wr: u64,

    /// Row size for the `Dram` model.
    #[serde(default = "ScratchpadConfig::default_row_bytes")]
    pub row_bytes: u64,
}

impl ScratchpadConfig {
    /// Creates a simple-latency scratchpad with default timings.
    pub fn new(name: impl Into<String>, base: u64, size: u64) -> Self {
        Self {
            name: name.into(),
            base,
            size,
            latency_model: LatencyModel::Simple,
            latency: defaults::SPM_LATENCY,
            t_cas: defaults::T_CAS,
            t_ras: defaults::T_RAS,
            t_pre: defaults::T_PRE,
            t_wr: defaults::T_WR,
            row_bytes: defaults::ROW_BYTES,
        }
    }

    /// Physical range of the scratchpad.
    pub const fn range(&self) -> AddrRange {
        AddrRange::new(self.base, self.size)
    }

    fn default_latency() -> u64 {
        defaults::SPM_LATENCY
    }

    fn default_t_cas() -> u64 {
        defaults::T_CAS
    }

    fn default_t_ras() -> u64 {
        defaults::T_RAS
    }

    fn default_t_pre() -> u64 {
        defaults::T_PRE
    }

    fn default_t_wr() -> u64 {
        defaults::T_WR
    }

    fn default_row_bytes() -> u64 {
        defaults::ROW_BYTES
    }
}

/// Emulation page table contents.
///
/// An empty mapping list identity-maps every scratchpad.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageTableConfig {
    /// Virtual to physical mappings.
    #[serde(default)]
    pub mappings: Vec<MappingConfig>,
}

/// One page-aligned mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappingConfig {
    /// Virtual base address.
    pub vaddr: u64,
    /// Physical base address.
    pub paddr: u64,
    /// Length in bytes, rounded up to whole pages.
    pub size: u64,
}
