//! Memory controller implementations for latency modeling.
//!
//! This module provides:
//! 1. **SimpleController:** Fixed latency per access (the scratchpad default).
//! 2. **DramController:** Row-buffer-aware latency (CAS, RAS, precharge) with an extra
//!    write-recovery penalty, for scratchpads configured as slower backing memories.
//!
//! A controller only decides *how long* an access takes; the owning [`super::Memory`]
//! performs the data movement.

use std::fmt::Debug;

use crate::common::{MemCmd, Tick};

/// Reports the latency of one access.
///
/// Implementors must be `Send + Sync` so the owning target can be moved with the system.
pub trait MemoryController: Send + Sync + Debug {
    /// Returns the number of ticks required for an access.
    ///
    /// # Arguments
    ///
    /// * `addr` - Physical address being accessed (used for row-buffer modeling).
    /// * `cmd` - Request command; writes may cost more than reads.
    ///
    /// # Returns
    ///
    /// Latency in simulation ticks.
    fn access_latency(&mut self, addr: u64, cmd: MemCmd) -> Tick;
}

/// Fixed-latency controller; every access takes the same number of ticks.
#[derive(Clone, Copy, Debug)]
pub struct SimpleController {
    latency: Tick,
}

impl SimpleController {
    /// Creates a simple controller with the given fixed latency.
    pub const fn new(latency: Tick) -> Self {
        Self { latency }
    }
}

impl MemoryController for SimpleController {
    fn access_latency(&mut self, _addr: u64, _cmd: MemCmd) -> Tick {
        self.latency
    }
}

/// Timing parameters for [`DramController`], in ticks.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DramTiming {
    /// Column access strobe latency.
    pub t_cas: Tick,
    /// Row access strobe latency.
    pub t_ras: Tick,
    /// Precharge latency.
    pub t_pre: Tick,
    /// Write recovery added to every write.
    pub t_wr: Tick,
    /// Row size in bytes; must be a power of two.
    pub row_bytes: u64,
}

/// DRAM-style controller with an open-row buffer.
#[derive(Debug)]
pub struct DramController {
    last_row: Option<u64>,
    timing: DramTiming,
    row_mask: u64,
}

impl DramController {
    /// Creates a DRAM controller with no row open.
    ///
    /// # Arguments
    ///
    /// * `timing` - Latencies and row geometry. `row_bytes` is rounded up to a power of
    ///   two.
    pub fn new(timing: DramTiming) -> Self {
        let row_bytes = timing.row_bytes.max(1).next_power_of_two();
        Self {
            last_row: None,
            timing,
            row_mask: !(row_bytes - 1),
        }
    }
}

impl MemoryController for DramController {
    fn access_latency(&mut self, addr: u64, cmd: MemCmd) -> Tick {
        let row = addr & self.row_mask;
        let t = self.timing;
        let base = match self.last_row {
            Some(open_row) if open_row == row => t.t_cas,
            Some(_) => {
                self.last_row = Some(row);
                t.t_pre + t.t_ras + t.t_cas
            }
            None => {
                self.last_row = Some(row);
                t.t_ras + t.t_cas
            }
        };
        if cmd.is_write() { base + t.t_wr } else { base }
    }
}
