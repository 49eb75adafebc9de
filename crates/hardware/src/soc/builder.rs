//! System construction and top-level `System` type.
//!
//! This module builds the complete system from configuration and runs its event loop.
//! It performs:
//! 1. **Page table:** Installs configured mappings, or identity-maps every scratchpad.
//! 2. **Engine:** Creates the IDMA with the translator for the configured mode.
//! 3. **Targets:** Instantiates each scratchpad with a simple or DRAM latency model and
//!    registers it on the crossbar.
//! 4. **Event loop:** Dispatches scheduled events to their owners; fatal errors stop the
//!    loop and are returned to the caller.

use std::sync::Arc;

use tracing::{debug, trace};

use crate::common::constants::{
    IDMA_WINDOW_SIZE, REG_COMMAND, REG_DST_ADDR, REG_SIZE, REG_SRC_ADDR, REG_STATUS,
};
use crate::common::{AddrRange, Packet, PhysAddr, Result, SimError, Tick, VirtAddr};
use crate::config::{Config, LatencyModel, ScratchpadConfig};
use crate::sim::event::{Event, EventQueue, Scheduler};
use crate::soc::devices::Idma;
use crate::soc::devices::idma::controller::Completion;
use crate::soc::devices::idma::registers::TransferStatus;
use crate::soc::devices::idma::translate;
use crate::soc::interconnect::Crossbar;
use crate::soc::memory::controller::{
    DramController, DramTiming, MemoryController, SimpleController,
};
use crate::soc::memory::page_table::EmulationPageTable;
use crate::soc::memory::scratchpad::ScratchpadMemory;
use crate::soc::traits::MemoryMappedDevice;
use crate::stats::{DmaStats, PortStats};

/// Result of a CPU-side register read.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MmioResponse {
    /// Value read.
    pub value: u64,
    /// Tick the response is available.
    pub ready_at: Tick,
}

/// Top-level system instance: the engine, its memory targets, and the event queue.
#[derive(Debug)]
pub struct System {
    events: EventQueue,
    idma: Idma,
    xbar: Crossbar,
    page_table: Arc<EmulationPageTable>,
    max_ticks: Option<Tick>,
    next_mmio_id: u64,
}

fn build_controller(spm: &ScratchpadConfig) -> Box<dyn MemoryController> {
    match spm.latency_model {
        LatencyModel::Simple => Box::new(SimpleController::new(spm.latency)),
        LatencyModel::Dram => Box::new(DramController::new(DramTiming {
            t_cas: spm.t_cas,
            t_ras: spm.t_ras,
            t_pre: spm.t_pre,
            t_wr: spm.t_wr,
            row_bytes: spm.row_bytes,
        })),
    }
}

fn build_page_table(config: &Config) -> Result<EmulationPageTable> {
    let mut pt = EmulationPageTable::new();
    if config.page_table.mappings.is_empty() {
        for spm in &config.scratchpads {
            pt.identity_map(spm.range())?;
        }
    } else {
        for m in &config.page_table.mappings {
            pt.map(VirtAddr::new(m.vaddr), PhysAddr::new(m.paddr), m.size)?;
        }
    }
    Ok(pt)
}

impl System {
    /// Builds a new system from configuration.
    ///
    /// # Arguments
    ///
    /// * `config` - Simulator configuration.
    ///
    /// # Returns
    ///
    /// A fully constructed `System` at tick zero.
    ///
    /// # Errors
    ///
    /// Fails if the configuration is invalid, a page mapping conflicts, or two
    /// scratchpads overlap.
    pub fn new(config: &Config) -> Result<Self> {
        config.validate()?;

        let page_table = Arc::new(build_page_table(config)?);
        let translator = translate::for_mode(config.general.mode, Arc::clone(&page_table));
        let idma = Idma::new(&config.idma, translator);

        let mut xbar = Crossbar::new();
        for spm in &config.scratchpads {
            let target =
                ScratchpadMemory::new(spm.name.clone(), spm.base, spm.size, build_controller(spm))?;
            let port = xbar.add_target(Box::new(target))?;
            debug!(name = %spm.name, range = %spm.range(), port, "scratchpad registered");
        }

        Ok(Self {
            events: EventQueue::new(),
            idma,
            xbar,
            page_table,
            max_ticks: config.general.max_ticks,
            next_mmio_id: 0,
        })
    }

    /// Current simulation tick.
    pub fn now(&self) -> Tick {
        self.events.now()
    }

    /// The DMA engine.
    pub const fn idma(&self) -> &Idma {
        &self.idma
    }

    /// Mutable access to the DMA engine (e.g. to take completions).
    pub const fn idma_mut(&mut self) -> &mut Idma {
        &mut self.idma
    }

    /// The crossbar and its targets.
    pub const fn crossbar(&self) -> &Crossbar {
        &self.xbar
    }

    /// The emulation page table shared with the translator.
    pub fn page_table(&self) -> &EmulationPageTable {
        &self.page_table
    }

    /// Sets or clears the tick limit used by the `run_*` methods.
    pub const fn set_max_ticks(&mut self, limit: Option<Tick>) {
        self.max_ticks = limit;
    }

    const fn idma_window(&self) -> AddrRange {
        AddrRange::new(self.idma.base(), IDMA_WINDOW_SIZE)
    }

    fn mmio_packet_id(&mut self) -> u64 {
        let id = self.next_mmio_id;
        self.next_mmio_id += 1;
        id
    }

    /// Reads an engine register from the CPU side.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::NoRoute`] outside the register window and propagates fatal
    /// register errors.
    pub fn mmio_read(&mut self, addr: u64, width: usize) -> Result<MmioResponse> {
        if !self.idma_window().contains(addr) {
            return Err(SimError::NoRoute { addr });
        }
        let mut pkt = Packet::read(self.mmio_packet_id(), addr, width);
        let latency = self.idma.read(&mut pkt, &mut self.events)?;
        Ok(MmioResponse {
            value: pkt.get_le(),
            ready_at: self.now() + latency,
        })
    }

    /// Writes an engine register from the CPU side.
    ///
    /// A COMMAND write with bit 0 set starts a transfer before this call returns.
    ///
    /// # Returns
    ///
    /// Tick the write response is available.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::NoRoute`] outside the register window and propagates fatal
    /// register and transfer-start errors.
    pub fn mmio_write(&mut self, addr: u64, width: usize, value: u64) -> Result<Tick> {
        if !self.idma_window().contains(addr) {
            return Err(SimError::NoRoute { addr });
        }
        let mut pkt = Packet::write(self.mmio_packet_id(), addr, vec![0; width]);
        pkt.set_le(value);
        let latency = self.idma.write(&mut pkt, &mut self.events)?;
        Ok(self.now() + latency)
    }

    /// Copies `data` into physical memory without timing.
    ///
    /// # Errors
    ///
    /// Fails if the span is not backed by a single scratchpad.
    pub fn load(&mut self, addr: u64, data: &[u8]) -> Result<()> {
        self.xbar.functional_write(addr, data)
    }

    /// Reads `len` bytes of physical memory without timing.
    ///
    /// # Errors
    ///
    /// Fails if the span is not backed by a single scratchpad.
    pub fn dump(&mut self, addr: u64, len: usize) -> Result<Vec<u8>> {
        let mut buf = vec![0; len];
        self.xbar.functional_read(addr, &mut buf)?;
        Ok(buf)
    }

    /// Performs an untimed access straight through the crossbar. Nothing is queued and
    /// simulated time does not advance.
    ///
    /// # Returns
    ///
    /// The latency the target reports for the access.
    ///
    /// # Errors
    ///
    /// Fails if the address is unrouted or the access leaves its scratchpad.
    pub fn atomic_access(&mut self, pkt: &mut Packet) -> Result<Tick> {
        self.xbar.atomic_access(pkt)
    }

    /// Fires the next event.
    ///
    /// # Returns
    ///
    /// The event fired and its tick, or `None` if the queue was empty.
    ///
    /// # Errors
    ///
    /// Propagates any fatal error raised while handling the event.
    pub fn step(&mut self) -> Result<Option<(Tick, Event)>> {
        let Some((tick, event)) = self.events.pop() else {
            return Ok(None);
        };
        trace!(tick, ?event, "dispatch");

        match event {
            Event::RespDrain(port) => {
                self.xbar
                    .target_mut(port)?
                    .drain_on_event(&mut self.idma, &mut self.events)?;
            }
            Event::DmaIssue => {
                if let Some(pkt) = self.idma.issue(&mut self.events)? {
                    let port = self.xbar.route(pkt.addr())?;
                    let _ = self.xbar.target_mut(port)?.submit(pkt, &mut self.events)?;
                }
            }
            Event::DmaRecvRetry => {
                for port in self.idma.take_refused_senders() {
                    self.xbar
                        .target_mut(port)?
                        .on_peer_ready(&mut self.idma, &mut self.events)?;
                }
            }
        }
        Ok(Some((tick, event)))
    }

    /// Fires every event scheduled at or before `tick`, then advances time to `tick`.
    ///
    /// # Errors
    ///
    /// Propagates any fatal error raised while handling an event.
    pub fn run_until(&mut self, tick: Tick) -> Result<()> {
        while self.events.peek_tick().is_some_and(|t| t <= tick) {
            let _ = self.step()?;
        }
        self.events.advance_to(tick);
        Ok(())
    }

    /// Runs until no events remain.
    ///
    /// # Returns
    ///
    /// The tick of the last event fired.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::Stalled`] if the tick limit would be exceeded, and propagates
    /// fatal errors from event handlers.
    pub fn run_until_idle(&mut self) -> Result<Tick> {
        while let Some(next) = self.events.peek_tick() {
            self.check_limit(next, "event queue to drain")?;
            let _ = self.step()?;
        }
        Ok(self.now())
    }

    fn check_limit(&self, tick: Tick, reason: &'static str) -> Result<()> {
        match self.max_ticks {
            Some(limit) if tick > limit => Err(SimError::Stalled {
                tick: self.now(),
                reason,
            }),
            _ => Ok(()),
        }
    }

    /// Programs and runs one transfer the way driver software does: writes SRC_ADDR,
    /// DST_ADDR, SIZE and COMMAND, then polls STATUS until it reads Complete.
    ///
    /// # Returns
    ///
    /// The completion record.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::TransferRejected`] if the engine is already busy with
    /// another transfer, [`SimError::Stalled`] if the engine goes quiet or the tick
    /// limit passes before completion, and propagates fatal errors.
    pub fn run_transfer(&mut self, src: u64, dst: u64, len: u32) -> Result<Completion> {
        let rejected = SimError::TransferRejected {
            src,
            dst,
            len: u64::from(len),
        };
        if self.idma.controller().is_busy() {
            return Err(rejected);
        }

        let base = self.idma.base();
        let _ = self.idma.take_completion();
        let rejections = self.idma.stats().transfers_rejected;

        for (offset, width, value) in [
            (REG_SRC_ADDR, 8, src),
            (REG_DST_ADDR, 8, dst),
            (REG_SIZE, 4, u64::from(len)),
            (REG_COMMAND, 4, 1),
        ] {
            let ready = self.mmio_write(base + offset, width, value)?;
            self.run_until(ready)?;
        }
        // Something else may have started the engine while the registers were written.
        if self.idma.stats().transfers_rejected != rejections {
            return Err(rejected);
        }

        loop {
            let status = self.mmio_read(base + REG_STATUS, 4)?;
            self.check_limit(status.ready_at, "IDMA transfer to complete")?;
            self.run_until(status.ready_at)?;
            if status.value == u64::from(TransferStatus::Complete.bits()) {
                break;
            }
            if self.events.is_empty() && self.idma.controller().status() != TransferStatus::Complete
            {
                return Err(SimError::Stalled {
                    tick: self.now(),
                    reason: "IDMA transfer to complete",
                });
            }
        }

        let done = self.idma.take_completion().ok_or(SimError::Stalled {
            tick: self.now(),
            reason: "IDMA completion record",
        })?;
        // The length may have been clamped; the addresses never change.
        if done.params.src.val() != src
            || done.params.dst.val() != dst
            || done.params.len > u64::from(len)
        {
            return Err(rejected);
        }
        Ok(done)
    }

    /// Snapshot of engine and port statistics.
    pub fn stats(&self) -> DmaStats {
        let mut stats = self.idma.stats().clone();
        stats.ticks = self.now();
        stats.ports = self
            .xbar
            .targets()
            .map(|t| PortStats {
                name: t.name().to_string(),
                queue: t.port_stats(),
            })
            .collect();
        stats
    }
}
