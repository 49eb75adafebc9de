//! IDMA: scratchpad DMA engine.
//!
//! A memory-mapped DMA engine that copies between scratchpads through a staging buffer.
//! Software programs SRC_ADDR, DST_ADDR and SIZE, then writes COMMAND with bit 0 set;
//! the engine snapshots the registers, reads the source range into its staging buffer,
//! writes the buffer to the destination, and finally reports Complete in STATUS.
//!
//! The pieces are:
//! 1. **Registers:** Offset and width decoding ([`registers`]).
//! 2. **Controller:** The Idle/Busy/Complete state machine that owns the staging buffer.
//! 3. **DMA port:** Chunked request issue and response throttling.
//! 4. **Translator:** Virtual to physical resolution for the active mode.

/// Transfer state machine and staging buffer.
pub mod controller;

/// Chunked requester port.
pub mod dma_port;

/// Register file and decoder.
pub mod registers;

/// Mode-dependent address translation.
pub mod translate;

use tracing::debug;

use self::controller::{Completion, StartOutcome, TransferController, TransferParams};
use self::dma_port::{DmaDirection, DmaPort, Issue};
use self::registers::{Register, RegisterFile, TransferStatus};
use self::translate::AddressTranslator;
use crate::common::constants::{CMD_START, IDMA_WINDOW_SIZE};
use crate::common::{AddrRange, Packet, PacketTag, Result, SimError, Tick, VirtAddr};
use crate::config::IdmaConfig;
use crate::sim::event::{PortId, Scheduler};
use crate::soc::traits::{Delivery, MemoryMappedDevice, ResponsePeer};
use crate::stats::DmaStats;

/// The DMA engine.
#[derive(Debug)]
pub struct Idma {
    base: u64,
    pio_latency: Tick,
    regs: RegisterFile,
    controller: TransferController,
    translator: Box<dyn AddressTranslator>,
    port: DmaPort,
    stats: DmaStats,
    completed: Option<Completion>,
}

impl Idma {
    /// Creates an engine from its configuration.
    ///
    /// # Arguments
    ///
    /// * `config` - Base address, latencies, staging capacity and port parameters.
    /// * `translator` - Address translator for the active mode.
    pub fn new(config: &IdmaConfig, translator: Box<dyn AddressTranslator>) -> Self {
        Self {
            base: config.base,
            pio_latency: config.pio_latency,
            regs: RegisterFile::new(),
            controller: TransferController::new(config.staging_capacity, config.oversize_policy),
            translator,
            port: DmaPort::new(config.chunk_size, config.issue_interval, config.recv_occupancy),
            stats: DmaStats::default(),
            completed: None,
        }
    }

    /// Base physical address of the register window.
    pub const fn base(&self) -> u64 {
        self.base
    }

    /// Register file.
    pub const fn registers(&self) -> &RegisterFile {
        &self.regs
    }

    /// Transfer controller.
    pub const fn controller(&self) -> &TransferController {
        &self.controller
    }

    /// DMA port.
    pub const fn port(&self) -> &DmaPort {
        &self.port
    }

    /// Engine counters.
    pub const fn stats(&self) -> &DmaStats {
        &self.stats
    }

    /// Takes the record of the most recently completed transfer, if not yet taken.
    pub const fn take_completion(&mut self) -> Option<Completion> {
        self.completed.take()
    }

    fn window_offset(&self, pkt: &Packet) -> Result<u64> {
        let window = AddrRange::new(self.base, IDMA_WINDOW_SIZE);
        if !window.contains(pkt.addr()) {
            return Err(SimError::OutOfRange {
                device: self.name().to_string(),
                addr: pkt.addr(),
                size: pkt.size() as u64,
                range: window,
            });
        }
        Ok(pkt.addr() - self.base)
    }

    fn start_transfer(&mut self, sched: &mut dyn Scheduler) -> Result<()> {
        let params = TransferParams {
            src: VirtAddr::new(self.regs.src_addr()),
            dst: VirtAddr::new(self.regs.dst_addr()),
            len: u64::from(self.regs.size()),
        };
        let now = sched.now();
        match self.controller.start(params, self.translator.as_ref(), now)? {
            StartOutcome::Started(req) => {
                self.regs.set_status(TransferStatus::Busy);
                self.stats.transfers_started += 1;
                debug!(
                    src = %params.src,
                    dst = %params.dst,
                    len = req.len,
                    segments = req.segments.len(),
                    "IDMA transfer started"
                );
                let _ = self.port.start_job(&req, sched)?;
            }
            StartOutcome::Rejected => self.stats.transfers_rejected += 1,
        }
        Ok(())
    }

    fn finish_phase(&mut self, dir: DmaDirection, sched: &mut dyn Scheduler) -> Result<()> {
        match dir {
            DmaDirection::Read => {
                let req = self.controller.on_read_done(self.translator.as_ref())?;
                debug!(len = req.len, "IDMA read phase done, writing destination");
                let _ = self.port.start_job(&req, sched)?;
            }
            DmaDirection::Write => {
                let done = self.controller.on_write_done(sched.now())?;
                self.regs.set_status(TransferStatus::Complete);
                self.stats.transfers_completed += 1;
                self.stats.bytes_transferred += done.params.len;
                self.stats.transfer_ticks += done.finished_at - done.started_at;
                debug!(
                    src = %done.params.src,
                    dst = %done.params.dst,
                    len = done.params.len,
                    ticks = done.finished_at - done.started_at,
                    "IDMA transfer complete"
                );
                self.completed = Some(done);
            }
        }
        Ok(())
    }

    /// Handles the issue event, returning the request packet to route, if any.
    ///
    /// # Errors
    ///
    /// Propagates failures from finishing a phase that had nothing to send.
    pub fn issue(&mut self, sched: &mut dyn Scheduler) -> Result<Option<Packet>> {
        match self.port.issue(sched) {
            Issue::Chunk { job, dir, chunk } => {
                let id = self.port.next_packet_id();
                let tag = PacketTag {
                    job,
                    offset: chunk.offset,
                };
                let len = chunk.len as usize;
                let pkt = match dir {
                    DmaDirection::Read => {
                        self.stats.read_chunks += 1;
                        Packet::read(id, chunk.paddr, len)
                    }
                    DmaDirection::Write => {
                        self.stats.write_chunks += 1;
                        let staging = self
                            .controller
                            .staging()
                            .ok_or(SimError::UnexpectedCompletion { phase: "write" })?;
                        Packet::write(id, chunk.paddr, staging.slice(chunk.offset, len)?.to_vec())
                    }
                };
                Ok(Some(pkt.with_tag(tag)))
            }
            Issue::Finished { dir, .. } => {
                self.finish_phase(dir, sched)?;
                Ok(None)
            }
            Issue::Idle => Ok(None),
        }
    }

    /// Takes the targets refused while the receive path was busy, counting the
    /// notifications about to be sent.
    pub fn take_refused_senders(&mut self) -> Vec<PortId> {
        let senders = self.port.take_waiting();
        self.stats.retries_sent += senders.len() as u64;
        senders
    }
}

impl MemoryMappedDevice for Idma {
    fn name(&self) -> &str {
        "IDMA"
    }

    fn address_ranges(&self) -> Vec<AddrRange> {
        vec![AddrRange::new(self.base, IDMA_WINDOW_SIZE)]
    }

    fn read(&mut self, pkt: &mut Packet, _sched: &mut dyn Scheduler) -> Result<Tick> {
        let offset = self.window_offset(pkt)?;
        let value = self.regs.read(offset, pkt.size())?;
        self.stats.mmio_reads += 1;
        pkt.set_le(value);
        pkt.make_response()?;
        Ok(self.pio_latency)
    }

    fn write(&mut self, pkt: &mut Packet, sched: &mut dyn Scheduler) -> Result<Tick> {
        let offset = self.window_offset(pkt)?;
        let value = pkt.get_le();
        let start = value & u64::from(CMD_START) != 0;

        // A start while Busy is rejected without touching the register file.
        if start && self.controller.is_busy() && Register::decode(offset) == Some(Register::Command)
        {
            Register::Command.check_width(pkt.size())?;
            self.stats.mmio_writes += 1;
            self.start_transfer(sched)?;
            pkt.make_response()?;
            return Ok(self.pio_latency);
        }

        let written = self.regs.write(offset, pkt.size(), value)?;
        self.stats.mmio_writes += 1;
        if written == Some(Register::Command) && start {
            self.start_transfer(sched)?;
        }
        pkt.make_response()?;
        Ok(self.pio_latency)
    }
}

impl ResponsePeer for Idma {
    fn recv_response(
        &mut self,
        from: PortId,
        pkt: Packet,
        sched: &mut dyn Scheduler,
    ) -> Result<Delivery> {
        if !self.port.try_accept(from, sched) {
            self.stats.responses_refused += 1;
            return Ok(Delivery::Refused(pkt));
        }

        let done = self.port.complete_chunk(pkt.id(), pkt.cmd(), pkt.tag())?;
        self.stats.responses_accepted += 1;
        if done.dir == DmaDirection::Read {
            let staging = self
                .controller
                .staging_mut()
                .ok_or(SimError::UnexpectedResponse {
                    id: pkt.id(),
                    tag: pkt.tag(),
                })?;
            staging.write_at(done.offset, pkt.data())?;
        }
        if done.job_finished {
            self.finish_phase(done.dir, sched)?;
        }
        Ok(Delivery::Accepted)
    }
}
