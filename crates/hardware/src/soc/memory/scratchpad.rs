//! Scratchpad memory.
//!
//! A software-managed on-chip memory: a [`Memory`] store plus one DMA response port. The
//! crossbar hands it request packets; it services each one immediately and returns the
//! response through its [`ResponseQueue`] once the access latency has elapsed. Atomic
//! accesses skip the queue and hand back the latency directly.

use super::Memory;
use super::controller::MemoryController;
use super::response_queue::{QueueStats, ResponseQueue};
use crate::common::{AddrRange, Packet, Result, Tick};
use crate::sim::event::{PortId, Scheduler};
use crate::soc::traits::{ResponseChannel, ResponsePeer, StorageBackend, TimingTarget};

/// Scratchpad target with a single DMA port.
#[derive(Debug)]
pub struct ScratchpadMemory {
    storage: Memory,
    port: ResponseQueue,
}

impl ScratchpadMemory {
    /// Creates a zero-filled scratchpad.
    ///
    /// # Errors
    ///
    /// Propagates range validation errors from [`Memory::new`].
    pub fn new(
        name: impl Into<String>,
        base: u64,
        size: u64,
        controller: Box<dyn MemoryController>,
    ) -> Result<Self> {
        let name = name.into();
        let port = ResponseQueue::new(format!("{name}.dma_port"));
        Ok(Self {
            storage: Memory::new(name, base, size, controller)?,
            port,
        })
    }

    /// The response port.
    pub const fn port(&self) -> &ResponseQueue {
        &self.port
    }
}

impl ResponseChannel for ScratchpadMemory {
    fn submit(&mut self, pkt: Packet, sched: &mut dyn Scheduler) -> Result<bool> {
        self.port.submit(pkt, &mut self.storage, sched)
    }

    fn drain_on_event(
        &mut self,
        peer: &mut dyn ResponsePeer,
        sched: &mut dyn Scheduler,
    ) -> Result<()> {
        self.port.drain_on_event(peer, sched)
    }

    fn on_peer_ready(
        &mut self,
        peer: &mut dyn ResponsePeer,
        sched: &mut dyn Scheduler,
    ) -> Result<()> {
        self.port.on_peer_ready(peer, sched)
    }
}

impl TimingTarget for ScratchpadMemory {
    fn name(&self) -> &str {
        self.storage.name()
    }

    fn address_ranges(&self) -> Vec<AddrRange> {
        vec![self.storage.range()]
    }

    fn bind(&mut self, port: PortId) {
        self.port.bind(port);
    }

    fn port_stats(&self) -> QueueStats {
        *self.port.stats()
    }

    fn atomic_access(&mut self, pkt: &mut Packet) -> Result<Tick> {
        self.storage.service_access(pkt)
    }

    fn functional_read(&self, addr: u64, buf: &mut [u8]) -> Result<()> {
        self.storage.read_bytes(addr, buf)
    }

    fn functional_write(&mut self, addr: u64, data: &[u8]) -> Result<()> {
        self.storage.write_bytes(addr, data)
    }
}
