//! Capability traits for ports and devices.
//!
//! Components are wired together through these interfaces rather than through a common
//! base type. It provides:
//! 1. **`MemoryMappedDevice`:** Register windows reached by CPU-side MMIO (the IDMA).
//! 2. **`StorageBackend`:** Synchronous service of one access, returning its latency.
//! 3. **`ResponseChannel`:** A flow-controlled response port (submit, drain, retry).
//! 4. **`ResponsePeer`:** The requester side that may accept or refuse a response.
//! 5. **`TimingTarget`:** What the crossbar routes requests to.
//!
//! All implementors must be `Send + Sync` so a built `System` can move across threads.

use crate::common::{AddrRange, Packet, Result, Tick};
use crate::sim::event::{PortId, Scheduler};
use crate::soc::memory::response_queue::QueueStats;

/// A device exposing registers through a fixed MMIO window.
pub trait MemoryMappedDevice: Send + Sync {
    /// Returns a short name for this device (e.g., `"IDMA"`).
    fn name(&self) -> &str;

    /// Physical ranges this device claims.
    fn address_ranges(&self) -> Vec<AddrRange>;

    /// Services a register read; the packet is turned into a response carrying the value.
    ///
    /// Returns the access latency in ticks.
    ///
    /// # Errors
    ///
    /// Fails on accesses the device cannot service at all (for instance a width the
    /// addressed register does not support).
    fn read(&mut self, pkt: &mut Packet, sched: &mut dyn Scheduler) -> Result<Tick>;

    /// Services a register write; the packet is turned into a response.
    ///
    /// Returns the access latency in ticks.
    ///
    /// # Errors
    ///
    /// Same conditions as [`MemoryMappedDevice::read`], plus any fatal error raised by an
    /// action the write triggers.
    fn write(&mut self, pkt: &mut Packet, sched: &mut dyn Scheduler) -> Result<Tick>;
}

/// Storage that services an access immediately and reports how long it took.
pub trait StorageBackend {
    /// Performs the access described by `pkt`, converting it into a response when the
    /// requester expects one. Returns the latency in ticks.
    ///
    /// # Errors
    ///
    /// Fails when the access falls outside the storage.
    fn service_access(&mut self, pkt: &mut Packet) -> Result<Tick>;
}

/// Outcome of offering a response to a peer.
#[derive(Debug)]
pub enum Delivery {
    /// The peer took ownership of the packet.
    Accepted,
    /// The peer cannot take the packet now; ownership returns to the sender, which must
    /// wait for the peer's ready notification before offering it again.
    Refused(Packet),
}

/// The requester end of a response channel.
pub trait ResponsePeer {
    /// Offers a response sent by target port `from`.
    ///
    /// # Errors
    ///
    /// Fails for responses the peer never asked for.
    fn recv_response(
        &mut self,
        from: PortId,
        pkt: Packet,
        sched: &mut dyn Scheduler,
    ) -> Result<Delivery>;
}

/// A flow-controlled response port.
pub trait ResponseChannel {
    /// Accepts an inbound request. The request is always accepted; the return value is
    /// kept for symmetry with request ports that can refuse.
    ///
    /// # Errors
    ///
    /// Propagates fatal errors from the storage backend.
    fn submit(&mut self, pkt: Packet, sched: &mut dyn Scheduler) -> Result<bool>;

    /// Handles this port's scheduled drain event.
    ///
    /// # Errors
    ///
    /// Propagates fatal errors raised by the peer while accepting a response.
    fn drain_on_event(
        &mut self,
        peer: &mut dyn ResponsePeer,
        sched: &mut dyn Scheduler,
    ) -> Result<()>;

    /// Handles the peer's notification that it can accept responses again.
    ///
    /// # Errors
    ///
    /// Fails with [`crate::common::SimError::SpuriousRetry`] when no response was refused.
    fn on_peer_ready(
        &mut self,
        peer: &mut dyn ResponsePeer,
        sched: &mut dyn Scheduler,
    ) -> Result<()>;
}

/// A memory target the crossbar can route timing requests to.
pub trait TimingTarget: ResponseChannel + Send + Sync {
    /// Returns a short name for this target.
    fn name(&self) -> &str;

    /// Physical ranges this target claims.
    fn address_ranges(&self) -> Vec<AddrRange>;

    /// Records the crossbar port index this target's responses are sent from.
    fn bind(&mut self, port: PortId);

    /// Counters of the target's response port.
    fn port_stats(&self) -> QueueStats;

    /// Services a request at once, bypassing the response queue, and returns the
    /// latency the access would have taken.
    ///
    /// # Errors
    ///
    /// Fails when the access is not backed by this target.
    fn atomic_access(&mut self, pkt: &mut Packet) -> Result<Tick>;

    /// Reads bytes without timing (loading, verification).
    ///
    /// # Errors
    ///
    /// Fails when the span is not backed by this target.
    fn functional_read(&self, addr: u64, buf: &mut [u8]) -> Result<()>;

    /// Writes bytes without timing (loading, verification).
    ///
    /// # Errors
    ///
    /// Fails when the span is not backed by this target.
    fn functional_write(&mut self, addr: u64, data: &[u8]) -> Result<()>;
}
