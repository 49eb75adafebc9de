//! Flow-controlled response queue.
//!
//! A target's DMA-facing port services each inbound request immediately through its
//! storage backend, then holds the response until the access latency has elapsed and
//! the requester is willing to take it. It provides:
//! 1. **Ordering:** Responses leave in exactly the order their requests arrived.
//! 2. **Single drain chain:** At most one drain event is outstanding; each successful
//!    delivery schedules the next one, never earlier than one tick in the future.
//! 3. **Backpressure:** A refused response stays at the head; nothing is attempted until
//!    the peer's ready notification, which retries the head inline.
//!
//! Requests are never refused, even while a retry is pending. A requester may have both
//! outstanding responses and new requests in flight, and refusing the latter would
//! deadlock it.

use std::collections::VecDeque;

use tracing::trace;

use crate::common::{Packet, Result, SimError, Tick};
use crate::sim::event::{Event, EventId, PortId, Scheduler};
use crate::soc::traits::{Delivery, ResponsePeer, StorageBackend};

/// A response waiting for its delivery time.
#[derive(Debug)]
struct PendingResponse {
    pkt: Packet,
    ready: Tick,
}

/// Counters kept per response queue.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct QueueStats {
    /// Requests accepted.
    pub submitted: u64,
    /// Responses handed to the peer.
    pub delivered: u64,
    /// Delivery attempts the peer refused.
    pub refused: u64,
    /// Largest number of responses held at once.
    pub max_depth: usize,
}

/// Ordered queue of responses drained by a single scheduled event.
#[derive(Debug)]
pub struct ResponseQueue {
    name: String,
    port: PortId,
    queue: VecDeque<PendingResponse>,
    retry_resp: bool,
    drain_event: Option<EventId>,
    stats: QueueStats,
}

impl ResponseQueue {
    /// Creates an empty queue named `name`, bound to crossbar port 0 until rebound.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            port: 0,
            queue: VecDeque::new(),
            retry_resp: false,
            drain_event: None,
            stats: QueueStats::default(),
        }
    }

    /// Port name used in traces and errors.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Crossbar port this queue sends from.
    pub const fn port(&self) -> PortId {
        self.port
    }

    /// Rebinds the queue to a crossbar port.
    pub fn bind(&mut self, port: PortId) {
        self.port = port;
    }

    /// Number of responses waiting.
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// Returns whether no responses are waiting.
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Whether the peer has refused the head and not yet signaled readiness.
    pub const fn retry_pending(&self) -> bool {
        self.retry_resp
    }

    /// Whether a drain event is outstanding.
    pub const fn drain_scheduled(&self) -> bool {
        self.drain_event.is_some()
    }

    /// Ready tick of the head response, if any.
    pub fn head_ready(&self) -> Option<Tick> {
        self.queue.front().map(|p| p.ready)
    }

    /// Queue counters.
    pub const fn stats(&self) -> &QueueStats {
        &self.stats
    }

    /// Services `pkt` through `backend` and queues its response.
    ///
    /// Always returns `Ok(true)`.
    ///
    /// # Errors
    ///
    /// Propagates fatal errors from the backend.
    pub fn submit(
        &mut self,
        mut pkt: Packet,
        backend: &mut dyn StorageBackend,
        sched: &mut dyn Scheduler,
    ) -> Result<bool> {
        trace!(
            port = %self.name,
            cmd = pkt.cmd().as_str(),
            addr = format_args!("{:#x}", pkt.addr()),
            size = pkt.size(),
            "receiving request"
        );
        self.stats.submitted += 1;

        let needs_response = pkt.needs_response();
        let latency = backend.service_access(&mut pkt)?;

        if needs_response {
            let ready = sched.now() + latency;
            self.queue.push_back(PendingResponse { pkt, ready });
            self.stats.max_depth = self.stats.max_depth.max(self.queue.len());

            if !self.retry_resp && self.drain_event.is_none() {
                self.drain_event = Some(sched.schedule(ready, Event::RespDrain(self.port)));
            }
        }

        Ok(true)
    }

    /// Handles the scheduled drain event.
    ///
    /// # Errors
    ///
    /// Propagates fatal errors raised by the peer.
    pub fn drain_on_event(
        &mut self,
        peer: &mut dyn ResponsePeer,
        sched: &mut dyn Scheduler,
    ) -> Result<()> {
        self.drain_event = None;
        self.drain(peer, sched)
    }

    /// Handles the peer's ready notification by retrying the head immediately.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::SpuriousRetry`] if no response was refused, and propagates
    /// fatal errors raised by the peer.
    pub fn on_peer_ready(
        &mut self,
        peer: &mut dyn ResponsePeer,
        sched: &mut dyn Scheduler,
    ) -> Result<()> {
        if !self.retry_resp {
            return Err(SimError::SpuriousRetry {
                port: self.name.clone(),
            });
        }
        self.retry_resp = false;
        self.drain(peer, sched)
    }

    fn drain(&mut self, peer: &mut dyn ResponsePeer, sched: &mut dyn Scheduler) -> Result<()> {
        let Some(PendingResponse { pkt, ready }) = self.queue.pop_front() else {
            trace!(port = %self.name, "drain with empty queue");
            return Ok(());
        };

        match peer.recv_response(self.port, pkt, sched)? {
            Delivery::Accepted => {
                self.retry_resp = false;
                self.stats.delivered += 1;

                if let Some(next) = self.queue.front() {
                    if self.drain_event.is_none() {
                        let when = next.ready.max(sched.now() + 1);
                        self.drain_event = Some(sched.schedule(when, Event::RespDrain(self.port)));
                    }
                }
            }
            Delivery::Refused(pkt) => {
                self.queue.push_front(PendingResponse { pkt, ready });
                self.retry_resp = true;
                self.stats.refused += 1;
                trace!(port = %self.name, "peer refused response, waiting for retry");
            }
        }
        Ok(())
    }
}
