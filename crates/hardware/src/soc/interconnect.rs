//! Crossbar connecting the DMA engine to its memory targets.
//!
//! This module implements the address router between the engine's requester port and
//! the scratchpads. It provides:
//! 1. **Target registration:** Targets are added by address range; overlaps are rejected
//!    and each target is told the port index its responses come from.
//! 2. **Routing:** Physical address to target, with a last-hit hint for streaming DMA.
//! 3. **Functional access:** Untimed reads and writes for loading and verification.

use std::fmt;

use super::traits::TimingTarget;
use crate::common::{AddrRange, Packet, Result, SimError, Tick};
use crate::sim::event::PortId;

/// Address-routed set of timing targets.
pub struct Crossbar {
    /// Targets indexed by port id (boxed for dynamic dispatch; `Send + Sync` via the trait).
    targets: Vec<Box<dyn TimingTarget>>,
    /// Claimed ranges sorted by start address.
    routes: Vec<(AddrRange, PortId)>,
    last_hit: usize,
}

impl fmt::Debug for Crossbar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Crossbar")
            .field("address_map", &self.address_map())
            .finish_non_exhaustive()
    }
}

impl Default for Crossbar {
    fn default() -> Self {
        Self::new()
    }
}

impl Crossbar {
    /// Creates a crossbar with no targets.
    pub const fn new() -> Self {
        Self {
            targets: Vec::new(),
            routes: Vec::new(),
            last_hit: 0,
        }
    }

    /// Number of registered targets.
    pub fn len(&self) -> usize {
        self.targets.len()
    }

    /// Returns whether no targets are registered.
    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    /// Registers a target.
    ///
    /// # Arguments
    ///
    /// * `target` - The target to add; it is bound to the returned port id.
    ///
    /// # Returns
    ///
    /// The port id assigned to the target.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::RangeOverlap`] if any of its ranges overlaps a registered one.
    pub fn add_target(&mut self, mut target: Box<dyn TimingTarget>) -> Result<PortId> {
        let ranges = target.address_ranges();
        for range in &ranges {
            if let Some((_, owner)) = self.routes.iter().find(|(r, _)| r.overlaps(range)) {
                return Err(SimError::RangeOverlap {
                    name: target.name().to_string(),
                    range: *range,
                    existing: self.targets[*owner].name().to_string(),
                });
            }
        }

        let port = self.targets.len();
        target.bind(port);
        self.targets.push(target);
        self.routes.extend(ranges.into_iter().map(|r| (r, port)));
        self.routes.sort_by_key(|(r, _)| r.start);
        self.last_hit = 0;
        Ok(port)
    }

    /// Returns the port of the target claiming `addr`.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::NoRoute`] if no target claims the address.
    pub fn route(&mut self, addr: u64) -> Result<PortId> {
        if let Some((range, port)) = self.routes.get(self.last_hit) {
            if range.contains(addr) {
                return Ok(*port);
            }
        }
        let idx = self.routes.partition_point(|(r, _)| r.start <= addr);
        match idx.checked_sub(1).and_then(|i| self.routes.get(i).map(|e| (i, e))) {
            Some((i, (range, port))) if range.contains(addr) => {
                self.last_hit = i;
                Ok(*port)
            }
            _ => Err(SimError::NoRoute { addr }),
        }
    }

    /// Borrows a target by port.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::UnknownPort`] for an unbound port id.
    pub fn target(&self, port: PortId) -> Result<&dyn TimingTarget> {
        self.targets
            .get(port)
            .map(|t| &**t)
            .ok_or(SimError::UnknownPort { port })
    }

    /// Mutably borrows a target by port.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::UnknownPort`] for an unbound port id.
    pub fn target_mut(&mut self, port: PortId) -> Result<&mut (dyn TimingTarget + 'static)> {
        self.targets
            .get_mut(port)
            .map(|t| &mut **t)
            .ok_or(SimError::UnknownPort { port })
    }

    /// Iterates over registered targets in port order.
    pub fn targets(&self) -> impl Iterator<Item = &dyn TimingTarget> {
        self.targets.iter().map(|t| &**t)
    }

    /// Writes bytes to whichever target claims `addr`, without timing.
    ///
    /// # Errors
    ///
    /// Fails if the address is unrouted or the span leaves the target.
    pub fn functional_write(&mut self, addr: u64, data: &[u8]) -> Result<()> {
        let port = self.route(addr)?;
        self.target_mut(port)?.functional_write(addr, data)
    }

    /// Reads bytes from whichever target claims `addr`, without timing.
    ///
    /// # Errors
    ///
    /// Fails if the address is unrouted or the span leaves the target.
    pub fn functional_read(&mut self, addr: u64, buf: &mut [u8]) -> Result<()> {
        let port = self.route(addr)?;
        self.target(port)?.functional_read(addr, buf)
    }

    /// Services `pkt` at whichever target claims its address, bypassing response
    /// queues.
    ///
    /// # Returns
    ///
    /// The access latency.
    ///
    /// # Errors
    ///
    /// Fails if the address is unrouted or the access leaves the target.
    pub fn atomic_access(&mut self, pkt: &mut Packet) -> Result<Tick> {
        let port = self.route(pkt.addr())?;
        self.target_mut(port)?.atomic_access(pkt)
    }

    /// Human-readable `(range, target name)` pairs in address order.
    pub fn address_map(&self) -> Vec<(AddrRange, String)> {
        self.routes
            .iter()
            .map(|(r, p)| (*r, self.targets[*p].name().to_string()))
            .collect()
    }
}
