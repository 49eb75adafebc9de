//! Scratchpad storage and its DMA-facing port.
//!
//! This module implements the memory side of the system. It provides:
//! 1. **Memory:** A byte store mapped at a physical base address, servicing one access
//!    at a time and reporting its latency through a controller.
//! 2. **Controller:** Latency modeling (simple or DRAM row-buffer).
//! 3. **Response queue:** The flow-controlled port that returns completed accesses.
//! 4. **Scratchpad:** A `Memory` and a response queue combined into a crossbar target.
//! 5. **Page table:** The emulation page table used for address translation.

/// Memory controller implementations for access latency modeling.
pub mod controller;

/// Emulation page table (virtual pages to physical frames).
pub mod page_table;

/// Ordered response queue with retry handling.
pub mod response_queue;

/// Scratchpad memory target.
pub mod scratchpad;

use self::controller::MemoryController;
use crate::common::{AddrRange, Packet, Result, SimError, Tick};
use crate::soc::traits::StorageBackend;

/// A byte store over one physical range.
#[derive(Debug)]
pub struct Memory {
    name: String,
    range: AddrRange,
    bytes: Vec<u8>,
    controller: Box<dyn MemoryController>,
}

impl Memory {
    /// Creates a zero-filled memory.
    ///
    /// # Arguments
    ///
    /// * `name` - Name used in errors and traces.
    /// * `base` - Starting physical address.
    /// * `size` - Size in bytes.
    /// * `controller` - Latency model.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::Config`] if `size` is zero or the range wraps the address space.
    pub fn new(
        name: impl Into<String>,
        base: u64,
        size: u64,
        controller: Box<dyn MemoryController>,
    ) -> Result<Self> {
        let name = name.into();
        if size == 0 || base.checked_add(size).is_none() {
            return Err(SimError::Config(format!(
                "{name}: invalid range base={base:#x} size={size:#x}"
            )));
        }
        let len = usize::try_from(size)
            .map_err(|_| SimError::Config(format!("{name}: size {size:#x} too large")))?;
        Ok(Self {
            name,
            range: AddrRange::new(base, size),
            bytes: vec![0; len],
            controller,
        })
    }

    /// Device name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Physical range this memory backs.
    pub const fn range(&self) -> AddrRange {
        self.range
    }

    /// Returns the buffer offset of `len` bytes at `addr`, or an out-of-range error.
    fn offset_of(&self, addr: u64, len: usize) -> Result<usize> {
        let len64 = len as u64;
        if !self.range.contains_span(addr, len64) {
            return Err(SimError::OutOfRange {
                device: self.name.clone(),
                addr,
                size: len64,
                range: self.range,
            });
        }
        // contains_span guarantees the offset fits in the buffer
        Ok((addr - self.range.start) as usize)
    }

    /// Copies bytes out of the store.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::OutOfRange`] if the span is not inside this memory.
    pub fn read_bytes(&self, addr: u64, buf: &mut [u8]) -> Result<()> {
        let off = self.offset_of(addr, buf.len())?;
        buf.copy_from_slice(&self.bytes[off..off + buf.len()]);
        Ok(())
    }

    /// Copies bytes into the store.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::OutOfRange`] if the span is not inside this memory.
    pub fn write_bytes(&mut self, addr: u64, data: &[u8]) -> Result<()> {
        let off = self.offset_of(addr, data.len())?;
        self.bytes[off..off + data.len()].copy_from_slice(data);
        Ok(())
    }
}

impl StorageBackend for Memory {
    fn service_access(&mut self, pkt: &mut Packet) -> Result<Tick> {
        let cmd = pkt.cmd();
        if cmd.is_read() {
            self.read_bytes(pkt.addr(), pkt.data_mut())?;
        } else {
            self.write_bytes(pkt.addr(), pkt.data())?;
        }
        if pkt.needs_response() {
            pkt.make_response()?;
        }
        Ok(self.controller.access_latency(pkt.addr(), cmd))
    }
}
