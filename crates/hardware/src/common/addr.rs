//! Physical and Virtual Address types.
//!
//! This module defines strong types for the two addressing domains a DMA transfer
//! crosses. It provides the following:
//! 1. **Type Safety:** Distinguishes between virtual (program-visible) and physical
//!    (interconnect-visible) addresses at compile time.
//! 2. **Ranges:** `AddrRange` describes the physical window a device or memory claims.
//! 3. **Segments:** `Segment` is one piece of a translated virtual range.

use std::fmt;

use super::constants::PAGE_OFFSET_MASK;

/// A virtual address in the address space of the process driving the engine.
///
/// Register contents programmed by software are virtual addresses; they must be
/// translated before any request packet is issued.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct VirtAddr(pub u64);

/// A physical address on the simulated interconnect.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct PhysAddr(pub u64);

impl VirtAddr {
    /// Creates a new virtual address from a raw 64-bit value.
    #[inline(always)]
    pub const fn new(addr: u64) -> Self {
        Self(addr)
    }

    /// Returns the raw 64-bit address value.
    #[inline(always)]
    pub const fn val(&self) -> u64 {
        self.0
    }

    /// Returns the byte offset within the containing page.
    pub const fn page_offset(&self) -> u64 {
        self.0 & PAGE_OFFSET_MASK
    }

    /// Returns the address rounded down to its page boundary.
    pub const fn page_base(&self) -> u64 {
        self.0 & !PAGE_OFFSET_MASK
    }
}

impl PhysAddr {
    /// Creates a new physical address from a raw 64-bit value.
    #[inline(always)]
    pub const fn new(addr: u64) -> Self {
        Self(addr)
    }

    /// Returns the raw 64-bit address value.
    #[inline(always)]
    pub const fn val(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for VirtAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{:#x}", self.0)
    }
}

impl fmt::Display for PhysAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "p{:#x}", self.0)
    }
}

/// A half-open physical address range `[start, start + size)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct AddrRange {
    /// First byte of the range.
    pub start: u64,
    /// Length in bytes.
    pub size: u64,
}

impl AddrRange {
    /// Creates a range of `size` bytes starting at `start`.
    pub const fn new(start: u64, size: u64) -> Self {
        Self { start, size }
    }

    /// One past the last byte of the range (saturating at `u64::MAX`).
    pub const fn end(&self) -> u64 {
        self.start.saturating_add(self.size)
    }

    /// Returns whether `addr` falls inside the range.
    pub const fn contains(&self, addr: u64) -> bool {
        addr >= self.start && addr < self.end()
    }

    /// Returns whether `[addr, addr + len)` lies entirely inside the range.
    pub const fn contains_span(&self, addr: u64, len: u64) -> bool {
        match addr.checked_add(len) {
            Some(last) => addr >= self.start && last <= self.end(),
            None => false,
        }
    }

    /// Returns whether the two ranges share at least one byte.
    pub const fn overlaps(&self, other: &Self) -> bool {
        self.start < other.end() && other.start < self.end()
    }
}

impl fmt::Display for AddrRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:#x}, {:#x})", self.start, self.end())
    }
}

/// One physically contiguous piece of a translated virtual range.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Segment {
    /// Virtual address of the first byte.
    pub vaddr: VirtAddr,
    /// Physical address of the first byte.
    pub paddr: PhysAddr,
    /// Length in bytes.
    pub len: u64,
}

impl Segment {
    /// Creates a segment.
    pub const fn new(vaddr: VirtAddr, paddr: PhysAddr, len: u64) -> Self {
        Self { vaddr, paddr, len }
    }
}
