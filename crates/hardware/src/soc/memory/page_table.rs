//! Emulation page table.
//!
//! In syscall-emulation mode the process's virtual address space is described by a
//! page-granular map from virtual to physical page frames. The DMA engine uses it to turn
//! a virtual transfer range into the physical segments it actually reads or writes.
//!
//! An empty table is created by the system builder when no mappings are configured, in
//! which case the scratchpad ranges are identity mapped.

use std::collections::BTreeMap;

use crate::common::constants::{PAGE_OFFSET_MASK, PAGE_SIZE};
use crate::common::{AddrRange, PhysAddr, Result, Segment, SimError, VirtAddr};

/// Virtual page base to physical page base.
#[derive(Clone, Debug, Default)]
pub struct EmulationPageTable {
    pages: BTreeMap<u64, u64>,
}

impl EmulationPageTable {
    /// Creates an empty page table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of mapped pages.
    pub fn len(&self) -> usize {
        self.pages.len()
    }

    /// Returns whether nothing is mapped.
    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    /// Maps `size` bytes starting at `vaddr` to `paddr`.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::Config`] if either address is not page aligned, if either
    /// range runs past the end of the address space, or if any page in the range is
    /// already mapped to a different frame.
    pub fn map(&mut self, vaddr: VirtAddr, paddr: PhysAddr, size: u64) -> Result<()> {
        if vaddr.val() & PAGE_OFFSET_MASK != 0 || paddr.val() & PAGE_OFFSET_MASK != 0 {
            return Err(SimError::Config(format!(
                "page mapping {vaddr} -> {paddr} is not page aligned"
            )));
        }
        let last_byte = size
            .div_ceil(PAGE_SIZE)
            .checked_mul(PAGE_SIZE)
            .map(|span| span.saturating_sub(1));
        let wraps = last_byte.is_none_or(|last| {
            vaddr.val().checked_add(last).is_none() || paddr.val().checked_add(last).is_none()
        });
        if wraps {
            return Err(SimError::Config(format!(
                "page mapping {vaddr} -> {paddr} of {size:#x} bytes wraps the address space"
            )));
        }

        let pages = size.div_ceil(PAGE_SIZE);
        for i in 0..pages {
            let v = vaddr.val() + i * PAGE_SIZE;
            let p = paddr.val() + i * PAGE_SIZE;
            match self.pages.get(&v) {
                Some(&existing) if existing != p => {
                    return Err(SimError::Config(format!(
                        "virtual page {v:#x} already mapped to {existing:#x}"
                    )));
                }
                _ => {
                    let _ = self.pages.insert(v, p);
                }
            }
        }
        Ok(())
    }

    /// Maps every page of `range` to itself.
    ///
    /// # Errors
    ///
    /// Same conditions as [`EmulationPageTable::map`].
    pub fn identity_map(&mut self, range: AddrRange) -> Result<()> {
        let base = range.start & !PAGE_OFFSET_MASK;
        let size = range.end() - base;
        self.map(VirtAddr::new(base), PhysAddr::new(base), size)
    }

    /// Translates a single address.
    pub fn lookup(&self, vaddr: VirtAddr) -> Option<PhysAddr> {
        self.pages
            .get(&vaddr.page_base())
            .map(|frame| PhysAddr::new(frame + vaddr.page_offset()))
    }

    /// Translates `size` bytes at `vaddr` into physical segments.
    ///
    /// The range is split at page boundaries and adjacent pieces whose frames are
    /// physically contiguous are merged, so an identity mapping always yields one
    /// segment. A zero-length range yields no segments.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::PageFault`] naming the first unmapped address, or the start
    /// address when the range wraps the address space.
    pub fn translate_range(&self, vaddr: VirtAddr, size: u64) -> Result<Vec<Segment>> {
        let mut segments: Vec<Segment> = Vec::new();
        let mut cur = vaddr.val();
        let end = vaddr
            .val()
            .checked_add(size)
            .ok_or(SimError::PageFault { vaddr: vaddr.val() })?;

        while cur < end {
            let page_end = (cur & !PAGE_OFFSET_MASK).saturating_add(PAGE_SIZE);
            let len = page_end.min(end) - cur;
            let paddr = self
                .lookup(VirtAddr::new(cur))
                .ok_or(SimError::PageFault { vaddr: cur })?;

            match segments.last_mut() {
                Some(last) if last.paddr.val() + last.len == paddr.val() => last.len += len,
                _ => segments.push(Segment::new(VirtAddr::new(cur), paddr, len)),
            }
            cur += len;
        }
        Ok(segments)
    }
}
