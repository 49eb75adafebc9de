//! Mode-dependent DMA address translation.
//!
//! Transfer registers hold virtual addresses. Before any request is issued the engine
//! resolves each range into physical segments through an [`AddressTranslator`]:
//! 1. **Syscall emulation:** Delegates to the process's emulation page table.
//! 2. **Full system:** Unsupported; every translation fails and aborts the run.

use std::fmt::Debug;
use std::sync::Arc;

use crate::common::{Result, Segment, SimError, VirtAddr};
use crate::config::SimMode;
use crate::soc::memory::page_table::EmulationPageTable;

/// Resolves a virtual byte range into physical segments.
pub trait AddressTranslator: Send + Sync + Debug {
    /// Mode this translator serves.
    fn mode(&self) -> SimMode;

    /// Translates `size` bytes starting at `vaddr`.
    ///
    /// # Errors
    ///
    /// Fails when the mode cannot translate or a page in the range is unmapped.
    fn translate(&self, vaddr: VirtAddr, size: u64) -> Result<Vec<Segment>>;
}

/// Translator backed by the process page table.
#[derive(Clone, Debug)]
pub struct ProcessTranslator {
    page_table: Arc<EmulationPageTable>,
}

impl ProcessTranslator {
    /// Creates a translator over a shared page table.
    pub const fn new(page_table: Arc<EmulationPageTable>) -> Self {
        Self { page_table }
    }
}

impl AddressTranslator for ProcessTranslator {
    fn mode(&self) -> SimMode {
        SimMode::SyscallEmulation
    }

    fn translate(&self, vaddr: VirtAddr, size: u64) -> Result<Vec<Segment>> {
        self.page_table.translate_range(vaddr, size)
    }
}

/// Full-system translator; the engine has no MMU walker in this mode.
#[derive(Clone, Copy, Debug, Default)]
pub struct FullSystemTranslator;

impl AddressTranslator for FullSystemTranslator {
    fn mode(&self) -> SimMode {
        SimMode::FullSystem
    }

    fn translate(&self, _vaddr: VirtAddr, _size: u64) -> Result<Vec<Segment>> {
        Err(SimError::TranslationUnsupported {
            mode: SimMode::FullSystem.as_str(),
        })
    }
}

/// Builds the translator for `mode`.
pub fn for_mode(mode: SimMode, page_table: Arc<EmulationPageTable>) -> Box<dyn AddressTranslator> {
    match mode {
        SimMode::SyscallEmulation => Box::new(ProcessTranslator::new(page_table)),
        SimMode::FullSystem => Box::new(FullSystemTranslator),
    }
}
