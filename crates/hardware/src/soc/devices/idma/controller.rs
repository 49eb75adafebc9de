//! Transfer state machine.
//!
//! A transfer moves through `Idle -> Busy(Reading) -> Busy(Writing) -> Complete`. The
//! Busy state carries everything the next step needs (the register snapshot, the phase
//! and the staging buffer), so no callback has to capture the engine. `Complete` is not
//! terminal; a new start re-enters Busy. Only a start while Busy is rejected.

use tracing::warn;

use super::dma_port::{DmaDirection, DmaRequest};
use super::registers::TransferStatus;
use super::translate::AddressTranslator;
use crate::common::{AddrRange, Result, SimError, Tick, VirtAddr};
use crate::config::OversizePolicy;

/// Register snapshot taken when a transfer starts.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TransferParams {
    /// Source virtual address.
    pub src: VirtAddr,
    /// Destination virtual address.
    pub dst: VirtAddr,
    /// Length in bytes (after the oversize policy has been applied).
    pub len: u64,
}

/// Which copy half is in flight.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    /// Source to staging buffer.
    Reading,
    /// Staging buffer to destination.
    Writing,
}

/// Fixed-capacity byte buffer holding a transfer's data between phases.
#[derive(Clone, Debug)]
pub struct StagingBuffer {
    bytes: Vec<u8>,
}

impl StagingBuffer {
    /// Allocates a zeroed buffer.
    pub fn new(capacity: usize) -> Self {
        Self {
            bytes: vec![0; capacity],
        }
    }

    /// Capacity in bytes.
    pub fn capacity(&self) -> usize {
        self.bytes.len()
    }

    fn bounds(&self, offset: u64, len: usize) -> Result<usize> {
        let cap = self.bytes.len() as u64;
        if !AddrRange::new(0, cap).contains_span(offset, len as u64) {
            return Err(SimError::OutOfRange {
                device: "IDMA staging buffer".to_string(),
                addr: offset,
                size: len as u64,
                range: AddrRange::new(0, cap),
            });
        }
        Ok(offset as usize)
    }

    /// Copies `data` in at `offset`.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::OutOfRange`] if the copy would run past the end.
    pub fn write_at(&mut self, offset: u64, data: &[u8]) -> Result<()> {
        let off = self.bounds(offset, data.len())?;
        self.bytes[off..off + data.len()].copy_from_slice(data);
        Ok(())
    }

    /// Borrows `len` bytes at `offset`.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::OutOfRange`] if the span runs past the end.
    pub fn slice(&self, offset: u64, len: usize) -> Result<&[u8]> {
        let off = self.bounds(offset, len)?;
        Ok(&self.bytes[off..off + len])
    }
}

/// An in-flight transfer.
#[derive(Debug)]
pub struct Transfer {
    /// Register snapshot.
    pub params: TransferParams,
    /// Current phase.
    pub phase: Phase,
    /// Tick the start trigger was written.
    pub started_at: Tick,
    staging: StagingBuffer,
}

/// Controller state.
#[derive(Debug, Default)]
pub enum TransferState {
    /// No transfer has run since reset.
    #[default]
    Idle,
    /// A transfer is in flight.
    Busy(Transfer),
    /// The last transfer finished.
    Complete,
}

/// Outcome of a start trigger.
#[derive(Debug, PartialEq, Eq)]
pub enum StartOutcome {
    /// The transfer began; the read phase should be issued.
    Started(DmaRequest),
    /// A transfer was already in flight; nothing changed.
    Rejected,
}

/// A finished transfer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Completion {
    /// Register snapshot of the transfer.
    pub params: TransferParams,
    /// Tick the transfer started.
    pub started_at: Tick,
    /// Tick the write phase finished.
    pub finished_at: Tick,
}

/// Owns the staging buffer and sequences the two copy phases.
#[derive(Debug)]
pub struct TransferController {
    state: TransferState,
    spare: Option<StagingBuffer>,
    capacity: usize,
    policy: OversizePolicy,
}

impl TransferController {
    /// Creates an idle controller with a staging buffer of `capacity` bytes.
    pub fn new(capacity: usize, policy: OversizePolicy) -> Self {
        Self {
            state: TransferState::Idle,
            spare: Some(StagingBuffer::new(capacity)),
            capacity,
            policy,
        }
    }

    /// Current state.
    pub const fn state(&self) -> &TransferState {
        &self.state
    }

    /// Current state as a STATUS register value.
    pub const fn status(&self) -> TransferStatus {
        match self.state {
            TransferState::Idle => TransferStatus::Idle,
            TransferState::Busy(_) => TransferStatus::Busy,
            TransferState::Complete => TransferStatus::Complete,
        }
    }

    /// Whether a transfer is in flight.
    pub const fn is_busy(&self) -> bool {
        matches!(self.state, TransferState::Busy(_))
    }

    /// The in-flight transfer, if any.
    pub const fn current(&self) -> Option<&Transfer> {
        match &self.state {
            TransferState::Busy(t) => Some(t),
            _ => None,
        }
    }

    /// The staging buffer; only reachable while Busy.
    pub const fn staging(&self) -> Option<&StagingBuffer> {
        match &self.state {
            TransferState::Busy(t) => Some(&t.staging),
            _ => None,
        }
    }

    /// Mutable staging buffer; only reachable while Busy.
    pub const fn staging_mut(&mut self) -> Option<&mut StagingBuffer> {
        match &mut self.state {
            TransferState::Busy(t) => Some(&mut t.staging),
            _ => None,
        }
    }

    /// Handles a start trigger.
    ///
    /// On success the controller is Busy in the read phase and the returned request
    /// covers the translated source range.
    ///
    /// # Errors
    ///
    /// Fails, leaving the state unchanged, when the length exceeds the staging buffer
    /// under [`OversizePolicy::Fatal`] or the source cannot be translated.
    pub fn start(
        &mut self,
        mut params: TransferParams,
        translator: &dyn AddressTranslator,
        now: Tick,
    ) -> Result<StartOutcome> {
        if let TransferState::Busy(t) = &self.state {
            warn!(
                src = %params.src,
                dst = %params.dst,
                len = params.len,
                busy_since = t.started_at,
                "IDMA start ignored: transfer already in progress"
            );
            return Ok(StartOutcome::Rejected);
        }

        let cap = self.capacity as u64;
        if params.len > cap {
            match self.policy {
                OversizePolicy::Fatal => {
                    return Err(SimError::TransferTooLarge {
                        size: params.len,
                        capacity: self.capacity,
                    });
                }
                OversizePolicy::Clamp => {
                    warn!(
                        requested = params.len,
                        capacity = cap,
                        "IDMA transfer clamped to staging buffer capacity"
                    );
                    params.len = cap;
                }
            }
        }

        let segments = translator.translate(params.src, params.len)?;
        let staging = self
            .spare
            .take()
            .unwrap_or_else(|| StagingBuffer::new(self.capacity));
        self.state = TransferState::Busy(Transfer {
            params,
            phase: Phase::Reading,
            started_at: now,
            staging,
        });
        Ok(StartOutcome::Started(DmaRequest {
            dir: DmaDirection::Read,
            segments,
            len: params.len,
        }))
    }

    /// Advances from the read phase to the write phase.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::UnexpectedCompletion`] if no transfer is reading, and
    /// propagates destination translation failures.
    pub fn on_read_done(&mut self, translator: &dyn AddressTranslator) -> Result<DmaRequest> {
        let TransferState::Busy(t) = &mut self.state else {
            return Err(SimError::UnexpectedCompletion { phase: "read" });
        };
        if t.phase != Phase::Reading {
            return Err(SimError::UnexpectedCompletion { phase: "read" });
        }
        let segments = translator.translate(t.params.dst, t.params.len)?;
        t.phase = Phase::Writing;
        Ok(DmaRequest {
            dir: DmaDirection::Write,
            segments,
            len: t.params.len,
        })
    }

    /// Finishes the write phase, returning the staging buffer to the spare slot.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::UnexpectedCompletion`] if no transfer is writing.
    pub fn on_write_done(&mut self, now: Tick) -> Result<Completion> {
        match std::mem::take(&mut self.state) {
            TransferState::Busy(t) if t.phase == Phase::Writing => {
                self.spare = Some(t.staging);
                self.state = TransferState::Complete;
                Ok(Completion {
                    params: t.params,
                    started_at: t.started_at,
                    finished_at: now,
                })
            }
            other => {
                self.state = other;
                Err(SimError::UnexpectedCompletion { phase: "write" })
            }
        }
    }
}
