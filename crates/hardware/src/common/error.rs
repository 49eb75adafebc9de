//! Simulation error definitions.
//!
//! Every condition that aborts a simulation run is a variant of [`SimError`]. These are
//! configuration or protocol violations that cannot be serviced: the component that
//! detects one returns it, and it propagates with `?` to the event loop, which stops.
//!
//! Recoverable conditions (unmapped register offsets, start triggers while busy,
//! refused response deliveries) are absorbed where they occur and never appear here.
//! The one exception is [`SimError::TransferRejected`], which the driver-style
//! `System::run_transfer` helper returns instead of waiting on someone else's copy.

use thiserror::Error;

use super::addr::AddrRange;
use super::packet::PacketTag;

/// Fatal simulation errors.
#[derive(Debug, Error)]
pub enum SimError {
    /// A known register was accessed with a width it does not support.
    #[error("invalid access size for {register} register: {size}")]
    InvalidAccessSize {
        /// Register name as it appears in the register map.
        register: &'static str,
        /// Offending access width in bytes.
        size: usize,
    },

    /// The active simulation mode cannot translate DMA addresses.
    #[error("IDMA address translation not implemented for {mode} mode")]
    TranslationUnsupported {
        /// Name of the active mode.
        mode: &'static str,
    },

    /// A virtual address in a transfer range has no page table mapping.
    #[error("DMA of virtual address {vaddr:#x} failed: page not mapped")]
    PageFault {
        /// First unmapped virtual address.
        vaddr: u64,
    },

    /// A transfer asked for more bytes than the staging buffer holds.
    #[error("transfer of {size} bytes exceeds staging buffer capacity of {capacity} bytes")]
    TransferTooLarge {
        /// Requested length.
        size: u64,
        /// Staging buffer capacity.
        capacity: usize,
    },

    /// A peer signaled readiness to a port that never had a response refused.
    #[error("{port}: peer signaled ready without a pending retry")]
    SpuriousRetry {
        /// Name of the port that received the notification.
        port: String,
    },

    /// A response arrived that does not belong to any outstanding DMA job.
    #[error("unexpected response packet {id} for tag {tag:?}")]
    UnexpectedResponse {
        /// Packet identifier.
        id: u64,
        /// Packet tag, if any.
        tag: Option<PacketTag>,
    },

    /// A DMA phase finished while the transfer state machine was not in that phase.
    #[error("DMA {phase} completion with no transfer in that phase")]
    UnexpectedCompletion {
        /// Phase that reported completion.
        phase: &'static str,
    },

    /// A driver-level transfer could not start because the engine was already busy.
    #[error("IDMA busy: transfer {src:#x} -> {dst:#x} of {len} bytes was not started")]
    TransferRejected {
        /// Requested source address.
        src: u64,
        /// Requested destination address.
        dst: u64,
        /// Requested length.
        len: u64,
    },

    /// A DMA job was started while the port still had one outstanding.
    #[error("DMA port busy with job {job}")]
    DmaPortBusy {
        /// Outstanding job number.
        job: u64,
    },

    /// A request packet was issued to an address no target claims.
    #[error("no target claims physical address {addr:#x}")]
    NoRoute {
        /// Unclaimed physical address.
        addr: u64,
    },

    /// A backing store was accessed outside its range.
    #[error("{device}: access at {addr:#x} of {size} bytes is out of range {range}")]
    OutOfRange {
        /// Device name.
        device: String,
        /// Start of the access.
        addr: u64,
        /// Length of the access.
        size: u64,
        /// Range the device claims.
        range: AddrRange,
    },

    /// Two targets claim overlapping physical ranges.
    #[error("{name} range {range} overlaps {existing}")]
    RangeOverlap {
        /// Target being registered.
        name: String,
        /// Range being registered.
        range: AddrRange,
        /// Name of the target that already claims part of the range.
        existing: String,
    },

    /// An event or notification named a crossbar port that does not exist.
    #[error("no target is bound to crossbar port {port}")]
    UnknownPort {
        /// Port index.
        port: usize,
    },

    /// The run loop ran out of events, or hit its tick limit, before the awaited
    /// condition held.
    #[error("simulation stalled at tick {tick}: {reason}")]
    Stalled {
        /// Tick at which the loop gave up.
        tick: u64,
        /// What the loop was waiting for.
        reason: &'static str,
    },

    /// A packet was turned into a response twice.
    #[error("packet {id} is already a response")]
    AlreadyResponse {
        /// Packet identifier.
        id: u64,
    },

    /// Configuration is inconsistent.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Configuration could not be parsed.
    #[error("failed to parse configuration: {0}")]
    ConfigParse(#[from] serde_json::Error),
}

/// Result type used throughout the simulator.
pub type Result<T> = std::result::Result<T, SimError>;
