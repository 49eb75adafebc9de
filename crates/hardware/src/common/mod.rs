//! Common utilities and types used throughout the simulator.
//!
//! This module provides fundamental building blocks that are shared across all components
//! of the simulator. It includes:
//! 1. **Address Types:** Strong types for virtual and physical addresses, ranges and segments.
//! 2. **Constants:** Page geometry, IDMA register map, and default latencies.
//! 3. **Error Handling:** The fatal `SimError` enum and `Result` alias.
//! 4. **Packets:** The memory-access packet exchanged between ports.

/// Address type definitions (physical and virtual addresses).
pub mod addr;

/// Common constants used throughout the simulator.
pub mod constants;

/// Error types.
pub mod error;

/// Memory-access packets.
pub mod packet;

pub use addr::{AddrRange, PhysAddr, Segment, VirtAddr};
pub use error::{Result, SimError};
pub use packet::{MemCmd, Packet, PacketTag};

/// Simulation timestamp in ticks.
pub type Tick = u64;
