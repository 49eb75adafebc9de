//! Global System Constants.
//!
//! This module defines system-wide constants used across the simulator. It includes:
//! 1. **Memory Constants:** Page sizes and masks for address translation.
//! 2. **Engine Constants:** IDMA register offsets, window size, and status encodings.
//! 3. **Timing Constants:** Fixed latencies used when configuration does not override them.

/// Page size in bytes (4KB).
pub const PAGE_SIZE: u64 = 4096;

/// Mask for extracting the page offset from an address.
pub const PAGE_OFFSET_MASK: u64 = PAGE_SIZE - 1;

/// Size of the IDMA register window in bytes.
pub const IDMA_WINDOW_SIZE: u64 = 0x1000;

/// Offset of the source address register.
pub const REG_SRC_ADDR: u64 = 0x00;

/// Offset of the destination address register.
pub const REG_DST_ADDR: u64 = 0x04;

/// Offset of the transfer length register.
pub const REG_SIZE: u64 = 0x08;

/// Offset of the command register.
pub const REG_COMMAND: u64 = 0x0C;

/// Offset of the status register.
pub const REG_STATUS: u64 = 0x10;

/// Command register bit that starts a transfer.
pub const CMD_START: u32 = 0x1;

/// Status encoding: no transfer has run or the register was cleared.
pub const STATUS_IDLE: u32 = 0;

/// Status encoding: a transfer is in flight.
pub const STATUS_BUSY: u32 = 1;

/// Status encoding: the last transfer finished its write phase.
pub const STATUS_COMPLETE: u32 = 2;

/// Latency of every register access, in ticks.
pub const PIO_LATENCY: u64 = 10;

/// Capacity of the staging buffer (1 MiB).
pub const STAGING_CAPACITY: usize = 1024 * 1024;

/// Mask keeping the high word of a 64-bit address register.
pub const HIGH_WORD_MASK: u64 = 0xFFFF_FFFF_0000_0000;
