//! IDMA register file and decoder.
//!
//! The engine's control plane is five registers in a 4 KiB window. Offsets decode 1:1;
//! the address registers take either a low-word or a full access, everything else is a
//! 32-bit register.
//!
//! # Memory Map
//!
//! * `0x00`: SRC_ADDR (4 or 8 bytes)
//! * `0x04`: DST_ADDR (4 or 8 bytes)
//! * `0x08`: SIZE (4 bytes)
//! * `0x0C`: COMMAND (4 bytes, bit 0 = start)
//! * `0x10`: STATUS (4 bytes, 0 = Idle, 1 = Busy, 2 = Complete)

use tracing::warn;

use crate::common::constants::{
    HIGH_WORD_MASK, REG_COMMAND, REG_DST_ADDR, REG_SIZE, REG_SRC_ADDR, REG_STATUS, STATUS_BUSY,
    STATUS_COMPLETE, STATUS_IDLE,
};
use crate::common::{Result, SimError};

/// One of the five engine registers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Register {
    /// Source virtual address.
    SrcAddr,
    /// Destination virtual address.
    DstAddr,
    /// Transfer length in bytes.
    Size,
    /// Command register; bit 0 starts a transfer.
    Command,
    /// Transfer status.
    Status,
}

impl Register {
    /// Every register, in offset order.
    pub const ALL: [Self; 5] = [
        Self::SrcAddr,
        Self::DstAddr,
        Self::Size,
        Self::Command,
        Self::Status,
    ];

    /// Decodes a window offset.
    pub const fn decode(offset: u64) -> Option<Self> {
        match offset {
            REG_SRC_ADDR => Some(Self::SrcAddr),
            REG_DST_ADDR => Some(Self::DstAddr),
            REG_SIZE => Some(Self::Size),
            REG_COMMAND => Some(Self::Command),
            REG_STATUS => Some(Self::Status),
            _ => None,
        }
    }

    /// Window offset of the register.
    pub const fn offset(self) -> u64 {
        match self {
            Self::SrcAddr => REG_SRC_ADDR,
            Self::DstAddr => REG_DST_ADDR,
            Self::Size => REG_SIZE,
            Self::Command => REG_COMMAND,
            Self::Status => REG_STATUS,
        }
    }

    /// Register name as it appears in the memory map.
    pub const fn name(self) -> &'static str {
        match self {
            Self::SrcAddr => "SRC_ADDR",
            Self::DstAddr => "DST_ADDR",
            Self::Size => "SIZE",
            Self::Command => "COMMAND",
            Self::Status => "STATUS",
        }
    }

    /// Returns whether an access of `width` bytes is legal.
    pub const fn accepts(self, width: usize) -> bool {
        match self {
            Self::SrcAddr | Self::DstAddr => width == 4 || width == 8,
            Self::Size | Self::Command | Self::Status => width == 4,
        }
    }

    /// Fails with [`SimError::InvalidAccessSize`] unless `width` is legal.
    pub(crate) fn check_width(self, width: usize) -> Result<()> {
        if self.accepts(width) {
            Ok(())
        } else {
            Err(SimError::InvalidAccessSize {
                register: self.name(),
                size: width,
            })
        }
    }
}

/// Value of the STATUS register.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum TransferStatus {
    /// No transfer has run since reset.
    #[default]
    Idle = STATUS_IDLE,
    /// A transfer is in flight.
    Busy = STATUS_BUSY,
    /// The last transfer finished.
    Complete = STATUS_COMPLETE,
}

impl TransferStatus {
    /// Register encoding.
    pub const fn bits(self) -> u32 {
        self as u32
    }
}

/// Architectural register state.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RegisterFile {
    src_addr: u64,
    dst_addr: u64,
    size: u32,
    command: u32,
    status: u32,
}

impl RegisterFile {
    /// Creates a register file with every register zero (status Idle).
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads `width` bytes at window `offset`.
    ///
    /// Unmapped offsets return zero and log a warning.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::InvalidAccessSize`] for a known register read with an
    /// unsupported width.
    pub fn read(&self, offset: u64, width: usize) -> Result<u64> {
        let Some(reg) = Register::decode(offset) else {
            warn!(offset = format_args!("{offset:#x}"), width, "IDMA read from unmapped register");
            return Ok(0);
        };
        reg.check_width(width)?;

        let value = match reg {
            Register::SrcAddr if width == 4 => self.src_addr & 0xFFFF_FFFF,
            Register::SrcAddr => self.src_addr,
            Register::DstAddr if width == 4 => self.dst_addr & 0xFFFF_FFFF,
            Register::DstAddr => self.dst_addr,
            Register::Size => u64::from(self.size),
            Register::Command => u64::from(self.command),
            Register::Status => u64::from(self.status),
        };
        Ok(value)
    }

    /// Writes `width` bytes at window `offset`.
    ///
    /// A 4-byte write to an address register replaces only its low word. Unmapped
    /// offsets are ignored with a warning.
    ///
    /// # Returns
    ///
    /// The register written, or `None` for an unmapped offset.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::InvalidAccessSize`] for a known register written with an
    /// unsupported width.
    pub fn write(&mut self, offset: u64, width: usize, value: u64) -> Result<Option<Register>> {
        let Some(reg) = Register::decode(offset) else {
            warn!(
                offset = format_args!("{offset:#x}"),
                width,
                value = format_args!("{value:#x}"),
                "IDMA write to unmapped register"
            );
            return Ok(None);
        };
        reg.check_width(width)?;

        let low = value & 0xFFFF_FFFF;
        match reg {
            Register::SrcAddr if width == 4 => {
                self.src_addr = (self.src_addr & HIGH_WORD_MASK) | low;
            }
            Register::SrcAddr => self.src_addr = value,
            Register::DstAddr if width == 4 => {
                self.dst_addr = (self.dst_addr & HIGH_WORD_MASK) | low;
            }
            Register::DstAddr => self.dst_addr = value,
            Register::Size => self.size = low as u32,
            Register::Command => self.command = low as u32,
            Register::Status => self.status = low as u32,
        }
        Ok(Some(reg))
    }

    /// Source address register.
    pub const fn src_addr(&self) -> u64 {
        self.src_addr
    }

    /// Destination address register.
    pub const fn dst_addr(&self) -> u64 {
        self.dst_addr
    }

    /// Size register.
    pub const fn size(&self) -> u32 {
        self.size
    }

    /// Command register.
    pub const fn command(&self) -> u32 {
        self.command
    }

    /// Raw status register.
    pub const fn status(&self) -> u32 {
        self.status
    }

    /// Sets the status register from the transfer state machine.
    pub const fn set_status(&mut self, status: TransferStatus) {
        self.status = status.bits();
    }
}
