//! Memory-access packets.
//!
//! A `Packet` carries one read or write between a requester and a target: address, size,
//! command, byte payload, and whether the requester expects a response. Targets turn a
//! request into its response in place with [`Packet::make_response`] and hand the same
//! packet back, so ownership follows the packet through the queues.

use super::error::{Result, SimError};

/// Packet command.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MemCmd {
    /// Read request; payload is filled in by the target.
    ReadReq,
    /// Write request; payload carries the bytes to store.
    WriteReq,
    /// Response to a read; payload holds the bytes read.
    ReadResp,
    /// Response to a write; payload is unchanged.
    WriteResp,
}

impl MemCmd {
    /// Returns whether this is a read request or read response.
    pub const fn is_read(self) -> bool {
        matches!(self, Self::ReadReq | Self::ReadResp)
    }

    /// Returns whether this is a write request or write response.
    pub const fn is_write(self) -> bool {
        matches!(self, Self::WriteReq | Self::WriteResp)
    }

    /// Returns whether this is a response command.
    pub const fn is_response(self) -> bool {
        matches!(self, Self::ReadResp | Self::WriteResp)
    }

    /// Returns the matching response command for a request.
    pub const fn response(self) -> Option<Self> {
        match self {
            Self::ReadReq => Some(Self::ReadResp),
            Self::WriteReq => Some(Self::WriteResp),
            Self::ReadResp | Self::WriteResp => None,
        }
    }

    /// Short name used in traces.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ReadReq => "ReadReq",
            Self::WriteReq => "WriteReq",
            Self::ReadResp => "ReadResp",
            Self::WriteResp => "WriteResp",
        }
    }
}

/// Identifies which DMA job a chunk belongs to and where it lands in the staging buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PacketTag {
    /// Job sequence number assigned by the DMA port.
    pub job: u64,
    /// Byte offset of the chunk within the staging buffer.
    pub offset: u64,
}

/// A memory access in flight between two ports.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Packet {
    id: u64,
    addr: u64,
    cmd: MemCmd,
    data: Vec<u8>,
    needs_response: bool,
    tag: Option<PacketTag>,
}

impl Packet {
    /// Creates a read request for `size` bytes at `addr`.
    pub fn read(id: u64, addr: u64, size: usize) -> Self {
        Self {
            id,
            addr,
            cmd: MemCmd::ReadReq,
            data: vec![0; size],
            needs_response: true,
            tag: None,
        }
    }

    /// Creates a write request storing `data` at `addr`.
    pub fn write(id: u64, addr: u64, data: Vec<u8>) -> Self {
        Self {
            id,
            addr,
            cmd: MemCmd::WriteReq,
            data,
            needs_response: true,
            tag: None,
        }
    }

    /// Marks the request as posted: the target services it but sends nothing back.
    #[must_use]
    pub fn posted(mut self) -> Self {
        self.needs_response = false;
        self
    }

    /// Attaches a DMA job tag.
    #[must_use]
    pub const fn with_tag(mut self, tag: PacketTag) -> Self {
        self.tag = Some(tag);
        self
    }

    /// Packet identifier, unique per requester.
    pub const fn id(&self) -> u64 {
        self.id
    }

    /// Target physical address.
    pub const fn addr(&self) -> u64 {
        self.addr
    }

    /// Access size in bytes.
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// Current command.
    pub const fn cmd(&self) -> MemCmd {
        self.cmd
    }

    /// DMA job tag, if any.
    pub const fn tag(&self) -> Option<PacketTag> {
        self.tag
    }

    /// Whether the requester expects a response.
    pub const fn needs_response(&self) -> bool {
        self.needs_response
    }

    /// Whether the packet has been turned into a response.
    pub const fn is_response(&self) -> bool {
        self.cmd.is_response()
    }

    /// Payload bytes.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Mutable payload bytes.
    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Consumes the packet and returns its payload.
    pub fn into_data(self) -> Vec<u8> {
        self.data
    }

    /// Interprets the payload as a little-endian integer of the packet's size.
    ///
    /// Sizes above eight bytes read only the first eight.
    pub fn get_le(&self) -> u64 {
        self.data
            .iter()
            .take(8)
            .enumerate()
            .fold(0u64, |acc, (i, b)| acc | (u64::from(*b) << (i * 8)))
    }

    /// Stores `val` little-endian into the payload, truncated to the packet's size.
    pub fn set_le(&mut self, val: u64) {
        let bytes = val.to_le_bytes();
        for (dst, src) in self.data.iter_mut().zip(bytes.iter()) {
            *dst = *src;
        }
        for dst in self.data.iter_mut().skip(bytes.len()) {
            *dst = 0;
        }
    }

    /// Converts the request into its response.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::AlreadyResponse`] if the packet is already a response.
    pub fn make_response(&mut self) -> Result<()> {
        match self.cmd.response() {
            Some(resp) => {
                self.cmd = resp;
                Ok(())
            }
            None => Err(SimError::AlreadyResponse { id: self.id }),
        }
    }
}
