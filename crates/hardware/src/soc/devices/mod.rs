//! Memory-Mapped IO Devices.
//!
//! This module contains the IDMA scratchpad DMA engine, the only CPU-visible device in
//! the system.

/// IDMA engine (registers, transfer controller, DMA port, translator).
pub mod idma;

pub use idma::Idma;

pub use crate::soc::traits::MemoryMappedDevice;
