//! System-on-Chip (SoC) Components.
//!
//! This module organizes the components that make up the simulated system: the DMA
//! engine, the scratchpad memories and their response ports, the crossbar between them,
//! and the builder that assembles and runs everything.

/// System builder and event loop.
pub mod builder;

/// Memory-mapped DMA engine.
pub mod devices;

/// Address-routed crossbar.
pub mod interconnect;

/// Scratchpad storage, latency models, response queues, and page table.
pub mod memory;

/// Capability traits connecting devices, ports, and targets.
pub mod traits;

pub use builder::{MmioResponse, System};
