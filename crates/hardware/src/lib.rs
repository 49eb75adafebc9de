//! Scratchpad DMA engine simulator library.
//!
//! This crate models a memory-mapped DMA engine (IDMA) copying between scratchpad
//! memories in a discrete-event timing simulation:
//! 1. **Engine:** Register file, Idle/Busy/Complete transfer state machine, staging
//!    buffer, chunked requester port, and mode-dependent address translation.
//! 2. **Memory:** Scratchpads with simple or DRAM latency models, each returning
//!    responses through an ordered, flow-controlled response queue.
//! 3. **SoC:** Crossbar routing and the `System` that owns the event loop.
//! 4. **Simulation:** Event scheduling, configuration, and statistics collection.

/// Common types and constants (addresses, packets, errors, register map).
pub mod common;
/// Simulator configuration (defaults, enums, hierarchical config structures).
pub mod config;
/// Discrete-event scheduling.
pub mod sim;
/// System-on-chip (builder, crossbar, devices, memory, traits).
pub mod soc;
/// Simulation statistics collection and reporting.
pub mod stats;

/// Fatal simulation error and result alias.
pub use crate::common::{Result, SimError};
/// Root configuration type; use `Config::default()` or `Config::from_json`.
pub use crate::config::Config;
/// Top-level system (engine, crossbar, event queue); construct with `System::new`.
pub use crate::soc::System;
