//! Simulation scheduling.
//!
//! Provides the event type, the scheduler interface components are driven through, and
//! the timestamp-ordered queue the system runs.

/// Events, handles, and the event queue.
pub mod event;

pub use event::{Event, EventId, EventQueue, PortId, Scheduler};
