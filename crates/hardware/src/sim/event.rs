//! Discrete-event scheduling.
//!
//! Components never hold callbacks. Each future action is an [`Event`] value scheduled at
//! a tick; the system pops events in timestamp order and dispatches them to the owning
//! component. Events scheduled for the same tick fire in the order they were scheduled.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};

use tracing::warn;

use crate::common::Tick;

/// Index of a target port on the crossbar.
pub type PortId = usize;

/// A timed action owned by one component.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Event {
    /// Attempt delivery of the head of a target's response queue.
    RespDrain(PortId),
    /// Issue the next request chunk of the engine's current DMA job.
    DmaIssue,
    /// The engine's receive path is free again; notify senders it refused.
    DmaRecvRetry,
}

/// Handle to a scheduled event, used to cancel it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EventId(u64);

/// Interface components use to request future callbacks.
///
/// The system's [`EventQueue`] is the production implementation; tests substitute a
/// recorder so components can be driven without running the loop.
pub trait Scheduler {
    /// Current simulation tick.
    fn now(&self) -> Tick;

    /// Schedules `event` to fire at `when`.
    ///
    /// A `when` earlier than [`Scheduler::now`] fires at `now`.
    fn schedule(&mut self, when: Tick, event: Event) -> EventId;

    /// Cancels a scheduled event; returns `false` if it already fired or was cancelled.
    fn deschedule(&mut self, id: EventId) -> bool;
}

/// Timestamp-ordered event queue.
#[derive(Debug, Default)]
pub struct EventQueue {
    now: Tick,
    next_seq: u64,
    heap: BinaryHeap<Reverse<(Tick, u64)>>,
    pending: HashMap<u64, Event>,
}

impl EventQueue {
    /// Creates an empty queue at tick zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live (not cancelled) events.
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Returns whether no live events remain.
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Tick of the next live event, if any.
    pub fn peek_tick(&mut self) -> Option<Tick> {
        while let Some(Reverse((tick, seq))) = self.heap.peek().copied() {
            if self.pending.contains_key(&seq) {
                return Some(tick);
            }
            let _ = self.heap.pop();
        }
        None
    }

    /// Removes the next live event and advances time to it.
    pub fn pop(&mut self) -> Option<(Tick, Event)> {
        while let Some(Reverse((tick, seq))) = self.heap.pop() {
            if let Some(event) = self.pending.remove(&seq) {
                self.now = tick;
                return Some((tick, event));
            }
        }
        None
    }

    /// Advances time to `tick` without firing anything.
    ///
    /// Used when the host idles past the last event; never moves time backwards.
    pub fn advance_to(&mut self, tick: Tick) {
        if tick > self.now {
            self.now = tick;
        }
    }
}

impl Scheduler for EventQueue {
    fn now(&self) -> Tick {
        self.now
    }

    fn schedule(&mut self, when: Tick, event: Event) -> EventId {
        let when = if when < self.now {
            warn!(?event, when, now = self.now, "event scheduled in the past, firing now");
            self.now
        } else {
            when
        };
        let seq = self.next_seq;
        self.next_seq += 1;
        self.heap.push(Reverse((when, seq)));
        let _ = self.pending.insert(seq, event);
        EventId(seq)
    }

    fn deschedule(&mut self, id: EventId) -> bool {
        self.pending.remove(&id.0).is_some()
    }
}
