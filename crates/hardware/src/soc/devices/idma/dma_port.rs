//! The engine's DMA-capable requester port.
//!
//! A translated transfer phase becomes a *job*: a list of chunk requests, each inside one
//! physical segment and one `chunk_size`-aligned block. The port:
//! 1. **Issues** one chunk per `issue_interval` ticks, driven by [`Event::DmaIssue`].
//! 2. **Tracks** outstanding chunks per job; the job finishes when every chunk has been
//!    issued and answered.
//! 3. **Throttles receive:** with a non-zero `recv_occupancy` each accepted response
//!    keeps the receive path busy for that long. Responses arriving meanwhile are
//!    refused; the port remembers who it refused and owes each a ready notification at
//!    the busy-until tick ([`Event::DmaRecvRetry`]).

use std::collections::VecDeque;

use tracing::trace;

use crate::common::{MemCmd, PacketTag, Result, Segment, SimError, Tick};
use crate::sim::event::{Event, EventId, PortId, Scheduler};

/// Which half of a transfer a job performs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DmaDirection {
    /// Memory to staging buffer.
    Read,
    /// Staging buffer to memory.
    Write,
}

impl DmaDirection {
    /// Phase name used in traces and errors.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Read => "read",
            Self::Write => "write",
        }
    }

    const fn response_cmd(self) -> MemCmd {
        match self {
            Self::Read => MemCmd::ReadResp,
            Self::Write => MemCmd::WriteResp,
        }
    }
}

/// One asynchronous copy handed to the port.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DmaRequest {
    /// Direction of the copy.
    pub dir: DmaDirection,
    /// Physical segments, in staging-buffer order.
    pub segments: Vec<Segment>,
    /// Total length in bytes.
    pub len: u64,
}

/// A single request's slice of a job.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Chunk {
    /// Physical address of the first byte.
    pub paddr: u64,
    /// Offset into the staging buffer.
    pub offset: u64,
    /// Length in bytes.
    pub len: u64,
}

/// What the issue event produced.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Issue {
    /// A chunk to send now.
    Chunk {
        /// Job the chunk belongs to.
        job: u64,
        /// Direction of the job.
        dir: DmaDirection,
        /// The chunk.
        chunk: Chunk,
    },
    /// The job had nothing to send and is finished.
    Finished {
        /// Job number.
        job: u64,
        /// Direction of the job.
        dir: DmaDirection,
    },
    /// Nothing to do.
    Idle,
}

/// An answered chunk.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChunkDone {
    /// Direction of the job.
    pub dir: DmaDirection,
    /// Staging-buffer offset of the chunk.
    pub offset: u64,
    /// Whether this was the job's last outstanding chunk.
    pub job_finished: bool,
}

#[derive(Debug)]
struct Job {
    id: u64,
    dir: DmaDirection,
    pending: VecDeque<Chunk>,
    outstanding: usize,
}

/// Requester-side port with chunked issue and receive throttling.
#[derive(Debug)]
pub struct DmaPort {
    chunk_size: u64,
    issue_interval: Tick,
    recv_occupancy: Tick,
    next_job: u64,
    next_packet: u64,
    job: Option<Job>,
    issue_event: Option<EventId>,
    recv_busy_until: Tick,
    waiting_senders: Vec<PortId>,
    retry_event: Option<EventId>,
}

impl DmaPort {
    /// Creates an idle port.
    ///
    /// # Arguments
    ///
    /// * `chunk_size` - Largest request in bytes; a power of two, zero is treated as one.
    /// * `issue_interval` - Ticks between consecutive requests (zero issues every chunk
    ///   in the same tick).
    /// * `recv_occupancy` - Ticks the receive path stays busy per accepted response.
    pub const fn new(chunk_size: u64, issue_interval: Tick, recv_occupancy: Tick) -> Self {
        Self {
            chunk_size: if chunk_size == 0 { 1 } else { chunk_size },
            issue_interval,
            recv_occupancy,
            next_job: 0,
            next_packet: 0,
            job: None,
            issue_event: None,
            recv_busy_until: 0,
            waiting_senders: Vec::new(),
            retry_event: None,
        }
    }

    /// Whether a job is outstanding.
    pub const fn is_active(&self) -> bool {
        self.job.is_some()
    }

    /// Number of issued but unanswered chunks.
    pub fn outstanding(&self) -> usize {
        self.job.as_ref().map_or(0, |j| j.outstanding)
    }

    /// Whether any refused sender is owed a ready notification.
    pub fn has_waiting_senders(&self) -> bool {
        !self.waiting_senders.is_empty()
    }

    /// Splits `segments` into chunks that never cross a segment or an aligned
    /// `chunk_size` block.
    pub fn split(&self, segments: &[Segment]) -> VecDeque<Chunk> {
        let mut chunks = VecDeque::new();
        let mut offset = 0;
        for seg in segments {
            let mut paddr = seg.paddr.val();
            let mut remaining = seg.len;
            while remaining > 0 {
                let room = self.chunk_size - paddr % self.chunk_size;
                let len = room.min(remaining);
                chunks.push_back(Chunk { paddr, offset, len });
                remaining -= len;
                offset += len;
                // Wraps only past the final chunk of a segment ending at the top of memory.
                paddr = paddr.wrapping_add(len);
            }
        }
        chunks
    }

    /// Starts a job and schedules its first issue at the current tick.
    ///
    /// # Returns
    ///
    /// The job number.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::DmaPortBusy`] if a job is already outstanding.
    pub fn start_job(&mut self, req: &DmaRequest, sched: &mut dyn Scheduler) -> Result<u64> {
        if let Some(job) = &self.job {
            return Err(SimError::DmaPortBusy { job: job.id });
        }
        let id = self.next_job;
        self.next_job += 1;
        let pending = self.split(&req.segments);
        trace!(
            job = id,
            dir = req.dir.as_str(),
            len = req.len,
            chunks = pending.len(),
            "DMA job started"
        );
        self.job = Some(Job {
            id,
            dir: req.dir,
            pending,
            outstanding: 0,
        });
        if self.issue_event.is_none() {
            let now = sched.now();
            self.issue_event = Some(sched.schedule(now, Event::DmaIssue));
        }
        Ok(id)
    }

    /// Handles the issue event.
    pub fn issue(&mut self, sched: &mut dyn Scheduler) -> Issue {
        self.issue_event = None;
        let Some(job) = self.job.as_mut() else {
            return Issue::Idle;
        };

        if let Some(chunk) = job.pending.pop_front() {
            job.outstanding += 1;
            let (id, dir) = (job.id, job.dir);
            if !job.pending.is_empty() {
                let when = sched.now() + self.issue_interval;
                self.issue_event = Some(sched.schedule(when, Event::DmaIssue));
            }
            return Issue::Chunk { job: id, dir, chunk };
        }

        if job.outstanding == 0 {
            let (id, dir) = (job.id, job.dir);
            self.job = None;
            return Issue::Finished { job: id, dir };
        }
        Issue::Idle
    }

    /// Allocates a packet identifier.
    pub const fn next_packet_id(&mut self) -> u64 {
        let id = self.next_packet;
        self.next_packet += 1;
        id
    }

    /// Decides whether a response from `from` can be received now.
    ///
    /// On refusal the sender is recorded and a retry event is scheduled for the tick the
    /// receive path frees up.
    pub fn try_accept(&mut self, from: PortId, sched: &mut dyn Scheduler) -> bool {
        if self.recv_occupancy == 0 {
            return true;
        }
        let now = sched.now();
        if now < self.recv_busy_until {
            if !self.waiting_senders.contains(&from) {
                self.waiting_senders.push(from);
            }
            if self.retry_event.is_none() {
                self.retry_event = Some(sched.schedule(self.recv_busy_until, Event::DmaRecvRetry));
            }
            return false;
        }
        self.recv_busy_until = now + self.recv_occupancy;
        true
    }

    /// Takes the senders owed a ready notification, in refusal order.
    pub fn take_waiting(&mut self) -> Vec<PortId> {
        self.retry_event = None;
        std::mem::take(&mut self.waiting_senders)
    }

    /// Records the response to one chunk.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::UnexpectedResponse`] if the packet is untagged, belongs to
    /// another job, has the wrong command, or no chunk is outstanding.
    pub fn complete_chunk(
        &mut self,
        id: u64,
        cmd: MemCmd,
        tag: Option<PacketTag>,
    ) -> Result<ChunkDone> {
        let unexpected = SimError::UnexpectedResponse { id, tag };
        let (Some(job), Some(t)) = (self.job.as_mut(), tag) else {
            return Err(unexpected);
        };
        if t.job != job.id || cmd != job.dir.response_cmd() || job.outstanding == 0 {
            return Err(unexpected);
        }

        job.outstanding -= 1;
        let dir = job.dir;
        let job_finished = job.outstanding == 0 && job.pending.is_empty();
        if job_finished {
            trace!(job = t.job, dir = dir.as_str(), "DMA job finished");
            self.job = None;
        }
        Ok(ChunkDone {
            dir,
            offset: t.offset,
            job_finished,
        })
    }
}
