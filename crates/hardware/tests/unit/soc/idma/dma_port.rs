//! DMA port tests.
//!
//! Verifies how a job is split into chunks, the pacing of issue events, completion
//! bookkeeping, and the receive-path throttle that refuses responses and owes retries.

use pretty_assertions::assert_eq;
use rstest::rstest;
use spmsim_core::SimError;
use spmsim_core::common::{MemCmd, PacketTag, PhysAddr, Segment, VirtAddr};
use spmsim_core::sim::{Event, EventQueue, Scheduler};
use spmsim_core::soc::devices::idma::dma_port::{
    Chunk, DmaDirection, DmaPort, DmaRequest, Issue,
};

fn seg(paddr: u64, len: u64) -> Segment {
    Segment::new(VirtAddr::new(paddr), PhysAddr::new(paddr), len)
}

fn read_job(segments: Vec<Segment>) -> DmaRequest {
    let len = segments.iter().map(|s| s.len).sum();
    DmaRequest {
        dir: DmaDirection::Read,
        segments,
        len,
    }
}

/// Pops issue events until the port goes idle, returning `(tick, chunk)` pairs.
fn issue_all(port: &mut DmaPort, sched: &mut EventQueue) -> Vec<(u64, Chunk)> {
    let mut out = Vec::new();
    while let Some((tick, event)) = sched.pop() {
        assert_eq!(event, Event::DmaIssue);
        if let Issue::Chunk { chunk, .. } = port.issue(sched) {
            out.push((tick, chunk));
        }
    }
    out
}

// ══════════════════════════════════════════════════════════
// 1. Splitting
// ══════════════════════════════════════════════════════════

#[rstest]
#[case(64, 0x1000, 16, 1)]
#[case(64, 0x1000, 64, 1)]
#[case(64, 0x1020, 64, 2)]
#[case(64, 0x1000, 256, 4)]
#[case(4, 0x1002, 8, 3)]
#[case(1, 0x1000, 5, 5)]
fn chunk_counts(#[case] chunk: u64, #[case] paddr: u64, #[case] len: u64, #[case] n: usize) {
    let port = DmaPort::new(chunk, 1, 0);
    let chunks = port.split(&[seg(paddr, len)]);
    assert_eq!(chunks.len(), n);
    assert_eq!(chunks.iter().map(|c| c.len).sum::<u64>(), len);
    assert!(chunks.iter().all(|c| c.paddr / chunk == (c.paddr + c.len - 1) / chunk));
}

#[test]
fn staging_offsets_run_across_segments() {
    let port = DmaPort::new(64, 1, 0);
    let offsets: Vec<_> = port
        .split(&[seg(0x1ff0, 0x10), seg(0x5000, 0x50)])
        .iter()
        .map(|c| (c.paddr, c.offset, c.len))
        .collect();
    assert_eq!(
        offsets,
        vec![(0x1ff0, 0x0, 0x10), (0x5000, 0x10, 0x40), (0x5040, 0x50, 0x10)]
    );
}

#[test]
fn zero_chunk_size_is_treated_as_one() {
    let port = DmaPort::new(0, 1, 0);
    assert_eq!(port.split(&[seg(0x0, 3)]).len(), 3);
}

#[test]
fn segment_ending_at_top_of_memory_splits_cleanly() {
    let port = DmaPort::new(8, 1, 0);
    let chunks: Vec<_> = port
        .split(&[seg(u64::MAX - 11, 12)])
        .iter()
        .map(|c| (c.paddr, c.offset, c.len))
        .collect();
    assert_eq!(
        chunks,
        vec![(u64::MAX - 11, 0, 4), (u64::MAX - 7, 4, 8)]
    );
}

// ══════════════════════════════════════════════════════════
// 2. Issue pacing and completion
// ══════════════════════════════════════════════════════════

#[test]
fn chunks_issue_one_interval_apart() {
    let mut port = DmaPort::new(16, 2, 0);
    let mut sched = EventQueue::new();
    sched.advance_to(10);

    let job = port.start_job(&read_job(vec![seg(0x100, 48)]), &mut sched).unwrap();
    assert_eq!(job, 0);
    assert!(port.is_active());

    let issued = issue_all(&mut port, &mut sched);
    let ticks: Vec<_> = issued.iter().map(|(t, _)| *t).collect();
    assert_eq!(ticks, vec![10, 12, 14]);
    assert_eq!(port.outstanding(), 3);
}

#[test]
fn zero_interval_issues_in_one_tick() {
    let mut port = DmaPort::new(16, 0, 0);
    let mut sched = EventQueue::new();
    let _ = port.start_job(&read_job(vec![seg(0x0, 64)]), &mut sched).unwrap();
    let issued = issue_all(&mut port, &mut sched);
    assert_eq!(issued.len(), 4);
    assert!(issued.iter().all(|(t, _)| *t == 0));
}

#[test]
fn second_job_while_active_is_fatal() {
    let mut port = DmaPort::new(64, 1, 0);
    let mut sched = EventQueue::new();
    let _ = port.start_job(&read_job(vec![seg(0x0, 8)]), &mut sched).unwrap();
    let err = port
        .start_job(&read_job(vec![seg(0x40, 8)]), &mut sched)
        .unwrap_err();
    assert!(matches!(err, SimError::DmaPortBusy { job: 0 }));
}

#[test]
fn job_finishes_on_last_response() {
    let mut port = DmaPort::new(8, 1, 0);
    let mut sched = EventQueue::new();
    let job = port.start_job(&read_job(vec![seg(0x0, 16)]), &mut sched).unwrap();
    let issued = issue_all(&mut port, &mut sched);

    let first = port
        .complete_chunk(0, MemCmd::ReadResp, Some(PacketTag { job, offset: issued[0].1.offset }))
        .unwrap();
    assert!(!first.job_finished);
    let last = port
        .complete_chunk(1, MemCmd::ReadResp, Some(PacketTag { job, offset: issued[1].1.offset }))
        .unwrap();
    assert!(last.job_finished);
    assert_eq!(last.offset, 8);
    assert_eq!(last.dir, DmaDirection::Read);
    assert!(!port.is_active());

    // Job numbers keep counting.
    assert_eq!(port.start_job(&read_job(vec![seg(0x0, 8)]), &mut sched).unwrap(), 1);
}

#[test]
fn empty_job_finishes_on_first_issue() {
    let mut port = DmaPort::new(64, 1, 0);
    let mut sched = EventQueue::new();
    let job = port.start_job(&read_job(vec![]), &mut sched).unwrap();
    assert_eq!(sched.pop(), Some((0, Event::DmaIssue)));
    assert_eq!(
        port.issue(&mut sched),
        Issue::Finished {
            job,
            dir: DmaDirection::Read
        }
    );
    assert!(!port.is_active());
    assert_eq!(port.issue(&mut sched), Issue::Idle);
}

#[rstest]
#[case::untagged(MemCmd::ReadResp, None)]
#[case::wrong_job(MemCmd::ReadResp, Some(PacketTag { job: 9, offset: 0 }))]
#[case::wrong_command(MemCmd::WriteResp, Some(PacketTag { job: 0, offset: 0 }))]
fn stray_responses_are_fatal(#[case] cmd: MemCmd, #[case] tag: Option<PacketTag>) {
    let mut port = DmaPort::new(64, 1, 0);
    let mut sched = EventQueue::new();
    let _ = port.start_job(&read_job(vec![seg(0x0, 8)]), &mut sched).unwrap();
    let _ = issue_all(&mut port, &mut sched);

    let err = port.complete_chunk(42, cmd, tag).unwrap_err();
    assert!(matches!(err, SimError::UnexpectedResponse { id: 42, .. }));
}

#[test]
fn response_with_nothing_outstanding_is_fatal() {
    let mut port = DmaPort::new(64, 1, 0);
    let mut sched = EventQueue::new();
    let _ = port.start_job(&read_job(vec![seg(0x0, 8)]), &mut sched).unwrap();
    let tag = Some(PacketTag { job: 0, offset: 0 });
    assert!(port.complete_chunk(0, MemCmd::ReadResp, tag).is_err());
}

// ══════════════════════════════════════════════════════════
// 3. Receive throttling
// ══════════════════════════════════════════════════════════

#[test]
fn zero_occupancy_never_refuses() {
    let mut port = DmaPort::new(64, 1, 0);
    let mut sched = EventQueue::new();
    assert!(port.try_accept(0, &mut sched));
    assert!(port.try_accept(1, &mut sched));
    assert!(sched.is_empty());
}

#[test]
fn busy_receive_path_refuses_and_schedules_one_retry() {
    let mut port = DmaPort::new(64, 1, 3);
    let mut sched = EventQueue::new();

    assert!(port.try_accept(2, &mut sched));
    sched.advance_to(1);
    assert!(!port.try_accept(2, &mut sched));
    sched.advance_to(2);
    assert!(!port.try_accept(5, &mut sched));
    assert!(!port.try_accept(2, &mut sched));

    assert!(port.has_waiting_senders());
    assert_eq!(sched.len(), 1);
    assert_eq!(sched.pop(), Some((3, Event::DmaRecvRetry)));
    assert_eq!(port.take_waiting(), vec![2, 5]);
    assert!(!port.has_waiting_senders());

    assert!(port.try_accept(5, &mut sched));
    assert_eq!(sched.now(), 3);
}
