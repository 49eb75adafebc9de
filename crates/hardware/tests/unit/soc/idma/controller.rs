//! Transfer controller tests.
//!
//! Verifies the Idle/Busy/Complete state machine: register snapshots, rejection while
//! busy, the oversize policies, phase sequencing, and error paths that must leave the
//! state untouched.

use std::sync::Arc;

use pretty_assertions::assert_eq;
use spmsim_core::SimError;
use spmsim_core::common::{AddrRange, PhysAddr, Segment, VirtAddr};
use spmsim_core::config::OversizePolicy;
use spmsim_core::soc::devices::idma::controller::{
    Phase, StartOutcome, TransferController, TransferParams, TransferState,
};
use spmsim_core::soc::devices::idma::dma_port::{DmaDirection, DmaRequest};
use spmsim_core::soc::devices::idma::registers::TransferStatus;
use spmsim_core::soc::devices::idma::translate::ProcessTranslator;
use spmsim_core::soc::memory::page_table::EmulationPageTable;

fn translator() -> ProcessTranslator {
    let mut pt = EmulationPageTable::new();
    pt.identity_map(AddrRange::new(0x0, 0x4000)).unwrap();
    ProcessTranslator::new(Arc::new(pt))
}

const fn params(src: u64, dst: u64, len: u64) -> TransferParams {
    TransferParams {
        src: VirtAddr::new(src),
        dst: VirtAddr::new(dst),
        len,
    }
}

fn started(outcome: StartOutcome) -> DmaRequest {
    match outcome {
        StartOutcome::Started(req) => req,
        StartOutcome::Rejected => panic!("transfer was rejected"),
    }
}

// ══════════════════════════════════════════════════════════
// 1. Starting
// ══════════════════════════════════════════════════════════

#[test]
fn start_snapshots_and_translates_source() {
    let t = translator();
    let mut ctrl = TransferController::new(64, OversizePolicy::Fatal);
    let req = started(ctrl.start(params(0x1000, 0x2000, 16), &t, 30).unwrap());

    assert_eq!(req.dir, DmaDirection::Read);
    assert_eq!(req.len, 16);
    assert_eq!(
        req.segments,
        vec![Segment::new(VirtAddr::new(0x1000), PhysAddr::new(0x1000), 16)]
    );

    let cur = ctrl.current().unwrap();
    assert_eq!(cur.params, params(0x1000, 0x2000, 16));
    assert_eq!(cur.phase, Phase::Reading);
    assert_eq!(cur.started_at, 30);
    assert_eq!(ctrl.status(), TransferStatus::Busy);
    assert_eq!(ctrl.staging().unwrap().capacity(), 64);
}

#[test]
fn start_while_busy_is_rejected_without_change() {
    let t = translator();
    let mut ctrl = TransferController::new(64, OversizePolicy::Fatal);
    let _ = started(ctrl.start(params(0x1000, 0x2000, 16), &t, 0).unwrap());

    let outcome = ctrl.start(params(0x3000, 0x3800, 8), &t, 5).unwrap();
    assert_eq!(outcome, StartOutcome::Rejected);
    let cur = ctrl.current().unwrap();
    assert_eq!(cur.params, params(0x1000, 0x2000, 16));
    assert_eq!(cur.started_at, 0);
}

#[test]
fn oversize_is_fatal_by_default() {
    let t = translator();
    let mut ctrl = TransferController::new(64, OversizePolicy::Fatal);
    let err = ctrl.start(params(0x1000, 0x2000, 65), &t, 0).unwrap_err();
    assert!(matches!(
        err,
        SimError::TransferTooLarge { size: 65, capacity: 64 }
    ));
    assert!(matches!(ctrl.state(), TransferState::Idle));
}

#[test]
fn oversize_clamps_under_clamp_policy() {
    let t = translator();
    let mut ctrl = TransferController::new(64, OversizePolicy::Clamp);
    let req = started(ctrl.start(params(0x1000, 0x2000, 4096), &t, 0).unwrap());
    assert_eq!(req.len, 64);
    assert_eq!(ctrl.current().unwrap().params.len, 64);
}

#[test]
fn exact_capacity_is_accepted() {
    let t = translator();
    let mut ctrl = TransferController::new(64, OversizePolicy::Fatal);
    assert!(ctrl.start(params(0x1000, 0x2000, 64), &t, 0).is_ok());
}

#[test]
fn unmapped_source_leaves_controller_idle() {
    let t = translator();
    let mut ctrl = TransferController::new(64, OversizePolicy::Fatal);
    let err = ctrl.start(params(0x8000, 0x2000, 4), &t, 0).unwrap_err();
    assert!(matches!(err, SimError::PageFault { vaddr: 0x8000 }));
    assert_eq!(ctrl.status(), TransferStatus::Idle);
}

#[test]
fn zero_length_transfer_has_no_segments() {
    let t = translator();
    let mut ctrl = TransferController::new(64, OversizePolicy::Fatal);
    let req = started(ctrl.start(params(0x1000, 0x2000, 0), &t, 0).unwrap());
    assert!(req.segments.is_empty());
    assert_eq!(req.len, 0);
}

// ══════════════════════════════════════════════════════════
// 2. Phase sequencing
// ══════════════════════════════════════════════════════════

#[test]
fn full_cycle_reaches_complete_and_can_restart() {
    let t = translator();
    let mut ctrl = TransferController::new(64, OversizePolicy::Fatal);
    let _ = started(ctrl.start(params(0x1000, 0x2000, 16), &t, 10).unwrap());
    ctrl.staging_mut().unwrap().write_at(0, &[0xab; 16]).unwrap();

    let write = ctrl.on_read_done(&t).unwrap();
    assert_eq!(write.dir, DmaDirection::Write);
    assert_eq!(write.segments[0].paddr, PhysAddr::new(0x2000));
    assert_eq!(ctrl.current().unwrap().phase, Phase::Writing);
    assert_eq!(ctrl.staging().unwrap().slice(0, 16).unwrap(), &[0xab; 16]);

    let done = ctrl.on_write_done(55).unwrap();
    assert_eq!(done.params, params(0x1000, 0x2000, 16));
    assert_eq!((done.started_at, done.finished_at), (10, 55));
    assert_eq!(ctrl.status(), TransferStatus::Complete);
    assert!(ctrl.staging().is_none());

    let _ = started(ctrl.start(params(0x2000, 0x3000, 8), &t, 60).unwrap());
    assert_eq!(ctrl.status(), TransferStatus::Busy);
    assert_eq!(ctrl.staging().unwrap().capacity(), 64);
}

#[test]
fn read_done_without_transfer_is_unexpected() {
    let t = translator();
    let mut ctrl = TransferController::new(64, OversizePolicy::Fatal);
    assert!(matches!(
        ctrl.on_read_done(&t),
        Err(SimError::UnexpectedCompletion { phase: "read" })
    ));
}

#[test]
fn write_done_during_read_phase_keeps_transfer() {
    let t = translator();
    let mut ctrl = TransferController::new(64, OversizePolicy::Fatal);
    let _ = started(ctrl.start(params(0x1000, 0x2000, 16), &t, 0).unwrap());

    assert!(matches!(
        ctrl.on_write_done(3),
        Err(SimError::UnexpectedCompletion { phase: "write" })
    ));
    assert_eq!(ctrl.current().unwrap().phase, Phase::Reading);
}

#[test]
fn unmapped_destination_fails_read_done() {
    let t = translator();
    let mut ctrl = TransferController::new(64, OversizePolicy::Fatal);
    let _ = started(ctrl.start(params(0x1000, 0x3ff8, 16), &t, 0).unwrap());

    let err = ctrl.on_read_done(&t).unwrap_err();
    assert!(matches!(err, SimError::PageFault { vaddr: 0x4000 }));
    assert_eq!(ctrl.current().unwrap().phase, Phase::Reading);
}

#[test]
fn staging_window_is_bounded() {
    let t = translator();
    let mut ctrl = TransferController::new(16, OversizePolicy::Fatal);
    let _ = started(ctrl.start(params(0x1000, 0x2000, 16), &t, 0).unwrap());
    let staging = ctrl.staging_mut().unwrap();
    assert!(staging.write_at(12, &[0; 4]).is_ok());
    assert!(matches!(
        staging.write_at(13, &[0; 4]),
        Err(SimError::OutOfRange { addr: 13, size: 4, .. })
    ));
}
