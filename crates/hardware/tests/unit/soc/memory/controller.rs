//! Memory controller latency tests.
//!
//! Verifies the fixed-latency model and the open-row DRAM model, including row
//! geometry rounding and the write-recovery penalty.

use rstest::rstest;
use spmsim_core::common::MemCmd;
use spmsim_core::soc::memory::controller::{
    DramController, DramTiming, MemoryController, SimpleController,
};

const TIMING: DramTiming = DramTiming {
    t_cas: 10,
    t_ras: 20,
    t_pre: 30,
    t_wr: 4,
    row_bytes: 1024,
};

#[rstest]
#[case(MemCmd::ReadReq)]
#[case(MemCmd::WriteReq)]
fn simple_controller_is_constant(#[case] cmd: MemCmd) {
    let mut ctrl = SimpleController::new(2);
    assert_eq!(ctrl.access_latency(0x0, cmd), 2);
    assert_eq!(ctrl.access_latency(0xdead_0000, cmd), 2);
}

#[test]
fn first_access_opens_row() {
    let mut ctrl = DramController::new(TIMING);
    assert_eq!(ctrl.access_latency(0x400, MemCmd::ReadReq), 30);
}

#[test]
fn row_conflict_pays_precharge() {
    let mut ctrl = DramController::new(TIMING);
    let _ = ctrl.access_latency(0x000, MemCmd::ReadReq);
    assert_eq!(ctrl.access_latency(0x3ff, MemCmd::ReadReq), 10);
    assert_eq!(ctrl.access_latency(0x400, MemCmd::ReadReq), 60);
    assert_eq!(ctrl.access_latency(0x404, MemCmd::WriteReq), 14);
}

#[test]
fn row_bytes_round_up_to_power_of_two() {
    let mut ctrl = DramController::new(DramTiming {
        row_bytes: 1000,
        ..TIMING
    });
    let _ = ctrl.access_latency(0x0, MemCmd::ReadReq);
    // 1000 rounds to 1024, so 0x3e8 is still in the open row.
    assert_eq!(ctrl.access_latency(0x3e8, MemCmd::ReadReq), 10);
}
