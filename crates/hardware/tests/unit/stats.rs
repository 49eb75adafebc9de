//! # Statistics Tests
//!
//! Verifies the counters a system snapshot reports after real transfers, and that the
//! report printers accept every section name.

use pretty_assertions::assert_eq;
use spmsim_core::stats::{DmaStats, STATS_SECTIONS};

use crate::common::harness::{DST, SRC, TestContext, pattern};

#[test]
fn test_default_stats_are_zero() {
    let stats = DmaStats::default();
    assert_eq!(stats.ticks, 0);
    assert_eq!(stats.transfers_completed, 0);
    assert!(stats.ports.is_empty());
    assert!(stats.avg_transfer_ticks().abs() < f64::EPSILON);
}

#[test]
fn test_snapshot_after_one_transfer() {
    let mut ctx = TestContext::new();
    ctx.load(SRC, &pattern(128));
    let done = ctx.sys.run_transfer(SRC, DST, 128).unwrap();

    let stats = ctx.stats();
    assert_eq!(stats.ticks, ctx.sys.now());
    assert_eq!(stats.transfers_started, 1);
    assert_eq!(stats.transfers_completed, 1);
    assert_eq!(stats.bytes_transferred, 128);
    assert_eq!(stats.read_chunks, 2);
    assert_eq!(stats.write_chunks, 2);
    assert_eq!(stats.responses_accepted, 4);
    assert_eq!(stats.responses_refused, 0);
    assert_eq!(stats.mmio_writes, 4);
    assert!(stats.mmio_reads >= 1);
    assert_eq!(stats.transfer_ticks, done.finished_at - done.started_at);

    let port = &stats.ports[0];
    assert_eq!(port.name, "spm");
    assert_eq!(port.queue.submitted, 4);
    assert_eq!(port.queue.delivered, 4);
}

#[test]
fn test_average_latency() {
    let mut stats = DmaStats::default();
    stats.transfers_completed = 4;
    stats.transfer_ticks = 50;
    assert!((stats.avg_transfer_ticks() - 12.5).abs() < f64::EPSILON);
}

#[test]
fn test_print_every_section() {
    let mut ctx = TestContext::new();
    let _ = ctx.sys.run_transfer(SRC, DST, 8).unwrap();
    let stats = ctx.stats();
    for section in STATS_SECTIONS {
        stats.print_sections(&[(*section).to_string()]);
    }
    stats.print();
}
