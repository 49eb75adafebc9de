//! Packet unit tests.
//!
//! Verifies request construction, little-endian payload access, tagging, and the
//! request-to-response conversion targets perform in place.

use spmsim_core::SimError;
use spmsim_core::common::{MemCmd, Packet, PacketTag};

#[test]
fn read_request_is_zero_filled_and_needs_response() {
    let pkt = Packet::read(3, 0x1000, 8);
    assert_eq!(pkt.cmd(), MemCmd::ReadReq);
    assert_eq!(pkt.size(), 8);
    assert!(pkt.data().iter().all(|b| *b == 0));
    assert!(pkt.needs_response());
    assert_eq!(pkt.tag(), None);
}

#[test]
fn posted_write_needs_no_response() {
    let pkt = Packet::write(1, 0x1000, vec![1, 2]).posted();
    assert!(!pkt.needs_response());
    assert_eq!(pkt.cmd(), MemCmd::WriteReq);
}

#[test]
fn set_le_truncates_to_packet_size() {
    let mut pkt = Packet::write(0, 0, vec![0; 4]);
    pkt.set_le(0x1122_3344_5566_7788);
    assert_eq!(pkt.data(), &[0x88, 0x77, 0x66, 0x55]);
    assert_eq!(pkt.get_le(), 0x5566_7788);
}

#[test]
fn set_le_zero_fills_wide_payloads() {
    let mut pkt = Packet::write(0, 0, vec![0xff; 12]);
    pkt.set_le(1);
    assert_eq!(pkt.data()[0], 1);
    assert!(pkt.data()[1..].iter().all(|b| *b == 0));
}

#[test]
fn make_response_converts_once() {
    let mut pkt = Packet::read(9, 0x40, 4);
    pkt.make_response().unwrap();
    assert_eq!(pkt.cmd(), MemCmd::ReadResp);
    assert!(pkt.is_response());

    assert!(matches!(
        pkt.make_response(),
        Err(SimError::AlreadyResponse { id: 9 })
    ));
}

#[test]
fn tag_survives_response_conversion() {
    let tag = PacketTag { job: 2, offset: 0x40 };
    let mut pkt = Packet::write(5, 0x80, vec![7; 4]).with_tag(tag);
    pkt.make_response().unwrap();
    assert_eq!(pkt.cmd(), MemCmd::WriteResp);
    assert_eq!(pkt.tag(), Some(tag));
    assert_eq!(pkt.into_data(), vec![7; 4]);
}

#[test]
fn command_classification() {
    assert!(MemCmd::ReadReq.is_read());
    assert!(MemCmd::ReadResp.is_read());
    assert!(MemCmd::WriteReq.is_write());
    assert!(!MemCmd::WriteReq.is_response());
    assert_eq!(MemCmd::WriteResp.response(), None);
    assert_eq!(MemCmd::WriteReq.as_str(), "WriteReq");
}
