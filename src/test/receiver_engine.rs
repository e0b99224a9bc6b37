use super::{SENDER_ADDR, block, corrupted, receiver_cfg};
use crate::packet::{ErrorFlag, Packet, Segment};
use crate::receiver::{DiscardReason, ReceiverEngine, Verdict};

const L: usize = 100;

fn data(index: u64) -> Packet {
    let seq = index as i32 * L as i32 + 1;
    Packet::data(seq, Segment::new(block(index, L)), ErrorFlag::ALL, super::RECEIVER_ADDR)
}

#[test]
fn in_order_packet_is_accepted_and_acked_with_its_seq() {
    let mut r = ReceiverEngine::new(receiver_cfg());
    let p = data(0);
    let rx = r.on_packet(&p);

    assert_eq!(rx.verdict, Verdict::Accepted(p.segment().clone()));
    let ack = rx.ack.expect("ack for accepted packet");
    assert_eq!(ack.ack_num(), 1);
    assert_eq!(ack.destination(), SENDER_ADDR);
    assert!(ack.validity().is_clean());
    assert_eq!(r.expected_seq(), 101);
    assert_eq!(r.last_ack(), Some(1));
}

#[test]
fn corrupted_first_packet_gets_no_ack() {
    let mut r = ReceiverEngine::new(receiver_cfg());
    let rx = r.on_packet(&corrupted(&data(0)));
    assert_eq!(rx.verdict, Verdict::Discarded(DiscardReason::ChecksumMismatch));
    assert!(rx.ack.is_none());
    assert_eq!(r.expected_seq(), 1);
    assert_eq!(r.stats().corrupted, 1);
}

#[test]
fn out_of_order_before_any_acceptance_gets_no_ack() {
    let mut r = ReceiverEngine::new(receiver_cfg());
    let rx = r.on_packet(&data(1));
    assert_eq!(rx.verdict, Verdict::Discarded(DiscardReason::SequenceMismatch));
    assert!(rx.ack.is_none());
}

#[test]
fn gaps_and_duplicates_repeat_the_last_ack() {
    let mut r = ReceiverEngine::new(receiver_cfg());
    r.on_packet(&data(0));
    r.on_packet(&data(1));

    // 201 丢了，301 先到
    let rx = r.on_packet(&data(3));
    assert_eq!(rx.verdict, Verdict::Discarded(DiscardReason::SequenceMismatch));
    assert_eq!(rx.ack.map(|a| a.ack_num()), Some(101));

    // 重复的旧报文
    let rx = r.on_packet(&data(0));
    assert_eq!(rx.ack.map(|a| a.ack_num()), Some(101));

    // 出错的期望报文
    let rx = r.on_packet(&corrupted(&data(2)));
    assert_eq!(rx.verdict, Verdict::Discarded(DiscardReason::ChecksumMismatch));
    assert_eq!(rx.ack.map(|a| a.ack_num()), Some(101));

    assert_eq!(r.expected_seq(), 201);
    let rx = r.on_packet(&data(2));
    assert!(matches!(rx.verdict, Verdict::Accepted(_)));
    assert_eq!(rx.ack.map(|a| a.ack_num()), Some(201));

    let stats = r.stats();
    assert_eq!(stats.accepted, 3);
    assert_eq!(stats.out_of_order, 2);
    assert_eq!(stats.corrupted, 1);
    assert_eq!(stats.acks_sent, 6);
}

#[test]
fn ack_uses_configured_error_flag() {
    let mut cfg = receiver_cfg();
    cfg.error_flag = ErrorFlag::CORRUPT;
    let mut r = ReceiverEngine::new(cfg);
    let ack = r.on_packet(&data(0)).ack.unwrap();
    assert_eq!(ack.header().error_flag, ErrorFlag::CORRUPT);
    assert!(ack.payload().is_empty());
}
