use std::sync::{Arc, Mutex};
use std::time::Duration;

use super::{SENDER_ADDR, block, corrupted, receiver_cfg, sender_cfg};
use crate::RdtError;
use crate::channel::Channel;
use crate::packet::{ErrorFlag, Packet, Segment};
use crate::receiver::{DeliverySink, MemorySink, Receiver};
use crate::sender::{Sender, Variant};

const L: usize = 10;
const RTO: Duration = Duration::from_millis(100);

/// 只记录发出的报文，不交付
#[derive(Default)]
struct Recorder {
    sent: Mutex<Vec<Packet>>,
}

impl Recorder {
    fn seqs(&self) -> Vec<i32> {
        self.sent.lock().unwrap().iter().map(Packet::seq).collect()
    }

    fn acks(&self) -> Vec<i32> {
        self.sent.lock().unwrap().iter().map(Packet::ack_num).collect()
    }
}

impl Channel for Recorder {
    fn send(&self, packet: Packet) {
        self.sent.lock().unwrap().push(packet);
    }
}

fn sender(variant: Variant) -> (Arc<Sender>, Arc<Recorder>) {
    let rec = Arc::new(Recorder::default());
    let s = Sender::new(sender_cfg(variant, L), RTO, Arc::clone(&rec) as Arc<dyn Channel>);
    (Arc::new(s), rec)
}

fn ack(n: i32) -> Packet {
    Packet::ack(n, ErrorFlag::NONE, SENDER_ADDR)
}

async fn settle() {
    for _ in 0..8 {
        tokio::task::yield_now().await;
    }
}

#[tokio::test(start_paused = true)]
async fn send_waits_for_the_window_to_open() {
    let (s, rec) = sender(Variant::Reno);
    s.send(0, block(0, L)).await.unwrap();
    assert_eq!(rec.seqs(), vec![1]);

    let waiter = {
        let s = Arc::clone(&s);
        tokio::spawn(async move { s.send(1, block(1, L)).await })
    };
    settle().await;
    assert!(!waiter.is_finished());
    assert_eq!(rec.seqs(), vec![1]);

    let handler = s.handler().upgrade().unwrap();
    handler.deliver(ack(1));
    waiter.await.unwrap().unwrap();
    assert_eq!(rec.seqs(), vec![1, 11]);

    let snap = s.snapshot();
    assert_eq!(snap.base, 11);
    assert_eq!(snap.next_seq, 21);
    assert_eq!(snap.cwnd, 2.0);
}

#[tokio::test(start_paused = true)]
async fn timer_retransmits_every_interval_until_acked() {
    let (s, rec) = sender(Variant::Reno);
    s.send(0, block(0, L)).await.unwrap();

    tokio::time::sleep(RTO + Duration::from_millis(1)).await;
    assert_eq!(rec.seqs(), vec![1, 1]);
    assert_eq!(s.snapshot().stats.timeouts, 1);

    tokio::time::sleep(RTO).await;
    assert_eq!(rec.seqs(), vec![1, 1, 1]);
    assert_eq!(s.snapshot().stats.timeouts, 2);

    s.handler().upgrade().unwrap().deliver(ack(1));
    tokio::time::sleep(RTO * 5).await;
    assert_eq!(rec.seqs().len(), 3);
    assert_eq!(s.snapshot().stats.timeouts, 2);
}

#[tokio::test(start_paused = true)]
async fn new_ack_restarts_the_timer() {
    let (s, rec) = sender(Variant::Reno);
    s.send(0, block(0, L)).await.unwrap();
    let handler = s.handler().upgrade().unwrap();
    handler.deliver(ack(1));
    s.send(1, block(1, L)).await.unwrap();
    s.send(2, block(2, L)).await.unwrap();

    tokio::time::sleep(RTO * 3 / 4).await;
    handler.deliver(ack(11));
    // 距第一次发送已超过一个周期，但定时器在 ACK 11 时重启过
    tokio::time::sleep(RTO * 3 / 4).await;
    assert_eq!(rec.seqs(), vec![1, 11, 21]);

    tokio::time::sleep(RTO / 2).await;
    assert_eq!(rec.seqs(), vec![1, 11, 21, 21]);
}

#[tokio::test(start_paused = true)]
async fn corrupted_ack_is_counted_and_ignored() {
    let (s, _rec) = sender(Variant::Reno);
    s.send(0, block(0, L)).await.unwrap();
    s.handler().upgrade().unwrap().deliver(corrupted(&ack(1)));

    let snap = s.snapshot();
    assert_eq!(snap.stats.corrupted_acks, 1);
    assert_eq!(snap.base, 1);
    assert_eq!(snap.in_flight, 1);
}

#[tokio::test(start_paused = true)]
async fn close_wakes_blocked_senders() {
    let (s, _rec) = sender(Variant::Tahoe);
    s.send(0, block(0, L)).await.unwrap();
    let waiter = {
        let s = Arc::clone(&s);
        tokio::spawn(async move { s.send(1, block(1, L)).await })
    };
    settle().await;

    s.close();
    let res = waiter.await.unwrap();
    assert!(matches!(res, Err(RdtError::SenderClosed)));
    assert!(matches!(s.wait_idle().await, Err(RdtError::SenderClosed)));
}

#[tokio::test(start_paused = true)]
async fn wait_idle_returns_once_everything_is_acked() {
    let (s, _rec) = sender(Variant::Reno);
    s.send(0, block(0, L)).await.unwrap();
    let idle = {
        let s = Arc::clone(&s);
        tokio::spawn(async move { s.wait_idle().await })
    };
    settle().await;
    assert!(!idle.is_finished());

    s.handler().upgrade().unwrap().deliver(ack(1));
    idle.await.unwrap().unwrap();
}

#[tokio::test(start_paused = true)]
async fn receiver_replies_on_the_reverse_channel_and_flushes_on_close() {
    let rec = Arc::new(Recorder::default());
    let sink = MemorySink::default();
    let r = Receiver::new(
        receiver_cfg(),
        2,
        Box::new(sink.clone()),
        Arc::clone(&rec) as Arc<dyn Channel>,
    );
    let handler = r.handler().upgrade().unwrap();

    let data = |i: u64| {
        Packet::data(i as i32 * L as i32 + 1, Segment::new(block(i, L)), ErrorFlag::NONE, super::RECEIVER_ADDR)
    };
    handler.deliver(data(0));
    handler.deliver(data(2));
    handler.deliver(data(1));
    handler.deliver(data(2));
    assert_eq!(rec.acks(), vec![1, 1, 11, 21]);
    assert_eq!(sink.batch_sizes(), vec![2]);

    let summary = r.close().unwrap();
    assert_eq!(sink.batch_sizes(), vec![2, 1]);
    assert_eq!(summary.delivery.delivered_blocks, 3);
    assert_eq!(summary.expected_seq, 31);
    assert_eq!(summary.stats.out_of_order, 1);

    // 关闭后不再处理
    handler.deliver(data(3));
    assert_eq!(rec.acks().len(), 4);
}

/// 第一次交付失败，之后记录每次调用
#[derive(Default)]
struct BrokenSink {
    calls: Arc<Mutex<Vec<usize>>>,
}

impl DeliverySink for BrokenSink {
    fn deliver(&mut self, blocks: &[Segment]) -> crate::Result<()> {
        let mut calls = self.calls.lock().unwrap();
        calls.push(blocks.len());
        if calls.len() == 1 {
            return Err(RdtError::Io(std::io::Error::other("disk full")));
        }
        Ok(())
    }
}

#[tokio::test(start_paused = true)]
async fn receiver_stops_delivering_after_a_sink_error() {
    let rec = Arc::new(Recorder::default());
    let sink = BrokenSink::default();
    let calls = Arc::clone(&sink.calls);
    let r = Receiver::new(receiver_cfg(), 2, Box::new(sink), Arc::clone(&rec) as Arc<dyn Channel>);
    let handler = r.handler().upgrade().unwrap();

    for i in 0..6u64 {
        handler.deliver(Packet::data(
            i as i32 * L as i32 + 1,
            Segment::new(block(i, L)),
            ErrorFlag::NONE,
            super::RECEIVER_ADDR,
        ));
    }
    // ACK 照常回复，但出错之后不再调用交付目标
    assert_eq!(rec.acks(), vec![1, 11, 21, 31, 41, 51]);
    assert_eq!(*calls.lock().unwrap(), vec![2]);

    assert!(matches!(r.close(), Err(RdtError::Io(_))));
    assert_eq!(*calls.lock().unwrap(), vec![2]);
}
