//! 接收端状态机
//!
//! 只接受 `seq == expected_seq` 且校验通过的报文。每次接受后回复
//! `ack = seq`；出错或序号不符时丢弃数据，若之前接受过报文就重发上一次的
//! ACK（即重复 ACK），否则保持沉默，由发送端超时重传。

use std::net::SocketAddr;

use serde::Serialize;
use tracing::debug;

use crate::config::Config;
use crate::packet::{ErrorFlag, Packet, Segment};

#[derive(Debug, Clone)]
pub struct ReceiverConfig {
    pub error_flag: ErrorFlag,
    /// ACK 的目的地址（发送端）
    pub destination: SocketAddr,
}

impl From<&Config> for ReceiverConfig {
    fn from(cfg: &Config) -> Self {
        Self {
            error_flag: cfg.ack_error_flag,
            destination: cfg.sender_addr,
        }
    }
}

/// 丢弃原因；都不是致命错误
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscardReason {
    ChecksumMismatch,
    /// 重复或乱序
    SequenceMismatch,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Accepted(Segment),
    Discarded(DiscardReason),
}

#[derive(Debug)]
pub struct Reception {
    pub verdict: Verdict,
    /// 需要回复的 ACK；`None` 表示沉默
    pub ack: Option<Packet>,
}

#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct ReceiverStats {
    pub accepted: u64,
    pub corrupted: u64,
    pub out_of_order: u64,
    pub acks_sent: u64,
}

#[derive(Debug)]
pub struct ReceiverEngine {
    cfg: ReceiverConfig,
    expected_seq: i32,
    last_ack: Option<i32>,
    stats: ReceiverStats,
}

impl ReceiverEngine {
    pub fn new(cfg: ReceiverConfig) -> Self {
        Self {
            cfg,
            expected_seq: 1,
            last_ack: None,
            stats: ReceiverStats::default(),
        }
    }

    pub fn expected_seq(&self) -> i32 {
        self.expected_seq
    }

    pub fn last_ack(&self) -> Option<i32> {
        self.last_ack
    }

    pub fn stats(&self) -> ReceiverStats {
        self.stats
    }

    pub fn on_packet(&mut self, packet: &Packet) -> Reception {
        let seq = packet.seq();

        if !packet.validity().is_clean() {
            self.stats.corrupted += 1;
            debug!(seq, last_ack = ?self.last_ack, "校验和错误，丢弃");
            return self.discard(DiscardReason::ChecksumMismatch);
        }

        if seq != self.expected_seq {
            self.stats.out_of_order += 1;
            debug!(seq, expected = self.expected_seq, "序号不符，丢弃");
            return self.discard(DiscardReason::SequenceMismatch);
        }

        let segment = packet.segment().clone();
        self.last_ack = Some(seq);
        self.expected_seq = self.expected_seq.saturating_add(segment.len() as i32);
        self.stats.accepted += 1;
        debug!(seq, next_expected = self.expected_seq, "接受数据报文");

        Reception {
            verdict: Verdict::Accepted(segment),
            ack: Some(self.make_ack(seq)),
        }
    }

    fn discard(&mut self, reason: DiscardReason) -> Reception {
        let ack = self.last_ack.map(|last| self.make_ack(last));
        Reception {
            verdict: Verdict::Discarded(reason),
            ack,
        }
    }

    fn make_ack(&mut self, ack: i32) -> Packet {
        self.stats.acks_sent += 1;
        Packet::ack(ack, self.cfg.error_flag, self.cfg.destination)
    }
}
