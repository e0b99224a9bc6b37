//! 发送端状态机
//!
//! [`SenderEngine`] 只维护状态：窗口（`base` / `next_seq`）、未确认报文段表、
//! 拥塞控制。它不做 I/O，也不持有定时器；每个操作返回需要发出的报文和
//! 定时器应当如何调整，由调用方（[`crate::sender::Sender`]）执行。
//!
//! ```text
//!   base                   next_seq       base + floor(cwnd) * L
//!    │                        │                     │
//! ───┼────────────────────────┼─────────────────────┼──────▶ seq
//!    │ <── 已发送、未确认 ──▶ │ <──── 可发送 ─────▶ │
//! ```

use std::net::SocketAddr;

use serde::Serialize;
use tracing::{debug, info, trace};

use super::congestion::{CongestionControl, DupAckReaction, Phase, RetransmitScope, Variant};
use super::outstanding::OutstandingStore;
use crate::config::Config;
use crate::error::{RdtError, Result};
use crate::packet::{ErrorFlag, Packet, Segment};

#[derive(Debug, Clone)]
pub struct SenderConfig {
    pub block_len: usize,
    pub variant: Variant,
    pub init_ssthresh: u32,
    pub error_flag: ErrorFlag,
    pub destination: SocketAddr,
}

impl From<&Config> for SenderConfig {
    fn from(cfg: &Config) -> Self {
        Self {
            block_len: cfg.block_len,
            variant: cfg.variant,
            init_ssthresh: cfg.init_ssthresh,
            error_flag: cfg.data_error_flag,
            destination: cfg.receiver_addr,
        }
    }
}

/// 定时器应当如何调整
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerAction {
    Keep,
    /// 启动或用新的定时器替换当前定时器
    Rearm,
    Cancel,
}

/// 一个新数据块对应的发送动作
#[derive(Debug)]
pub struct Dispatch {
    pub packet: Packet,
    pub timer: TimerAction,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AckEvent {
    /// 新的累计确认，`acked` 个报文段离开窗口
    Advanced { acked: usize },
    Duplicate { count: u32 },
    FastRetransmit,
    Inflated,
    /// 过期、重复但已无在途数据、或者确认了从未发送的序号
    Stale,
}

#[derive(Debug)]
pub struct AckOutcome {
    pub event: AckEvent,
    pub retransmit: Vec<Packet>,
    pub timer: TimerAction,
}

#[derive(Debug)]
pub struct TimeoutOutcome {
    pub retransmit: Vec<Packet>,
    pub timer: TimerAction,
}

#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct SenderStats {
    /// 首次发送的数据报文
    pub transmissions: u64,
    pub retransmissions: u64,
    pub fast_retransmits: u64,
    pub timeouts: u64,
    pub dup_acks: u64,
    pub corrupted_acks: u64,
}

#[derive(Debug)]
pub struct SenderEngine {
    cfg: SenderConfig,
    base: i32,
    next_seq: i32,
    last_ack_recv: Option<i32>,
    store: OutstandingStore,
    cc: CongestionControl,
    stats: SenderStats,
}

impl SenderEngine {
    pub fn new(cfg: SenderConfig) -> Self {
        let cc = CongestionControl::new(cfg.variant, cfg.init_ssthresh);
        Self {
            cfg,
            base: 1,
            next_seq: 1,
            last_ack_recv: None,
            store: OutstandingStore::default(),
            cc,
            stats: SenderStats::default(),
        }
    }

    pub fn base(&self) -> i32 {
        self.base
    }

    pub fn next_seq(&self) -> i32 {
        self.next_seq
    }

    pub fn last_ack_recv(&self) -> Option<i32> {
        self.last_ack_recv
    }

    pub fn congestion(&self) -> &CongestionControl {
        &self.cc
    }

    pub fn stats(&self) -> SenderStats {
        self.stats
    }

    pub fn outstanding(&self) -> &OutstandingStore {
        &self.store
    }

    pub fn is_idle(&self) -> bool {
        self.store.is_empty()
    }

    /// 窗口右边界（不含）：`base + floor(cwnd) * L`
    pub fn window_end(&self) -> i64 {
        self.base as i64 + self.cc.window_packets() as i64 * self.cfg.block_len as i64
    }

    /// 发送路径在 `next_seq >= window_end` 时必须等待
    pub fn can_send(&self) -> bool {
        (self.next_seq as i64) < self.window_end()
    }

    /// 为第 `block_index` 个数据块生成报文并放入未确认表
    pub fn prepare(&mut self, block_index: u64, data: Vec<i32>) -> Result<Dispatch> {
        let len = self.cfg.block_len;
        if data.len() != len {
            return Err(RdtError::BlockLength {
                index: block_index,
                expected: len,
                got: data.len(),
            });
        }

        let seq = block_index
            .checked_mul(len as u64)
            .and_then(|s| s.checked_add(1))
            .filter(|s| s.saturating_add(len as u64) <= i32::MAX as u64)
            .ok_or(RdtError::SeqSpaceExhausted(block_index))? as i32;
        if seq != self.next_seq {
            return Err(RdtError::OutOfOrderBlock {
                index: block_index,
                expected_seq: self.next_seq as i64,
                got_seq: seq as i64,
            });
        }
        debug_assert!(self.can_send(), "prepare called on a full window");

        let packet = Packet::data(seq, Segment::new(data), self.cfg.error_flag, self.cfg.destination);
        let was_empty = self.store.is_empty();
        self.store.insert(packet.clone());
        self.next_seq = seq + len as i32;
        self.stats.transmissions += 1;

        debug!(seq, cwnd = self.cc.cwnd(), in_flight = self.store.len(), "发送数据报文");
        let timer = if was_empty {
            TimerAction::Rearm
        } else {
            TimerAction::Keep
        };
        Ok(Dispatch { packet, timer })
    }

    /// 处理一个（已通过校验的）累计确认
    pub fn on_ack(&mut self, ack: i32) -> AckOutcome {
        if ack >= self.base && self.store.contains(ack) {
            return self.on_new_ack(ack);
        }

        if Some(ack) == self.last_ack_recv && !self.store.is_empty() {
            self.stats.dup_acks += 1;
            return self.on_dup_ack(ack);
        }

        trace!(ack, base = self.base, "忽略过期 ACK");
        AckOutcome {
            event: AckEvent::Stale,
            retransmit: Vec::new(),
            timer: TimerAction::Keep,
        }
    }

    fn on_new_ack(&mut self, ack: i32) -> AckOutcome {
        let before = self.cc.phase();
        self.cc.on_new_ack();
        let acked = self.store.purge_through(ack);
        self.base = ack + self.cfg.block_len as i32;
        self.last_ack_recv = Some(ack);
        self.log_phase_change(before);

        debug!(
            ack,
            acked,
            base = self.base,
            cwnd = self.cc.cwnd(),
            ssthresh = self.cc.ssthresh(),
            "窗口前移"
        );
        let timer = if self.store.is_empty() {
            TimerAction::Cancel
        } else {
            TimerAction::Rearm
        };
        AckOutcome {
            event: AckEvent::Advanced { acked },
            retransmit: Vec::new(),
            timer,
        }
    }

    fn on_dup_ack(&mut self, ack: i32) -> AckOutcome {
        let before = self.cc.phase();
        let reaction = self.cc.on_dup_ack();
        self.log_phase_change(before);

        let (event, retransmit, timer) = match reaction {
            DupAckReaction::Counted(count) => {
                debug!(ack, count, "重复 ACK");
                (AckEvent::Duplicate { count }, Vec::new(), TimerAction::Keep)
            }
            DupAckReaction::FastRetransmit(scope) => {
                let (packets, timer) = match scope {
                    RetransmitScope::Base => (
                        self.store.first().cloned().into_iter().collect(),
                        TimerAction::Keep,
                    ),
                    RetransmitScope::Window => (
                        self.store.iter().cloned().collect::<Vec<_>>(),
                        TimerAction::Rearm,
                    ),
                };
                self.stats.fast_retransmits += 1;
                self.stats.retransmissions += packets.len() as u64;
                info!(
                    ack,
                    variant = ?self.cc.variant(),
                    resent = packets.len(),
                    cwnd = self.cc.cwnd(),
                    ssthresh = self.cc.ssthresh(),
                    "3 个重复 ACK，快速重传"
                );
                (AckEvent::FastRetransmit, packets, timer)
            }
            DupAckReaction::Inflated => {
                debug!(ack, cwnd = self.cc.cwnd(), "快速恢复：窗口膨胀");
                (AckEvent::Inflated, Vec::new(), TimerAction::Keep)
            }
            DupAckReaction::Ignored => {
                trace!(ack, "Tahoe 已快速重传，忽略重复 ACK");
                (
                    AckEvent::Duplicate {
                        count: self.cc.dup_acks(),
                    },
                    Vec::new(),
                    TimerAction::Keep,
                )
            }
        };
        AckOutcome {
            event,
            retransmit,
            timer,
        }
    }

    /// 重传定时器到期：回到慢启动并从 base 起重发整个窗口
    pub fn on_timeout(&mut self) -> TimeoutOutcome {
        if self.store.is_empty() {
            return TimeoutOutcome {
                retransmit: Vec::new(),
                timer: TimerAction::Cancel,
            };
        }

        self.cc.on_timeout();
        let retransmit: Vec<Packet> = self.store.iter().cloned().collect();
        self.stats.timeouts += 1;
        self.stats.retransmissions += retransmit.len() as u64;
        info!(
            base = self.base,
            resent = retransmit.len(),
            ssthresh = self.cc.ssthresh(),
            "超时，重传整个窗口"
        );
        TimeoutOutcome {
            retransmit,
            timer: TimerAction::Rearm,
        }
    }

    /// ACK 报文校验失败
    pub fn record_corrupted_ack(&mut self) {
        self.stats.corrupted_acks += 1;
    }

    fn log_phase_change(&self, before: Phase) {
        let after = self.cc.phase();
        if after != before {
            info!(from = ?before, to = ?after, cwnd = self.cc.cwnd(), ssthresh = self.cc.ssthresh(), "拥塞状态变化");
        }
    }
}
