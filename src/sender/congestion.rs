//! 拥塞控制（Tahoe / Reno）
//!
//! 窗口以报文个数计，`cwnd` 是实数：
//! - 慢启动：每个新 ACK `cwnd += 1`
//! - 拥塞避免：每个新 ACK `cwnd += 1 / cwnd`
//! - 第 3 个重复 ACK：`ssthresh = max(2, cwnd / 2)`，Reno 进入快速恢复
//!   （`cwnd = ssthresh + 3`），Tahoe 直接 `cwnd = 1`
//! - 超时：不区分变体，一律回到慢启动

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum Variant {
    Tahoe,
    Reno,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    SlowStart,
    CongestionAvoidance,
    FastRecovery,
}

/// 快速重传时需要重发的范围
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetransmitScope {
    /// 只重发窗口最左侧（base）的报文段
    Base,
    /// 重发整个未确认窗口
    Window,
}

/// 一个重复 ACK 引起的反应
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DupAckReaction {
    /// 计数但未到门限
    Counted(u32),
    FastRetransmit(RetransmitScope),
    /// Reno 快速恢复期间的窗口膨胀
    Inflated,
    /// Tahoe 在本轮已经快速重传过，后续重复 ACK 不再起作用
    Ignored,
}

const DUP_ACK_THRESHOLD: u32 = 3;

#[derive(Debug, Clone)]
pub struct CongestionControl {
    variant: Variant,
    cwnd: f64,
    ssthresh: u32,
    dup_acks: u32,
    fast_recovery: bool,
    // 当前这个重复的 ack 值已经触发过快速重传
    retransmit_fired: bool,
}

impl CongestionControl {
    pub fn new(variant: Variant, init_ssthresh: u32) -> Self {
        Self {
            variant,
            cwnd: 1.0,
            ssthresh: init_ssthresh.max(2),
            dup_acks: 0,
            fast_recovery: false,
            retransmit_fired: false,
        }
    }

    pub fn variant(&self) -> Variant {
        self.variant
    }

    pub fn cwnd(&self) -> f64 {
        self.cwnd
    }

    pub fn ssthresh(&self) -> u32 {
        self.ssthresh
    }

    pub fn dup_acks(&self) -> u32 {
        self.dup_acks
    }

    pub fn in_fast_recovery(&self) -> bool {
        self.fast_recovery
    }

    /// 当前允许在途的报文个数：`floor(cwnd)`
    pub fn window_packets(&self) -> u32 {
        (self.cwnd.floor() as u32).max(1)
    }

    pub fn phase(&self) -> Phase {
        if self.fast_recovery {
            Phase::FastRecovery
        } else if self.cwnd < self.ssthresh as f64 {
            Phase::SlowStart
        } else {
            Phase::CongestionAvoidance
        }
    }

    /// 收到推进 base 的新 ACK
    pub fn on_new_ack(&mut self) {
        if self.fast_recovery {
            // 退出快速恢复：窗口收缩回 ssthresh
            self.cwnd = self.ssthresh as f64;
            self.fast_recovery = false;
        } else if self.cwnd < self.ssthresh as f64 {
            self.cwnd += 1.0;
        } else {
            self.cwnd += 1.0 / self.cwnd;
        }
        self.dup_acks = 0;
        self.retransmit_fired = false;
    }

    /// 收到与上一次相同的 ACK
    pub fn on_dup_ack(&mut self) -> DupAckReaction {
        if self.variant == Variant::Tahoe && self.retransmit_fired {
            return DupAckReaction::Ignored;
        }

        self.dup_acks = self.dup_acks.saturating_add(1);
        if self.dup_acks == DUP_ACK_THRESHOLD {
            self.ssthresh = self.halved();
            self.retransmit_fired = true;
            return match self.variant {
                Variant::Reno => {
                    self.cwnd = (self.ssthresh + 3) as f64;
                    self.fast_recovery = true;
                    DupAckReaction::FastRetransmit(RetransmitScope::Base)
                }
                Variant::Tahoe => {
                    self.cwnd = 1.0;
                    self.dup_acks = 0;
                    DupAckReaction::FastRetransmit(RetransmitScope::Window)
                }
            };
        }

        if self.dup_acks > DUP_ACK_THRESHOLD && self.fast_recovery {
            self.cwnd += 1.0;
            return DupAckReaction::Inflated;
        }
        DupAckReaction::Counted(self.dup_acks)
    }

    pub fn on_timeout(&mut self) {
        self.ssthresh = self.halved();
        self.cwnd = 1.0;
        self.dup_acks = 0;
        self.fast_recovery = false;
        self.retransmit_fired = false;
    }

    fn halved(&self) -> u32 {
        ((self.cwnd / 2.0).floor() as u32).max(2)
    }
}
