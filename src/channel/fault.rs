//! 确定性故障脚本

use serde::{Deserialize, Serialize};

use crate::packet::Packet;

/// 规则匹配报文的哪个首部字段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FaultTarget {
    Seq,
    Ack,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FaultAction {
    Drop,
    Corrupt,
}

/// 对前 `times` 个匹配的报文施加 `action`，与报文的 eFlag 无关
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FaultRule {
    pub target: FaultTarget,
    pub value: i32,
    pub action: FaultAction,
    #[serde(default = "default_times")]
    pub times: u32,
}

fn default_times() -> u32 {
    1
}

impl FaultRule {
    pub fn drop_seq(seq: i32) -> Self {
        Self::once(FaultTarget::Seq, seq, FaultAction::Drop)
    }

    pub fn corrupt_seq(seq: i32) -> Self {
        Self::once(FaultTarget::Seq, seq, FaultAction::Corrupt)
    }

    pub fn drop_ack(ack: i32) -> Self {
        Self::once(FaultTarget::Ack, ack, FaultAction::Drop)
    }

    pub fn times(mut self, times: u32) -> Self {
        self.times = times;
        self
    }

    fn once(target: FaultTarget, value: i32, action: FaultAction) -> Self {
        Self {
            target,
            value,
            action,
            times: 1,
        }
    }

    pub fn matches(&self, packet: &Packet) -> bool {
        match self.target {
            FaultTarget::Seq => !packet.payload().is_empty() && packet.seq() == self.value,
            FaultTarget::Ack => packet.payload().is_empty() && packet.ack_num() == self.value,
        }
    }
}
