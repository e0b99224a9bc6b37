//! 不可靠信道
//!
//! 协议两端只通过 [`Channel`] 交换报文：`send` 立即返回，报文之后异步交给
//! 对端的 [`PacketHandler`]，途中可能丢失、出错或被延迟。
//! [`SimulatedLink`] 是进程内的模拟实现。

mod fault;
mod link;

pub use fault::{FaultAction, FaultRule, FaultTarget};
pub use link::{LinkStats, SimulatedLink};

use crate::packet::Packet;

/// 发送方向：把报文交给信道，不等待任何回应
pub trait Channel: Send + Sync {
    fn send(&self, packet: Packet);
}

/// 接收方向：信道把报文交给端点
pub trait PacketHandler: Send + Sync {
    fn deliver(&self, packet: Packet);
}
