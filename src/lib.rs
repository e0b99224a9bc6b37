//! 基于 Go-Back-N 的可靠传输，带 Tahoe / Reno 拥塞控制。
//!
//! 发送端 [`sender::Sender`] 与接收端 [`receiver::Receiver`] 只通过
//! [`channel::Channel`] 交换报文；[`transfer::Transfer`] 把两端、两条模拟链路
//! 与应用层数据源连成一次完整的传输。

pub mod app;
pub mod channel;
pub mod config;
pub mod error;
pub mod packet;
pub mod receiver;
pub mod sender;
pub mod timer;
pub mod transfer;

pub use error::{RdtError, Result};

#[cfg(test)]
mod test;
