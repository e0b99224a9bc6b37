//! 发送端
//!
//! 自底向上：[`CongestionControl`]（cwnd / ssthresh 运算）、
//! [`OutstandingStore`]（未确认报文段表）、[`SenderEngine`]（窗口与 ACK 处理，
//! 纯状态机）、[`Sender`]（加锁、定时器、阻塞等待窗口的异步端点）。

mod congestion;
mod endpoint;
mod engine;
mod outstanding;

pub use congestion::{CongestionControl, DupAckReaction, Phase, RetransmitScope, Variant};
pub use endpoint::{Sender, SenderSnapshot};
pub use engine::{
    AckEvent, AckOutcome, Dispatch, SenderConfig, SenderEngine, SenderStats, TimeoutOutcome,
    TimerAction,
};
pub use outstanding::OutstandingStore;
