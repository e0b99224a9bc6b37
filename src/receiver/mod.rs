//! 接收端
//!
//! - [`ReceiverEngine`]：期望序号状态机，决定接受 / 丢弃以及回复哪个 ACK
//! - [`DeliveryBatcher`]：缓存已接受的数据块，攒够一批交给 [`DeliverySink`]
//! - [`Receiver`]：加锁后的异步端点，挂在信道上

mod batcher;
mod endpoint;
mod engine;
mod sink;

pub use batcher::{DeliveryBatcher, DeliveryStats};
pub use endpoint::{Receiver, ReceiverSummary};
pub use engine::{DiscardReason, Reception, ReceiverConfig, ReceiverEngine, ReceiverStats, Verdict};
pub use sink::{DeliverySink, DiscardSink, FileSink, MemorySink};
