//! 接收端点
//!
//! 信道回调与关闭操作共用一把锁；交付失败只记录第一个错误，之后不再交付，
//! 在 [`Receiver::close`] 时返回该错误。

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use serde::Serialize;
use tracing::{debug, error};

use super::batcher::{DeliveryBatcher, DeliveryStats};
use super::engine::{ReceiverConfig, ReceiverEngine, ReceiverStats, Verdict};
use super::sink::DeliverySink;
use crate::channel::{Channel, PacketHandler};
use crate::error::{RdtError, Result};
use crate::packet::Packet;

/// 关闭时的汇总
#[derive(Debug, Clone, Copy, Serialize)]
pub struct ReceiverSummary {
    pub expected_seq: i32,
    pub last_ack: Option<i32>,
    pub stats: ReceiverStats,
    pub delivery: DeliveryStats,
}

struct State {
    engine: ReceiverEngine,
    batcher: DeliveryBatcher<Box<dyn DeliverySink>>,
    sink_error: Option<RdtError>,
    closed: bool,
}

struct Shared {
    state: Mutex<State>,
    channel: Arc<dyn Channel>,
}

pub struct Receiver {
    shared: Arc<Shared>,
}

impl Receiver {
    /// `channel` 是回复 ACK 用的反向信道
    pub fn new(
        cfg: ReceiverConfig,
        batch_size: usize,
        sink: Box<dyn DeliverySink>,
        channel: Arc<dyn Channel>,
    ) -> Self {
        let state = State {
            engine: ReceiverEngine::new(cfg),
            batcher: DeliveryBatcher::new(batch_size, sink),
            sink_error: None,
            closed: false,
        };
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(state),
                channel,
            }),
        }
    }

    /// 交给数据方向信道的回调句柄
    pub fn handler(&self) -> Weak<dyn PacketHandler> {
        let weak: Weak<dyn PacketHandler> = Arc::downgrade(&self.shared) as Weak<Shared>;
        weak
    }

    /// 停止接收，交付剩余数据块
    pub fn close(&self) -> Result<ReceiverSummary> {
        let mut st = self.shared.lock();
        st.closed = true;
        if let Some(e) = st.sink_error.take() {
            return Err(e);
        }
        st.batcher.finish()?;
        Ok(summary(&st))
    }

    pub fn summary(&self) -> ReceiverSummary {
        summary(&self.shared.lock())
    }
}

fn summary(st: &State) -> ReceiverSummary {
    ReceiverSummary {
        expected_seq: st.engine.expected_seq(),
        last_ack: st.engine.last_ack(),
        stats: st.engine.stats(),
        delivery: st.batcher.stats(),
    }
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl PacketHandler for Shared {
    fn deliver(&self, packet: Packet) {
        let mut st = self.lock();
        if st.closed {
            debug!(seq = packet.seq(), "接收端已关闭，丢弃");
            return;
        }

        let reception = st.engine.on_packet(&packet);
        if let Some(ack) = reception.ack {
            debug!(ack = ack.ack_num(), "回复 ACK");
            self.channel.send(ack);
        }

        if let Verdict::Accepted(block) = reception.verdict {
            // 交付出错后不再写入交付目标
            if st.sink_error.is_some() {
                debug!(seq = packet.seq(), "交付已失败，丢弃数据块");
                return;
            }
            if let Err(e) = st.batcher.push(block) {
                error!(error = %e, "交付数据失败");
                st.sink_error = Some(e);
            }
        }
    }
}
