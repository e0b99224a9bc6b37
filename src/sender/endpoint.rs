//! 发送端点
//!
//! 把 [`SenderEngine`] 接到信道和定时器上。应用任务调用 [`Sender::send`]，
//! 窗口满时在 [`Notify`] 上等待；ACK 回调和定时器回调在各自的任务里执行，
//! 三者共用一把 [`Mutex`]，临界区内不 await。

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use serde::Serialize;
use tokio::sync::Notify;
use tracing::{debug, trace};

use super::congestion::{Phase, Variant};
use super::engine::{AckEvent, SenderConfig, SenderEngine, SenderStats, TimerAction};
use crate::channel::{Channel, PacketHandler};
use crate::error::{RdtError, Result};
use crate::packet::Packet;
use crate::timer::RetransmitTimer;

/// 发送端状态快照
#[derive(Debug, Clone, Copy, Serialize)]
pub struct SenderSnapshot {
    pub variant: Variant,
    pub cwnd: f64,
    pub ssthresh: u32,
    pub base: i32,
    pub next_seq: i32,
    pub in_flight: usize,
    pub phase: Phase,
    pub stats: SenderStats,
}

struct State {
    engine: SenderEngine,
    timer: Option<RetransmitTimer>,
    epoch: u64,
    closed: bool,
}

struct Shared {
    state: Mutex<State>,
    /// 窗口前移、窗口膨胀或关闭时唤醒所有等待者
    window: Notify,
    channel: Arc<dyn Channel>,
    rto: Duration,
    me: Weak<Shared>,
}

pub struct Sender {
    shared: Arc<Shared>,
}

impl Sender {
    pub fn new(cfg: SenderConfig, rto: Duration, channel: Arc<dyn Channel>) -> Self {
        let shared = Arc::new_cyclic(|me| Shared {
            state: Mutex::new(State {
                engine: SenderEngine::new(cfg),
                timer: None,
                epoch: 0,
                closed: false,
            }),
            window: Notify::new(),
            channel,
            rto,
            me: me.clone(),
        });
        Self { shared }
    }

    /// 交给 ACK 方向信道的回调句柄
    pub fn handler(&self) -> Weak<dyn PacketHandler> {
        let weak: Weak<dyn PacketHandler> = Arc::downgrade(&self.shared) as Weak<Shared>;
        weak
    }

    /// 发送第 `block_index` 个数据块；窗口已满时等待，直到窗口前移
    pub async fn send(&self, block_index: u64, data: Vec<i32>) -> Result<()> {
        let mut data = Some(data);
        loop {
            // 先登记等待再检查条件，避免漏掉检查与等待之间的唤醒
            let notified = self.shared.window.notified();
            {
                let mut st = self.shared.lock();
                if st.closed {
                    return Err(RdtError::SenderClosed);
                }
                if st.engine.can_send() {
                    let Some(data) = data.take() else {
                        return Err(RdtError::SenderClosed);
                    };
                    let dispatch = st.engine.prepare(block_index, data)?;
                    self.shared.channel.send(dispatch.packet);
                    self.shared.apply_timer(&mut st, dispatch.timer);
                    return Ok(());
                }
                trace!(
                    block_index,
                    next_seq = st.engine.next_seq(),
                    window_end = st.engine.window_end(),
                    "窗口已满，等待"
                );
            }
            notified.await;
        }
    }

    /// 等待所有已发送的数据块被确认
    pub async fn wait_idle(&self) -> Result<()> {
        loop {
            let notified = self.shared.window.notified();
            {
                let st = self.shared.lock();
                if st.engine.is_idle() {
                    return Ok(());
                }
                if st.closed {
                    return Err(RdtError::SenderClosed);
                }
            }
            notified.await;
        }
    }

    /// 停止定时器并唤醒所有等待者；之后的 `send` 返回 [`RdtError::SenderClosed`]
    pub fn close(&self) -> SenderSnapshot {
        let snapshot = {
            let mut st = self.shared.lock();
            st.closed = true;
            st.epoch += 1;
            if let Some(timer) = st.timer.take() {
                timer.cancel();
            }
            snapshot(&st)
        };
        self.shared.window.notify_waiters();
        snapshot
    }

    pub fn snapshot(&self) -> SenderSnapshot {
        snapshot(&self.shared.lock())
    }
}

impl Drop for Sender {
    fn drop(&mut self) {
        let mut st = self.shared.lock();
        st.closed = true;
        st.timer = None;
    }
}

fn snapshot(st: &State) -> SenderSnapshot {
    let cc = st.engine.congestion();
    SenderSnapshot {
        variant: cc.variant(),
        cwnd: cc.cwnd(),
        ssthresh: cc.ssthresh(),
        base: st.engine.base(),
        next_seq: st.engine.next_seq(),
        in_flight: st.engine.outstanding().len(),
        phase: cc.phase(),
        stats: st.engine.stats(),
    }
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn apply_timer(&self, st: &mut State, action: TimerAction) {
        match action {
            TimerAction::Keep => {}
            TimerAction::Cancel => {
                st.epoch += 1;
                if let Some(timer) = st.timer.take() {
                    timer.cancel();
                }
            }
            TimerAction::Rearm => {
                st.epoch += 1;
                let me = self.me.clone();
                let timer = RetransmitTimer::schedule(self.rto, st.epoch, move |epoch| {
                    if let Some(shared) = me.upgrade() {
                        shared.on_timer_fired(epoch);
                    }
                });
                // 替换即取消旧定时器
                st.timer = Some(timer);
            }
        }
    }

    fn on_timer_fired(&self, epoch: u64) {
        let mut st = self.lock();
        if st.closed || st.epoch != epoch {
            trace!(epoch, current = st.epoch, "过期的定时器");
            return;
        }
        let outcome = st.engine.on_timeout();
        self.retransmit(outcome.retransmit);
        self.apply_timer(&mut st, outcome.timer);
    }

    fn retransmit(&self, packets: Vec<Packet>) {
        for packet in packets {
            debug!(seq = packet.seq(), "重传");
            self.channel.send(packet);
        }
    }
}

impl PacketHandler for Shared {
    fn deliver(&self, packet: Packet) {
        let mut st = self.lock();
        if st.closed {
            return;
        }
        if !packet.validity().is_clean() {
            st.engine.record_corrupted_ack();
            debug!(ack = packet.ack_num(), "ACK 校验和错误，忽略");
            return;
        }

        let outcome = st.engine.on_ack(packet.ack_num());
        self.retransmit(outcome.retransmit);
        self.apply_timer(&mut st, outcome.timer);
        drop(st);

        if matches!(outcome.event, AckEvent::Advanced { .. } | AckEvent::Inflated) {
            self.window.notify_waiters();
        }
    }
}
