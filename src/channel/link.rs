//! 进程内模拟链路（单向）
//!
//! 未被延迟的报文在固定时延后按 FIFO 交付（一个 worker 任务依次处理）；
//! 被延迟的报文另起任务，额外等待一段随机时间，因此可能被后发的报文超过。

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, OnceLock, PoisonError, Weak};
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use tokio::sync::mpsc;
use tokio::time::{self, Instant};
use tracing::{debug, trace, warn};

use super::fault::{FaultAction, FaultRule};
use super::{Channel, PacketHandler};
use crate::config::LinkConfig;
use crate::packet::{HEADER_LEN, Packet};

/// 链路统计
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct LinkStats {
    pub sent: u64,
    pub delivered: u64,
    pub dropped: u64,
    pub corrupted: u64,
    pub delayed: u64,
}

#[derive(Debug, Default)]
struct Counters {
    sent: AtomicU64,
    delivered: AtomicU64,
    dropped: AtomicU64,
    corrupted: AtomicU64,
    delayed: AtomicU64,
}

struct ScriptedFault {
    rule: FaultRule,
    remaining: u32,
}

struct LinkState {
    rng: StdRng,
    script: Vec<ScriptedFault>,
}

enum Fate {
    Drop,
    Deliver { packet: Packet, extra: Option<Duration> },
}

pub struct SimulatedLink {
    name: &'static str,
    cfg: LinkConfig,
    latency: Duration,
    state: Mutex<LinkState>,
    handler: OnceLock<Weak<dyn PacketHandler>>,
    fifo: mpsc::UnboundedSender<(Instant, Packet)>,
    me: Weak<SimulatedLink>,
    counters: Counters,
}

impl SimulatedLink {
    /// 创建链路并在当前 tokio 运行时里启动交付任务。
    ///
    /// 两个方向共用一份 [`LinkConfig`] 时，用 `seed_salt` 区分各自的随机数序列。
    pub fn new(name: &'static str, cfg: &LinkConfig, seed_salt: u64) -> Arc<Self> {
        let rng = match cfg.seed {
            Some(seed) => StdRng::seed_from_u64(seed ^ seed_salt),
            None => StdRng::from_os_rng(),
        };
        let script = cfg
            .script
            .iter()
            .cloned()
            .map(|rule| ScriptedFault {
                remaining: rule.times,
                rule,
            })
            .collect();

        let (fifo, rx) = mpsc::unbounded_channel();
        Arc::new_cyclic(|me: &Weak<SimulatedLink>| {
            tokio::spawn(fifo_worker(rx, me.clone()));
            SimulatedLink {
                name,
                cfg: cfg.clone(),
                latency: Duration::from_millis(cfg.latency_ms),
                state: Mutex::new(LinkState { rng, script }),
                handler: OnceLock::new(),
                fifo,
                me: me.clone(),
                counters: Counters::default(),
            }
        })
    }

    /// 设置接收端；只能设置一次
    pub fn connect(&self, handler: Weak<dyn PacketHandler>) {
        if self.handler.set(handler).is_err() {
            warn!(link = self.name, "链路已连接，忽略重复的 connect");
        }
    }

    pub fn stats(&self) -> LinkStats {
        let c = &self.counters;
        LinkStats {
            sent: c.sent.load(Ordering::Relaxed),
            delivered: c.delivered.load(Ordering::Relaxed),
            dropped: c.dropped.load(Ordering::Relaxed),
            corrupted: c.corrupted.load(Ordering::Relaxed),
            delayed: c.delayed.load(Ordering::Relaxed),
        }
    }

    fn decide(&self, packet: Packet) -> Fate {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let LinkState { rng, script } = &mut *state;

        // 脚本优先
        if let Some(fault) = script
            .iter_mut()
            .find(|f| f.remaining > 0 && f.rule.matches(&packet))
        {
            fault.remaining -= 1;
            return match fault.rule.action {
                FaultAction::Drop => Fate::Drop,
                FaultAction::Corrupt => self.corrupt(packet, rng),
            };
        }

        let flag = packet.header().error_flag;
        if flag.loses() && rng.random_bool(self.cfg.loss_rate) {
            return Fate::Drop;
        }
        let extra = (flag.delays() && rng.random_bool(self.cfg.delay_rate))
            .then(|| Duration::from_millis(rng.random_range(1..=self.cfg.max_extra_delay_ms.max(1))));
        if flag.corrupts() && rng.random_bool(self.cfg.corrupt_rate) {
            return match self.corrupt(packet, rng) {
                Fate::Deliver { packet, .. } => Fate::Deliver { packet, extra },
                Fate::Drop => Fate::Drop,
            };
        }
        Fate::Deliver { packet, extra }
    }

    /// 在编码后的字节里翻转一位再解码，得到一个新报文；eFlag 与保留字段不动
    fn corrupt(&self, packet: Packet, rng: &mut StdRng) -> Fate {
        let mut raw = packet.encode().to_vec();
        let mut idx = rng.random_range(0..raw.len() - 2);
        if idx >= HEADER_LEN - 2 {
            idx += 2;
        }
        raw[idx] ^= 1u8 << rng.random_range(0..8u32);
        self.counters.corrupted.fetch_add(1, Ordering::Relaxed);

        match Packet::decode(&raw, packet.destination()) {
            Ok(packet) => Fate::Deliver { packet, extra: None },
            Err(e) => {
                warn!(link = self.name, error = %e, "损坏后的报文无法解码，按丢失处理");
                Fate::Drop
            }
        }
    }

    fn hand_over(&self, packet: Packet) {
        let Some(handler) = self.handler.get().and_then(Weak::upgrade) else {
            trace!(link = self.name, seq = packet.seq(), "接收端不存在，丢弃");
            return;
        };
        self.counters.delivered.fetch_add(1, Ordering::Relaxed);
        handler.deliver(packet);
    }
}

impl Channel for SimulatedLink {
    fn send(&self, packet: Packet) {
        self.counters.sent.fetch_add(1, Ordering::Relaxed);
        let seq = packet.seq();
        let ack = packet.ack_num();

        match self.decide(packet) {
            Fate::Drop => {
                self.counters.dropped.fetch_add(1, Ordering::Relaxed);
                debug!(link = self.name, seq, ack, "信道丢包");
            }
            Fate::Deliver {
                packet,
                extra: Some(extra),
            } => {
                self.counters.delayed.fetch_add(1, Ordering::Relaxed);
                debug!(link = self.name, seq, ack, extra_ms = extra.as_millis() as u64, "信道延迟");
                let me = self.me.clone();
                let wait = self.latency + extra;
                tokio::spawn(async move {
                    time::sleep(wait).await;
                    if let Some(link) = me.upgrade() {
                        link.hand_over(packet);
                    }
                });
            }
            Fate::Deliver { packet, extra: None } => {
                let due = Instant::now() + self.latency;
                if self.fifo.send((due, packet)).is_err() {
                    warn!(link = self.name, "交付任务已退出");
                }
            }
        }
    }
}

async fn fifo_worker(mut rx: mpsc::UnboundedReceiver<(Instant, Packet)>, link: Weak<SimulatedLink>) {
    while let Some((due, packet)) = rx.recv().await {
        time::sleep_until(due).await;
        let Some(strong) = link.upgrade() else {
            break;
        };
        strong.hand_over(packet);
    }
}
