//! 重传定时器
//!
//! 一个周期性、可取消的 tokio 任务：第一次在一个周期后触发，之后每个周期
//! 触发一次，直到被取消或丢弃。每次重新调度都创建新的 [`RetransmitTimer`]
//! 替换旧的，不复用。
//!
//! 被替换的任务可能已经醒来、正在等锁，`abort` 拦不住它。因此每次调度都带
//! 一个 epoch，触发回调需要自己核对 epoch 是否仍是当前值。

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};

#[derive(Debug)]
pub struct RetransmitTimer {
    epoch: u64,
    handle: JoinHandle<()>,
}

impl RetransmitTimer {
    /// 在当前 tokio 运行时里启动定时器，每次到期调用 `on_fire(epoch)`
    pub fn schedule<F>(interval: Duration, epoch: u64, on_fire: F) -> Self
    where
        F: Fn(u64) + Send + 'static,
    {
        let handle = tokio::spawn(async move {
            let mut ticker = time::interval_at(Instant::now() + interval, interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                on_fire(epoch);
            }
        });
        Self { epoch, handle }
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn cancel(self) {
        self.handle.abort();
    }
}

impl Drop for RetransmitTimer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
