//! 分批交付
//!
//! 队列长度恰好达到 `batch_size` 时整批交给 sink 并清空。会话结束时
//! [`DeliveryBatcher::finish`] 把不足一批的剩余数据块也交付出去。

use serde::Serialize;
use tracing::debug;

use super::sink::DeliverySink;
use crate::error::Result;
use crate::packet::Segment;

#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct DeliveryStats {
    pub delivered_blocks: u64,
    pub batches: u64,
}

#[derive(Debug)]
pub struct DeliveryBatcher<S> {
    batch_size: usize,
    queue: Vec<Segment>,
    sink: S,
    stats: DeliveryStats,
}

impl<S: DeliverySink> DeliveryBatcher<S> {
    pub fn new(batch_size: usize, sink: S) -> Self {
        let batch_size = batch_size.max(1);
        Self {
            batch_size,
            queue: Vec::with_capacity(batch_size),
            sink,
            stats: DeliveryStats::default(),
        }
    }

    /// 追加一个已接受的数据块；返回本次是否触发了交付
    pub fn push(&mut self, block: Segment) -> Result<bool> {
        self.queue.push(block);
        if self.queue.len() < self.batch_size {
            return Ok(false);
        }
        self.flush()?;
        Ok(true)
    }

    /// 交付剩余的数据块（不足一批也交付）
    pub fn finish(&mut self) -> Result<()> {
        if self.queue.is_empty() {
            return Ok(());
        }
        self.flush()
    }

    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    pub fn stats(&self) -> DeliveryStats {
        self.stats
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    fn flush(&mut self) -> Result<()> {
        // 交付失败时保留队列，下次再试
        self.sink.deliver(&self.queue)?;
        self.stats.delivered_blocks += self.queue.len() as u64;
        self.stats.batches += 1;
        debug!(blocks = self.queue.len(), total = self.stats.delivered_blocks, "交付一批数据");
        self.queue.clear();
        Ok(())
    }
}
