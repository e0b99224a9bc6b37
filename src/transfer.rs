//! 一次完整的传输
//!
//! ```text
//!            data link (seq)
//!   Sender ───────────────────▶ Receiver ──▶ DeliveryBatcher ──▶ DeliverySink
//!      ▲                           │
//!      └───────────────────────────┘
//!            ack link (ack)
//! ```

use std::sync::Arc;

use serde::Serialize;
use tokio::time::Instant;
use tracing::{info, warn};

use crate::app::BlockSource;
use crate::channel::{Channel, LinkStats, SimulatedLink};
use crate::config::Config;
use crate::error::Result;
use crate::receiver::{DeliverySink, Receiver, ReceiverConfig, ReceiverSummary};
use crate::sender::{Sender, SenderConfig, SenderSnapshot, Variant};

const DATA_LINK_SALT: u64 = 0x0000_0000_d47a_0001;
const ACK_LINK_SALT: u64 = 0x0000_0000_0ac4_0002;

#[derive(Debug, Clone, Serialize)]
pub struct TransferReport {
    pub variant: Variant,
    pub blocks_sent: u64,
    pub blocks_delivered: u64,
    pub batches_flushed: u64,
    pub sender: SenderSnapshot,
    pub receiver: ReceiverSummary,
    pub data_link: LinkStats,
    pub ack_link: LinkStats,
    pub elapsed_ms: u64,
}

#[derive(Debug, Clone)]
pub struct Transfer {
    cfg: Config,
}

impl Transfer {
    pub fn new(cfg: Config) -> Result<Self> {
        cfg.validate()?;
        Ok(Self { cfg })
    }

    pub fn config(&self) -> &Config {
        &self.cfg
    }

    /// 把 `source` 的全部数据块可靠地送到 `sink`，需要在 tokio 运行时里调用
    pub async fn run(&self, source: &BlockSource, sink: Box<dyn DeliverySink>) -> Result<TransferReport> {
        let cfg = &self.cfg;
        let started = Instant::now();

        let data_link = SimulatedLink::new("data", &cfg.link, DATA_LINK_SALT);
        let ack_link = SimulatedLink::new("ack", &cfg.link, ACK_LINK_SALT);

        let sender = Sender::new(
            SenderConfig::from(cfg),
            cfg.rto(),
            Arc::clone(&data_link) as Arc<dyn Channel>,
        );
        let receiver = Receiver::new(
            ReceiverConfig::from(cfg),
            cfg.batch_size,
            sink,
            Arc::clone(&ack_link) as Arc<dyn Channel>,
        );
        data_link.connect(receiver.handler());
        ack_link.connect(sender.handler());

        info!(
            variant = ?cfg.variant,
            blocks = source.len(),
            block_len = cfg.block_len,
            rto_ms = cfg.rto_ms,
            "开始传输"
        );

        let mut blocks_sent = 0u64;
        let pumped = async {
            for (index, block) in source.blocks() {
                sender.send(index, block).await?;
                blocks_sent += 1;
            }
            sender.wait_idle().await
        }
        .await;

        let snapshot = sender.close();
        if let Err(e) = pumped {
            warn!(error = %e, blocks_sent, "传输中止");
            // 已接受的数据仍然交付出去
            if let Err(flush) = receiver.close() {
                warn!(error = %flush, "交付剩余数据失败");
            }
            return Err(e);
        }
        let summary = receiver.close()?;

        let report = TransferReport {
            variant: cfg.variant,
            blocks_sent,
            blocks_delivered: summary.delivery.delivered_blocks,
            batches_flushed: summary.delivery.batches,
            sender: snapshot,
            receiver: summary,
            data_link: data_link.stats(),
            ack_link: ack_link.stats(),
            elapsed_ms: started.elapsed().as_millis() as u64,
        };
        info!(
            blocks = report.blocks_delivered,
            retransmissions = report.sender.stats.retransmissions,
            timeouts = report.sender.stats.timeouts,
            fast_retransmits = report.sender.stats.fast_retransmits,
            elapsed_ms = report.elapsed_ms,
            "传输完成"
        );
        Ok(report)
    }
}
