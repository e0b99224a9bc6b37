//! 运行配置
//!
//! 可以从 JSON 文件加载，所有字段都有默认值，缺省即取下面 `Default` 中的值。

use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::channel::FaultRule;
use crate::error::{RdtError, Result};
use crate::packet::ErrorFlag;
use crate::sender::Variant;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// 拥塞控制变体
    pub variant: Variant,
    /// 重传定时器周期（毫秒）
    pub rto_ms: u64,
    /// 接收端每攒够多少个数据块交付一次
    pub batch_size: usize,
    /// 初始 ssthresh（单位：报文个数）
    pub init_ssthresh: u32,
    /// 每个数据块的数据单元个数 L
    pub block_len: usize,
    /// 数据报文的 eFlag
    pub data_error_flag: ErrorFlag,
    /// 确认报文的 eFlag
    pub ack_error_flag: ErrorFlag,
    pub sender_addr: SocketAddr,
    pub receiver_addr: SocketAddr,
    pub link: LinkConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            variant: Variant::Reno,
            rto_ms: 1000,
            batch_size: 20,
            init_ssthresh: 16,
            block_len: 100,
            data_error_flag: ErrorFlag::ALL,
            ack_error_flag: ErrorFlag::CORRUPT,
            sender_addr: SocketAddr::from(([127, 0, 0, 1], 9001)),
            receiver_addr: SocketAddr::from(([127, 0, 0, 1], 9002)),
            link: LinkConfig::default(),
        }
    }
}

/// 模拟信道的故障模型，两个方向共用
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkConfig {
    /// 单向固定时延（毫秒）
    pub latency_ms: u64,
    pub loss_rate: f64,
    pub corrupt_rate: f64,
    pub delay_rate: f64,
    /// 被延迟的报文额外等待 `[1, max_extra_delay_ms]` 毫秒
    pub max_extra_delay_ms: u64,
    /// 随机数种子；不填则每次运行不同
    pub seed: Option<u64>,
    /// 确定性故障脚本，先于随机故障生效
    pub script: Vec<FaultRule>,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            latency_ms: 5,
            loss_rate: 0.0,
            corrupt_rate: 0.0,
            delay_rate: 0.0,
            max_extra_delay_ms: 50,
            seed: None,
            script: Vec::new(),
        }
    }
}

impl Config {
    pub fn from_json_file(path: &Path) -> Result<Config> {
        let raw = std::fs::read_to_string(path)?;
        let cfg: Config = serde_json::from_str(&raw)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        if self.init_ssthresh < 2 {
            return Err(invalid(format!("init_ssthresh must be >= 2, got {}", self.init_ssthresh)));
        }
        if self.block_len == 0 || self.block_len > i32::MAX as usize / 2 {
            return Err(invalid(format!("block_len out of range: {}", self.block_len)));
        }
        if self.batch_size == 0 {
            return Err(invalid("batch_size must be >= 1".to_string()));
        }
        if self.rto_ms == 0 {
            return Err(invalid("rto_ms must be > 0".to_string()));
        }
        for (name, rate) in [
            ("loss_rate", self.link.loss_rate),
            ("corrupt_rate", self.link.corrupt_rate),
            ("delay_rate", self.link.delay_rate),
        ] {
            if !(0.0..=1.0).contains(&rate) {
                return Err(invalid(format!("{name} must be within [0, 1], got {rate}")));
            }
        }
        Ok(())
    }

    pub fn rto(&self) -> Duration {
        Duration::from_millis(self.rto_ms)
    }
}

fn invalid(msg: String) -> RdtError {
    RdtError::InvalidConfig(msg)
}
