//! 错误类型
//!
//! 只有会让一次传输无法继续的情况才是 [`RdtError`]。校验和错误、乱序、
//! 超时这类协议层故障由协议自身重传恢复，见 [`crate::receiver::DiscardReason`]。

use std::path::PathBuf;

use thiserror::Error;

use crate::packet::CodecError;

pub type Result<T, E = RdtError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum RdtError {
    #[error("invalid config: {0}")]
    InvalidConfig(String),

    /// 应用层交来的数据块长度与配置的 L 不一致
    #[error("block {index} has {got} units, expected {expected}")]
    BlockLength {
        index: u64,
        expected: usize,
        got: usize,
    },

    /// 应用层必须按 blockIndex 严格递增且连续地提交数据块
    #[error("block {index} out of order: expected seq {expected_seq}, got seq {got_seq}")]
    OutOfOrderBlock {
        index: u64,
        expected_seq: i64,
        got_seq: i64,
    },

    #[error("sequence space exhausted at block {0}")]
    SeqSpaceExhausted(u64),

    #[error("sender closed")]
    SenderClosed,

    #[error("malformed data file {}: {reason}", path.display())]
    DataFile { path: PathBuf, reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Codec(#[from] CodecError),
}
