//! 报文首部

use serde::{Deserialize, Serialize};

/// 差错模拟标志（eFlag），只由信道读取，协议逻辑不关心。
///
/// | 值 | 信道可以施加的故障 |
/// |----|--------------------|
/// | 0  | 无                 |
/// | 1  | 出错               |
/// | 2  | 丢包               |
/// | 3  | 延迟               |
/// | 4  | 出错 / 丢包        |
/// | 5  | 出错 / 延迟        |
/// | 6  | 丢包 / 延迟        |
/// | 7  | 出错 / 丢包 / 延迟 |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct ErrorFlag(u8);

impl ErrorFlag {
    pub const NONE: ErrorFlag = ErrorFlag(0);
    pub const CORRUPT: ErrorFlag = ErrorFlag(1);
    pub const LOSS: ErrorFlag = ErrorFlag(2);
    pub const DELAY: ErrorFlag = ErrorFlag(3);
    pub const ALL: ErrorFlag = ErrorFlag(7);

    pub fn new(raw: u8) -> Option<Self> {
        (raw <= 7).then_some(ErrorFlag(raw))
    }

    pub fn raw(self) -> u8 {
        self.0
    }

    pub fn corrupts(self) -> bool {
        matches!(self.0, 1 | 4 | 5 | 7)
    }

    pub fn loses(self) -> bool {
        matches!(self.0, 2 | 4 | 6 | 7)
    }

    pub fn delays(self) -> bool {
        matches!(self.0, 3 | 5 | 6 | 7)
    }
}

impl TryFrom<u8> for ErrorFlag {
    type Error = String;

    fn try_from(raw: u8) -> Result<Self, Self::Error> {
        ErrorFlag::new(raw).ok_or_else(|| format!("error flag must be in 0..=7, got {raw}"))
    }
}

impl From<ErrorFlag> for u8 {
    fn from(flag: ErrorFlag) -> u8 {
        flag.0
    }
}

/// 定长首部。`seq` 取 `blockIndex * L + 1`，不是连续编号。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub seq: i32,
    pub ack: i32,
    pub checksum: i16,
    pub error_flag: ErrorFlag,
    /// 保留字段，恒为 0
    pub data_offset: i8,
}
