//! 应用层数据源
//!
//! 把待发送的数据切成定长的数据块，按 `block_index` 从 0 开始依次产出。

use std::path::Path;

use crate::error::{RdtError, Result};

/// 合成数据的取值上界（不含）；数据单元保持小的非负整数
const SYNTHETIC_MODULUS: u64 = 10_000;

#[derive(Debug, Clone)]
pub struct BlockSource {
    block_len: usize,
    units: Vec<i32>,
}

impl BlockSource {
    /// `blocks` 个确定性的数据块，第 i 块第 j 个单元为 `(i * len + j) % 10000`
    pub fn synthetic(blocks: u64, block_len: usize) -> Self {
        let block_len = block_len.max(1);
        let total = blocks.saturating_mul(block_len as u64);
        let units = (0..total).map(|u| (u % SYNTHETIC_MODULUS) as i32).collect();
        Self { block_len, units }
    }

    /// 读取以空白分隔的整数；最后一块不足 `block_len` 时补零
    pub fn from_file(path: &Path, block_len: usize) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| RdtError::DataFile {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        let units = raw
            .split_whitespace()
            .map(|tok| {
                tok.parse::<i32>().map_err(|e| RdtError::DataFile {
                    path: path.to_path_buf(),
                    reason: format!("invalid integer {tok:?}: {e}"),
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::from_units(units, block_len))
    }

    pub fn from_units(units: Vec<i32>, block_len: usize) -> Self {
        Self {
            block_len: block_len.max(1),
            units,
        }
    }

    pub fn block_len(&self) -> usize {
        self.block_len
    }

    /// 数据块个数
    pub fn len(&self) -> u64 {
        self.units.len().div_ceil(self.block_len) as u64
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    pub fn blocks(&self) -> impl Iterator<Item = (u64, Vec<i32>)> + '_ {
        let len = self.block_len;
        self.units.chunks(len).enumerate().map(move |(i, chunk)| {
            let mut block = chunk.to_vec();
            block.resize(len, 0);
            (i as u64, block)
        })
    }
}
