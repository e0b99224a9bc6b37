//! 交付目标（持久化）

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use crate::error::Result;
use crate::packet::Segment;

/// 接收一批按序、已校验的数据块
pub trait DeliverySink: Send {
    fn deliver(&mut self, blocks: &[Segment]) -> Result<()>;
}

impl<S: DeliverySink + ?Sized> DeliverySink for Box<S> {
    fn deliver(&mut self, blocks: &[Segment]) -> Result<()> {
        (**self).deliver(blocks)
    }
}

/// 每个数据单元写一行
#[derive(Debug)]
pub struct FileSink {
    path: PathBuf,
    writer: BufWriter<File>,
}

impl FileSink {
    /// 新建（或清空）文件
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::create(&path)?;
        Ok(Self {
            path,
            writer: BufWriter::new(file),
        })
    }

    /// 追加到已有文件末尾
    pub fn append(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(Self {
            path,
            writer: BufWriter::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl DeliverySink for FileSink {
    fn deliver(&mut self, blocks: &[Segment]) -> Result<()> {
        for block in blocks {
            for unit in block.as_slice() {
                writeln!(self.writer, "{unit}")?;
            }
        }
        self.writer.flush()?;
        Ok(())
    }
}

/// 内存中的交付目标，克隆后共享同一份数据
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    inner: Arc<Mutex<MemoryInner>>,
}

#[derive(Debug, Default)]
struct MemoryInner {
    blocks: Vec<Segment>,
    batch_sizes: Vec<usize>,
}

impl MemorySink {
    pub fn blocks(&self) -> Vec<Segment> {
        self.lock().blocks.clone()
    }

    /// 所有数据单元按交付顺序展开
    pub fn units(&self) -> Vec<i32> {
        self.lock()
            .blocks
            .iter()
            .flat_map(|b| b.as_slice().iter().copied())
            .collect()
    }

    /// 每次 deliver 调用收到的数据块个数
    pub fn batch_sizes(&self) -> Vec<usize> {
        self.lock().batch_sizes.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MemoryInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl DeliverySink for MemorySink {
    fn deliver(&mut self, blocks: &[Segment]) -> Result<()> {
        let mut inner = self.lock();
        inner.blocks.extend_from_slice(blocks);
        inner.batch_sizes.push(blocks.len());
        Ok(())
    }
}

/// 只计数
#[derive(Debug, Default)]
pub struct DiscardSink {
    pub blocks: u64,
}

impl DeliverySink for DiscardSink {
    fn deliver(&mut self, blocks: &[Segment]) -> Result<()> {
        self.blocks += blocks.len() as u64;
        Ok(())
    }
}
