//! 数据段与报文

use std::net::SocketAddr;
use std::sync::Arc;

use super::checksum::{self, Validity};
use super::header::{ErrorFlag, Header};

/// 定长的整数数据单元序列。克隆只增加引用计数。
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Segment(Arc<[i32]>);

impl Segment {
    pub fn new(units: Vec<i32>) -> Self {
        Segment(units.into())
    }

    pub fn empty() -> Self {
        Segment::default()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[i32] {
        &self.0
    }
}

impl From<Vec<i32>> for Segment {
    fn from(units: Vec<i32>) -> Self {
        Segment::new(units)
    }
}

/// 一个不可变的报文：首部 + 数据段 + 目的地址。
///
/// 构造函数会填好校验和；之后没有任何方法能修改它。需要"另一个"报文
/// （例如信道把它弄坏）时只能新建。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    header: Header,
    segment: Segment,
    destination: SocketAddr,
}

impl Packet {
    /// 数据报文，ack 字段为 0
    pub fn data(seq: i32, segment: Segment, error_flag: ErrorFlag, destination: SocketAddr) -> Self {
        let checksum = checksum::compute_checksum(seq, 0, segment.as_slice());
        Packet {
            header: Header {
                seq,
                ack: 0,
                checksum,
                error_flag,
                data_offset: 0,
            },
            segment,
            destination,
        }
    }

    /// 纯确认报文：只有首部，`ack` 是已按序收到的最大序号
    pub fn ack(ack: i32, error_flag: ErrorFlag, destination: SocketAddr) -> Self {
        Packet {
            header: Header {
                seq: 0,
                ack,
                checksum: checksum::compute_checksum(0, ack, &[]),
                error_flag,
                data_offset: 0,
            },
            segment: Segment::empty(),
            destination,
        }
    }

    /// 原样组装，保留首部里的校验和（解码时使用）
    pub(crate) fn from_parts(header: Header, segment: Segment, destination: SocketAddr) -> Self {
        Packet {
            header,
            segment,
            destination,
        }
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    pub fn seq(&self) -> i32 {
        self.header.seq
    }

    pub fn ack_num(&self) -> i32 {
        self.header.ack
    }

    pub fn segment(&self) -> &Segment {
        &self.segment
    }

    pub fn payload(&self) -> &[i32] {
        self.segment.as_slice()
    }

    pub fn destination(&self) -> SocketAddr {
        self.destination
    }

    pub fn validity(&self) -> Validity {
        checksum::validate(self)
    }
}
