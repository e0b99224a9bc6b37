//! 线格式编解码
//!
//! 多字节整数均为大端序：
//!
//! ```text
//! | seq: i32 | ack: i32 | checksum: i16 | eflag: i8 | data_offset: i8 | payload: [i32] ... |
//! ```
//!
//! 数据长度由剩余字节数推出。目的地址不在线格式里，解码时由调用方给出。

use std::net::SocketAddr;

use bytes::{Buf, BufMut, Bytes, BytesMut};
use thiserror::Error;

use super::header::{ErrorFlag, Header};
use super::model::{Packet, Segment};

/// 定长首部字节数
pub const HEADER_LEN: usize = 12;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    #[error("buffer of {0} bytes is shorter than the 12-byte header")]
    Truncated(usize),
    #[error("payload of {0} bytes is not a whole number of 4-byte units")]
    Misaligned(usize),
    #[error("error flag {0} out of range")]
    BadErrorFlag(i8),
}

impl Packet {
    pub fn encode(&self) -> Bytes {
        let h = self.header();
        let mut buf = BytesMut::with_capacity(HEADER_LEN + 4 * self.payload().len());
        buf.put_i32(h.seq);
        buf.put_i32(h.ack);
        buf.put_i16(h.checksum);
        buf.put_i8(h.error_flag.raw() as i8);
        buf.put_i8(h.data_offset);
        for &unit in self.payload() {
            buf.put_i32(unit);
        }
        buf.freeze()
    }

    pub fn decode(mut buf: &[u8], destination: SocketAddr) -> Result<Packet, CodecError> {
        if buf.len() < HEADER_LEN {
            return Err(CodecError::Truncated(buf.len()));
        }
        let payload_len = buf.len() - HEADER_LEN;
        if payload_len % 4 != 0 {
            return Err(CodecError::Misaligned(payload_len));
        }

        let seq = buf.get_i32();
        let ack = buf.get_i32();
        let checksum = buf.get_i16();
        let raw_flag = buf.get_i8();
        let error_flag = u8::try_from(raw_flag)
            .ok()
            .and_then(ErrorFlag::new)
            .ok_or(CodecError::BadErrorFlag(raw_flag))?;
        let data_offset = buf.get_i8();

        let mut units = Vec::with_capacity(payload_len / 4);
        while buf.has_remaining() {
            units.push(buf.get_i32());
        }

        Ok(Packet::from_parts(
            Header {
                seq,
                ack,
                checksum,
                error_flag,
                data_offset,
            },
            Segment::new(units),
            destination,
        ))
    }
}
