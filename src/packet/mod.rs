//! 报文模型
//!
//! 一个 [`Packet`] 由首部、定长数据段与目的地址组成，发送路径上每次都新建，
//! 发出后不再修改。校验和与线格式编解码也在这里。

mod checksum;
mod codec;
mod header;
mod model;

pub use checksum::{compute_checksum, validate, Validity};
pub use codec::{CodecError, HEADER_LEN};
pub use header::{ErrorFlag, Header};
pub use model::{Packet, Segment};
