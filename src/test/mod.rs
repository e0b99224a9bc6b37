mod endpoint;
mod receiver_engine;

use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use crate::packet::{ErrorFlag, Packet};
use crate::receiver::ReceiverConfig;
use crate::sender::{SenderConfig, Variant};

pub(crate) const SENDER_ADDR: SocketAddr = SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 9001);
pub(crate) const RECEIVER_ADDR: SocketAddr = SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 9002);

pub(crate) fn sender_cfg(variant: Variant, block_len: usize) -> SenderConfig {
    SenderConfig {
        block_len,
        variant,
        init_ssthresh: 16,
        error_flag: ErrorFlag::NONE,
        destination: RECEIVER_ADDR,
    }
}

pub(crate) fn receiver_cfg() -> ReceiverConfig {
    ReceiverConfig {
        error_flag: ErrorFlag::NONE,
        destination: SENDER_ADDR,
    }
}

/// 第 `index` 个数据块：`len` 个小的非负整数
pub(crate) fn block(index: u64, len: usize) -> Vec<i32> {
    (0..len).map(|j| (index as i32 * len as i32 + j as i32) % 1000).collect()
}

/// 翻转编码后的一位，报文校验失败。数据报文改 payload，ACK 改校验和字段，
/// 因此 `seq()` / `ack_num()` 保持不变。
pub(crate) fn corrupted(packet: &Packet) -> Packet {
    let mut raw = packet.encode().to_vec();
    let idx = if packet.payload().is_empty() { 9 } else { raw.len() - 1 };
    raw[idx] ^= 0x01;
    Packet::decode(&raw, packet.destination()).expect("flipped packet decodes")
}
