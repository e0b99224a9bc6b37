//! 校验和
//!
//! 对 seq、ack 和每个数据单元做加法折叠：首部两字段之和先对 65535 取模，
//! 之后每加一个数据单元再取模一次，最后截断为 16 位。这只是一个简化的差错检测，不同排列的数据可能得到相同结果。

use super::model::Packet;

/// 校验结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Validity {
    Clean,
    Corrupted,
}

impl Validity {
    pub fn is_clean(self) -> bool {
        self == Validity::Clean
    }
}

/// 计算首部字段与数据的校验和（不读取首部里已存的校验和）
pub fn compute_checksum(seq: i32, ack: i32, payload: &[i32]) -> i16 {
    // 不带数据的 ACK 也要取模，否则 ack 的高 16 位不参与校验
    let mut sum = seq.wrapping_add(ack) % 65535;
    for &unit in payload {
        sum = sum.wrapping_add(unit);
        // `%` 与被除数同号，负数的和保持为负
        sum %= 65535;
    }
    sum as i16
}

/// 重新计算并与首部中的校验和比较
pub fn validate(packet: &Packet) -> Validity {
    let h = packet.header();
    if compute_checksum(h.seq, h.ack, packet.payload()) == h.checksum {
        Validity::Clean
    } else {
        Validity::Corrupted
    }
}
