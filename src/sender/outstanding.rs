//! 未确认报文段表（按 seq 排序）

use std::collections::BTreeMap;

use crate::packet::Packet;

#[derive(Debug, Default)]
pub struct OutstandingStore {
    inflight: BTreeMap<i32, Packet>, // seq -> packet
}

impl OutstandingStore {
    pub fn insert(&mut self, packet: Packet) {
        self.inflight.insert(packet.seq(), packet);
    }

    /// 移除所有 `seq <= ack` 的报文段，返回移除个数
    pub fn purge_through(&mut self, ack: i32) -> usize {
        let Some(split) = ack.checked_add(1) else {
            let n = self.inflight.len();
            self.inflight.clear();
            return n;
        };
        let keep = self.inflight.split_off(&split);
        std::mem::replace(&mut self.inflight, keep).len()
    }

    pub fn contains(&self, seq: i32) -> bool {
        self.inflight.contains_key(&seq)
    }

    /// 最早的未确认报文段（窗口 base）
    pub fn first(&self) -> Option<&Packet> {
        self.inflight.values().next()
    }

    /// 按 seq 升序遍历
    pub fn iter(&self) -> impl Iterator<Item = &Packet> {
        self.inflight.values()
    }

    pub fn seqs(&self) -> impl Iterator<Item = i32> + '_ {
        self.inflight.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.inflight.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inflight.is_empty()
    }
}
