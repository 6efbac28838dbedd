//! Fixed 16-byte move record

use byteorder::{BigEndian, ByteOrder};

use crate::codec::RawMove;
use crate::key::PositionKey;
use crate::schedule::SchedulerTriple;

pub const RECORD_SIZE: usize = 16;

/// One stored edge: a position key, a move, and its weight/learn fields.
///
/// Layout (big-endian): key u64 @0, raw move u16 @8, weight u16 @10, learn u32 @12.
/// When spaced repetition is active, weight and learn hold a packed
/// [`SchedulerTriple`]; otherwise weight is a plain strength counter and learn is 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Record {
    pub key: PositionKey,
    pub raw_move: RawMove,
    pub weight: u16,
    pub learn: u32,
}

impl Record {
    pub fn new(key: PositionKey, raw_move: RawMove, weight: u16, learn: u32) -> Self {
        Self {
            key,
            raw_move,
            weight,
            learn,
        }
    }

    pub fn read(buf: &[u8]) -> Self {
        Self {
            key: PositionKey(BigEndian::read_u64(&buf[0..8])),
            raw_move: RawMove(BigEndian::read_u16(&buf[8..10])),
            weight: BigEndian::read_u16(&buf[10..12]),
            learn: BigEndian::read_u32(&buf[12..16]),
        }
    }

    pub fn write(&self, buf: &mut [u8]) {
        BigEndian::write_u64(&mut buf[0..8], self.key.0);
        BigEndian::write_u16(&mut buf[8..10], self.raw_move.0);
        BigEndian::write_u16(&mut buf[10..12], self.weight);
        BigEndian::write_u32(&mut buf[12..16], self.learn);
    }

    pub fn to_bytes(&self) -> [u8; RECORD_SIZE] {
        let mut buf = [0u8; RECORD_SIZE];
        self.write(&mut buf);
        buf
    }

    /// Never scheduled records carry `learn == 0`.
    pub fn is_scheduled(&self) -> bool {
        self.learn > 0
    }

    pub fn is_due(&self, now_minutes: u32) -> bool {
        self.is_scheduled() && self.learn <= now_minutes
    }

    pub fn triple(&self) -> SchedulerTriple {
        SchedulerTriple::unpack(self.weight, self.learn)
    }
}
