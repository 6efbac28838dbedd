//! Position comments: sorted side table of fixed-width UTF-8 text

use std::path::Path;

use crate::error::{Error, Result};
use crate::key::PositionKey;
use crate::storage::slots::SlotFile;

pub const COMMENT_SIZE: usize = 256;
pub const COMMENT_TEXT_SIZE: usize = COMMENT_SIZE - 8;

/// At most one comment per position key.
///
/// Layout: key u64 (big-endian) @0, text @8, NUL-padded to 248 bytes.
pub struct CommentTable {
    slots: SlotFile,
}

impl CommentTable {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self {
            slots: SlotFile::open(path, COMMENT_SIZE)?,
        })
    }

    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self {
            slots: SlotFile::create(path, COMMENT_SIZE)?,
        })
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    fn find(&self, key: PositionKey) -> Result<usize, usize> {
        let at = self.slots.bisect_left(key.0);
        if at < self.slots.len() && self.slots.key_at(at) == key.0 {
            Ok(at)
        } else {
            Err(at)
        }
    }

    pub fn get(&self, key: PositionKey) -> Option<String> {
        let index = self.find(key).ok()?;
        Some(decode_text(&self.slots.slot(index)[8..]))
    }

    /// Store `text` for `key`, replacing any previous comment.
    ///
    /// Text longer than the fixed field is rejected, never truncated. NUL
    /// terminates the stored text, so text containing one is rejected too.
    pub fn set(&mut self, key: PositionKey, text: &str) -> Result<()> {
        let bytes = text.as_bytes();
        if let Some(offset) = bytes.iter().position(|&b| b == 0) {
            return Err(Error::CommentNul { offset });
        }
        if bytes.len() > COMMENT_TEXT_SIZE {
            return Err(Error::CommentTooLong {
                len: bytes.len(),
                max: COMMENT_TEXT_SIZE,
            });
        }
        match self.find(key) {
            Ok(index) => {
                let field = &mut self.slots.slot_mut(index)[8..];
                field.fill(0);
                field[..bytes.len()].copy_from_slice(bytes);
            }
            Err(at) => {
                let mut slot = [0u8; COMMENT_SIZE];
                slot[..8].copy_from_slice(&key.0.to_be_bytes());
                slot[8..8 + bytes.len()].copy_from_slice(bytes);
                self.slots.insert_at(at, &slot)?;
            }
        }
        Ok(())
    }

    /// Drop the comment for `key`. Returns whether one existed.
    pub fn remove(&mut self, key: PositionKey) -> Result<bool> {
        let range = self.slots.equal_range(key.0);
        Ok(self.slots.remove_where(range, |_| true)? > 0)
    }

    pub fn iter(&self) -> impl Iterator<Item = (PositionKey, String)> + '_ {
        (0..self.len()).map(move |i| {
            let slot = self.slots.slot(i);
            (PositionKey(self.slots.key_at(i)), decode_text(&slot[8..]))
        })
    }

    pub fn flush(&self) -> Result<()> {
        self.slots.flush()
    }
}

fn decode_text(field: &[u8]) -> String {
    let end = field.iter().position(|&b| b == 0).unwrap_or(field.len());
    String::from_utf8_lossy(&field[..end]).into_owned()
}
