//! Sorted move table: one file of 16-byte records ordered by position key

use std::ops::Range;
use std::path::Path;

use byteorder::{BigEndian, ByteOrder};
use log::debug;

use crate::codec::RawMove;
use crate::error::Result;
use crate::key::PositionKey;
use crate::storage::record::{Record, RECORD_SIZE};
use crate::storage::slots::SlotFile;

/// File-backed table of [`Record`]s sorted ascending by key.
///
/// Equal keys sit next to each other in no particular order. A (key, move)
/// pair is stored at most once when callers go through [`MoveTable::insert_unique`].
pub struct MoveTable {
    slots: SlotFile,
}

impl MoveTable {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self {
            slots: SlotFile::open(path, RECORD_SIZE)?,
        })
    }

    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self {
            slots: SlotFile::create(path, RECORD_SIZE)?,
        })
    }

    pub fn path(&self) -> &Path {
        self.slots.path()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Record at `index`. Callers check `index < len()`.
    pub fn get(&self, index: usize) -> Record {
        Record::read(self.slots.slot(index))
    }

    pub fn bisect_left(&self, key: PositionKey) -> usize {
        self.slots.bisect_left(key.0)
    }

    /// Indices of every record stored for `key`.
    pub fn indices(&self, key: PositionKey) -> Range<usize> {
        self.slots.equal_range(key.0)
    }

    /// Lazily yields every record stored for `key`, in table order.
    pub fn find_all(&self, key: PositionKey) -> FindAll<'_> {
        FindAll {
            table: self,
            key,
            index: self.bisect_left(key),
        }
    }

    /// Index of the record for (`key`, `raw_move`), if any.
    pub fn position_of(&self, key: PositionKey, raw_move: RawMove) -> Option<usize> {
        self.indices(key).find(|&i| self.raw_move_at(i) == raw_move)
    }

    /// Indices of the records for `key` whose move is any of `forms`.
    pub fn positions_of_any<'a>(
        &'a self,
        key: PositionKey,
        forms: &'a [RawMove],
    ) -> impl Iterator<Item = usize> + 'a {
        self.indices(key)
            .filter(move |&i| forms.contains(&self.raw_move_at(i)))
    }

    pub fn contains(&self, record: &Record) -> bool {
        self.position_of(record.key, record.raw_move).is_some()
    }

    fn raw_move_at(&self, index: usize) -> RawMove {
        RawMove(BigEndian::read_u16(&self.slots.slot(index)[8..10]))
    }

    /// Insertion-sort insert at the lower bound of the record's key.
    ///
    /// Does not check for an existing (key, move) pair.
    pub fn insert(&mut self, record: Record) -> Result<()> {
        let at = self.bisect_left(record.key);
        self.slots.insert_at(at, &record.to_bytes())?;
        debug!(
            "{}: inserted {} move {:#06x} at {}",
            self.path().display(),
            record.key,
            record.raw_move.0,
            at
        );
        Ok(())
    }

    /// Insert unless the same (key, move) is already stored. Returns whether it was added.
    pub fn insert_unique(&mut self, record: Record) -> Result<bool> {
        if self.contains(&record) {
            return Ok(false);
        }
        self.insert(record)?;
        Ok(true)
    }

    /// Delete the records for `key`, or only the one for (`key`, `mv`).
    ///
    /// With `mv == None` every move stored for the position goes. Returns the
    /// number removed; zero when nothing matched.
    pub fn delete(&mut self, key: PositionKey, mv: Option<RawMove>) -> Result<usize> {
        match mv {
            None => self.delete_matching(key, |_| true),
            Some(raw) => self.delete_any(key, &[raw]),
        }
    }

    /// Delete the records for `key` whose move is any of `forms`.
    pub fn delete_any(&mut self, key: PositionKey, forms: &[RawMove]) -> Result<usize> {
        self.delete_matching(key, |raw| forms.contains(&raw))
    }

    fn delete_matching<F>(&mut self, key: PositionKey, mut doomed: F) -> Result<usize>
    where
        F: FnMut(RawMove) -> bool,
    {
        let range = self.indices(key);
        let removed = self
            .slots
            .remove_where(range, |slot| doomed(RawMove(BigEndian::read_u16(&slot[8..10]))))?;
        if removed > 0 {
            debug!("{}: deleted {} record(s) for {}", self.path().display(), removed, key);
        }
        Ok(removed)
    }

    /// Overwrite weight and learn of the record at `index`, keeping key and move.
    pub fn edit(&mut self, index: usize, weight: u16, learn: u32) {
        let slot = self.slots.slot_mut(index);
        BigEndian::write_u16(&mut slot[10..12], weight);
        BigEndian::write_u32(&mut slot[12..16], learn);
    }

    pub fn iter(&self) -> impl Iterator<Item = Record> + '_ {
        (0..self.len()).map(move |i| self.get(i))
    }

    pub fn flush(&self) -> Result<()> {
        self.slots.flush()
    }
}

/// Iterator over the run of records sharing one key.
pub struct FindAll<'a> {
    table: &'a MoveTable,
    key: PositionKey,
    index: usize,
}

impl Iterator for FindAll<'_> {
    type Item = Record;

    fn next(&mut self) -> Option<Record> {
        if self.index >= self.table.len() {
            return None;
        }
        let record = self.table.get(self.index);
        if record.key != self.key {
            return None;
        }
        self.index += 1;
        Some(record)
    }
}
