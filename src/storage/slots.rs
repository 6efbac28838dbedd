//! Memory-mapped sorted array of fixed-size slots
//!
//! Every slot starts with a big-endian u64 key and the array is kept sorted
//! by that key. Move tables (16-byte slots) and the comment table (256-byte
//! slots) share this engine.
//!
//! The file length is always `len() * slot_size`. Growing or shrinking drops the
//! mapping, resizes the file and maps it again; all of that happens behind
//! `&mut self`, so no caller can observe a half-resized array.
//!
//! A resize that fails partway leaves the file in an unknown state. The
//! instance is then torn: it reads as empty and refuses every write and flush
//! with [`Error::Torn`] until the file is reopened.

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use byteorder::{BigEndian, ByteOrder};
use log::{debug, error};
use memmap2::MmapMut;

use crate::error::{Error, IoContext, Result};

pub struct SlotFile {
    path: PathBuf,
    file: File,
    // Zero-length files cannot be mapped
    map: Option<MmapMut>,
    slot_size: usize,
    torn: bool,
}

impl SlotFile {
    /// Open an existing file for read/write access.
    ///
    /// A zero-length file is a valid empty array. A length that is not a
    /// multiple of `slot_size` is reported as corruption.
    pub fn open(path: impl AsRef<Path>, slot_size: usize) -> Result<Self> {
        let path = path.as_ref();
        let file = OpenOptions::new().read(true).write(true).open(path).at(path)?;
        let len = file.metadata().at(path)?.len();
        if len % slot_size as u64 != 0 {
            return Err(Error::Corrupt {
                path: path.to_path_buf(),
                len,
                slot: slot_size,
            });
        }
        let map = map_file(&file, len).at(path)?;
        Ok(Self {
            path: path.to_path_buf(),
            file,
            map,
            slot_size,
            torn: false,
        })
    }

    /// Like `open`, but creates an empty file first if none exists.
    pub fn create(path: impl AsRef<Path>, slot_size: usize) -> Result<Self> {
        let path = path.as_ref();
        OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)
            .at(path)?;
        Self::open(path, slot_size)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn slot_size(&self) -> usize {
        self.slot_size
    }

    /// Whether a failed resize has made this instance unusable.
    pub fn is_torn(&self) -> bool {
        self.torn
    }

    fn ensure_intact(&self) -> Result<()> {
        if self.torn {
            return Err(Error::Torn {
                path: self.path.clone(),
            });
        }
        Ok(())
    }

    fn tear(&mut self) {
        self.torn = true;
        self.map = None;
    }

    fn bytes(&self) -> &[u8] {
        self.map.as_deref().unwrap_or(&[])
    }

    fn bytes_mut(&mut self) -> &mut [u8] {
        match self.map.as_mut() {
            Some(map) => &mut map[..],
            None => &mut [],
        }
    }

    pub fn len(&self) -> usize {
        self.bytes().len() / self.slot_size
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Raw bytes of slot `index`. Panics if `index >= len()`.
    pub fn slot(&self, index: usize) -> &[u8] {
        let start = index * self.slot_size;
        &self.bytes()[start..start + self.slot_size]
    }

    pub fn slot_mut(&mut self, index: usize) -> &mut [u8] {
        let start = index * self.slot_size;
        let size = self.slot_size;
        &mut self.bytes_mut()[start..start + size]
    }

    /// Reads only the 8-byte key of a slot.
    pub fn key_at(&self, index: usize) -> u64 {
        let start = index * self.slot_size;
        BigEndian::read_u64(&self.bytes()[start..start + 8])
    }

    /// First index whose key is >= `key` (lower bound).
    pub fn bisect_left(&self, key: u64) -> usize {
        let mut lo = 0;
        let mut hi = self.len();
        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            if self.key_at(mid) < key {
                lo = mid + 1;
            } else {
                hi = mid;
            }
        }
        lo
    }

    /// Index range of the contiguous run of slots carrying `key`.
    pub fn equal_range(&self, key: u64) -> std::ops::Range<usize> {
        let start = self.bisect_left(key);
        let mut end = start;
        let len = self.len();
        while end < len && self.key_at(end) == key {
            end += 1;
        }
        start..end
    }

    /// Grow by one slot and shift `index..len` one slot to the right, then
    /// write `bytes` into the gap.
    pub fn insert_at(&mut self, index: usize, bytes: &[u8]) -> Result<()> {
        self.ensure_intact()?;
        debug_assert_eq!(bytes.len(), self.slot_size);
        let old_len = self.len();
        debug_assert!(index <= old_len);
        self.resize(old_len + 1)?;
        let size = self.slot_size;
        let buf = self.bytes_mut();
        buf.copy_within(index * size..old_len * size, (index + 1) * size);
        buf[index * size..(index + 1) * size].copy_from_slice(bytes);
        Ok(())
    }

    /// Remove every slot in `range` for which `doomed` returns true.
    ///
    /// Survivors are compacted leftwards over the removed slots, the tail is
    /// shifted down and the file truncated. Returns the number removed.
    pub fn remove_where<F>(&mut self, range: std::ops::Range<usize>, mut doomed: F) -> Result<usize>
    where
        F: FnMut(&[u8]) -> bool,
    {
        self.ensure_intact()?;
        let len = self.len();
        let size = self.slot_size;
        let mut write = range.start;
        for read in range.clone() {
            if doomed(self.slot(read)) {
                continue;
            }
            if write != read {
                self.bytes_mut()
                    .copy_within(read * size..(read + 1) * size, write * size);
            }
            write += 1;
        }
        let removed = range.end - write;
        if removed == 0 {
            return Ok(0);
        }
        self.bytes_mut()
            .copy_within(range.end * size..len * size, write * size);
        self.resize(len - removed)?;
        Ok(removed)
    }

    fn resize(&mut self, slots: usize) -> Result<()> {
        let old_bytes = self.bytes().len() as u64;
        let new_bytes = (slots * self.slot_size) as u64;
        // Unmapping keeps written pages: the mapping is shared with the file
        self.map = None;
        let remapped = self
            .file
            .set_len(new_bytes)
            .and_then(|()| map_file(&self.file, new_bytes));
        match remapped {
            Ok(map) => self.map = map,
            Err(e) => {
                error!(
                    "{}: resize {} -> {} bytes failed, table unusable until reopened: {}",
                    self.path.display(),
                    old_bytes,
                    new_bytes,
                    e
                );
                self.tear();
                return Err(e).at(&self.path);
            }
        }
        debug!(
            "{}: resized {} -> {} bytes",
            self.path.display(),
            old_bytes,
            new_bytes
        );
        Ok(())
    }

    /// Force mapped pages and the file length to durable storage.
    pub fn flush(&self) -> Result<()> {
        self.ensure_intact()?;
        if let Some(map) = &self.map {
            map.flush().at(&self.path)?;
        }
        self.file.sync_all().at(&self.path)
    }
}

fn map_file(file: &File, len: u64) -> std::io::Result<Option<MmapMut>> {
    if len == 0 {
        return Ok(None);
    }
    // Single-writer by contract: nothing else may resize the file underneath us
    let map = unsafe { MmapMut::map_mut(file)? };
    Ok(Some(map))
}
