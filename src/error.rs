//! Error type shared by every repertoire operation

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Errors surfaced by the repertoire store.
///
/// Lookups that find nothing are not errors: they return `None` or a zero count.
#[derive(Debug, Error)]
pub enum Error {
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{} is corrupt: {len} bytes is not a multiple of the {slot}-byte slot size", path.display())]
    Corrupt { path: PathBuf, len: u64, slot: usize },

    #[error("{} was left half-resized; reopen it before further use", path.display())]
    Torn { path: PathBuf },

    #[error("comment is {len} bytes, the field holds at most {max}")]
    CommentTooLong { len: usize, max: usize },

    #[error("comment contains a NUL byte at offset {offset}")]
    CommentNul { offset: usize },

    #[error("invalid FEN {fen:?}: {reason}")]
    InvalidFen { fen: String, reason: String },

    #[error("illegal move {mv} in this position")]
    IllegalMove { mv: String },

    #[error("{count} records stored for key {key:016x} move {raw_move:#06x}, expected at most one")]
    AmbiguousRecord { key: u64, raw_move: u16, count: usize },

    #[error("invalid configuration: {0}")]
    Config(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Attaches the offending path to a bare `io::Error`.
pub(crate) trait IoContext<T> {
    fn at(self, path: &Path) -> Result<T>;
}

impl<T> IoContext<T> for io::Result<T> {
    fn at(self, path: &Path) -> Result<T> {
        self.map_err(|source| Error::Io {
            path: path.to_path_buf(),
            source,
        })
    }
}
