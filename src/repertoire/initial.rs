//! Tactics entry points: a flat FEN list kept sorted by position key

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use shakmaty::Chess;

use crate::error::{IoContext, Result};
use crate::key::{parse_fen, PositionKey};

/// Newline-delimited FEN file, one entry per position key.
#[derive(Debug, Clone)]
pub struct InitialPositions {
    path: PathBuf,
    entries: Vec<(PositionKey, String)>,
}

impl InitialPositions {
    /// Load the list; a missing file is an empty list. Unparseable lines are errors.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let text = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => String::new(),
            Err(e) => return Err(e).at(&path),
        };
        let mut list = Self {
            path,
            entries: Vec::new(),
        };
        for line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
            list.add(line)?;
        }
        Ok(list)
    }

    fn find(&self, key: PositionKey) -> std::result::Result<usize, usize> {
        self.entries.binary_search_by_key(&key, |(k, _)| *k)
    }

    /// Add a position. Returns false if its key is already listed.
    pub fn add(&mut self, fen: &str) -> Result<bool> {
        let fen = fen.trim();
        let key = PositionKey::of(&parse_fen(fen)?);
        match self.find(key) {
            Ok(_) => Ok(false),
            Err(at) => {
                self.entries.insert(at, (key, fen.to_string()));
                Ok(true)
            }
        }
    }

    pub fn remove(&mut self, key: PositionKey) -> bool {
        match self.find(key) {
            Ok(at) => {
                self.entries.remove(at);
                true
            }
            Err(_) => false,
        }
    }

    pub fn contains(&self, key: PositionKey) -> bool {
        self.find(key).is_ok()
    }

    pub fn get(&self, key: PositionKey) -> Option<&str> {
        self.find(key).ok().map(|at| self.entries[at].1.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (PositionKey, &str)> {
        self.entries.iter().map(|(k, fen)| (*k, fen.as_str()))
    }

    /// Every listed position, parsed.
    pub fn positions(&self) -> Result<Vec<Chess>> {
        self.entries.iter().map(|(_, fen)| parse_fen(fen)).collect()
    }

    pub fn save(&self) -> Result<()> {
        let mut text = String::new();
        for (_, fen) in &self.entries {
            text.push_str(fen);
            text.push('\n');
        }
        fs::write(&self.path, text).at(&self.path)
    }
}
