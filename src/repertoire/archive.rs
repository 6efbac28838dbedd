//! Saved games and the position index pointing into them
//!
//! `games/<n>` holds the text of game `n` (opaque PGN). `positions/<key>`
//! holds a comma-separated list of the games that pass through the position
//! whose key is `<key>` in 16 hex digits.

use std::collections::BTreeSet;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use log::{debug, warn};

use crate::error::{IoContext, Result};
use crate::key::PositionKey;

#[derive(Debug, Clone)]
pub struct GameArchive {
    games: PathBuf,
    positions: PathBuf,
}

impl GameArchive {
    pub fn new(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        Self {
            games: root.join("games"),
            positions: root.join("positions"),
        }
    }

    fn numbers(&self) -> Result<Vec<u32>> {
        let entries = match fs::read_dir(&self.games) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e).at(&self.games),
        };
        let mut numbers = Vec::new();
        for entry in entries {
            let entry = entry.at(&self.games)?;
            if let Some(n) = entry.file_name().to_str().and_then(|s| s.parse().ok()) {
                numbers.push(n);
            }
        }
        numbers.sort_unstable();
        Ok(numbers)
    }

    pub fn len(&self) -> Result<usize> {
        Ok(self.numbers()?.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Save a game under the next free number and index every position it passes through.
    pub fn store<I>(&self, pgn: &str, keys: I) -> Result<u32>
    where
        I: IntoIterator<Item = PositionKey>,
    {
        fs::create_dir_all(&self.games).at(&self.games)?;
        fs::create_dir_all(&self.positions).at(&self.positions)?;

        let number = self.numbers()?.last().map_or(1, |n| n + 1);
        let path = self.games.join(number.to_string());
        fs::write(&path, pgn).at(&path)?;

        let keys: BTreeSet<PositionKey> = keys.into_iter().collect();
        for key in &keys {
            let mut games = self.games_through(*key)?;
            if !games.contains(&number) {
                games.push(number);
            }
            let list: Vec<String> = games.iter().map(u32::to_string).collect();
            let path = self.index_path(*key);
            fs::write(&path, list.join(",")).at(&path)?;
        }
        debug!("stored game {} through {} positions", number, keys.len());
        Ok(number)
    }

    pub fn read(&self, number: u32) -> Result<String> {
        let path = self.games.join(number.to_string());
        fs::read_to_string(&path).at(&path)
    }

    /// Numbers of the saved games passing through `key`, oldest first.
    pub fn games_through(&self, key: PositionKey) -> Result<Vec<u32>> {
        let path = self.index_path(key);
        let text = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e).at(&path),
        };
        let mut games = Vec::new();
        for item in text.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            match item.parse() {
                Ok(n) => games.push(n),
                Err(_) => warn!("{}: ignoring entry {:?}", path.display(), item),
            }
        }
        Ok(games)
    }

    fn index_path(&self, key: PositionKey) -> PathBuf {
        self.positions.join(key.to_string())
    }
}
