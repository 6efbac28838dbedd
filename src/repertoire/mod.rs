//! Repertoire: the move tables, comments and tactics entry points of one user
//!
//! On-disk layout under the repertoire root:
//!
//! ```text
//! white/white        white repertoire, white to move
//! white/black        white repertoire, black to move
//! black/white        black repertoire, white to move
//! black/black        black repertoire, black to move
//! tactics            side-agnostic tactics table
//! comments           position comments
//! initial_positions  tactics entry points (FEN per line)
//! games/<n>          saved games
//! positions/<key>    game numbers passing through a position
//! ```
//!
//! A `Repertoire` is not thread-safe in any useful sense: it must only be
//! used from one thread at a time. Writes land in shared file mappings and
//! only become durable on [`Repertoire::flush`].

pub mod archive;
pub mod initial;

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use log::{debug, error, warn};
use shakmaty::{Chess, Color, Move, Position};

use crate::codec::{self, BookMove};
use crate::error::{Error, IoContext, Result};
use crate::key::PositionKey;
use crate::schedule::{now_minutes, Quality, SchedulerParams, SchedulerTriple};
use crate::storage::{CommentTable, FindAll, MoveTable, Record};

pub use self::archive::GameArchive;
pub use self::initial::InitialPositions;

/// Which part of the repertoire an operation targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Section {
    /// Opening repertoire played by this side; routed further by side to move
    Repertoire(Color),
    /// Tactics exercises, one table whatever the side to move
    Tactics,
}

impl Section {
    pub const WHITE: Section = Section::Repertoire(Color::White);
    pub const BLACK: Section = Section::Repertoire(Color::Black);

    /// The side whose moves are trained, if any.
    pub fn player(self) -> Option<Color> {
        match self {
            Section::Repertoire(color) => Some(color),
            Section::Tactics => None,
        }
    }
}

impl From<Color> for Section {
    fn from(color: Color) -> Self {
        Section::Repertoire(color)
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Section::Repertoire(Color::White) => f.write_str("white"),
            Section::Repertoire(Color::Black) => f.write_str("black"),
            Section::Tactics => f.write_str("tactics"),
        }
    }
}

const TACTICS_FILE: &str = "tactics";
const COMMENTS_FILE: &str = "comments";
const INITIAL_POSITIONS_FILE: &str = "initial_positions";

fn table_path(root: &Path, side: Color, turn: Color) -> PathBuf {
    root.join(side.fold_wb("white", "black"))
        .join(turn.fold_wb("white", "black"))
}

/// Record counts per table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RepertoireStats {
    pub white_white: usize,
    pub white_black: usize,
    pub black_white: usize,
    pub black_black: usize,
    pub tactics: usize,
    pub comments: usize,
    pub initial_positions: usize,
}

impl fmt::Display for RepertoireStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "white repertoire: {} white-to-move, {} black-to-move", self.white_white, self.white_black)?;
        writeln!(f, "black repertoire: {} white-to-move, {} black-to-move", self.black_white, self.black_black)?;
        writeln!(f, "tactics:          {} entries, {} initial positions", self.tactics, self.initial_positions)?;
        write!(f, "comments:         {}", self.comments)
    }
}

pub struct Repertoire {
    root: PathBuf,
    white_white: MoveTable,
    white_black: MoveTable,
    black_white: MoveTable,
    black_black: MoveTable,
    tactics: MoveTable,
    comments: CommentTable,
    initial: InitialPositions,
    params: SchedulerParams,
}

impl Repertoire {
    /// Open an existing repertoire directory.
    ///
    /// Any missing, unreadable or corrupt table fails the whole open; callers
    /// treat that as "no repertoire loaded".
    pub fn open(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        let rep = Self {
            white_white: MoveTable::open(table_path(&root, Color::White, Color::White))?,
            white_black: MoveTable::open(table_path(&root, Color::White, Color::Black))?,
            black_white: MoveTable::open(table_path(&root, Color::Black, Color::White))?,
            black_black: MoveTable::open(table_path(&root, Color::Black, Color::Black))?,
            tactics: MoveTable::open(root.join(TACTICS_FILE))?,
            comments: CommentTable::open(root.join(COMMENTS_FILE))?,
            initial: InitialPositions::load(root.join(INITIAL_POSITIONS_FILE))?,
            params: SchedulerParams::default(),
            root,
        };
        debug!("opened repertoire {}", rep.root.display());
        Ok(rep)
    }

    /// Create the directory layout with empty tables, keeping any existing files.
    pub fn create(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        for side in ["white", "black"] {
            let dir = root.join(side);
            fs::create_dir_all(&dir).at(&dir)?;
        }
        for side in [Color::White, Color::Black] {
            for turn in [Color::White, Color::Black] {
                MoveTable::create(table_path(&root, side, turn))?;
            }
        }
        MoveTable::create(root.join(TACTICS_FILE))?;
        CommentTable::create(root.join(COMMENTS_FILE))?;
        Self::open(root)
    }

    pub fn with_params(mut self, params: SchedulerParams) -> Self {
        self.params = params;
        self
    }

    pub fn params(&self) -> &SchedulerParams {
        &self.params
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn archive(&self) -> GameArchive {
        GameArchive::new(&self.root)
    }

    /// Table holding `section`'s moves for positions with `turn` to move.
    pub fn table(&self, section: Section, turn: Color) -> &MoveTable {
        match (section, turn) {
            (Section::Repertoire(Color::White), Color::White) => &self.white_white,
            (Section::Repertoire(Color::White), Color::Black) => &self.white_black,
            (Section::Repertoire(Color::Black), Color::White) => &self.black_white,
            (Section::Repertoire(Color::Black), Color::Black) => &self.black_black,
            (Section::Tactics, _) => &self.tactics,
        }
    }

    fn table_mut(&mut self, section: Section, turn: Color) -> &mut MoveTable {
        match (section, turn) {
            (Section::Repertoire(Color::White), Color::White) => &mut self.white_white,
            (Section::Repertoire(Color::White), Color::Black) => &mut self.white_black,
            (Section::Repertoire(Color::Black), Color::White) => &mut self.black_white,
            (Section::Repertoire(Color::Black), Color::Black) => &mut self.black_black,
            (Section::Tactics, _) => &mut self.tactics,
        }
    }

    /// Every table belonging to `section`.
    pub fn tables(&self, section: Section) -> Vec<&MoveTable> {
        match section {
            Section::Repertoire(_) => vec![
                self.table(section, Color::White),
                self.table(section, Color::Black),
            ],
            Section::Tactics => vec![&self.tactics],
        }
    }

    /// Raw records stored for `pos`.
    pub fn find_records(&self, section: Section, pos: &Chess) -> FindAll<'_> {
        self.table(section, pos.turn()).find_all(PositionKey::of(pos))
    }

    /// Legal moves stored for `pos`, in table order.
    ///
    /// Records whose move is not legal in `pos` (a key collision or a damaged
    /// entry) are skipped with a warning.
    pub fn find_moves<'a>(&'a self, section: Section, pos: &'a Chess) -> impl Iterator<Item = Move> + 'a {
        self.find_records(section, pos)
            .filter_map(move |record| resolve(pos, &record))
    }

    pub fn find_move(&self, section: Section, pos: &Chess) -> Option<Move> {
        self.find_moves(section, pos).next()
    }

    pub fn has_position(&self, section: Section, pos: &Chess) -> bool {
        self.find_records(section, pos).next().is_some()
    }

    /// Whether `mv` is stored for `pos`, under any of its raw forms.
    pub fn contains(&self, section: Section, pos: &Chess, mv: &Move) -> bool {
        let forms = codec::raw_forms(mv);
        let found = self
            .table(section, pos.turn())
            .positions_of_any(PositionKey::of(pos), &forms)
            .next()
            .is_some();
        found
    }

    /// Store `mv` for `pos` unless that exact (position, move) is already present.
    ///
    /// Returns whether a record was added. Tactics go through the same check:
    /// scheduling assumes one record per (position, move).
    pub fn append(&mut self, section: Section, pos: &Chess, mv: &Move, weight: u16, learn: u32) -> Result<bool> {
        if self.contains(section, pos, mv) {
            return Ok(false);
        }
        let record = Record::new(PositionKey::of(pos), codec::encode(mv), weight, learn);
        self.table_mut(section, pos.turn()).insert(record)?;
        Ok(true)
    }

    /// Remove `mv` for `pos`, or every move stored for `pos` when `mv` is `None`.
    pub fn remove(&mut self, section: Section, pos: &Chess, mv: Option<&Move>) -> Result<usize> {
        let key = PositionKey::of(pos);
        let table = self.table_mut(section, pos.turn());
        match mv {
            None => table.delete(key, None),
            Some(mv) => table.delete_any(key, &codec::raw_forms(mv)),
        }
    }

    /// Schedule every record at `pos` for immediate review.
    ///
    /// Only never-scheduled records (`learn == 0`) are touched unless
    /// `override_existing` is set. Returns the number of records changed.
    /// Nothing is flushed.
    pub fn make_learnable(&mut self, pos: &Chess, section: Section, override_existing: bool) -> usize {
        self.make_learnable_at(pos, section, override_existing, now_minutes())
    }

    pub fn make_learnable_at(&mut self, pos: &Chess, section: Section, override_existing: bool, now: u32) -> usize {
        let (weight, learn) = SchedulerTriple::fresh(&self.params, now).pack();
        let key = PositionKey::of(pos);
        let table = self.table_mut(section, pos.turn());
        let mut changed = 0;
        for index in table.indices(key) {
            if override_existing || table.get(index).learn == 0 {
                table.edit(index, weight, learn);
                changed += 1;
            }
        }
        changed
    }

    /// Grade an answer for (`pos`, `mv`) and write the new schedule back.
    ///
    /// Returns `None` if the move is not stored. More than one matching record
    /// is upstream corruption: it is logged and reported, and nothing is written.
    pub fn update_learning_data(
        &mut self,
        section: Section,
        pos: &Chess,
        mv: &Move,
        incorrect: u32,
        elapsed: Duration,
    ) -> Result<Option<SchedulerTriple>> {
        self.update_learning_data_at(section, pos, mv, incorrect, elapsed, now_minutes())
    }

    pub fn update_learning_data_at(
        &mut self,
        section: Section,
        pos: &Chess,
        mv: &Move,
        incorrect: u32,
        elapsed: Duration,
        now: u32,
    ) -> Result<Option<SchedulerTriple>> {
        let key = PositionKey::of(pos);
        let raw = codec::encode(mv);
        let forms = codec::raw_forms(mv);
        let quality = Quality::from_attempt_with(incorrect, elapsed, &self.params);
        let params = self.params.clone();
        let table = self.table_mut(section, pos.turn());

        let matches: Vec<usize> = table.positions_of_any(key, &forms).collect();
        let index = match matches.as_slice() {
            [] => return Ok(None),
            [index] => *index,
            _ => {
                error!(
                    "{}: {} records for {} move {}, schedule not updated",
                    table.path().display(),
                    matches.len(),
                    key,
                    codec::to_uci(mv)
                );
                return Err(Error::AmbiguousRecord {
                    key: key.0,
                    raw_move: raw.0,
                    count: matches.len(),
                });
            }
        };

        let record = table.get(index);
        let next = record.triple().update_with(quality, now, &params);
        let (weight, learn) = next.pack();
        table.edit(index, weight, learn);
        debug!(
            "{} {}: quality {} -> e={:.3} c={} due={}",
            key,
            codec::to_uci(mv),
            quality.get(),
            next.easiness,
            next.consecutive,
            next.due
        );
        Ok(Some(next))
    }

    pub fn get_comment(&self, pos: &Chess) -> Option<String> {
        self.comments.get(PositionKey::of(pos))
    }

    pub fn set_comment(&mut self, pos: &Chess, text: &str) -> Result<()> {
        self.comments.set(PositionKey::of(pos), text)
    }

    pub fn remove_comment(&mut self, pos: &Chess) -> Result<bool> {
        self.comments.remove(PositionKey::of(pos))
    }

    pub fn comments(&self) -> &CommentTable {
        &self.comments
    }

    pub fn initial_positions(&self) -> &InitialPositions {
        &self.initial
    }

    pub fn initial_positions_mut(&mut self) -> &mut InitialPositions {
        &mut self.initial
    }

    pub fn stats(&self) -> RepertoireStats {
        RepertoireStats {
            white_white: self.white_white.len(),
            white_black: self.white_black.len(),
            black_white: self.black_white.len(),
            black_black: self.black_black.len(),
            tactics: self.tactics.len(),
            comments: self.comments.len(),
            initial_positions: self.initial.len(),
        }
    }

    /// Make every change so far durable. Safe to call repeatedly.
    pub fn flush(&self) -> Result<()> {
        for table in [
            &self.white_white,
            &self.white_black,
            &self.black_white,
            &self.black_black,
            &self.tactics,
        ] {
            table.flush()?;
        }
        self.comments.flush()?;
        self.initial.save()
    }

    /// Release the file mappings. Does not flush.
    pub fn close(self) {
        debug!("closed repertoire {}", self.root.display());
    }
}

fn resolve(pos: &Chess, record: &Record) -> Option<Move> {
    let shape = BookMove::decode(record.raw_move);
    let mv = shape.to_move(pos);
    if mv.is_none() {
        warn!(
            "stored move {} is not legal at {}, skipping",
            shape, record.key
        );
    }
    mv
}
