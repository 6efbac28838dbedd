//! Depth-first traversal of the move graph stored in a repertoire
//!
//! The graph is never materialised: starting from a position, each step asks
//! the repertoire for the moves stored there, plays them and descends.
//! Repertoires contain transpositions, so every child position is marked
//! visited before descending into it. A position reachable by two paths is
//! therefore expanded only under the first path found.

use std::collections::HashSet;

use shakmaty::{Chess, Color, Move, Position};

use crate::codec::BookMove;
use crate::key::PositionKey;
use crate::repertoire::{Repertoire, Section};
use crate::schedule::now_minutes;
use crate::storage::Record;

/// One stored edge met during traversal.
#[derive(Debug, Clone)]
pub struct Visit {
    /// Position before the move
    pub position: Chess,
    pub mv: Move,
    pub record: Record,
    /// Plies below the start position at which `position` sits
    pub depth: usize,
}

/// Which records a traversal yields. Traversal always descends through all of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisitFilter {
    All,
    /// Records with a schedule, due or not
    Scheduled,
    /// Scheduled records whose due time has arrived
    Due,
}

struct Frame {
    position: Chess,
    records: Vec<Record>,
    next: usize,
}

/// Iterator over (position, move, record) in depth-first pre-order.
pub struct TreeVisitor<'a> {
    rep: &'a Repertoire,
    section: Section,
    player: Option<Color>,
    filter: VisitFilter,
    now: u32,
    visited: HashSet<PositionKey>,
    stack: Vec<Frame>,
}

impl<'a> TreeVisitor<'a> {
    /// Yields the moves of `section`'s side (every move for tactics) below `start`.
    pub fn new(rep: &'a Repertoire, section: Section, start: &Chess) -> Self {
        let mut visitor = Self {
            rep,
            section,
            player: section.player(),
            filter: VisitFilter::All,
            now: now_minutes(),
            visited: HashSet::new(),
            stack: Vec::new(),
        };
        visitor.visited.insert(PositionKey::of(start));
        visitor.push(start.clone());
        visitor
    }

    /// Yield moves of both sides.
    pub fn every_turn(mut self) -> Self {
        self.player = None;
        self
    }

    /// Yield only moves made with `player` to move; `None` yields every move.
    pub fn for_player(mut self, player: Option<Color>) -> Self {
        self.player = player;
        self
    }

    pub fn only_due(mut self) -> Self {
        self.filter = VisitFilter::Due;
        self
    }

    pub fn only_scheduled(mut self) -> Self {
        self.filter = VisitFilter::Scheduled;
        self
    }

    /// Judge due times against `now` (minutes since the epoch) instead of the clock.
    pub fn at_time(mut self, now: u32) -> Self {
        self.now = now;
        self
    }

    /// Treat these positions as already visited.
    pub fn skip<I: IntoIterator<Item = PositionKey>>(mut self, keys: I) -> Self {
        self.visited.extend(keys);
        self
    }

    fn push(&mut self, position: Chess) {
        let records = self.rep.find_records(self.section, &position).collect();
        self.stack.push(Frame {
            position,
            records,
            next: 0,
        });
    }

    fn accepts(&self, position: &Chess, record: &Record) -> bool {
        let on_turn = self.player.map_or(true, |p| position.turn() == p);
        on_turn
            && match self.filter {
                VisitFilter::All => true,
                VisitFilter::Scheduled => record.is_scheduled(),
                VisitFilter::Due => record.is_due(self.now),
            }
    }
}

impl Iterator for TreeVisitor<'_> {
    type Item = Visit;

    fn next(&mut self) -> Option<Visit> {
        loop {
            let depth = self.stack.len().checked_sub(1)?;
            let frame = self.stack.last_mut()?;
            let Some(record) = frame.records.get(frame.next).copied() else {
                self.stack.pop();
                continue;
            };
            frame.next += 1;

            let shape = BookMove::decode(record.raw_move);
            let Some(mv) = shape.to_move(&frame.position) else {
                log::warn!("stored move {} is not legal at {}, skipping", shape, record.key);
                continue;
            };
            let position = frame.position.clone();
            let mut child = position.clone();
            child.play_unchecked(&mv);
            if !self.visited.insert(PositionKey::of(&child)) {
                continue;
            }

            let emit = self.accepts(&position, &record);
            self.push(child);
            if emit {
                return Some(Visit {
                    position,
                    mv,
                    record,
                    depth,
                });
            }
        }
    }
}

/// The first due entry below `start`, in traversal order.
pub fn next_due(rep: &Repertoire, section: Section, start: &Chess) -> Option<Visit> {
    TreeVisitor::new(rep, section, start).only_due().next()
}

/// Scheduled entries below `start`, soonest due first, at most `limit` of them.
pub fn due_schedule(rep: &Repertoire, section: Section, start: &Chess, limit: usize) -> Vec<Visit> {
    let mut visits: Vec<Visit> = TreeVisitor::new(rep, section, start)
        .only_scheduled()
        .collect();
    earliest(&mut visits, limit, |v| v.record.learn);
    visits
}

/// Scheduled records of `section`, soonest due first, at most `limit`.
///
/// Flat scan of the tables; no position filtering and no traversal.
pub fn upcoming(rep: &Repertoire, section: Section, limit: usize) -> Vec<Record> {
    let mut records: Vec<Record> = rep
        .tables(section)
        .into_iter()
        .flat_map(|table| table.iter())
        .filter(Record::is_scheduled)
        .collect();
    earliest(&mut records, limit, |r| r.learn);
    records
}

// Keep the `limit` smallest by key, sorted; selection first so only the prefix is sorted
fn earliest<T, F: FnMut(&T) -> u32>(items: &mut Vec<T>, limit: usize, mut key: F) {
    if limit == 0 {
        items.clear();
        return;
    }
    if limit < items.len() {
        items.select_nth_unstable_by_key(limit - 1, &mut key);
        items.truncate(limit);
    }
    items.sort_by_key(key);
}

/// Make every position below `start` where the trained side is to move learnable.
///
/// Tactics train the side to move at `start`. Returns the number of records changed.
pub fn set_subtree_learnable(rep: &mut Repertoire, section: Section, start: &Chess, override_existing: bool) -> usize {
    let player = section.player().unwrap_or_else(|| start.turn());
    let mut seen = HashSet::new();
    let positions: Vec<Chess> = TreeVisitor::new(rep, section, start)
        .for_player(Some(player))
        .filter(|v| seen.insert(PositionKey::of(&v.position)))
        .map(|v| v.position)
        .collect();
    positions
        .iter()
        .map(|pos| rep.make_learnable(pos, section, override_existing))
        .sum()
}
