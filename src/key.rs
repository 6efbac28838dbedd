// Position keys: Polyglot-compatible Zobrist hashing on top of shakmaty
use std::fmt;

use shakmaty::fen::Fen;
use shakmaty::zobrist::{Zobrist64, ZobristHash};
use shakmaty::{CastlingMode, Chess, EnPassantMode};

use crate::error::{Error, Result};

/// 64-bit Zobrist key of a position, the sole sort key of every table.
///
/// Halfmove and fullmove counters do not contribute. En passant only counts
/// when a capture is actually possible, as in the Polyglot book format, so
/// keys stay compatible with ordinary `.bin` books.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct PositionKey(pub u64);

impl PositionKey {
    pub fn of(pos: &Chess) -> Self {
        let hash: Zobrist64 = pos.zobrist_hash(EnPassantMode::Legal);
        PositionKey(hash.0)
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl From<u64> for PositionKey {
    fn from(key: u64) -> Self {
        PositionKey(key)
    }
}

impl fmt::Display for PositionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

/// Parse a FEN into a legal standard-chess position.
pub fn parse_fen(fen: &str) -> Result<Chess> {
    let invalid = |reason: String| Error::InvalidFen {
        fen: fen.to_string(),
        reason,
    };
    let parsed = Fen::from_ascii(fen.trim().as_bytes()).map_err(|e| invalid(e.to_string()))?;
    parsed
        .into_position(CastlingMode::Standard)
        .map_err(|e| invalid(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use shakmaty::{Position, Square};

    #[test]
    fn start_position_matches_polyglot() {
        assert_eq!(PositionKey::of(&Chess::default()).get(), 0x463b96181691fc9c);
    }

    #[test]
    fn e4_matches_polyglot() {
        let mut pos = Chess::default();
        let mv = pos
            .legal_moves()
            .into_iter()
            .find(|m| m.from() == Some(Square::E2) && m.to() == Square::E4)
            .expect("e2e4 is legal");
        pos.play_unchecked(&mv);
        assert_eq!(PositionKey::of(&pos).get(), 0x823c9b50fd114196);
    }

    #[test]
    fn move_counters_do_not_matter() {
        let a = parse_fen("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1").unwrap();
        let b = parse_fen("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 17 42").unwrap();
        assert_eq!(PositionKey::of(&a), PositionKey::of(&b));
    }

    #[test]
    fn bad_fen_is_reported() {
        assert!(matches!(parse_fen("not a fen"), Err(Error::InvalidFen { .. })));
    }
}
