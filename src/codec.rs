//! Move codec: compact 16-bit Polyglot-style move encoding
//!
//! Squares use the shakmaty numbering (A1 = 0, B1 = 1, ..., H8 = 63; file varies fastest).
//!
//! Layout of a raw move:
//! - bits 0-5: to square
//! - bits 6-11: from square
//! - bits 12-14: promotion (0 none, 1 knight, 2 bishop, 3 rook, 4 queen)
//!
//! Castling is stored king-takes-rook (e1h1), which is how both shakmaty and
//! Polyglot books represent it. Books written by older tools hold the king's
//! destination (e1g1) instead; [`raw_forms`] yields both so lookups match either.

use std::fmt;

use shakmaty::uci::UciMove;
use shakmaty::{CastlingMode, Chess, Color, Move, Position, Rank, Role, Square};

use crate::error::{Error, Result};

/// Encoded move as stored in a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct RawMove(pub u16);

/// Board-independent move shape: squares and an optional promotion.
///
/// No legality is implied; `to_move` asks the position for the matching legal move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BookMove {
    pub from: Square,
    pub to: Square,
    pub promotion: Option<Role>,
}

fn promotion_code(role: Option<Role>) -> u16 {
    match role {
        None => 0,
        Some(Role::Knight) => 1,
        Some(Role::Bishop) => 2,
        Some(Role::Rook) => 3,
        Some(Role::Queen) => 4,
        // Pawn/king promotions do not exist in standard chess
        Some(_) => 0,
    }
}

fn promotion_role(code: u16) -> Option<Role> {
    match code {
        1 => Some(Role::Knight),
        2 => Some(Role::Bishop),
        3 => Some(Role::Rook),
        4 => Some(Role::Queen),
        _ => None,
    }
}

impl BookMove {
    pub fn new(from: Square, to: Square, promotion: Option<Role>) -> Self {
        Self { from, to, promotion }
    }

    pub fn encode(&self) -> RawMove {
        let to = self.to as u16;
        let from = self.from as u16;
        RawMove((promotion_code(self.promotion) << 12) | (from << 6) | to)
    }

    pub fn decode(raw: RawMove) -> Self {
        let bits = raw.0;
        Self {
            to: Square::new(u32::from(bits & 0x3F)),
            from: Square::new(u32::from((bits >> 6) & 0x3F)),
            promotion: promotion_role((bits >> 12) & 0x7),
        }
    }

    /// Find the legal move in `pos` with this shape.
    ///
    /// Castling matches both the king-takes-rook form and the king's
    /// destination square (e1g1), so books written by other tools still resolve.
    pub fn to_move(&self, pos: &Chess) -> Option<Move> {
        let turn = pos.turn();
        pos.legal_moves().into_iter().find(|m| {
            if m.from() != Some(self.from) || m.promotion() != self.promotion {
                return false;
            }
            m.to() == self.to
                || m
                    .castling_side()
                    .map_or(false, |side| side.king_to(turn) == self.to)
        })
    }
}

impl From<&Move> for BookMove {
    fn from(m: &Move) -> Self {
        Self {
            from: m.from().unwrap_or_else(|| m.to()),
            to: m.to(),
            promotion: m.promotion(),
        }
    }
}

impl From<BookMove> for RawMove {
    fn from(m: BookMove) -> Self {
        m.encode()
    }
}

impl From<RawMove> for BookMove {
    fn from(raw: RawMove) -> Self {
        BookMove::decode(raw)
    }
}

impl fmt::Display for BookMove {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.from, self.to)?;
        if let Some(role) = self.promotion {
            write!(f, "{}", role.char())?;
        }
        Ok(())
    }
}

/// Encode a legal move straight to its raw form.
pub fn encode(m: &Move) -> RawMove {
    BookMove::from(m).encode()
}

/// Every raw form a stored record of `m` may carry, canonical form first.
///
/// Castling has two: king-takes-rook and king-to-destination.
pub fn raw_forms(m: &Move) -> Vec<RawMove> {
    let stored = encode(m);
    match (m, m.castling_side()) {
        (Move::Castle { king, .. }, Some(side)) => {
            let color = Color::from_white(king.rank() == Rank::First);
            let king_form = BookMove::new(*king, side.king_to(color), None).encode();
            vec![stored, king_form]
        }
        _ => vec![stored],
    }
}

/// Resolve a UCI string (e.g. `e2e4`, `e7e8q`, `e1g1`) against a position.
pub fn parse_uci(pos: &Chess, uci: &str) -> Result<Move> {
    let illegal = || Error::IllegalMove {
        mv: uci.to_string(),
    };
    let parsed = UciMove::from_ascii(uci.trim().as_bytes()).map_err(|_| illegal())?;
    parsed.to_move(pos).map_err(|_| illegal())
}

/// UCI notation of a legal move, castling written as the king's move.
pub fn to_uci(m: &Move) -> String {
    m.to_uci(CastlingMode::Standard).to_string()
}
