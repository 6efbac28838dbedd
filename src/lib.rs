//! Memory-mapped opening repertoire store with spaced-repetition training.
//!
//! Chess rules come from shakmaty; this crate stores (position, move) edges in
//! Polyglot-layout tables and schedules their review.

pub mod codec;
pub mod config;
pub mod error;
pub mod key;
pub mod opening;
pub mod repertoire;
pub mod schedule;
pub mod storage;
pub mod visitor;

pub use crate::codec::{BookMove, RawMove};
pub use crate::config::Config;
pub use crate::error::{Error, Result};
pub use crate::key::{parse_fen, PositionKey};
pub use crate::repertoire::{Repertoire, Section};
pub use crate::schedule::{Quality, SchedulerParams, SchedulerTriple};
pub use crate::storage::{MoveTable, Record};
pub use crate::visitor::{TreeVisitor, Visit};
