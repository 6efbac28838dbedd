//! Spaced-repetition scheduling
//!
//! Pure scheduling math plus per-session bookkeeping. Nothing here touches
//! storage directly; the repertoire reads a record, runs the scheduler and
//! writes the packed result back.

pub mod params;
pub mod session;
pub mod sm2;

pub use self::params::SchedulerParams;
pub use self::session::{Answer, TrainingSession};
pub use self::sm2::{now_minutes, pack, unpack, update, Quality, SchedulerTriple};
