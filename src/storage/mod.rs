//! On-disk tables
//!
//! All tables are memory-mapped files of fixed-size slots kept sorted by a
//! leading 64-bit position key.

pub mod comments;
pub mod record;
pub mod slots;
pub mod table;

pub use self::comments::{CommentTable, COMMENT_SIZE, COMMENT_TEXT_SIZE};
pub use self::record::{Record, RECORD_SIZE};
pub use self::slots::SlotFile;
pub use self::table::{FindAll, MoveTable};
