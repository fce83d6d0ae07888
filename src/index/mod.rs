//! Energy Index
//!
//! In-memory, time-hierarchical store of energy readings:
//!
//! - **EnergyIndex**: nested ordered maps year → month → day → bucket
//! - **Bucket**: sorted, duplicate-free readings of one 6-hour window
//! - **Cursor**: chronological traversal flattening the nesting
//!
//! # Architecture
//!
//! ```text
//! insert(reading)
//!        ↓
//! key path: (year, month, day, hour / 6)
//!        ↓
//! create missing nodes → Bucket::add → sorted insert or reject duplicate
//!
//! begin() → Cursor → bucket by bucket, oldest first → end()
//! ```

mod bucket;
mod cursor;
mod tree;

pub use bucket::Bucket;
pub use cursor::Cursor;
pub use tree::{DayNode, EnergyIndex, IndexStats, MonthNode, YearNode};
