//! Energy Storage
//!
//! Value types shared by every layer and the on-disk snapshot format:
//!
//! - **types**: Core data structures (Timestamp, Measurement, TimeRange)
//! - **snapshot**: Binary persistence of a whole index
//! - **error**: Error types
//!
//! # Architecture
//!
//! ```text
//! Save Path:
//!   EnergyIndex → Cursor (oldest first) → fixed-width records → file
//!
//! Load Path:
//!   file → verify header → decode record → EnergyIndex::insert
//! ```
//!
//! # Example
//!
//! ```rust,no_run
//! use energy_index::index::EnergyIndex;
//! use energy_index::storage::{snapshot, Measurement, Timestamp};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut index = EnergyIndex::new();
//!     index.insert(Measurement::at(Timestamp::new(2021, 2, 1, 0, 0, 0)).production(100.0));
//!
//!     snapshot::save(&index, "./energy.bin")?;
//!
//!     let mut restored = EnergyIndex::new();
//!     let summary = snapshot::load(&mut restored, "./energy.bin")?;
//!     assert_eq!(summary.loaded, 1);
//!
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod snapshot;
pub mod types;

// Re-export commonly used types
pub use error::{StorageError, StorageResult};
pub use snapshot::LoadSummary;
pub use types::{Measurement, TimeRange, Timestamp, BUCKET_HOURS, INPUT_FORMATS};
