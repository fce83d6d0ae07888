//! # Energy Index
//!
//! Time-hierarchical store for energy meter readings. Each reading carries
//! five counters (autoconsumption, export, import, consumption,
//! production) and is filed under year, month, day and six-hour bucket.
//!
//! ## Features
//!
//! - **Chronological index**: ordered tree with lazily created nodes and
//!   a cursor that walks every reading oldest first
//! - **Range aggregates**: sum, count, average, tolerance search and
//!   period comparison over one selectable field
//! - **CSV import**: meter exports with per-line rejection reasons and
//!   optional import logs
//! - **Snapshots**: checksummed binary file for persisting the index
//!
//! ## Modules
//!
//! - [`storage`]: Reading types, timestamps and the snapshot format
//! - [`index`]: The year/month/day/bucket tree and its cursor
//! - [`query`]: Field selection and range aggregates
//! - [`import`]: Delimited-text import
//! - [`shell`]: Interactive menu
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use energy_index::{Analyzer, CsvImporter, EnergyIndex, Field, TimeRange, Timestamp};
//! use energy_index::storage::snapshot;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut index = EnergyIndex::new();
//!
//!     let report = CsvImporter::new().import("export.csv".as_ref(), &mut index)?;
//!     println!("Imported {} readings", report.accepted);
//!
//!     let february = TimeRange::between(
//!         &Timestamp::date(2021, 2, 1),
//!         &Timestamp::new(2021, 2, 28, 23, 59, 59),
//!     );
//!     let produced = Analyzer::new(&index).sum(february, Field::Production);
//!     println!("Produced in February: {:.2}", produced);
//!
//!     snapshot::save(&index, "energy.bin")?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod import;
pub mod index;
pub mod query;
pub mod shell;
pub mod storage;

// Re-export top-level types for convenience
pub use storage::{LoadSummary, Measurement, StorageError, StorageResult, TimeRange, Timestamp};

pub use index::{Bucket, Cursor, EnergyIndex, IndexStats};

pub use query::{Analyzer, Comparison, Field, SearchHit};

pub use import::{CsvImporter, ImportError, ImportReport, LineError};

pub use config::{Config, ConfigDiscovery, ConfigError, ImportConfig, LoggingConfig};

pub use shell::Shell;
