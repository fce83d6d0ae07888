//! Text Import
//!
//! Loads meter exports into the energy index:
//! - Delimited text (`;`-separated by default), one reading per line
//! - Optional per-import log files listing accepted and rejected lines

mod csv_import;
mod log;

pub use csv_import::{CsvImporter, ImportReport, DEFAULT_TIMESTAMP_FORMAT, FALLBACK_TIMESTAMP_FORMATS};
pub use log::ImportLog;

use crate::storage::Timestamp;

/// Reason a single line was not imported
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LineError {
    #[error("Empty line")]
    Empty,

    #[error("Incomplete line: expected 6 fields, found {0}")]
    Incomplete(usize),

    #[error("Invalid timestamp: {0}")]
    Timestamp(String),

    #[error("Invalid number in column {column}: {value}")]
    Number { column: usize, value: String },

    #[error("Duplicate timestamp: {0}")]
    Duplicate(Timestamp),

    #[error("Malformed line: {0}")]
    Malformed(String),
}

/// Errors that abort an import as a whole
#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
