//! Storage error types
//!
//! Errors raised while writing or reading index snapshots.

use thiserror::Error;

/// Errors that can occur in the storage layer
#[derive(Error, Debug)]
pub enum StorageError {
    /// I/O operation failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Data corruption detected (checksum mismatch, truncated record, etc.)
    #[error("Corrupt data: {0}")]
    Corruption(String),

    /// Snapshot header is not one we can read
    #[error("Invalid snapshot format: {0}")]
    InvalidSnapshot(String),

    /// Snapshot has more records than the format can describe
    #[error("Snapshot too large: {0} records")]
    TooManyRecords(usize),
}

/// Result type alias for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = StorageError::Corruption("record 3 checksum mismatch".to_string());
        assert_eq!(err.to_string(), "Corrupt data: record 3 checksum mismatch");

        let err = StorageError::InvalidSnapshot("bad magic".to_string());
        assert_eq!(err.to_string(), "Invalid snapshot format: bad magic");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let storage_err: StorageError = io_err.into();
        assert!(matches!(storage_err, StorageError::Io(_)));
    }
}
