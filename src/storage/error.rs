//! Storage error types
//!
//! Defines all errors that can occur while ingesting or retrieving blocks.

use std::path::PathBuf;
use thiserror::Error;

/// Why a single line could not be turned into a record
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RecordError {
    /// Line had no content at all
    #[error("empty line")]
    Empty,

    /// Leading field is not an integer
    #[error("invalid timestamp {0:?}")]
    InvalidTimestamp(String),

    /// A value field is not an integer
    #[error("invalid value {value:?} in field {field}")]
    InvalidValue { field: usize, value: String },
}

/// Errors that can occur in the block engine
#[derive(Error, Debug)]
pub enum StorageError {
    /// I/O operation failed (source unreadable, block unwritable)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Catalog or timestamp index database failed
    #[error("Database error: {0}")]
    Database(String),

    /// A line could not be parsed. `line` is 1-based within the input being parsed
    /// (the source file during ingestion, the block file during retrieval).
    #[error("Malformed record at line {line}: {source}")]
    MalformedRecord {
        line: u64,
        #[source]
        source: RecordError,
    },

    /// Block number is not cataloged, or its storage unit is gone
    #[error("Block not found: {0}")]
    BlockNotFound(u64),

    /// No block is indexed under this timestamp
    #[error("Timestamp not found: {0}")]
    TimestampNotFound(i64),

    /// Source path has no usable base name
    #[error("Invalid source: {0:?}")]
    InvalidSource(PathBuf),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialization/deserialization failed
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl StorageError {
    /// True for the two retrieval misses
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            StorageError::BlockNotFound(_) | StorageError::TimestampNotFound(_)
        )
    }
}

impl From<rusqlite::Error> for StorageError {
    fn from(err: rusqlite::Error) -> Self {
        StorageError::Database(err.to_string())
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        StorageError::Serialization(err.to_string())
    }
}

/// Result type alias for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = StorageError::BlockNotFound(7);
        assert_eq!(err.to_string(), "Block not found: 7");

        let err = StorageError::MalformedRecord {
            line: 3,
            source: RecordError::InvalidTimestamp("abc".to_string()),
        };
        assert_eq!(
            err.to_string(),
            "Malformed record at line 3: invalid timestamp \"abc\""
        );
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let storage_err: StorageError = io_err.into();
        assert!(matches!(storage_err, StorageError::Io(_)));
    }

    #[test]
    fn test_not_found_classification() {
        assert!(StorageError::BlockNotFound(0).is_not_found());
        assert!(StorageError::TimestampNotFound(100).is_not_found());
        assert!(!StorageError::Config("x".into()).is_not_found());
    }
}
