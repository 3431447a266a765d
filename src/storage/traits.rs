//! Storage traits and error types
//!
//! This module defines the trait interface for record stores and the
//! associated error types.

use crate::storage::PageRecord;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Store lock poisoned")]
    Poisoned,
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Destination for extracted page records
///
/// Writes are keyed by `PageRecord::id`; saving a record whose id already
/// exists replaces the previous one. Each `save` is atomic: a reader never
/// observes a partially written record.
pub trait PageStore: Send + Sync {
    /// Writes a record, overwriting any record with the same id
    fn save(&self, record: &PageRecord) -> StorageResult<()>;

    /// Loads a record by id
    fn load(&self, id: &str) -> StorageResult<Option<PageRecord>>;

    /// Number of records currently stored
    fn count(&self) -> StorageResult<usize>;
}
