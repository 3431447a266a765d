//! Storage module for persisting page records
//!
//! This module handles writing extracted pages, including:
//! - The `PageRecord` shape shared by every backend
//! - JSON-file and SQLite `PageStore` implementations
//! - Opening the configured backend

mod json;
mod memory;
mod schema;
mod sqlite;
mod traits;

pub use json::JsonFileStore;
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;
pub use traits::{PageStore, StorageError, StorageResult};

use crate::config::{OutputConfig, OutputFormat};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;

/// One extracted page
///
/// `id` is derived from `url` alone, so refetching a page produces a record
/// with the same id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRecord {
    pub id: String,
    pub url: String,
    pub title: String,
    pub text: String,
    pub retrieved_at: String,
    pub source: String,
}

/// Opens the store selected by the output configuration
///
/// # Arguments
///
/// * `config` - The output configuration
///
/// # Returns
///
/// * `Ok(Arc<dyn PageStore>)` - A store ready to be shared across workers
/// * `Err(StorageError)` - The directory or database could not be opened
pub fn open_store(config: &OutputConfig) -> StorageResult<Arc<dyn PageStore>> {
    let path = Path::new(&config.path);

    let store: Arc<dyn PageStore> = match config.format {
        OutputFormat::Json => Arc::new(JsonFileStore::new(path)?),
        OutputFormat::Sqlite => Arc::new(SqliteStore::new(path)?),
    };

    tracing::info!("Writing {} records to {}", config.format, path.display());
    Ok(store)
}
