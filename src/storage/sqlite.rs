//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the PageStore trait.

use crate::storage::schema::{initialize_schema, UPSERT_PAGE_SQL};
use crate::storage::traits::{PageStore, StorageError, StorageResult};
use crate::storage::PageRecord;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::Mutex;

/// SQLite storage backend
///
/// The connection is guarded by a mutex so retrieval workers can share one
/// store.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Creates a new SqliteStore instance
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteStore)` - Successfully opened/created database
    /// * `Err(StorageError)` - Failed to open database
    pub fn new(path: &Path) -> StorageResult<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;

        // Configure SQLite for better performance
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Creates an in-memory database (for testing)
    #[cfg(test)]
    pub fn new_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn with_conn<T>(&self, f: impl FnOnce(&Connection) -> StorageResult<T>) -> StorageResult<T> {
        let conn = self.conn.lock().map_err(|_| StorageError::Poisoned)?;
        f(&conn)
    }
}

impl PageStore for SqliteStore {
    fn save(&self, record: &PageRecord) -> StorageResult<()> {
        self.with_conn(|conn| {
            conn.execute(
                UPSERT_PAGE_SQL,
                params![
                    record.id,
                    record.url,
                    record.title,
                    record.text,
                    record.retrieved_at,
                    record.source
                ],
            )?;
            Ok(())
        })
    }

    fn load(&self, id: &str) -> StorageResult<Option<PageRecord>> {
        self.with_conn(|conn| {
            let record = conn
                .query_row(
                    "SELECT id, url, title, text, retrieved_at, source FROM pages WHERE id = ?1",
                    params![id],
                    |row| {
                        Ok(PageRecord {
                            id: row.get(0)?,
                            url: row.get(1)?,
                            title: row.get(2)?,
                            text: row.get(3)?,
                            retrieved_at: row.get(4)?,
                            source: row.get(5)?,
                        })
                    },
                )
                .optional()?;
            Ok(record)
        })
    }

    fn count(&self) -> StorageResult<usize> {
        self.with_conn(|conn| {
            let count: i64 = conn.query_row("SELECT COUNT(*) FROM pages", [], |row| row.get(0))?;
            Ok(count as usize)
        })
    }
}
