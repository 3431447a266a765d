//! Database schema definitions
//!
//! This module contains the SQL schema for the Site-Gleaner page database.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- One row per extracted page, keyed by the URL hash
CREATE TABLE IF NOT EXISTS pages (
    id TEXT PRIMARY KEY,
    url TEXT NOT NULL,
    title TEXT NOT NULL,
    text TEXT NOT NULL,
    retrieved_at TEXT NOT NULL,
    source TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_pages_source ON pages(source);
"#;

/// Upsert used for every record write
pub const UPSERT_PAGE_SQL: &str = r#"
INSERT INTO pages (id, url, title, text, retrieved_at, source)
VALUES (?1, ?2, ?3, ?4, ?5, ?6)
ON CONFLICT(id) DO UPDATE SET
    url = excluded.url,
    title = excluded.title,
    text = excluded.text,
    retrieved_at = excluded.retrieved_at,
    source = excluded.source
"#;

/// Initializes the database schema
///
/// # Arguments
///
/// * `conn` - The database connection
///
/// # Returns
///
/// * `Ok(())` - Schema initialized successfully
/// * `Err(rusqlite::Error)` - Failed to initialize schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
