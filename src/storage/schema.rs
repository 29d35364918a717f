//! Database schema definitions
//!
//! This module contains the SQL schema for the SQLite snapshot backend.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- One row per stored page version
CREATE TABLE IF NOT EXISTS snapshots (
    slug TEXT NOT NULL,
    version_key TEXT NOT NULL,
    body BLOB NOT NULL,
    captured_at TEXT NOT NULL,
    PRIMARY KEY (slug, version_key)
);
"#;

/// Current schema version, recorded in `PRAGMA user_version`
pub const SCHEMA_VERSION: u32 = 1;

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
    conn.pragma_update(None, "user_version", SCHEMA_VERSION)?;
    Ok(())
}

/// Reads the schema version stored in the database
pub fn get_schema_version(conn: &rusqlite::Connection) -> Result<u32, rusqlite::Error> {
    conn.pragma_query_value(None, "user_version", |row| row.get(0))
}
