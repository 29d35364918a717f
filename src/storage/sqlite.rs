//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the SnapshotStore trait,
//! an alternative to the directory tree for sites with many small pages.

use crate::storage::schema::{get_schema_version, initialize_schema, SCHEMA_VERSION};
use crate::storage::traits::{SnapshotStore, StorageError, StorageResult};
use crate::storage::{Snapshot, VersionKey};
use crate::url::Slug;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

/// SQLite snapshot backend
pub struct SqliteSnapshotStore {
    conn: Mutex<Connection>,
}

impl SqliteSnapshotStore {
    /// Creates a new SqliteSnapshotStore instance
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteSnapshotStore)` - Successfully opened/created database
    /// * `Err(StorageError)` - Failed to open database
    pub fn new(path: &Path) -> StorageResult<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        let found = get_schema_version(&conn)?;
        if found > SCHEMA_VERSION {
            return Err(StorageError::Corrupt(format!(
                "database schema version {} is newer than supported version {}",
                found, SCHEMA_VERSION
            )));
        }

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

    fn conn(&self) -> StorageResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StorageError::LockPoisoned)
    }
}

impl SnapshotStore for SqliteSnapshotStore {
    fn list_versions(&self, slug: &Slug) -> StorageResult<Vec<VersionKey>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare("SELECT version_key FROM snapshots WHERE slug = ?1")?;

        let keys = stmt
            .query_map(params![slug.as_str()], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;

        let mut versions = Vec::with_capacity(keys.len());
        for key in keys {
            match key.parse::<VersionKey>() {
                Ok(version) => versions.push(version),
                Err(e) => tracing::warn!("Skipping row for slug {}: {}", slug, e),
            }
        }

        Ok(versions)
    }

    fn read_snapshot(&self, slug: &Slug, version: &VersionKey) -> StorageResult<Snapshot> {
        let conn = self.conn()?;
        let row = conn
            .query_row(
                "SELECT body, captured_at FROM snapshots WHERE slug = ?1 AND version_key = ?2",
                params![slug.as_str(), version.to_string()],
                |row| Ok((row.get::<_, Vec<u8>>(0)?, row.get::<_, String>(1)?)),
            )
            .optional()?;

        let (body, captured_at) = row.ok_or_else(|| StorageError::not_found(slug, version))?;

        let captured_at = DateTime::parse_from_rfc3339(&captured_at)
            .map_err(|e| {
                StorageError::Corrupt(format!(
                    "captured_at '{}' for {}@{}: {}",
                    captured_at, slug, version, e
                ))
            })?
            .with_timezone(&Utc);

        Ok(Snapshot {
            slug: slug.clone(),
            version: *version,
            body,
            captured_at,
        })
    }

    fn write(
        &self,
        slug: &Slug,
        version: &VersionKey,
        body: &[u8],
        captured_at: DateTime<Utc>,
    ) -> StorageResult<()> {
        self.conn()?.execute(
            "INSERT INTO snapshots (slug, version_key, body, captured_at)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(slug, version_key)
             DO UPDATE SET body = excluded.body, captured_at = excluded.captured_at",
            params![slug.as_str(), version.to_string(), body, captured_at.to_rfc3339()],
        )?;
        Ok(())
    }

    fn exists(&self, slug: &Slug) -> StorageResult<bool> {
        let found: Option<i64> = self
            .conn()?
            .query_row(
                "SELECT 1 FROM snapshots WHERE slug = ?1 LIMIT 1",
                params![slug.as_str()],
                |row| row.get(0),
            )
            .optional()?;
        Ok(found.is_some())
    }
}
