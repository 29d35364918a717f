//! Storage traits and error types
//!
//! This module defines the key-value interface every snapshot backend implements
//! and the errors those backends report.

use crate::storage::{Snapshot, VersionKey};
use crate::url::Slug;
use chrono::{DateTime, Utc};
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Snapshot not found: {slug}@{version}")]
    NotFound { slug: String, version: String },

    #[error("Invalid version key: {0}")]
    InvalidVersionKey(String),

    #[error("Corrupt snapshot record: {0}")]
    Corrupt(String),

    #[error("Storage lock poisoned")]
    LockPoisoned,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

impl StorageError {
    pub(crate) fn not_found(slug: &Slug, version: &VersionKey) -> Self {
        Self::NotFound {
            slug: slug.to_string(),
            version: version.to_string(),
        }
    }
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Slug-partitioned, version-keyed storage of page bodies
///
/// The store knows nothing about HTTP or dates; it only needs `VersionKey`'s
/// ordering. `write` is the only mutating operation. Writes to different slugs never
/// interfere; callers serialise concurrent writes to the same `(slug, version)`.
pub trait SnapshotStore: Send + Sync {
    /// Lists every version currently stored for `slug`, in no particular order
    ///
    /// An unknown slug yields an empty list.
    fn list_versions(&self, slug: &Slug) -> StorageResult<Vec<VersionKey>>;

    /// Reads a full snapshot record
    ///
    /// Fails with `StorageError::NotFound` if the version is absent.
    fn read_snapshot(&self, slug: &Slug, version: &VersionKey) -> StorageResult<Snapshot>;

    /// Stores `body` at `(slug, version)`, creating the slug partition if needed and
    /// replacing any previous body at that version
    ///
    /// `captured_at` is returned as the snapshot's capture time by `read_snapshot`.
    fn write(
        &self,
        slug: &Slug,
        version: &VersionKey,
        body: &[u8],
        captured_at: DateTime<Utc>,
    ) -> StorageResult<()>;

    /// Whether any snapshot has ever been stored for `slug`
    fn exists(&self, slug: &Slug) -> StorageResult<bool> {
        Ok(!self.list_versions(slug)?.is_empty())
    }

    /// Reads the body stored at `(slug, version)`
    fn read(&self, slug: &Slug, version: &VersionKey) -> StorageResult<Vec<u8>> {
        Ok(self.read_snapshot(slug, version)?.body)
    }

    /// Chronologically latest version for `slug`
    fn latest_version(&self, slug: &Slug) -> StorageResult<Option<VersionKey>> {
        Ok(self.list_versions(slug)?.into_iter().max())
    }

    /// Snapshot at the latest version, if the slug has any
    fn latest_snapshot(&self, slug: &Slug) -> StorageResult<Option<Snapshot>> {
        self.latest_version(slug)?
            .map(|version| self.read_snapshot(slug, &version))
            .transpose()
    }

    /// All versions for `slug`, oldest first
    fn history(&self, slug: &Slug) -> StorageResult<Vec<VersionKey>> {
        let mut versions = self.list_versions(slug)?;
        versions.sort();
        Ok(versions)
    }
}
