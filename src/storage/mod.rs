//! Storage module for persisting page snapshots
//!
//! This module owns every byte of page history, including:
//! - The `SnapshotStore` key-value interface (`exists`, `list_versions`, `read`, `write`)
//! - Typed, totally ordered version keys
//! - The directory-tree backend (the default durable layout)
//! - A SQLite backend with the same interface

mod fs;
mod schema;
mod sqlite;
mod traits;
mod version;

pub use fs::FsSnapshotStore;
pub use sqlite::SqliteSnapshotStore;
pub use traits::{SnapshotStore, StorageError, StorageResult};
pub use version::{VersionKey, UNDATED_PREFIX};

use crate::config::{OutputConfig, StoreBackend};
use crate::url::Slug;
use chrono::{DateTime, Utc};
use std::path::Path;
use std::sync::Arc;

/// One immutable stored capture of a page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub slug: Slug,
    pub version: VersionKey,
    pub body: Vec<u8>,
    pub captured_at: DateTime<Utc>,
}

/// Opens the snapshot store selected by the output configuration
///
/// # Arguments
///
/// * `config` - The output section of the configuration
///
/// # Returns
///
/// * `Ok(Arc<dyn SnapshotStore>)` - Ready-to-use store
/// * `Err(StorageError)` - The SQLite database could not be opened
pub fn open_store(config: &OutputConfig) -> StorageResult<Arc<dyn SnapshotStore>> {
    match config.backend {
        StoreBackend::Filesystem => {
            tracing::debug!("Using filesystem snapshot store at {}", config.store_root);
            Ok(Arc::new(FsSnapshotStore::new(
                &config.store_root,
                config.page_file.clone(),
            )))
        }
        StoreBackend::Sqlite => {
            let path = config.database_path.as_deref().unwrap_or_default();
            tracing::debug!("Using SQLite snapshot store at {}", path);
            Ok(Arc::new(SqliteSnapshotStore::new(Path::new(path))?))
        }
    }
}
