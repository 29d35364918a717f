//! Filesystem storage implementation
//!
//! The directory tree is the database:
//!
//! ```text
//! <root>/<slug>/2024-01-05/index.html
//! <root>/<slug>/nodt/20240110/index.html
//! <root>/<slug>/nodt/20240110_142501/index.html
//! ```
//!
//! A version exists when its page file exists. Directory names that are not valid
//! version keys are skipped.

use crate::storage::traits::{SnapshotStore, StorageError, StorageResult};
use crate::storage::version::UNDATED_PREFIX;
use crate::storage::{Snapshot, VersionKey};
use crate::url::Slug;
use chrono::{DateTime, Utc};
use std::fs::{self, File};
use std::io::{self, ErrorKind, Write};
use std::path::{Path, PathBuf};

/// Directory-tree snapshot backend rooted at an explicit store root
#[derive(Debug, Clone)]
pub struct FsSnapshotStore {
    root: PathBuf,
    page_file: String,
}

impl FsSnapshotStore {
    /// Creates a store rooted at `root`; nothing is created until the first write
    ///
    /// # Arguments
    ///
    /// * `root` - Store root directory
    /// * `page_file` - File name written inside every version directory
    pub fn new(root: impl Into<PathBuf>, page_file: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            page_file: page_file.into(),
        }
    }

    fn slug_dir(&self, slug: &Slug) -> PathBuf {
        self.root.join(slug.as_str())
    }

    /// Path of the page file for one version
    pub fn page_path(&self, slug: &Slug, version: &VersionKey) -> PathBuf {
        self.slug_dir(slug)
            .join(version.relative_path())
            .join(&self.page_file)
    }

    /// Collects version keys from the subdirectories of `dir`
    ///
    /// `prefix` is prepended to each directory name before parsing.
    fn collect_versions(
        &self,
        dir: &Path,
        prefix: Option<&str>,
        versions: &mut Vec<VersionKey>,
    ) -> io::Result<()> {
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }

            let name = entry.file_name();
            let Some(name) = name.to_str() else {
                tracing::warn!("Skipping non UTF-8 entry in {}", dir.display());
                continue;
            };

            if prefix.is_none() && name == UNDATED_PREFIX {
                self.collect_versions(&entry.path(), Some(UNDATED_PREFIX), versions)?;
                continue;
            }

            let key = match prefix {
                Some(prefix) => format!("{}/{}", prefix, name),
                None => name.to_string(),
            };

            match key.parse::<VersionKey>() {
                Ok(version) if entry.path().join(&self.page_file).is_file() => {
                    versions.push(version)
                }
                Ok(version) => {
                    tracing::debug!("Ignoring {} without {}", version, self.page_file)
                }
                Err(e) => tracing::warn!("Skipping {}: {}", entry.path().display(), e),
            }
        }

        Ok(())
    }
}

impl SnapshotStore for FsSnapshotStore {
    fn list_versions(&self, slug: &Slug) -> StorageResult<Vec<VersionKey>> {
        let mut versions = Vec::new();
        match self.collect_versions(&self.slug_dir(slug), None, &mut versions) {
            Ok(()) => Ok(versions),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(e.into()),
        }
    }

    fn read_snapshot(&self, slug: &Slug, version: &VersionKey) -> StorageResult<Snapshot> {
        let path = self.page_path(slug, version);

        let body = fs::read(&path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => StorageError::not_found(slug, version),
            _ => StorageError::Io(e),
        })?;

        let captured_at: DateTime<Utc> = fs::metadata(&path)?.modified()?.into();

        Ok(Snapshot {
            slug: slug.clone(),
            version: *version,
            body,
            captured_at,
        })
    }

    /// Writes through a temporary sibling file and renames it into place, so a
    /// reader never observes a half-written page. The capture time is kept as the
    /// file's modification time.
    fn write(
        &self,
        slug: &Slug,
        version: &VersionKey,
        body: &[u8],
        captured_at: DateTime<Utc>,
    ) -> StorageResult<()> {
        let path = self.page_path(slug, version);
        let dir = path
            .parent()
            .ok_or_else(|| StorageError::Corrupt(format!("no parent for {}", path.display())))?;

        fs::create_dir_all(dir)?;

        let tmp = dir.join(format!(".{}.tmp", self.page_file));
        let mut file = File::create(&tmp)?;
        file.write_all(body)?;
        file.set_modified(captured_at.into())?;
        drop(file);
        fs::rename(&tmp, &path)?;

        Ok(())
    }

    fn exists(&self, slug: &Slug) -> StorageResult<bool> {
        if !self.slug_dir(slug).is_dir() {
            return Ok(false);
        }
        Ok(!self.list_versions(slug)?.is_empty())
    }
}
