//! Doc-Tracker: a change-tracking snapshot archiver for documentation sites
//!
//! This crate re-crawls every page listed in a site's navigation tree, decides whether
//! each page is new, changed or unchanged since the last crawl, and keeps a dated
//! history of every page version it has ever observed.

pub mod config;
pub mod crawler;
pub mod output;
pub mod state;
pub mod storage;
pub mod toc;
pub mod url;

use thiserror::Error;

/// Main error type for Doc-Tracker operations
#[derive(Debug, Error)]
pub enum TrackerError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("Enumeration error: {0}")]
    Enumeration(#[from] toc::EnumerationError),

    #[error("Output error: {0}")]
    Output(#[from] output::OutputError),

    #[error("URL error: {0}")]
    Url(#[from] UrlError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("URL has no path segment to derive a slug from: {0}")]
    MissingSlug(String),
}

/// Result type alias for Doc-Tracker operations
pub type Result<T> = std::result::Result<T, TrackerError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{Coordinator, SnapshotEngine};
pub use output::RunStats;
pub use state::Outcome;
pub use storage::{SnapshotStore, VersionKey};
pub use url::{slug_from_url, Slug};
