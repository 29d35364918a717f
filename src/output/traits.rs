//! Output handler traits and error types
//!
//! This module defines the sink interface run statistics are written through.

use crate::output::RunStats;
use thiserror::Error;

/// Errors that can occur during output operations
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("Failed to serialize statistics: {0}")]
    Json(#[from] serde_json::Error),

    #[error("No statistics record found: {0}")]
    NotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;

/// Destination for the one statistics record each run produces
pub trait StatsSink: Send + Sync {
    /// Persists `stats`, replacing any earlier record for the same run date
    fn write(&self, stats: &RunStats) -> OutputResult<()>;
}
