//! Output module for run statistics and reports
//!
//! This module handles:
//! - Tallying per-URL outcomes into one `RunStats` record per run
//! - Persisting that record through a `StatsSink` (JSON files by default)
//! - Generating markdown summaries of a run

mod json;
mod markdown;
pub mod stats;
mod traits;

pub use json::{latest_stats, load_stats, JsonStatsSink};
pub use markdown::{format_markdown_summary, generate_markdown_summary};
pub use stats::{print_statistics, RunStats};
pub use traits::{OutputError, OutputResult, StatsSink};
