//! Crawler module for page fetching and snapshot decisions
//!
//! This module contains the core tracking logic, including:
//! - HTTP fetching behind the `Fetcher` trait
//! - Declared-date extraction from page HTML
//! - The per-URL snapshot engine
//! - Overall run coordination

mod coordinator;
mod engine;
mod fetcher;
mod parser;

pub use coordinator::{run_crawl, Coordinator};
pub use engine::{commit_snapshot, Clock, Decision, SnapshotEngine, SystemClock};
pub use fetcher::{build_http_client, user_agent_string, FetchError, FetchedPage, Fetcher, HttpFetcher};
pub use parser::{extract_time_element_date, DateResolver, TimeElementResolver};
