//! Crawler coordinator - one run over the whole navigation tree
//!
//! This module contains the run loop that ties the other parts together:
//! - Enumerating the URL list from the navigation tree (fatal on failure)
//! - Driving the snapshot engine once per URL, in enumeration order
//! - Tallying outcomes into `RunStats`
//! - Handing the finished record to the statistics sink and the optional summary

use crate::config::Config;
use crate::crawler::engine::{Clock, SnapshotEngine};
use crate::crawler::fetcher::{Fetcher, HttpFetcher};
use crate::output::{generate_markdown_summary, JsonStatsSink, RunStats, StatsSink};
use crate::storage::{open_store, SnapshotStore};
use crate::toc::load_urls;
use crate::TrackerError;
use chrono::Utc;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

/// Main run coordinator structure
pub struct Coordinator {
    config: Arc<Config>,
    config_hash: String,
    fetcher: Arc<dyn Fetcher>,
    engine: SnapshotEngine,
    sink: Box<dyn StatsSink>,
}

impl Coordinator {
    /// Creates a new coordinator instance
    ///
    /// # Arguments
    ///
    /// * `config` - The tracker configuration
    /// * `config_hash` - Hash of the configuration file, recorded in the run statistics
    ///
    /// # Returns
    ///
    /// * `Ok(Coordinator)` - Successfully created coordinator
    /// * `Err(TrackerError)` - Failed to build the HTTP client or open the store
    pub fn new(config: Config, config_hash: impl Into<String>) -> Result<Self, TrackerError> {
        let fetcher: Arc<dyn Fetcher> = Arc::new(HttpFetcher::from_config(&config)?);
        let store = open_store(&config.output)?;

        Ok(Self::with_parts(config, config_hash, fetcher, store))
    }

    /// Creates a coordinator around an existing fetcher and store
    ///
    /// Statistics go to a `JsonStatsSink` rooted at the configured `stats-dir`.
    pub fn with_parts(
        config: Config,
        config_hash: impl Into<String>,
        fetcher: Arc<dyn Fetcher>,
        store: Arc<dyn SnapshotStore>,
    ) -> Self {
        let sink = Box::new(JsonStatsSink::new(&config.output.stats_dir));
        let engine = SnapshotEngine::new(Arc::clone(&fetcher), store);

        Self {
            config: Arc::new(config),
            config_hash: config_hash.into(),
            fetcher,
            engine,
            sink,
        }
    }

    /// Replaces the engine's clock
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.engine = self.engine.with_clock(clock);
        self
    }

    /// Replaces the statistics sink
    pub fn with_stats_sink(mut self, sink: Box<dyn StatsSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Loads and flattens the navigation tree without fetching any page
    pub async fn enumerate(&self) -> Result<Vec<String>, TrackerError> {
        Ok(load_urls(&self.config.site, self.fetcher.as_ref()).await?)
    }

    /// Runs one crawl
    ///
    /// This is the core loop that:
    /// 1. Enumerates the URL list; any failure aborts before a page is fetched
    /// 2. Processes each URL through the snapshot engine, in order
    /// 3. Records exactly one outcome per URL
    /// 4. Writes the statistics record, then the markdown summary if configured
    ///
    /// Per-URL failures are `Outcome::Error` entries, never run failures.
    pub async fn run(&self) -> Result<RunStats, TrackerError> {
        let start_time = Instant::now();
        let started_at = Utc::now();
        let date = self.engine.clock().now().date();

        let urls = self.enumerate().await?;
        tracing::info!("Starting run for {} with {} URLs", date, urls.len());

        let mut stats = RunStats::new(date, started_at, self.config_hash.clone());
        stats.urls_enumerated = urls.len() as u64;

        for (i, url) in urls.iter().enumerate() {
            let outcome = self.engine.process(url).await;
            stats.record(url, outcome);

            let done = i + 1;
            if done % 10 == 0 {
                tracing::info!(
                    "Progress: {}/{} URLs, {} added, {} changed, {} errors",
                    done,
                    urls.len(),
                    stats.added,
                    stats.changed,
                    stats.errors
                );
            }
        }

        stats.finish(Utc::now(), start_time.elapsed());
        self.sink.write(&stats)?;

        if let Some(summary_path) = &self.config.output.summary_path {
            generate_markdown_summary(&stats, Path::new(summary_path))?;
            tracing::info!("Wrote summary to {}", summary_path);
        }

        tracing::info!(
            "Run completed in {:.1}s: {} added, {} changed, {} unchanged, {} errors",
            stats.duration_secs,
            stats.added,
            stats.changed,
            stats.unchanged,
            stats.errors
        );

        Ok(stats)
    }
}

/// Runs a complete crawl with the configured fetcher, store and sink
///
/// # Arguments
///
/// * `config` - The tracker configuration
/// * `config_hash` - Hash of the configuration file
///
/// # Returns
///
/// * `Ok(RunStats)` - The run completed and its statistics were written
/// * `Err(TrackerError)` - Setup, enumeration or the statistics sink failed
///
/// # Example
///
/// ```no_run
/// use doc_tracker::config::load_config_with_hash;
/// use doc_tracker::crawler::run_crawl;
/// use std::path::Path;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let (config, hash) = load_config_with_hash(Path::new("config.toml"))?;
/// let stats = run_crawl(config, hash).await?;
/// println!("{} pages changed", stats.changed);
/// # Ok(())
/// # }
/// ```
pub async fn run_crawl(config: Config, config_hash: impl Into<String>) -> Result<RunStats, TrackerError> {
    let coordinator = Coordinator::new(config, config_hash)?;
    coordinator.run().await
}
