//! Run statistics
//!
//! One `RunStats` value is created when a run starts, updated once per URL and
//! persisted once when the run ends. The snapshot engine never reads it.

use crate::state::Outcome;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Aggregate result of one crawl run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunStats {
    /// Calendar date the run is filed under
    pub date: NaiveDate,

    pub started_at: DateTime<Utc>,

    pub finished_at: Option<DateTime<Utc>>,

    /// Wall-clock duration of the whole run
    pub duration_secs: f64,

    /// SHA-256 of the configuration file used for the run
    pub config_hash: String,

    /// Number of URLs the navigation tree produced
    pub urls_enumerated: u64,

    pub added: u64,
    pub changed: u64,
    pub unchanged: u64,
    pub errors: u64,

    /// URLs in crawl order, per outcome
    pub added_urls: Vec<String>,
    pub changed_urls: Vec<String>,
    pub error_urls: Vec<String>,
}

impl RunStats {
    /// Starts an empty record for a run
    pub fn new(date: NaiveDate, started_at: DateTime<Utc>, config_hash: impl Into<String>) -> Self {
        Self {
            date,
            started_at,
            finished_at: None,
            duration_secs: 0.0,
            config_hash: config_hash.into(),
            urls_enumerated: 0,
            added: 0,
            changed: 0,
            unchanged: 0,
            errors: 0,
            added_urls: Vec::new(),
            changed_urls: Vec::new(),
            error_urls: Vec::new(),
        }
    }

    /// Tallies one URL's outcome
    pub fn record(&mut self, url: &str, outcome: Outcome) {
        match outcome {
            Outcome::Added => {
                self.added += 1;
                self.added_urls.push(url.to_string());
            }
            Outcome::Changed => {
                self.changed += 1;
                self.changed_urls.push(url.to_string());
            }
            Outcome::Unchanged => self.unchanged += 1,
            Outcome::Error => {
                self.errors += 1;
                self.error_urls.push(url.to_string());
            }
        }
    }

    /// Stamps the end of the run
    pub fn finish(&mut self, finished_at: DateTime<Utc>, elapsed: Duration) {
        self.finished_at = Some(finished_at);
        self.duration_secs = elapsed.as_secs_f64();
    }

    /// Count for one outcome kind
    pub fn count(&self, outcome: Outcome) -> u64 {
        match outcome {
            Outcome::Added => self.added,
            Outcome::Changed => self.changed,
            Outcome::Unchanged => self.unchanged,
            Outcome::Error => self.errors,
        }
    }

    /// Sum of all outcome counts
    pub fn total(&self) -> u64 {
        Outcome::all().iter().map(|o| self.count(*o)).sum()
    }

    /// True when every enumerated URL has exactly one tallied outcome
    pub fn is_complete(&self) -> bool {
        self.total() == self.urls_enumerated
    }
}

/// Prints statistics to stdout in a formatted manner
///
/// # Arguments
///
/// * `stats` - The statistics to display
pub fn print_statistics(stats: &RunStats) {
    println!("=== Run Statistics ({}) ===\n", stats.date);

    println!("Overview:");
    println!("  Started: {}", stats.started_at.to_rfc3339());
    if let Some(finished) = stats.finished_at {
        println!("  Finished: {}", finished.to_rfc3339());
    }
    println!("  Duration: {:.1}s", stats.duration_secs);
    println!("  URLs enumerated: {}", stats.urls_enumerated);
    println!();

    println!("Outcomes:");
    for outcome in Outcome::all() {
        let count = stats.count(outcome);
        let percentage = if stats.urls_enumerated > 0 {
            (count as f64 / stats.urls_enumerated as f64) * 100.0
        } else {
            0.0
        };
        println!("  {}: {} ({:.1}%)", outcome, count, percentage);
    }
    println!();

    if !stats.changed_urls.is_empty() {
        println!("Changed ({}):", stats.changed_urls.len());
        for url in &stats.changed_urls {
            println!("  - {}", url);
        }
        println!();
    }

    if !stats.error_urls.is_empty() {
        println!("Errors ({}):", stats.error_urls.len());
        for url in &stats.error_urls {
            println!("  - {}", url);
        }
        println!();
    }
}
