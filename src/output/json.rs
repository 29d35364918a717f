//! JSON statistics sink
//!
//! Each run writes `<stats-dir>/<YYYY-MM-DD>.json`. A second run on the same date
//! replaces the first run's record.

use crate::output::traits::{OutputError, OutputResult, StatsSink};
use crate::output::RunStats;
use chrono::NaiveDate;
use std::fs;
use std::path::{Path, PathBuf};

/// Writes one pretty-printed JSON file per run date
#[derive(Debug, Clone)]
pub struct JsonStatsSink {
    dir: PathBuf,
}

impl JsonStatsSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Path of the record for `date`
    pub fn record_path(&self, date: NaiveDate) -> PathBuf {
        record_path(&self.dir, date)
    }
}

impl StatsSink for JsonStatsSink {
    fn write(&self, stats: &RunStats) -> OutputResult<()> {
        fs::create_dir_all(&self.dir)?;

        let path = self.record_path(stats.date);
        let json = serde_json::to_string_pretty(stats)?;

        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, json)?;
        fs::rename(&tmp, &path)?;

        tracing::debug!("Wrote run statistics to {}", path.display());
        Ok(())
    }
}

fn record_path(dir: &Path, date: NaiveDate) -> PathBuf {
    dir.join(format!("{}.json", date.format("%Y-%m-%d")))
}

/// Loads the record stored for `date`
pub fn load_stats(dir: &Path, date: NaiveDate) -> OutputResult<RunStats> {
    let path = record_path(dir, date);
    let content = match fs::read(&path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(OutputError::NotFound(path.display().to_string()))
        }
        Err(e) => return Err(e.into()),
    };
    Ok(serde_json::from_slice(&content)?)
}

/// Loads the most recent record in `dir`, if any
///
/// Files whose names are not `YYYY-MM-DD.json` are ignored.
pub fn latest_stats(dir: &Path) -> OutputResult<Option<RunStats>> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };

    let mut latest: Option<NaiveDate> = None;
    for entry in entries {
        let name = entry?.file_name();
        let Some(stem) = name.to_str().and_then(|n| n.strip_suffix(".json")) else {
            continue;
        };
        if let Ok(date) = NaiveDate::parse_from_str(stem, "%Y-%m-%d") {
            latest = latest.max(Some(date));
        }
    }

    latest.map(|date| load_stats(dir, date)).transpose()
}
