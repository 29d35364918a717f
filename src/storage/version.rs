//! Typed version keys
//!
//! A version key names one snapshot inside a slug's history. Two shapes exist:
//!
//! | Shape | Rendered as | Meaning |
//! |-------|-------------|---------|
//! | `Dated` | `2024-01-05` | the page declared this date itself |
//! | `Undated` | `nodt/20240105` | no declared date; captured on that day |
//! | `Undated` + time | `nodt/20240105_153012` | a further distinct capture on the same day |
//!
//! # Ordering
//!
//! Every dated key sorts before every undated key, which is also the byte order of
//! the rendered names (`'2' < 'n'`), so a sorted directory listing agrees with `Ord`.
//! Dated keys order by date. Undated keys order by day, then the bare marker before
//! any time-suffixed marker of that day, then by time.

use crate::storage::StorageError;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Directory prefix for captures of pages without a declared date
pub const UNDATED_PREFIX: &str = "nodt";

const DATED_FORMAT: &str = "%Y-%m-%d";
const UNDATED_DAY_FORMAT: &str = "%Y%m%d";
const UNDATED_TIME_FORMAT: &str = "%H%M%S";

/// Sortable identifier of one snapshot within a slug
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum VersionKey {
    /// Date declared by the page content
    Dated(NaiveDate),

    /// Capture marker for a page without a declared date
    Undated {
        day: NaiveDate,
        time: Option<NaiveTime>,
    },
}

impl VersionKey {
    /// Key for a page that declares `date`
    pub fn dated(date: NaiveDate) -> Self {
        Self::Dated(date)
    }

    /// Bare undated marker for `day`
    pub fn undated(day: NaiveDate) -> Self {
        Self::Undated { day, time: None }
    }

    /// Time-suffixed undated marker, truncated to whole seconds
    pub fn undated_at(at: NaiveDateTime) -> Self {
        let time = at.time().with_nanosecond(0).unwrap_or_else(|| at.time());
        Self::Undated {
            day: at.date(),
            time: Some(time),
        }
    }

    /// Calendar day this key refers to
    pub fn day(&self) -> NaiveDate {
        match self {
            Self::Dated(date) => *date,
            Self::Undated { day, .. } => *day,
        }
    }

    /// Returns true for capture markers (`nodt/...`)
    pub fn is_undated(&self) -> bool {
        matches!(self, Self::Undated { .. })
    }

    /// Relative directory of this version below a slug directory
    pub fn relative_path(&self) -> PathBuf {
        match self {
            Self::Dated(_) => PathBuf::from(self.to_string()),
            Self::Undated { .. } => {
                let rendered = self.to_string();
                let leaf = &rendered[UNDATED_PREFIX.len() + 1..];
                PathBuf::from(UNDATED_PREFIX).join(leaf)
            }
        }
    }
}

impl fmt::Display for VersionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Dated(date) => write!(f, "{}", date.format(DATED_FORMAT)),
            Self::Undated { day, time: None } => {
                write!(f, "{}/{}", UNDATED_PREFIX, day.format(UNDATED_DAY_FORMAT))
            }
            Self::Undated {
                day,
                time: Some(time),
            } => write!(
                f,
                "{}/{}_{}",
                UNDATED_PREFIX,
                day.format(UNDATED_DAY_FORMAT),
                time.format(UNDATED_TIME_FORMAT)
            ),
        }
    }
}

impl FromStr for VersionKey {
    type Err = StorageError;

    /// Parses the rendered form; anything that would not render back to the exact
    /// same string is rejected
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || StorageError::InvalidVersionKey(s.to_string());

        let key = match s.strip_prefix(UNDATED_PREFIX).and_then(|r| r.strip_prefix('/')) {
            Some(marker) => {
                let (day, time) = match marker.split_once('_') {
                    Some((day, time)) => (day, Some(time)),
                    None => (marker, None),
                };
                let day = NaiveDate::parse_from_str(day, UNDATED_DAY_FORMAT)
                    .map_err(|_| invalid())?;
                let time = time
                    .map(|t| NaiveTime::parse_from_str(t, UNDATED_TIME_FORMAT))
                    .transpose()
                    .map_err(|_| invalid())?;
                Self::Undated { day, time }
            }
            None => Self::Dated(NaiveDate::parse_from_str(s, DATED_FORMAT).map_err(|_| invalid())?),
        };

        if key.to_string() != s {
            return Err(invalid());
        }

        Ok(key)
    }
}
