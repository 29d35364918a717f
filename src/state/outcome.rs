/// Per-URL crawl outcome definitions
///
/// Every URL processed in a run ends in exactly one of these outcomes.
use serde::{Deserialize, Serialize};
use std::fmt;

/// Result of processing one URL in one run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    /// First snapshot ever stored for this page's slug
    Added,

    /// A new version was stored, or a dated version was overwritten with new bytes
    Changed,

    /// The fetched body matched the stored baseline byte-for-byte
    Unchanged,

    /// Fetch or store failure; nothing was recorded for this URL
    Error,
}

impl Outcome {
    /// Short lowercase label used in logs and reports
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Added => "added",
            Self::Changed => "changed",
            Self::Unchanged => "unchanged",
            Self::Error => "error",
        }
    }

    /// Returns all outcomes in reporting order
    pub fn all() -> [Self; 4] {
        [Self::Added, Self::Changed, Self::Unchanged, Self::Error]
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
