//! Slug derivation
//!
//! A slug is the last non-empty path segment of a page URL. Every snapshot of the
//! same page is stored under the same slug.

use crate::{UrlError, UrlResult};
use std::fmt;
use url::Url;

/// Storage partition key for one page's version history
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Slug(String);

impl Slug {
    /// Returns the slug as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Slug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Slug {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<&str> for Slug {
    type Error = UrlError;

    /// Accepts a bare slug (e.g. from the command line) after checking it is a
    /// single, non-traversing path component
    fn try_from(value: &str) -> Result<Self, Self::Error> {
        if value.is_empty() || value == "." || value == ".." || value.contains(['/', '\\']) {
            return Err(UrlError::MissingSlug(value.to_string()));
        }
        Ok(Self(value.to_string()))
    }
}

/// Derives the slug for a page URL
///
/// The slug is the final non-empty path segment, so `.../teams/overview` and
/// `.../teams/overview/` share a history. Query strings and fragments are ignored.
///
/// Two different URLs that end in the same segment map to the same slug and
/// therefore share one history.
///
/// # Errors
///
/// * `UrlError::Parse` - the URL is not absolute
/// * `UrlError::MissingSlug` - the URL has no non-empty path segment
///
/// # Example
///
/// ```
/// use doc_tracker::url::slug_from_url;
///
/// let slug = slug_from_url("https://learn.example.com/en-us/teams/overview").unwrap();
/// assert_eq!(slug.as_str(), "overview");
/// ```
pub fn slug_from_url(url: &str) -> UrlResult<Slug> {
    let parsed = Url::parse(url).map_err(|e| UrlError::Parse(format!("{}: {}", url, e)))?;

    parsed
        .path_segments()
        .and_then(|segments| segments.filter(|s| !s.is_empty()).last())
        .filter(|segment| *segment != "." && *segment != "..")
        .map(|segment| Slug(segment.to_string()))
        .ok_or_else(|| UrlError::MissingSlug(url.to_string()))
}
