//! Navigation tree (TOC) handling
//!
//! The crawl frontier is fixed in advance: it is every link in the site's
//! table-of-contents document, in depth-first declaration order. Links are never
//! discovered from page bodies.
//!
//! The document is JSON shaped like:
//!
//! ```json
//! { "items": [ { "href": "overview", "children": [ { "href": "setup" } ] } ] }
//! ```

use crate::config::SiteConfig;
use crate::crawler::{FetchError, Fetcher};
use serde_json::Value;
use std::collections::HashSet;
use std::path::Path;
use thiserror::Error;
use url::Url;

/// Keys under which a node may nest its children, visited in this order
pub const CHILD_KEYS: [&str; 2] = ["children", "items"];

/// Key holding a node's link
pub const LINK_KEY: &str = "href";

/// Errors that make the navigation tree unusable; any of them aborts the run
#[derive(Debug, Error)]
pub enum EnumerationError {
    #[error("TOC document has no top-level \"items\" list")]
    MissingItems,

    #[error("TOC node at {path} is not an object")]
    NotAnObject { path: String },

    #[error("\"{key}\" at {path} is not a list")]
    NotAList { key: String, path: String },

    #[error("\"href\" at {path} is not a string")]
    InvalidLink { path: String },

    #[error("Invalid base URL '{0}'")]
    InvalidBaseUrl(String),

    #[error("Neither toc-file nor toc-url is configured")]
    NoTocSource,

    #[error("TOC is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Failed to read TOC file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to fetch TOC: {0}")]
    Fetch(#[from] FetchError),
}

/// Flattens a navigation tree into the ordered list of URLs to crawl
///
/// # Rules
///
/// - Every node carrying an `href` contributes one URL, unless the link is
///   root-relative (starts with `/`), which is skipped.
/// - Other links are resolved against `base_url`.
/// - Children under `children` and then `items` are always visited, whether or not
///   the node itself had a link.
/// - Depth-first, declaration order. A URL seen twice keeps its first position.
///
/// # Example
///
/// ```
/// use doc_tracker::toc::enumerate_urls;
/// use url::Url;
///
/// let toc = serde_json::json!({
///     "items": [{"href": "a"}, {"href": "/skip"}, {"items": [{"href": "b"}]}]
/// });
/// let base = Url::parse("https://x/").unwrap();
///
/// assert_eq!(enumerate_urls(&toc, &base).unwrap(), vec!["https://x/a", "https://x/b"]);
/// ```
pub fn enumerate_urls(toc: &Value, base_url: &Url) -> Result<Vec<String>, EnumerationError> {
    let items = toc
        .get("items")
        .ok_or(EnumerationError::MissingItems)?
        .as_array()
        .ok_or_else(|| EnumerationError::NotAList {
            key: "items".to_string(),
            path: "$".to_string(),
        })?;

    let mut walker = TocWalker {
        base_url,
        urls: Vec::new(),
        seen: HashSet::new(),
    };

    for (i, node) in items.iter().enumerate() {
        walker.visit(node, format!("$.items[{}]", i))?;
    }

    Ok(walker.urls)
}

struct TocWalker<'a> {
    base_url: &'a Url,
    urls: Vec<String>,
    seen: HashSet<String>,
}

impl TocWalker<'_> {
    fn visit(&mut self, node: &Value, path: String) -> Result<(), EnumerationError> {
        let object = node
            .as_object()
            .ok_or_else(|| EnumerationError::NotAnObject { path: path.clone() })?;

        if let Some(link) = object.get(LINK_KEY) {
            let href = link
                .as_str()
                .ok_or_else(|| EnumerationError::InvalidLink { path: path.clone() })?;
            self.add_link(href, &path);
        }

        for key in CHILD_KEYS {
            let Some(children) = object.get(key) else {
                continue;
            };
            let children = children.as_array().ok_or_else(|| EnumerationError::NotAList {
                key: key.to_string(),
                path: path.clone(),
            })?;

            for (i, child) in children.iter().enumerate() {
                self.visit(child, format!("{}.{}[{}]", path, key, i))?;
            }
        }

        Ok(())
    }

    fn add_link(&mut self, href: &str, path: &str) {
        let href = href.trim();

        if href.is_empty() {
            tracing::debug!("Skipping empty link at {}", path);
            return;
        }

        // Root-relative links point outside the tracked base
        if href.starts_with('/') {
            tracing::debug!("Skipping root-relative link {} at {}", href, path);
            return;
        }

        match self.base_url.join(href) {
            Ok(url) => {
                let url = url.to_string();
                if self.seen.insert(url.clone()) {
                    self.urls.push(url);
                }
            }
            Err(e) => tracing::warn!("Skipping unresolvable link {} at {}: {}", href, path, e),
        }
    }
}

/// Parses raw TOC bytes as JSON
pub fn parse_toc(bytes: &[u8]) -> Result<Value, EnumerationError> {
    Ok(serde_json::from_slice(bytes)?)
}

/// Loads the navigation tree from `toc-file` or `toc-url`
pub async fn load_toc(site: &SiteConfig, fetcher: &dyn Fetcher) -> Result<Value, EnumerationError> {
    match (&site.toc_file, &site.toc_url) {
        (Some(file), _) => {
            tracing::info!("Reading TOC from {}", file);
            parse_toc(&std::fs::read(Path::new(file))?)
        }
        (None, Some(url)) => {
            tracing::info!("Fetching TOC from {}", url);
            let page = fetcher.fetch(url).await?;
            parse_toc(&page.body)
        }
        (None, None) => Err(EnumerationError::NoTocSource),
    }
}

/// Loads the navigation tree and enumerates it against the configured base URL
pub async fn load_urls(site: &SiteConfig, fetcher: &dyn Fetcher) -> Result<Vec<String>, EnumerationError> {
    let base_url = Url::parse(&site.base_url)
        .map_err(|_| EnumerationError::InvalidBaseUrl(site.base_url.clone()))?;
    let toc = load_toc(site, fetcher).await?;
    enumerate_urls(&toc, &base_url)
}
