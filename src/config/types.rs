use serde::Deserialize;

/// Main configuration structure for Doc-Tracker
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub site: SiteConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    #[serde(default)]
    pub fetcher: FetcherConfig,
    pub output: OutputConfig,
}

/// Which documentation site to track
#[derive(Debug, Clone, Deserialize)]
pub struct SiteConfig {
    /// Base URL that relative TOC links are resolved against
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Remote location of the navigation tree (JSON)
    #[serde(rename = "toc-url", default)]
    pub toc_url: Option<String>,

    /// Local copy of the navigation tree (JSON), used instead of `toc-url`
    #[serde(rename = "toc-file", default)]
    pub toc_file: Option<String>,
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    /// Name of the crawler
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// URL with information about the crawler
    #[serde(rename = "contact-url")]
    pub contact_url: String,

    /// Email address for crawler-related contact
    #[serde(rename = "contact-email")]
    pub contact_email: String,
}

/// HTTP fetch limits
#[derive(Debug, Clone, Deserialize)]
pub struct FetcherConfig {
    /// Whole-request timeout in seconds
    #[serde(rename = "timeout-secs", default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// TCP/TLS connect timeout in seconds
    #[serde(
        rename = "connect-timeout-secs",
        default = "default_connect_timeout_secs"
    )]
    pub connect_timeout_secs: u64,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
        }
    }
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_connect_timeout_secs() -> u64 {
    10
}

/// Snapshot store backend selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// `<store-root>/<slug>/<version>/<page-file>` directory tree
    #[default]
    Filesystem,
    /// Single SQLite database file
    Sqlite,
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Root directory of the snapshot tree
    #[serde(rename = "store-root")]
    pub store_root: String,

    #[serde(default)]
    pub backend: StoreBackend,

    /// Path to the SQLite database file (sqlite backend only)
    #[serde(rename = "database-path", default)]
    pub database_path: Option<String>,

    /// File name written inside each version directory
    #[serde(rename = "page-file", default = "default_page_file")]
    pub page_file: String,

    /// Directory holding one statistics record per run date
    #[serde(rename = "stats-dir")]
    pub stats_dir: String,

    /// Path to the markdown summary file
    #[serde(rename = "summary-path", default)]
    pub summary_path: Option<String>,
}

fn default_page_file() -> String {
    "index.html".to_string()
}
