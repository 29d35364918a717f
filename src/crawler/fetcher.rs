//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the tracker, including:
//! - Building HTTP clients with proper user agent strings and timeouts
//! - GET requests to fetch page bodies as raw bytes
//! - Error classification
//!
//! There are no retries. A failed fetch is reported once and the run moves on.

use crate::config::{Config, FetcherConfig, UserAgentConfig};
use async_trait::async_trait;
use reqwest::{redirect::Policy, Client};
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur while fetching a page
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Request timeout for {url}")]
    Timeout { url: String },

    #[error("Could not connect to {url}: {message}")]
    Connect { url: String, message: String },

    #[error("HTTP {status} for {url}")]
    Status { url: String, status: u16 },

    #[error("HTTP error for {url}: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

impl FetchError {
    /// Classifies a reqwest error the same way for request and body failures
    fn from_reqwest(url: &str, error: reqwest::Error) -> Self {
        if error.is_timeout() {
            Self::Timeout {
                url: url.to_string(),
            }
        } else if error.is_connect() {
            Self::Connect {
                url: url.to_string(),
                message: error.to_string(),
            }
        } else {
            Self::Transport {
                url: url.to_string(),
                source: error,
            }
        }
    }
}

/// A successfully fetched page
#[derive(Debug, Clone)]
pub struct FetchedPage {
    /// Final URL after redirects
    pub final_url: String,
    /// HTTP status code
    pub status_code: u16,
    /// Content-Type header value
    pub content_type: Option<String>,
    /// Raw page body
    pub body: Vec<u8>,
}

/// Source of page bodies
///
/// Any transport failure or non-success status is an error; callers do not
/// distinguish causes beyond logging them.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<FetchedPage, FetchError>;
}

/// Formats the user agent string: `CrawlerName/Version (+ContactURL; ContactEmail)`
pub fn user_agent_string(config: &UserAgentConfig) -> String {
    format!(
        "{}/{} (+{}; {})",
        config.crawler_name, config.crawler_version, config.contact_url, config.contact_email
    )
}

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `user_agent` - The user agent configuration
/// * `limits` - Request and connect timeouts
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
///
/// # Example
///
/// ```no_run
/// use doc_tracker::config::{FetcherConfig, UserAgentConfig};
/// use doc_tracker::crawler::build_http_client;
///
/// let config = UserAgentConfig {
///     crawler_name: "DocTracker".to_string(),
///     crawler_version: "1.0".to_string(),
///     contact_url: "https://example.com/about".to_string(),
///     contact_email: "admin@example.com".to_string(),
/// };
///
/// let client = build_http_client(&config, &FetcherConfig::default()).unwrap();
/// ```
pub fn build_http_client(
    user_agent: &UserAgentConfig,
    limits: &FetcherConfig,
) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(user_agent_string(user_agent))
        .timeout(Duration::from_secs(limits.timeout_secs))
        .connect_timeout(Duration::from_secs(limits.connect_timeout_secs))
        .redirect(Policy::limited(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// reqwest-backed fetcher
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    /// Wraps an already configured client
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Builds the client from the `[user-agent]` and `[fetcher]` sections
    pub fn from_config(config: &Config) -> Result<Self, reqwest::Error> {
        Ok(Self::new(build_http_client(
            &config.user_agent,
            &config.fetcher,
        )?))
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchedPage, FetchError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| FetchError::from_reqwest(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let final_url = response.url().to_string();
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let body = response
            .bytes()
            .await
            .map_err(|e| FetchError::from_reqwest(url, e))?;

        tracing::trace!("Fetched {} ({} bytes)", final_url, body.len());

        Ok(FetchedPage {
            final_url,
            status_code: status.as_u16(),
            content_type,
            body: body.to_vec(),
        })
    }
}
