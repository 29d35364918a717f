use crate::config::types::{
    Config, FetcherConfig, OutputConfig, SiteConfig, StoreBackend, UserAgentConfig,
};
use crate::{ConfigError, ConfigResult};
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> ConfigResult<()> {
    validate_site_config(&config.site)?;
    validate_user_agent_config(&config.user_agent)?;
    validate_fetcher_config(&config.fetcher)?;
    validate_output_config(&config.output)?;
    Ok(())
}

/// Validates the site section: base URL and exactly one TOC source
fn validate_site_config(config: &SiteConfig) -> ConfigResult<()> {
    validate_http_url("base-url", &config.base_url)?;

    match (&config.toc_url, &config.toc_file) {
        (Some(_), Some(_)) => Err(ConfigError::Validation(
            "only one of toc-url and toc-file may be set".to_string(),
        )),
        (None, None) => Err(ConfigError::Validation(
            "one of toc-url or toc-file must be set".to_string(),
        )),
        (Some(toc_url), None) => validate_http_url("toc-url", toc_url),
        (None, Some(toc_file)) => {
            if toc_file.is_empty() {
                return Err(ConfigError::Validation(
                    "toc-file cannot be empty".to_string(),
                ));
            }
            Ok(())
        }
    }
}

/// Parses `value` and requires an http(s) scheme
fn validate_http_url(field: &str, value: &str) -> ConfigResult<()> {
    let url = Url::parse(value)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid {} '{}': {}", field, value, e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::Validation(format!(
            "{} '{}' must use http or https",
            field, value
        )));
    }

    Ok(())
}

/// Validates user agent configuration
fn validate_user_agent_config(config: &UserAgentConfig) -> ConfigResult<()> {
    // Validate crawler name: non-empty, alphanumeric + hyphens only
    if config.crawler_name.is_empty() {
        return Err(ConfigError::Validation(
            "crawler_name cannot be empty".to_string(),
        ));
    }

    if !config
        .crawler_name
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-')
    {
        return Err(ConfigError::Validation(format!(
            "crawler_name must contain only alphanumeric characters and hyphens, got '{}'",
            config.crawler_name
        )));
    }

    // Validate contact URL
    Url::parse(&config.contact_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid contact_url: {}", e)))?;

    validate_email(&config.contact_email)?;

    Ok(())
}

/// Validates fetch timeouts
fn validate_fetcher_config(config: &FetcherConfig) -> ConfigResult<()> {
    if config.timeout_secs < 1 {
        return Err(ConfigError::Validation(format!(
            "timeout_secs must be >= 1, got {}",
            config.timeout_secs
        )));
    }

    if config.connect_timeout_secs < 1 {
        return Err(ConfigError::Validation(format!(
            "connect_timeout_secs must be >= 1, got {}",
            config.connect_timeout_secs
        )));
    }

    if config.connect_timeout_secs > config.timeout_secs {
        return Err(ConfigError::Validation(format!(
            "connect_timeout_secs ({}) cannot exceed timeout_secs ({})",
            config.connect_timeout_secs, config.timeout_secs
        )));
    }

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> ConfigResult<()> {
    if config.store_root.is_empty() {
        return Err(ConfigError::Validation(
            "store_root cannot be empty".to_string(),
        ));
    }

    if config.stats_dir.is_empty() {
        return Err(ConfigError::Validation(
            "stats_dir cannot be empty".to_string(),
        ));
    }

    if config.page_file.is_empty()
        || config.page_file.contains('/')
        || config.page_file.contains('\\')
    {
        return Err(ConfigError::Validation(format!(
            "page_file must be a plain file name, got '{}'",
            config.page_file
        )));
    }

    if config.backend == StoreBackend::Sqlite
        && config.database_path.as_deref().map_or(true, str::is_empty)
    {
        return Err(ConfigError::Validation(
            "database_path is required for the sqlite backend".to_string(),
        ));
    }

    if let Some(summary_path) = &config.summary_path {
        if summary_path.is_empty() {
            return Err(ConfigError::Validation(
                "summary_path cannot be empty when set".to_string(),
            ));
        }
    }

    Ok(())
}

/// Basic email validation
fn validate_email(email: &str) -> ConfigResult<()> {
    if email.is_empty() {
        return Err(ConfigError::Validation(
            "contact_email cannot be empty".to_string(),
        ));
    }

    // Basic email format check: must contain @ and have text on both sides
    let parts: Vec<&str> = email.split('@').collect();
    if parts.len() != 2 {
        return Err(ConfigError::Validation(format!(
            "Invalid email format: '{}'",
            email
        )));
    }

    let local = parts[0];
    let domain = parts[1];

    if local.is_empty() || domain.is_empty() {
        return Err(ConfigError::Validation(format!(
            "Invalid email format: '{}'",
            email
        )));
    }

    if !domain.contains('.') {
        return Err(ConfigError::Validation(format!(
            "Invalid email domain: '{}'",
            email
        )));
    }

    Ok(())
}
