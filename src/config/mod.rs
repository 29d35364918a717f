//! Configuration module for Doc-Tracker
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use doc_tracker::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("config.toml")).unwrap();
//! println!("Snapshots live under: {}", config.output.store_root);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    Config, FetcherConfig, OutputConfig, SiteConfig, StoreBackend, UserAgentConfig,
};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash};
