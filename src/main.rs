//! Doc-Tracker main entry point
//!
//! This is the command-line interface for the Doc-Tracker snapshot archiver.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::Parser;
use doc_tracker::config::{load_config_with_hash, Config};
use doc_tracker::crawler::{run_crawl, HttpFetcher};
use doc_tracker::output::{generate_markdown_summary, latest_stats, load_stats, print_statistics};
use doc_tracker::storage::open_store;
use doc_tracker::{slug_from_url, toc};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Doc-Tracker: a change-tracking snapshot archiver for documentation sites
///
/// Doc-Tracker re-crawls every page in a site's navigation tree, stores a new
/// snapshot whenever a page is new or its content changed, and records a
/// statistics file for each run.
#[derive(Parser, Debug)]
#[command(name = "doc-tracker")]
#[command(version)]
#[command(about = "A change-tracking snapshot archiver for documentation sites", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate config and list the URLs that would be crawled without fetching them
    #[arg(long, conflicts_with_all = ["stats", "export_summary", "history"])]
    dry_run: bool,

    /// Show the statistics of a past run (latest when no date is given) and exit
    #[arg(long, value_name = "DATE", conflicts_with_all = ["dry_run", "export_summary", "history"])]
    stats: Option<Option<NaiveDate>>,

    /// Generate markdown summary of the latest run and exit
    #[arg(long, conflicts_with_all = ["dry_run", "stats", "history"])]
    export_summary: bool,

    /// Show the stored versions of a page and exit
    #[arg(long, value_name = "URL", conflicts_with_all = ["dry_run", "stats", "export_summary"])]
    history: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    // Load and validate configuration
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("Failed to load configuration from {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    // Handle different modes
    if cli.dry_run {
        handle_dry_run(&config).await
    } else if let Some(date) = cli.stats {
        handle_stats(&config, date)
    } else if cli.export_summary {
        handle_export_summary(&config)
    } else if let Some(url) = cli.history {
        handle_history(&config, &url)
    } else {
        handle_crawl(config, config_hash).await
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("doc_tracker=info,warn"),
            1 => EnvFilter::new("doc_tracker=debug,info"),
            2 => EnvFilter::new("doc_tracker=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles the --dry-run mode: validates config and lists the URLs a run would visit
async fn handle_dry_run(config: &Config) -> Result<()> {
    println!("=== Doc-Tracker Dry Run ===\n");

    println!("Site:");
    println!("  Base URL: {}", config.site.base_url);
    if let Some(file) = &config.site.toc_file {
        println!("  TOC file: {}", file);
    }
    if let Some(url) = &config.site.toc_url {
        println!("  TOC URL: {}", url);
    }

    println!("\nOutput:");
    println!("  Store: {} ({:?})", config.output.store_root, config.output.backend);
    println!("  Stats: {}", config.output.stats_dir);

    let fetcher = HttpFetcher::from_config(config).context("Failed to build HTTP client")?;
    let urls = toc::load_urls(&config.site, &fetcher)
        .await
        .context("Failed to enumerate the navigation tree")?;

    println!("\nURLs ({}):", urls.len());
    for url in &urls {
        println!("  - {}", url);
    }

    println!("\n✓ Configuration is valid");
    println!("✓ Would crawl {} URLs", urls.len());

    Ok(())
}

/// Handles the --stats mode: shows a stored run record
fn handle_stats(config: &Config, date: Option<NaiveDate>) -> Result<()> {
    let dir = Path::new(&config.output.stats_dir);
    println!("Stats directory: {}\n", dir.display());

    let stats = match date {
        Some(date) => load_stats(dir, date)?,
        None => latest_stats(dir)?.context("No run statistics recorded yet")?,
    };

    print_statistics(&stats);
    Ok(())
}

/// Handles the --export-summary mode: generates markdown summary of the latest run
fn handle_export_summary(config: &Config) -> Result<()> {
    let output = config
        .output
        .summary_path
        .as_deref()
        .context("summary-path is not set in the [output] section")?;

    println!("=== Exporting Run Summary ===\n");
    println!("Stats directory: {}", config.output.stats_dir);
    println!("Output: {}", output);
    println!();

    let stats = latest_stats(Path::new(&config.output.stats_dir))?
        .context("No run statistics recorded yet")?;

    tracing::info!("Generating markdown summary for {}...", stats.date);
    generate_markdown_summary(&stats, Path::new(output))?;

    println!("✓ Summary exported to: {}", output);
    Ok(())
}

/// Handles the --history mode: lists every stored version of one page
fn handle_history(config: &Config, url: &str) -> Result<()> {
    let slug = slug_from_url(url)?;
    let store = open_store(&config.output)?;
    let versions = store.history(&slug)?;

    println!("History for {} (slug: {})\n", url, slug);
    if versions.is_empty() {
        println!("  No snapshots stored");
        return Ok(());
    }

    for version in &versions {
        let snapshot = store.read_snapshot(&slug, version)?;
        println!(
            "  {:<24} {:>9} bytes  captured {}",
            version.to_string(),
            snapshot.body.len(),
            snapshot.captured_at.to_rfc3339()
        );
    }
    println!("\n{} versions", versions.len());

    Ok(())
}

/// Handles the main crawl operation
async fn handle_crawl(config: Config, config_hash: String) -> Result<()> {
    tracing::info!("Tracking {}", config.site.base_url);

    match run_crawl(config, config_hash).await {
        Ok(stats) => {
            tracing::info!(
                "Run for {} completed: {} added, {} changed, {} unchanged, {} errors",
                stats.date,
                stats.added,
                stats.changed,
                stats.unchanged,
                stats.errors
            );
            Ok(())
        }
        Err(e) => {
            tracing::error!("Run failed: {}", e);
            Err(e.into())
        }
    }
}
