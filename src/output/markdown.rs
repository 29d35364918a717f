//! Markdown summary generation
//!
//! This module renders one run's statistics as a human-readable markdown report:
//! run metadata, an outcome table and the lists of added, changed and failed URLs.

use crate::output::traits::OutputResult;
use crate::output::RunStats;
use crate::state::Outcome;
use std::fs;
use std::path::Path;

/// Generates a markdown summary from run statistics
///
/// # Arguments
///
/// * `stats` - The run statistics
/// * `output_path` - Path where the markdown file should be written
///
/// # Returns
///
/// * `Ok(())` - Successfully wrote markdown summary
/// * `Err(OutputError)` - Failed to write summary
pub fn generate_markdown_summary(stats: &RunStats, output_path: &Path) -> OutputResult<()> {
    if let Some(parent) = output_path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    fs::write(output_path, format_markdown_summary(stats))?;
    Ok(())
}

/// Formats run statistics as markdown
///
/// # Arguments
///
/// * `stats` - The run statistics
///
/// # Returns
///
/// A formatted markdown string
pub fn format_markdown_summary(stats: &RunStats) -> String {
    let mut md = String::new();

    md.push_str(&format!("# Documentation Changes for {}\n\n", stats.date));

    // Run metadata
    md.push_str("## Run Information\n\n");
    md.push_str(&format!("- **Started**: {}\n", stats.started_at.to_rfc3339()));
    if let Some(finished) = stats.finished_at {
        md.push_str(&format!("- **Finished**: {}\n", finished.to_rfc3339()));
    }
    md.push_str(&format!("- **Duration**: {:.1} seconds\n", stats.duration_secs));
    md.push_str(&format!("- **Config Hash**: {}\n", stats.config_hash));
    md.push_str(&format!("- **URLs Enumerated**: {}\n\n", stats.urls_enumerated));

    md.push_str("## Outcomes\n\n");
    md.push_str("| Outcome | Count |\n");
    md.push_str("|---------|-------|\n");
    for outcome in Outcome::all() {
        md.push_str(&format!("| {} | {} |\n", outcome, stats.count(outcome)));
    }
    md.push('\n');

    push_url_section(&mut md, "Added Pages", &stats.added_urls);
    push_url_section(&mut md, "Changed Pages", &stats.changed_urls);
    push_url_section(&mut md, "Errors", &stats.error_urls);

    if stats.added_urls.is_empty() && stats.changed_urls.is_empty() {
        md.push_str("No pages were added or changed.\n");
    }

    md
}

fn push_url_section(md: &mut String, title: &str, urls: &[String]) {
    if urls.is_empty() {
        return;
    }

    md.push_str(&format!("## {} ({})\n\n", title, urls.len()));
    for url in urls {
        md.push_str(&format!("- <{}>\n", url));
    }
    md.push('\n');
}
