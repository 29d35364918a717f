//! State module for per-URL crawl results
//!
//! # Components
//!
//! - `Outcome`: the classification of one URL in one run (added, changed, unchanged, error)

mod outcome;

pub use outcome::Outcome;
