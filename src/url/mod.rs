//! URL handling module for Doc-Tracker
//!
//! Maps page URLs onto the slugs that partition the snapshot store.

mod slug;

pub use slug::{slug_from_url, Slug};
