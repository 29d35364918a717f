//! HTML parsing for the page's declared date
//!
//! A page declares its own date through the first `<time datetime="...">` element.
//! Only the leading `YYYY-MM-DD` of the attribute is used.

use chrono::NaiveDate;
use scraper::{Html, Selector};

/// Extracts an explicit content date from a fetched page body
pub trait DateResolver: Send + Sync {
    /// Returns the declared date, or `None` when the page declares none
    fn extract_date(&self, body: &[u8]) -> Option<NaiveDate>;
}

/// Resolver that reads the first `<time>` element's `datetime` attribute
#[derive(Debug, Clone, Copy, Default)]
pub struct TimeElementResolver;

impl DateResolver for TimeElementResolver {
    fn extract_date(&self, body: &[u8]) -> Option<NaiveDate> {
        extract_time_element_date(&String::from_utf8_lossy(body))
    }
}

/// Parses HTML and returns the date declared by its first `<time>` element
///
/// The page is treated as undated when:
/// - it has no `<time>` element
/// - the first `<time>` element has no `datetime` attribute
/// - the attribute does not start with a valid `YYYY-MM-DD` date
///
/// # Example
///
/// ```
/// use doc_tracker::crawler::extract_time_element_date;
///
/// let html = r#"<html><body><time datetime="2023-08-18T08:00:00Z">Aug 18</time></body></html>"#;
/// let date = extract_time_element_date(html).unwrap();
/// assert_eq!(date.to_string(), "2023-08-18");
/// ```
pub fn extract_time_element_date(html: &str) -> Option<NaiveDate> {
    let document = Html::parse_document(html);
    let time_selector = Selector::parse("time").ok()?;

    let element = document.select(&time_selector).next()?;
    let datetime = element.value().attr("datetime")?.trim();

    let day = datetime.get(..10)?;
    NaiveDate::parse_from_str(day, "%Y-%m-%d")
        .ok()
        .filter(|date| date.format("%Y-%m-%d").to_string() == day)
}
