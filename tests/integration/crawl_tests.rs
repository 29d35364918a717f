//! Integration tests for the tracker
//!
//! These tests use wiremock to serve a navigation tree and its pages over HTTP and
//! run the full enumerate, fetch, decide and store cycle end-to-end.

use chrono::{NaiveDate, NaiveDateTime};
use doc_tracker::config::{Config, FetcherConfig, OutputConfig, SiteConfig, StoreBackend, UserAgentConfig};
use doc_tracker::crawler::{Clock, Coordinator, HttpFetcher};
use doc_tracker::output::load_stats;
use doc_tracker::storage::open_store;
use doc_tracker::{slug_from_url, Outcome, TrackerError};
use std::path::Path;
use std::sync::Arc;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

struct PinnedClock(NaiveDateTime);

impl Clock for PinnedClock {
    fn now(&self) -> NaiveDateTime {
        self.0
    }
}

fn run_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 10).unwrap()
}

fn clock_at(h: u32, m: u32, s: u32) -> Arc<PinnedClock> {
    Arc::new(PinnedClock(run_date().and_hms_opt(h, m, s).unwrap()))
}

/// Creates a test configuration tracking `<server>/docs/`
fn create_test_config(server: &MockServer, dir: &Path, backend: StoreBackend) -> Config {
    Config {
        site: SiteConfig {
            base_url: format!("{}/docs/", server.uri()),
            toc_url: Some(format!("{}/docs/toc.json", server.uri())),
            toc_file: None,
        },
        user_agent: UserAgentConfig {
            crawler_name: "TestBot".to_string(),
            crawler_version: "1.0.0".to_string(),
            contact_url: "https://example.com/contact".to_string(),
            contact_email: "test@example.com".to_string(),
        },
        fetcher: FetcherConfig {
            timeout_secs: 5,
            connect_timeout_secs: 5,
        },
        output: OutputConfig {
            store_root: dir.join("store").display().to_string(),
            backend,
            database_path: Some(dir.join("snapshots.db").display().to_string()),
            page_file: "index.html".to_string(),
            stats_dir: dir.join("stats").display().to_string(),
            summary_path: Some(dir.join("summary.md").display().to_string()),
        },
    }
}

fn coordinator(config: Config, clock: Arc<PinnedClock>) -> Coordinator {
    let fetcher = Arc::new(HttpFetcher::from_config(&config).expect("Failed to build client"));
    let store = open_store(&config.output).expect("Failed to open store");
    Coordinator::with_parts(config, "test-hash", fetcher, store).with_clock(clock)
}

fn dated_page(date: &str, text: &str) -> String {
    format!(
        r#"<html><head><title>{text}</title></head><body>
        <time datetime="{date}T08:00:00Z">{date}</time><p>{text}</p>
        </body></html>"#
    )
}

fn undated_page(text: &str) -> String {
    format!("<html><head><title>{text}</title></head><body><p>{text}</p></body></html>")
}

async fn mount_html(server: &MockServer, route: &str, body: String) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/html"))
        .mount(server)
        .await;
}

/// Serves the TOC and every page of the test site
async fn mount_site(server: &MockServer, setup_text: &str, overview_text: &str) {
    Mock::given(method("GET"))
        .and(path("/docs/toc.json"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"{"items":[
                {"href":"overview"},
                {"href":"setup","children":[{"href":"advanced"}]},
                {"href":"/external/root-relative"},
                {"href":"missing"}
            ]}"#,
        ))
        .mount(server)
        .await;

    mount_html(server, "/docs/overview", dated_page("2023-08-18", overview_text)).await;
    mount_html(server, "/docs/setup", undated_page(setup_text)).await;
    mount_html(server, "/docs/advanced", dated_page("2024-01-02", "advanced")).await;

    Mock::given(method("GET"))
        .and(path("/docs/missing"))
        .respond_with(ResponseTemplate::new(404))
        .mount(server)
        .await;
}

fn page_file(dir: &Path, slug: &str, version: &str) -> std::path::PathBuf {
    dir.join("store").join(slug).join(version).join("index.html")
}

#[tokio::test]
async fn test_first_run_stores_every_page() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    mount_site(&server, "setup v1", "overview v1").await;

    let config = create_test_config(&server, dir.path(), StoreBackend::Filesystem);
    let stats = coordinator(config, clock_at(9, 0, 0)).run().await.unwrap();

    assert_eq!(stats.urls_enumerated, 4, "root-relative link must be skipped");
    assert_eq!(stats.added, 3);
    assert_eq!(stats.errors, 1);
    assert_eq!(stats.error_urls, vec![format!("{}/docs/missing", server.uri())]);
    assert!(stats.is_complete());

    // Layout: <store>/<slug>/<version>/index.html
    assert!(page_file(dir.path(), "overview", "2023-08-18").is_file());
    assert!(page_file(dir.path(), "setup", "nodt/20240110").is_file());
    assert!(page_file(dir.path(), "advanced", "2024-01-02").is_file());
    assert!(!dir.path().join("store").join("missing").exists());

    let stored = load_stats(&dir.path().join("stats"), run_date()).unwrap();
    assert_eq!(stored, stats);

    let summary = std::fs::read_to_string(dir.path().join("summary.md")).unwrap();
    assert!(summary.contains("## Added Pages (3)"));
}

#[tokio::test]
async fn test_second_run_reports_unchanged() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    mount_site(&server, "setup v1", "overview v1").await;
    let config = create_test_config(&server, dir.path(), StoreBackend::Filesystem);

    coordinator(config.clone(), clock_at(9, 0, 0)).run().await.unwrap();
    let second = coordinator(config, clock_at(10, 0, 0)).run().await.unwrap();

    assert_eq!(second.count(Outcome::Unchanged), 3);
    assert_eq!(second.count(Outcome::Added), 0);
    assert_eq!(second.count(Outcome::Changed), 0);
    assert_eq!(second.count(Outcome::Error), 1);

    // One stats file per date, holding the latest run
    let stats_files = std::fs::read_dir(dir.path().join("stats")).unwrap().count();
    assert_eq!(stats_files, 1);
    let stored = load_stats(&dir.path().join("stats"), run_date()).unwrap();
    assert_eq!(stored.unchanged, 3);
}

#[tokio::test]
async fn test_changed_pages_are_versioned() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    mount_site(&server, "setup v1", "overview v1").await;
    let config = create_test_config(&server, dir.path(), StoreBackend::Filesystem);

    coordinator(config.clone(), clock_at(9, 0, 0)).run().await.unwrap();

    server.reset().await;
    mount_site(&server, "setup v2", "overview silently edited").await;
    let stats = coordinator(config, clock_at(14, 5, 30)).run().await.unwrap();

    assert_eq!(stats.changed, 2);
    assert_eq!(stats.unchanged, 1);
    assert_eq!(
        stats.changed_urls,
        vec![
            format!("{}/docs/overview", server.uri()),
            format!("{}/docs/setup", server.uri()),
        ]
    );

    // Dated page is overwritten in place
    let overview = std::fs::read_to_string(page_file(dir.path(), "overview", "2023-08-18")).unwrap();
    assert!(overview.contains("overview silently edited"));

    // Second undated change on the same day gets a time suffix
    assert!(page_file(dir.path(), "setup", "nodt/20240110").is_file());
    let setup = std::fs::read_to_string(page_file(dir.path(), "setup", "nodt/20240110_140530")).unwrap();
    assert!(setup.contains("setup v2"));
}

#[tokio::test]
async fn test_toc_failure_aborts_before_any_page() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();

    Mock::given(method("GET"))
        .and(path("/docs/toc.json"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let config = create_test_config(&server, dir.path(), StoreBackend::Filesystem);
    let result = coordinator(config, clock_at(9, 0, 0)).run().await;

    assert!(matches!(result, Err(TrackerError::Enumeration(_))));
    assert!(!dir.path().join("stats").exists());
    assert!(!dir.path().join("store").exists());

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1, "only the TOC should have been requested");
}

#[tokio::test]
async fn test_sqlite_backend_run() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    mount_site(&server, "setup v1", "overview v1").await;
    let config = create_test_config(&server, dir.path(), StoreBackend::Sqlite);

    let first = coordinator(config.clone(), clock_at(9, 0, 0)).run().await.unwrap();
    assert_eq!(first.added, 3);
    let second = coordinator(config.clone(), clock_at(9, 30, 0)).run().await.unwrap();
    assert_eq!(second.unchanged, 3);

    assert!(dir.path().join("snapshots.db").is_file());
    assert!(!dir.path().join("store").exists());

    let store = open_store(&config.output).unwrap();
    let slug = slug_from_url(&format!("{}/docs/setup", server.uri())).unwrap();
    let history: Vec<String> = store.history(&slug).unwrap().iter().map(ToString::to_string).collect();
    assert_eq!(history, vec!["nodt/20240110"]);
}
