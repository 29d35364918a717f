//! Snapshot engine - the per-URL version decision
//!
//! For one URL the engine fetches the page, works out which version key the body
//! belongs under, compares it against stored history and writes at most one
//! snapshot.
//!
//! # Decision table
//!
//! | History | Declared date | Comparison baseline | Same bytes | Different bytes |
//! |---------|---------------|---------------------|------------|-----------------|
//! | none | any | - | - | write capture key, `Added` |
//! | some | `D` | snapshot at `D`, if any | `Unchanged` | overwrite `D`, `Changed` |
//! | some | `D`, not stored yet | - | - | write `D`, `Changed` |
//! | some | none | latest stored version | `Unchanged` | write `nodt/<today>`, `Changed` |
//!
//! When an undated page changes and the latest version is already one of today's
//! `nodt` markers, the new version gets a `_HHMMSS` suffix so both captures survive.

use crate::crawler::fetcher::Fetcher;
use crate::crawler::parser::{DateResolver, TimeElementResolver};
use crate::state::Outcome;
use crate::storage::{SnapshotStore, StorageResult, VersionKey};
use crate::url::{slug_from_url, Slug};
use crate::TrackerError;
use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// Source of the current time
pub trait Clock: Send + Sync {
    /// Local wall time; its date names undated versions
    fn now(&self) -> NaiveDateTime;

    /// Instant stored as a snapshot's capture time
    ///
    /// Defaults to `now()` read in the local timezone. A wall time skipped by a DST
    /// transition is taken as UTC.
    fn timestamp(&self) -> DateTime<Utc> {
        let now = self.now();
        now.and_local_timezone(Local)
            .earliest()
            .map(|local| local.with_timezone(&Utc))
            .unwrap_or_else(|| now.and_utc())
    }
}

/// Wall clock in the local timezone
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }

    fn timestamp(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// What the engine decided for one page body
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decision {
    pub outcome: Outcome,
    /// Version written, if any
    pub written: Option<VersionKey>,
}

impl Decision {
    fn unchanged() -> Self {
        Self {
            outcome: Outcome::Unchanged,
            written: None,
        }
    }

    fn wrote(outcome: Outcome, version: VersionKey) -> Self {
        Self {
            outcome,
            written: Some(version),
        }
    }
}

/// Decides the outcome for `body` and commits the snapshot it warrants
///
/// `now` supplies today's date for undated captures and the time suffix for a
/// second distinct capture on the same day. `captured_at` is recorded with any
/// snapshot written. Callers must hold the slug's lock.
pub fn commit_snapshot(
    store: &dyn SnapshotStore,
    slug: &Slug,
    declared: Option<NaiveDate>,
    now: NaiveDateTime,
    captured_at: DateTime<Utc>,
    body: &[u8],
) -> StorageResult<Decision> {
    let capture_key = match declared {
        Some(date) => VersionKey::dated(date),
        None => VersionKey::undated(now.date()),
    };

    if !store.exists(slug)? {
        store.write(slug, &capture_key, body, captured_at)?;
        return Ok(Decision::wrote(Outcome::Added, capture_key));
    }

    let versions = store.list_versions(slug)?;

    if declared.is_some() {
        if versions.contains(&capture_key) && store.read(slug, &capture_key)? == body {
            return Ok(Decision::unchanged());
        }
        store.write(slug, &capture_key, body, captured_at)?;
        return Ok(Decision::wrote(Outcome::Changed, capture_key));
    }

    // exists() was true, so an empty listing means the history vanished underneath us
    let Some(latest) = versions.into_iter().max() else {
        store.write(slug, &capture_key, body, captured_at)?;
        return Ok(Decision::wrote(Outcome::Added, capture_key));
    };

    if store.read(slug, &latest)? == body {
        return Ok(Decision::unchanged());
    }

    let target = if latest.is_undated() && latest.day() == now.date() {
        VersionKey::undated_at(now)
    } else {
        capture_key
    };

    store.write(slug, &target, body, captured_at)?;
    Ok(Decision::wrote(Outcome::Changed, target))
}

/// Per-slug async locks guarding the read-compare-write section
#[derive(Default)]
struct SlugLocks {
    locks: Mutex<HashMap<Slug, Arc<AsyncMutex<()>>>>,
}

impl SlugLocks {
    async fn lock(&self, slug: &Slug) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(locks.entry(slug.clone()).or_default())
        };
        lock.lock_owned().await
    }
}

/// Produces exactly one `Outcome` per URL and at most one new snapshot
///
/// The engine keeps no page content between calls; every call re-reads the history
/// it needs from the store. Calls for different slugs may run concurrently; calls
/// for the same slug are serialised.
pub struct SnapshotEngine {
    fetcher: Arc<dyn Fetcher>,
    resolver: Arc<dyn DateResolver>,
    store: Arc<dyn SnapshotStore>,
    clock: Arc<dyn Clock>,
    locks: SlugLocks,
}

impl SnapshotEngine {
    /// Creates an engine using `<time>` element dates and the system clock
    pub fn new(fetcher: Arc<dyn Fetcher>, store: Arc<dyn SnapshotStore>) -> Self {
        Self {
            fetcher,
            resolver: Arc::new(TimeElementResolver),
            store,
            clock: Arc::new(SystemClock),
            locks: SlugLocks::default(),
        }
    }

    /// Replaces the clock
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// The clock this engine reads "today" from
    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// Processes one URL
    ///
    /// Never fails: a fetch failure, a URL without a slug, or a store failure is
    /// logged and reported as `Outcome::Error`. A failed fetch never touches the
    /// store.
    pub async fn process(&self, url: &str) -> Outcome {
        let page = match self.fetcher.fetch(url).await {
            Ok(page) => page,
            Err(e) => {
                tracing::warn!("Fetch failed for {}: {}", url, e);
                return Outcome::Error;
            }
        };

        match self.record(url, &page.body).await {
            Ok(decision) => {
                match (decision.outcome, decision.written) {
                    (Outcome::Unchanged, _) => tracing::debug!("{} unchanged", url),
                    (outcome, Some(version)) => {
                        tracing::info!("{} {} at {}", url, outcome, version)
                    }
                    (outcome, None) => tracing::info!("{} {}", url, outcome),
                }
                decision.outcome
            }
            Err(e) => {
                tracing::warn!("Failed to record snapshot for {}: {}", url, e);
                Outcome::Error
            }
        }
    }

    async fn record(&self, url: &str, body: &[u8]) -> Result<Decision, TrackerError> {
        let slug = slug_from_url(url)?;
        let declared = self.resolver.extract_date(body);
        let now = self.clock.now();
        let captured_at = self.clock.timestamp();

        tracing::trace!(
            "{} -> slug {}, declared date {:?}",
            url,
            slug,
            declared
        );

        let _guard = self.locks.lock(&slug).await;
        Ok(commit_snapshot(
            self.store.as_ref(),
            &slug,
            declared,
            now,
            captured_at,
            body,
        )?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crawler::fetcher::{FetchError, FetchedPage};
    use crate::storage::{FsSnapshotStore, SqliteSnapshotStore};
    use async_trait::async_trait;
    use tempfile::TempDir;

    const URL: &str = "https://docs.example.com/en-us/teams/overview";

    /// Serves whatever body was last scripted for a URL
    #[derive(Default)]
    struct ScriptedFetcher {
        pages: Mutex<HashMap<String, Result<Vec<u8>, u16>>>,
    }

    impl ScriptedFetcher {
        fn serve(&self, url: &str, body: &str) {
            self.pages
                .lock()
                .unwrap()
                .insert(url.to_string(), Ok(body.as_bytes().to_vec()));
        }

        fn fail(&self, url: &str, status: u16) {
            self.pages.lock().unwrap().insert(url.to_string(), Err(status));
        }
    }

    #[async_trait]
    impl Fetcher for ScriptedFetcher {
        async fn fetch(&self, url: &str) -> Result<FetchedPage, FetchError> {
            match self.pages.lock().unwrap().get(url).cloned() {
                Some(Ok(body)) => Ok(FetchedPage {
                    final_url: url.to_string(),
                    status_code: 200,
                    content_type: Some("text/html".to_string()),
                    body,
                }),
                Some(Err(status)) => Err(FetchError::Status {
                    url: url.to_string(),
                    status,
                }),
                None => Err(FetchError::Connect {
                    url: url.to_string(),
                    message: "connection refused".to_string(),
                }),
            }
        }
    }

    /// Clock the test moves by hand
    struct FixedClock(Mutex<NaiveDateTime>);

    impl FixedClock {
        fn at(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> Arc<Self> {
            Arc::new(Self(Mutex::new(dt(y, m, d, h, min, s))))
        }

        fn set(&self, now: NaiveDateTime) {
            *self.0.lock().unwrap() = now;
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> NaiveDateTime {
            *self.0.lock().unwrap()
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn dt(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> NaiveDateTime {
        date(y, m, d).and_hms_opt(h, min, s).unwrap()
    }

    fn dated_page(date: &str, text: &str) -> String {
        format!(r#"<html><body><time datetime="{date}T00:00:00Z"></time><p>{text}</p></body></html>"#)
    }

    fn undated_page(text: &str) -> String {
        format!("<html><body><p>{text}</p></body></html>")
    }

    fn slug() -> Slug {
        slug_from_url(URL).unwrap()
    }

    struct Harness {
        _dir: TempDir,
        fetcher: Arc<ScriptedFetcher>,
        store: Arc<FsSnapshotStore>,
        clock: Arc<FixedClock>,
        engine: SnapshotEngine,
    }

    fn harness() -> Harness {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = Arc::new(ScriptedFetcher::default());
        let store = Arc::new(FsSnapshotStore::new(dir.path(), "index.html"));
        let clock = FixedClock::at(2024, 1, 10, 9, 0, 0);
        let engine = SnapshotEngine::new(fetcher.clone(), store.clone()).with_clock(clock.clone());
        Harness {
            _dir: dir,
            fetcher,
            store,
            clock,
            engine,
        }
    }

    fn sorted_versions(store: &dyn SnapshotStore) -> Vec<String> {
        store
            .history(&slug())
            .unwrap()
            .iter()
            .map(ToString::to_string)
            .collect()
    }

    #[tokio::test]
    async fn test_first_capture_is_added_under_declared_date() {
        let h = harness();
        h.fetcher.serve(URL, &dated_page("2023-08-18", "v1"));

        assert_eq!(h.engine.process(URL).await, Outcome::Added);
        assert_eq!(sorted_versions(h.store.as_ref()), ["2023-08-18"]);
    }

    #[tokio::test]
    async fn test_first_capture_is_added_under_today_marker() {
        let h = harness();
        h.fetcher.serve(URL, &undated_page("v1"));

        assert_eq!(h.engine.process(URL).await, Outcome::Added);
        assert_eq!(sorted_versions(h.store.as_ref()), ["nodt/20240110"]);
    }

    #[tokio::test]
    async fn test_dated_repeat_is_unchanged() {
        let h = harness();
        h.fetcher.serve(URL, &dated_page("2023-08-18", "v1"));

        assert_eq!(h.engine.process(URL).await, Outcome::Added);
        assert_eq!(h.engine.process(URL).await, Outcome::Unchanged);
        assert_eq!(sorted_versions(h.store.as_ref()), ["2023-08-18"]);
    }

    #[tokio::test]
    async fn test_dated_edit_overwrites_in_place() {
        let h = harness();
        h.fetcher.serve(URL, &dated_page("2023-08-18", "v1"));
        h.engine.process(URL).await;

        let edited = dated_page("2023-08-18", "silently edited");
        h.fetcher.serve(URL, &edited);

        assert_eq!(h.engine.process(URL).await, Outcome::Changed);
        assert_eq!(sorted_versions(h.store.as_ref()), ["2023-08-18"]);

        let version = VersionKey::dated(date(2023, 8, 18));
        assert_eq!(h.store.read(&slug(), &version).unwrap(), edited.as_bytes());
    }

    #[tokio::test]
    async fn test_new_declared_date_adds_version() {
        let h = harness();
        h.fetcher.serve(URL, &dated_page("2023-08-18", "v1"));
        h.engine.process(URL).await;

        h.fetcher.serve(URL, &dated_page("2023-09-01", "v2"));

        assert_eq!(h.engine.process(URL).await, Outcome::Changed);
        assert_eq!(sorted_versions(h.store.as_ref()), ["2023-08-18", "2023-09-01"]);
    }

    #[tokio::test]
    async fn test_undated_compares_against_latest_only() {
        let h = harness();
        let old = undated_page("old");
        let current = undated_page("current");
        h.store
            .write(&slug(), &VersionKey::dated(date(2024, 1, 1)), old.as_bytes(), Utc::now())
            .unwrap();
        h.store
            .write(&slug(), &VersionKey::dated(date(2024, 1, 5)), current.as_bytes(), Utc::now())
            .unwrap();

        h.fetcher.serve(URL, &current);
        assert_eq!(h.engine.process(URL).await, Outcome::Unchanged);

        // Matching an older version is still a change against the latest
        h.fetcher.serve(URL, &old);
        assert_eq!(h.engine.process(URL).await, Outcome::Changed);
        assert_eq!(
            sorted_versions(h.store.as_ref()),
            ["2024-01-01", "2024-01-05", "nodt/20240110"]
        );
    }

    #[tokio::test]
    async fn test_undated_unchanged_across_days_does_not_accumulate() {
        let h = harness();
        h.fetcher.serve(URL, &undated_page("stable"));
        h.engine.process(URL).await;

        h.clock.set(dt(2024, 1, 11, 9, 0, 0));
        assert_eq!(h.engine.process(URL).await, Outcome::Unchanged);
        h.clock.set(dt(2024, 1, 12, 9, 0, 0));
        assert_eq!(h.engine.process(URL).await, Outcome::Unchanged);

        assert_eq!(sorted_versions(h.store.as_ref()), ["nodt/20240110"]);
    }

    #[tokio::test]
    async fn test_undated_change_on_later_day_uses_bare_marker() {
        let h = harness();
        h.fetcher.serve(URL, &undated_page("v1"));
        h.engine.process(URL).await;

        h.clock.set(dt(2024, 1, 11, 9, 0, 0));
        h.fetcher.serve(URL, &undated_page("v2"));

        assert_eq!(h.engine.process(URL).await, Outcome::Changed);
        assert_eq!(sorted_versions(h.store.as_ref()), ["nodt/20240110", "nodt/20240111"]);
    }

    #[tokio::test]
    async fn test_two_undated_changes_same_day_keep_both() {
        let h = harness();
        h.store
            .write(&slug(), &VersionKey::dated(date(2023, 12, 1)), b"baseline", Utc::now())
            .unwrap();

        h.fetcher.serve(URL, &undated_page("morning"));
        assert_eq!(h.engine.process(URL).await, Outcome::Changed);

        h.clock.set(dt(2024, 1, 10, 15, 30, 12));
        h.fetcher.serve(URL, &undated_page("afternoon"));
        assert_eq!(h.engine.process(URL).await, Outcome::Changed);

        h.clock.set(dt(2024, 1, 10, 18, 0, 0));
        h.fetcher.serve(URL, &undated_page("evening"));
        assert_eq!(h.engine.process(URL).await, Outcome::Changed);

        assert_eq!(
            sorted_versions(h.store.as_ref()),
            [
                "2023-12-01",
                "nodt/20240110",
                "nodt/20240110_153012",
                "nodt/20240110_180000"
            ]
        );
        let latest = h.store.latest_version(&slug()).unwrap().unwrap();
        assert_eq!(h.store.read(&slug(), &latest).unwrap(), undated_page("evening").as_bytes());
    }

    #[tokio::test]
    async fn test_fetch_failure_never_writes() {
        let h = harness();
        h.fetcher.serve(URL, &undated_page("v1"));
        h.engine.process(URL).await;
        let before = sorted_versions(h.store.as_ref());

        h.fetcher.fail(URL, 500);
        assert_eq!(h.engine.process(URL).await, Outcome::Error);

        assert_eq!(sorted_versions(h.store.as_ref()), before);
    }

    #[tokio::test]
    async fn test_transport_failure_on_unknown_page_leaves_no_trace() {
        let h = harness();
        let other = "https://docs.example.com/en-us/teams/never-served";

        assert_eq!(h.engine.process(other).await, Outcome::Error);

        let never = slug_from_url(other).unwrap();
        assert!(!h.store.exists(&never).unwrap());
        assert!(!h._dir.path().join("never-served").exists());
    }

    #[tokio::test]
    async fn test_url_without_slug_is_error() {
        let h = harness();
        let root = "https://docs.example.com/";
        h.fetcher.serve(root, &undated_page("home"));

        assert_eq!(h.engine.process(root).await, Outcome::Error);
    }

    #[tokio::test]
    async fn test_store_failure_is_error_outcome() {
        let dir = tempfile::tempdir().unwrap();
        // A regular file where the store root should be makes every write fail
        let blocked_root = dir.path().join("not-a-dir");
        std::fs::write(&blocked_root, b"x").unwrap();

        let fetcher = Arc::new(ScriptedFetcher::default());
        fetcher.serve(URL, &undated_page("v1"));
        let store = Arc::new(FsSnapshotStore::new(&blocked_root, "index.html"));
        let engine = SnapshotEngine::new(fetcher, store);

        assert_eq!(engine.process(URL).await, Outcome::Error);
    }

    #[tokio::test]
    async fn test_concurrent_calls_on_same_slug_are_serialised() {
        let h = harness();
        h.fetcher.serve(URL, &undated_page("v1"));

        let (a, b) = tokio::join!(h.engine.process(URL), h.engine.process(URL));
        let mut outcomes = vec![a, b];
        outcomes.sort_by_key(|o| o.as_str());

        assert_eq!(outcomes, vec![Outcome::Added, Outcome::Unchanged]);
        assert_eq!(sorted_versions(h.store.as_ref()), ["nodt/20240110"]);
    }

    #[tokio::test]
    async fn test_engine_works_on_sqlite_store() {
        let fetcher = Arc::new(ScriptedFetcher::default());
        let store = Arc::new(SqliteSnapshotStore::new_in_memory().unwrap());
        let clock = FixedClock::at(2024, 1, 10, 9, 0, 0);
        let engine = SnapshotEngine::new(fetcher.clone(), store.clone()).with_clock(clock);

        fetcher.serve(URL, &dated_page("2023-08-18", "v1"));
        assert_eq!(engine.process(URL).await, Outcome::Added);
        assert_eq!(engine.process(URL).await, Outcome::Unchanged);

        fetcher.serve(URL, &dated_page("2023-08-18", "v2"));
        assert_eq!(engine.process(URL).await, Outcome::Changed);
        assert_eq!(sorted_versions(store.as_ref()), ["2023-08-18"]);
    }

    #[tokio::test]
    async fn test_capture_time_comes_from_clock() {
        let fetcher = Arc::new(ScriptedFetcher::default());
        let store = Arc::new(SqliteSnapshotStore::new_in_memory().unwrap());
        let clock = FixedClock::at(2024, 1, 10, 9, 0, 0);
        let engine = SnapshotEngine::new(fetcher.clone(), store.clone()).with_clock(clock.clone());

        fetcher.serve(URL, &undated_page("v1"));
        assert_eq!(engine.process(URL).await, Outcome::Added);

        let snapshot = store.read_snapshot(&slug(), &VersionKey::undated(date(2024, 1, 10))).unwrap();
        assert_eq!(snapshot.captured_at, clock.timestamp());

        clock.set(dt(2024, 1, 10, 15, 30, 12));
        fetcher.serve(URL, &undated_page("v2"));
        assert_eq!(engine.process(URL).await, Outcome::Changed);

        let latest = store.latest_snapshot(&slug()).unwrap().unwrap();
        assert_eq!(latest.captured_at, clock.timestamp());
        assert!(latest.captured_at > snapshot.captured_at);
    }

    #[test]
    fn test_commit_snapshot_reports_written_version() {
        let store = SqliteSnapshotStore::new_in_memory().unwrap();
        let now = dt(2024, 1, 10, 9, 0, 0);
        let at = Utc::now();

        let first = commit_snapshot(&store, &slug(), None, now, at, b"a").unwrap();
        assert_eq!(first.outcome, Outcome::Added);
        assert_eq!(first.written, Some(VersionKey::undated(date(2024, 1, 10))));

        let repeat = commit_snapshot(&store, &slug(), None, now, at, b"a").unwrap();
        assert_eq!(repeat, Decision::unchanged());
    }

    #[test]
    fn test_dated_key_kept_when_latest_is_undated() {
        let store = SqliteSnapshotStore::new_in_memory().unwrap();
        let now = dt(2024, 1, 10, 9, 0, 0);
        let at = Utc::now();
        commit_snapshot(&store, &slug(), None, now, at, b"undated").unwrap();

        let decision =
            commit_snapshot(&store, &slug(), Some(date(2024, 1, 9)), now, at, b"dated").unwrap();

        assert_eq!(decision.outcome, Outcome::Changed);
        assert_eq!(decision.written, Some(VersionKey::dated(date(2024, 1, 9))));
    }
}
