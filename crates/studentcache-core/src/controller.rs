//! The academic tab's view of the cache.
//!
//! `RefreshController` is the only type a UI needs. It serves one
//! (student, year) key at a time and exposes a `ControllerState` snapshot:
//! the bundle, a loading flag, the last total-failure error, the fetch time
//! with a human age label, and resolved statistics.
//!
//! - `load` serves a fresh cache entry or fetches a new bundle.
//! - `refresh` always fetches, debounced so a burst of calls makes one trip.
//! - `invalidate` drops every cached bundle without fetching.
//! - `update_local` patches the visible bundle and invalidates the cache so
//!   the next load reconciles with the server.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::FutureExt;
use serde::{Serialize, Serializer};
use tracing::{debug, info, warn};

use crate::analysis::{self, Summary};
use crate::cache::{age_label, CacheEntry, CacheKey, CacheStore};
use crate::debounce::Debouncer;
use crate::error::AcademicError;
use crate::fetcher::Fetcher;
use crate::models::{AttendanceStats, DataBundle, GradeStats, LocalPatch};

/// Window in which repeated `refresh` calls collapse into one.
pub const DEFAULT_DEBOUNCE_MS: u64 = 300;

#[derive(Debug, Clone)]
pub struct ControllerConfig {
    pub debounce: Duration,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(DEFAULT_DEBOUNCE_MS),
        }
    }
}

/// Snapshot of everything the academic tab renders.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ControllerState {
    pub data: DataBundle,
    pub loading: bool,
    #[serde(serialize_with = "serialize_error")]
    pub error: Option<Arc<AcademicError>>,
    pub last_fetch_timestamp: Option<DateTime<Utc>>,
    /// "just now", "3m ago", ... relative to when the snapshot was taken
    pub last_fetch_age: Option<String>,
    pub grade_summary: Option<Summary<GradeStats>>,
    pub attendance_summary: Option<Summary<AttendanceStats>>,
}

impl ControllerState {
    fn show(&mut self, bundle: DataBundle, fetched_at: DateTime<Utc>) {
        self.data = bundle;
        self.last_fetch_timestamp = Some(fetched_at);
        self.resummarize();
    }

    fn resummarize(&mut self) {
        let (grades, attendance) = analysis::resolve(&self.data);
        self.grade_summary = grades;
        self.attendance_summary = attendance;
    }
}

fn serialize_error<S: Serializer>(
    error: &Option<Arc<AcademicError>>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match error {
        Some(e) => serializer.serialize_some(&e.to_string()),
        None => serializer.serialize_none(),
    }
}

struct View {
    key: CacheKey,
    state: ControllerState,
    in_flight: usize,
    /// Ticket of the newest fetch whose result has been applied
    applied: u64,
}

/// Counts one fetch as in flight until dropped, so a `load` future that is
/// cancelled mid-fetch still clears `loading`.
struct InFlight<'a> {
    controller: &'a RefreshController,
}

impl<'a> InFlight<'a> {
    fn enter(controller: &'a RefreshController) -> Self {
        let mut view = controller.view();
        view.in_flight += 1;
        view.state.loading = true;
        Self { controller }
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        let mut view = self.controller.view();
        view.in_flight -= 1;
        view.state.loading = view.in_flight > 0;
    }
}

struct Inner {
    store: Arc<CacheStore>,
    fetcher: Fetcher,
    debouncer: Debouncer,
    view: Mutex<View>,
    next_ticket: AtomicU64,
}

/// Clone is cheap; clones drive the same view.
#[derive(Clone)]
pub struct RefreshController {
    inner: Arc<Inner>,
}

impl RefreshController {
    pub fn new(store: Arc<CacheStore>, fetcher: Fetcher, key: CacheKey) -> Self {
        Self::with_config(store, fetcher, key, ControllerConfig::default())
    }

    pub fn with_config(
        store: Arc<CacheStore>,
        fetcher: Fetcher,
        key: CacheKey,
        config: ControllerConfig,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                store,
                fetcher,
                debouncer: Debouncer::new(config.debounce),
                view: Mutex::new(View {
                    key,
                    state: ControllerState::default(),
                    in_flight: 0,
                    applied: 0,
                }),
                next_ticket: AtomicU64::new(0),
            }),
        }
    }

    fn view(&self) -> MutexGuard<'_, View> {
        self.inner.view.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn key(&self) -> CacheKey {
        self.view().key
    }

    pub fn state(&self) -> ControllerState {
        let mut state = self.view().state.clone();
        let now = self.inner.store.now();
        state.last_fetch_age = state.last_fetch_timestamp.map(|at| age_label(at, now));
        state
    }

    /// Point the controller at another student or year.
    /// The visible state is cleared; results still in flight for the old key
    /// are cached but no longer shown.
    pub fn select(&self, student_id: i64, year: i32) {
        let key = CacheKey::new(student_id, year);
        let mut view = self.view();
        if view.key != key {
            debug!(from = %view.key, to = %key, "Selected new academic key");
            view.key = key;
            let loading = view.state.loading;
            view.state = ControllerState {
                loading,
                ..Default::default()
            };
        }
    }

    /// Serve the current key from cache when fresh, fetching otherwise.
    pub async fn load(&self) -> ControllerState {
        let key = self.key();

        match self.inner.store.get(&key) {
            Some(entry) if self.inner.store.is_fresh(&entry) => {
                debug!(key = %key, "Academic cache hit");
                self.show_entry(key, entry);
                return self.state();
            }
            Some(stale) => {
                debug!(key = %key, fetched_at = %stale.fetched_at, "Academic cache stale");
                // Show the stale bundle while the new one is fetched
                self.show_entry(key, stale);
            }
            None => debug!(key = %key, "Academic cache miss"),
        }

        self.fetch_and_apply(key).await;
        self.state()
    }

    /// Re-fetch the current key, bypassing freshness.
    ///
    /// Calls within the debounce window collapse into one fetch for the key
    /// selected at the time of the last call. Returns immediately; use
    /// `settled` to wait for the fetch.
    pub fn refresh(&self) {
        let key = self.key();
        let this = self.clone();
        self.inner
            .debouncer
            .schedule(async move { this.fetch_and_apply(key).await }.boxed());
    }

    /// Wait for any scheduled refresh to finish.
    pub async fn settled(&self) {
        self.inner.debouncer.settled().await;
    }

    /// Drop every cached bundle. Nothing is re-fetched, and fetches already
    /// in flight are not written to the cache or shown when they land.
    pub fn invalidate(&self) {
        self.inner.store.invalidate_all();
    }

    /// Show a locally known value for one field right away, then invalidate
    /// so the next load fetches the server's version.
    pub fn update_local(&self, patch: LocalPatch) {
        {
            let mut view = self.view();
            debug!(key = %view.key, field = %patch.field(), "Applying local patch");
            view.state.data.apply(patch);
            view.state.resummarize();
        }
        self.invalidate();
    }

    fn show_entry(&self, key: CacheKey, entry: CacheEntry) {
        let mut view = self.view();
        if view.key == key {
            view.state.show(entry.bundle, entry.fetched_at);
            view.state.error = None;
        }
    }

    async fn fetch_and_apply(&self, key: CacheKey) {
        let ticket = self.inner.next_ticket.fetch_add(1, Ordering::AcqRel) + 1;
        let generation = self.inner.store.generation();
        let _in_flight = InFlight::enter(self);

        let result = self.inner.fetcher.fetch_strict(key).await;

        let mut view = self.view();
        if ticket < view.applied {
            debug!(key = %key, ticket, applied = view.applied, "Discarding superseded fetch");
            return;
        }

        let bundle = match result {
            Ok(bundle) => bundle,
            Err(e) => {
                warn!(
                    student_id = key.student_id,
                    year = key.year,
                    error = %e,
                    "Keeping last known academic data"
                );
                if view.key == key {
                    view.applied = ticket;
                    view.state.error = Some(Arc::new(e));
                }
                return;
            }
        };

        let Some(entry) = self.inner.store.set_if_current(key, bundle, generation) else {
            debug!(key = %key, ticket, "Discarding fetch that started before an invalidation");
            return;
        };
        if view.key == key {
            view.applied = ticket;
            view.state.show(entry.bundle, entry.fetched_at);
            view.state.error = None;
            info!(key = %key, ticket, "Academic view updated");
        }
    }
}
