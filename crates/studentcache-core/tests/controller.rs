//! Integration tests for RefreshController.
//!
//! Uses an in-memory source that counts round trips. Freshness is driven by a
//! ManualClock; debounce and slow calls run on paused tokio time.

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::NaiveDate;

use studentcache_core::analysis::StatsOrigin;
use studentcache_core::cache::ManualClock;
use studentcache_core::{
    AcademicError, AcademicSource, AttendanceEntry, AttendanceKind, AttendanceStats, BundleField,
    CacheKey, CacheStore, ControllerConfig, Fetcher, GradeEntry, GradeStats, HistoryRecord,
    LocalPatch, RefreshController, Trend,
};

fn date(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 4, day).unwrap()
}

/// Counts fetch cycles and serves a grade whose value encodes the cycle.
#[derive(Default)]
struct CountingSource {
    cycles: AtomicUsize,
    grade_calls: AtomicUsize,
    failing: Mutex<HashSet<BundleField>>,
    slow_first_grades: Option<Duration>,
    students_seen: Mutex<Vec<(i64, i32)>>,
}

impl CountingSource {
    fn cycles(&self) -> usize {
        self.cycles.load(Ordering::SeqCst)
    }

    fn fail(&self, fields: impl IntoIterator<Item = BundleField>) {
        let mut failing = self.failing.lock().unwrap();
        failing.clear();
        failing.extend(fields);
    }

    fn check(&self, field: BundleField) -> Result<()> {
        if self.failing.lock().unwrap().contains(&field) {
            return Err(anyhow!("{} failed", field));
        }
        Ok(())
    }
}

#[async_trait]
impl AcademicSource for CountingSource {
    async fn fetch_history(&self, student_id: i64, year: i32) -> Result<Vec<HistoryRecord>> {
        self.cycles.fetch_add(1, Ordering::SeqCst);
        self.students_seen.lock().unwrap().push((student_id, year));
        self.check(BundleField::History)?;
        Ok(vec![HistoryRecord {
            year,
            course: Some("1° Medio".to_string()),
            overall_average: Some(5.6),
            attendance_percent: None,
            final_status: Some("Promovido".to_string()),
            notes: None,
        }])
    }

    async fn fetch_grades(&self, _student_id: i64, _year: i32) -> Result<Vec<GradeEntry>> {
        let n = self.grade_calls.fetch_add(1, Ordering::SeqCst) + 1;
        if n == 1 {
            if let Some(delay) = self.slow_first_grades {
                tokio::time::sleep(delay).await;
            }
        }
        self.check(BundleField::Grades)?;
        Ok(vec![
            GradeEntry::new("Matemática", 3.0, date(1)),
            GradeEntry::new("Lenguaje", 3.0, date(2)),
            GradeEntry::new("Matemática", 6.0, date(3)),
            GradeEntry::new("Biología", n as f64, date(4)),
        ])
    }

    async fn fetch_attendance(&self, _student_id: i64) -> Result<Vec<AttendanceEntry>> {
        self.check(BundleField::Attendance)?;
        Ok(vec![
            AttendanceEntry::new(date(1), AttendanceKind::Present),
            AttendanceEntry::new(date(2), AttendanceKind::Absent),
        ])
    }

    async fn fetch_grade_stats(&self, _student_id: i64, _year: i32) -> Result<Option<GradeStats>> {
        self.check(BundleField::GradeStats)?;
        Ok(None)
    }

    async fn fetch_attendance_stats(
        &self,
        _student_id: i64,
        _year: i32,
    ) -> Result<Option<AttendanceStats>> {
        self.check(BundleField::AttendanceStats)?;
        Ok(Some(AttendanceStats {
            present_count: 180,
            absent_count: 10,
            justified_count: 5,
            pending_count: 0,
            total_count: 195,
            attendance_rate: 94.9,
            trend: Trend::Stable,
        }))
    }
}

struct Harness {
    source: Arc<CountingSource>,
    clock: Arc<ManualClock>,
    store: Arc<CacheStore>,
    controller: RefreshController,
}

fn harness_with(source: CountingSource) -> Harness {
    let source = Arc::new(source);
    let clock = Arc::new(ManualClock::default());
    let store = Arc::new(CacheStore::with_clock(clock.clone()));
    let controller = RefreshController::with_config(
        Arc::clone(&store),
        Fetcher::new(source.clone()),
        CacheKey::new(42, 2024),
        ControllerConfig {
            debounce: Duration::from_millis(300),
        },
    );
    Harness {
        source,
        clock,
        store,
        controller,
    }
}

fn harness() -> Harness {
    harness_with(CountingSource::default())
}

/// The first grades call takes two seconds; later ones answer at once.
fn slow_harness() -> Harness {
    harness_with(CountingSource {
        slow_first_grades: Some(Duration::from_secs(2)),
        ..Default::default()
    })
}

#[tokio::test]
async fn test_second_load_within_window_hits_cache() {
    let h = harness();

    let first = h.controller.load().await;
    h.clock.advance(chrono::Duration::minutes(4));
    let second = h.controller.load().await;

    assert_eq!(h.source.cycles(), 1);
    assert_eq!(first.data, second.data);
    assert!(!second.loading);
    assert!(second.error.is_none());
}

#[tokio::test]
async fn test_load_after_window_refetches() {
    let h = harness();

    h.controller.load().await;
    h.clock.advance(chrono::Duration::minutes(5) + chrono::Duration::seconds(1));
    h.controller.load().await;

    assert_eq!(h.source.cycles(), 2);
}

#[tokio::test]
async fn test_single_sub_fetch_failure_is_invisible() {
    let h = harness();
    h.source.fail([BundleField::Attendance]);

    let state = h.controller.load().await;

    assert!(state.error.is_none());
    assert!(state.data.attendance.is_empty());
    assert_eq!(state.data.history.len(), 1);
    assert_eq!(state.data.grades.len(), 4);
    assert!(state.data.attendance_stats.is_some());
    // Partial bundles are still cached
    assert!(h.store.get(&CacheKey::new(42, 2024)).is_some());
}

#[tokio::test]
async fn test_total_failure_without_prior_data() {
    let h = harness();
    h.source.fail(BundleField::ALL);

    let state = h.controller.load().await;

    assert!(matches!(
        state.error.as_deref(),
        Some(AcademicError::AllFetchesFailed {
            student_id: 42,
            year: 2024
        })
    ));
    assert!(state.data.history.is_empty());
    assert!(state.data.grades.is_empty());
    assert!(state.last_fetch_timestamp.is_none());
    assert!(h.store.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_total_failure_keeps_last_known_data() {
    let h = harness();
    let good = h.controller.load().await;
    assert!(good.error.is_none());

    h.source.fail(BundleField::ALL);
    h.controller.refresh();
    h.controller.settled().await;

    let state = h.controller.state();
    assert!(state.error.is_some());
    assert_eq!(state.data, good.data);
    assert_eq!(state.last_fetch_timestamp, good.last_fetch_timestamp);
    assert_eq!(h.source.cycles(), 2);

    // A later success clears the error
    h.source.fail([]);
    h.controller.refresh();
    h.controller.settled().await;
    assert!(h.controller.state().error.is_none());
}

#[tokio::test]
async fn test_stale_entry_shown_when_refetch_fails() {
    let h = harness();
    let good = h.controller.load().await;

    h.clock.advance(chrono::Duration::minutes(10));
    h.source.fail(BundleField::ALL);
    h.controller.select(7, 2024);
    h.controller.select(42, 2024);
    let state = h.controller.load().await;

    assert!(state.error.is_some());
    assert_eq!(state.data, good.data);
}

#[tokio::test(start_paused = true)]
async fn test_refresh_burst_makes_one_trip() {
    let h = harness();

    h.controller.refresh();
    tokio::time::sleep(Duration::from_millis(100)).await;
    h.controller.refresh();
    tokio::time::sleep(Duration::from_millis(100)).await;
    h.controller.refresh();
    h.controller.settled().await;

    assert_eq!(h.source.cycles(), 1);
    assert_eq!(h.controller.state().data.grades.len(), 4);
}

#[tokio::test(start_paused = true)]
async fn test_refresh_burst_uses_last_selection() {
    let h = harness();

    h.controller.refresh();
    h.controller.select(7, 2023);
    h.controller.refresh();
    h.controller.select(9, 2025);
    h.controller.refresh();
    h.controller.settled().await;

    assert_eq!(*h.source.students_seen.lock().unwrap(), vec![(9, 2025)]);
    assert!(h.store.get(&CacheKey::new(9, 2025)).is_some());
}

#[tokio::test]
async fn test_refresh_bypasses_fresh_cache() {
    let h = harness();
    h.controller.load().await;
    h.controller.refresh();
    h.controller.settled().await;
    assert_eq!(h.source.cycles(), 2);
}

#[tokio::test]
async fn test_update_local_is_visible_then_refetched() {
    let h = harness();
    h.controller.load().await;

    let local = vec![GradeEntry::new("Música", 7.0, date(10))];
    h.controller.update_local(LocalPatch::Grades(local.clone()));

    let state = h.controller.state();
    assert_eq!(state.data.grades, local);
    assert!(h.store.is_empty());

    let state = h.controller.load().await;
    assert_eq!(h.source.cycles(), 2);
    assert_eq!(state.data.grades.len(), 4);
}

#[tokio::test]
async fn test_invalidate_clears_every_key_without_fetching() {
    let h = harness();
    h.controller.load().await;
    h.controller.select(7, 2023);
    h.controller.load().await;
    assert_eq!(h.store.len(), 2);

    h.controller.invalidate();

    assert!(h.store.is_empty());
    assert_eq!(h.source.cycles(), 2);
}

#[tokio::test]
async fn test_controllers_share_store() {
    let h = harness();
    h.controller.load().await;

    let other = RefreshController::new(
        Arc::clone(&h.store),
        Fetcher::new(h.source.clone()),
        CacheKey::new(42, 2024),
    );
    let state = other.load().await;

    assert_eq!(h.source.cycles(), 1);
    assert_eq!(state.data.history.len(), 1);
}

#[tokio::test]
async fn test_summaries_prefer_server_stats() {
    let h = harness();
    let state = h.controller.load().await;

    // Server returned no grade stats, so grades are summarized locally
    let grades = state.grade_summary.unwrap();
    assert_eq!(grades.origin, StatsOrigin::Local);
    assert_eq!(grades.stats.total_count, 4);
    assert_eq!(grades.stats.unique_subject_count, 3);

    let attendance = state.attendance_summary.unwrap();
    assert_eq!(attendance.origin, StatsOrigin::Server);
    assert_eq!(attendance.stats.total_count, 195);
}

#[tokio::test]
async fn test_empty_grades_have_no_summary() {
    let h = harness();
    h.controller.load().await;
    h.controller.update_local(LocalPatch::Grades(vec![]));
    assert!(h.controller.state().grade_summary.is_none());
}

#[tokio::test(start_paused = true)]
async fn test_superseded_fetch_is_discarded() {
    let h = slow_harness();

    let slow = h.controller.clone();
    let fast = h.controller.clone();
    tokio::join!(slow.load(), async move {
        tokio::time::sleep(Duration::from_millis(10)).await;
        fast.load().await
    });

    // The second cycle's grades are applied; the slow first cycle finishes
    // later but must not overwrite them
    let state = h.controller.state();
    assert_eq!(h.source.cycles(), 2);
    assert_eq!(state.data.grades[3].grade, 2.0);
    let cached = h.store.get(&CacheKey::new(42, 2024)).unwrap();
    assert_eq!(cached.bundle.grades[3].grade, 2.0);
    assert!(!state.loading);
}

#[tokio::test]
async fn test_state_serializes_for_ui() {
    let h = harness();
    h.source.fail(BundleField::ALL);
    let state = h.controller.load().await;

    let json = serde_json::to_value(&state).unwrap();
    assert_eq!(json["loading"], false);
    assert!(json["error"].as_str().unwrap().contains("All academic data fetches failed"));
    assert!(json["data"]["seguimiento"].as_array().unwrap().is_empty());
    assert!(json["lastFetchTimestamp"].is_null());
    assert!(json["lastFetchAge"].is_null());
}

#[tokio::test]
async fn test_state_reports_fetch_age() {
    let h = harness();
    let state = h.controller.load().await;
    assert_eq!(state.last_fetch_age.as_deref(), Some("just now"));

    h.clock.advance(chrono::Duration::minutes(12));
    let state = h.controller.state();
    assert_eq!(state.last_fetch_age.as_deref(), Some("12m ago"));

    let json = serde_json::to_value(&state).unwrap();
    assert_eq!(json["lastFetchAge"], "12m ago");
}

#[tokio::test(start_paused = true)]
async fn test_update_local_during_fetch_forces_refetch() {
    let h = slow_harness();

    let pending = {
        let controller = h.controller.clone();
        tokio::spawn(async move { controller.load().await })
    };
    tokio::time::sleep(Duration::from_millis(100)).await;
    let local = vec![GradeEntry::new("Música", 7.0, date(10))];
    h.controller.update_local(LocalPatch::Grades(local.clone()));

    // The fetch that was already running lands after the edit and is dropped
    let state = pending.await.unwrap();
    assert_eq!(state.data.grades, local);
    assert!(!state.loading);
    assert!(h.store.is_empty());

    let state = h.controller.load().await;
    assert_eq!(h.source.cycles(), 2);
    assert_eq!(state.data.grades.len(), 4);
    assert_eq!(state.data.grades[3].grade, 2.0);
}

#[tokio::test(start_paused = true)]
async fn test_invalidate_during_fetch_discards_result() {
    let h = slow_harness();

    let pending = {
        let controller = h.controller.clone();
        tokio::spawn(async move { controller.load().await })
    };
    tokio::time::sleep(Duration::from_millis(100)).await;
    h.controller.invalidate();

    let state = pending.await.unwrap();
    assert!(h.store.is_empty());
    assert!(state.data.grades.is_empty());
    assert!(state.last_fetch_timestamp.is_none());
    assert_eq!(h.source.cycles(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_cancelled_load_clears_loading() {
    let h = slow_harness();

    let cancelled = tokio::time::timeout(Duration::from_millis(50), h.controller.load()).await;
    assert!(cancelled.is_err());
    assert!(!h.controller.state().loading);

    let state = h.controller.load().await;
    assert!(!state.loading);
    assert_eq!(state.data.grades.len(), 4);
    assert_eq!(h.source.cycles(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_refresh_burst_while_settling_makes_one_trip() {
    let h = harness();

    h.controller.refresh();
    let waiter = {
        let controller = h.controller.clone();
        tokio::spawn(async move { controller.settled().await })
    };
    tokio::time::sleep(Duration::from_millis(10)).await;
    h.controller.refresh();
    tokio::time::sleep(Duration::from_millis(10)).await;
    h.controller.refresh();

    waiter.await.unwrap();
    assert_eq!(h.source.cycles(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_out_of_order_refreshes_keep_newest() {
    let h = slow_harness();

    h.controller.refresh();
    // The first refresh has fired and its grades call is still running
    tokio::time::sleep(Duration::from_millis(400)).await;
    h.controller.refresh();
    h.controller.settled().await;

    let state = h.controller.state();
    assert_eq!(h.source.cycles(), 2);
    assert_eq!(state.data.grades[3].grade, 2.0);
    let cached = h.store.get(&CacheKey::new(42, 2024)).unwrap();
    assert_eq!(cached.bundle.grades[3].grade, 2.0);
    assert!(!state.loading);
}
