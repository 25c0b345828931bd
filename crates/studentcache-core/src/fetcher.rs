//! Concurrent assembly of a `DataBundle` from the five remote operations.
//!
//! All five calls are issued together and awaited together. Each one is
//! bounded by its own timeout, and a failure only empties its own field:
//! collections become `[]`, stats become `None`. Callers get a usable bundle
//! no matter how many calls fail, plus a report of which ones did.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};

use crate::api::AcademicSource;
use crate::cache::CacheKey;
use crate::error::AcademicError;
use crate::models::{BundleField, DataBundle};

/// Per-call timeout applied by the fetcher, in seconds.
pub const DEFAULT_SUB_FETCH_TIMEOUT_SECS: u64 = 10;

#[derive(Debug)]
pub struct FetchReport {
    pub bundle: DataBundle,
    /// One error per sub-fetch that was replaced by its default
    pub failures: Vec<AcademicError>,
}

impl FetchReport {
    pub fn all_failed(&self) -> bool {
        self.failures.len() == BundleField::ALL.len()
    }

    pub fn failed_fields(&self) -> Vec<BundleField> {
        self.failures.iter().filter_map(|e| e.field()).collect()
    }
}

/// Cheap to clone; the source is shared behind an `Arc`.
#[derive(Clone)]
pub struct Fetcher {
    source: Arc<dyn AcademicSource>,
    timeout: Duration,
}

impl Fetcher {
    pub fn new(source: Arc<dyn AcademicSource>) -> Self {
        Self {
            source,
            timeout: Duration::from_secs(DEFAULT_SUB_FETCH_TIMEOUT_SECS),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    async fn guarded<T, Fut>(&self, field: BundleField, fut: Fut) -> Result<T, AcademicError>
    where
        Fut: Future<Output = anyhow::Result<T>>,
    {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(source)) => Err(AcademicError::SubFetch { field, source }),
            Err(_) => Err(AcademicError::Timeout {
                field,
                elapsed: self.timeout,
            }),
        }
    }

    /// Fetch all five parts for `key`. Never fails; see `FetchReport`.
    pub async fn fetch(&self, key: CacheKey) -> FetchReport {
        let CacheKey { student_id, year } = key;
        let source = &self.source;

        let (history, grades, attendance, grade_stats, attendance_stats) = tokio::join!(
            self.guarded(BundleField::History, source.fetch_history(student_id, year)),
            self.guarded(BundleField::Grades, source.fetch_grades(student_id, year)),
            self.guarded(BundleField::Attendance, source.fetch_attendance(student_id)),
            self.guarded(BundleField::GradeStats, source.fetch_grade_stats(student_id, year)),
            self.guarded(
                BundleField::AttendanceStats,
                source.fetch_attendance_stats(student_id, year)
            ),
        );

        let mut failures = Vec::new();
        let bundle = DataBundle {
            history: or_default(key, history, &mut failures),
            grades: or_default(key, grades, &mut failures),
            attendance: or_default(key, attendance, &mut failures),
            grade_stats: or_default(key, grade_stats, &mut failures),
            attendance_stats: or_default(key, attendance_stats, &mut failures),
        };

        info!(
            student_id,
            year,
            failed = failures.len(),
            grades = bundle.grades.len(),
            attendance = bundle.attendance.len(),
            "Academic bundle fetched"
        );

        FetchReport { bundle, failures }
    }

    /// Like `fetch`, but an error when every sub-fetch failed.
    pub async fn fetch_strict(&self, key: CacheKey) -> Result<DataBundle, AcademicError> {
        let report = self.fetch(key).await;
        if report.all_failed() {
            return Err(AcademicError::AllFetchesFailed {
                student_id: key.student_id,
                year: key.year,
            });
        }
        Ok(report.bundle)
    }
}

/// Unwrap a sub-fetch result or record the failure and fall back to the default
fn or_default<T: Default>(
    key: CacheKey,
    result: Result<T, AcademicError>,
    failures: &mut Vec<AcademicError>,
) -> T {
    match result {
        Ok(value) => value,
        Err(e) => {
            debug!(
                student_id = key.student_id,
                year = key.year,
                sub_fetch = ?e.field(),
                error = %e,
                "Sub-fetch failed, using default"
            );
            failures.push(e);
            T::default()
        }
    }
}
