use anyhow::Result;
use async_trait::async_trait;

use crate::models::{AttendanceEntry, AttendanceStats, GradeEntry, GradeStats, HistoryRecord};

/// The five independent remote operations backing a student's academic tab.
///
/// Implementations should be cheap to share: the fetcher holds one behind an
/// `Arc` and issues all five calls concurrently.
#[async_trait]
pub trait AcademicSource: Send + Sync {
    async fn fetch_history(&self, student_id: i64, year: i32) -> Result<Vec<HistoryRecord>>;

    async fn fetch_grades(&self, student_id: i64, year: i32) -> Result<Vec<GradeEntry>>;

    /// Attendance is not scoped to a year on the remote side.
    async fn fetch_attendance(&self, student_id: i64) -> Result<Vec<AttendanceEntry>>;

    async fn fetch_grade_stats(&self, student_id: i64, year: i32) -> Result<Option<GradeStats>>;

    async fn fetch_attendance_stats(
        &self,
        student_id: i64,
        year: i32,
    ) -> Result<Option<AttendanceStats>>;
}
