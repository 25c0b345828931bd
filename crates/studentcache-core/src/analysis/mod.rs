//! Descriptive statistics over a student's grades and attendance.
//!
//! Everything here is pure: no I/O, inputs are never mutated, and the same
//! input always yields the same output. An empty collection yields `None`
//! rather than a zero-filled stats object.
//!
//! Trends use a two-window mean-delta heuristic (see [`trend`]). It is a
//! quick directional hint for the dashboard, not a statistical test.

pub mod summary;
pub mod trend;

use std::collections::HashSet;

use crate::models::{AttendanceEntry, AttendanceKind, AttendanceStats, GradeEntry, GradeStats};

pub use summary::{resolve, StatsOrigin, Summary};
pub use trend::{ATTENDANCE_TREND_THRESHOLD, GRADE_TREND_THRESHOLD};

/// Round to one decimal place
pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

fn mean(values: impl ExactSizeIterator<Item = f64>) -> f64 {
    let len = values.len();
    if len == 0 {
        return 0.0;
    }
    values.sum::<f64>() / len as f64
}

/// Percentage of entries that count as attended
fn attended_percent(entries: &[&AttendanceEntry]) -> f64 {
    if entries.is_empty() {
        return 0.0;
    }
    let attended = entries.iter().filter(|e| e.kind.counts_as_attended()).count();
    attended as f64 / entries.len() as f64 * 100.0
}

pub fn grade_stats(grades: &[GradeEntry]) -> Option<GradeStats> {
    if grades.is_empty() {
        return None;
    }

    let mut ordered: Vec<&GradeEntry> = grades.iter().collect();
    ordered.sort_by_key(|g| g.date);

    let subjects: HashSet<&str> = grades.iter().map(|g| g.subject.as_str()).collect();
    let trend = trend::series_trend(&ordered, GRADE_TREND_THRESHOLD, |half| {
        mean(half.iter().map(|g| g.grade))
    });

    Some(GradeStats {
        average: round1(mean(grades.iter().map(|g| g.grade))),
        unique_subject_count: subjects.len(),
        total_count: grades.len(),
        trend,
    })
}

pub fn attendance_stats(entries: &[AttendanceEntry]) -> Option<AttendanceStats> {
    if entries.is_empty() {
        return None;
    }

    let count = |kind: AttendanceKind| entries.iter().filter(|e| e.kind == kind).count();

    let mut ordered: Vec<&AttendanceEntry> = entries.iter().collect();
    ordered.sort_by_key(|e| e.date);

    let trend = trend::series_trend(&ordered, ATTENDANCE_TREND_THRESHOLD, attended_percent);

    Some(AttendanceStats {
        present_count: count(AttendanceKind::Present),
        absent_count: count(AttendanceKind::Absent),
        justified_count: count(AttendanceKind::Justified),
        pending_count: count(AttendanceKind::Pending),
        total_count: entries.len(),
        attendance_rate: round1(attended_percent(&ordered)),
        trend,
    })
}
