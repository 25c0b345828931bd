//! Two-window trend classification.
//!
//! A chronological series is split at `floor(n / 2)` and the metric of the
//! second half is compared to the metric of the first. For odd lengths the
//! middle item belongs to both halves. Fewer than two items is `Stable`.

use crate::models::Trend;

/// Grade points the half-means must differ by to count as a change.
pub const GRADE_TREND_THRESHOLD: f64 = 0.5;

/// Percentage points the half attendance rates must differ by.
pub const ATTENDANCE_TREND_THRESHOLD: f64 = 5.0;

/// Split a series into its first and second halves, sharing the middle item
/// when the length is odd.
pub fn halves<T>(items: &[T]) -> (&[T], &[T]) {
    let mid = items.len() / 2;
    (&items[..items.len() - mid], &items[mid..])
}

pub fn classify(first: f64, second: f64, threshold: f64) -> Trend {
    let delta = second - first;
    if delta > threshold {
        Trend::Improving
    } else if delta < -threshold {
        Trend::Declining
    } else {
        Trend::Stable
    }
}

/// Classify an already chronologically ordered series.
pub fn series_trend<T, F>(items: &[T], threshold: f64, metric: F) -> Trend
where
    F: Fn(&[T]) -> f64,
{
    if items.len() < 2 {
        return Trend::Stable;
    }
    let (first, second) = halves(items);
    classify(metric(first), metric(second), threshold)
}
