//! Choosing between server-supplied and locally computed statistics.
//!
//! The remote API may return precomputed stats alongside the raw lists.
//! Those are authoritative whenever present; local analysis only fills in
//! a field the server left empty. Every summary records where it came from.

use serde::{Deserialize, Serialize};

use crate::models::{AttendanceStats, DataBundle, GradeStats};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub enum StatsOrigin {
    Server,
    Local,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct Summary<T> {
    pub stats: T,
    pub origin: StatsOrigin,
}

impl<T> Summary<T> {
    fn server(stats: T) -> Self {
        Self {
            stats,
            origin: StatsOrigin::Server,
        }
    }

    fn local(stats: T) -> Self {
        Self {
            stats,
            origin: StatsOrigin::Local,
        }
    }
}

/// Resolved grade and attendance summaries for a bundle.
pub fn resolve(
    bundle: &DataBundle,
) -> (Option<Summary<GradeStats>>, Option<Summary<AttendanceStats>>) {
    let grades = match &bundle.grade_stats {
        Some(stats) => Some(Summary::server(stats.clone())),
        None => super::grade_stats(&bundle.grades).map(Summary::local),
    };
    let attendance = match &bundle.attendance_stats {
        Some(stats) => Some(Summary::server(stats.clone())),
        None => super::attendance_stats(&bundle.attendance).map(Summary::local),
    };
    (grades, attendance)
}
