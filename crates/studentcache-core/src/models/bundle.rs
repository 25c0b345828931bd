use serde::{Deserialize, Serialize};

use super::{AttendanceEntry, AttendanceStats, GradeEntry, GradeStats, HistoryRecord};

/// Everything the academic tab shows for one (student, year) pair.
///
/// Each field is filled by its own remote call. A failed call leaves its
/// field empty (or `None` for stats); the bundle itself always exists.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct DataBundle {
    #[serde(rename = "historial", default)]
    pub history: Vec<HistoryRecord>,
    #[serde(rename = "seguimiento", default)]
    pub grades: Vec<GradeEntry>,
    #[serde(rename = "asistencias", default)]
    pub attendance: Vec<AttendanceEntry>,
    #[serde(rename = "statsSeguimiento", default)]
    pub grade_stats: Option<GradeStats>,
    #[serde(rename = "statsAsistencia", default)]
    pub attendance_stats: Option<AttendanceStats>,
}

impl DataBundle {
    /// Replace one field wholesale with a locally known value.
    pub fn apply(&mut self, patch: LocalPatch) {
        match patch {
            LocalPatch::History(v) => self.history = v,
            LocalPatch::Grades(v) => self.grades = v,
            LocalPatch::Attendance(v) => self.attendance = v,
            LocalPatch::GradeStats(v) => self.grade_stats = v,
            LocalPatch::AttendanceStats(v) => self.attendance_stats = v,
        }
    }
}

/// The five independently fetched parts of a bundle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BundleField {
    #[serde(rename = "historial")]
    History,
    #[serde(rename = "seguimiento")]
    Grades,
    #[serde(rename = "asistencias")]
    Attendance,
    #[serde(rename = "statsSeguimiento")]
    GradeStats,
    #[serde(rename = "statsAsistencia")]
    AttendanceStats,
}

impl BundleField {
    pub const ALL: [BundleField; 5] = [
        BundleField::History,
        BundleField::Grades,
        BundleField::Attendance,
        BundleField::GradeStats,
        BundleField::AttendanceStats,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            BundleField::History => "historial",
            BundleField::Grades => "seguimiento",
            BundleField::Attendance => "asistencias",
            BundleField::GradeStats => "statsSeguimiento",
            BundleField::AttendanceStats => "statsAsistencia",
        }
    }
}

impl std::fmt::Display for BundleField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// An optimistic replacement for one bundle field, applied after a local
/// create/update/delete before the server confirms it.
#[derive(Debug, Clone, PartialEq)]
pub enum LocalPatch {
    History(Vec<HistoryRecord>),
    Grades(Vec<GradeEntry>),
    Attendance(Vec<AttendanceEntry>),
    GradeStats(Option<GradeStats>),
    AttendanceStats(Option<AttendanceStats>),
}

impl LocalPatch {
    pub fn field(&self) -> BundleField {
        match self {
            LocalPatch::History(_) => BundleField::History,
            LocalPatch::Grades(_) => BundleField::Grades,
            LocalPatch::Attendance(_) => BundleField::Attendance,
            LocalPatch::GradeStats(_) => BundleField::GradeStats,
            LocalPatch::AttendanceStats(_) => BundleField::AttendanceStats,
        }
    }
}
