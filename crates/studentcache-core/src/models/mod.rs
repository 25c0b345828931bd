//! Data models for a student's academic tab.
//!
//! This module contains the records returned by the remote academic API
//! and the bundle that groups them for one (student, year) pair:
//!
//! - `HistoryRecord`: one year of the student's academic history
//! - `GradeEntry`: a single grade in the tracking ("seguimiento") list
//! - `AttendanceEntry`, `AttendanceKind`: daily attendance marks
//! - `GradeStats`, `AttendanceStats`, `Trend`: descriptive statistics
//! - `DataBundle`, `LocalPatch`: the unified bundle and optimistic edits to it

pub mod academic;
pub mod attendance;
pub mod bundle;
pub mod stats;

pub use academic::{GradeEntry, HistoryRecord};
pub use attendance::{AttendanceEntry, AttendanceKind};
pub use bundle::{BundleField, DataBundle, LocalPatch};
pub use stats::{AttendanceStats, GradeStats, Trend};
