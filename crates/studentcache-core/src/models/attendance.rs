use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub enum AttendanceKind {
    #[serde(rename = "Presente")]
    Present,
    #[serde(rename = "Ausente")]
    Absent,
    #[serde(rename = "Justificada")]
    Justified,
    #[serde(rename = "Pendiente")]
    Pending,
}

impl AttendanceKind {
    /// Present and justified days count as attended; absent and pending do not.
    pub fn counts_as_attended(&self) -> bool {
        matches!(self, AttendanceKind::Present | AttendanceKind::Justified)
    }
}

impl std::fmt::Display for AttendanceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AttendanceKind::Present => write!(f, "Presente"),
            AttendanceKind::Absent => write!(f, "Ausente"),
            AttendanceKind::Justified => write!(f, "Justificada"),
            AttendanceKind::Pending => write!(f, "Pendiente"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct AttendanceEntry {
    #[serde(rename = "fecha")]
    pub date: NaiveDate,
    #[serde(rename = "tipo")]
    pub kind: AttendanceKind,
}

impl AttendanceEntry {
    pub fn new(date: NaiveDate, kind: AttendanceKind) -> Self {
        Self { date, kind }
    }
}
