use serde::{Deserialize, Serialize};

/// Direction of change between the two halves of a chronological series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub enum Trend {
    #[serde(rename = "mejorando")]
    Improving,
    #[serde(rename = "empeorando")]
    Declining,
    #[serde(rename = "estable")]
    Stable,
    #[serde(rename = "sin_datos")]
    NoData,
}

impl std::fmt::Display for Trend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Trend::Improving => write!(f, "mejorando"),
            Trend::Declining => write!(f, "empeorando"),
            Trend::Stable => write!(f, "estable"),
            Trend::NoData => write!(f, "sin_datos"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct GradeStats {
    pub average: f64,
    pub unique_subject_count: usize,
    pub total_count: usize,
    pub trend: Trend,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct AttendanceStats {
    pub present_count: usize,
    pub absent_count: usize,
    pub justified_count: usize,
    pub pending_count: usize,
    pub total_count: usize,
    /// Percentage of attended days (present or justified), one decimal
    pub attendance_rate: f64,
    pub trend: Trend,
}
