use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One year of a student's academic history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct HistoryRecord {
    #[serde(rename = "anio")]
    pub year: i32,
    #[serde(rename = "curso", default)]
    pub course: Option<String>,
    #[serde(rename = "promedioGeneral", default)]
    pub overall_average: Option<f64>,
    #[serde(rename = "porcentajeAsistencia", default)]
    pub attendance_percent: Option<f64>,
    #[serde(rename = "situacionFinal", default)]
    pub final_status: Option<String>,
    #[serde(rename = "observaciones", default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct GradeEntry {
    #[serde(rename = "asignatura")]
    pub subject: String,
    #[serde(rename = "nota")]
    pub grade: f64,
    #[serde(rename = "fecha")]
    pub date: NaiveDate,
}

impl GradeEntry {
    pub fn new(subject: impl Into<String>, grade: f64, date: NaiveDate) -> Self {
        Self {
            subject: subject.into(),
            grade,
            date,
        }
    }
}
