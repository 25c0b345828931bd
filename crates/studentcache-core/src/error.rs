use std::time::Duration;

use thiserror::Error;

use crate::models::BundleField;

#[derive(Error, Debug)]
pub enum AcademicError {
    #[error("Failed to fetch {field}: {source}")]
    SubFetch {
        field: BundleField,
        #[source]
        source: anyhow::Error,
    },

    #[error("Fetching {field} timed out after {}ms", .elapsed.as_millis())]
    Timeout { field: BundleField, elapsed: Duration },

    #[error("All academic data fetches failed for student {student_id} ({year})")]
    AllFetchesFailed { student_id: i64, year: i32 },

    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl AcademicError {
    /// The bundle field a sub-fetch error belongs to, if any
    pub fn field(&self) -> Option<BundleField> {
        match self {
            AcademicError::SubFetch { field, .. } | AcademicError::Timeout { field, .. } => {
                Some(*field)
            }
            _ => None,
        }
    }
}
