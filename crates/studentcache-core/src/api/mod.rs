//! Remote academic data source.
//!
//! `AcademicSource` is the seam between the cache layer and wherever the
//! records come from. `HttpAcademicSource` implements it over the REST API
//! that backs the dashboard; tests implement it in memory.

pub mod client;
pub mod error;
pub mod source;

pub use client::HttpAcademicSource;
pub use error::ApiError;
pub use source::AcademicSource;
