//! Studentcache Core - academic data access for a student dashboard.
//!
//! This crate provides the cached, read-mostly data layer behind a student's
//! academic tab:
//!
//! - `api`: the `AcademicSource` trait and its REST implementation
//! - `cache`: the per-session `CacheStore` with a 5 minute freshness window
//! - `fetcher`: concurrent, failure-tolerant assembly of a `DataBundle`
//! - `analysis`: averages, counts and trend classification
//! - `controller`: `RefreshController`, the surface a UI talks to
//! - `config`: on-disk configuration

pub mod analysis;
pub mod api;
pub mod cache;
pub mod config;
pub mod controller;
pub mod debounce;
pub mod error;
pub mod fetcher;
pub mod models;

pub use api::{AcademicSource, ApiError, HttpAcademicSource};
pub use cache::{CacheEntry, CacheKey, CacheStore};
pub use config::Config;
pub use controller::{ControllerConfig, ControllerState, RefreshController};
pub use error::AcademicError;
pub use fetcher::{FetchReport, Fetcher};
pub use models::{
    AttendanceEntry, AttendanceKind, AttendanceStats, BundleField, DataBundle, GradeEntry,
    GradeStats, HistoryRecord, LocalPatch, Trend,
};
