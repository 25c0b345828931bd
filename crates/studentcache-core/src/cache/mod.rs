//! In-memory cache for academic bundles.
//!
//! This module provides the `CacheStore`, which maps a (student, year) key to
//! the last bundle fetched for it together with the fetch time. A bundle is
//! fresh for 5 minutes by default; stale entries are kept but ignored until a
//! new fetch overwrites them.

pub mod clock;
pub mod store;

pub use clock::{Clock, ManualClock, SystemClock};
pub use store::{age_label, CacheEntry, CacheKey, CacheStore, DEFAULT_FRESHNESS_MINUTES};
