//! Configuration for the academic cache.
//!
//! Configuration is stored at `~/.config/studentcache/config.json`. A missing
//! file, or a missing key inside it, falls back to the defaults below.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::api::AcademicSource;
use crate::cache::{CacheStore, Clock, SystemClock, DEFAULT_FRESHNESS_MINUTES};
use crate::controller::{ControllerConfig, DEFAULT_DEBOUNCE_MS};
use crate::error::AcademicError;
use crate::fetcher::{Fetcher, DEFAULT_SUB_FETCH_TIMEOUT_SECS};

/// Application name used for the config directory path
const APP_NAME: &str = "studentcache";

/// Config file name
const CONFIG_FILE: &str = "config.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api_base_url: Option<String>,
    pub freshness_minutes: i64,
    pub debounce_ms: u64,
    pub sub_fetch_timeout_secs: u64,
    /// Upper bound on cached (student, year) bundles; unbounded when unset
    pub max_cache_entries: Option<usize>,
    /// Treat a bundle where every sub-fetch failed as a hard error
    pub strict_fetch: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: None,
            freshness_minutes: DEFAULT_FRESHNESS_MINUTES,
            debounce_ms: DEFAULT_DEBOUNCE_MS,
            sub_fetch_timeout_secs: DEFAULT_SUB_FETCH_TIMEOUT_SECS,
            max_cache_entries: None,
            strict_fetch: false,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: Self = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    pub fn validate(&self) -> Result<(), AcademicError> {
        if self.freshness_minutes <= 0 {
            return Err(AcademicError::Config(
                "freshness_minutes must be positive".to_string(),
            ));
        }
        if self.sub_fetch_timeout_secs == 0 {
            return Err(AcademicError::Config(
                "sub_fetch_timeout_secs must be positive".to_string(),
            ));
        }
        if self.max_cache_entries == Some(0) {
            return Err(AcademicError::Config(
                "max_cache_entries must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn cache_store(&self) -> CacheStore {
        self.cache_store_with_clock(Arc::new(SystemClock))
    }

    pub fn cache_store_with_clock(&self, clock: Arc<dyn Clock>) -> CacheStore {
        let store = CacheStore::with_clock(clock)
            .with_freshness(chrono::Duration::minutes(self.freshness_minutes));
        match self.max_cache_entries {
            Some(max) => store.with_capacity(max),
            None => store,
        }
    }

    pub fn fetcher(&self, source: Arc<dyn AcademicSource>) -> Fetcher {
        Fetcher::new(source).with_timeout(Duration::from_secs(self.sub_fetch_timeout_secs))
    }

    pub fn controller_config(&self) -> ControllerConfig {
        ControllerConfig {
            debounce: Duration::from_millis(self.debounce_ms),
        }
    }
}
