//! # Service configuration
//!
//! [`SattleConfig`] gathers every tunable of the engine. Each section has production
//! defaults, so a configuration file only needs the values it changes:
//!
//! ```json
//! {
//!   "site": {"latitude": -30.244633333333333, "longitude": -70.74941666666666, "height": 2662.75},
//!   "search_radius": {"mode": "exposure_scaled", "detector_radius": 6300.0, "search_buffer": 1680.0},
//!   "filter": {"streak_half_width": 0.01},
//!   "cache": {"shards": 16, "max_age_secs": 1800, "eviction_interval_secs": 10},
//!   "catalog": {"historical_window_days": 0.1833}
//! }
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::catalog::DEFAULT_HISTORICAL_WINDOW_DAYS;
use crate::constants::Degree;
use crate::observers::{ObserverSite, SiteConfig};
use crate::sattle_errors::SattleError;
use crate::visit::SearchRadius;
use crate::visit_cache::DEFAULT_SHARDS;
use crate::whitelist::{WhitelistFilter, DEFAULT_STREAK_HALF_WIDTH};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    /// Half-width of a satellite streak in degrees.
    pub streak_half_width: Degree,
}

impl Default for FilterConfig {
    fn default() -> Self {
        FilterConfig {
            streak_half_width: DEFAULT_STREAK_HALF_WIDTH,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub shards: usize,
    /// Entries older than this are evicted by the sweep.
    pub max_age_secs: u64,
    pub eviction_interval_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        CacheConfig {
            shards: DEFAULT_SHARDS,
            max_age_secs: 30 * 60,
            eviction_interval_secs: 10,
        }
    }
}

impl CacheConfig {
    pub fn max_age(&self) -> Duration {
        Duration::from_secs(self.max_age_secs)
    }

    pub fn eviction_interval(&self) -> Duration {
        Duration::from_secs(self.eviction_interval_secs)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    /// Half-width, in days, of the epoch window searched in historical mode.
    pub historical_window_days: f64,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        CatalogConfig {
            historical_window_days: DEFAULT_HISTORICAL_WINDOW_DAYS,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SattleConfig {
    pub site: SiteConfig,
    pub search_radius: SearchRadius,
    pub filter: FilterConfig,
    pub cache: CacheConfig,
    pub catalog: CatalogConfig,
}

impl SattleConfig {
    /// Load and validate a JSON configuration file.
    ///
    /// Errors
    /// ----------
    /// * [`SattleError::IoError`] / [`SattleError::JsonError`] if the file cannot be read or
    ///   parsed, [`SattleError::InvalidConfig`] if a value is out of range.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, SattleError> {
        let text = std::fs::read_to_string(path)?;
        let config: SattleConfig = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), SattleError> {
        self.observer_site()?;
        self.search_radius.validate()?;
        self.whitelist_filter()?;

        if self.cache.shards == 0 {
            return Err(SattleError::InvalidConfig(
                "cache.shards must be at least 1".into(),
            ));
        }
        if self.cache.eviction_interval_secs == 0 {
            return Err(SattleError::InvalidConfig(
                "cache.eviction_interval_secs must be at least 1".into(),
            ));
        }
        let window = self.catalog.historical_window_days;
        if !window.is_finite() || window <= 0.0 {
            return Err(SattleError::InvalidConfig(format!(
                "catalog.historical_window_days must be positive, got {window}"
            )));
        }
        Ok(())
    }

    pub fn observer_site(&self) -> Result<ObserverSite, SattleError> {
        ObserverSite::from_config(&self.site)
    }

    pub fn whitelist_filter(&self) -> Result<WhitelistFilter, SattleError> {
        WhitelistFilter::new(self.filter.streak_half_width)
    }
}
