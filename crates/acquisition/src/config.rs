//! Acquisition settings.
//!
//! Loaded from YAML; every field has a default so an empty document is a
//! valid configuration.

use std::collections::BTreeMap;
use std::path::Path;

use eo_common::{Platform, Sensor};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ConfigurationError;
use crate::footprint::DEFAULT_MIN_VALID_FRACTION;

/// Default page cap for catalog searches.
pub const DEFAULT_MAX_ITEMS: usize = 500;

/// Maximum cloud cover percentage when none is configured.
pub const DEFAULT_CLOUD_CEILING: f64 = 80.0;

/// Root acquisition configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AcquisitionConfig {
    /// Size of the per-fetch item worker pool.
    #[serde(default = "default_item_workers")]
    pub item_workers: usize,

    /// Shared band-read limit per fetch. Falls back to the platform default.
    #[serde(default)]
    pub max_concurrent_reads: Option<usize>,

    /// Maximum cloud cover percentage for sensors whose catalog exposes it.
    #[serde(default = "default_cloud_ceiling")]
    pub cloud_ceiling: f64,

    /// Edge-exclusion threshold for footprint maps.
    #[serde(default = "default_min_valid_fraction")]
    pub min_valid_fraction: f64,

    #[serde(default = "default_max_items")]
    pub max_items: usize,

    /// Collection id overrides keyed by sensor, then platform.
    #[serde(default)]
    pub collection_overrides: BTreeMap<Sensor, BTreeMap<Platform, String>>,

    /// STAC endpoint overrides.
    #[serde(default)]
    pub stac_endpoints: BTreeMap<Platform, String>,

    /// Platform preference for automatic selection.
    #[serde(default)]
    pub platform_preference: Option<Vec<Platform>>,
}

fn default_item_workers() -> usize {
    8
}

fn default_cloud_ceiling() -> f64 {
    DEFAULT_CLOUD_CEILING
}

fn default_min_valid_fraction() -> f64 {
    DEFAULT_MIN_VALID_FRACTION
}

fn default_max_items() -> usize {
    DEFAULT_MAX_ITEMS
}

impl Default for AcquisitionConfig {
    fn default() -> Self {
        Self {
            item_workers: default_item_workers(),
            max_concurrent_reads: None,
            cloud_ceiling: default_cloud_ceiling(),
            min_valid_fraction: default_min_valid_fraction(),
            max_items: default_max_items(),
            collection_overrides: BTreeMap::new(),
            stac_endpoints: BTreeMap::new(),
            platform_preference: None,
        }
    }
}

impl AcquisitionConfig {
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigurationError> {
        let config: Self = serde_yaml::from_str(yaml)
            .map_err(|e| ConfigurationError::Invalid(format!("failed to parse YAML: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigurationError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            ConfigurationError::Invalid(format!("failed to read {}: {}", path.display(), e))
        })?;
        debug!(path = %path.display(), "Loading acquisition config");
        Self::from_yaml_str(&content)
    }

    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.item_workers == 0 {
            return Err(ConfigurationError::Invalid(
                "item_workers must be at least 1".to_string(),
            ));
        }
        if self.max_concurrent_reads == Some(0) {
            return Err(ConfigurationError::Invalid(
                "max_concurrent_reads must be at least 1".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.min_valid_fraction) {
            return Err(ConfigurationError::Invalid(format!(
                "min_valid_fraction must be within [0, 1], got {}",
                self.min_valid_fraction
            )));
        }
        if !(0.0..=100.0).contains(&self.cloud_ceiling) {
            return Err(ConfigurationError::Invalid(format!(
                "cloud_ceiling must be within [0, 100], got {}",
                self.cloud_ceiling
            )));
        }
        if self.max_items == 0 {
            return Err(ConfigurationError::Invalid(
                "max_items must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Band-read limit for one fetch on `platform`.
    pub fn read_limit_for(&self, platform: Platform) -> usize {
        self.max_concurrent_reads
            .unwrap_or_else(|| default_read_limit(platform))
    }

    /// STAC search root for `platform`, if it has one.
    pub fn stac_endpoint(&self, platform: Platform) -> Option<String> {
        self.stac_endpoints
            .get(&platform)
            .cloned()
            .or_else(|| default_stac_endpoint(platform).map(str::to_string))
    }

    pub fn collection_override(&self, sensor: Sensor, platform: Platform) -> Option<&str> {
        self.collection_overrides
            .get(&sensor)
            .and_then(|m| m.get(&platform))
            .map(String::as_str)
    }
}

/// Per-platform band-read limit. Copernicus and Earthdata throttle harder.
pub fn default_read_limit(platform: Platform) -> usize {
    match platform {
        Platform::Cdse | Platform::Earthdata => 4,
        Platform::Aws | Platform::Planetary | Platform::Gee => 8,
    }
}

pub fn default_stac_endpoint(platform: Platform) -> Option<&'static str> {
    match platform {
        Platform::Aws => Some("https://earth-search.aws.element84.com/v1"),
        Platform::Cdse => Some("https://stac.dataspace.copernicus.eu/v1"),
        Platform::Planetary => Some("https://planetarycomputer.microsoft.com/api/stac/v1"),
        Platform::Earthdata => Some("https://cmr.earthdata.nasa.gov/stac/LPCLOUD"),
        Platform::Gee => None,
    }
}
