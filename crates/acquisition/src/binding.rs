//! Sensor × platform bindings.
//!
//! A binding is the glue that lets one generic pipeline fetch a sensor from
//! a given host: which collection to search, which assets hold the bands
//! (in sensor band order), which asset holds the QA flags, and how each is
//! resampled.

use std::borrow::Cow;
use std::collections::BTreeMap;

use eo_common::{Platform, Sensor};
use serde::{Deserialize, Serialize};

use crate::config::AcquisitionConfig;
use crate::error::ConfigurationError;

/// Resampling applied by the raster collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Resample {
    Nearest,
    Bilinear,
}

impl Resample {
    pub fn as_str(&self) -> &'static str {
        match self {
            Resample::Nearest => "nearest",
            Resample::Bilinear => "bilinear",
        }
    }
}

/// Everything needed to fetch one sensor from one platform.
#[derive(Debug, Clone, PartialEq)]
pub struct SensorPlatformBinding {
    pub sensor: Sensor,
    pub platform: Platform,
    /// Remote collection id (STAC collection or GEE asset id).
    pub collection: Cow<'static, str>,
    /// Asset keys in sensor band order.
    pub band_keys: &'static [&'static str],
    pub qa_key: &'static str,
    /// Item properties holding the tile identifier, tried in order.
    pub tile_filter_keys: &'static [&'static str],
    pub resample: Resample,
    pub qa_resample: Resample,
    /// Item property holding the processing baseline, if the sensor has one.
    pub baseline_property: Option<&'static str>,
}

impl SensorPlatformBinding {
    const fn new(
        sensor: Sensor,
        platform: Platform,
        collection: &'static str,
        band_keys: &'static [&'static str],
        qa_key: &'static str,
    ) -> Self {
        Self {
            sensor,
            platform,
            collection: Cow::Borrowed(collection),
            band_keys,
            qa_key,
            tile_filter_keys: &[],
            resample: Resample::Bilinear,
            qa_resample: Resample::Nearest,
            baseline_property: None,
        }
    }

    const fn with_tile_keys(mut self, keys: &'static [&'static str]) -> Self {
        self.tile_filter_keys = keys;
        self
    }

    const fn with_baseline(mut self, property: &'static str) -> Self {
        self.baseline_property = Some(property);
        self
    }

    /// Every asset a complete item must carry: bands then QA.
    pub fn required_assets(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.band_keys.iter().copied().chain(std::iter::once(self.qa_key))
    }

    pub fn band_count(&self) -> usize {
        self.band_keys.len()
    }
}

const S2_AWS_BANDS: &[&str] = &[
    "blue", "green", "red", "rededge1", "rededge2", "rededge3", "nir", "nir08", "swir16", "swir22",
];
const S2_CDSE_BANDS: &[&str] = &[
    "B02_10m", "B03_10m", "B04_10m", "B05_20m", "B06_20m", "B07_20m", "B08_10m", "B8A_20m",
    "B11_20m", "B12_20m",
];
const S2_HLS_BANDS: &[&str] = &[
    "B02", "B03", "B04", "B05", "B06", "B07", "B08", "B8A", "B11", "B12",
];
const S2_GEE_BANDS: &[&str] = &[
    "B2", "B3", "B4", "B5", "B6", "B7", "B8", "B8A", "B11", "B12",
];
const LANDSAT_STAC_BANDS: &[&str] = &[
    "coastal", "blue", "green", "red", "nir08", "swir16", "swir22",
];
const LANDSAT_GEE_BANDS: &[&str] = &["SR_B1", "SR_B2", "SR_B3", "SR_B4", "SR_B5", "SR_B6", "SR_B7"];
const LANDSAT_HLS_BANDS: &[&str] = &["B01", "B02", "B03", "B04", "B05", "B06", "B07"];
const MODIS_BANDS: &[&str] = &[
    "sur_refl_b01",
    "sur_refl_b02",
    "sur_refl_b03",
    "sur_refl_b04",
    "sur_refl_b05",
    "sur_refl_b06",
    "sur_refl_b07",
];
// HDF subdataset names
const MODIS_HDF_BANDS: &[&str] = &[
    "sur_refl_b01_1",
    "sur_refl_b02_1",
    "sur_refl_b03_1",
    "sur_refl_b04_1",
    "sur_refl_b05_1",
    "sur_refl_b06_1",
    "sur_refl_b07_1",
];
const VIIRS_BANDS: &[&str] = &[
    "I1", "I2", "I3", "M1", "M2", "M3", "M4", "M5", "M7", "M8", "M10", "M11",
];
const OLCI_BANDS: &[&str] = &[
    "Oa01_radiance",
    "Oa02_radiance",
    "Oa03_radiance",
    "Oa04_radiance",
    "Oa05_radiance",
    "Oa06_radiance",
    "Oa07_radiance",
    "Oa08_radiance",
    "Oa09_radiance",
    "Oa10_radiance",
    "Oa11_radiance",
    "Oa12_radiance",
    "Oa13_radiance",
    "Oa14_radiance",
    "Oa15_radiance",
    "Oa16_radiance",
    "Oa17_radiance",
    "Oa18_radiance",
    "Oa19_radiance",
    "Oa20_radiance",
    "Oa21_radiance",
];

static BINDINGS: [SensorPlatformBinding; 15] = [
    // Sentinel-2
    SensorPlatformBinding::new(Sensor::Sentinel2, Platform::Aws, "sentinel-2-l2a", S2_AWS_BANDS, "scl")
        .with_tile_keys(&["grid:code", "mgrs:grid_square", "s2:mgrs_tile"])
        .with_baseline("s2:processing_baseline"),
    SensorPlatformBinding::new(Sensor::Sentinel2, Platform::Cdse, "sentinel-2-l2a", S2_CDSE_BANDS, "SCL_20m")
        .with_tile_keys(&["grid:code"])
        .with_baseline("processing:version"),
    SensorPlatformBinding::new(Sensor::Sentinel2, Platform::Planetary, "sentinel-2-l2a", S2_HLS_BANDS, "SCL")
        .with_tile_keys(&["grid:code", "s2:mgrs_tile"])
        .with_baseline("s2:processing_baseline"),
    SensorPlatformBinding::new(Sensor::Sentinel2, Platform::Gee, "COPERNICUS/S2_SR_HARMONIZED", S2_GEE_BANDS, "QA60")
        .with_tile_keys(&["MGRS_TILE"]),
    SensorPlatformBinding::new(Sensor::Sentinel2, Platform::Earthdata, "HLSS30_2.0", S2_HLS_BANDS, "Fmask"),
    // Landsat
    SensorPlatformBinding::new(Sensor::Landsat, Platform::Aws, "landsat-c2-l2", LANDSAT_STAC_BANDS, "qa_pixel"),
    SensorPlatformBinding::new(Sensor::Landsat, Platform::Planetary, "landsat-c2-l2", LANDSAT_STAC_BANDS, "qa_pixel"),
    SensorPlatformBinding::new(Sensor::Landsat, Platform::Gee, "LANDSAT/LC09/C02/T1_L2", LANDSAT_GEE_BANDS, "QA_PIXEL"),
    SensorPlatformBinding::new(Sensor::Landsat, Platform::Earthdata, "HLSL30_2.0", LANDSAT_HLS_BANDS, "Fmask"),
    // MODIS
    SensorPlatformBinding::new(Sensor::Modis, Platform::Planetary, "modis-09A1-061", MODIS_BANDS, "sur_refl_state_500m"),
    SensorPlatformBinding::new(Sensor::Modis, Platform::Gee, "MODIS/061/MOD09GA", MODIS_BANDS, "state_1km"),
    SensorPlatformBinding::new(Sensor::Modis, Platform::Earthdata, "MOD09GA_061", MODIS_HDF_BANDS, "state_1km_1"),
    // VIIRS
    SensorPlatformBinding::new(Sensor::Viirs, Platform::Gee, "NASA/VIIRS/002/VNP09GA", VIIRS_BANDS, "QF1"),
    SensorPlatformBinding::new(Sensor::Viirs, Platform::Earthdata, "VNP09GA_002", VIIRS_BANDS, "QF1"),
    // Sentinel-3 OLCI
    SensorPlatformBinding::new(Sensor::S3Olci, Platform::Gee, "COPERNICUS/S3/OLCI", OLCI_BANDS, "quality_flags"),
];

/// All built-in bindings, in table order.
pub fn all_bindings() -> &'static [SensorPlatformBinding] {
    &BINDINGS
}

/// Look up the built-in binding for a pair.
pub fn get_binding(
    sensor: Sensor,
    platform: Platform,
) -> Result<&'static SensorPlatformBinding, ConfigurationError> {
    BINDINGS
        .iter()
        .find(|b| b.sensor == sensor && b.platform == platform)
        .ok_or_else(|| ConfigurationError::NoBinding {
            sensor,
            platform,
            available: platforms_for(sensor),
        })
}

/// Platforms serving `sensor`, in table order.
pub fn platforms_for(sensor: Sensor) -> Vec<Platform> {
    BINDINGS
        .iter()
        .filter(|b| b.sensor == sensor)
        .map(|b| b.platform)
        .collect()
}

/// Sensors served by `platform`, in table order.
pub fn sensors_for(platform: Platform) -> Vec<Sensor> {
    BINDINGS
        .iter()
        .filter(|b| b.platform == platform)
        .map(|b| b.sensor)
        .collect()
}

/// The built-in table with collection ids optionally replaced.
#[derive(Debug, Clone, Default)]
pub struct BindingRegistry {
    overrides: BTreeMap<(Sensor, Platform), String>,
}

impl BindingRegistry {
    pub fn builtin() -> Self {
        Self::default()
    }

    pub fn from_config(config: &AcquisitionConfig) -> Self {
        let mut registry = Self::builtin();
        for (sensor, platforms) in &config.collection_overrides {
            for (platform, collection) in platforms {
                registry = registry.with_collection(*sensor, *platform, collection.clone());
            }
        }
        registry
    }

    /// Replace the collection id for a pair. Unknown pairs are ignored at lookup.
    pub fn with_collection(
        mut self,
        sensor: Sensor,
        platform: Platform,
        collection: impl Into<String>,
    ) -> Self {
        self.overrides.insert((sensor, platform), collection.into());
        self
    }

    pub fn get(
        &self,
        sensor: Sensor,
        platform: Platform,
    ) -> Result<SensorPlatformBinding, ConfigurationError> {
        let mut binding = get_binding(sensor, platform)?.clone();
        if let Some(collection) = self.overrides.get(&(sensor, platform)) {
            binding.collection = Cow::Owned(collection.clone());
        }
        Ok(binding)
    }

    pub fn platforms_for(&self, sensor: Sensor) -> Vec<Platform> {
        platforms_for(sensor)
    }

    pub fn sensors_for(&self, platform: Platform) -> Vec<Sensor> {
        sensors_for(platform)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_registered_pair_resolves() {
        for binding in all_bindings() {
            let found = get_binding(binding.sensor, binding.platform).unwrap();
            assert_eq!(found, binding);
            assert!(!found.collection.is_empty());
            assert!(!found.band_keys.is_empty());
        }
        assert_eq!(all_bindings().len(), 15);
    }

    #[test]
    fn test_unknown_pair_lists_available_platforms() {
        let err = get_binding(Sensor::Viirs, Platform::Aws).unwrap_err();
        assert_eq!(
            err,
            ConfigurationError::NoBinding {
                sensor: Sensor::Viirs,
                platform: Platform::Aws,
                available: vec![Platform::Gee, Platform::Earthdata],
            }
        );
    }

    #[test]
    fn test_platform_and_sensor_lookups() {
        assert_eq!(
            platforms_for(Sensor::Sentinel2),
            vec![
                Platform::Aws,
                Platform::Cdse,
                Platform::Planetary,
                Platform::Gee,
                Platform::Earthdata
            ]
        );
        assert_eq!(platforms_for(Sensor::S3Olci), vec![Platform::Gee]);
        assert_eq!(
            sensors_for(Platform::Aws),
            vec![Sensor::Sentinel2, Sensor::Landsat]
        );
        assert_eq!(sensors_for(Platform::Gee).len(), 5);
    }

    #[test]
    fn test_band_counts_match_sensor() {
        assert_eq!(get_binding(Sensor::Sentinel2, Platform::Cdse).unwrap().band_count(), 10);
        assert_eq!(get_binding(Sensor::Landsat, Platform::Gee).unwrap().band_count(), 7);
        assert_eq!(get_binding(Sensor::Viirs, Platform::Earthdata).unwrap().band_count(), 12);
        assert_eq!(get_binding(Sensor::S3Olci, Platform::Gee).unwrap().band_count(), 21);
    }

    #[test]
    fn test_required_assets_end_with_qa() {
        let binding = get_binding(Sensor::Landsat, Platform::Aws).unwrap();
        let assets: Vec<&str> = binding.required_assets().collect();
        assert_eq!(assets.len(), 8);
        assert_eq!(assets.last(), Some(&"qa_pixel"));
        assert_eq!(binding.resample, Resample::Bilinear);
        assert_eq!(binding.qa_resample, Resample::Nearest);
    }

    #[test]
    fn test_registry_collection_override() {
        let registry = BindingRegistry::builtin().with_collection(
            Sensor::Sentinel2,
            Platform::Earthdata,
            "HLSS30_2.1",
        );
        let binding = registry.get(Sensor::Sentinel2, Platform::Earthdata).unwrap();
        assert_eq!(binding.collection, "HLSS30_2.1");
        let untouched = registry.get(Sensor::Sentinel2, Platform::Aws).unwrap();
        assert_eq!(untouched.collection, "sentinel-2-l2a");
        assert!(registry.get(Sensor::S3Olci, Platform::Aws).is_err());
    }
}
