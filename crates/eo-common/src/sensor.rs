//! Sensor families and hosting platforms.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::CommonError;

/// Satellite sensor families supported by the acquisition pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sensor {
    Sentinel2,
    Landsat,
    Modis,
    Viirs,
    S3Olci,
}

impl Sensor {
    pub const ALL: [Sensor; 5] = [
        Sensor::Sentinel2,
        Sensor::Landsat,
        Sensor::Modis,
        Sensor::Viirs,
        Sensor::S3Olci,
    ];

    /// Canonical lowercase name, also used as the cache key prefix.
    pub fn as_str(&self) -> &'static str {
        match self {
            Sensor::Sentinel2 => "sentinel2",
            Sensor::Landsat => "landsat",
            Sensor::Modis => "modis",
            Sensor::Viirs => "viirs",
            Sensor::S3Olci => "s3olci",
        }
    }
}

impl fmt::Display for Sensor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Sensor {
    type Err = CommonError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "sentinel2" | "sentinel-2" | "s2" => Ok(Sensor::Sentinel2),
            "landsat" => Ok(Sensor::Landsat),
            "modis" => Ok(Sensor::Modis),
            "viirs" => Ok(Sensor::Viirs),
            "s3olci" | "olci" => Ok(Sensor::S3Olci),
            _ => Err(CommonError::UnknownSensor(s.to_string())),
        }
    }
}

/// Data hosts that serve one or more sensors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    /// AWS Earth Search (Element 84)
    Aws,
    /// Copernicus Data Space Ecosystem
    Cdse,
    /// Microsoft Planetary Computer
    Planetary,
    /// Google Earth Engine
    Gee,
    /// NASA Earthdata (CMR-STAC / LP DAAC)
    Earthdata,
}

impl Platform {
    pub const ALL: [Platform; 5] = [
        Platform::Aws,
        Platform::Cdse,
        Platform::Planetary,
        Platform::Gee,
        Platform::Earthdata,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Aws => "aws",
            Platform::Cdse => "cdse",
            Platform::Planetary => "planetary",
            Platform::Gee => "gee",
            Platform::Earthdata => "earthdata",
        }
    }

    /// Whether the platform needs user credentials before it can serve data.
    pub fn requires_credentials(&self) -> bool {
        matches!(self, Platform::Cdse | Platform::Gee | Platform::Earthdata)
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = CommonError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "aws" => Ok(Platform::Aws),
            "cdse" => Ok(Platform::Cdse),
            "planetary" => Ok(Platform::Planetary),
            "gee" => Ok(Platform::Gee),
            "earthdata" => Ok(Platform::Earthdata),
            _ => Err(CommonError::UnknownPlatform(s.to_string())),
        }
    }
}
