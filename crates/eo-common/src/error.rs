//! Error types for parsing shared domain values.

use thiserror::Error;

/// Result type alias using CommonError.
pub type CommonResult<T> = Result<T, CommonError>;

/// Errors raised while parsing sensors, platforms, boundaries and times.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum CommonError {
    #[error("Unknown sensor '{0}'. Available: sentinel2, landsat, modis, viirs, s3olci")]
    UnknownSensor(String),

    #[error("Unknown platform '{0}'. Available: aws, cdse, planetary, gee, earthdata")]
    UnknownPlatform(String),

    #[error("Invalid boundary: {0}")]
    InvalidBoundary(String),

    #[error("Invalid time range: {0}")]
    InvalidTime(String),

    #[error("Invalid geotransform: {0}")]
    InvalidGeoTransform(String),
}

impl From<serde_json::Error> for CommonError {
    fn from(err: serde_json::Error) -> Self {
        CommonError::InvalidBoundary(format!("JSON error: {}", err))
    }
}
