//! Affine geotransforms in the six-number GDAL convention.

use serde::{Deserialize, Serialize};

use crate::{CommonError, CommonResult};

/// `[x_origin, x_scale, x_skew, y_origin, y_skew, y_scale]`.
///
/// Serialized as a plain array of six numbers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GeoTransform(pub [f64; 6]);

impl GeoTransform {
    /// North-up transform with square pixels.
    pub fn north_up(x_origin: f64, y_origin: f64, pixel_size: f64) -> Self {
        Self([x_origin, pixel_size, 0.0, y_origin, 0.0, -pixel_size])
    }

    pub fn from_slice(values: &[f64]) -> CommonResult<Self> {
        let arr: [f64; 6] = values.try_into().map_err(|_| {
            CommonError::InvalidGeoTransform(format!("expected 6 numbers, got {}", values.len()))
        })?;
        Ok(Self(arr))
    }

    pub fn x_origin(&self) -> f64 {
        self.0[0]
    }

    pub fn x_scale(&self) -> f64 {
        self.0[1]
    }

    pub fn y_origin(&self) -> f64 {
        self.0[3]
    }

    pub fn y_scale(&self) -> f64 {
        self.0[5]
    }

    /// Ground size of one pixel (square pixels assumed).
    pub fn pixel_size(&self) -> f64 {
        self.x_scale().abs()
    }

    pub fn as_array(&self) -> [f64; 6] {
        self.0
    }
}
