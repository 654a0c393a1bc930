//! Raster crop/resample collaborator.
//!
//! Reprojection and resampling arithmetic live behind [`RasterReader`];
//! the pipeline only sees integer tiles on the common grid.

use async_trait::async_trait;
use eo_common::{Boundary, GeoTransform};
use ndarray::Array2;

use crate::binding::Resample;
use crate::error::RasterError;

/// One band read.
#[derive(Debug, Clone, Copy)]
pub struct ReadRequest<'a> {
    pub href: &'a str,
    pub boundary: &'a Boundary,
    /// Output pixel size in meters.
    pub target_resolution: f64,
    pub resample: Resample,
}

/// A cropped, resampled band.
#[derive(Debug, Clone, PartialEq)]
pub struct RasterTile {
    pub data: Array2<i32>,
    pub geotransform: GeoTransform,
    pub crs: String,
}

impl RasterTile {
    pub fn shape(&self) -> (usize, usize) {
        self.data.dim()
    }
}

/// Crops a remote raster to a boundary on the target grid.
#[async_trait]
pub trait RasterReader: Send + Sync {
    async fn crop_and_resample(&self, request: ReadRequest<'_>) -> Result<RasterTile, RasterError>;
}
