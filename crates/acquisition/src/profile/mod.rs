//! Per-sensor radiometric and masking behavior.
//!
//! Profiles are static and selected by [`sensor_profile`]; sensor-specific
//! behavior dispatches on the `Sensor` tag.

pub mod masks;
pub mod reflectance;

use eo_common::Sensor;
use ndarray::{Array2, Array3, Array4, ArrayView3, Axis, Zip};

/// Bands sharing one native ground sample distance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolutionGroup {
    /// Native resolution in meters.
    pub native_resolution: u32,
    /// Indices into the sensor's band order.
    pub band_indices: &'static [usize],
}

/// Intrinsic properties of one sensor.
#[derive(Debug, PartialEq)]
pub struct SensorProfile {
    pub sensor: Sensor,
    pub band_names: &'static [&'static str],
    pub resolution_groups: &'static [ResolutionGroup],
    /// Common output grid resolution in meters.
    pub target_resolution: u32,
    /// Whether catalog items expose `eo:cloud_cover`.
    pub has_cloud_cover: bool,
}

/// Uncertainty as a fraction of absolute reflectance.
pub const UNCERTAINTY_FRACTION: f32 = 0.1;

static SENTINEL2: SensorProfile = SensorProfile {
    sensor: Sensor::Sentinel2,
    band_names: &["B02", "B03", "B04", "B05", "B06", "B07", "B08", "B8A", "B11", "B12"],
    resolution_groups: &[
        ResolutionGroup {
            native_resolution: 10,
            band_indices: &[0, 1, 2, 6],
        },
        ResolutionGroup {
            native_resolution: 20,
            band_indices: &[3, 4, 5, 7, 8, 9],
        },
    ],
    target_resolution: 10,
    has_cloud_cover: true,
};

static LANDSAT: SensorProfile = SensorProfile {
    sensor: Sensor::Landsat,
    band_names: &["B1", "B2", "B3", "B4", "B5", "B6", "B7"],
    resolution_groups: &[ResolutionGroup {
        native_resolution: 30,
        band_indices: &[0, 1, 2, 3, 4, 5, 6],
    }],
    target_resolution: 10,
    has_cloud_cover: true,
};

static MODIS: SensorProfile = SensorProfile {
    sensor: Sensor::Modis,
    band_names: &["B01", "B02", "B03", "B04", "B05", "B06", "B07"],
    resolution_groups: &[
        ResolutionGroup {
            native_resolution: 250,
            band_indices: &[0, 1],
        },
        ResolutionGroup {
            native_resolution: 500,
            band_indices: &[2, 3, 4, 5, 6],
        },
    ],
    target_resolution: 10,
    has_cloud_cover: false,
};

static VIIRS: SensorProfile = SensorProfile {
    sensor: Sensor::Viirs,
    band_names: &["I1", "I2", "I3", "M1", "M2", "M3", "M4", "M5", "M7", "M8", "M10", "M11"],
    resolution_groups: &[
        ResolutionGroup {
            native_resolution: 500,
            band_indices: &[0, 1, 2],
        },
        ResolutionGroup {
            native_resolution: 1000,
            band_indices: &[3, 4, 5, 6, 7, 8, 9, 10, 11],
        },
    ],
    target_resolution: 10,
    has_cloud_cover: false,
};

static S3_OLCI: SensorProfile = SensorProfile {
    sensor: Sensor::S3Olci,
    band_names: &[
        "Oa01", "Oa02", "Oa03", "Oa04", "Oa05", "Oa06", "Oa07", "Oa08", "Oa09", "Oa10", "Oa11",
        "Oa12", "Oa13", "Oa14", "Oa15", "Oa16", "Oa17", "Oa18", "Oa19", "Oa20", "Oa21",
    ],
    resolution_groups: &[ResolutionGroup {
        native_resolution: 300,
        band_indices: &[
            0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15, 16, 17, 18, 19, 20,
        ],
    }],
    target_resolution: 10,
    has_cloud_cover: false,
};

/// The static profile for `sensor`.
pub fn sensor_profile(sensor: Sensor) -> &'static SensorProfile {
    match sensor {
        Sensor::Sentinel2 => &SENTINEL2,
        Sensor::Landsat => &LANDSAT,
        Sensor::Modis => &MODIS,
        Sensor::Viirs => &VIIRS,
        Sensor::S3Olci => &S3_OLCI,
    }
}

impl SensorProfile {
    pub fn band_count(&self) -> usize {
        self.band_names.len()
    }

    /// Distinct native resolutions, in declaration order.
    pub fn native_resolutions(&self) -> impl Iterator<Item = u32> + '_ {
        self.resolution_groups.iter().map(|g| g.native_resolution)
    }

    /// Convert a `[bands, h, w]` DN stack to reflectance.
    ///
    /// `baseline` is only consulted for Sentinel-2.
    pub fn dn_to_reflectance(&self, dn: ArrayView3<i32>, baseline: Option<&str>) -> Array3<f32> {
        match self.sensor {
            Sensor::Sentinel2 => reflectance::sentinel2(dn, baseline),
            Sensor::Landsat => reflectance::landsat(dn),
            Sensor::Modis | Sensor::Viirs => reflectance::modis_viirs(dn),
            Sensor::S3Olci => reflectance::olci(dn),
        }
    }

    /// Decode the sensor's QA band. `None` when the sensor declares no
    /// cloud-mask function.
    pub fn cloud_mask(&self, qa: &Array2<i32>) -> Option<Array2<bool>> {
        match self.sensor {
            Sensor::Sentinel2 => None,
            Sensor::Landsat => Some(masks::landsat_qa_pixel(qa)),
            Sensor::Modis => Some(masks::modis_state(qa)),
            Sensor::Viirs => Some(masks::viirs_qf1(qa)),
            Sensor::S3Olci => Some(masks::olci_quality_flags(qa)),
        }
    }

    /// Cloud mask with the sensor-specific fallback applied when the sensor
    /// declares none.
    pub fn effective_mask(&self, qa: &Array2<i32>) -> Array2<bool> {
        self.cloud_mask(qa).unwrap_or_else(|| masks::s2_scl(qa))
    }

    /// Convert and mask one item. Masked pixels become NaN in every band.
    pub fn process_item(
        &self,
        dn: ArrayView3<i32>,
        qa: &Array2<i32>,
        baseline: Option<&str>,
    ) -> Array3<f32> {
        let mut refl = self.dn_to_reflectance(dn, baseline);
        let mask = self.effective_mask(qa);
        if mask.dim() == (refl.shape()[1], refl.shape()[2]) {
            for mut band in refl.axis_iter_mut(Axis(0)) {
                Zip::from(&mut band).and(&mask).for_each(|v, &masked| {
                    if masked {
                        *v = f32::NAN;
                    }
                });
            }
        }
        refl
    }

    /// Per-pixel uncertainty for a `[t, b, h, w]` reflectance cube.
    pub fn uncertainty(&self, reflectance: &Array4<f32>) -> Array4<f32> {
        reflectance.mapv(|v| v.abs() * UNCERTAINTY_FRACTION)
    }
}
