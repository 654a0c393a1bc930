//! DN to surface reflectance conversions.
//!
//! Every conversion clips negative reflectance to zero and leaves NaN
//! untouched; fill values are turned into NaN explicitly.

use ndarray::{Array3, ArrayView3};

/// Sentinel-2 L2A quantification value.
pub const S2_QUANTIFICATION: f32 = 10_000.0;

/// BOA offset applied from processing baseline 04.00 onwards.
pub const S2_BOA_OFFSET: f32 = -1_000.0;

/// Baseline assumed when an item does not carry one.
pub const DEFAULT_S2_BASELINE: &str = "05.00";

#[inline]
fn clip_non_negative(v: f32) -> f32 {
    if v < 0.0 {
        0.0
    } else {
        v
    }
}

/// Major version of a processing baseline such as `"04.00"`.
/// Unparseable values count as a recent baseline.
pub fn baseline_major(baseline: &str) -> u32 {
    baseline
        .trim()
        .split('.')
        .next()
        .and_then(|major| major.parse().ok())
        .unwrap_or(5)
}

pub fn sentinel2(dn: ArrayView3<i32>, baseline: Option<&str>) -> Array3<f32> {
    let offset = if baseline_major(baseline.unwrap_or(DEFAULT_S2_BASELINE)) >= 4 {
        S2_BOA_OFFSET
    } else {
        0.0
    };
    dn.mapv(|v| clip_non_negative((v as f32 + offset) / S2_QUANTIFICATION))
}

/// Landsat Collection 2 Level 2: scale 2.75e-5, offset -0.2, 0 is fill.
pub fn landsat(dn: ArrayView3<i32>) -> Array3<f32> {
    dn.mapv(|v| {
        if v == 0 {
            f32::NAN
        } else {
            clip_non_negative(v as f32 * 0.000_027_5 - 0.2)
        }
    })
}

/// MODIS and VIIRS surface reflectance: scale 1e-4, valid range [-100, 16000].
pub fn modis_viirs(dn: ArrayView3<i32>) -> Array3<f32> {
    dn.mapv(|v| {
        if !(-100..=16_000).contains(&v) {
            f32::NAN
        } else {
            clip_non_negative(v as f32 * 0.000_1)
        }
    })
}

/// OLCI radiance, approximate scaling to reflectance.
pub fn olci(dn: ArrayView3<i32>) -> Array3<f32> {
    dn.mapv(|v| clip_non_negative(v as f32 * 0.01))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array3;

    fn cube(values: &[i32]) -> Array3<i32> {
        Array3::from_shape_vec((1, 1, values.len()), values.to_vec()).unwrap()
    }

    #[test]
    fn test_baseline_major() {
        assert_eq!(baseline_major("04.00"), 4);
        assert_eq!(baseline_major("02.14"), 2);
        assert_eq!(baseline_major("garbage"), 5);
    }

    #[test]
    fn test_sentinel2_offset_by_baseline() {
        let dn = cube(&[3000, 500]);
        let new = sentinel2(dn.view(), Some("05.09"));
        assert!((new[[0, 0, 0]] - 0.2).abs() < 1e-6);
        // below the offset clips to zero
        assert_eq!(new[[0, 0, 1]], 0.0);

        let old = sentinel2(dn.view(), Some("03.01"));
        assert!((old[[0, 0, 0]] - 0.3).abs() < 1e-6);
        assert!((old[[0, 0, 1]] - 0.05).abs() < 1e-6);

        let default = sentinel2(dn.view(), None);
        assert_eq!(default, new);
    }

    #[test]
    fn test_landsat_fill_is_nan() {
        let refl = landsat(cube(&[0, 20000, 1000]).view());
        assert!(refl[[0, 0, 0]].is_nan());
        assert!((refl[[0, 0, 1]] - 0.35).abs() < 1e-5);
        assert_eq!(refl[[0, 0, 2]], 0.0);
    }

    #[test]
    fn test_modis_valid_range() {
        let refl = modis_viirs(cube(&[-28672, -100, 5000, 16000, 32767]).view());
        assert!(refl[[0, 0, 0]].is_nan());
        assert_eq!(refl[[0, 0, 1]], 0.0);
        assert!((refl[[0, 0, 2]] - 0.5).abs() < 1e-6);
        assert!((refl[[0, 0, 3]] - 1.6).abs() < 1e-5);
        assert!(refl[[0, 0, 4]].is_nan());
    }

    #[test]
    fn test_olci_scaling() {
        let refl = olci(cube(&[25, -3]).view());
        assert!((refl[[0, 0, 0]] - 0.25).abs() < 1e-6);
        assert_eq!(refl[[0, 0, 1]], 0.0);
    }
}
