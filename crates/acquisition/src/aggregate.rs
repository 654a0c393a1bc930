//! Assembly of per-item outcomes into one time series.

use std::collections::BTreeMap;

use eo_common::{GeoTransform, Platform, Sensor};
use ndarray::{Array2, Array4, Axis, Zip};
use serde::Serialize;
use tracing::{info, warn};

use crate::error::{AcquisitionError, ItemFailure, ItemFetchError};
use crate::footprint::{footprint_maps, FootprintMap};
use crate::pipeline::ProcessedItem;
use crate::profile::SensorProfile;

/// An item excluded from a result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkippedItem {
    pub item_id: String,
    pub reason: String,
}

/// The time series of one sensor on one platform.
///
/// Every time-indexed field shares the same length and order: ascending
/// acquisition time.
#[derive(Debug, Clone, Serialize)]
pub struct AcquisitionResult {
    pub sensor: Sensor,
    pub platform: Platform,
    pub band_names: Vec<String>,
    /// `[t, bands, h, w]`, NaN where masked or no data.
    pub reflectance: Array4<f32>,
    /// Same shape as `reflectance`.
    pub uncertainty: Array4<f32>,
    /// `[3, t]`: SZA, VZA, RAA in degrees.
    pub angles: Array2<f64>,
    pub doys: Vec<u16>,
    pub item_ids: Vec<String>,
    /// `[h, w]`, true where at least one item and band is finite.
    pub valid_mask: Array2<bool>,
    pub geotransform: GeoTransform,
    pub crs: String,
    /// Footprint maps keyed by native resolution in meters.
    pub footprints: BTreeMap<u32, FootprintMap>,
    pub skipped: Vec<SkippedItem>,
    pub cache_hits: usize,
    pub downloaded: usize,
}

impl AcquisitionResult {
    /// Number of time steps.
    pub fn len(&self) -> usize {
        self.item_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.item_ids.is_empty()
    }

    /// Spatial shape `(h, w)` of the common grid.
    pub fn grid_shape(&self) -> (usize, usize) {
        self.valid_mask.dim()
    }
}

/// Outcome of one item, in sorted position `index`.
#[derive(Debug)]
pub(crate) struct ItemOutcome {
    pub index: usize,
    pub item_id: String,
    pub result: Result<ProcessedItem, ItemFetchError>,
}

/// Build the result from outcomes. Outcomes may arrive in any order; the
/// result follows `index`.
pub(crate) fn assemble(
    profile: &'static SensorProfile,
    platform: Platform,
    mut outcomes: Vec<ItemOutcome>,
    min_valid_fraction: f64,
) -> Result<AcquisitionResult, AcquisitionError> {
    outcomes.sort_by_key(|o| o.index);

    let mut failures: Vec<ItemFailure> = Vec::new();
    let mut kept: Vec<(String, ProcessedItem)> = Vec::new();
    let mut expected_shape: Option<(usize, usize)> = None;

    for outcome in outcomes {
        let processed = match outcome.result {
            Ok(processed) => processed,
            Err(error) => {
                failures.push(ItemFailure {
                    index: outcome.index,
                    item_id: outcome.item_id,
                    error,
                });
                continue;
            }
        };

        let band_count = processed.reflectance.dim().0;
        if band_count != profile.band_count() {
            warn!(
                item = %outcome.item_id,
                expected = profile.band_count(),
                actual = band_count,
                "Band count mismatch, skipping item"
            );
            failures.push(ItemFailure {
                index: outcome.index,
                item_id: outcome.item_id,
                error: ItemFetchError::BandShape(format!(
                    "{} bands, expected {}",
                    band_count,
                    profile.band_count()
                )),
            });
            continue;
        }

        let shape = processed.grid_shape();
        match expected_shape {
            None => expected_shape = Some(shape),
            Some(expected) if expected != shape => {
                warn!(
                    item = %outcome.item_id,
                    expected = ?expected,
                    actual = ?shape,
                    "Grid shape mismatch, skipping item"
                );
                failures.push(ItemFailure {
                    index: outcome.index,
                    item_id: outcome.item_id,
                    error: ItemFetchError::ShapeMismatch {
                        expected,
                        actual: shape,
                    },
                });
                continue;
            }
            Some(_) => {}
        }
        kept.push((outcome.item_id, processed));
    }

    let (height, width) = match (expected_shape, kept.is_empty()) {
        (Some(shape), false) => shape,
        _ => {
            return Err(AcquisitionError::AllItemsFailed {
                sensor: profile.sensor,
                platform,
                failures,
            })
        }
    };

    let t = kept.len();
    let bands = profile.band_count();
    let mut reflectance = Array4::<f32>::from_elem((t, bands, height, width), f32::NAN);
    let mut angles = Array2::<f64>::zeros((3, t));
    let mut valid_mask = Array2::from_elem((height, width), false);
    let mut doys = Vec::with_capacity(t);
    let mut item_ids = Vec::with_capacity(t);
    let mut cache_hits = 0;

    for (i, (item_id, processed)) in kept.iter().enumerate() {
        let cube = &processed.reflectance;
        reflectance.index_axis_mut(Axis(0), i).assign(cube);

        for band in cube.axis_iter(Axis(0)) {
            Zip::from(&mut valid_mask).and(&band).for_each(|valid, &v| {
                if v.is_finite() {
                    *valid = true;
                }
            });
        }

        for (row, value) in processed.angles.as_array().into_iter().enumerate() {
            angles[[row, i]] = value;
        }
        doys.push(processed.doy);
        item_ids.push(item_id.clone());
        if processed.from_cache {
            cache_hits += 1;
        }
    }

    let geotransform = kept[0].1.geotransform;
    let crs = kept[0].1.crs.clone();
    let uncertainty = profile.uncertainty(&reflectance);
    let footprints = footprint_maps(
        profile,
        &geotransform,
        (height, width),
        Some(&valid_mask),
        min_valid_fraction,
    )?;

    let skipped: Vec<SkippedItem> = failures
        .into_iter()
        .map(|f| SkippedItem {
            item_id: f.item_id,
            reason: f.error.to_string(),
        })
        .collect();
    if !skipped.is_empty() {
        info!(
            skipped = skipped.len(),
            kept = t,
            "Partial success, some items were skipped"
        );
    }

    Ok(AcquisitionResult {
        sensor: profile.sensor,
        platform,
        band_names: profile.band_names.iter().map(|b| b.to_string()).collect(),
        reflectance,
        uncertainty,
        angles,
        doys,
        item_ids,
        valid_mask,
        geotransform,
        crs,
        footprints,
        skipped,
        cache_hits,
        downloaded: t - cache_hits,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::angles::ViewGeometry;
    use crate::profile::sensor_profile;
    use ndarray::Array3;

    fn processed(value: f32, shape: (usize, usize), doy: u16) -> ProcessedItem {
        ProcessedItem {
            reflectance: Array3::from_elem((7, shape.0, shape.1), value),
            geotransform: GeoTransform::north_up(0.0, 0.0, 10.0),
            crs: "EPSG:32633".to_string(),
            angles: ViewGeometry {
                sza: doy as f64,
                vza: 1.0,
                raa: 2.0,
            },
            doy,
            from_cache: doy % 2 == 0,
        }
    }

    fn ok(index: usize, value: f32, shape: (usize, usize), doy: u16) -> ItemOutcome {
        ItemOutcome {
            index,
            item_id: format!("item-{}", index),
            result: Ok(processed(value, shape, doy)),
        }
    }

    #[test]
    fn test_restores_sorted_order() {
        let landsat = sensor_profile(Sensor::Landsat);
        let outcomes = vec![
            ok(2, 0.3, (6, 6), 30),
            ok(0, 0.1, (6, 6), 10),
            ok(1, 0.2, (6, 6), 20),
        ];
        let result = assemble(landsat, Platform::Aws, outcomes, 0.5).unwrap();
        assert_eq!(result.item_ids, vec!["item-0", "item-1", "item-2"]);
        assert_eq!(result.doys, vec![10, 20, 30]);
        assert_eq!(result.angles.dim(), (3, 3));
        assert_eq!(result.angles[[0, 2]], 30.0);
        assert_eq!(result.reflectance.dim(), (3, 7, 6, 6));
        assert_eq!(result.reflectance[[1, 0, 0, 0]], 0.2);
        assert_eq!(result.cache_hits, 2);
        assert_eq!(result.downloaded, 1);
        assert!(result.footprints.contains_key(&30));
    }

    #[test]
    fn test_shape_mismatch_is_skipped() {
        let landsat = sensor_profile(Sensor::Landsat);
        let outcomes = vec![ok(0, 0.1, (6, 6), 10), ok(1, 0.2, (5, 6), 20)];
        let result = assemble(landsat, Platform::Aws, outcomes, 0.5).unwrap();
        assert_eq!(result.len(), 1);
        assert_eq!(result.skipped.len(), 1);
        assert_eq!(result.skipped[0].item_id, "item-1");
    }

    #[test]
    fn test_band_count_mismatch_is_skipped() {
        let landsat = sensor_profile(Sensor::Landsat);
        let short = |index: usize| {
            let mut item = processed(0.4, (6, 6), 15);
            item.reflectance = Array3::from_elem((3, 6, 6), 0.4);
            ItemOutcome {
                index,
                item_id: format!("item-{}", index),
                result: Ok(item),
            }
        };

        // short entry first, then last
        for outcomes in [
            vec![short(0), ok(1, 0.2, (6, 6), 20)],
            vec![ok(0, 0.1, (6, 6), 10), short(1)],
        ] {
            let result = assemble(landsat, Platform::Aws, outcomes, 0.5).unwrap();
            assert_eq!(result.len(), 1);
            assert_eq!(result.reflectance.dim(), (1, 7, 6, 6));
            assert_eq!(result.band_names.len(), 7);
            assert_eq!(result.skipped.len(), 1);
            assert!(result.skipped[0].reason.contains("3 bands"));
        }
    }

    #[test]
    fn test_all_failed() {
        let landsat = sensor_profile(Sensor::Landsat);
        let outcomes = vec![ItemOutcome {
            index: 0,
            item_id: "x".to_string(),
            result: Err(ItemFetchError::MissingAsset("red".to_string())),
        }];
        match assemble(landsat, Platform::Planetary, outcomes, 0.5) {
            Err(AcquisitionError::AllItemsFailed { failures, .. }) => {
                assert_eq!(failures.len(), 1);
                assert_eq!(failures[0].item_id, "x");
            }
            other => panic!("unexpected: {:?}", other.map(|r| r.len())),
        }
    }

    #[test]
    fn test_valid_mask_requires_any_finite() {
        let landsat = sensor_profile(Sensor::Landsat);
        let mut first = processed(f32::NAN, (3, 3), 10);
        first.reflectance[[4, 1, 1]] = 0.2;
        let outcomes = vec![
            ItemOutcome {
                index: 0,
                item_id: "a".to_string(),
                result: Ok(first),
            },
            ok(1, f32::NAN, (3, 3), 11),
        ];
        let result = assemble(landsat, Platform::Aws, outcomes, 0.5).unwrap();
        assert!(result.valid_mask[[1, 1]]);
        assert_eq!(result.valid_mask.iter().filter(|&&v| v).count(), 1);
    }
}
