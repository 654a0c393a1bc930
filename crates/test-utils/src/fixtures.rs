//! Common test fixtures: boundaries, time ranges and catalog items.

use acquisition::{AcquisitionItem, SensorPlatformBinding};
use chrono::{DateTime, Duration, TimeZone, Utc};
use eo_common::{Boundary, BoundingBox, TimeRange};

/// Common field boundaries (lon/lat degrees).
pub mod fields {
    /// A small field in Brandenburg, Germany.
    pub const BRANDENBURG: (f64, f64, f64, f64) = (13.40, 52.50, 13.41, 52.51);

    /// A field in the US Midwest.
    pub const IOWA: (f64, f64, f64, f64) = (-93.60, 42.00, -93.58, 42.02);

    /// A GeoJSON FeatureCollection around [`BRANDENBURG`].
    pub const BRANDENBURG_GEOJSON: &str = r#"{
        "type": "FeatureCollection",
        "features": [{
            "type": "Feature",
            "properties": {"name": "test field"},
            "geometry": {
                "type": "Polygon",
                "coordinates": [[[13.40, 52.50], [13.41, 52.50], [13.41, 52.51], [13.40, 52.51], [13.40, 52.50]]]
            }
        }]
    }"#;
}

/// Rectangular boundary from a `(min_x, min_y, max_x, max_y)` tuple.
pub fn boundary(extent: (f64, f64, f64, f64)) -> Boundary {
    Boundary::from_bbox(BoundingBox::new(extent.0, extent.1, extent.2, extent.3))
}

/// The default test field.
pub fn test_boundary() -> Boundary {
    boundary(fields::BRANDENBURG)
}

/// Summer 2022 growing season.
pub fn summer_2022() -> TimeRange {
    TimeRange::new(
        Utc.with_ymd_and_hms(2022, 6, 1, 0, 0, 0).unwrap(),
        Utc.with_ymd_and_hms(2022, 8, 31, 23, 59, 59).unwrap(),
    )
    .unwrap()
}

/// Acquisition time of the `n`-th synthetic item: one every five days from
/// 2022-06-01T10:30Z.
pub fn acquisition_time(n: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2022, 6, 1, 10, 30, 0).unwrap() + Duration::days(5 * n as i64)
}

/// Band asset href understood by [`crate::MockRaster`].
pub fn band_href(item_id: &str, key: &str) -> String {
    format!("mock://{}/{}", item_id, key)
}

/// QA asset href understood by [`crate::MockRaster`].
pub fn qa_href(item_id: &str, key: &str) -> String {
    format!("mock://{}/qa/{}", item_id, key)
}

/// An item carrying every asset `binding` needs, pointing at the mock raster.
pub fn make_item(binding: &SensorPlatformBinding, id: &str, at: Option<DateTime<Utc>>) -> AcquisitionItem {
    let mut item = AcquisitionItem::new(id)
        .with_property("view:sun_elevation", 55.0)
        .with_property("view:sun_azimuth", 160.0)
        .with_property("view:incidence_angle", 3.0)
        .with_property("view:azimuth", 100.0);
    if let Some(at) = at {
        item = item.with_datetime(at);
    }
    for key in binding.band_keys {
        item = item.with_asset(*key, band_href(id, key));
    }
    item.with_asset(binding.qa_key, qa_href(id, binding.qa_key))
}

/// `count` complete items, one every five days, in ascending time order.
pub fn make_items(binding: &SensorPlatformBinding, prefix: &str, count: u32) -> Vec<AcquisitionItem> {
    (0..count)
        .map(|n| make_item(binding, &format!("{}-{:02}", prefix, n), Some(acquisition_time(n))))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use acquisition::get_binding;
    use eo_common::{Platform, Sensor};

    #[test]
    fn test_make_item_has_all_assets() {
        let binding = get_binding(Sensor::Landsat, Platform::Aws).unwrap();
        let item = make_item(binding, "LC09-test", Some(acquisition_time(0)));
        assert!(item.has_assets(binding.required_assets()));
        assert_eq!(item.assets["red"].href, "mock://LC09-test/red");
        assert_eq!(item.assets["qa_pixel"].href, "mock://LC09-test/qa/qa_pixel");
    }

    #[test]
    fn test_geojson_fixture_parses() {
        let parsed = Boundary::from_geojson_str(fields::BRANDENBURG_GEOJSON).unwrap();
        assert_eq!(parsed.bbox(), test_boundary().bbox());
    }

    #[test]
    fn test_acquisition_times_ascend() {
        assert!(acquisition_time(0) < acquisition_time(1));
        assert!(summer_2022().contains(&acquisition_time(10)));
    }
}
