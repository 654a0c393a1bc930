//! Sun/view geometry from catalog item properties.

use serde::Serialize;

use crate::catalog::Properties;

/// Solar zenith, view zenith and relative azimuth in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct ViewGeometry {
    pub sza: f64,
    pub vza: f64,
    pub raa: f64,
}

impl ViewGeometry {
    pub fn as_array(&self) -> [f64; 3] {
        [self.sza, self.vza, self.raa]
    }
}

fn number(properties: &Properties, keys: &[&str]) -> f64 {
    keys.iter()
        .find_map(|k| properties.get(*k).and_then(|v| v.as_f64()))
        .unwrap_or(0.0)
}

/// Extract view geometry; missing values default to 0.
///
/// Solar elevation comes from `view:sun_elevation`. When only Sentinel-2's
/// `s2:mean_solar_zenith` is present it is already a zenith and is used as is.
/// Elevations below 90° are converted to zenith.
pub fn extract_angles(properties: &Properties) -> ViewGeometry {
    let sza = match properties.get("view:sun_elevation").and_then(|v| v.as_f64()) {
        Some(elevation) if elevation < 90.0 => 90.0 - elevation,
        Some(elevation) => elevation,
        None => number(properties, &["s2:mean_solar_zenith"]),
    };
    let sun_azimuth = number(properties, &["view:sun_azimuth", "s2:mean_solar_azimuth"]);
    let vza = number(properties, &["view:incidence_angle"]);
    let view_azimuth = number(properties, &["view:azimuth"]);

    ViewGeometry {
        sza,
        vza,
        raa: (view_azimuth - sun_azimuth).rem_euclid(360.0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn props(value: serde_json::Value) -> Properties {
        value.as_object().cloned().unwrap_or_default()
    }

    #[test]
    fn test_elevation_converted_to_zenith() {
        let p = props(json!({
            "view:sun_elevation": 35.0,
            "view:sun_azimuth": 150.0,
            "view:incidence_angle": 4.5,
            "view:azimuth": 100.0
        }));
        let g = extract_angles(&p);
        assert_eq!(g.sza, 55.0);
        assert_eq!(g.vza, 4.5);
        // negative difference wraps
        assert_eq!(g.raa, 310.0);
    }

    #[test]
    fn test_s2_zenith_fallback_used_directly() {
        let p = props(json!({
            "s2:mean_solar_zenith": 38.2,
            "s2:mean_solar_azimuth": 160.0
        }));
        let g = extract_angles(&p);
        assert_eq!(g.sza, 38.2);
        assert_eq!(g.raa, 200.0);
    }

    #[test]
    fn test_missing_angles_default_to_zero() {
        let g = extract_angles(&Properties::new());
        assert_eq!(g, ViewGeometry::default());
    }
}
