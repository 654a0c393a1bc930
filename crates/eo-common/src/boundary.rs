//! Field boundaries and bounding boxes.
//!
//! A [`Boundary`] is the field polygon used to search catalogs and crop
//! remote rasters. Coordinates are geographic (EPSG:4326, lon/lat degrees).

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::path::Path;

use crate::{CommonError, CommonResult};

/// A geographic or projected bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl BoundingBox {
    /// Create a new bounding box from corner coordinates.
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    /// Closed polygon ring tracing the bbox counter-clockwise.
    fn ring(&self) -> Vec<[f64; 2]> {
        vec![
            [self.min_x, self.min_y],
            [self.max_x, self.min_y],
            [self.max_x, self.max_y],
            [self.min_x, self.max_y],
            [self.min_x, self.min_y],
        ]
    }
}

/// A field boundary polygon.
///
/// Holds the GeoJSON geometry verbatim so it can be forwarded to catalogs
/// (`intersects`) and raster collaborators (cutline) without loss.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Boundary {
    geometry: Value,
    bbox: BoundingBox,
}

impl Boundary {
    /// Build a rectangular boundary from a bounding box.
    pub fn from_bbox(bbox: BoundingBox) -> Self {
        let geometry = json!({
            "type": "Polygon",
            "coordinates": [bbox.ring()],
        });
        Self { geometry, bbox }
    }

    /// Parse a boundary from GeoJSON text.
    ///
    /// Accepts a FeatureCollection (the first feature is used), a Feature,
    /// or a bare Polygon / MultiPolygon geometry.
    pub fn from_geojson_str(s: &str) -> CommonResult<Self> {
        let value: Value = serde_json::from_str(s)?;
        Self::from_geojson_value(&value)
    }

    /// Load a boundary from a GeoJSON file on disk.
    pub fn from_geojson_file(path: impl AsRef<Path>) -> CommonResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            CommonError::InvalidBoundary(format!("failed to read {}: {}", path.display(), e))
        })?;
        Self::from_geojson_str(&text)
    }

    /// Parse a boundary from an already-decoded GeoJSON value.
    pub fn from_geojson_value(value: &Value) -> CommonResult<Self> {
        let geometry = match value.get("type").and_then(Value::as_str) {
            Some("FeatureCollection") => value
                .get("features")
                .and_then(Value::as_array)
                .and_then(|features| features.first())
                .and_then(|feature| feature.get("geometry"))
                .ok_or_else(|| {
                    CommonError::InvalidBoundary("FeatureCollection has no features".to_string())
                })?,
            Some("Feature") => value.get("geometry").ok_or_else(|| {
                CommonError::InvalidBoundary("Feature has no geometry".to_string())
            })?,
            Some("Polygon") | Some("MultiPolygon") => value,
            Some(other) => {
                return Err(CommonError::InvalidBoundary(format!(
                    "unsupported GeoJSON type '{}'",
                    other
                )))
            }
            None => {
                return Err(CommonError::InvalidBoundary(
                    "missing GeoJSON 'type'".to_string(),
                ))
            }
        };

        match geometry.get("type").and_then(Value::as_str) {
            Some("Polygon") | Some("MultiPolygon") => {}
            other => {
                return Err(CommonError::InvalidBoundary(format!(
                    "boundary geometry must be a Polygon or MultiPolygon, got {:?}",
                    other
                )))
            }
        }

        let coordinates = geometry.get("coordinates").ok_or_else(|| {
            CommonError::InvalidBoundary("geometry has no coordinates".to_string())
        })?;

        let mut bbox: Option<BoundingBox> = None;
        collect_extent(coordinates, &mut bbox);
        let bbox = bbox.ok_or_else(|| {
            CommonError::InvalidBoundary("geometry has no coordinate pairs".to_string())
        })?;

        Ok(Self {
            geometry: geometry.clone(),
            bbox,
        })
    }

    /// GeoJSON geometry object.
    pub fn geometry(&self) -> &Value {
        &self.geometry
    }

    /// Extent of the boundary.
    pub fn bbox(&self) -> BoundingBox {
        self.bbox
    }
}

/// Walk nested coordinate arrays and grow the extent with every [x, y] pair.
fn collect_extent(value: &Value, bbox: &mut Option<BoundingBox>) {
    let Some(items) = value.as_array() else {
        return;
    };

    if let (Some(x), Some(y)) = (
        items.first().and_then(Value::as_f64),
        items.get(1).and_then(Value::as_f64),
    ) {
        *bbox = Some(match bbox.take() {
            Some(b) => BoundingBox::new(b.min_x.min(x), b.min_y.min(y), b.max_x.max(x), b.max_y.max(y)),
            None => BoundingBox::new(x, y, x, y),
        });
        return;
    }

    for item in items {
        collect_extent(item, bbox);
    }
}
