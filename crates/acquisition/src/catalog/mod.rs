//! Catalog items and the catalog collaborator.

pub mod stac;

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use eo_common::{parse_timestamp, Boundary, TimeRange};
use serde::{Deserialize, Serialize};

use crate::error::CatalogError;

pub use stac::StacCatalog;

/// Free-form item properties.
pub type Properties = serde_json::Map<String, serde_json::Value>;

/// Property used when an item has no primary timestamp.
pub const FALLBACK_DATETIME_PROPERTY: &str = "start_datetime";

/// Location of one asset of an item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Asset {
    pub href: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub media_type: Option<String>,
}

impl Asset {
    pub fn new(href: impl Into<String>) -> Self {
        Self {
            href: href.into(),
            media_type: None,
        }
    }
}

/// One catalog entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AcquisitionItem {
    pub id: String,
    #[serde(default)]
    pub datetime: Option<DateTime<Utc>>,
    #[serde(default)]
    pub properties: Properties,
    #[serde(default)]
    pub assets: HashMap<String, Asset>,
}

impl AcquisitionItem {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            datetime: None,
            properties: Properties::new(),
            assets: HashMap::new(),
        }
    }

    pub fn with_datetime(mut self, datetime: DateTime<Utc>) -> Self {
        self.datetime = Some(datetime);
        self
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    pub fn with_asset(mut self, key: impl Into<String>, href: impl Into<String>) -> Self {
        self.assets.insert(key.into(), Asset::new(href));
        self
    }

    /// Acquisition time, falling back to `start_datetime`.
    pub fn acquired_at(&self) -> Option<DateTime<Utc>> {
        self.datetime.or_else(|| {
            self.properties
                .get(FALLBACK_DATETIME_PROPERTY)
                .and_then(|v| v.as_str())
                .and_then(|s| parse_timestamp(s).ok())
        })
    }

    pub fn has_assets<'a>(&self, mut keys: impl Iterator<Item = &'a str>) -> bool {
        keys.all(|k| self.assets.contains_key(k))
    }

    pub fn property_str(&self, key: &str) -> Option<&str> {
        self.properties.get(key).and_then(|v| v.as_str())
    }

    pub fn property_f64(&self, key: &str) -> Option<f64> {
        self.properties.get(key).and_then(|v| v.as_f64())
    }
}

/// One catalog search.
#[derive(Debug, Clone)]
pub struct CatalogQuery {
    pub collection: String,
    pub boundary: Boundary,
    pub time_range: TimeRange,
    /// Maximum `eo:cloud_cover`; only set for sensors that expose it.
    pub cloud_ceiling: Option<f64>,
    pub max_items: usize,
}

/// Searches a remote catalog.
#[async_trait]
pub trait CatalogClient: Send + Sync {
    async fn search(&self, query: &CatalogQuery) -> Result<Vec<AcquisitionItem>, CatalogError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_acquired_at_prefers_primary() {
        let primary = Utc.with_ymd_and_hms(2022, 8, 1, 10, 0, 0).unwrap();
        let item = AcquisitionItem::new("a")
            .with_datetime(primary)
            .with_property("start_datetime", "2021-01-01T00:00:00Z");
        assert_eq!(item.acquired_at(), Some(primary));
    }

    #[test]
    fn test_acquired_at_falls_back_to_start_datetime() {
        let item = AcquisitionItem::new("b").with_property("start_datetime", "2022-08-03T09:15:00Z");
        assert_eq!(
            item.acquired_at(),
            Some(Utc.with_ymd_and_hms(2022, 8, 3, 9, 15, 0).unwrap())
        );
        assert_eq!(AcquisitionItem::new("c").acquired_at(), None);
    }

    #[test]
    fn test_has_assets() {
        let item = AcquisitionItem::new("d")
            .with_asset("red", "s3://bucket/red.tif")
            .with_asset("scl", "s3://bucket/scl.tif");
        assert!(item.has_assets(["red", "scl"].into_iter()));
        assert!(!item.has_assets(["red", "nir"].into_iter()));
    }
}
