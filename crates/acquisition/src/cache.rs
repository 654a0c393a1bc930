//! Per-item on-disk cache of raw band and QA arrays.
//!
//! One gzip-compressed JSON file per (sensor, item id):
//! `{cache_dir}/{sensor}_{item_id}.json.gz`. Writes go to a uniquely named
//! temporary file that is renamed into place, so concurrent writers of the
//! same key never expose a partial file.

use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use eo_common::{GeoTransform, Sensor};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use ndarray::{Array2, Array3};
use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::{debug, instrument};

use crate::error::CacheError;

/// Identifies one cache entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub sensor: Sensor,
    pub item_id: String,
}

impl CacheKey {
    pub fn new(sensor: Sensor, item_id: impl Into<String>) -> Self {
        Self {
            sensor,
            item_id: item_id.into(),
        }
    }

    /// File name for this key. Path separators in the id become `_`.
    pub fn file_name(&self) -> String {
        let sanitized: String = self
            .item_id
            .chars()
            .map(|c| if c == '/' || c == '\\' { '_' } else { c })
            .collect();
        format!("{}_{}.json.gz", self.sensor.as_str(), sanitized)
    }
}

/// Raw data of one item on the common grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// `[bands, h, w]` digital numbers.
    pub band_data: Array3<i32>,
    /// `[h, w]` QA flags.
    pub qa_data: Array2<i32>,
    pub geotransform: GeoTransform,
    pub crs: String,
}

impl CacheEntry {
    pub fn band_count(&self) -> usize {
        self.band_data.dim().0
    }

    /// Spatial shape `(h, w)`.
    pub fn grid_shape(&self) -> (usize, usize) {
        let (_, h, w) = self.band_data.dim();
        (h, w)
    }
}

/// Cache rooted at one directory.
#[derive(Debug, Clone)]
pub struct CacheStore {
    root: PathBuf,
}

impl CacheStore {
    /// Open a cache, creating the directory if needed.
    pub async fn open(root: impl Into<PathBuf>) -> Result<Self, CacheError> {
        let root = root.into();
        fs::create_dir_all(&root)
            .await
            .map_err(|e| CacheError::io(&root, e))?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_for(&self, key: &CacheKey) -> PathBuf {
        self.root.join(key.file_name())
    }

    pub async fn exists(&self, key: &CacheKey) -> bool {
        fs::try_exists(self.path_for(key)).await.unwrap_or(false)
    }

    #[instrument(skip(self), fields(sensor = %key.sensor, item = %key.item_id))]
    pub async fn load(&self, key: &CacheKey) -> Result<CacheEntry, CacheError> {
        let path = self.path_for(key);
        let bytes = fs::read(&path).await.map_err(|e| CacheError::io(&path, e))?;
        let display = path.display().to_string();
        let entry = tokio::task::spawn_blocking(move || decode(&bytes, &display))
            .await
            .map_err(|e| CacheError::Task(e.to_string()))??;
        debug!(path = %path.display(), "Loaded cache entry");
        Ok(entry)
    }

    /// Persist an entry, replacing any existing file atomically.
    #[instrument(skip(self, entry), fields(sensor = %key.sensor, item = %key.item_id))]
    pub async fn save(&self, key: &CacheKey, entry: &CacheEntry) -> Result<(), CacheError> {
        let path = self.path_for(key);
        let temp_path = self
            .root
            .join(format!("{}.{}.partial", key.file_name(), uuid::Uuid::new_v4()));

        let owned = entry.clone();
        let bytes = tokio::task::spawn_blocking(move || encode(&owned))
            .await
            .map_err(|e| CacheError::Task(e.to_string()))??;

        fs::write(&temp_path, &bytes)
            .await
            .map_err(|e| CacheError::io(&temp_path, e))?;
        if let Err(e) = fs::rename(&temp_path, &path).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(CacheError::io(&path, e));
        }

        debug!(path = %path.display(), size = bytes.len(), "Saved cache entry");
        Ok(())
    }
}

fn encode(entry: &CacheEntry) -> Result<Vec<u8>, CacheError> {
    let json = serde_json::to_vec(entry).map_err(|e| CacheError::Corrupt {
        path: "<encode>".to_string(),
        reason: e.to_string(),
    })?;
    let io_err = |e| CacheError::Io {
        path: "<encode>".to_string(),
        source: e,
    };
    let mut encoder = GzEncoder::new(Vec::new(), Compression::fast());
    encoder.write_all(&json).map_err(io_err)?;
    encoder.finish().map_err(io_err)
}

fn decode(bytes: &[u8], path: &str) -> Result<CacheEntry, CacheError> {
    let mut json = Vec::new();
    GzDecoder::new(bytes)
        .read_to_end(&mut json)
        .map_err(|e| CacheError::Corrupt {
            path: path.to_string(),
            reason: e.to_string(),
        })?;
    let entry: CacheEntry = serde_json::from_slice(&json).map_err(|e| CacheError::Corrupt {
        path: path.to_string(),
        reason: e.to_string(),
    })?;

    let (_, h, w) = entry.band_data.dim();
    if entry.qa_data.dim() != (h, w) {
        return Err(CacheError::Corrupt {
            path: path.to_string(),
            reason: format!(
                "QA shape {:?} does not match band shape {:?}",
                entry.qa_data.dim(),
                (h, w)
            ),
        });
    }
    Ok(entry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array;

    fn entry() -> CacheEntry {
        CacheEntry {
            band_data: Array::from_shape_fn((3, 4, 5), |(b, r, c)| (b * 100 + r * 10 + c) as i32),
            qa_data: Array::from_shape_fn((4, 5), |(r, c)| ((r + c) % 3) as i32),
            geotransform: GeoTransform::north_up(600000.0, 5000000.0, 10.0),
            crs: "EPSG:32633".to_string(),
        }
    }

    #[test]
    fn test_key_sanitization() {
        let key = CacheKey::new(Sensor::Modis, "MOD09GA/2022/200\\x");
        assert_eq!(key.file_name(), "modis_MOD09GA_2022_200_x.json.gz");
        let key = CacheKey::new(Sensor::Sentinel2, "S2A_33UUP_20220801_0_L2A");
        assert_eq!(key.file_name(), "sentinel2_S2A_33UUP_20220801_0_L2A.json.gz");
    }

    #[test]
    fn test_container_has_four_fields() {
        let bytes = encode(&entry()).unwrap();
        let mut json = Vec::new();
        GzDecoder::new(&bytes[..]).read_to_end(&mut json).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&json).unwrap();
        let mut keys: Vec<&str> = value.as_object().unwrap().keys().map(String::as_str).collect();
        keys.sort_unstable();
        assert_eq!(keys, vec!["band_data", "crs", "geotransform", "qa_data"]);
    }

    #[tokio::test]
    async fn test_round_trip_is_exact() {
        let dir = tempfile::tempdir().unwrap();
        let store = CacheStore::open(dir.path().join("cache")).await.unwrap();
        let key = CacheKey::new(Sensor::Landsat, "LC09_L2SP_193026_20220801");

        assert!(!store.exists(&key).await);
        store.save(&key, &entry()).await.unwrap();
        assert!(store.exists(&key).await);
        assert_eq!(store.load(&key).await.unwrap(), entry());
    }

    #[tokio::test]
    async fn test_overwrite_leaves_no_partial_files() {
        let dir = tempfile::tempdir().unwrap();
        let store = CacheStore::open(dir.path()).await.unwrap();
        let key = CacheKey::new(Sensor::Sentinel2, "item");

        store.save(&key, &entry()).await.unwrap();
        let mut changed = entry();
        changed.crs = "EPSG:32634".to_string();
        store.save(&key, &changed).await.unwrap();

        assert_eq!(store.load(&key).await.unwrap().crs, "EPSG:32634");
        let names: Vec<String> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["sentinel2_item.json.gz".to_string()]);
    }

    #[tokio::test]
    async fn test_corrupt_entry_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let store = CacheStore::open(dir.path()).await.unwrap();
        let key = CacheKey::new(Sensor::Viirs, "broken");
        std::fs::write(store.path_for(&key), b"not gzip").unwrap();
        assert!(matches!(
            store.load(&key).await,
            Err(CacheError::Corrupt { .. })
        ));
    }
}
