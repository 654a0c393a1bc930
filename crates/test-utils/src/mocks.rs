//! In-memory catalog and raster collaborators.
//!
//! [`MockRaster`] serves hrefs of the form `mock://{item}/{key}` (bands) and
//! `mock://{item}/qa/{key}` (QA), as produced by [`crate::make_item`].

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use acquisition::{
    AcquisitionItem, CatalogClient, CatalogError, CatalogQuery, GeoTransform, RasterError,
    RasterReader, RasterTile, ReadRequest,
};
use async_trait::async_trait;
use ndarray::Array2;

use crate::generators::{LANDSAT_CLEAR, LANDSAT_FILL};

/// Catalog returning a fixed item list.
pub struct MockCatalog {
    items: Vec<AcquisitionItem>,
    delay: Duration,
    error: Option<String>,
    calls: AtomicUsize,
    last_query: Mutex<Option<CatalogQuery>>,
}

impl MockCatalog {
    pub fn new(items: Vec<AcquisitionItem>) -> Self {
        Self {
            items,
            delay: Duration::ZERO,
            error: None,
            calls: AtomicUsize::new(0),
            last_query: Mutex::new(None),
        }
    }

    /// A catalog whose searches fail with `CatalogError::Unavailable`.
    pub fn failing(message: impl Into<String>) -> Self {
        let mut catalog = Self::new(Vec::new());
        catalog.error = Some(message.into());
        catalog
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_query(&self) -> Option<CatalogQuery> {
        self.last_query.lock().unwrap().clone()
    }
}

#[async_trait]
impl CatalogClient for MockCatalog {
    async fn search(&self, query: &CatalogQuery) -> Result<Vec<AcquisitionItem>, CatalogError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_query.lock().unwrap() = Some(query.clone());
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        match &self.error {
            Some(message) => Err(CatalogError::Unavailable(message.clone())),
            None => Ok(self.items.clone()),
        }
    }
}

/// Raster reader producing constant tiles, with per-item overrides.
pub struct MockRaster {
    shape: (usize, usize),
    crs: String,
    band_value: i32,
    qa_value: i32,
    delay: Duration,
    item_values: HashMap<String, i32>,
    item_delays: HashMap<String, Duration>,
    item_shapes: HashMap<String, (usize, usize)>,
    failing_items: HashSet<String>,
    nodata_cols: Vec<usize>,
    reads: AtomicUsize,
    completed: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

struct InFlightGuard<'a>(&'a AtomicUsize);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl MockRaster {
    /// Clear Landsat-style tiles of `shape` with DN 10000.
    pub fn new(shape: (usize, usize)) -> Self {
        Self {
            shape,
            crs: "EPSG:32633".to_string(),
            band_value: 10_000,
            qa_value: LANDSAT_CLEAR,
            delay: Duration::ZERO,
            item_values: HashMap::new(),
            item_delays: HashMap::new(),
            item_shapes: HashMap::new(),
            failing_items: HashSet::new(),
            nodata_cols: Vec::new(),
            reads: AtomicUsize::new(0),
            completed: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    pub fn with_band_value(mut self, value: i32) -> Self {
        self.band_value = value;
        self
    }

    pub fn with_qa_value(mut self, value: i32) -> Self {
        self.qa_value = value;
        self
    }

    /// Latency of every read.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn with_item_value(mut self, item: &str, value: i32) -> Self {
        self.item_values.insert(item.to_string(), value);
        self
    }

    /// Latency of every read of one item, replacing the default.
    pub fn with_item_delay(mut self, item: &str, delay: Duration) -> Self {
        self.item_delays.insert(item.to_string(), delay);
        self
    }

    pub fn with_item_shape(mut self, item: &str, shape: (usize, usize)) -> Self {
        self.item_shapes.insert(item.to_string(), shape);
        self
    }

    /// Every read of `item` fails.
    pub fn with_failing_item(mut self, item: &str) -> Self {
        self.failing_items.insert(item.to_string());
        self
    }

    /// Columns written as fill DN in every band, leaving QA clear.
    pub fn with_nodata_cols(mut self, cols: impl IntoIterator<Item = usize>) -> Self {
        self.nodata_cols = cols.into_iter().collect();
        self
    }

    /// Reads started.
    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    /// Reads that ran to completion.
    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::SeqCst)
    }

    /// Highest number of reads observed in flight at once.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    fn parse_href(href: &str) -> Result<(String, bool), RasterError> {
        let path = href
            .strip_prefix("mock://")
            .ok_or_else(|| RasterError::Unsupported(href.to_string()))?;
        let (item, rest) = path
            .split_once('/')
            .ok_or_else(|| RasterError::Unsupported(href.to_string()))?;
        Ok((item.to_string(), rest.starts_with("qa/")))
    }
}

#[async_trait]
impl RasterReader for MockRaster {
    async fn crop_and_resample(&self, request: ReadRequest<'_>) -> Result<RasterTile, RasterError> {
        let (item, is_qa) = Self::parse_href(request.href)?;
        self.reads.fetch_add(1, Ordering::SeqCst);

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        let _guard = InFlightGuard(&self.in_flight);

        let delay = self.item_delays.get(&item).copied().unwrap_or(self.delay);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        } else {
            tokio::task::yield_now().await;
        }

        if self.failing_items.contains(&item) {
            return Err(RasterError::Io(format!("simulated read failure for {}", item)));
        }

        let shape = self.item_shapes.get(&item).copied().unwrap_or(self.shape);
        let data = if is_qa {
            Array2::from_elem(shape, self.qa_value)
        } else {
            let value = self.item_values.get(&item).copied().unwrap_or(self.band_value);
            Array2::from_shape_fn(shape, |(_, col)| {
                if self.nodata_cols.contains(&col) {
                    LANDSAT_FILL
                } else {
                    value
                }
            })
        };

        self.completed.fetch_add(1, Ordering::SeqCst);
        Ok(RasterTile {
            data,
            geotransform: GeoTransform::north_up(500_000.0, 5_800_000.0, request.target_resolution),
            crs: self.crs.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{band_href, qa_href, test_boundary};
    use acquisition::Resample;

    #[tokio::test]
    async fn test_mock_raster_serves_bands_and_qa() {
        let raster = MockRaster::new((3, 4)).with_item_value("a", 42).with_nodata_cols([1]);
        let boundary = test_boundary();
        let band_href = band_href("a", "red");
        let qa_href = qa_href("a", "qa_pixel");

        let band = raster
            .crop_and_resample(ReadRequest {
                href: &band_href,
                boundary: &boundary,
                target_resolution: 10.0,
                resample: Resample::Bilinear,
            })
            .await
            .unwrap();
        assert_eq!(band.shape(), (3, 4));
        assert_eq!(band.data[[0, 0]], 42);
        assert_eq!(band.data[[0, 1]], LANDSAT_FILL);
        assert_eq!(band.geotransform.pixel_size(), 10.0);

        let qa = raster
            .crop_and_resample(ReadRequest {
                href: &qa_href,
                boundary: &boundary,
                target_resolution: 10.0,
                resample: Resample::Nearest,
            })
            .await
            .unwrap();
        assert!(qa.data.iter().all(|&v| v == LANDSAT_CLEAR));
        assert_eq!(raster.reads(), 2);
        assert_eq!(raster.completed(), 2);
    }

    #[tokio::test]
    async fn test_mock_raster_failing_item() {
        let raster = MockRaster::new((2, 2)).with_failing_item("bad");
        let boundary = test_boundary();
        let href = band_href("bad", "red");
        let result = raster
            .crop_and_resample(ReadRequest {
                href: &href,
                boundary: &boundary,
                target_resolution: 10.0,
                resample: Resample::Bilinear,
            })
            .await;
        assert!(matches!(result, Err(RasterError::Io(_))));
        assert_eq!(raster.completed(), 0);
    }

    #[tokio::test]
    async fn test_mock_catalog_records_query() {
        use acquisition::CatalogQuery;
        let catalog = MockCatalog::new(vec![AcquisitionItem::new("x")]);
        let query = CatalogQuery {
            collection: "landsat-c2-l2".to_string(),
            boundary: test_boundary(),
            time_range: crate::fixtures::summer_2022(),
            cloud_ceiling: Some(30.0),
            max_items: 10,
        };
        let items = catalog.search(&query).await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(catalog.calls(), 1);
        assert_eq!(catalog.last_query().unwrap().cloud_ceiling, Some(30.0));
    }
}
