//! One sensor × platform fetch: search, per-item concurrent read with cache,
//! conversion, masking, aggregation.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use eo_common::{day_of_year, Boundary, GeoTransform, Platform, TimeRange};
use futures::future::try_join_all;
use futures::stream::{self, StreamExt};
use ndarray::{Array3, Axis};
use tokio::sync::Semaphore;
use tracing::{debug, info, instrument, warn};

use crate::aggregate::{assemble, AcquisitionResult, ItemOutcome};
use crate::angles::{extract_angles, ViewGeometry};
use crate::binding::SensorPlatformBinding;
use crate::cache::{CacheEntry, CacheKey, CacheStore};
use crate::catalog::{AcquisitionItem, CatalogClient, CatalogQuery};
use crate::config::{
    default_read_limit, AcquisitionConfig, DEFAULT_CLOUD_CEILING, DEFAULT_MAX_ITEMS,
};
use crate::error::{AcquisitionError, ItemFetchError, Result};
use crate::footprint::DEFAULT_MIN_VALID_FRACTION;
use crate::metrics::{self, FetchTimer};
use crate::profile::SensorProfile;
use crate::raster::{RasterReader, RasterTile, ReadRequest};

/// What to fetch, independent of sensor and platform.
#[derive(Debug, Clone)]
pub struct FetchQuery {
    pub time_range: TimeRange,
    pub boundary: Boundary,
    pub cache_dir: PathBuf,
    /// Maximum cloud cover percentage; ignored for sensors without one.
    /// Unset means the pipeline's configured ceiling.
    pub cloud_ceiling: Option<f64>,
    /// Restrict to one tile, given as `T` or `MGRS-T`.
    pub tile: Option<String>,
}

impl FetchQuery {
    pub fn new(time_range: TimeRange, boundary: Boundary, cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            time_range,
            boundary,
            cache_dir: cache_dir.into(),
            cloud_ceiling: None,
            tile: None,
        }
    }

    pub fn with_cloud_ceiling(mut self, ceiling: f64) -> Self {
        self.cloud_ceiling = Some(ceiling);
        self
    }

    pub fn with_tile(mut self, tile: impl Into<String>) -> Self {
        self.tile = Some(tile.into());
        self
    }
}

/// Concurrency and filtering knobs of one pipeline.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PipelineSettings {
    /// Items processed at once.
    pub item_workers: usize,
    /// Band reads in flight at once, shared by every item of a fetch.
    pub max_concurrent_reads: usize,
    pub min_valid_fraction: f64,
    pub max_items: usize,
    /// Cloud ceiling used when the query sets none.
    pub cloud_ceiling: f64,
}

impl PipelineSettings {
    pub fn for_platform(config: &AcquisitionConfig, platform: Platform) -> Self {
        Self {
            item_workers: config.item_workers.max(1),
            max_concurrent_reads: config.read_limit_for(platform).max(1),
            min_valid_fraction: config.min_valid_fraction,
            max_items: config.max_items,
            cloud_ceiling: config.cloud_ceiling,
        }
    }
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            item_workers: 8,
            max_concurrent_reads: default_read_limit(Platform::Aws),
            min_valid_fraction: DEFAULT_MIN_VALID_FRACTION,
            max_items: DEFAULT_MAX_ITEMS,
            cloud_ceiling: DEFAULT_CLOUD_CEILING,
        }
    }
}

/// A fetched, converted and masked item.
#[derive(Debug)]
pub(crate) struct ProcessedItem {
    pub reflectance: Array3<f32>,
    pub geotransform: GeoTransform,
    pub crs: String,
    pub angles: ViewGeometry,
    pub doy: u16,
    pub from_cache: bool,
}

impl ProcessedItem {
    pub fn grid_shape(&self) -> (usize, usize) {
        let (_, h, w) = self.reflectance.dim();
        (h, w)
    }
}

/// Per-fetch state shared by every item.
struct FetchContext<'a> {
    profile: &'static SensorProfile,
    binding: &'a SensorPlatformBinding,
    boundary: &'a Boundary,
    cache: CacheStore,
    reads: Semaphore,
}

/// Drives fetches for one platform's collaborators.
#[derive(Clone)]
pub struct AcquisitionPipeline {
    catalog: Arc<dyn CatalogClient>,
    raster: Arc<dyn RasterReader>,
    settings: PipelineSettings,
}

impl AcquisitionPipeline {
    pub fn new(
        catalog: Arc<dyn CatalogClient>,
        raster: Arc<dyn RasterReader>,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            catalog,
            raster,
            settings,
        }
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    /// Fetch every usable item of `binding` for the query.
    #[instrument(
        skip(self, profile, binding, query),
        fields(sensor = %binding.sensor, platform = %binding.platform, collection = %binding.collection)
    )]
    pub async fn fetch(
        &self,
        profile: &'static SensorProfile,
        binding: &SensorPlatformBinding,
        query: &FetchQuery,
    ) -> Result<AcquisitionResult> {
        let mut timer = FetchTimer::start(binding.sensor, binding.platform);
        let result = self.run(profile, binding, query).await;
        timer.finish(match &result {
            Ok(_) => "ok",
            Err(e) => e.kind(),
        });
        result
    }

    async fn run(
        &self,
        profile: &'static SensorProfile,
        binding: &SensorPlatformBinding,
        query: &FetchQuery,
    ) -> Result<AcquisitionResult> {
        let cache = CacheStore::open(&query.cache_dir).await?;
        let items = self.search(profile, binding, query).await?;
        let total = items.len();

        let ctx = FetchContext {
            profile,
            binding,
            boundary: &query.boundary,
            cache,
            reads: Semaphore::new(self.settings.max_concurrent_reads.max(1)),
        };

        let mut slots: Vec<Option<std::result::Result<ProcessedItem, ItemFetchError>>> =
            (0..total).map(|_| None).collect();
        {
            let ctx = &ctx;
            let items = &items;
            let mut results = stream::iter(0..total)
                .map(|index| async move { (index, self.process_item(ctx, &items[index]).await) })
                .buffer_unordered(self.settings.item_workers.max(1));

            while let Some((index, outcome)) = results.next().await {
                if let Err(e) = &outcome {
                    warn!(item = %items[index].id, error = %e, "Item failed, skipping");
                    metrics::record_item_failed(binding.sensor, binding.platform);
                }
                slots[index] = Some(outcome);
            }
        }

        let outcomes: Vec<ItemOutcome> = items
            .into_iter()
            .zip(slots)
            .enumerate()
            .map(|(index, (item, slot))| ItemOutcome {
                index,
                item_id: item.id,
                result: slot.unwrap_or_else(|| {
                    Err(ItemFetchError::TaskFailed("item produced no outcome".to_string()))
                }),
            })
            .collect();

        let platform = binding.platform;
        let min_valid_fraction = self.settings.min_valid_fraction;
        let result = tokio::task::spawn_blocking(move || {
            assemble(profile, platform, outcomes, min_valid_fraction)
        })
        .await
        .map_err(|e| AcquisitionError::Task(e.to_string()))??;

        info!(
            items = result.len(),
            skipped = result.skipped.len(),
            cache_hits = result.cache_hits,
            downloaded = result.downloaded,
            "Fetch complete"
        );
        Ok(result)
    }

    /// Search, filter and sort catalog items.
    async fn search(
        &self,
        profile: &SensorProfile,
        binding: &SensorPlatformBinding,
        query: &FetchQuery,
    ) -> Result<Vec<AcquisitionItem>> {
        let catalog_query = CatalogQuery {
            collection: binding.collection.to_string(),
            boundary: query.boundary.clone(),
            time_range: query.time_range,
            cloud_ceiling: profile
                .has_cloud_cover
                .then(|| query.cloud_ceiling.unwrap_or(self.settings.cloud_ceiling)),
            max_items: self.settings.max_items,
        };
        let found = self.catalog.search(&catalog_query).await?;
        let found_count = found.len();

        let mut items: Vec<AcquisitionItem> = found
            .into_iter()
            .filter(|item| item.has_assets(binding.required_assets()))
            .collect();
        let dropped = found_count - items.len();
        if dropped > 0 {
            info!(dropped = dropped, "Dropped items missing required assets");
        }

        if let Some(tile) = &query.tile {
            items = filter_tile(items, binding, tile);
        }

        sort_by_acquisition(&mut items);
        debug!(found = found_count, usable = items.len(), "Catalog search done");

        if items.is_empty() {
            return Err(AcquisitionError::CatalogEmpty {
                sensor: binding.sensor,
                platform: binding.platform,
                range: query.time_range.to_interval(),
            });
        }
        Ok(items)
    }

    #[instrument(skip(self, ctx, item), fields(item = %item.id))]
    async fn process_item(
        &self,
        ctx: &FetchContext<'_>,
        item: &AcquisitionItem,
    ) -> std::result::Result<ProcessedItem, ItemFetchError> {
        let sensor = ctx.binding.sensor;
        let key = CacheKey::new(sensor, item.id.clone());

        let mut cached = None;
        if ctx.cache.exists(&key).await {
            match ctx.cache.load(&key).await {
                Ok(entry) if entry.band_count() == ctx.binding.band_count() => cached = Some(entry),
                Ok(entry) => warn!(
                    cached_bands = entry.band_count(),
                    expected_bands = ctx.binding.band_count(),
                    "Cache entry has the wrong band count, refetching"
                ),
                Err(e) => warn!(error = %e, "Unreadable cache entry, refetching"),
            }
        }

        let from_cache = cached.is_some();
        let entry = match cached {
            Some(entry) => {
                metrics::record_cache_hit(sensor);
                entry
            }
            None => {
                metrics::record_cache_miss(sensor);
                let entry = self.read_item(ctx, item).await?;
                if let Err(e) = ctx.cache.save(&key, &entry).await {
                    warn!(error = %e, "Failed to write cache entry");
                }
                entry
            }
        };

        let baseline: Option<String> = ctx
            .binding
            .baseline_property
            .and_then(|property| item.property_str(property))
            .map(str::to_string);
        let profile = ctx.profile;
        let CacheEntry {
            band_data,
            qa_data,
            geotransform,
            crs,
        } = entry;
        let reflectance = tokio::task::spawn_blocking(move || {
            profile.process_item(band_data.view(), &qa_data, baseline.as_deref())
        })
        .await
        .map_err(|e| ItemFetchError::TaskFailed(e.to_string()))?;

        Ok(ProcessedItem {
            reflectance,
            geotransform,
            crs,
            angles: extract_angles(&item.properties),
            doy: item.acquired_at().as_ref().map(day_of_year).unwrap_or(0),
            from_cache,
        })
    }

    /// Read every band plus QA concurrently and stack them.
    async fn read_item(
        &self,
        ctx: &FetchContext<'_>,
        item: &AcquisitionItem,
    ) -> std::result::Result<CacheEntry, ItemFetchError> {
        let binding = ctx.binding;
        let band_count = binding.band_count();
        let target_resolution = ctx.profile.target_resolution as f64;

        let reads = binding.required_assets().enumerate().map(|(i, key)| {
            let resample = if i < band_count {
                binding.resample
            } else {
                binding.qa_resample
            };
            async move {
                let asset = item
                    .assets
                    .get(key)
                    .ok_or_else(|| ItemFetchError::MissingAsset(key.to_string()))?;
                let _permit = ctx
                    .reads
                    .acquire()
                    .await
                    .map_err(|e| ItemFetchError::TaskFailed(e.to_string()))?;
                let started = Instant::now();
                let tile = self
                    .raster
                    .crop_and_resample(ReadRequest {
                        href: &asset.href,
                        boundary: ctx.boundary,
                        target_resolution,
                        resample,
                    })
                    .await
                    .map_err(|source| ItemFetchError::Raster {
                        asset: key.to_string(),
                        source,
                    })?;
                metrics::record_band_read(binding.platform, started);
                Ok::<RasterTile, ItemFetchError>(tile)
            }
        });

        let mut tiles = try_join_all(reads).await?;
        let qa = tiles
            .pop()
            .ok_or_else(|| ItemFetchError::BandShape("no tiles read".to_string()))?;
        stack_tiles(tiles, qa)
    }
}

/// Stack band tiles into `[bands, h, w]`; the first band supplies the grid.
fn stack_tiles(
    bands: Vec<RasterTile>,
    qa: RasterTile,
) -> std::result::Result<CacheEntry, ItemFetchError> {
    let first = bands
        .first()
        .ok_or_else(|| ItemFetchError::BandShape("no band tiles".to_string()))?;
    let shape = first.shape();
    let geotransform = first.geotransform;
    let crs = first.crs.clone();

    if let Some(bad) = bands.iter().find(|t| t.shape() != shape) {
        return Err(ItemFetchError::BandShape(format!(
            "band grid {:?} differs from {:?}",
            bad.shape(),
            shape
        )));
    }
    if qa.shape() != shape {
        return Err(ItemFetchError::BandShape(format!(
            "QA grid {:?} differs from band grid {:?}",
            qa.shape(),
            shape
        )));
    }

    let views: Vec<_> = bands.iter().map(|t| t.data.view()).collect();
    let band_data = ndarray::stack(Axis(0), &views)
        .map_err(|e| ItemFetchError::BandShape(e.to_string()))?;

    Ok(CacheEntry {
        band_data,
        qa_data: qa.data,
        geotransform,
        crs,
    })
}

/// Keep items whose tile property matches `tile` (`T` or `MGRS-T`).
fn filter_tile(
    items: Vec<AcquisitionItem>,
    binding: &SensorPlatformBinding,
    tile: &str,
) -> Vec<AcquisitionItem> {
    if binding.tile_filter_keys.is_empty() {
        warn!(tile = %tile, "Binding has no tile properties, tile filter ignored");
        return items;
    }
    let tile = tile.strip_prefix("MGRS-").unwrap_or(tile);
    let prefixed = format!("MGRS-{}", tile);
    let before = items.len();
    let kept: Vec<AcquisitionItem> = items
        .into_iter()
        .filter(|item| {
            binding.tile_filter_keys.iter().any(|key| {
                item.property_str(key)
                    .map(|v| v == tile || v == prefixed)
                    .unwrap_or(false)
            })
        })
        .collect();
    debug!(tile = %tile, before = before, after = kept.len(), "Applied tile filter");
    kept
}

/// Ascending acquisition time; items without one go last, in catalog order.
fn sort_by_acquisition(items: &mut [AcquisitionItem]) {
    items.sort_by_cached_key(|item| {
        let at: Option<DateTime<Utc>> = item.acquired_at();
        (at.is_none(), at)
    });
}
