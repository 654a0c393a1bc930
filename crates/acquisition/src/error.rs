//! Error types for acquisition.
//!
//! Item-level failures ([`ItemFetchError`]) are caught at the item boundary
//! and turned into skipped items. Everything else propagates to the caller
//! as an [`AcquisitionError`].

use std::fmt;

use eo_common::{Platform, Sensor};
use thiserror::Error;

/// Result type for acquisition operations.
pub type Result<T> = std::result::Result<T, AcquisitionError>;

/// Errors that abort a fetch.
#[derive(Error, Debug)]
pub enum AcquisitionError {
    /// Unknown binding, no usable platform, missing clients or bad settings.
    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    /// The catalog returned no usable items.
    #[error("no {sensor} items found on {platform} for the given field and date range ({range})")]
    CatalogEmpty {
        sensor: Sensor,
        platform: Platform,
        range: String,
    },

    /// Every item of the fetch was excluded.
    #[error("all {} {sensor} items failed on {platform}: {}", .failures.len(), FailureList(.failures))]
    AllItemsFailed {
        sensor: Sensor,
        platform: Platform,
        failures: Vec<ItemFailure>,
    },

    /// Every platform in a race failed.
    #[error("all platforms failed for {sensor}: {}", RaceFailureList(.failures))]
    PlatformRaceAllFailed {
        sensor: Sensor,
        failures: Vec<PlatformFailure>,
    },

    /// Catalog search failed.
    #[error("catalog error: {0}")]
    Catalog(#[from] CatalogError),

    /// Cache directory could not be prepared.
    #[error("cache error: {0}")]
    Cache(#[from] CacheError),

    /// Footprint computation failed.
    #[error("footprint error: {0}")]
    Footprint(#[from] FootprintError),

    /// A spawned fetch or assembly task panicked or was cancelled.
    #[error("task failed: {0}")]
    Task(String),
}

impl AcquisitionError {
    /// Stable label used in logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            AcquisitionError::Configuration(_) => "configuration",
            AcquisitionError::CatalogEmpty { .. } => "catalog_empty",
            AcquisitionError::AllItemsFailed { .. } => "all_items_failed",
            AcquisitionError::PlatformRaceAllFailed { .. } => "platform_race_all_failed",
            AcquisitionError::Catalog(_) => "catalog",
            AcquisitionError::Cache(_) => "cache",
            AcquisitionError::Footprint(_) => "footprint",
            AcquisitionError::Task(_) => "task",
        }
    }
}

/// Configuration problems detected before any remote call.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigurationError {
    #[error("no binding for sensor '{sensor}' on platform '{platform}'. Available platforms for {sensor}: {}", PlatformList(.available))]
    NoBinding {
        sensor: Sensor,
        platform: Platform,
        available: Vec<Platform>,
    },

    #[error("no available platforms for sensor '{sensor}'. Supported platforms: {}", PlatformList(.supported))]
    NoCandidates {
        sensor: Sensor,
        supported: Vec<Platform>,
    },

    #[error("no catalog/raster clients registered for platform '{0}'")]
    NoClients(Platform),

    #[error("invalid setting: {0}")]
    Invalid(String),
}

/// One excluded item.
#[derive(Debug)]
pub struct ItemFailure {
    /// Position of the item in acquisition-time order.
    pub index: usize,
    pub item_id: String,
    pub error: ItemFetchError,
}

/// One failed race candidate.
#[derive(Debug)]
pub struct PlatformFailure {
    pub platform: Platform,
    pub error: Box<AcquisitionError>,
}

/// Per-item failures. Never propagated past the pipeline.
#[derive(Error, Debug)]
pub enum ItemFetchError {
    #[error("asset '{0}' not found in item")]
    MissingAsset(String),

    #[error("failed to read asset '{asset}': {source}")]
    Raster {
        asset: String,
        #[source]
        source: RasterError,
    },

    #[error("band arrays have inconsistent shapes: {0}")]
    BandShape(String),

    #[error("grid shape {actual:?} differs from the first item's {expected:?}")]
    ShapeMismatch {
        expected: (usize, usize),
        actual: (usize, usize),
    },

    #[error("item task failed: {0}")]
    TaskFailed(String),
}

/// Errors from the catalog collaborator.
#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("catalog returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("failed to decode catalog response: {0}")]
    Decode(String),

    #[error("catalog unavailable: {0}")]
    Unavailable(String),
}

impl From<serde_json::Error> for CatalogError {
    fn from(err: serde_json::Error) -> Self {
        CatalogError::Decode(err.to_string())
    }
}

/// Errors from the raster crop/resample collaborator.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RasterError {
    #[error("I/O error: {0}")]
    Io(String),

    #[error("unsupported raster: {0}")]
    Unsupported(String),
}

/// Errors from the on-disk cache store.
#[derive(Error, Debug)]
pub enum CacheError {
    #[error("cache I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("corrupt cache entry {path}: {reason}")]
    Corrupt { path: String, reason: String },

    #[error("cache task failed: {0}")]
    Task(String),
}

impl CacheError {
    pub(crate) fn io(path: &std::path::Path, source: std::io::Error) -> Self {
        CacheError::Io {
            path: path.display().to_string(),
            source,
        }
    }
}

/// Errors from footprint map generation.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FootprintError {
    #[error("pixel size must be positive, got {0}")]
    InvalidPixelSize(f64),

    #[error("native resolution must be positive, got {0}")]
    InvalidResolution(f64),

    #[error("validity mask shape {mask:?} does not match grid shape {grid:?}")]
    MaskShape {
        mask: (usize, usize),
        grid: (usize, usize),
    },

    #[error("{0} footprints exceed the 32-bit id space")]
    TooManyFootprints(u64),
}

struct PlatformList<'a>(&'a [Platform]);

impl fmt::Display for PlatformList<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.0.iter().map(Platform::as_str).collect();
        write!(f, "[{}]", names.join(", "))
    }
}

struct FailureList<'a>(&'a [ItemFailure]);

impl fmt::Display for FailureList<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, failure) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{}: {}", failure.item_id, failure.error)?;
        }
        Ok(())
    }
}

struct RaceFailureList<'a>(&'a [PlatformFailure]);

impl fmt::Display for RaceFailureList<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, failure) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{}: {}", failure.platform, failure.error)?;
        }
        Ok(())
    }
}
