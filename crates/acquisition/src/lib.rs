//! Multi-sensor, multi-platform EO acquisition.
//!
//! A [`SensorPlatformBinding`] ties a sensor to one hosting platform; a
//! [`SensorProfile`] holds the sensor's radiometry and masking. The
//! [`AcquisitionPipeline`] uses both to search a catalog, read every item
//! concurrently through a per-item cache, and assemble one
//! [`AcquisitionResult`] on a common 10 m grid, including footprint maps of
//! the sensor's native pixels. [`AcquisitionService`] picks platforms, races
//! them, and fans out over sensors.

pub mod aggregate;
pub mod angles;
pub mod availability;
pub mod binding;
pub mod cache;
pub mod catalog;
pub mod config;
pub mod error;
pub mod footprint;
pub mod logging;
pub mod metrics;
pub mod orchestrator;
pub mod pipeline;
pub mod profile;
pub mod raster;

pub use aggregate::{AcquisitionResult, SkippedItem};
pub use angles::{extract_angles, ViewGeometry};
pub use availability::{EnvAvailability, PlatformAvailability, StaticAvailability};
pub use binding::{
    all_bindings, get_binding, platforms_for, sensors_for, BindingRegistry, Resample,
    SensorPlatformBinding,
};
pub use cache::{CacheEntry, CacheKey, CacheStore};
pub use catalog::{AcquisitionItem, Asset, CatalogClient, CatalogQuery, StacCatalog};
pub use config::AcquisitionConfig;
pub use error::{
    AcquisitionError, CacheError, CatalogError, ConfigurationError, FootprintError, ItemFailure,
    ItemFetchError, PlatformFailure, RasterError, Result,
};
pub use footprint::{footprint_map, footprint_maps, FootprintMap, DEFAULT_MIN_VALID_FRACTION};
pub use orchestrator::{AcquisitionService, MultiSensorResult, PlatformClients};
pub use pipeline::{AcquisitionPipeline, FetchQuery, PipelineSettings};
pub use profile::{sensor_profile, ResolutionGroup, SensorProfile};
pub use raster::{RasterReader, RasterTile, ReadRequest};

pub use eo_common::{Boundary, BoundingBox, GeoTransform, Platform, Sensor, TimeRange};
