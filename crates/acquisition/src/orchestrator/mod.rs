//! Platform selection and multi-platform / multi-sensor orchestration.

mod multi;
mod race;

pub use multi::MultiSensorResult;

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use eo_common::{Platform, Sensor};
use tracing::{debug, info, instrument, Instrument};

use crate::aggregate::AcquisitionResult;
use crate::availability::{credential_free_platforms, PlatformAvailability};
use crate::binding::BindingRegistry;
use crate::catalog::{CatalogClient, StacCatalog};
use crate::config::AcquisitionConfig;
use crate::error::{AcquisitionError, ConfigurationError, Result};
use crate::pipeline::{AcquisitionPipeline, FetchQuery, PipelineSettings};
use crate::profile::sensor_profile;
use crate::raster::RasterReader;

/// Collaborators serving one platform.
#[derive(Clone)]
pub struct PlatformClients {
    pub catalog: Arc<dyn CatalogClient>,
    pub raster: Arc<dyn RasterReader>,
}

/// Entry point for fetching sensors across platforms.
pub struct AcquisitionService {
    clients: HashMap<Platform, PlatformClients>,
    availability: Arc<dyn PlatformAvailability>,
    registry: BindingRegistry,
    config: AcquisitionConfig,
}

impl AcquisitionService {
    pub fn new(config: AcquisitionConfig, availability: Arc<dyn PlatformAvailability>) -> Self {
        Self {
            clients: HashMap::new(),
            availability,
            registry: BindingRegistry::from_config(&config),
            config,
        }
    }

    /// Register the collaborators for `platform`.
    pub fn with_platform(
        mut self,
        platform: Platform,
        catalog: Arc<dyn CatalogClient>,
        raster: Arc<dyn RasterReader>,
    ) -> Self {
        self.clients
            .insert(platform, PlatformClients { catalog, raster });
        self
    }

    /// Register a STAC catalog for every platform that has an endpoint,
    /// all sharing one raster reader.
    pub fn with_stac_catalogs(
        mut self,
        raster: Arc<dyn RasterReader>,
    ) -> std::result::Result<Self, AcquisitionError> {
        for platform in Platform::ALL {
            let Some(endpoint) = self.config.stac_endpoint(platform) else {
                continue;
            };
            let catalog: Arc<dyn CatalogClient> = Arc::new(StacCatalog::new(endpoint)?);
            self = self.with_platform(platform, catalog, raster.clone());
        }
        Ok(self)
    }

    pub fn registry(&self) -> &BindingRegistry {
        &self.registry
    }

    pub fn config(&self) -> &AcquisitionConfig {
        &self.config
    }

    pub fn has_clients(&self, platform: Platform) -> bool {
        self.clients.contains_key(&platform)
    }

    fn pipeline_for(&self, platform: Platform) -> std::result::Result<AcquisitionPipeline, ConfigurationError> {
        let clients = self
            .clients
            .get(&platform)
            .ok_or(ConfigurationError::NoClients(platform))?;
        Ok(AcquisitionPipeline::new(
            clients.catalog.clone(),
            clients.raster.clone(),
            PipelineSettings::for_platform(&self.config, platform),
        ))
    }

    /// Fetch `sensor` from one platform.
    #[instrument(skip(self, query), fields(sensor = %sensor, platform = %platform))]
    pub async fn fetch(
        &self,
        sensor: Sensor,
        platform: Platform,
        query: &FetchQuery,
    ) -> Result<AcquisitionResult> {
        let binding = self.registry.get(sensor, platform)?;
        let pipeline = self.pipeline_for(platform)?;
        pipeline.fetch(sensor_profile(sensor), &binding, query).await
    }

    /// A fetch owning its binding, pipeline and query, ready to run as a
    /// separate task.
    fn detached_fetch(
        &self,
        sensor: Sensor,
        platform: Platform,
        query: &FetchQuery,
    ) -> std::result::Result<
        impl Future<Output = Result<AcquisitionResult>> + Send + 'static,
        ConfigurationError,
    > {
        let binding = self.registry.get(sensor, platform)?;
        let pipeline = self.pipeline_for(platform)?;
        let query = query.clone();
        Ok(async move { pipeline.fetch(sensor_profile(sensor), &binding, &query).await }
            .in_current_span())
    }

    fn preference_order(&self) -> Vec<Platform> {
        let mut order = self
            .config
            .platform_preference
            .clone()
            .unwrap_or_else(|| self.availability.preference_order());
        for platform in Platform::ALL {
            if !order.contains(&platform) {
                order.push(platform);
            }
        }
        order
    }

    /// Platforms to try for `sensor` when the caller names none.
    ///
    /// Platforms serving the sensor that have credentials and registered
    /// clients, in preference order; otherwise the credential-free ones.
    pub fn default_candidates(
        &self,
        sensor: Sensor,
    ) -> std::result::Result<Vec<Platform>, ConfigurationError> {
        let serving = self.registry.platforms_for(sensor);
        let available = self.availability.available_platforms();
        let usable = |p: &Platform| serving.contains(p) && self.has_clients(*p);

        let mut candidates: Vec<Platform> = self
            .preference_order()
            .into_iter()
            .filter(|p| usable(p) && available.contains(p))
            .collect();

        if candidates.is_empty() {
            candidates = credential_free_platforms().filter(|p| usable(p)).collect();
            if !candidates.is_empty() {
                debug!(sensor = %sensor, "Falling back to credential-free platforms");
            }
        }

        if candidates.is_empty() {
            return Err(ConfigurationError::NoCandidates {
                sensor,
                supported: serving,
            });
        }
        Ok(candidates)
    }

    /// The preferred platform for `sensor`.
    pub fn select_platform(&self, sensor: Sensor) -> std::result::Result<Platform, ConfigurationError> {
        let candidates = self.default_candidates(sensor)?;
        let platform = candidates[0];
        info!(sensor = %sensor, platform = %platform, "Selected platform");
        Ok(platform)
    }
}
