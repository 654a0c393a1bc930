//! One fetch per sensor, failures isolated per sensor.

use std::collections::BTreeMap;

use eo_common::Sensor;
use tokio::task::JoinSet;
use tracing::{info, instrument, warn};

use super::AcquisitionService;
use crate::aggregate::AcquisitionResult;
use crate::error::AcquisitionError;
use crate::pipeline::FetchQuery;

/// Per-sensor outcomes of [`AcquisitionService::fetch_many`].
#[derive(Debug, Default)]
pub struct MultiSensorResult {
    pub results: BTreeMap<Sensor, AcquisitionResult>,
    pub errors: BTreeMap<Sensor, AcquisitionError>,
}

impl MultiSensorResult {
    pub fn is_complete(&self) -> bool {
        self.errors.is_empty()
    }
}

impl AcquisitionService {
    /// Fetch every sensor concurrently, each from its preferred platform and
    /// on its own task.
    #[instrument(skip(self, query), fields(sensors = sensors.len()))]
    pub async fn fetch_many(&self, sensors: &[Sensor], query: &FetchQuery) -> MultiSensorResult {
        let mut unique: Vec<Sensor> = sensors.to_vec();
        unique.sort_unstable();
        unique.dedup();

        let mut combined = MultiSensorResult::default();
        let mut fetches = JoinSet::new();
        for sensor in unique {
            let fetch = self
                .select_platform(sensor)
                .and_then(|platform| self.detached_fetch(sensor, platform, query));
            match fetch {
                Ok(fetch) => {
                    fetches.spawn(async move { (sensor, fetch.await) });
                }
                Err(e) => {
                    warn!(sensor = %sensor, error = %e, "No platform for sensor");
                    combined.errors.insert(sensor, AcquisitionError::from(e));
                }
            }
        }

        while let Some(joined) = fetches.join_next().await {
            let (sensor, outcome) = match joined {
                Ok(pair) => pair,
                Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
                Err(e) => {
                    warn!(error = %e, "Sensor fetch task cancelled");
                    continue;
                }
            };
            match outcome {
                Ok(result) => {
                    combined.results.insert(sensor, result);
                }
                Err(error) => {
                    warn!(sensor = %sensor, error = %error, "Sensor fetch failed");
                    combined.errors.insert(sensor, error);
                }
            }
        }

        info!(
            succeeded = combined.results.len(),
            failed = combined.errors.len(),
            "Multi-sensor fetch complete"
        );
        combined
    }
}
