//! Fetch the same sensor from several platforms and keep the fastest.

use eo_common::{Platform, Sensor};
use tokio::task::JoinSet;
use tracing::{info, instrument, warn};

use super::AcquisitionService;
use crate::aggregate::AcquisitionResult;
use crate::error::{AcquisitionError, ConfigurationError, PlatformFailure, Result};
use crate::metrics;
use crate::pipeline::FetchQuery;

impl AcquisitionService {
    /// Run one fetch per candidate platform and return the first success.
    ///
    /// Each candidate runs as its own task. Remaining tasks are aborted once
    /// one succeeds, which cancels their in-flight reads. Cache entries they
    /// already wrote stay on disk.
    #[instrument(skip(self, query, candidates), fields(sensor = %sensor))]
    pub async fn fetch_fastest(
        &self,
        sensor: Sensor,
        query: &FetchQuery,
        candidates: Option<Vec<Platform>>,
    ) -> Result<AcquisitionResult> {
        let candidates = match candidates {
            Some(explicit) => self.validate_candidates(sensor, explicit)?,
            None => self.default_candidates(sensor)?,
        };

        if let [only] = candidates.as_slice() {
            return self.fetch(sensor, *only, query).await;
        }

        info!(
            candidates = ?candidates,
            "Racing platforms"
        );

        let mut race = JoinSet::new();
        for &platform in &candidates {
            let fetch = self.detached_fetch(sensor, platform, query)?;
            race.spawn(async move { (platform, fetch.await) });
        }

        // Dropping the set on return aborts the losing fetches.
        let mut failures = Vec::new();
        while let Some(joined) = race.join_next().await {
            let (platform, outcome) = match joined {
                Ok(pair) => pair,
                Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
                Err(e) => {
                    warn!(error = %e, "Race task cancelled");
                    continue;
                }
            };
            match outcome {
                Ok(result) => {
                    info!(
                        platform = %platform,
                        cancelled = race.len(),
                        "Platform won the race"
                    );
                    metrics::record_race_win(sensor, platform);
                    return Ok(result);
                }
                Err(error) => {
                    warn!(platform = %platform, error = %error, "Platform failed in race");
                    failures.push(PlatformFailure {
                        platform,
                        error: Box::new(error),
                    });
                }
            }
        }

        Err(AcquisitionError::PlatformRaceAllFailed { sensor, failures })
    }

    /// Check caller-supplied candidates before any remote call.
    fn validate_candidates(
        &self,
        sensor: Sensor,
        explicit: Vec<Platform>,
    ) -> std::result::Result<Vec<Platform>, ConfigurationError> {
        let mut candidates: Vec<Platform> = Vec::with_capacity(explicit.len());
        for platform in explicit {
            if candidates.contains(&platform) {
                continue;
            }
            self.registry().get(sensor, platform)?;
            if !self.has_clients(platform) {
                return Err(ConfigurationError::NoClients(platform));
            }
            candidates.push(platform);
        }
        if candidates.is_empty() {
            return Err(ConfigurationError::NoCandidates {
                sensor,
                supported: self.registry().platforms_for(sensor),
            });
        }
        Ok(candidates)
    }
}
