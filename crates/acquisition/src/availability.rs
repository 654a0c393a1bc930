//! Which platforms can currently be used, and in what order to try them.
//!
//! Only the presence of credentials is checked here; validating or
//! refreshing them is the job of the platform clients.

use std::collections::BTreeSet;

use eo_common::Platform;
use tracing::debug;

/// Default platform preference.
pub const DEFAULT_PREFERENCE: [Platform; 5] = [
    Platform::Aws,
    Platform::Cdse,
    Platform::Planetary,
    Platform::Earthdata,
    Platform::Gee,
];

/// Credential/config collaborator.
pub trait PlatformAvailability: Send + Sync {
    /// Platforms with usable credentials.
    fn available_platforms(&self) -> BTreeSet<Platform>;

    /// Preferred order for automatic platform selection.
    fn preference_order(&self) -> Vec<Platform> {
        DEFAULT_PREFERENCE.to_vec()
    }
}

/// Platforms that serve data without credentials.
pub fn credential_free_platforms() -> impl Iterator<Item = Platform> {
    Platform::ALL.into_iter().filter(|p| !p.requires_credentials())
}

/// Fixed availability, for embedding and tests.
#[derive(Debug, Clone)]
pub struct StaticAvailability {
    available: BTreeSet<Platform>,
    preference: Vec<Platform>,
}

impl StaticAvailability {
    pub fn new(available: impl IntoIterator<Item = Platform>) -> Self {
        Self {
            available: available.into_iter().collect(),
            preference: DEFAULT_PREFERENCE.to_vec(),
        }
    }

    /// Only the platforms that need no credentials.
    pub fn credential_free() -> Self {
        Self::new(credential_free_platforms())
    }

    pub fn with_preference(mut self, preference: Vec<Platform>) -> Self {
        self.preference = preference;
        self
    }
}

impl PlatformAvailability for StaticAvailability {
    fn available_platforms(&self) -> BTreeSet<Platform> {
        self.available.clone()
    }

    fn preference_order(&self) -> Vec<Platform> {
        self.preference.clone()
    }
}

/// Availability derived from environment variables.
#[derive(Debug, Clone, Default)]
pub struct EnvAvailability {
    preference: Option<Vec<Platform>>,
}

impl EnvAvailability {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_preference(mut self, preference: Vec<Platform>) -> Self {
        self.preference = Some(preference);
        self
    }

    /// Whether credentials for `platform` are present in the environment.
    pub fn has_credentials(platform: Platform) -> bool {
        Self::check(platform, |name| std::env::var_os(name).is_some())
    }

    fn check(platform: Platform, present: impl Fn(&str) -> bool) -> bool {
        let all = |names: &[&str]| names.iter().all(|n| present(*n));
        match platform {
            Platform::Aws | Platform::Planetary => true,
            Platform::Cdse => {
                all(&["CDSE_S3_ACCESS_KEY", "CDSE_S3_SECRET_KEY"])
                    || all(&["CDSE_USERNAME", "CDSE_PASSWORD"])
            }
            Platform::Earthdata => {
                all(&["EARTHDATA_USERNAME", "EARTHDATA_PASSWORD"]) || present("EARTHDATA_TOKEN")
            }
            Platform::Gee => {
                present("GOOGLE_APPLICATION_CREDENTIALS") || present("EE_SERVICE_ACCOUNT")
            }
        }
    }
}

impl PlatformAvailability for EnvAvailability {
    fn available_platforms(&self) -> BTreeSet<Platform> {
        let available: BTreeSet<Platform> = Platform::ALL
            .into_iter()
            .filter(|p| Self::has_credentials(*p))
            .collect();
        debug!(platforms = ?available, "Platforms with credentials");
        available
    }

    fn preference_order(&self) -> Vec<Platform> {
        self.preference
            .clone()
            .unwrap_or_else(|| DEFAULT_PREFERENCE.to_vec())
    }
}
