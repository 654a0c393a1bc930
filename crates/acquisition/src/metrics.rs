//! Metric recording through the `metrics` facade.
//!
//! No exporter is installed here; without a recorder these calls are no-ops.

use std::time::Instant;

use eo_common::{Platform, Sensor};
use metrics::{counter, histogram};

pub const CACHE_HITS: &str = "eo_cache_hits_total";
pub const CACHE_MISSES: &str = "eo_cache_misses_total";
pub const ITEMS_FAILED: &str = "eo_items_failed_total";
pub const RACE_WINS: &str = "eo_platform_race_wins_total";
pub const FETCH_DURATION: &str = "eo_fetch_duration_ms";
pub const BAND_READ_DURATION: &str = "eo_band_read_duration_ms";

pub fn record_cache_hit(sensor: Sensor) {
    counter!(CACHE_HITS, "sensor" => sensor.as_str()).increment(1);
}

pub fn record_cache_miss(sensor: Sensor) {
    counter!(CACHE_MISSES, "sensor" => sensor.as_str()).increment(1);
}

pub fn record_item_failed(sensor: Sensor, platform: Platform) {
    counter!(ITEMS_FAILED, "sensor" => sensor.as_str(), "platform" => platform.as_str())
        .increment(1);
}

pub fn record_race_win(sensor: Sensor, platform: Platform) {
    counter!(RACE_WINS, "sensor" => sensor.as_str(), "platform" => platform.as_str())
        .increment(1);
}

pub fn record_band_read(platform: Platform, started: Instant) {
    histogram!(BAND_READ_DURATION, "platform" => platform.as_str())
        .record(started.elapsed().as_secs_f64() * 1000.0);
}

/// Records the fetch duration histogram when dropped, labeled with outcome.
pub struct FetchTimer {
    sensor: Sensor,
    platform: Platform,
    started: Instant,
    outcome: &'static str,
}

impl FetchTimer {
    pub fn start(sensor: Sensor, platform: Platform) -> Self {
        Self {
            sensor,
            platform,
            started: Instant::now(),
            outcome: "cancelled",
        }
    }

    pub fn finish(&mut self, outcome: &'static str) {
        self.outcome = outcome;
    }
}

impl Drop for FetchTimer {
    fn drop(&mut self) {
        histogram!(
            FETCH_DURATION,
            "sensor" => self.sensor.as_str(),
            "platform" => self.platform.as_str(),
            "outcome" => self.outcome
        )
        .record(self.started.elapsed().as_secs_f64() * 1000.0);
    }
}
