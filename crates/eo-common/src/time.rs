//! Acquisition time ranges and day-of-year helpers.

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::{CommonError, CommonResult};

/// An inclusive time range for catalog searches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeRange {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> CommonResult<Self> {
        if end < start {
            return Err(CommonError::InvalidTime(format!(
                "end {} is before start {}",
                end, start
            )));
        }
        Ok(Self { start, end })
    }

    /// Build a range from two `YYYY-MM-DD` dates, covering the whole end day.
    pub fn from_dates(start: &str, end: &str) -> CommonResult<Self> {
        let start = parse_date(start)?;
        let end = parse_date(end)?;
        let end = end
            .and_hms_opt(23, 59, 59)
            .map(|ndt| Utc.from_utc_datetime(&ndt))
            .ok_or_else(|| CommonError::InvalidTime("invalid end of day".to_string()))?;
        let start = start
            .and_hms_opt(0, 0, 0)
            .map(|ndt| Utc.from_utc_datetime(&ndt))
            .ok_or_else(|| CommonError::InvalidTime("invalid start of day".to_string()))?;
        Self::new(start, end)
    }

    /// STAC `datetime` interval: `start/end` in RFC 3339.
    pub fn to_interval(&self) -> String {
        format!(
            "{}/{}",
            self.start.format("%Y-%m-%dT%H:%M:%SZ"),
            self.end.format("%Y-%m-%dT%H:%M:%SZ")
        )
    }

    pub fn contains(&self, dt: &DateTime<Utc>) -> bool {
        dt >= &self.start && dt <= &self.end
    }
}

fn parse_date(s: &str) -> CommonResult<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .map_err(|_| CommonError::InvalidTime(format!("expected YYYY-MM-DD, got '{}'", s)))
}

/// Parse an ISO 8601 timestamp, assuming UTC when no offset is present.
pub fn parse_timestamp(s: &str) -> CommonResult<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }

    if let Ok(ndt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f") {
        return Ok(Utc.from_utc_datetime(&ndt));
    }

    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        if let Some(ndt) = date.and_hms_opt(0, 0, 0) {
            return Ok(Utc.from_utc_datetime(&ndt));
        }
    }

    Err(CommonError::InvalidTime(s.to_string()))
}

/// Day of year, 1-based.
pub fn day_of_year(dt: &DateTime<Utc>) -> u16 {
    dt.ordinal() as u16
}
