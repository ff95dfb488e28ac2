//! # Samples
//!
//! The unit of data this crate captures and uploads: one position plus the
//! instant the platform took the fix.
//!
//! ## Timestamp encoding
//!
//! Timestamps are stored as fixed-width UTC strings with millisecond
//! precision, e.g. `2024-01-01T00:01:00.000Z`. Every timestamp has the same
//! width and field order, so comparing two of them as strings gives the same
//! answer as comparing the instants. Trimming acknowledged samples depends on
//! this, so the encoder refuses anything it cannot render in that shape
//! (years outside 0000..=9999).

use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Result, TrackerError};

/// `strftime` pattern for sample timestamps
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3fZ";

/// Length of every encoded timestamp (`YYYY-MM-DDTHH:MM:SS.mmmZ`)
pub const TIMESTAMP_LEN: usize = 24;

/// One captured position.
///
/// Field names on the wire are `lat`, `long` and `time`; the same shape is
/// used for the persisted buffer and the upload body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    #[serde(rename = "lat")]
    pub latitude: f64,

    #[serde(rename = "long")]
    pub longitude: f64,

    #[serde(rename = "time")]
    pub timestamp: String,
}

impl Sample {
    pub fn new(latitude: f64, longitude: f64, timestamp: impl Into<String>) -> Self {
        Self {
            latitude,
            longitude,
            timestamp: timestamp.into(),
        }
    }
}

/// Raw position fix as reported by the positioning collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct Fix {
    pub latitude: f64,
    pub longitude: f64,
    /// Fix time in milliseconds since the Unix epoch
    pub time_ms: i64,
}

impl Fix {
    pub fn new(latitude: f64, longitude: f64, time_ms: i64) -> Self {
        Self {
            latitude,
            longitude,
            time_ms,
        }
    }

    /// Convert the fix into a sample, validating coordinates and time.
    ///
    /// # Errors
    ///
    /// Returns `MalformedFix` if a coordinate is non-finite or out of range,
    /// or if the fix time cannot be encoded.
    pub fn to_sample(&self) -> Result<Sample> {
        if !self.latitude.is_finite() || !(-90.0..=90.0).contains(&self.latitude) {
            return Err(TrackerError::MalformedFix(format!(
                "latitude {} out of range",
                self.latitude
            )));
        }
        if !self.longitude.is_finite() || !(-180.0..=180.0).contains(&self.longitude) {
            return Err(TrackerError::MalformedFix(format!(
                "longitude {} out of range",
                self.longitude
            )));
        }

        Ok(Sample::new(
            self.latitude,
            self.longitude,
            encode_timestamp(self.time_ms)?,
        ))
    }
}

/// Encode milliseconds since the Unix epoch as a sortable UTC timestamp.
///
/// # Examples
///
/// ```
/// use geo_tracker::sample::encode_timestamp;
///
/// assert_eq!(encode_timestamp(0).unwrap(), "1970-01-01T00:00:00.000Z");
/// assert_eq!(encode_timestamp(1_704_067_260_000).unwrap(), "2024-01-01T00:01:00.000Z");
/// ```
pub fn encode_timestamp(time_ms: i64) -> Result<String> {
    let instant = DateTime::<Utc>::from_timestamp_millis(time_ms).ok_or_else(|| {
        TrackerError::MalformedFix(format!("fix time {} ms is out of range", time_ms))
    })?;

    if !(0..=9999).contains(&instant.year()) {
        return Err(TrackerError::MalformedFix(format!(
            "fix time {} ms has year {} which cannot be encoded",
            time_ms,
            instant.year()
        )));
    }

    Ok(instant.format(TIMESTAMP_FORMAT).to_string())
}
