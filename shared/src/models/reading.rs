//! Sensor reading data model.
//!
//! Defines the `SensorReading` row produced by the room sensor and consumed by
//! the weekly chart report.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single sensor sample.
///
/// Field names follow the CSV columns written by the sensor logger
/// (`time`, `soundLevel`, `lightIntensity`).
///
/// # Example
///
/// ```
/// use shared::models::SensorReading;
/// use chrono::{TimeZone, Utc};
///
/// let reading = SensorReading::new(Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap(), 42.5, 310.0);
/// assert_eq!(reading.sound_level, 42.5);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SensorReading {
    /// When the sample was taken.
    pub time: DateTime<Utc>,

    /// Measured sound level.
    pub sound_level: f64,

    /// Measured light intensity.
    pub light_intensity: f64,
}

impl SensorReading {
    /// Creates a new reading.
    #[must_use]
    pub fn new(time: DateTime<Utc>, sound_level: f64, light_intensity: f64) -> Self {
        Self {
            time,
            sound_level,
            light_intensity,
        }
    }
}

/// Sorts readings by timestamp, keeping the original order of equal timestamps.
pub fn sort_by_time(readings: &mut [SensorReading]) {
    readings.sort_by_key(|r| r.time);
}
