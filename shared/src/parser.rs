//! CSV parser for sensor readings.
//!
//! Converts the CSV export of the room sensor into [`SensorReading`] rows.
//! The whole batch fails on the first bad row.

use crate::models::SensorReading;
use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::Deserialize;
use thiserror::Error;

/// Column holding the sample timestamp.
pub const TIME_COLUMN: &str = "time";
/// Column holding the sound level.
pub const SOUND_COLUMN: &str = "soundLevel";
/// Column holding the light intensity.
pub const LIGHT_COLUMN: &str = "lightIntensity";

/// Naive date-time layouts tried in order after RFC 3339.
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
    "%d.%m.%Y %H:%M:%S",
];

/// Date-only layouts, interpreted as midnight UTC.
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y"];

/// Errors that can occur while parsing sensor CSV.
#[derive(Debug, Error)]
pub enum ParseError {
    /// A required column is missing from the header row.
    #[error("Missing required column '{0}'")]
    MissingColumn(&'static str),

    /// A timestamp could not be recognised.
    #[error("Row {row}: unrecognised timestamp '{value}'")]
    Timestamp {
        /// 1-based data row number.
        row: usize,
        /// The offending value.
        value: String,
    },

    /// The row could not be decoded (bad number, wrong field count, ...).
    #[error("Row {row}: {source}")]
    Row {
        /// 1-based data row number.
        row: usize,
        /// Underlying CSV error.
        #[source]
        source: csv::Error,
    },

    /// The header row could not be read.
    #[error("Invalid CSV header: {0}")]
    Header(#[source] csv::Error),
}

#[derive(Debug, Deserialize)]
struct RawReading {
    time: String,
    #[serde(rename = "soundLevel")]
    sound_level: f64,
    #[serde(rename = "lightIntensity")]
    light_intensity: f64,
}

/// Parses CSV text into readings, preserving row order.
///
/// # Errors
///
/// Returns an error if:
/// - A required column is missing
/// - Any row has an unrecognised timestamp or non-numeric measurement
///
/// # Example
///
/// ```
/// use shared::parser::parse_readings;
///
/// let csv = "time,soundLevel,lightIntensity\n2024-03-01 08:00:00,41.5,300\n";
/// let readings = parse_readings(csv).unwrap();
/// assert_eq!(readings.len(), 1);
/// assert_eq!(readings[0].light_intensity, 300.0);
/// ```
pub fn parse_readings(csv_text: &str) -> Result<Vec<SensorReading>, ParseError> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(csv_text.as_bytes());

    let headers = reader.headers().map_err(ParseError::Header)?;
    for column in [TIME_COLUMN, SOUND_COLUMN, LIGHT_COLUMN] {
        if !headers.iter().any(|h| h == column) {
            return Err(ParseError::MissingColumn(column));
        }
    }

    let mut readings = Vec::new();
    for (index, record) in reader.deserialize::<RawReading>().enumerate() {
        let row = index + 1;
        let raw = record.map_err(|source| ParseError::Row { row, source })?;
        let time = parse_timestamp(&raw.time).ok_or_else(|| ParseError::Timestamp {
            row,
            value: raw.time.clone(),
        })?;
        readings.push(SensorReading::new(time, raw.sound_level, raw.light_intensity));
    }

    tracing::debug!(count = readings.len(), "Parsed sensor readings");
    Ok(readings)
}

/// Parses a timestamp, auto-detecting its layout.
///
/// Accepts RFC 3339, common date-time layouts (naive values are taken as UTC),
/// plain dates, and integer Unix epoch seconds.
#[must_use]
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }

    for format in DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(value, format) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }

    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(value, format) {
            return date
                .and_hms_opt(0, 0, 0)
                .map(|naive| Utc.from_utc_datetime(&naive));
        }
    }

    value
        .parse::<i64>()
        .ok()
        .and_then(|secs| DateTime::from_timestamp(secs, 0))
}
