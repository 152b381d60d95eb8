//! Raw forecast payload as returned by the Open-Meteo forecast endpoint
//!
//! The payload is kept close to the wire format: each series is a `time`
//! array plus any number of parallel numeric arrays keyed by provider field
//! name. It is also the value persisted in the cache, together with the
//! instant it was fetched.

use chrono::{DateTime, NaiveDateTime, TimeDelta, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// The payload doesn't have the shape the normalizer needs
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SchemaError {
    /// A configured provider field is not present in the series
    #[error("missing field '{field}' in {series} series")]
    MissingField { series: &'static str, field: String },

    /// A timestamp in the series is not ISO 8601 local time
    #[error("invalid time format: {0}")]
    InvalidTime(String),
}

/// One time series: timestamps plus parallel sample arrays
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Series {
    /// Local timestamps, e.g. "2025-03-21T14:00"
    #[serde(default)]
    pub time: Vec<String>,
    /// Sample arrays keyed by provider field name; `None` marks a null sample
    #[serde(flatten)]
    pub fields: BTreeMap<String, Vec<Option<f64>>>,
}

impl Series {
    /// Samples for `field`, if the series carries it
    pub fn field(&self, field: &str) -> Option<&[Option<f64>]> {
        self.fields.get(field).map(Vec::as_slice)
    }

    /// Samples for `field`, or a [`SchemaError::MissingField`] naming `series`
    pub fn require(
        &self,
        series: &'static str,
        field: &str,
    ) -> Result<&[Option<f64>], SchemaError> {
        self.field(field).ok_or_else(|| SchemaError::MissingField {
            series,
            field: field.to_string(),
        })
    }
}

/// Forecast as fetched: hourly and 15-minute series with their fetch time
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawForecastPayload {
    /// Offset of the series' local timestamps from UTC
    #[serde(default)]
    pub utc_offset_seconds: i32,
    pub hourly: Series,
    pub minutely_15: Series,
    /// When the payload was fetched; drives cache freshness
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "chrono::serde::ts_milliseconds_option"
    )]
    pub timestamp: Option<DateTime<Utc>>,
}

impl RawForecastPayload {
    /// Converts one of the payload's local timestamps to UTC
    ///
    /// The payload carries a single offset, taken at fetch time. Timestamps on
    /// the other side of a daylight-saving change inside the 48-hour payload
    /// come out one hour off.
    pub fn to_utc(&self, local: NaiveDateTime) -> DateTime<Utc> {
        Utc.from_utc_datetime(&(local - TimeDelta::seconds(self.utc_offset_seconds as i64)))
    }
}

/// Parses a local ISO 8601 timestamp as sent by Open-Meteo ("2024-07-15T05:30")
pub fn parse_local_time(time: &str) -> Result<NaiveDateTime, SchemaError> {
    NaiveDateTime::parse_from_str(time, "%Y-%m-%dT%H:%M")
        .or_else(|_| NaiveDateTime::parse_from_str(time, "%Y-%m-%dT%H:%M:%S"))
        .map_err(|_| SchemaError::InvalidTime(time.to_string()))
}
