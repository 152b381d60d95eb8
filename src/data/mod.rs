//! Core data models for the weather clock
//!
//! The normalized model is what the clock face is drawn from: 24 hour slots
//! keyed by local hour-of-day, each with four quarter-hour records. Slots may
//! be empty when a daylight-saving change skips an hour.

pub mod client;
pub mod demo;
pub mod normalize;
pub mod quantity;
pub mod raw;
pub mod service;

pub use client::{ForecastRequest, ForecastTransport, OpenMeteoClient, WeatherError};
pub use normalize::{normalize, normalize_at, validate};
pub use quantity::{HourlyQuantity, PropertyMap, QuarterlyQuantity, Quantity};
pub use raw::{RawForecastPayload, SchemaError, Series};
pub use service::{CacheMiss, WeatherService};

use chrono::{DateTime, NaiveDateTime, TimeDelta, Timelike, Utc};
use serde::{Deserialize, Serialize};

/// Number of hour slots on the dial
pub const HOURS_PER_DAY: usize = 24;

/// Number of quarter-hour records per hour
pub const QUARTERS_PER_HOUR: usize = 4;

/// Maximum cloud cover found in one altitude band
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CloudBand {
    /// Lower bound of the band in meters (the band covers `(altitude, altitude + resolution]`)
    pub altitude: f64,
    /// Cloud cover percentage (0-100)
    pub cover: f64,
}

/// Forecast for one 15-minute interval
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuarterlyRecord {
    /// Position within the hour, 0-3
    pub quarter_index: u8,
    /// Local hour-of-day of the owning hour
    pub hour_index: u32,
    /// Local start of the interval
    pub time: NaiveDateTime,
    /// Local middle of the interval (start + 7.5 minutes)
    pub mid_point: NaiveDateTime,
    /// Feels-like temperature in Celsius
    pub apparent_temperature: Option<f64>,
    /// Relative humidity percentage
    pub relative_humidity: Option<f64>,
    /// Precipitation in mm over the interval
    pub precipitation: Option<f64>,
    /// Surface shortwave radiation in W/m²
    pub shortwave_radiation: Option<f64>,
    /// Top-of-atmosphere radiation in W/m²
    pub terrestrial_radiation: Option<f64>,
    /// Seconds of sunshine within the interval
    pub sunshine_duration: Option<f64>,
    /// Altitude of the 0°C isotherm in meters
    pub freezing_level_height: Option<f64>,
    /// Sun elevation above the horizon at the mid-point, in degrees
    pub solar_elevation: f64,
    /// Ground sun exposure index (0-100)
    pub ground_sun_exposure_index: f64,
    /// Top-of-atmosphere intensity as a percentage of full sun
    pub sun_intensity: f64,
    /// Whether the sun is up (terrestrial radiation above zero)
    pub is_day: bool,
    /// Percentage of the interval with sunshine
    pub sunshine: f64,
    /// Hour slot whose cloud bands apply to this quarter
    ///
    /// Quarters 0-1 use their own hour, quarters 2-3 the following one.
    /// Resolve through [`NormalizedWeatherModel::cloud_bands`].
    pub cloud_source_hour: u32,
}

/// Forecast for one hour of the dial
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HourlyRecord {
    /// Local hour-of-day, 0-23
    pub hour_index: u32,
    /// Local start of the hour
    pub time: NaiveDateTime,
    /// Temperature in Celsius
    pub temperature: Option<f64>,
    /// Feels-like temperature in Celsius
    pub apparent_temperature: Option<f64>,
    /// Relative humidity percentage
    pub relative_humidity: Option<f64>,
    /// Precipitation in mm over the hour
    pub precipitation: Option<f64>,
    /// Probability of precipitation percentage
    pub precipitation_probability: Option<f64>,
    /// Total cloud cover percentage
    pub cloud_cover: Option<f64>,
    /// Visibility in meters
    pub visibility: Option<f64>,
    /// Wind speed at 10m in km/h
    pub wind_speed: Option<f64>,
    /// Percentage of the hour with sunshine
    pub sunshine: Option<f64>,
    /// Cloud cover per altitude band, lowest band first
    pub cloud_cover_by_altitude: Vec<CloudBand>,
    /// Band most likely to produce precipitation, if any band is cloudy
    pub thickest_band_altitude: Option<f64>,
    /// The four quarter-hour records of this hour
    pub quarters: [QuarterlyRecord; QUARTERS_PER_HOUR],
}

/// 24 hour slots keyed by local hour-of-day
///
/// Hour 0 is always midnight, regardless of where the forecast window starts.
/// A slot is `None` when the forecast has no sample for that hour.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedWeatherModel {
    /// Offset of local time from UTC for the forecast location
    pub utc_offset_seconds: i32,
    hours: [Option<HourlyRecord>; HOURS_PER_DAY],
}

impl NormalizedWeatherModel {
    /// Creates a model with every slot empty
    pub fn empty(utc_offset_seconds: i32) -> Self {
        Self {
            utc_offset_seconds,
            hours: std::array::from_fn(|_| None),
        }
    }

    /// Stores `record` in its hour slot, replacing whatever was there
    pub(crate) fn insert(&mut self, record: HourlyRecord) {
        let slot = record.hour_index as usize % HOURS_PER_DAY;
        self.hours[slot] = Some(record);
    }

    /// Record for local hour `index`, if present
    pub fn hour(&self, index: u32) -> Option<&HourlyRecord> {
        self.hours.get(index as usize).and_then(Option::as_ref)
    }

    /// All 24 slots in hour order, including empty ones
    pub fn slots(&self) -> &[Option<HourlyRecord>] {
        &self.hours
    }

    /// Present records in hour order, skipping empty slots
    pub fn iter(&self) -> impl Iterator<Item = &HourlyRecord> {
        self.hours.iter().flatten()
    }

    /// Number of present hours
    pub fn len(&self) -> usize {
        self.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Cloud bands that apply to `quarter`
    pub fn cloud_bands(&self, quarter: &QuarterlyRecord) -> &[CloudBand] {
        self.hour(quarter.cloud_source_hour)
            .map(|h| h.cloud_cover_by_altitude.as_slice())
            .unwrap_or(&[])
    }

    /// Thickest cloud band that applies to `quarter`
    pub fn thickest_band_altitude(&self, quarter: &QuarterlyRecord) -> Option<f64> {
        self.hour(quarter.cloud_source_hour)
            .and_then(|h| h.thickest_band_altitude)
    }

    /// Converts a UTC instant to the forecast location's local time
    pub fn local_time(&self, time: DateTime<Utc>) -> NaiveDateTime {
        time.naive_utc() + TimeDelta::seconds(self.utc_offset_seconds as i64)
    }

    /// Hour record containing local time `now`
    pub fn active_hour(&self, now: NaiveDateTime) -> Option<&HourlyRecord> {
        self.hour(now.hour())
    }

    /// Quarter record containing local time `now`
    pub fn active_quarter(&self, now: NaiveDateTime) -> Option<&QuarterlyRecord> {
        let quarter = (now.minute() / 15) as usize;
        self.active_hour(now).map(|h| &h.quarters[quarter.min(QUARTERS_PER_HOUR - 1)])
    }

    /// Points every quarter at the hour whose cloud data it should show
    ///
    /// Quarters 0-1 keep their own hour. Quarters 2-3 take the next hour,
    /// or the one after that when the next slot is missing. If neither
    /// exists they fall back to their own hour.
    pub(crate) fn link_quarter_clouds(&mut self) {
        let present: [bool; HOURS_PER_DAY] = std::array::from_fn(|h| self.hours[h].is_some());

        for (h, slot) in self.hours.iter_mut().enumerate() {
            let Some(record) = slot else { continue };
            let next = [1, 2]
                .into_iter()
                .map(|step| (h + step) % HOURS_PER_DAY)
                .find(|&n| present[n])
                .unwrap_or(h);

            for quarter in record.quarters.iter_mut() {
                let source = if quarter.quarter_index < 2 { h } else { next };
                quarter.cloud_source_hour = source as u32;
            }
        }
    }
}
