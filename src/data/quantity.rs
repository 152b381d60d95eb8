//! Logical forecast quantities and their provider field names
//!
//! Each quantity the normalizer reads is an enum variant with a compiled-in
//! default Open-Meteo field name. Configuration may point a quantity at a
//! different provider field, but it can never name a quantity that does not
//! exist, and a provider field missing from the payload is a schema error.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Shared behaviour of hourly and quarter-hourly quantities
pub trait Quantity: Copy + Ord + fmt::Debug + 'static {
    /// Name of the payload series this quantity lives in
    const SERIES: &'static str;

    /// Every variant, in a stable order
    fn all() -> &'static [Self];

    /// Open-Meteo field name used when the configuration doesn't override it
    fn default_field(self) -> &'static str;

    /// Whether the provider reports this value for the interval *before* the
    /// timestamp, so the series has to be rotated by one slot
    fn is_backward_looking(self) -> bool;
}

/// Quantities read from the hourly series
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HourlyQuantity {
    Temperature,
    ApparentTemperature,
    RelativeHumidity,
    PrecipitationProbability,
    Precipitation,
    CloudCover,
    Visibility,
    WindSpeed,
    SunshineDuration,
}

impl Quantity for HourlyQuantity {
    const SERIES: &'static str = "hourly";

    fn all() -> &'static [Self] {
        use HourlyQuantity::*;
        &[
            Temperature,
            ApparentTemperature,
            RelativeHumidity,
            PrecipitationProbability,
            Precipitation,
            CloudCover,
            Visibility,
            WindSpeed,
            SunshineDuration,
        ]
    }

    fn default_field(self) -> &'static str {
        match self {
            HourlyQuantity::Temperature => "temperature_2m",
            HourlyQuantity::ApparentTemperature => "apparent_temperature",
            HourlyQuantity::RelativeHumidity => "relative_humidity_2m",
            HourlyQuantity::PrecipitationProbability => "precipitation_probability",
            HourlyQuantity::Precipitation => "precipitation",
            HourlyQuantity::CloudCover => "cloud_cover",
            HourlyQuantity::Visibility => "visibility",
            HourlyQuantity::WindSpeed => "wind_speed_10m",
            HourlyQuantity::SunshineDuration => "sunshine_duration",
        }
    }

    fn is_backward_looking(self) -> bool {
        matches!(
            self,
            HourlyQuantity::Precipitation | HourlyQuantity::PrecipitationProbability
        )
    }
}

/// Quantities read from the 15-minute series
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuarterlyQuantity {
    TerrestrialRadiation,
    ShortwaveRadiation,
    SunshineDuration,
    RelativeHumidity,
    Precipitation,
    ApparentTemperature,
    FreezingLevelHeight,
}

impl Quantity for QuarterlyQuantity {
    const SERIES: &'static str = "minutely_15";

    fn all() -> &'static [Self] {
        use QuarterlyQuantity::*;
        &[
            TerrestrialRadiation,
            ShortwaveRadiation,
            SunshineDuration,
            RelativeHumidity,
            Precipitation,
            ApparentTemperature,
            FreezingLevelHeight,
        ]
    }

    fn default_field(self) -> &'static str {
        match self {
            QuarterlyQuantity::TerrestrialRadiation => "terrestrial_radiation",
            QuarterlyQuantity::ShortwaveRadiation => "shortwave_radiation",
            QuarterlyQuantity::SunshineDuration => "sunshine_duration",
            QuarterlyQuantity::RelativeHumidity => "relative_humidity_2m",
            QuarterlyQuantity::Precipitation => "precipitation",
            QuarterlyQuantity::ApparentTemperature => "apparent_temperature",
            QuarterlyQuantity::FreezingLevelHeight => "freezing_level_height",
        }
    }

    fn is_backward_looking(self) -> bool {
        matches!(
            self,
            QuarterlyQuantity::SunshineDuration
                | QuarterlyQuantity::Precipitation
                | QuarterlyQuantity::TerrestrialRadiation
                | QuarterlyQuantity::ShortwaveRadiation
        )
    }
}

/// Provider field names for every quantity of one series
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyMap<Q: Quantity> {
    overrides: BTreeMap<Q, String>,
}

impl<Q: Quantity> Default for PropertyMap<Q> {
    fn default() -> Self {
        Self {
            overrides: BTreeMap::new(),
        }
    }
}

impl<Q: Quantity> PropertyMap<Q> {
    /// Builds a map from configured overrides; unlisted quantities keep their default field
    pub fn with_overrides(overrides: BTreeMap<Q, String>) -> Self {
        Self { overrides }
    }

    /// Provider field name for `quantity`
    pub fn field(&self, quantity: Q) -> &str {
        self.overrides
            .get(&quantity)
            .map(String::as_str)
            .unwrap_or_else(|| quantity.default_field())
    }

    /// All `(quantity, provider field)` pairs
    pub fn iter(&self) -> impl Iterator<Item = (Q, &str)> + '_ {
        Q::all().iter().map(move |&q| (q, self.field(q)))
    }

    /// Distinct provider field names, in quantity order
    pub fn fields(&self) -> Vec<&str> {
        let mut fields: Vec<&str> = Vec::new();
        for (_, field) in self.iter() {
            if !fields.contains(&field) {
                fields.push(field);
            }
        }
        fields
    }
}
