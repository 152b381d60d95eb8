//! Configuration for fetching and normalizing the forecast
//!
//! [`Settings`] is the user-facing surface: every field has a default and can
//! be set from a TOML file or overridden on the command line. [`Config`] is
//! built once from it, computing the derived cloud parameters, and is passed
//! by reference everywhere after that.

use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::data::quantity::{HourlyQuantity, PropertyMap, QuarterlyQuantity};
use crate::pressure::meters_to_hpa;

/// Base URL for the Open-Meteo forecast API
pub const OPEN_METEO_BASE_URL: &str = "https://api.open-meteo.com/v1/forecast";

/// Errors that can occur while loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file couldn't be read
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Config file is not valid TOML for [`Settings`]
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    /// A value is out of range or inconsistent with another
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// User-facing settings, as read from a config file
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub latitude: f64,
    pub longitude: f64,
    /// Reuse a recently fetched forecast from disk
    pub cache_weather_data: bool,
    /// Skip the network and generate synthetic weather
    pub use_demo_weather: bool,
    /// Provider field overrides for hourly quantities
    pub hourly_property_map: BTreeMap<HourlyQuantity, String>,
    /// Provider field overrides for 15-minute quantities
    pub quarterly_property_map: BTreeMap<QuarterlyQuantity, String>,
    /// Step between requested pressure levels (hPa)
    pub cloud_resolution_hpa: u32,
    /// Highest (lowest-altitude) pressure level requested (hPa)
    pub cloud_max_hpa: u32,
    /// Lowest pressure level requested; derived from `cloud_end_alt` when unset
    pub cloud_min_hpa: Option<f64>,
    /// Height of one cloud band (m)
    pub cloud_resolution: f64,
    /// Altitude of the lowest band, usually ground level (m)
    pub cloud_start_alt: f64,
    /// Altitude of the highest band (m); snapped down to a whole number of bands
    pub cloud_end_alt: f64,
    /// How long a cached forecast stays usable
    pub cache_max_age_minutes: i64,
    pub forecast_url: String,
    /// Cache directory; the platform cache dir when unset
    pub cache_dir: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            latitude: 48.1702,
            longitude: 17.2127,
            cache_weather_data: true,
            use_demo_weather: false,
            hourly_property_map: BTreeMap::new(),
            quarterly_property_map: BTreeMap::new(),
            cloud_resolution_hpa: 25,
            cloud_max_hpa: 1000,
            cloud_min_hpa: None,
            cloud_resolution: 250.0,
            cloud_start_alt: 140.0,
            cloud_end_alt: 306.0 * 8.0,
            cache_max_age_minutes: 20,
            forecast_url: OPEN_METEO_BASE_URL.to_string(),
            cache_dir: None,
        }
    }
}

impl Settings {
    /// Reads settings from a TOML file; missing keys keep their defaults
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }
}

/// Validated configuration with derived cloud parameters
///
/// Only obtainable through [`Config::from_settings`], so the derived fields
/// always agree with the ones they are computed from.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub struct Config {
    pub latitude: f64,
    pub longitude: f64,
    pub cache_weather_data: bool,
    pub use_demo_weather: bool,
    pub hourly_property_map: PropertyMap<HourlyQuantity>,
    pub quarterly_property_map: PropertyMap<QuarterlyQuantity>,
    pub cloud_resolution_hpa: u32,
    pub cloud_max_hpa: u32,
    pub cloud_min_hpa: f64,
    pub cloud_resolution: f64,
    pub cloud_start_alt: f64,
    /// Start of the highest band, a whole number of bands above `cloud_start_alt`
    pub cloud_end_alt: f64,
    pub cache_max_age_minutes: i64,
    pub forecast_url: String,
    pub cache_dir: Option<PathBuf>,
    pressure_levels: Vec<u32>,
    band_altitudes: Vec<f64>,
}

impl Config {
    /// Validates `settings` and computes the derived fields
    pub fn from_settings(settings: Settings) -> Result<Self, ConfigError> {
        if !(-90.0..=90.0).contains(&settings.latitude) {
            return Err(ConfigError::Invalid(format!(
                "latitude {} out of range",
                settings.latitude
            )));
        }
        if !(-180.0..=180.0).contains(&settings.longitude) {
            return Err(ConfigError::Invalid(format!(
                "longitude {} out of range",
                settings.longitude
            )));
        }
        if settings.cloud_resolution_hpa == 0 {
            return Err(ConfigError::Invalid(
                "cloud_resolution_hpa must be positive".to_string(),
            ));
        }
        if settings.cloud_resolution.is_nan() || settings.cloud_resolution <= 0.0 {
            return Err(ConfigError::Invalid(
                "cloud_resolution must be positive".to_string(),
            ));
        }
        if settings.cloud_end_alt < settings.cloud_start_alt {
            return Err(ConfigError::Invalid(format!(
                "cloud_end_alt {} is below cloud_start_alt {}",
                settings.cloud_end_alt, settings.cloud_start_alt
            )));
        }
        if settings.cache_max_age_minutes < 0 {
            return Err(ConfigError::Invalid(
                "cache_max_age_minutes must not be negative".to_string(),
            ));
        }

        // The top band reaches one resolution above the configured end, and
        // the pressure levels have to cover it.
        let cloud_min_hpa = settings
            .cloud_min_hpa
            .unwrap_or_else(|| meters_to_hpa(settings.cloud_end_alt + settings.cloud_resolution));

        let span = settings.cloud_end_alt - settings.cloud_start_alt;
        let steps = (span / settings.cloud_resolution).floor() as usize;
        let cloud_end_alt = settings.cloud_start_alt + settings.cloud_resolution * steps as f64;
        let band_altitudes = (0..=steps)
            .map(|i| settings.cloud_start_alt + settings.cloud_resolution * i as f64)
            .collect();

        let mut pressure_levels = Vec::new();
        let mut p = settings.cloud_max_hpa;
        while p as f64 >= cloud_min_hpa {
            pressure_levels.push(p);
            match p.checked_sub(settings.cloud_resolution_hpa) {
                Some(next) => p = next,
                None => break,
            }
        }
        if pressure_levels.is_empty() {
            return Err(ConfigError::Invalid(format!(
                "no pressure levels between {} and {:.1} hPa",
                settings.cloud_max_hpa, cloud_min_hpa
            )));
        }

        Ok(Self {
            latitude: settings.latitude,
            longitude: settings.longitude,
            cache_weather_data: settings.cache_weather_data,
            use_demo_weather: settings.use_demo_weather,
            hourly_property_map: PropertyMap::with_overrides(settings.hourly_property_map),
            quarterly_property_map: PropertyMap::with_overrides(settings.quarterly_property_map),
            cloud_resolution_hpa: settings.cloud_resolution_hpa,
            cloud_max_hpa: settings.cloud_max_hpa,
            cloud_min_hpa,
            cloud_resolution: settings.cloud_resolution,
            cloud_start_alt: settings.cloud_start_alt,
            cloud_end_alt,
            cache_max_age_minutes: settings.cache_max_age_minutes,
            forecast_url: settings.forecast_url,
            cache_dir: settings.cache_dir,
            pressure_levels,
            band_altitudes,
        })
    }

    /// Requested pressure levels, highest pressure (lowest altitude) first
    pub fn pressure_levels(&self) -> &[u32] {
        &self.pressure_levels
    }

    /// Lower bound of every cloud band, lowest first
    pub fn band_altitudes(&self) -> &[f64] {
        &self.band_altitudes
    }
}

/// Provider field holding cloud cover at pressure level `hpa`
pub fn cloud_cover_field(hpa: u32) -> String {
    format!("cloud_cover_{}hPa", hpa)
}

/// Provider field holding geopotential height at pressure level `hpa`
pub fn geopotential_height_field(hpa: u32) -> String {
    format!("geopotential_height_{}hPa", hpa)
}
