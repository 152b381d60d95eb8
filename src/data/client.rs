//! Open-Meteo forecast client
//!
//! This module builds the forecast request from the configuration and fetches
//! the raw payload. Fetching goes through the [`ForecastTransport`] trait so
//! the cache gate can be exercised without a network.

use async_trait::async_trait;
use reqwest::Client;
use thiserror::Error;
use tracing::{debug, instrument};

use super::raw::{RawForecastPayload, SchemaError};
use crate::config::{cloud_cover_field, geopotential_height_field, Config};

/// Number of forecast days requested; the display window needs today and tomorrow
const FORECAST_DAYS: u32 = 2;

/// Errors that can occur when obtaining weather data
#[derive(Debug, Error)]
pub enum WeatherError {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    /// Failed to parse JSON response
    #[error("Failed to parse JSON response: {0}")]
    ParseError(#[from] serde_json::Error),

    /// Payload doesn't contain what the normalizer needs
    #[error("Unusable forecast payload: {0}")]
    Schema(#[from] SchemaError),

    /// Every attempt failed; the data is unavailable
    #[error("Exhausted retries after {attempts} attempts: {last}")]
    ExhaustedRetries {
        attempts: u32,
        #[source]
        last: Box<WeatherError>,
    },
}

/// Query for the forecast endpoint
#[derive(Debug, Clone, PartialEq)]
pub struct ForecastRequest {
    /// Endpoint URL without query string
    pub url: String,
    /// Query parameters in request order
    pub params: Vec<(&'static str, String)>,
}

impl ForecastRequest {
    /// Builds the request for every field `config` makes the normalizer read
    ///
    /// The hourly list holds the mapped hourly quantities followed by cloud
    /// cover and geopotential height for each pressure level. The 15-minute
    /// series carries no cloud data.
    pub fn from_config(config: &Config) -> Self {
        let mut hourly: Vec<String> = config
            .hourly_property_map
            .fields()
            .into_iter()
            .map(str::to_string)
            .collect();
        for &hpa in config.pressure_levels() {
            hourly.push(cloud_cover_field(hpa));
            hourly.push(geopotential_height_field(hpa));
        }
        let minutely_15 = config.quarterly_property_map.fields().join(",");

        Self {
            url: config.forecast_url.clone(),
            params: vec![
                ("latitude", config.latitude.to_string()),
                ("longitude", config.longitude.to_string()),
                ("hourly", hourly.join(",")),
                ("minutely_15", minutely_15),
                ("timezone", "auto".to_string()),
                ("forecast_days", FORECAST_DAYS.to_string()),
            ],
        }
    }

    /// Value of query parameter `name`
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(key, _)| *key == name)
            .map(|(_, value)| value.as_str())
    }
}

/// Something that can fetch a raw forecast
#[async_trait]
pub trait ForecastTransport: Send + Sync {
    /// Fetches and parses the forecast described by `request`
    async fn fetch(&self, request: &ForecastRequest) -> Result<RawForecastPayload, WeatherError>;
}

/// Client for fetching forecasts from the Open-Meteo API
#[derive(Debug, Clone)]
pub struct OpenMeteoClient {
    client: Client,
}

impl Default for OpenMeteoClient {
    fn default() -> Self {
        Self::new()
    }
}

impl OpenMeteoClient {
    /// Create a new OpenMeteoClient with default settings
    pub fn new() -> Self {
        Self {
            client: Client::new(),
        }
    }

    /// Create a new OpenMeteoClient with a custom HTTP client
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ForecastTransport for OpenMeteoClient {
    #[instrument(skip(self, request), fields(url = %request.url))]
    async fn fetch(&self, request: &ForecastRequest) -> Result<RawForecastPayload, WeatherError> {
        let response = self
            .client
            .get(&request.url)
            .query(&request.params)
            .send()
            .await?
            .error_for_status()?;
        let text = response.text().await?;
        debug!(bytes = text.len(), "forecast response received");

        let payload: RawForecastPayload = serde_json::from_str(&text)?;
        Ok(payload)
    }
}
