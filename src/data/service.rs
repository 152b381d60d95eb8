//! Cache gate and retry wrapper around fetching and normalizing the forecast
//!
//! A cached payload is reused only while it is fresh and still normalizes
//! with the current configuration; anything else is a cache miss that falls
//! through to a live fetch. Normalization gets two attempts, the second one
//! bypassing the cache.
//!
//! Two clocks are involved. The `now` passed to the `_at` methods is the
//! display time and may be simulated; it only drives windowing. Fetch times
//! and freshness always use the wall clock.

use chrono::{DateTime, Utc};
use rand::thread_rng;
use thiserror::Error;
use tracing::{debug, info, warn};

use super::client::{ForecastRequest, ForecastTransport, WeatherError};
use super::demo;
use super::normalize::normalize_at;
use super::raw::{RawForecastPayload, SchemaError};
use super::NormalizedWeatherModel;
use crate::cache::CacheManager;
use crate::config::Config;

/// Cache key of the last fetched payload
pub const CACHE_KEY: &str = "raw_weather";

/// Attempts made by [`WeatherService::get_weather_data`] before giving up
pub const MAX_ATTEMPTS: u32 = 2;

/// Why a cached payload was not used
#[derive(Debug, Error)]
pub enum CacheMiss {
    /// No cache configured, or nothing stored yet
    #[error("no cached forecast")]
    Absent,

    /// Stored entry couldn't be read or parsed
    #[error("cached forecast unreadable: {0}")]
    Unreadable(#[source] std::io::Error),

    /// Stored entry has no fetch time
    #[error("cached forecast has no timestamp")]
    MissingTimestamp,

    /// Stored entry is older than the freshness window
    #[error("cached forecast is {age_minutes} minutes old")]
    Stale { age_minutes: i64 },

    /// Stored entry claims to be fetched after the current wall time
    #[error("cached forecast is dated {ahead_minutes} minutes in the future")]
    FutureTimestamp { ahead_minutes: i64 },

    /// Stored entry doesn't fit the current configuration
    #[error("cached forecast incompatible: {0}")]
    Incompatible(#[source] SchemaError),
}

/// Source of real time for cache bookkeeping
pub type WallClock = Box<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// Obtains normalized weather, from cache or network
pub struct WeatherService<T: ForecastTransport> {
    config: Config,
    transport: T,
    cache: Option<CacheManager>,
    wall_clock: WallClock,
}

impl<T: ForecastTransport> WeatherService<T> {
    /// Creates a service; without a cache manager every request goes to the network
    pub fn new(config: Config, transport: T, cache: Option<CacheManager>) -> Self {
        Self {
            config,
            transport,
            cache,
            wall_clock: Box::new(Utc::now),
        }
    }

    /// Replaces the system clock used for fetch times and freshness
    pub fn with_wall_clock(
        mut self,
        clock: impl Fn() -> DateTime<Utc> + Send + Sync + 'static,
    ) -> Self {
        self.wall_clock = Box::new(clock);
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Deletes the cached payload; `Ok(false)` if there was none
    pub fn reset_cache(&self) -> std::io::Result<bool> {
        match &self.cache {
            Some(cache) => cache.remove(CACHE_KEY),
            None => Ok(false),
        }
    }

    /// Returns the cached payload if it is fresh and normalizes for display time `now`
    pub fn cached_payload(&self, now: DateTime<Utc>) -> Result<RawForecastPayload, CacheMiss> {
        let cache = self.cache.as_ref().ok_or(CacheMiss::Absent)?;
        let raw: RawForecastPayload = cache
            .read(CACHE_KEY)
            .map_err(CacheMiss::Unreadable)?
            .ok_or(CacheMiss::Absent)?;

        let fetched = raw.timestamp.ok_or(CacheMiss::MissingTimestamp)?;
        let age = (self.wall_clock)() - fetched;
        if age < chrono::Duration::zero() {
            return Err(CacheMiss::FutureTimestamp {
                ahead_minutes: -age.num_minutes(),
            });
        }
        if age >= chrono::Duration::minutes(self.config.cache_max_age_minutes) {
            return Err(CacheMiss::Stale {
                age_minutes: age.num_minutes(),
            });
        }

        // A trial run is the only reliable compatibility check.
        normalize_at(&raw, &self.config, now).map_err(CacheMiss::Incompatible)?;

        Ok(raw)
    }

    /// Returns a raw payload, fetching one when the cache can't be used
    pub async fn get_raw_payload(
        &self,
        use_cache: bool,
    ) -> Result<RawForecastPayload, WeatherError> {
        self.get_raw_payload_at(use_cache, (self.wall_clock)()).await
    }

    /// [`get_raw_payload`](Self::get_raw_payload) with an explicit display time
    pub async fn get_raw_payload_at(
        &self,
        use_cache: bool,
        now: DateTime<Utc>,
    ) -> Result<RawForecastPayload, WeatherError> {
        if use_cache {
            match self.cached_payload(now) {
                Ok(raw) => {
                    debug!("using cached forecast");
                    return Ok(raw);
                }
                Err(miss) => info!(reason = %miss, "cache miss, fetching forecast"),
            }
        }

        let request = ForecastRequest::from_config(&self.config);
        let mut raw = self.transport.fetch(&request).await?;
        raw.timestamp = Some((self.wall_clock)());

        if let Some(cache) = &self.cache {
            if let Err(e) = cache.write(CACHE_KEY, &raw) {
                warn!(error = %e, "failed to cache forecast");
            }
        }

        Ok(raw)
    }

    /// Returns the normalized model for the current time
    pub async fn get_weather_data(&self) -> Result<NormalizedWeatherModel, WeatherError> {
        self.get_weather_data_at((self.wall_clock)()).await
    }

    /// Returns the normalized model for `now`
    ///
    /// # Errors
    /// [`WeatherError::ExhaustedRetries`] when both attempts fail; the data is
    /// then unavailable and should be shown as such.
    pub async fn get_weather_data_at(
        &self,
        now: DateTime<Utc>,
    ) -> Result<NormalizedWeatherModel, WeatherError> {
        if self.config.use_demo_weather {
            let offset = chrono::Local::now().offset().local_minus_utc();
            let local = now.naive_utc() + chrono::Duration::seconds(offset as i64);
            let model = {
                let mut rng = thread_rng();
                demo::generate(&self.config, local.date(), offset, &mut rng)
            };
            return Ok(model);
        }

        let mut use_cache = self.config.cache_weather_data;
        let mut attempt = 1;
        loop {
            match self.attempt(use_cache, now).await {
                Ok(model) => return Ok(model),
                Err(e) if attempt < MAX_ATTEMPTS => {
                    // might have been a bad cache
                    warn!(
                        attempt,
                        error = %e,
                        "weather data attempt failed, retrying without cache"
                    );
                    use_cache = false;
                    attempt += 1;
                }
                Err(e) => {
                    return Err(WeatherError::ExhaustedRetries {
                        attempts: attempt,
                        last: Box::new(e),
                    })
                }
            }
        }
    }

    async fn attempt(
        &self,
        use_cache: bool,
        now: DateTime<Utc>,
    ) -> Result<NormalizedWeatherModel, WeatherError> {
        let raw = self.get_raw_payload_at(use_cache, now).await?;
        Ok(normalize_at(&raw, &self.config, now)?)
    }
}
