//! Normalization of a raw forecast into the 24-slot clock model
//!
//! The payload carries two granularities: hourly samples (including cloud
//! cover per pressure level) and 15-minute samples. Each hourly sample inside
//! the display window becomes an [`HourlyRecord`] owning the four quarters that
//! start with it. Pressure-level cloud cover is re-bucketed into fixed-height
//! altitude bands, and the solar and radiation quantities are derived per
//! quarter.
//!
//! The input payload is only borrowed. Series that need their samples shifted
//! are rotated on a private copy, so normalizing the same payload twice gives
//! the same model.

use chrono::{DateTime, NaiveDateTime, TimeDelta, Timelike, Utc};
use std::borrow::Cow;
use std::collections::BTreeMap;
use tracing::debug;

use super::quantity::{HourlyQuantity, PropertyMap, QuarterlyQuantity, Quantity};
use super::raw::{parse_local_time, RawForecastPayload, SchemaError, Series};
use super::{CloudBand, HourlyRecord, NormalizedWeatherModel, QuarterlyRecord, QUARTERS_PER_HOUR};
use crate::config::{cloud_cover_field, geopotential_height_field, Config};
use crate::interp::gradient;
use crate::solar::{ground_sun_exposure_index, solar_elevation, sun_intensity};

/// Hourly samples older than this many hours before now are not shown
const WINDOW_BEFORE_HOURS: i64 = 1;
/// The first hourly sample more than this many hours after now ends the window
const WINDOW_AFTER_HOURS: i64 = 23;

/// Normalizes `raw` for display at the current time
pub fn normalize(
    raw: &RawForecastPayload,
    config: &Config,
) -> Result<NormalizedWeatherModel, SchemaError> {
    normalize_at(raw, config, Utc::now())
}

/// Checks that every field the normalizer reads is present in `raw`
pub fn validate(raw: &RawForecastPayload, config: &Config) -> Result<(), SchemaError> {
    Columns::extract(&raw.hourly, &config.hourly_property_map)?;
    Columns::extract(&raw.minutely_15, &config.quarterly_property_map)?;
    CloudLevel::extract(&raw.hourly, config)?;
    Ok(())
}

/// Normalizes `raw` for display at `now`
///
/// Keeps hourly samples from one hour before `now` up to 23 hours after it,
/// indexed by local hour-of-day.
///
/// # Errors
/// [`SchemaError::MissingField`] if a configured field is absent from its
/// series, [`SchemaError::InvalidTime`] if a timestamp can't be parsed.
pub fn normalize_at(
    raw: &RawForecastPayload,
    config: &Config,
    now: DateTime<Utc>,
) -> Result<NormalizedWeatherModel, SchemaError> {
    let hourly = Columns::extract(&raw.hourly, &config.hourly_property_map)?;
    let quarterly = Columns::extract(&raw.minutely_15, &config.quarterly_property_map)?;
    let levels = CloudLevel::extract(&raw.hourly, config)?;

    let window_start = now - TimeDelta::hours(WINDOW_BEFORE_HOURS);
    let window_end = now + TimeDelta::hours(WINDOW_AFTER_HOURS);
    let mut model = NormalizedWeatherModel::empty(raw.utc_offset_seconds);

    for (i, stamp) in raw.hourly.time.iter().enumerate() {
        let time = parse_local_time(stamp)?;
        let at = raw.to_utc(time);
        if at < window_start {
            continue;
        }
        if at > window_end {
            break;
        }

        let bands = bucket_clouds(&levels, i, config);
        let thickest = thickest_band(&bands, config);

        let [q0, q1, q2, q3] = [0u8, 1, 2, 3]
            .map(|n| build_quarter(raw, &quarterly, config, i, n, time));

        model.insert(HourlyRecord {
            hour_index: time.hour(),
            time,
            temperature: hourly.sample(HourlyQuantity::Temperature, i),
            apparent_temperature: hourly.sample(HourlyQuantity::ApparentTemperature, i),
            relative_humidity: hourly.sample(HourlyQuantity::RelativeHumidity, i),
            precipitation: hourly.sample(HourlyQuantity::Precipitation, i),
            precipitation_probability: hourly.sample(HourlyQuantity::PrecipitationProbability, i),
            cloud_cover: hourly.sample(HourlyQuantity::CloudCover, i),
            visibility: hourly.sample(HourlyQuantity::Visibility, i),
            wind_speed: hourly.sample(HourlyQuantity::WindSpeed, i),
            sunshine: hourly
                .sample(HourlyQuantity::SunshineDuration, i)
                .map(|seconds| seconds / 3600.0 * 100.0),
            cloud_cover_by_altitude: bands,
            thickest_band_altitude: thickest,
            quarters: [q0?, q1?, q2?, q3?],
        });
    }

    model.link_quarter_clouds();
    debug!(hours = model.len(), "normalized forecast");

    Ok(model)
}

/// Builds quarter `n` of hourly sample `hour`
fn build_quarter(
    raw: &RawForecastPayload,
    quarterly: &Columns<'_, QuarterlyQuantity>,
    config: &Config,
    hour: usize,
    n: u8,
    hour_start: NaiveDateTime,
) -> Result<QuarterlyRecord, SchemaError> {
    let index = hour * QUARTERS_PER_HOUR + n as usize;
    let time = match raw.minutely_15.time.get(index) {
        Some(stamp) => parse_local_time(stamp)?,
        None => hour_start + TimeDelta::minutes(15 * n as i64),
    };
    let mid_point = time + TimeDelta::seconds(450);

    let sample = |q: QuarterlyQuantity| quarterly.sample(q, index);
    let shortwave = sample(QuarterlyQuantity::ShortwaveRadiation);
    let terrestrial = sample(QuarterlyQuantity::TerrestrialRadiation);
    let sunshine_duration = sample(QuarterlyQuantity::SunshineDuration);
    let terrestrial_or_zero = terrestrial.unwrap_or(0.0);

    Ok(QuarterlyRecord {
        quarter_index: n,
        hour_index: hour_start.hour(),
        time,
        mid_point,
        apparent_temperature: sample(QuarterlyQuantity::ApparentTemperature),
        relative_humidity: sample(QuarterlyQuantity::RelativeHumidity),
        precipitation: sample(QuarterlyQuantity::Precipitation),
        shortwave_radiation: shortwave,
        terrestrial_radiation: terrestrial,
        sunshine_duration,
        freezing_level_height: sample(QuarterlyQuantity::FreezingLevelHeight),
        solar_elevation: solar_elevation(raw.to_utc(mid_point), config.latitude, config.longitude),
        ground_sun_exposure_index: ground_sun_exposure_index(
            shortwave.unwrap_or(0.0),
            terrestrial_or_zero,
        ),
        sun_intensity: sun_intensity(terrestrial_or_zero),
        is_day: terrestrial_or_zero > 0.0,
        sunshine: sunshine_duration.unwrap_or(0.0) / 3600.0 * 4.0 * 100.0,
        // set once every hour is known
        cloud_source_hour: hour_start.hour(),
    })
}

/// The configured columns of one series, shift-corrected where needed
struct Columns<'a, Q: Quantity> {
    columns: BTreeMap<Q, Cow<'a, [Option<f64>]>>,
}

impl<'a, Q: Quantity> Columns<'a, Q> {
    fn extract(series: &'a Series, map: &PropertyMap<Q>) -> Result<Self, SchemaError> {
        let mut columns = BTreeMap::new();
        for (quantity, field) in map.iter() {
            let samples = series.require(Q::SERIES, field)?;
            let column = if quantity.is_backward_looking() {
                Cow::Owned(rotate_left(samples))
            } else {
                Cow::Borrowed(samples)
            };
            columns.insert(quantity, column);
        }
        Ok(Self { columns })
    }

    fn sample(&self, quantity: Q, index: usize) -> Option<f64> {
        self.columns
            .get(&quantity)
            .and_then(|column| column.get(index).copied().flatten())
    }
}

/// Copies `samples` rotated left by one with wraparound
///
/// The provider reports these values for the interval ending at each
/// timestamp; after the rotation index `i` holds the interval starting at
/// `i`. The last slot takes the first sample, which is wrong but harmless at
/// the far end of the forecast.
fn rotate_left(samples: &[Option<f64>]) -> Vec<Option<f64>> {
    let mut rotated = samples.to_vec();
    if !rotated.is_empty() {
        rotated.rotate_left(1);
    }
    rotated
}

/// Cloud cover and geopotential height samples for one pressure level
struct CloudLevel<'a> {
    cover: &'a [Option<f64>],
    height: &'a [Option<f64>],
}

impl<'a> CloudLevel<'a> {
    fn extract(hourly: &'a Series, config: &Config) -> Result<Vec<Self>, SchemaError> {
        config
            .pressure_levels()
            .iter()
            .map(|&hpa| {
                Ok(Self {
                    cover: hourly.require(HourlyQuantity::SERIES, &cloud_cover_field(hpa))?,
                    height: hourly
                        .require(HourlyQuantity::SERIES, &geopotential_height_field(hpa))?,
                })
            })
            .collect()
    }

    /// `(altitude, cover)` at hourly sample `index`, unless either is null
    fn at(&self, index: usize) -> Option<(f64, f64)> {
        let altitude = self.height.get(index).copied().flatten()?;
        let cover = self.cover.get(index).copied().flatten()?;
        Some((altitude, cover))
    }
}

/// Re-buckets pressure-level cloud samples into the configured altitude bands
///
/// Geopotential height is above sea level rather than ground, which the band
/// resolution makes irrelevant.
fn bucket_clouds(levels: &[CloudLevel<'_>], index: usize, config: &Config) -> Vec<CloudBand> {
    let samples: Vec<(f64, f64)> = levels.iter().filter_map(|level| level.at(index)).collect();
    bands_from_samples(&samples, config)
}

/// Each band's cover is the maximum of the samples in `(altitude, altitude + resolution]`
pub(crate) fn bands_from_samples(samples: &[(f64, f64)], config: &Config) -> Vec<CloudBand> {
    config
        .band_altitudes()
        .iter()
        .map(|&start| {
            let end = start + config.cloud_resolution;
            let cover = samples
                .iter()
                .filter(|(altitude, _)| start < *altitude && *altitude <= end)
                .map(|(_, cover)| *cover)
                .fold(0.0, f64::max);
            CloudBand {
                altitude: start,
                cover,
            }
        })
        .collect()
}

/// Picks the band most likely to produce precipitation
///
/// Weight is `cover * (1 - n)^2` with `n` the band altitude normalized over
/// the configured range, so low clouds dominate high ones. Bands are scanned
/// bottom-up and only a strictly larger weight replaces the current pick,
/// so ties go to the lower band. `None` if no band has positive weight.
pub(crate) fn thickest_band(bands: &[CloudBand], config: &Config) -> Option<f64> {
    let stops = [(config.cloud_start_alt, 0.0), (config.cloud_end_alt, 1.0)];
    let mut thickest: Option<(f64, f64)> = None;

    for band in bands {
        let normalized = if config.cloud_end_alt > config.cloud_start_alt {
            gradient(band.altitude, &stops)
        } else {
            0.0
        };
        let weight = band.cover * (1.0 - normalized).powi(2);
        if weight > thickest.map_or(0.0, |(_, best)| best) {
            thickest = Some((band.altitude, weight));
        }
    }

    thickest.map(|(altitude, _)| altitude)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;

    fn config(resolution: f64) -> Config {
        Config::from_settings(Settings {
            cloud_resolution: resolution,
            ..Default::default()
        })
        .expect("valid settings")
    }

    #[test]
    fn test_rotate_left_wraps() {
        let samples = [Some(1.0), Some(2.0), None, Some(4.0)];
        assert_eq!(
            rotate_left(&samples),
            vec![Some(2.0), None, Some(4.0), Some(1.0)]
        );
        assert!(rotate_left(&[]).is_empty());
        // original untouched
        assert_eq!(samples[0], Some(1.0));
    }

    #[test]
    fn test_bands_take_max_cover_in_half_open_range() {
        let config = config(250.0);
        // band 140 covers (140, 390]
        let samples = [(390.0, 40.0), (200.0, 70.0), (140.0, 99.0), (391.0, 15.0)];
        let bands = bands_from_samples(&samples, &config);

        assert_eq!(bands.len(), config.band_altitudes().len());
        assert_eq!(bands[0], CloudBand { altitude: 140.0, cover: 70.0 });
        assert_eq!(bands[1], CloudBand { altitude: 390.0, cover: 15.0 });
        assert!(bands[2..].iter().all(|b| b.cover == 0.0));
    }

    #[test]
    fn test_sample_above_top_band_is_dropped() {
        let config = config(305.0);
        // top band starts at 2275 and ends at 2580
        let bands = bands_from_samples(&[(3000.0, 80.0)], &config);

        assert!(bands.iter().all(|b| b.cover == 0.0));
        assert_eq!(thickest_band(&bands, &config), None);
    }

    #[test]
    fn test_thickest_prefers_low_band_on_equal_weight() {
        let config = config(250.0);
        let bands = vec![
            CloudBand { altitude: 140.0, cover: 50.0 },
            CloudBand { altitude: 390.0, cover: 50.0 },
        ];
        assert_eq!(thickest_band(&bands, &config), Some(140.0));
    }

    #[test]
    fn test_thickest_weighs_altitude_squared() {
        let config = config(250.0);
        // n(140) = 0, n(1265) = 0.5 over [140, 2390]
        let bands = vec![
            CloudBand { altitude: 140.0, cover: 24.0 },
            CloudBand { altitude: 1265.0, cover: 100.0 },
        ];
        // 100 * 0.25 = 25 beats 24
        assert_eq!(thickest_band(&bands, &config), Some(1265.0));

        let bands = vec![
            CloudBand { altitude: 140.0, cover: 26.0 },
            CloudBand { altitude: 1265.0, cover: 100.0 },
        ];
        assert_eq!(thickest_band(&bands, &config), Some(140.0));
    }

    #[test]
    fn test_top_band_never_thickest() {
        let config = config(250.0);
        let bands = vec![CloudBand { altitude: config.cloud_end_alt, cover: 100.0 }];
        assert_eq!(thickest_band(&bands, &config), None);
    }

    #[test]
    fn test_clear_sky_has_no_thickest_band() {
        let config = config(250.0);
        let bands = bands_from_samples(&[], &config);
        assert_eq!(thickest_band(&bands, &config), None);
    }
}
