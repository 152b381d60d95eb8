//! Synthetic weather for running without the network
//!
//! Produces a full 24-hour model whose values sweep through their ranges over
//! the day with a little random jitter, so every part of the clock face has
//! something to show.

use chrono::{NaiveDate, NaiveTime, TimeDelta, Timelike};
use rand::Rng;
use std::f64::consts::TAU;

use super::normalize::{bands_from_samples, thickest_band};
use super::{HourlyRecord, NormalizedWeatherModel, QuarterlyRecord, HOURS_PER_DAY};
use crate::config::Config;
use crate::interp::lerp;
use crate::solar::{ground_sun_exposure_index, solar_elevation, sun_intensity};

/// Peak top-of-atmosphere radiation of the demo day (W/m²)
const PEAK_RADIATION: f64 = 850.0;

/// Generates a demo model for `date`
///
/// `utc_offset_seconds` places the demo day in local time; solar elevation is
/// computed for the configured location.
pub fn generate<R: Rng>(
    config: &Config,
    date: NaiveDate,
    utc_offset_seconds: i32,
    rng: &mut R,
) -> NormalizedWeatherModel {
    let mut model = NormalizedWeatherModel::empty(utc_offset_seconds);
    let mut jitter = |ratio: f64, spread: f64| -> f64 {
        (ratio + rng.gen_range(-spread..=spread)).clamp(0.0, 1.0)
    };

    for hour in 0..HOURS_PER_DAY as u32 {
        let ratio = hour as f64 / HOURS_PER_DAY as f64;
        let time = date.and_time(NaiveTime::MIN) + TimeDelta::hours(hour as i64);

        // a few cloud layers drifting through the day
        let samples: Vec<(f64, f64)> = config
            .band_altitudes()
            .iter()
            .enumerate()
            .map(|(i, &altitude)| {
                let phase = jitter(ratio, 0.1) * TAU * 4.0 + i as f64;
                (altitude + config.cloud_resolution / 2.0, (phase.sin().max(0.0) * 100.0).round())
            })
            .collect();
        let bands = bands_from_samples(&samples, config);
        let thickest = thickest_band(&bands, config);
        let cloud_cover = bands.iter().map(|b| b.cover).fold(0.0, f64::max);

        let quarters = [0u8, 1, 2, 3].map(|n| {
            let offset = n as f64 / 4.0 / HOURS_PER_DAY as f64;
            let start = time + TimeDelta::minutes(15 * n as i64);
            let mid_point = start + TimeDelta::seconds(450);
            let utc_mid = (mid_point - TimeDelta::seconds(utc_offset_seconds as i64)).and_utc();

            let terrestrial =
                lerp(((ratio + offset) * TAU - TAU / 4.0).sin().max(0.0), 0.0, PEAK_RADIATION);
            let shortwave = terrestrial * (1.0 - cloud_cover / 100.0 * 0.75);
            let precipitation = if cloud_cover > 80.0 {
                (((jitter(ratio + offset, 0.01) * 2.0) * TAU * 4.0).sin() * cloud_cover / 100.0
                    * 5.0
                    + 5.0)
                    .max(0.0)
            } else {
                0.0
            };
            let humidity_floor = if precipitation > 0.1 { 50.0 } else { 0.0 };
            let humidity = lerp(jitter(ratio + offset, 0.05), humidity_floor, 100.0);

            QuarterlyRecord {
                quarter_index: n,
                hour_index: hour,
                time: start,
                mid_point,
                apparent_temperature: Some(lerp(jitter(ratio + offset, 0.05), -20.0, 50.0)),
                relative_humidity: Some(humidity),
                precipitation: Some(precipitation),
                shortwave_radiation: Some(shortwave),
                terrestrial_radiation: Some(terrestrial),
                sunshine_duration: Some(if shortwave > 120.0 { 900.0 } else { 0.0 }),
                freezing_level_height: Some(lerp(ratio, 1500.0, 3000.0)),
                solar_elevation: solar_elevation(utc_mid, config.latitude, config.longitude),
                ground_sun_exposure_index: ground_sun_exposure_index(shortwave, terrestrial),
                sun_intensity: sun_intensity(terrestrial),
                is_day: terrestrial > 0.0,
                sunshine: if shortwave > 120.0 { 100.0 } else { 0.0 },
                cloud_source_hour: hour,
            }
        });

        let average = |f: fn(&QuarterlyRecord) -> Option<f64>| {
            quarters.iter().filter_map(f).sum::<f64>() / quarters.len() as f64
        };
        let sunshine = quarters.iter().map(|q| q.sunshine).sum::<f64>() / quarters.len() as f64;

        model.insert(HourlyRecord {
            hour_index: time.hour(),
            time,
            temperature: Some(lerp(jitter(ratio, 0.05), -20.0, 50.0)),
            apparent_temperature: Some(average(|q| q.apparent_temperature)),
            relative_humidity: Some(average(|q| q.relative_humidity)),
            precipitation: Some(average(|q| q.precipitation)),
            precipitation_probability: Some(lerp(
                (jitter(ratio + 0.01, 0.05) * 4.0) % 1.0,
                10.0,
                100.0,
            )),
            cloud_cover: Some(cloud_cover),
            visibility: Some(lerp(jitter(ratio, 0.05), 0.0, 10_000.0)),
            wind_speed: Some(lerp(jitter(ratio, 0.05), 0.0, 20.0)),
            sunshine: Some(sunshine),
            cloud_cover_by_altitude: bands,
            thickest_band_altitude: thickest,
            quarters,
        });
    }

    model.link_quarter_clouds();
    model
}
