//! Integration tests for forecast normalization
//!
//! Builds Open-Meteo shaped payloads in memory and checks the normalized
//! model: slot layout, windowing, shift correction, schema errors, calendar
//! irregularities and cloud band selection.

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeDelta, TimeZone, Utc};

use weatherclock::config::{cloud_cover_field, geopotential_height_field, Config, Settings};
use weatherclock::data::{
    normalize_at, validate, HourlyQuantity, QuarterlyQuantity, Quantity, RawForecastPayload,
    SchemaError, Series,
};
use weatherclock::solar::solar_elevation;
use weatherclock::summary;

fn default_config() -> Config {
    Config::from_settings(Settings::default()).expect("defaults are valid")
}

fn local(day: u32, hour: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2025, 3, day)
        .unwrap()
        .and_hms_opt(hour, 0, 0)
        .unwrap()
}

fn stamp(time: NaiveDateTime) -> String {
    time.format("%Y-%m-%dT%H:%M").to_string()
}

/// Payload with one hourly sample per entry of `times`, four quarters each
///
/// Every mapped quantity holds its sample index, so shifts are visible. Cloud
/// levels are clear with heights from the barometric formula.
fn payload(config: &Config, times: &[NaiveDateTime]) -> RawForecastPayload {
    let n = times.len();
    let index_column = |len: usize| (0..len).map(|i| Some(i as f64)).collect::<Vec<_>>();

    let mut hourly = Series {
        time: times.iter().copied().map(stamp).collect(),
        ..Default::default()
    };
    for q in HourlyQuantity::all() {
        hourly
            .fields
            .insert(config.hourly_property_map.field(*q).to_string(), index_column(n));
    }
    for &hpa in config.pressure_levels() {
        let height = weatherclock::pressure::hpa_to_meters(hpa as f64);
        hourly.fields.insert(cloud_cover_field(hpa), vec![Some(0.0); n]);
        hourly
            .fields
            .insert(geopotential_height_field(hpa), vec![Some(height); n]);
    }

    let mut minutely_15 = Series {
        time: times
            .iter()
            .flat_map(|t| (0..4).map(move |q| stamp(*t + TimeDelta::minutes(15 * q))))
            .collect(),
        ..Default::default()
    };
    for q in QuarterlyQuantity::all() {
        minutely_15
            .fields
            .insert(config.quarterly_property_map.field(*q).to_string(), index_column(n * 4));
    }

    RawForecastPayload {
        utc_offset_seconds: 0,
        hourly,
        minutely_15,
        timestamp: None,
    }
}

fn two_days() -> Vec<NaiveDateTime> {
    (0..48).map(|h| local(21, 0) + TimeDelta::hours(h)).collect()
}

fn morning() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 21, 10, 30, 0).unwrap()
}

#[test]
fn test_model_has_at_most_24_hours_of_4_quarters() {
    let config = default_config();
    let model = normalize_at(&payload(&config, &two_days()), &config, morning()).unwrap();

    assert!(model.len() <= 24);
    assert_eq!(model.slots().len(), 24);
    for hour in model.iter() {
        assert_eq!(hour.quarters.len(), 4);
        for (position, quarter) in hour.quarters.iter().enumerate() {
            assert_eq!(quarter.quarter_index as usize, position);
            assert_eq!(quarter.hour_index, hour.hour_index);
        }
    }
}

#[test]
fn test_window_runs_from_one_hour_before_now() {
    let config = default_config();
    let model = normalize_at(&payload(&config, &two_days()), &config, morning()).unwrap();

    // 09:30 to 09:30 next day: 10:00 today through 09:00 tomorrow
    assert_eq!(model.len(), 24);
    assert_eq!(model.hour(10).unwrap().time, local(21, 10));
    assert_eq!(model.hour(23).unwrap().time, local(21, 23));
    assert_eq!(model.hour(0).unwrap().time, local(22, 0));
    assert_eq!(model.hour(9).unwrap().time, local(22, 9));
}

#[test]
fn test_window_respects_utc_offset() {
    let config = default_config();
    let mut raw = payload(&config, &two_days());
    raw.utc_offset_seconds = 3600;
    let model = normalize_at(&raw, &config, morning()).unwrap();

    // local 11:30 now, so local 11:00 is the oldest hour kept
    assert_eq!(model.hour(11).unwrap().time, local(21, 11));
    assert_eq!(model.hour(10).unwrap().time, local(22, 10));
    assert_eq!(model.local_time(morning()), local(21, 11) + TimeDelta::minutes(30));
}

#[test]
fn test_interval_quantities_are_shifted_forward() {
    let config = default_config();
    let model = normalize_at(&payload(&config, &two_days()), &config, morning()).unwrap();
    let hour = model.hour(10).unwrap();

    // instantaneous values stay at their index, interval values take the next one
    assert_eq!(hour.temperature, Some(10.0));
    assert_eq!(hour.precipitation, Some(11.0));
    assert_eq!(hour.precipitation_probability, Some(11.0));
    for (n, quarter) in hour.quarters.iter().enumerate() {
        let index = (40 + n) as f64;
        assert_eq!(quarter.relative_humidity, Some(index));
        assert_eq!(quarter.shortwave_radiation, Some(index + 1.0));
        assert_eq!(quarter.terrestrial_radiation, Some(index + 1.0));
        assert_eq!(quarter.precipitation, Some(index + 1.0));
        assert_eq!(quarter.time, local(21, 10) + TimeDelta::minutes(15 * n as i64));
        assert_eq!(quarter.mid_point, quarter.time + TimeDelta::seconds(450));
    }
}

#[test]
fn test_normalize_is_idempotent_and_leaves_input_alone() {
    let config = default_config();
    let raw = payload(&config, &two_days());
    let before = raw.clone();

    let first = normalize_at(&raw, &config, morning()).unwrap();
    let second = normalize_at(&raw, &config, morning()).unwrap();

    assert_eq!(first, second);
    assert_eq!(raw, before);
}

#[test]
fn test_missing_quantity_is_schema_error() {
    let config = default_config();
    let mut raw = payload(&config, &two_days());
    raw.minutely_15.fields.remove("shortwave_radiation");

    let err = normalize_at(&raw, &config, morning()).unwrap_err();
    assert_eq!(
        err,
        SchemaError::MissingField {
            series: "minutely_15",
            field: "shortwave_radiation".to_string(),
        }
    );
    assert_eq!(validate(&raw, &config), Err(err));
}

#[test]
fn test_missing_pressure_level_is_schema_error() {
    let config = default_config();
    let mut raw = payload(&config, &two_days());
    raw.hourly.fields.remove("geopotential_height_900hPa");

    assert!(matches!(
        normalize_at(&raw, &config, morning()),
        Err(SchemaError::MissingField { series: "hourly", ref field })
            if field == "geopotential_height_900hPa"
    ));
}

#[test]
fn test_renamed_field_through_property_map() {
    let settings: Settings = Settings::from_toml(
        r#"
        [hourly_property_map]
        temperature = "temperature_80m"
        "#,
    )
    .unwrap();
    let config = Config::from_settings(settings).unwrap();
    let mut raw = payload(&default_config(), &two_days());

    assert!(normalize_at(&raw, &config, morning()).is_err());

    let column = raw.hourly.fields.remove("temperature_2m").unwrap();
    raw.hourly.fields.insert("temperature_80m".to_string(), column);
    let model = normalize_at(&raw, &config, morning()).unwrap();
    assert_eq!(model.hour(10).unwrap().temperature, Some(10.0));
}

#[test]
fn test_bad_timestamp_is_schema_error() {
    let config = default_config();
    let mut raw = payload(&config, &two_days());
    raw.hourly.time[12] = "yesterday".to_string();

    assert_eq!(
        normalize_at(&raw, &config, morning()),
        Err(SchemaError::InvalidTime("yesterday".to_string()))
    );
}

#[test]
fn test_skipped_hour_leaves_a_hole() {
    let config = default_config();
    // spring forward: local 02:00 never happens
    let times: Vec<_> = (0..24).filter(|&h| h != 2).map(|h| local(30, h)).collect();
    let raw = payload(&config, &times);
    let now = Utc.with_ymd_and_hms(2025, 3, 30, 0, 30, 0).unwrap();

    let model = normalize_at(&raw, &config, now).unwrap();

    assert_eq!(model.len(), 23);
    assert!(model.hour(2).is_none());
    assert_eq!(model.iter().count(), 23);
    // late quarters of 01:00 borrow clouds from 03:00
    let one = model.hour(1).unwrap();
    assert_eq!(one.quarters[1].cloud_source_hour, 1);
    assert_eq!(one.quarters[2].cloud_source_hour, 3);
    assert_eq!(model.cloud_bands(&one.quarters[3]).len(), config.band_altitudes().len());

    let text = summary::render(&model, local(30, 0));
    assert_eq!(text.lines().nth(2), Some("  02:00 --"));
}

#[test]
fn test_repeated_hour_keeps_last_sample() {
    let config = default_config();
    // fall back: local 02:00 happens twice
    let mut times: Vec<_> = (0..24).map(|h| local(30, h)).collect();
    times.insert(3, local(30, 2));
    let raw = payload(&config, &times);
    let now = Utc.with_ymd_and_hms(2025, 3, 30, 0, 30, 0).unwrap();

    let model = normalize_at(&raw, &config, now).unwrap();

    assert_eq!(model.len(), 24);
    assert_eq!(model.hour(2).unwrap().temperature, Some(3.0));
}

/// Clear sky except the given `(hPa, height, cover)` samples
fn cloudy(config: &Config, samples: &[(u32, f64, f64)]) -> RawForecastPayload {
    let mut raw = payload(config, &two_days());
    for &hpa in config.pressure_levels() {
        raw.hourly.fields.insert(cloud_cover_field(hpa), vec![None; 48]);
    }
    for &(hpa, height, cover) in samples {
        raw.hourly.fields.insert(cloud_cover_field(hpa), vec![Some(cover); 48]);
        raw.hourly
            .fields
            .insert(geopotential_height_field(hpa), vec![Some(height); 48]);
    }
    raw
}

fn coarse_config() -> Config {
    Config::from_settings(Settings {
        cloud_resolution: 305.0,
        cloud_min_hpa: Some(700.0),
        ..Default::default()
    })
    .unwrap()
}

#[test]
fn test_cloud_above_top_band_is_not_shown() {
    let config = coarse_config();
    assert!(config.pressure_levels().contains(&700));

    let raw = cloudy(&config, &[(700, 3000.0, 80.0)]);
    let model = normalize_at(&raw, &config, morning()).unwrap();
    let hour = model.hour(10).unwrap();

    // the highest band ends at 2580 m
    assert!(hour.cloud_cover_by_altitude.iter().all(|b| b.cover == 0.0));
    assert_eq!(hour.thickest_band_altitude, None);
}

#[test]
fn test_thickest_band_selection() {
    let config = coarse_config();

    // 80% at 1500 m lands in band 1360; weight 80 * (1 - 0.571)^2 ~ 14.7
    let raw = cloudy(&config, &[(850, 500.0, 15.0), (700, 1500.0, 80.0)]);
    let model = normalize_at(&raw, &config, morning()).unwrap();
    let hour = model.hour(10).unwrap();
    let band = |altitude: f64| {
        hour.cloud_cover_by_altitude
            .iter()
            .find(|b| b.altitude == altitude)
            .unwrap()
            .cover
    };
    assert_eq!(band(445.0), 15.0);
    assert_eq!(band(1360.0), 80.0);
    assert_eq!(hour.thickest_band_altitude, Some(1360.0));

    // 30% at 500 m weighs 30 * (1 - 0.143)^2 ~ 22.0 and wins
    let raw = cloudy(&config, &[(850, 500.0, 30.0), (700, 1500.0, 80.0)]);
    let model = normalize_at(&raw, &config, morning()).unwrap();
    assert_eq!(model.hour(10).unwrap().thickest_band_altitude, Some(445.0));
}

#[test]
fn test_quarters_resolve_clouds_from_next_hour() {
    let config = default_config();
    let mut raw = payload(&config, &two_days());
    // 95% low cloud only at 11:00 today
    let mut cover = vec![Some(0.0); 48];
    cover[11] = Some(95.0);
    raw.hourly.fields.insert(cloud_cover_field(1000), cover);
    raw.hourly
        .fields
        .insert(geopotential_height_field(1000), vec![Some(200.0); 48]);

    let model = normalize_at(&raw, &config, morning()).unwrap();
    let ten = model.hour(10).unwrap();

    assert_eq!(model.thickest_band_altitude(&ten.quarters[0]), None);
    assert_eq!(model.thickest_band_altitude(&ten.quarters[2]), Some(140.0));
    assert_eq!(model.cloud_bands(&ten.quarters[3])[0].cover, 95.0);
}

#[test]
fn test_night_quarters_have_zero_exposure() {
    let config = default_config();
    let mut raw = payload(&config, &two_days());
    raw.minutely_15
        .fields
        .insert("terrestrial_radiation".to_string(), vec![Some(0.0); 192]);
    raw.minutely_15
        .fields
        .insert("shortwave_radiation".to_string(), vec![Some(0.0); 192]);

    let model = normalize_at(&raw, &config, morning()).unwrap();
    for quarter in model.iter().flat_map(|h| h.quarters.iter()) {
        assert!(!quarter.is_day);
        assert_eq!(quarter.ground_sun_exposure_index, 0.0);
        assert_eq!(quarter.sun_intensity, 0.0);
    }
}

#[test]
fn test_daytime_quarter_derived_values() {
    let config = default_config();
    let mut raw = payload(&config, &two_days());
    // interval values are read one sample ahead, so 10:00 quarter 0 takes index 41
    for field in ["sunshine_duration", "shortwave_radiation", "terrestrial_radiation"] {
        let column = raw.minutely_15.fields.get_mut(field).unwrap();
        column[41] = Some(if field == "sunshine_duration" { 900.0 } else { 500.0 });
    }
    raw.hourly.fields.get_mut("sunshine_duration").unwrap()[10] = Some(1800.0);

    let model = normalize_at(&raw, &config, morning()).unwrap();
    let hour = model.hour(10).unwrap();
    let quarter = &hour.quarters[0];

    assert_eq!(hour.sunshine, Some(50.0));
    assert_eq!(quarter.sunshine_duration, Some(900.0));
    assert_eq!(quarter.sunshine, 100.0);
    assert!(quarter.is_day);
    // 500 / 500 * 685 / 925 * 100
    assert!((quarter.ground_sun_exposure_index - 74.054).abs() < 0.01);
    assert_eq!(quarter.sun_intensity, 100.0);

    let at_mid_point = solar_elevation(
        raw.to_utc(quarter.mid_point),
        config.latitude,
        config.longitude,
    );
    assert_eq!(quarter.solar_elevation, at_mid_point);
    let at_start = solar_elevation(raw.to_utc(quarter.time), config.latitude, config.longitude);
    assert_ne!(quarter.solar_elevation, at_start);
    assert!(quarter.solar_elevation > 0.0);
}

#[test]
fn test_empty_payload_gives_empty_model() {
    let config = default_config();
    let raw = payload(&config, &[]);

    let model = normalize_at(&raw, &config, morning()).unwrap();
    assert!(model.is_empty());
    assert_eq!(summary::render(&model, local(21, 10)).lines().count(), 24);
}
