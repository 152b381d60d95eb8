//! Plain-text rendering of the normalized model
//!
//! Stands in for the clock face: one line per hour slot, with the slot
//! containing the current time marked.

use chrono::{NaiveDateTime, Timelike};

use crate::data::{HourlyRecord, NormalizedWeatherModel, QuarterlyRecord};

/// Placeholder for a missing value or an empty slot
const MISSING: &str = "--";

/// Renders all 24 slots, marking the one containing local time `now`
pub fn render(model: &NormalizedWeatherModel, now: NaiveDateTime) -> String {
    let mut out = String::new();
    for (hour, slot) in model.slots().iter().enumerate() {
        let active = hour as u32 == now.hour();
        let line = match slot {
            Some(record) => hour_line(model, record, active),
            None => format!("{} {:02}:00 {}", marker(active), hour, MISSING),
        };
        out.push_str(&line);
        out.push('\n');
    }
    out
}

/// Renders the active hour and quarter at local time `now`
pub fn active_line(model: &NormalizedWeatherModel, now: NaiveDateTime) -> String {
    let time = now.format("%Y-%m-%d %H:%M");
    match (model.active_hour(now), model.active_quarter(now)) {
        (Some(hour), Some(quarter)) => {
            format!("{time}  {}", quarter_summary(model, hour, quarter))
        }
        _ => format!("{time}  {MISSING}"),
    }
}

/// Builds a single line for an hour slot
pub fn hour_line(model: &NormalizedWeatherModel, record: &HourlyRecord, active: bool) -> String {
    let temp = value(record.temperature, 0, "\u{00B0}C");
    let rain = format!(
        "rain {} {}",
        value(record.precipitation_probability, 0, "%"),
        value(record.precipitation, 1, "mm")
    );
    let cloud = format!("cloud {}", value(record.cloud_cover, 0, "%"));
    let thickest = format!("thick {}", value(record.thickest_band_altitude, 0, "m"));
    let sun = format!("sun {}", value(record.sunshine, 0, "%"));
    let elevation = format!(
        "elev {}",
        value(Some(record.quarters[0].solar_elevation), 0, "\u{00B0}")
    );
    let bands = cloud_bar(model, &record.quarters[0]);

    format!(
        "{} {:02}:00 {:<6} {:<16} {:<10} {:<12} {:<9} {:<10} {}",
        marker(active),
        record.hour_index,
        temp,
        rain,
        cloud,
        thickest,
        sun,
        elevation,
        bands
    )
}

fn quarter_summary(
    model: &NormalizedWeatherModel,
    hour: &HourlyRecord,
    quarter: &QuarterlyRecord,
) -> String {
    format!(
        "{}  feels {}  gsei {:.0}  sun {:.0}%  elev {:.1}\u{00B0}  {}  clouds {}",
        value(hour.temperature, 1, "\u{00B0}C"),
        value(quarter.apparent_temperature, 1, "\u{00B0}C"),
        quarter.ground_sun_exposure_index,
        quarter.sunshine,
        quarter.solar_elevation,
        if quarter.is_day { "day" } else { "night" },
        cloud_bar(model, quarter)
    )
}

/// One character per altitude band, lowest band first
fn cloud_bar(model: &NormalizedWeatherModel, quarter: &QuarterlyRecord) -> String {
    model
        .cloud_bands(quarter)
        .iter()
        .map(|band| match band.cover {
            c if c >= 75.0 => '\u{2588}', // █
            c if c >= 50.0 => '\u{2593}', // ▓
            c if c >= 25.0 => '\u{2592}', // ▒
            c if c > 0.0 => '\u{2591}',   // ░
            _ => '.',
        })
        .collect()
}

fn marker(active: bool) -> char {
    if active {
        '>'
    } else {
        ' '
    }
}

fn value(v: Option<f64>, precision: usize, unit: &str) -> String {
    match v {
        Some(v) => format!("{v:.precision$}{unit}"),
        None => MISSING.to_string(),
    }
}
