//! Solar position and sun exposure estimates
//!
//! Approximate formulas good enough for a visualization: solar elevation from
//! day-of-year, equation of time and hour angle, and a ground sun exposure
//! index derived from the ratio of surface to top-of-atmosphere radiation.

use chrono::{DateTime, Datelike, Timelike, Utc};

/// Ratio of the highest observed shortwave to terrestrial radiation at the
/// reference site. Varies with season in practice.
const SITE_CONSTANT: f64 = 685.0 / 925.0;

/// Terrestrial radiation (W/m²) treated as full sun intensity
const FULL_SUN_RADIATION: f64 = 400.0;

/// Degree-based trigonometry, mirroring how the formulas are usually written down
trait DegreeTrig {
    fn sind(self) -> f64;
    fn cosd(self) -> f64;
}

impl DegreeTrig for f64 {
    fn sind(self) -> f64 {
        self.to_radians().sin()
    }

    fn cosd(self) -> f64 {
        self.to_radians().cos()
    }
}

/// Calculates the sun elevation in degrees above the horizon
///
/// # Arguments
/// * `time` - the instant, in UTC
/// * `latitude` - latitude in decimal degrees
/// * `longitude` - longitude in decimal degrees, east positive
///
/// Negative values mean the sun is below the horizon.
pub fn solar_elevation(time: DateTime<Utc>, latitude: f64, longitude: f64) -> f64 {
    let day_of_year = time.ordinal() as f64;
    let hour_utc =
        time.hour() as f64 + time.minute() as f64 / 60.0 + time.second() as f64 / 3600.0;

    // equation of time, minutes
    let b = 360.0 / 365.0 * (day_of_year - 81.0);
    let eot = 9.87 * (2.0 * b).sind() - 7.53 * b.cosd() - 1.5 * b.sind();

    let local_solar_time = hour_utc + (4.0 * longitude) / 60.0 + eot / 60.0;
    let declination = 23.45 * b.sind();
    let hour_angle = 15.0 * (local_solar_time - 12.0);

    let sin_elevation = latitude.sind() * declination.sind()
        + latitude.cosd() * declination.cosd() * hour_angle.cosd();

    sin_elevation.clamp(-1.0, 1.0).asin().to_degrees()
}

/// Ground sun exposure index (0–100): how much of the top-of-atmosphere
/// radiation actually reaches the ground
///
/// Returns 0 at night or when the terrestrial radiation is not positive.
pub fn ground_sun_exposure_index(shortwave_radiation: f64, terrestrial_radiation: f64) -> f64 {
    if terrestrial_radiation <= 0.0 {
        return 0.0;
    }

    let gsei = shortwave_radiation / terrestrial_radiation * SITE_CONSTANT;
    (gsei * 100.0).clamp(0.0, 100.0)
}

/// Top-of-atmosphere sun intensity as a percentage, saturating at 400 W/m²
pub fn sun_intensity(terrestrial_radiation: f64) -> f64 {
    terrestrial_radiation.clamp(0.0, FULL_SUN_RADIATION) / FULL_SUN_RADIATION * 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const LAT: f64 = 48.1702;
    const LON: f64 = 17.2127;

    fn utc(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
    }

    #[test]
    fn test_gsei_zero_radiation_guards_divide_by_zero() {
        assert_eq!(ground_sun_exposure_index(0.0, 0.0), 0.0);
        assert_eq!(ground_sun_exposure_index(300.0, 0.0), 0.0);
        assert_eq!(ground_sun_exposure_index(300.0, -5.0), 0.0);
    }

    #[test]
    fn test_gsei_scales_ratio() {
        let gsei = ground_sun_exposure_index(462.5, 925.0);
        assert!((gsei - 50.0 * SITE_CONSTANT).abs() < 1e-9);
        assert_eq!(ground_sun_exposure_index(0.0, 500.0), 0.0);
    }

    #[test]
    fn test_gsei_is_clamped() {
        assert_eq!(ground_sun_exposure_index(2000.0, 100.0), 100.0);
    }

    #[test]
    fn test_sun_intensity() {
        assert_eq!(sun_intensity(0.0), 0.0);
        assert_eq!(sun_intensity(200.0), 50.0);
        assert_eq!(sun_intensity(900.0), 100.0);
        assert_eq!(sun_intensity(-3.0), 0.0);
    }

    #[test]
    fn test_summer_solar_noon_is_high() {
        // solar noon at ~17°E is around 10:50 UTC
        let elevation = solar_elevation(utc(2025, 6, 21, 10, 50), LAT, LON);
        assert!(elevation > 60.0 && elevation < 70.0, "got {}", elevation);
    }

    #[test]
    fn test_winter_solar_noon_is_low() {
        let elevation = solar_elevation(utc(2025, 12, 21, 10, 50), LAT, LON);
        assert!(elevation > 15.0 && elevation < 22.0, "got {}", elevation);
    }

    #[test]
    fn test_midnight_is_below_horizon() {
        let elevation = solar_elevation(utc(2025, 6, 21, 23, 0), LAT, LON);
        assert!(elevation < 0.0, "got {}", elevation);
    }

    #[test]
    fn test_elevation_rises_through_morning() {
        let early = solar_elevation(utc(2025, 3, 21, 6, 0), LAT, LON);
        let later = solar_elevation(utc(2025, 3, 21, 8, 0), LAT, LON);
        assert!(later > early);
    }
}
