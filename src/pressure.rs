//! Barometric conversion between pressure levels and altitude
//!
//! Uses the ICAO standard atmosphere. The forecast reports cloud cover per
//! pressure level; these conversions size the set of levels to request and
//! relate them back to altitude bands.

/// Standard sea-level pressure in hPa
const P0: f64 = 1013.25;
/// Standard sea-level temperature in Kelvin (15°C)
const T0: f64 = 288.15;
/// Temperature lapse rate (K/m)
const L: f64 = 0.0065;
/// Universal gas constant (J/(mol·K))
const R: f64 = 8.3144598;
/// Gravity (m/s²)
const G: f64 = 9.80665;
/// Molar mass of Earth's air (kg/mol)
const M: f64 = 0.0289644;

/// Altitude in meters at which the standard atmosphere has `pressure` hPa
pub fn hpa_to_meters(pressure: f64) -> f64 {
    (T0 / L) * (1.0 - (pressure / P0).powf((R * L) / (G * M)))
}

/// Standard-atmosphere pressure in hPa at `altitude` meters
pub fn meters_to_hpa(altitude: f64) -> f64 {
    P0 * (1.0 - (L * altitude) / T0).powf((G * M) / (R * L))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sea_level() {
        assert!(hpa_to_meters(P0).abs() < 1e-9);
        assert!((meters_to_hpa(0.0) - P0).abs() < 1e-9);
    }

    #[test]
    fn test_known_levels() {
        // 850 hPa sits around 1457 m, 700 hPa around 3012 m in the standard atmosphere
        assert!((hpa_to_meters(850.0) - 1457.0).abs() < 5.0);
        assert!((hpa_to_meters(700.0) - 3012.0).abs() < 5.0);
    }

    #[test]
    fn test_pressure_decreases_with_altitude() {
        let mut last = meters_to_hpa(0.0);
        for alt in (250..=5000).step_by(250) {
            let p = meters_to_hpa(alt as f64);
            assert!(p < last, "pressure should drop at {} m", alt);
            last = p;
        }
    }

    #[test]
    fn test_round_trip_within_cloud_levels() {
        let mut p = 1000.0;
        while p >= 700.0 {
            let back = meters_to_hpa(hpa_to_meters(p));
            assert!((back - p).abs() < 0.01, "{} hPa round-tripped to {}", p, back);
            p -= 5.0;
        }
    }
}
