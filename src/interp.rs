//! Piecewise-linear interpolation helpers
//!
//! `gradient` maps a value through an ascending list of `(key, value)` stops.
//! `gradients` does the same for several output channels sharing one key axis,
//! which is how colors and sizes are keyed by temperature, altitude and so on.

/// Linear interpolation between `start` and `end` at `ratio` (0 yields `start`, 1 yields `end`)
pub fn lerp(ratio: f64, start: f64, end: f64) -> f64 {
    start + (end - start) * ratio
}

/// Inverse of [`lerp`]: where `value` sits between `start` and `end` as a ratio
pub fn unlerp(value: f64, start: f64, end: f64) -> f64 {
    (value - start) / (end - start)
}

/// Looks up `value` in an ascending list of `(key, value)` stops
///
/// Values below the first key clamp to the first stop's value, values past the
/// last key clamp to the last stop's value, anything in between is linearly
/// interpolated between the two bracketing stops. An empty stop list yields 0.
///
/// # Examples
/// ```
/// use weatherclock::interp::gradient;
///
/// let stops = [(0.0, 10.0), (10.0, 20.0)];
/// assert_eq!(gradient(5.0, &stops), 15.0);
/// assert_eq!(gradient(-5.0, &stops), 10.0);
/// assert_eq!(gradient(15.0, &stops), 20.0);
/// ```
pub fn gradient(value: f64, stops: &[(f64, f64)]) -> f64 {
    let Some(&(first_key, first_value)) = stops.first() else {
        return 0.0;
    };
    if value < first_key {
        return first_value;
    }

    for pair in stops.windows(2) {
        let (prev, curr) = (pair[0], pair[1]);
        if value > curr.0 {
            continue;
        }
        // Coincident keys would divide by zero; the later stop wins.
        if curr.0 == prev.0 {
            return curr.1;
        }
        return lerp(unlerp(value, prev.0, curr.0), prev.1, curr.1);
    }

    stops[stops.len() - 1].1
}

/// Multi-channel [`gradient`]: every channel of the stops shares the same key
///
/// ```
/// use weatherclock::interp::gradients;
///
/// // hue, saturation keyed by temperature
/// let stops = [(-10.0, [240.0, 80.0]), (30.0, [0.0, 100.0])];
/// assert_eq!(gradients(10.0, &stops), [120.0, 90.0]);
/// ```
pub fn gradients<const N: usize>(value: f64, stops: &[(f64, [f64; N])]) -> [f64; N] {
    let mut channel = Vec::with_capacity(stops.len());
    std::array::from_fn(|i| {
        channel.clear();
        channel.extend(stops.iter().map(|(key, values)| (*key, values[i])));
        gradient(value, &channel)
    })
}
