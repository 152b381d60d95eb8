//! Simulated time and render bookkeeping for the watch loop
//!
//! The clock face can run faster than real time to preview the day. The speed
//! lives in [`SimulatedClock`] and is passed around explicitly; nothing reads
//! it from global state.

use chrono::{DateTime, TimeDelta, Utc};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// Real-time speed
pub const NORMAL_SPEED: f64 = 1.0;
/// Fast-forward speed toggled to from [`NORMAL_SPEED`]
pub const FAST_SPEED: f64 = 1000.0;

/// How often, in simulated time, weather is re-normalized
pub const WEATHER_REFRESH_SECONDS: i64 = 60;

/// Wall clock scaled by a speed multiplier
#[derive(Debug, Clone)]
pub struct SimulatedClock {
    start: DateTime<Utc>,
    real_start: Instant,
    speed: f64,
}

impl SimulatedClock {
    /// Starts a clock at simulated time `start`, anchored to the current instant
    pub fn new(start: DateTime<Utc>, speed: f64) -> Self {
        Self::anchored(start, Instant::now(), speed)
    }

    /// Starts a clock at simulated time `start`, anchored to `real_start`
    pub fn anchored(start: DateTime<Utc>, real_start: Instant, speed: f64) -> Self {
        Self {
            start,
            real_start,
            speed,
        }
    }

    pub fn speed(&self) -> f64 {
        self.speed
    }

    /// Simulated time at the current instant
    pub fn now(&self) -> DateTime<Utc> {
        self.now_at(Instant::now())
    }

    /// Simulated time at real instant `real`
    ///
    /// Instants before the anchor read as the start time.
    pub fn now_at(&self, real: Instant) -> DateTime<Utc> {
        let elapsed = real.saturating_duration_since(self.real_start).as_secs_f64();
        let millis = (elapsed * self.speed * 1000.0) as i64;
        self.start
            .checked_add_signed(TimeDelta::milliseconds(millis))
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    /// Changes the speed at `real`, keeping simulated time continuous
    pub fn set_speed_at(&mut self, speed: f64, real: Instant) {
        self.start = self.now_at(real);
        self.real_start = real;
        self.speed = speed;
    }

    /// Switches between normal and fast-forward speed at `real`
    pub fn toggle_speed_at(&mut self, real: Instant) {
        let speed = if self.speed == NORMAL_SPEED {
            FAST_SPEED
        } else {
            NORMAL_SPEED
        };
        self.set_speed_at(speed, real);
    }
}

/// Identifies one render cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderToken(u64);

/// Hands out render tokens; only the newest one is current
///
/// A slow cycle that finishes after a newer one started must not overwrite
/// the newer result.
#[derive(Debug, Default)]
pub struct RenderTokens {
    latest: AtomicU64,
}

impl RenderTokens {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a new cycle, superseding every earlier token
    pub fn begin(&self) -> RenderToken {
        RenderToken(self.latest.fetch_add(1, Ordering::SeqCst) + 1)
    }

    pub fn is_current(&self, token: RenderToken) -> bool {
        self.latest.load(Ordering::SeqCst) == token.0
    }
}

/// Tracks when weather was last re-normalized, in simulated time
#[derive(Debug, Clone)]
pub struct WeatherRefresh {
    last: Option<DateTime<Utc>>,
    every: TimeDelta,
}

impl Default for WeatherRefresh {
    fn default() -> Self {
        Self::every(TimeDelta::seconds(WEATHER_REFRESH_SECONDS))
    }
}

impl WeatherRefresh {
    pub fn every(every: TimeDelta) -> Self {
        Self { last: None, every }
    }

    /// Returns true and records `now` if a refresh is due
    ///
    /// Due on the first call, once `every` has passed, or when simulated time
    /// moved backwards.
    pub fn check(&mut self, now: DateTime<Utc>) -> bool {
        let due = match self.last {
            None => true,
            Some(last) => now < last || now - last >= self.every,
        };
        if due {
            self.last = Some(now);
        }
        due
    }
}
