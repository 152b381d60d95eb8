//! Background weather refresh and the watch loop
//!
//! Refreshes run as tokio tasks and report back over a channel. Every refresh
//! carries the render token it was started with, and a result is only applied
//! while that token is still current, so a slow refresh can never overwrite a
//! newer one.

use chrono::{DateTime, Utc};
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::clock::{RenderToken, RenderTokens, SimulatedClock, WeatherRefresh};
use crate::data::{ForecastTransport, NormalizedWeatherModel, WeatherService};
use crate::summary;

/// Messages sent from a background refresh to the watch loop
#[derive(Debug)]
pub enum RefreshMessage {
    /// Weather normalized for the refresh's simulated time
    WeatherUpdated {
        token: RenderToken,
        model: NormalizedWeatherModel,
    },
    /// Weather data unavailable after all retries
    RefreshError { token: RenderToken, error: String },
}

impl RefreshMessage {
    fn token(&self) -> RenderToken {
        match self {
            RefreshMessage::WeatherUpdated { token, .. } => *token,
            RefreshMessage::RefreshError { token, .. } => *token,
        }
    }
}

/// Handle for starting refreshes and receiving their results
pub struct RefreshHandle<T: ForecastTransport> {
    service: Arc<WeatherService<T>>,
    tokens: RenderTokens,
    sender: mpsc::Sender<RefreshMessage>,
    /// Channel for receiving refresh messages
    pub receiver: mpsc::Receiver<RefreshMessage>,
}

impl<T: ForecastTransport + 'static> RefreshHandle<T> {
    pub fn new(service: Arc<WeatherService<T>>) -> Self {
        let (sender, receiver) = mpsc::channel(32);
        Self {
            service,
            tokens: RenderTokens::new(),
            sender,
            receiver,
        }
    }

    /// Spawns a refresh for simulated time `now`, superseding any in flight
    pub fn request_refresh(&self, now: DateTime<Utc>) -> RenderToken {
        let token = self.tokens.begin();
        let service = Arc::clone(&self.service);
        let tx = self.sender.clone();

        tokio::spawn(async move {
            let message = match service.get_weather_data_at(now).await {
                Ok(model) => RefreshMessage::WeatherUpdated { token, model },
                Err(e) => RefreshMessage::RefreshError {
                    token,
                    error: e.to_string(),
                },
            };
            // receiver gone means the loop has finished
            let _ = tx.send(message).await;
        });

        token
    }

    /// Returns the message's outcome if it belongs to the current refresh
    pub fn accept(
        &self,
        message: RefreshMessage,
    ) -> Option<Result<NormalizedWeatherModel, String>> {
        if !self.tokens.is_current(message.token()) {
            debug!("discarding superseded refresh");
            return None;
        }
        match message {
            RefreshMessage::WeatherUpdated { model, .. } => Some(Ok(model)),
            RefreshMessage::RefreshError { error, .. } => Some(Err(error)),
        }
    }
}

/// Settings for [`watch`]
#[derive(Debug, Clone)]
pub struct WatchOptions {
    /// Simulated time at the first cycle
    pub start: DateTime<Utc>,
    /// Simulated seconds per real second
    pub speed: f64,
    /// Stop after this many printed cycles; run forever when `None`
    pub cycles: Option<u32>,
    /// Real time between cycles
    pub tick: Duration,
}

impl Default for WatchOptions {
    fn default() -> Self {
        Self {
            start: Utc::now(),
            speed: crate::clock::NORMAL_SPEED,
            cycles: None,
            tick: Duration::from_secs(1),
        }
    }
}

/// Runs the simulated clock, printing the active hour every cycle
///
/// Weather is loaded once before the first cycle, then re-normalized in the
/// background whenever simulated time has advanced a minute.
pub async fn watch<T, W>(
    service: Arc<WeatherService<T>>,
    options: WatchOptions,
    out: &mut W,
) -> std::io::Result<()>
where
    T: ForecastTransport + 'static,
    W: Write,
{
    let clock = SimulatedClock::new(options.start, options.speed);
    let mut refresh = WeatherRefresh::default();
    let mut handle = RefreshHandle::new(service);
    let mut model: Option<NormalizedWeatherModel> = None;

    let now = clock.now();
    refresh.check(now);
    handle.request_refresh(now);
    if let Some(message) = handle.receiver.recv().await {
        apply(&handle, message, &mut model);
    }

    let mut interval = tokio::time::interval(options.tick);
    let mut printed = 0;
    loop {
        tokio::select! {
            _ = interval.tick() => {
                let now = clock.now();
                if refresh.check(now) {
                    handle.request_refresh(now);
                }
                writeln!(out, "{}", status_line(model.as_ref(), now))?;
                out.flush()?;

                printed += 1;
                if options.cycles.is_some_and(|cycles| printed >= cycles) {
                    return Ok(());
                }
            }
            Some(message) = handle.receiver.recv() => {
                apply(&handle, message, &mut model);
            }
        }
    }
}

fn apply<T: ForecastTransport + 'static>(
    handle: &RefreshHandle<T>,
    message: RefreshMessage,
    model: &mut Option<NormalizedWeatherModel>,
) {
    match handle.accept(message) {
        Some(Ok(updated)) => *model = Some(updated),
        Some(Err(error)) => {
            warn!(%error, "weather data unavailable");
            *model = None;
        }
        None => {}
    }
}

fn status_line(model: Option<&NormalizedWeatherModel>, now: DateTime<Utc>) -> String {
    match model {
        Some(model) => summary::active_line(model, model.local_time(now)),
        None => format!("{}  weather data unavailable", now.format("%Y-%m-%d %H:%M UTC")),
    }
}
