//! weatherclock - 24-hour weather clock data from Open-Meteo
//!
//! Prints the normalized forecast, or runs the simulated clock and prints the
//! active hour as it advances.

use std::io;
use std::process::ExitCode;
use std::sync::Arc;

use chrono::Utc;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use weatherclock::cache::CacheManager;
use weatherclock::cli::{Cli, Command, StartupConfig};
use weatherclock::config::Config;
use weatherclock::data::{OpenMeteoClient, WeatherError, WeatherService};
use weatherclock::refresh::{watch, WatchOptions};
use weatherclock::summary;

/// Logs go to stderr so stdout stays clean for `json`
fn init_tracing(default_level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn cache_manager(config: &Config) -> Option<CacheManager> {
    match &config.cache_dir {
        Some(dir) => Some(CacheManager::with_dir(dir.clone())),
        None => CacheManager::new(),
    }
}

async fn run(startup: StartupConfig) -> Result<(), Box<dyn std::error::Error>> {
    let cache = cache_manager(&startup.config);
    let service = WeatherService::new(startup.config, OpenMeteoClient::new(), cache);

    match startup.command {
        Command::Show => {
            let now = Utc::now();
            let model = service.get_weather_data_at(now).await?;
            print!("{}", summary::render(&model, model.local_time(now)));
        }
        Command::Json => {
            let model = service.get_weather_data().await?;
            println!("{}", serde_json::to_string_pretty(&model)?);
        }
        Command::Watch {
            speed,
            start,
            cycles,
        } => {
            let options = WatchOptions {
                start: start.unwrap_or_else(Utc::now),
                speed,
                cycles,
                ..Default::default()
            };
            info!(speed, start = %options.start, "starting clock");
            watch(Arc::new(service), options, &mut io::stdout()).await?;
        }
        Command::ResetCache => {
            if service.reset_cache()? {
                println!("Cache cleared");
            } else {
                println!("No cached forecast");
            }
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(&cli.log_level);

    let startup = match StartupConfig::from_cli(&cli) {
        Ok(startup) => startup,
        Err(e) => {
            eprintln!("Error: {e}");
            return ExitCode::FAILURE;
        }
    };
    info!(
        latitude = startup.config.latitude,
        longitude = startup.config.longitude,
        "configuration loaded"
    );

    match run(startup).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) if e.is::<WeatherError>() => {
            eprintln!("weather data unavailable: {e}");
            ExitCode::FAILURE
        }
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}
