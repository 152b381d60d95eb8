//! Command-line interface parsing for weatherclock
//!
//! This module handles parsing of CLI arguments using clap and merging them
//! over the settings file into the configuration the run starts with.

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use thiserror::Error;

use crate::config::{Config, ConfigError, Settings};

/// Error types for CLI argument handling
#[derive(Debug, Error)]
pub enum CliError {
    /// Settings file or merged settings are invalid
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The watch speed must be a positive number
    #[error("Invalid speed: {0}. Speed must be greater than zero")]
    InvalidSpeed(f64),
}

/// Weather clock - 24-hour forecast normalized for a radial dial
#[derive(Parser, Debug)]
#[command(name = "weatherclock")]
#[command(about = "24-hour weather clock data from Open-Meteo")]
#[command(version)]
pub struct Cli {
    /// TOML settings file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Forecast latitude, overrides the settings file
    #[arg(long, global = true, allow_hyphen_values = true)]
    pub latitude: Option<f64>,

    /// Forecast longitude, overrides the settings file
    #[arg(long, global = true, allow_hyphen_values = true)]
    pub longitude: Option<f64>,

    /// Always fetch a fresh forecast
    #[arg(long, global = true)]
    pub no_cache: bool,

    /// Use generated weather instead of the network
    #[arg(long, global = true)]
    pub demo: bool,

    /// Log filter used when RUST_LOG is not set
    #[arg(long, global = true, default_value = "warn", value_name = "LEVEL")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Print one line per hour of the dial (default)
    Show,
    /// Print the normalized model as JSON
    Json,
    /// Run the clock, printing the active hour every second
    Watch {
        /// Simulated seconds per real second
        #[arg(long, default_value_t = 1.0)]
        speed: f64,
        /// Simulated start time (RFC 3339), now when omitted
        #[arg(long)]
        start: Option<DateTime<Utc>>,
        /// Stop after this many cycles
        #[arg(long)]
        cycles: Option<u32>,
    },
    /// Delete the cached forecast
    ResetCache,
}

/// Configuration derived from CLI arguments for application startup
#[derive(Debug, Clone)]
pub struct StartupConfig {
    pub config: Config,
    pub command: Command,
}

impl StartupConfig {
    /// Creates a StartupConfig from parsed CLI arguments.
    ///
    /// Reads the settings file if one was given, then applies the flags.
    pub fn from_cli(cli: &Cli) -> Result<Self, CliError> {
        let mut settings = match &cli.config {
            Some(path) => Settings::load(path)?,
            None => Settings::default(),
        };
        apply_overrides(cli, &mut settings);

        let command = cli.command.clone().unwrap_or(Command::Show);
        if let Command::Watch { speed, .. } = command {
            if !(speed.is_finite() && speed > 0.0) {
                return Err(CliError::InvalidSpeed(speed));
            }
        }

        Ok(StartupConfig {
            config: Config::from_settings(settings)?,
            command,
        })
    }
}

/// Applies command-line flags over `settings`
fn apply_overrides(cli: &Cli, settings: &mut Settings) {
    if let Some(latitude) = cli.latitude {
        settings.latitude = latitude;
    }
    if let Some(longitude) = cli.longitude {
        settings.longitude = longitude;
    }
    if cli.no_cache {
        settings.cache_weather_data = false;
    }
    if cli.demo {
        settings.use_demo_weather = true;
    }
}
