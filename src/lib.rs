//! Weather clock library
//!
//! Fetches an Open-Meteo forecast and normalizes it into a 24-hour model of
//! hourly and quarter-hourly records for drawing on a radial clock dial.

pub mod cache;
pub mod cli;
pub mod clock;
pub mod config;
pub mod data;
pub mod interp;
pub mod pressure;
pub mod refresh;
pub mod solar;
pub mod summary;
