//! Cache module for persisting the raw forecast to disk
//!
//! This module provides a cache manager that stores one JSON document per key
//! in the platform cache directory. Writes replace the whole document at once,
//! so a reader never sees a partially written forecast.

mod manager;

pub use manager::CacheManager;
