//! Cache manager for persisting fetched forecasts to disk
//!
//! Provides a `CacheManager` that stores serializable data as JSON files.
//! Freshness is not decided here: callers store the fetch time inside the
//! data and judge it themselves.

use directories::ProjectDirs;
use serde::{de::DeserializeOwned, Serialize};
use std::fs;
use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};

/// Manages reading and writing cached data to disk
///
/// The cache manager stores data as JSON files in an XDG-compliant cache directory
/// (`~/.cache/weatherclock/` on Linux).
#[derive(Debug, Clone)]
pub struct CacheManager {
    /// Directory where cache files are stored
    cache_dir: PathBuf,
}

impl CacheManager {
    /// Creates a new CacheManager using XDG-compliant cache directory
    ///
    /// Uses `~/.cache/weatherclock/` on Linux, or equivalent XDG path on other platforms.
    /// Returns `None` if the cache directory cannot be determined (e.g., no home directory).
    pub fn new() -> Option<Self> {
        let project_dirs = ProjectDirs::from("", "", "weatherclock")?;
        let cache_dir = project_dirs.cache_dir().to_path_buf();
        Some(Self { cache_dir })
    }

    /// Creates a new CacheManager with a custom cache directory
    ///
    /// Useful for testing or when a specific cache location is needed.
    pub fn with_dir(cache_dir: PathBuf) -> Self {
        Self { cache_dir }
    }

    /// Directory the cache files live in
    pub fn dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Returns the path to a cache file for the given key
    fn cache_path(&self, key: &str) -> PathBuf {
        self.cache_dir.join(format!("{}.json", key))
    }

    /// Ensures the cache directory exists
    fn ensure_dir(&self) -> io::Result<()> {
        fs::create_dir_all(&self.cache_dir)
    }

    /// Writes data to the cache, replacing any previous entry for `key`
    ///
    /// The JSON is written to a temporary file first and then renamed over the
    /// entry, so the entry is either the old document or the new one.
    ///
    /// # Arguments
    /// * `key` - Unique identifier for the cache entry (e.g., "raw_weather")
    /// * `data` - The data to cache (must implement Serialize)
    pub fn write<T: Serialize>(&self, key: &str, data: &T) -> io::Result<()> {
        self.ensure_dir()?;

        let json = serde_json::to_string(data)
            .map_err(|e| io::Error::new(ErrorKind::InvalidData, e))?;

        let path = self.cache_path(key);
        let tmp = self.cache_dir.join(format!(".{}.json.tmp", key));
        fs::write(&tmp, json)?;
        fs::rename(&tmp, &path)
    }

    /// Reads data from the cache
    ///
    /// # Returns
    /// * `Ok(Some(T))` if the entry exists and parses
    /// * `Ok(None)` if there is no entry for `key`
    /// * `Err` with `ErrorKind::InvalidData` if the entry can't be parsed as `T`,
    ///   or any other IO error while reading
    pub fn read<T: DeserializeOwned>(&self, key: &str) -> io::Result<Option<T>> {
        let content = match fs::read_to_string(self.cache_path(key)) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e),
        };

        serde_json::from_str(&content)
            .map(Some)
            .map_err(|e| io::Error::new(ErrorKind::InvalidData, e))
    }

    /// Deletes the entry for `key`
    ///
    /// Returns `Ok(false)` if there was nothing to delete.
    pub fn remove(&self, key: &str) -> io::Result<bool> {
        match fs::remove_file(self.cache_path(key)) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e),
        }
    }
}
