//! Configuration for the tabcache CLI
//!
//! Configuration is read from `tabcache.toml` in the working directory, or
//! from the file given with `--config`. Every key is optional.
//!
//! ```toml
//! [cache]
//! dir = "./data/raw/cache"
//! compression = "zstd"
//!
//! [log]
//! format = "json"
//! ```

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::cache::store::ArtifactCompression;
use crate::error::{CacherError, CacherResult};

/// Config file looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "tabcache.toml";

/// Root configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Cache settings
    pub cache: CacheConfig,

    /// Logging settings
    pub log: LogConfig,
}

/// Cache settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Directory holding the Parquet artifacts
    pub dir: PathBuf,

    /// Compression codec for new artifacts
    pub compression: ArtifactCompression,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("cache"),
            compression: ArtifactCompression::Snappy,
        }
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Logging settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Log format: "text" or "json"
    pub format: LogFormat,
}

impl Config {
    /// Load configuration from an explicit path, which must exist
    pub fn load_from_file(path: &Path) -> CacherResult<Config> {
        let content = fs::read_to_string(path)
            .map_err(|e| CacherError::io(format!("reading config from {}", path.display()), e))?;

        toml::from_str(&content).map_err(|e| CacherError::ConfigInvalid {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    /// Load `--config` if given, else `tabcache.toml` in `dir` if present,
    /// else defaults
    pub fn discover(explicit: Option<&Path>, dir: &Path) -> CacherResult<Config> {
        if let Some(path) = explicit {
            debug!("Loading config from {}", path.display());
            return Self::load_from_file(path);
        }

        let local = dir.join(DEFAULT_CONFIG_FILE);
        if local.is_file() {
            debug!("Found local config: {}", local.display());
            return Self::load_from_file(&local);
        }

        debug!("Config file not found, using defaults");
        Ok(Config::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn defaults_when_missing() {
        let temp = TempDir::new().unwrap();
        let config = Config::discover(None, temp.path()).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.cache.dir, PathBuf::from("cache"));
        assert_eq!(config.cache.compression, ArtifactCompression::Snappy);
    }

    #[test]
    fn loads_local_file() {
        let temp = TempDir::new().unwrap();
        fs::write(
            temp.path().join(DEFAULT_CONFIG_FILE),
            "[cache]\ndir = \"/tmp/artifacts\"\ncompression = \"zstd\"\n\n[log]\nformat = \"json\"\n",
        )
        .unwrap();

        let config = Config::discover(None, temp.path()).unwrap();
        assert_eq!(config.cache.dir, PathBuf::from("/tmp/artifacts"));
        assert_eq!(config.cache.compression, ArtifactCompression::Zstd);
        assert_eq!(config.log.format, LogFormat::Json);
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("custom.toml");
        fs::write(&path, "[cache]\ncompression = \"gzip\"\n").unwrap();

        let config = Config::discover(Some(&path), temp.path()).unwrap();
        assert_eq!(config.cache.dir, PathBuf::from("cache"));
        assert_eq!(config.cache.compression, ArtifactCompression::Gzip);
        assert_eq!(config.log.format, LogFormat::Text);
    }

    #[test]
    fn invalid_file_is_reported() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("bad.toml");
        fs::write(&path, "[cache]\ncompression = \"lzma\"\n").unwrap();

        let err = Config::discover(Some(&path), temp.path()).unwrap_err();
        assert!(matches!(err, CacherError::ConfigInvalid { .. }));
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        let temp = TempDir::new().unwrap();
        let err = Config::discover(Some(&temp.path().join("nope.toml")), temp.path()).unwrap_err();
        assert!(matches!(err, CacherError::Io { .. }));
    }
}
