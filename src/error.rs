//! Error types for tabcache
//!
//! Every library operation returns `CacherResult<T>`. Nothing is retried or
//! swallowed: a failure aborts the call and reaches the caller as-is.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for tabcache operations
pub type CacherResult<T> = Result<T, CacherError>;

/// All errors that can occur while resolving a cached read
#[derive(Error, Debug)]
pub enum CacherError {
    // Source errors
    #[error("Source unavailable: {source_name}: {reason}")]
    SourceUnavailable { source_name: String, reason: String },

    #[error("Unsupported source {path}: expected one of {expected}")]
    UnsupportedSource { path: PathBuf, expected: String },

    #[error("Invalid reader option '{key}': {reason}")]
    InvalidOption { key: String, reason: String },

    // Cache errors
    #[error("Invalid cache key '{key}': {reason}")]
    InvalidCacheKey { key: String, reason: String },

    #[error("Failed to write cache artifact {path}: {reason}")]
    CacheWrite { path: PathBuf, reason: String },

    #[error("Failed to read cache artifact {path}: {reason}")]
    CacheRead { path: PathBuf, reason: String },

    // Configuration errors
    #[error("Invalid configuration at {path}: {reason}")]
    ConfigInvalid { path: PathBuf, reason: String },

    // IO errors
    #[error("IO error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    // Data errors
    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),
}

impl CacherError {
    /// Create a source-unavailable error for a path or connection string
    pub fn source_unavailable(source_name: impl Into<String>, reason: impl ToString) -> Self {
        Self::SourceUnavailable {
            source_name: source_name.into(),
            reason: reason.to_string(),
        }
    }

    /// Create an invalid-option error
    pub fn invalid_option(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidOption {
            key: key.into(),
            reason: reason.into(),
        }
    }

    /// Create a cache write error
    pub fn cache_write(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::CacheWrite {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    /// Create a cache read error
    pub fn cache_read(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::CacheRead {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    /// Create an IO error with context
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Get actionable hint for the error
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::CacheRead { .. } => {
                Some("The artifact may be corrupt. Re-run with --no-cache to rebuild it.")
            }
            Self::CacheWrite { .. } => Some("Check that the cache directory is writable."),
            Self::UnsupportedSource { .. } => {
                Some("Use the command matching the file type (csv, json, excel, sql).")
            }
            _ => None,
        }
    }
}
