//! Path helpers
//!
//! Cache keys, artifact locations and extension checks.

use std::path::{Path, PathBuf};

/// Extension of every cache artifact
pub const ARTIFACT_EXTENSION: &str = "parquet";

/// Normalize a path to use '/' as separator (for cross-platform consistency)
pub fn normalize_path(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

/// File name without its final extension
pub fn file_stem(path: &Path) -> Option<String> {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().to_string())
        .filter(|stem| !stem.is_empty())
}

/// Check that a cache key names one file directly inside the cache directory
pub fn check_cache_key(key: &str) -> Result<(), &'static str> {
    if key.is_empty() {
        return Err("key is empty");
    }
    if key == "." || key == ".." {
        return Err("key is a directory reference");
    }
    if key.contains(['/', '\\', '\0']) {
        return Err("key contains a path separator");
    }
    Ok(())
}

/// Location of the artifact for a cache key: `{cache_dir}/{key}.parquet`
pub fn artifact_path(cache_dir: &Path, key: &str) -> PathBuf {
    cache_dir.join(format!("{}.{}", key, ARTIFACT_EXTENSION))
}

/// Lowercased extension including the leading dot (".csv")
pub fn dotted_extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| format!(".{}", ext.to_lowercase()))
}

/// Check whether a path ends in one of the given dotted suffixes
pub fn has_suffix(path: &Path, suffixes: &[&str]) -> bool {
    dotted_extension(path)
        .map(|ext| suffixes.iter().any(|s| s.eq_ignore_ascii_case(&ext)))
        .unwrap_or(false)
}

/// Check if a path looks like a cache artifact
pub fn is_artifact(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext == ARTIFACT_EXTENSION)
        .unwrap_or(false)
}
