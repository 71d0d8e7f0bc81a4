//! Cache resolver - Reuse a fresh artifact or rebuild it from the source
//!
//! Decision order:
//! 1. caching disabled -> rebuild
//! 2. no artifact -> rebuild
//! 3. source file modified after the artifact -> rebuild
//! 4. otherwise -> reuse
//!
//! A corrupt artifact is reported as `CacheRead` and never rebuilt
//! implicitly; callers pass `use_cache = false` to force a rebuild.
//!
//! There is no locking. Two processes resolving the same key at once race on
//! the artifact write.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::cache::store::{ensure_cache_dir, read_artifact, write_artifact, ArtifactCompression};
use crate::core::model::{ReaderOptions, SourceDescriptor, Table};
use crate::core::paths::{artifact_path, has_suffix};
use crate::core::util::get_mtime;
use crate::error::{CacherError, CacherResult};
use crate::readers::{ReadTarget, TableReader};

/// Why an artifact has to be rebuilt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RebuildReason {
    /// The caller turned caching off
    Disabled,
    /// No artifact exists yet
    Missing,
    /// The source file is newer than the artifact
    Stale,
}

/// Outcome of the freshness check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheDecision {
    Reuse,
    Rebuild(RebuildReason),
}

impl fmt::Display for CacheDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheDecision::Reuse => write!(f, "reuse"),
            CacheDecision::Rebuild(RebuildReason::Disabled) => write!(f, "rebuild (cache disabled)"),
            CacheDecision::Rebuild(RebuildReason::Missing) => write!(f, "rebuild (no artifact)"),
            CacheDecision::Rebuild(RebuildReason::Stale) => write!(f, "rebuild (source changed)"),
        }
    }
}

/// How a file source is handed to the reader
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TargetMode {
    /// Pass the file path
    #[default]
    Path,
    /// Pass the file's text (e.g. a `.sql` file holding a query)
    FileContents,
}

/// Table plus how it was obtained
#[derive(Debug, Clone)]
pub struct Resolution {
    pub table: Table,
    pub decision: CacheDecision,
    pub artifact: PathBuf,
}

/// Materializes reads into Parquet artifacts and reuses them while fresh
pub struct CacheResolver<R> {
    reader: R,
    suffixes: Vec<&'static str>,
    target_mode: TargetMode,
    compression: ArtifactCompression,
}

impl<R: TableReader> CacheResolver<R> {
    /// Create a resolver around a reader capability
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            suffixes: Vec::new(),
            target_mode: TargetMode::Path,
            compression: ArtifactCompression::default(),
        }
    }

    /// Only accept file sources with one of these dotted extensions
    pub fn with_suffixes(mut self, suffixes: &[&'static str]) -> Self {
        self.suffixes = suffixes.to_vec();
        self
    }

    pub fn with_target_mode(mut self, mode: TargetMode) -> Self {
        self.target_mode = mode;
        self
    }

    pub fn with_compression(mut self, compression: ArtifactCompression) -> Self {
        self.compression = compression;
        self
    }

    pub fn suffixes(&self) -> &[&'static str] {
        &self.suffixes
    }

    /// Decide between reuse and rebuild without reading or writing anything
    pub fn decide(
        &self,
        source: &SourceDescriptor,
        cache_dir: &Path,
        use_cache: bool,
    ) -> CacherResult<CacheDecision> {
        self.check_source(source)?;
        let artifact = artifact_path(cache_dir, &source.cache_key()?);
        decide_freshness(source, &artifact, use_cache)
    }

    /// Resolve a source to a table, reusing the artifact when it is fresh
    pub fn resolve(
        &self,
        source: &SourceDescriptor,
        cache_dir: &Path,
        use_cache: bool,
        options: &ReaderOptions,
    ) -> CacherResult<Table> {
        self.resolve_detailed(source, cache_dir, use_cache, options)
            .map(|resolution| resolution.table)
    }

    /// Same as `resolve`, also reporting the decision and artifact path
    pub fn resolve_detailed(
        &self,
        source: &SourceDescriptor,
        cache_dir: &Path,
        use_cache: bool,
        options: &ReaderOptions,
    ) -> CacherResult<Resolution> {
        self.check_source(source)?;
        let key = source.cache_key()?;
        ensure_cache_dir(cache_dir)?;

        let artifact = artifact_path(cache_dir, &key);
        let decision = decide_freshness(source, &artifact, use_cache)?;
        debug!(
            "{} -> {}: {}",
            source.display_name(),
            artifact.display(),
            decision
        );

        let table = match decision {
            CacheDecision::Reuse => read_artifact(&artifact)?,
            CacheDecision::Rebuild(_) => {
                let target = self.read_target(source)?;
                let table = self.reader.read(&target, options)?;
                write_artifact(&artifact, &table, self.compression)?;
                table
            }
        };

        Ok(Resolution {
            table,
            decision,
            artifact,
        })
    }

    fn check_source(&self, source: &SourceDescriptor) -> CacherResult<()> {
        let path = match source.path() {
            Some(path) => path,
            None => return Ok(()),
        };

        if !path.is_file() {
            return Err(CacherError::source_unavailable(
                path.display().to_string(),
                "file cannot be found or is not a regular file",
            ));
        }

        if !self.suffixes.is_empty() && !has_suffix(path, &self.suffixes) {
            return Err(CacherError::UnsupportedSource {
                path: path.to_path_buf(),
                expected: self.suffixes.join(", "),
            });
        }

        Ok(())
    }

    fn read_target(&self, source: &SourceDescriptor) -> CacherResult<ReadTarget> {
        match source {
            SourceDescriptor::Query { text, .. } => Ok(ReadTarget::Query(text.clone())),
            SourceDescriptor::File { path, .. } => match self.target_mode {
                TargetMode::Path => Ok(ReadTarget::Path(path.clone())),
                TargetMode::FileContents => fs::read_to_string(path)
                    .map(ReadTarget::Query)
                    .map_err(|e| CacherError::source_unavailable(path.display().to_string(), e)),
            },
        }
    }
}

/// Compare source and artifact timestamps
fn decide_freshness(
    source: &SourceDescriptor,
    artifact: &Path,
    use_cache: bool,
) -> CacherResult<CacheDecision> {
    if !use_cache {
        return Ok(CacheDecision::Rebuild(RebuildReason::Disabled));
    }

    if !artifact.exists() {
        return Ok(CacheDecision::Rebuild(RebuildReason::Missing));
    }

    if let Some(path) = source.path() {
        let source_mtime = get_mtime(path)
            .map_err(|e| CacherError::source_unavailable(path.display().to_string(), e))?;
        let artifact_mtime = get_mtime(artifact).map_err(|e| CacherError::cache_read(artifact, e))?;

        if source_mtime > artifact_mtime {
            return Ok(CacheDecision::Rebuild(RebuildReason::Stale));
        }
    }

    Ok(CacheDecision::Reuse)
}
