//! Cache store - Read/write Parquet artifacts in the cache directory

use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::arrow::ArrowWriter;
use parquet::basic::{Compression, GzipLevel, ZstdLevel};
use parquet::file::properties::WriterProperties;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::core::model::Table;
use crate::core::paths::{file_stem, is_artifact};
use crate::error::{CacherError, CacherResult};

/// Compression codec used inside artifacts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactCompression {
    #[default]
    Snappy,
    Zstd,
    Gzip,
    None,
}

impl ArtifactCompression {
    fn to_parquet(self) -> Compression {
        match self {
            ArtifactCompression::Snappy => Compression::SNAPPY,
            ArtifactCompression::Zstd => Compression::ZSTD(ZstdLevel::default()),
            ArtifactCompression::Gzip => Compression::GZIP(GzipLevel::default()),
            ArtifactCompression::None => Compression::UNCOMPRESSED,
        }
    }
}

impl std::str::FromStr for ArtifactCompression {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "snappy" => Ok(ArtifactCompression::Snappy),
            "zstd" => Ok(ArtifactCompression::Zstd),
            "gzip" => Ok(ArtifactCompression::Gzip),
            "none" | "uncompressed" => Ok(ArtifactCompression::None),
            _ => Err(format!("Unknown compression: {}", s)),
        }
    }
}

/// An artifact found in a cache directory
#[derive(Debug, Clone)]
pub struct ArtifactInfo {
    pub key: String,
    pub path: PathBuf,
    pub size: u64,
    pub modified: SystemTime,
    /// Row count from the Parquet footer; `None` when the footer is unreadable
    pub rows: Option<i64>,
}

/// Ensure cache directory exists
pub fn ensure_cache_dir(cache_dir: &Path) -> CacherResult<()> {
    if cache_dir.exists() {
        if !cache_dir.is_dir() {
            return Err(CacherError::cache_write(
                cache_dir,
                "cache path exists but is not a directory",
            ));
        }
        return Ok(());
    }

    fs::create_dir_all(cache_dir).map_err(|e| CacherError::cache_write(cache_dir, e))?;
    debug!("Created cache directory {}", cache_dir.display());
    Ok(())
}

/// Write a table to `path`, replacing any previous artifact
///
/// Data goes to a sibling temporary file first and is renamed into place, so
/// a failed write leaves the previous artifact (if any) untouched.
pub fn write_artifact(path: &Path, table: &Table, compression: ArtifactCompression) -> CacherResult<()> {
    let tmp_path = path.with_extension("parquet.tmp");

    let result = write_parquet(&tmp_path, table, compression)
        .and_then(|_| fs::rename(&tmp_path, path).map_err(|e| CacherError::cache_write(path, e)));

    if result.is_err() && tmp_path.exists() {
        if let Err(e) = fs::remove_file(&tmp_path) {
            warn!("Failed to remove {}: {}", tmp_path.display(), e);
        }
    }
    result?;

    info!(
        "Wrote {} rows to {} ({:?})",
        table.num_rows(),
        path.display(),
        compression
    );
    Ok(())
}

fn write_parquet(path: &Path, table: &Table, compression: ArtifactCompression) -> CacherResult<()> {
    let file = File::create(path).map_err(|e| CacherError::cache_write(path, e))?;
    let props = WriterProperties::builder()
        .set_compression(compression.to_parquet())
        .build();

    let mut writer = ArrowWriter::try_new(file, table.schema().clone(), Some(props))
        .map_err(|e| CacherError::cache_write(path, e))?;

    for batch in table.batches() {
        writer
            .write(batch)
            .map_err(|e| CacherError::cache_write(path, e))?;
    }

    writer
        .close()
        .map_err(|e| CacherError::cache_write(path, e))?;
    Ok(())
}

/// Decode an artifact back into a table
pub fn read_artifact(path: &Path) -> CacherResult<Table> {
    let file = File::open(path).map_err(|e| CacherError::cache_read(path, e))?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file)
        .map_err(|e| CacherError::cache_read(path, e))?;

    let schema = builder.schema().clone();
    let reader = builder
        .build()
        .map_err(|e| CacherError::cache_read(path, e))?;

    let batches = reader
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| CacherError::cache_read(path, e))?;

    debug!("Read {} batches from {}", batches.len(), path.display());
    Ok(Table::new(schema, batches))
}

/// Row count recorded in an artifact's footer
pub fn artifact_row_count(path: &Path) -> CacherResult<i64> {
    let file = File::open(path).map_err(|e| CacherError::cache_read(path, e))?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file)
        .map_err(|e| CacherError::cache_read(path, e))?;
    Ok(builder.metadata().file_metadata().num_rows())
}

/// List artifacts directly under the cache directory, sorted by key
pub fn list_artifacts(cache_dir: &Path) -> CacherResult<Vec<ArtifactInfo>> {
    if !cache_dir.is_dir() {
        return Ok(Vec::new());
    }

    let mut artifacts = Vec::new();

    for entry in WalkDir::new(cache_dir).min_depth(1).max_depth(1) {
        let entry = entry.map_err(|e| CacherError::cache_read(cache_dir, e))?;

        let path = entry.path();
        if !entry.file_type().is_file() || !is_artifact(path) {
            continue;
        }

        let key = match file_stem(path) {
            Some(key) => key,
            None => continue,
        };

        let metadata = entry
            .metadata()
            .map_err(|e| CacherError::cache_read(path, e))?;
        let modified = metadata
            .modified()
            .map_err(|e| CacherError::io(format!("reading mtime of {}", path.display()), e))?;

        artifacts.push(ArtifactInfo {
            key,
            path: path.to_path_buf(),
            size: metadata.len(),
            modified,
            rows: artifact_row_count(path).ok(),
        });
    }

    artifacts.sort_by(|a, b| a.key.cmp(&b.key));
    Ok(artifacts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::{BooleanArray, Float64Array, Int64Array, StringArray};
    use arrow::datatypes::{DataType, Field, Schema};
    use arrow::record_batch::RecordBatch;
    use std::sync::Arc;
    use tempfile::tempdir;

    fn sample_table() -> Table {
        let schema = Arc::new(Schema::new(vec![
            Field::new("id", DataType::Int64, true),
            Field::new("score", DataType::Float64, true),
            Field::new("name", DataType::Utf8, true),
            Field::new("active", DataType::Boolean, true),
        ]));
        let batch = RecordBatch::try_new(
            schema,
            vec![
                Arc::new(Int64Array::from(vec![Some(1), Some(2), None])),
                Arc::new(Float64Array::from(vec![Some(0.5), None, Some(2.25)])),
                Arc::new(StringArray::from(vec![Some("a"), Some("b"), None])),
                Arc::new(BooleanArray::from(vec![Some(true), Some(false), None])),
            ],
        )
        .unwrap();
        Table::from_batch(batch)
    }

    #[test]
    fn test_ensure_cache_dir_creates() {
        let temp = tempdir().unwrap();
        let cache = temp.path().join("nested").join("cache");
        ensure_cache_dir(&cache).unwrap();
        assert!(cache.is_dir());
    }

    #[test]
    fn test_ensure_cache_dir_rejects_file() {
        let temp = tempdir().unwrap();
        let cache = temp.path().join("cache");
        fs::write(&cache, "not a dir").unwrap();

        let err = ensure_cache_dir(&cache).unwrap_err();
        assert!(matches!(err, CacherError::CacheWrite { .. }));
    }

    #[test]
    fn test_write_read_artifact() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("sample.parquet");
        let table = sample_table();

        write_artifact(&path, &table, ArtifactCompression::Snappy).unwrap();
        assert!(path.exists());
        assert!(!temp.path().join("sample.parquet.tmp").exists());

        let read = read_artifact(&path).unwrap();
        assert!(read.same_content(&table).unwrap());
        assert_eq!(artifact_row_count(&path).unwrap(), 3);
    }

    #[test]
    fn test_write_artifact_with_each_codec() {
        let temp = tempdir().unwrap();
        let table = sample_table();

        for compression in [
            ArtifactCompression::Zstd,
            ArtifactCompression::Gzip,
            ArtifactCompression::None,
        ] {
            let path = temp.path().join(format!("{:?}.parquet", compression));
            write_artifact(&path, &table, compression).unwrap();
            assert!(read_artifact(&path).unwrap().same_content(&table).unwrap());
        }
    }

    #[test]
    fn test_read_corrupt_artifact() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("broken.parquet");
        fs::write(&path, b"definitely not parquet").unwrap();

        let err = read_artifact(&path).unwrap_err();
        assert!(matches!(err, CacherError::CacheRead { .. }));
    }

    #[test]
    fn test_list_artifacts() {
        let temp = tempdir().unwrap();
        let table = sample_table();
        write_artifact(&temp.path().join("b.parquet"), &table, Default::default()).unwrap();
        write_artifact(&temp.path().join("a.parquet"), &table, Default::default()).unwrap();
        fs::write(temp.path().join("notes.txt"), "ignored").unwrap();
        fs::write(temp.path().join("junk.parquet"), "corrupt").unwrap();

        let artifacts = list_artifacts(temp.path()).unwrap();
        let keys: Vec<_> = artifacts.iter().map(|a| a.key.as_str()).collect();
        assert_eq!(keys, vec!["a", "b", "junk"]);
        assert_eq!(artifacts[0].rows, Some(3));
        assert_eq!(artifacts[2].rows, None);
    }

    #[test]
    fn test_list_artifacts_missing_dir() {
        let temp = tempdir().unwrap();
        let artifacts = list_artifacts(&temp.path().join("nope")).unwrap();
        assert!(artifacts.is_empty());
    }

    #[test]
    fn test_parse_compression() {
        assert_eq!(
            "ZSTD".parse::<ArtifactCompression>(),
            Ok(ArtifactCompression::Zstd)
        );
        assert_eq!(
            "uncompressed".parse::<ArtifactCompression>(),
            Ok(ArtifactCompression::None)
        );
        assert!("lzma".parse::<ArtifactCompression>().is_err());
    }
}
