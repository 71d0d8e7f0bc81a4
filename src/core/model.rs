//! Data model shared by readers, the artifact store and the resolver
//!
//! - `Table`: in-memory tabular data (Arrow schema + record batches)
//! - `ReaderOptions`: opaque key/value options forwarded to a reader
//! - `SourceDescriptor`: what to read and under which cache key

use arrow::compute::concat_batches;
use arrow::datatypes::{Schema, SchemaRef};
use arrow::record_batch::RecordBatch;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::core::paths::{check_cache_key, file_stem};
use crate::error::{CacherError, CacherResult};

/// Tabular data held as Arrow record batches sharing one schema
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    schema: SchemaRef,
    batches: Vec<RecordBatch>,
}

impl Table {
    /// Create a table from a schema and batches that conform to it
    pub fn new(schema: SchemaRef, batches: Vec<RecordBatch>) -> Self {
        Self { schema, batches }
    }

    /// Create a single-batch table
    pub fn from_batch(batch: RecordBatch) -> Self {
        Self {
            schema: batch.schema(),
            batches: vec![batch],
        }
    }

    /// Create a table with a schema and no rows
    pub fn empty(schema: SchemaRef) -> Self {
        Self {
            schema,
            batches: Vec::new(),
        }
    }

    pub fn schema(&self) -> &SchemaRef {
        &self.schema
    }

    pub fn batches(&self) -> &[RecordBatch] {
        &self.batches
    }

    pub fn num_rows(&self) -> usize {
        self.batches.iter().map(|b| b.num_rows()).sum()
    }

    pub fn num_columns(&self) -> usize {
        self.schema.fields().len()
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.schema
            .fields()
            .iter()
            .map(|f| f.name().as_str())
            .collect()
    }

    /// Concatenate all batches into one
    pub fn to_batch(&self) -> CacherResult<RecordBatch> {
        if self.batches.is_empty() {
            return Ok(RecordBatch::new_empty(self.schema.clone()));
        }
        Ok(concat_batches(&self.schema, &self.batches)?)
    }

    /// Keep at most `limit` leading rows
    pub fn head(&self, limit: usize) -> Table {
        let mut remaining = limit;
        let mut batches = Vec::new();

        for batch in &self.batches {
            if remaining == 0 {
                break;
            }
            let take = remaining.min(batch.num_rows());
            batches.push(batch.slice(0, take));
            remaining -= take;
        }

        Table::new(self.schema.clone(), batches)
    }

    /// Compare column names, column types and values, ignoring batch layout
    /// and schema metadata
    pub fn same_content(&self, other: &Table) -> CacherResult<bool> {
        let shape_matches = self.num_columns() == other.num_columns()
            && self
                .schema
                .fields()
                .iter()
                .zip(other.schema.fields().iter())
                .all(|(a, b)| a.name() == b.name() && a.data_type() == b.data_type());

        if !shape_matches || self.num_rows() != other.num_rows() {
            return Ok(false);
        }

        let left = self.to_batch()?;
        let right = other.to_batch()?;
        Ok(left.columns() == right.columns())
    }
}

impl Default for Table {
    fn default() -> Self {
        Table::empty(Arc::new(Schema::empty()))
    }
}

/// Options forwarded verbatim to a reader
///
/// Keys are strings, values are arbitrary JSON values. The resolver never
/// looks inside; each reader pulls out the keys it understands.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReaderOptions(BTreeMap<String, Value>);

impl ReaderOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Parse a `key=value` pair, reading the value as JSON when possible and
    /// as a plain string otherwise
    pub fn parse_pair(pair: &str) -> CacherResult<(String, Value)> {
        let (key, raw) = pair
            .split_once('=')
            .ok_or_else(|| CacherError::invalid_option(pair, "expected key=value"))?;

        let key = key.trim();
        if key.is_empty() {
            return Err(CacherError::invalid_option(pair, "empty option name"));
        }

        let value = serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
        Ok((key.to_string(), value))
    }

    pub fn get_bool(&self, key: &str) -> CacherResult<Option<bool>> {
        match self.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Bool(b)) => Ok(Some(*b)),
            Some(other) => Err(CacherError::invalid_option(
                key,
                format!("expected a boolean, got {}", other),
            )),
        }
    }

    pub fn get_str(&self, key: &str) -> CacherResult<Option<&str>> {
        match self.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.as_str())),
            Some(other) => Err(CacherError::invalid_option(
                key,
                format!("expected a string, got {}", other),
            )),
        }
    }

    pub fn get_usize(&self, key: &str) -> CacherResult<Option<usize>> {
        match self.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Number(n)) => n
                .as_u64()
                .map(|n| Some(n as usize))
                .ok_or_else(|| {
                    CacherError::invalid_option(key, format!("expected a non-negative integer, got {}", n))
                }),
            Some(other) => Err(CacherError::invalid_option(
                key,
                format!("expected a non-negative integer, got {}", other),
            )),
        }
    }

    /// Read a single-byte character option such as a delimiter
    pub fn get_byte(&self, key: &str) -> CacherResult<Option<u8>> {
        match self.get_str(key)? {
            None => Ok(None),
            Some(s) if s.len() == 1 => Ok(Some(s.as_bytes()[0])),
            Some(s) if s == "\\t" => Ok(Some(b'\t')),
            Some(s) => Err(CacherError::invalid_option(
                key,
                format!("expected a single ASCII character, got {:?}", s),
            )),
        }
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for ReaderOptions {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut options = ReaderOptions::new();
        for (key, value) in iter {
            options.insert(key, value);
        }
        options
    }
}

/// Identifies the raw data behind a cache artifact
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceDescriptor {
    /// A file on disk; its stem is the cache key unless overridden
    File { path: PathBuf, key: Option<String> },
    /// Inline query text; has no modification time of its own
    Query { text: String, key: String },
}

impl SourceDescriptor {
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self::File {
            path: path.into(),
            key: None,
        }
    }

    pub fn query(text: impl Into<String>, key: impl Into<String>) -> Self {
        Self::Query {
            text: text.into(),
            key: key.into(),
        }
    }

    /// Override the cache key
    pub fn with_key(self, key: impl Into<String>) -> Self {
        match self {
            Self::File { path, .. } => Self::File {
                path,
                key: Some(key.into()),
            },
            Self::Query { text, .. } => Self::Query {
                text,
                key: key.into(),
            },
        }
    }

    /// Name used to build the artifact file name
    ///
    /// Keys must stay flat: empty keys, `.`/`..` and keys containing a path
    /// separator are rejected before any path is built.
    pub fn cache_key(&self) -> CacherResult<String> {
        let key = match self {
            Self::File { key: Some(key), .. } => key.clone(),
            Self::File { path, key: None } => file_stem(path).ok_or_else(|| {
                CacherError::source_unavailable(
                    path.display().to_string(),
                    "cannot derive a cache key from this path",
                )
            })?,
            Self::Query { key, .. } => key.clone(),
        };

        check_cache_key(&key).map_err(|reason| CacherError::InvalidCacheKey {
            key: key.clone(),
            reason: reason.to_string(),
        })?;
        Ok(key)
    }

    /// Path of the backing file, if any
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::File { path, .. } => Some(path),
            Self::Query { .. } => None,
        }
    }

    /// Human-readable name for logs and errors
    pub fn display_name(&self) -> String {
        match self {
            Self::File { path, .. } => path.display().to_string(),
            Self::Query { key, .. } => format!("query:{}", key),
        }
    }
}
