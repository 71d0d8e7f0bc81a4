//! tabcache - Cache expensive tabular reads as Parquet artifacts
//!
//! A read of a CSV, JSON, Excel or SQL source is materialized once into
//! `{cache_dir}/{stem}.parquet`. Later reads decode that artifact instead,
//! until the source file's modification time moves past the artifact's.
//!
//! ```no_run
//! use tabcache::{cache_csv, ReaderOptions};
//!
//! let table = cache_csv("data/raw/some_data.csv", "data/raw/cache", true, &ReaderOptions::new())?;
//! println!("{} rows", table.num_rows());
//! # Ok::<(), tabcache::CacherError>(())
//! ```

pub mod cache;
pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod readers;

pub use crate::cache::{CacheDecision, CacheResolver, RebuildReason, Resolution};
pub use crate::core::model::{ReaderOptions, SourceDescriptor, Table};
pub use crate::error::{CacherError, CacherResult};
pub use crate::readers::{cache_csv, cache_excel, cache_json, cache_sql, ReadTarget, SourceKind, TableReader};
