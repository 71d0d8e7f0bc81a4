//! Readers module - Reader capabilities and the named cache entry points
//!
//! Provides:
//! - csv: CSV files via arrow's CSV reader
//! - json: JSON record arrays and newline-delimited JSON
//! - excel: .xlsx/.xls workbooks via calamine
//! - sql: SQL queries against SQLite via rusqlite
//!
//! Each `cache_*` function is the same resolver with a different default
//! reader. Custom readers plug into `CacheResolver` directly.

pub mod columns;
pub mod csv;
pub mod excel;
pub mod json;
pub mod sql;

use std::path::{Path, PathBuf};

use crate::cache::resolver::{CacheResolver, TargetMode};
use crate::core::model::{ReaderOptions, SourceDescriptor, Table};
use crate::core::paths::dotted_extension;
use crate::error::CacherResult;

/// What a reader is asked to read
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadTarget {
    Path(PathBuf),
    Query(String),
}

impl ReadTarget {
    /// Display name for errors
    pub fn name(&self) -> String {
        match self {
            ReadTarget::Path(path) => path.display().to_string(),
            ReadTarget::Query(query) => query.clone(),
        }
    }
}

/// Converts a read target plus options into a table
pub trait TableReader {
    fn read(&self, target: &ReadTarget, options: &ReaderOptions) -> CacherResult<Table>;
}

impl<F> TableReader for F
where
    F: Fn(&ReadTarget, &ReaderOptions) -> CacherResult<Table>,
{
    fn read(&self, target: &ReadTarget, options: &ReaderOptions) -> CacherResult<Table> {
        self(target, options)
    }
}

/// Signature shared by the built-in readers
pub type ReadFn = fn(&ReadTarget, &ReaderOptions) -> CacherResult<Table>;

/// Supported tabular source kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Csv,
    Json,
    Excel,
    Sql,
}

impl SourceKind {
    pub const ALL: [SourceKind; 4] = [
        SourceKind::Csv,
        SourceKind::Json,
        SourceKind::Excel,
        SourceKind::Sql,
    ];

    /// Accepted file extensions
    pub fn suffixes(self) -> &'static [&'static str] {
        match self {
            SourceKind::Csv => &[".csv"],
            SourceKind::Json => &[".json"],
            SourceKind::Excel => &[".xlsx", ".xls"],
            SourceKind::Sql => &[".sql"],
        }
    }

    /// Default reader capability
    pub fn reader(self) -> ReadFn {
        match self {
            SourceKind::Csv => csv::read_csv,
            SourceKind::Json => json::read_json,
            SourceKind::Excel => excel::read_excel,
            SourceKind::Sql => sql::read_sql,
        }
    }

    /// SQL files hold the query; everything else is read from its path
    pub fn target_mode(self) -> TargetMode {
        match self {
            SourceKind::Sql => TargetMode::FileContents,
            _ => TargetMode::Path,
        }
    }

    /// Resolver wired with this kind's reader, suffixes and target mode
    pub fn resolver(self) -> CacheResolver<ReadFn> {
        CacheResolver::new(self.reader())
            .with_suffixes(self.suffixes())
            .with_target_mode(self.target_mode())
    }

    /// Guess the kind from a file extension
    pub fn from_path(path: &Path) -> Option<SourceKind> {
        let ext = dotted_extension(path)?;
        SourceKind::ALL
            .into_iter()
            .find(|kind| kind.suffixes().contains(&ext.as_str()))
    }

    pub fn name(self) -> &'static str {
        match self {
            SourceKind::Csv => "csv",
            SourceKind::Json => "json",
            SourceKind::Excel => "excel",
            SourceKind::Sql => "sql",
        }
    }
}

fn cache_kind(
    kind: SourceKind,
    filepath: &Path,
    cache_dir: &Path,
    use_cache: bool,
    options: &ReaderOptions,
) -> CacherResult<Table> {
    kind.resolver()
        .resolve(&SourceDescriptor::file(filepath), cache_dir, use_cache, options)
}

/// Cache a CSV file as `{cache_dir}/{stem}.parquet`
///
/// `some_data.csv -> cache_dir/some_data.parquet`
pub fn cache_csv(
    filepath: impl AsRef<Path>,
    cache_dir: impl AsRef<Path>,
    use_cache: bool,
    options: &ReaderOptions,
) -> CacherResult<Table> {
    cache_kind(
        SourceKind::Csv,
        filepath.as_ref(),
        cache_dir.as_ref(),
        use_cache,
        options,
    )
}

/// Cache a JSON file (record array or newline-delimited)
pub fn cache_json(
    filepath: impl AsRef<Path>,
    cache_dir: impl AsRef<Path>,
    use_cache: bool,
    options: &ReaderOptions,
) -> CacherResult<Table> {
    cache_kind(
        SourceKind::Json,
        filepath.as_ref(),
        cache_dir.as_ref(),
        use_cache,
        options,
    )
}

/// Cache a worksheet from an .xlsx/.xls workbook
pub fn cache_excel(
    filepath: impl AsRef<Path>,
    cache_dir: impl AsRef<Path>,
    use_cache: bool,
    options: &ReaderOptions,
) -> CacherResult<Table> {
    cache_kind(
        SourceKind::Excel,
        filepath.as_ref(),
        cache_dir.as_ref(),
        use_cache,
        options,
    )
}

/// Cache the result of the query stored in a .sql file
///
/// Requires a `con` option naming the SQLite database.
pub fn cache_sql(
    filepath: impl AsRef<Path>,
    cache_dir: impl AsRef<Path>,
    use_cache: bool,
    options: &ReaderOptions,
) -> CacherResult<Table> {
    cache_kind(
        SourceKind::Sql,
        filepath.as_ref(),
        cache_dir.as_ref(),
        use_cache,
        options,
    )
}
