//! CLI module - Command-line interface definitions and handlers

use anyhow::{bail, Result};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::cache::resolver::{CacheDecision, Resolution};
use crate::cache::store::list_artifacts;
use crate::config::Config;
use crate::core::model::{ReaderOptions, SourceDescriptor};
use crate::core::paths::{artifact_path, normalize_path};
use crate::core::render::{OutputFormat, Renderer};
use crate::core::util::{format_size, format_time};
use crate::readers::SourceKind;

/// tabcache - cache expensive tabular reads as Parquet artifacts.
#[derive(Parser, Debug)]
#[command(name = "tabcache")]
#[command(
    author,
    version,
    about,
    long_about = r#"tabcache reads CSV, JSON, Excel and SQL sources once and keeps the result as
{cache-dir}/{stem}.parquet. Later reads decode the Parquet artifact instead of
re-parsing the source, until the source file is modified.

Table output formats:
- jsonl: one JSON object per row (default)
- json: a single JSON array
- md: a Markdown table under a row/column summary
- csv: comma-separated with a header row

Examples:
    tabcache csv data/raw/some_data.csv
    tabcache excel data/raw/excel_data.xlsx -o sheet_name=Q1
    tabcache sql data/raw/queries/some_query.sql --con data/warehouse.db
    tabcache status data/raw/some_data.csv data/raw/excel_data.xlsx
    tabcache list
"#
)]
pub struct Cli {
    /// Directory holding cache artifacts.
    #[arg(
        long,
        global = true,
        env = "TABCACHE_CACHE_DIR",
        value_name = "DIR",
        long_help = "Directory holding the Parquet artifacts. Created on first write.\n\n\
Overrides `cache.dir` from the config file. Defaults to ./cache."
    )]
    pub cache_dir: Option<PathBuf>,

    /// Path to a config file.
    #[arg(
        long,
        global = true,
        value_name = "FILE",
        long_help = "Read configuration from FILE instead of ./tabcache.toml.\n\n\
The file must exist when given explicitly."
    )]
    pub config: Option<PathBuf>,

    /// Output format for tables (jsonl/json/md/csv).
    #[arg(
        long,
        global = true,
        default_value = "jsonl",
        value_name = "FORMAT",
        long_help = "Select the output format for tables.\n\n\
Supported values:\n\
- jsonl (default)\n\
- json\n\
- md (markdown)\n\
- csv"
    )]
    pub format: String,

    /// Disable colored output (when applicable).
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Quiet mode (errors only on stderr).
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Verbose mode (-v for info, -vv for debug).
    #[arg(
        short,
        long,
        global = true,
        action = clap::ArgAction::Count,
        long_help = "Increase log verbosity on stderr. -v reports cache decisions and artifact\n\
writes, -vv adds debug details. RUST_LOG overrides this flag."
    )]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

/// Arguments shared by every source command
#[derive(Args, Debug)]
pub struct SourceArgs {
    /// Source file.
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    /// Ignore any existing artifact and rebuild it.
    #[arg(
        long,
        long_help = "Always re-read the source and overwrite the artifact, even when it is fresh.\n\n\
Use this to recover from a corrupt artifact."
    )]
    pub no_cache: bool,

    /// Reader option as key=value (repeatable).
    #[arg(
        short = 'o',
        long = "option",
        value_name = "KEY=VALUE",
        long_help = "Option forwarded to the reader, as key=value. Repeatable.\n\n\
VALUE is parsed as JSON when possible (true, 3, \"x\"), otherwise taken as a string.\n\n\
Example: -o delimiter=';' -o has_header=false"
    )]
    pub options: Vec<String>,

    /// Print at most N rows.
    #[arg(long, value_name = "N")]
    pub limit: Option<usize>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Read a CSV file through the cache.
    #[command(long_about = "Read a .csv file through the cache.\n\n\
Reader options: delimiter, quote, has_header, infer_rows, batch_size.\n\n\
Example:\n\
  tabcache csv data/raw/some_data.csv -o delimiter=';'\n")]
    Csv(SourceArgs),

    /// Read a JSON file through the cache.
    #[command(long_about = "Read a .json file (array of records or newline-delimited records)\n\
through the cache.\n\n\
Reader options: lines, batch_size.\n")]
    Json(SourceArgs),

    /// Read an Excel workbook through the cache.
    #[command(long_about = "Read one worksheet of an .xlsx/.xls workbook through the cache.\n\n\
Reader options: sheet_name, sheet (zero-based index), header.\n\n\
Example:\n\
  tabcache excel data/raw/excel_data.xlsx -o sheet_name=Q1\n")]
    Excel(SourceArgs),

    /// Run the query in a .sql file through the cache.
    #[command(long_about = "Run the query stored in a .sql file against a SQLite database and\n\
cache the result. The artifact is rebuilt when the .sql file changes, not when\n\
the database changes; use --no-cache after loading new data.\n\n\
Example:\n\
  tabcache sql queries/some_query.sql --con warehouse.db\n")]
    Sql {
        #[command(flatten)]
        source: SourceArgs,

        /// SQLite database path or sqlite:// URI.
        #[arg(long, value_name = "DB")]
        con: String,
    },

    /// Show whether each source would be reused or rebuilt.
    #[command(long_about = "Report the cache decision for each FILE without reading or writing\n\
anything. The source kind is inferred from the extension.\n\n\
Example:\n\
  tabcache status data/raw/some_data.csv data/raw/excel_data.xlsx\n")]
    Status {
        /// Source files.
        #[arg(value_name = "FILE", required = true, num_args = 1..)]
        files: Vec<PathBuf>,
    },

    /// List artifacts in the cache directory.
    List,
}

/// Run the CLI with parsed arguments
pub fn run(cli: Cli, config: Config) -> Result<()> {
    let format: OutputFormat = match cli.format.parse() {
        Ok(format) => format,
        Err(e) => bail!(e),
    };
    let cache_dir = cli.cache_dir.clone().unwrap_or(config.cache.dir.clone());

    match cli.command {
        Commands::Csv(args) => run_source(SourceKind::Csv, args, None, &cache_dir, &config, format),
        Commands::Json(args) => {
            run_source(SourceKind::Json, args, None, &cache_dir, &config, format)
        }
        Commands::Excel(args) => {
            run_source(SourceKind::Excel, args, None, &cache_dir, &config, format)
        }
        Commands::Sql { source, con } => run_source(
            SourceKind::Sql,
            source,
            Some(con),
            &cache_dir,
            &config,
            format,
        ),
        Commands::Status { files } => run_status(&files, &cache_dir),
        Commands::List => run_list(&cache_dir),
    }
}

/// Resolve one source and print the table
fn run_source(
    kind: SourceKind,
    args: SourceArgs,
    con: Option<String>,
    cache_dir: &Path,
    config: &Config,
    format: OutputFormat,
) -> Result<()> {
    let mut options = ReaderOptions::new();
    for pair in &args.options {
        let (key, value) = ReaderOptions::parse_pair(pair)?;
        options.insert(key, value);
    }
    if let Some(con) = con {
        options.insert("con", con);
    }

    let resolver = kind.resolver().with_compression(config.cache.compression);
    let Resolution {
        table,
        decision,
        artifact,
    } = resolver.resolve_detailed(
        &SourceDescriptor::file(&args.file),
        cache_dir,
        !args.no_cache,
        &options,
    )?;

    info!(
        "{} {} -> {} ({} rows)",
        decision,
        normalize_path(&args.file),
        normalize_path(&artifact),
        table.num_rows()
    );

    let table = match args.limit {
        Some(limit) => table.head(limit),
        None => table,
    };

    let output = Renderer::new(format).render(&table)?;
    if !output.is_empty() {
        println!("{}", output);
    }
    Ok(())
}

/// Print the cache decision for each file
fn run_status(files: &[PathBuf], cache_dir: &Path) -> Result<()> {
    for file in files {
        let kind = match SourceKind::from_path(file) {
            Some(kind) => kind,
            None => bail!("Cannot infer the source kind of {}", file.display()),
        };

        let source = SourceDescriptor::file(file);
        let decision = kind.resolver().decide(&source, cache_dir, true)?;
        let artifact = artifact_path(cache_dir, &source.cache_key()?);

        let label = match decision {
            CacheDecision::Reuse => "reuse".green(),
            CacheDecision::Rebuild(_) => "rebuild".yellow(),
        };
        println!(
            "{:<7} {:<5} {} -> {} [{}]",
            label,
            kind.name(),
            normalize_path(file),
            normalize_path(&artifact),
            decision
        );
    }
    Ok(())
}

/// Print artifacts under the cache directory
fn run_list(cache_dir: &Path) -> Result<()> {
    let artifacts = list_artifacts(cache_dir)?;

    if artifacts.is_empty() {
        println!("No artifacts in {}", normalize_path(cache_dir));
        return Ok(());
    }

    for artifact in artifacts {
        let rows = match artifact.rows {
            Some(rows) => format!("{} rows", rows),
            None => "unreadable".red().to_string(),
        };
        println!(
            "{:<24} {:>10}  {}  {}",
            artifact.key,
            format_size(artifact.size),
            format_time(artifact.modified),
            rows
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_source_command() {
        let cli = Cli::try_parse_from([
            "tabcache",
            "--cache-dir",
            "/tmp/c",
            "csv",
            "a.csv",
            "--no-cache",
            "-o",
            "delimiter=;",
            "-o",
            "has_header=false",
        ])
        .unwrap();

        assert_eq!(cli.cache_dir, Some(PathBuf::from("/tmp/c")));
        match cli.command {
            Commands::Csv(args) => {
                assert_eq!(args.file, PathBuf::from("a.csv"));
                assert!(args.no_cache);
                assert_eq!(args.options, vec!["delimiter=;", "has_header=false"]);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_parse_sql_requires_con() {
        assert!(Cli::try_parse_from(["tabcache", "sql", "q.sql"]).is_err());

        let cli = Cli::try_parse_from(["tabcache", "sql", "q.sql", "--con", "db.sqlite"]).unwrap();
        match cli.command {
            Commands::Sql { source, con } => {
                assert_eq!(source.file, PathBuf::from("q.sql"));
                assert_eq!(con, "db.sqlite");
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_verbose_counts() {
        let cli = Cli::try_parse_from(["tabcache", "-vv", "list"]).unwrap();
        assert_eq!(cli.verbose, 2);
    }
}
