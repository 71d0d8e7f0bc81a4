//! tabcache - CLI entry point
//!
//! Loads configuration, installs logging and dispatches to the CLI module.

use clap::Parser;
use colored::Colorize;
use std::process::ExitCode;
use tabcache::cli::{self, Cli};
use tabcache::config::{Config, LogFormat};
use tabcache::CacherError;
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    let cli = Cli::parse();

    if cli.no_color {
        colored::control::set_override(false);
    }

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {:#}", "Error:".red().bold(), e);
            if let Some(hint) = e.downcast_ref::<CacherError>().and_then(|e| e.hint()) {
                eprintln!("{} {}", "Hint:".yellow(), hint);
            }
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let cwd = std::env::current_dir()?;
    let config = Config::discover(cli.config.as_deref(), &cwd)?;

    init_logging(cli.verbose, cli.quiet, config.log.format);
    cli::run(cli, config)
}

/// 0 = warn, 1 = info, 2+ = debug; RUST_LOG overrides
fn init_logging(verbose: u8, quiet: bool, format: LogFormat) {
    let default = match (quiet, verbose) {
        (true, _) => "tabcache=error",
        (false, 0) => "tabcache=warn",
        (false, 1) => "tabcache=info",
        (false, _) => "tabcache=debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);

    match format {
        LogFormat::Text => builder.without_time().init(),
        LogFormat::Json => builder.json().init(),
    }
}
