// tmerge - merge Coda source tables into one destination table

mod exit_codes;
mod logging;
mod merge;

use std::process::ExitCode;

use clap::{Parser, Subcommand};

use exit_codes::{EXIT_ERROR, EXIT_SUCCESS, EXIT_USAGE};
use merge::{ConnectArgs, MergeArgs};

#[derive(Parser)]
#[command(name = "tmerge")]
#[command(about = "Merge rows from several Coda tables into one destination table")]
#[command(version)]
#[command(long_version = long_version())]
struct Cli {
    /// Log filter, e.g. `debug` or `info,tablemerge_client=debug` (overrides RUST_LOG)
    #[arg(long, global = true, value_name = "FILTER")]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a merge
    #[command(after_help = "\
Examples:
  tmerge merge --config merge.toml
  tmerge merge --config merge.toml --json
  tmerge merge --config merge.toml --dry-run
  MERGE_TABLE_CONFIG='{...}' CODA_API_TOKEN=... tmerge merge")]
    Merge(MergeArgs),

    /// Check the token and that every configured document is reachable
    #[command(after_help = "\
Examples:
  tmerge verify --config merge.toml")]
    Verify(ConnectArgs),

    /// Parse and validate a config file without contacting the service
    #[command(after_help = "\
Examples:
  tmerge validate --config merge.toml")]
    Validate {
        /// Path to the merge config (.toml or .json)
        #[arg(long)]
        config: std::path::PathBuf,
    },
}

fn long_version() -> &'static str {
    concat!(
        env!("CARGO_PKG_VERSION"),
        " (", env!("TMERGE_COMMIT"), ")",
        "\ntarget:  ", env!("TMERGE_TARGET"),
        "\napi:     https://coda.io/apis/v1",
    )
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let result = logging::init(cli.log_level.as_deref()).and_then(|()| match cli.command {
        Commands::Merge(args) => merge::cmd_merge(args),
        Commands::Verify(args) => merge::cmd_verify(args),
        Commands::Validate { config } => merge::cmd_validate(config),
    });

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn new(code: u8, message: impl Into<String>) -> Self {
        Self { code, message: message.into(), hint: None }
    }

    pub fn usage(message: impl Into<String>) -> Self {
        Self::new(EXIT_USAGE, message)
    }

    pub fn general(message: impl Into<String>) -> Self {
        Self::new(EXIT_ERROR, message)
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}
