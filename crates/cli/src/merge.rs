//! `tmerge merge`, `tmerge verify` and `tmerge validate`.

use std::path::{Path, PathBuf};

use clap::Args;
use log::info;
use tablemerge_client::{ClientError, TableClient};
use tablemerge_reconcile::{
    MergeConfig, MergeError, MergeOptions, MergeResult, Merger, MERGE_TABLE_CONFIG_ENV,
};

use crate::exit_codes::{
    EXIT_ERROR, EXIT_MERGE_ACCESS, EXIT_MERGE_CONFIG, EXIT_MERGE_MISSING_TOKEN, EXIT_MERGE_NETWORK,
    EXIT_MERGE_REMOTE, EXIT_MERGE_RETRY_EXHAUSTED,
};
use crate::CliError;

/// Where the config comes from and which token to use.
#[derive(Args, Debug)]
pub struct ConnectArgs {
    /// Path to the merge config (.toml or .json). Without it, the JSON in
    /// $MERGE_TABLE_CONFIG is used.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Coda API token
    #[arg(long, env = "CODA_API_TOKEN", hide_env_values = true)]
    pub token: Option<String>,
}

#[derive(Args, Debug)]
pub struct MergeArgs {
    #[command(flatten)]
    pub connect: ConnectArgs,

    /// Print the merge result as JSON on stdout
    #[arg(long)]
    pub json: bool,

    /// Compute the changes without writing anything
    #[arg(long)]
    pub dry_run: bool,
}

pub fn cmd_merge(args: MergeArgs) -> Result<(), CliError> {
    let merger = connect(&args.connect)?;
    let result = merger
        .run(MergeOptions { dry_run: args.dry_run })
        .map_err(merge_error)?;

    if args.json {
        let json = serde_json::to_string_pretty(&result)
            .map_err(|e| CliError::general(format!("cannot serialize result: {e}")))?;
        println!("{json}");
    } else {
        print!("{}", render_summary(&result));
    }
    Ok(())
}

pub fn cmd_verify(args: ConnectArgs) -> Result<(), CliError> {
    let merger = connect(&args)?;
    merger.verify().map_err(merge_error)?;

    let config = merger.config();
    println!(
        "Access OK: destination {}/{} and {} source document(s)",
        config.destination_doc_id,
        config.destination_table_id,
        config.source_tables.len()
    );
    Ok(())
}

pub fn cmd_validate(path: PathBuf) -> Result<(), CliError> {
    let config = load_config(Some(&path))?;

    println!("{}: valid", path.display());
    println!(
        "  destination: {}/{}",
        config.destination_doc_id, config.destination_table_id
    );
    for (i, src) in config.source_tables.iter().enumerate() {
        println!(
            "  source {}:    {}/{} ({})",
            i + 1,
            src.doc_id,
            src.table_id,
            src.project_label(i + 1)
        );
    }
    if !config.column_mappings.is_empty() {
        println!("  mappings:    {}", config.column_mappings.len());
    }
    Ok(())
}

// ============================================================================
// Setup
// ============================================================================

fn connect(args: &ConnectArgs) -> Result<Merger<TableClient>, CliError> {
    let config = load_config(args.config.as_deref())?;
    let token = resolve_token(args.token.as_deref())?;
    let client = TableClient::with_settings(token, config.client.clone()).map_err(|e| {
        CliError::new(EXIT_MERGE_CONFIG, e.to_string()).with_hint("check the [client] section")
    })?;
    info!(
        "Merging {} source table(s) into {}/{}",
        config.source_tables.len(),
        config.destination_doc_id,
        config.destination_table_id
    );
    Ok(Merger::new(client, config))
}

fn load_config(path: Option<&Path>) -> Result<MergeConfig, CliError> {
    let config_error = |e: MergeError| CliError::new(EXIT_MERGE_CONFIG, e.to_string());

    match path {
        Some(path) => MergeConfig::load(path).map_err(config_error),
        None => match std::env::var(MERGE_TABLE_CONFIG_ENV) {
            Ok(json) => MergeConfig::from_json(&json)
                .map_err(config_error)
                .map_err(|e| e.with_hint(format!("{MERGE_TABLE_CONFIG_ENV} must hold the config as JSON"))),
            Err(_) => Err(CliError::new(EXIT_MERGE_CONFIG, "no merge configuration")
                .with_hint(format!("pass --config FILE or set {MERGE_TABLE_CONFIG_ENV}"))),
        },
    }
}

/// `--token` (or `CODA_API_TOKEN`, which clap folds into the same flag), trimmed.
fn resolve_token(token: Option<&str>) -> Result<String, CliError> {
    match token.map(str::trim) {
        Some(t) if !t.is_empty() => Ok(t.to_string()),
        _ => Err(CliError::new(EXIT_MERGE_MISSING_TOKEN, "no Coda API token")
            .with_hint("pass --token or set CODA_API_TOKEN")),
    }
}

// ============================================================================
// Output + errors
// ============================================================================

fn render_summary(result: &MergeResult) -> String {
    let mut out = String::new();
    if result.dry_run {
        out.push_str("Dry run: no changes written\n");
    }
    out.push_str(&format!(
        "Processed {} source rows into {}\n",
        result.total_rows_processed, result.destination_table_id
    ));
    out.push_str(&format!("  new:        {}\n", result.new_rows));
    out.push_str(&format!("  updated:    {}\n", result.updated_rows));
    out.push_str(&format!("  deleted:    {}\n", result.deleted_rows));
    out.push_str(&format!("  duplicates: {}\n", result.duplicates_removed));
    out
}

fn merge_error(err: MergeError) -> CliError {
    let message = err.to_string();
    match &err {
        MergeError::Config(_) => CliError::new(EXIT_MERGE_CONFIG, message),
        MergeError::Access { source, .. } => match client_exit_code(source) {
            code @ (EXIT_MERGE_NETWORK | EXIT_MERGE_RETRY_EXHAUSTED) => {
                with_client_hint(CliError::new(code, message), source)
            }
            _ => with_client_hint(CliError::new(EXIT_MERGE_ACCESS, message), source),
        },
        MergeError::Remote { source, .. } => {
            with_client_hint(CliError::new(client_exit_code(source), message), source)
                .with_hint_if_none("earlier write batches may have been applied; rerunning the merge is safe")
        }
    }
}

fn client_exit_code(err: &ClientError) -> u8 {
    match err {
        ClientError::Api { .. } => EXIT_MERGE_REMOTE,
        ClientError::RetryExhausted { .. } => EXIT_MERGE_RETRY_EXHAUSTED,
        ClientError::Timeout(_) | ClientError::Network(_) => EXIT_MERGE_NETWORK,
        ClientError::InvalidConfig(_) => EXIT_MERGE_CONFIG,
        ClientError::Parse(_) => EXIT_ERROR,
    }
}

fn with_client_hint(cli: CliError, err: &ClientError) -> CliError {
    match err {
        ClientError::Api { status: 401, .. } => cli.with_hint("the API token was rejected; check CODA_API_TOKEN"),
        ClientError::Api { status: 403, .. } => cli.with_hint("the token's account cannot access this document"),
        ClientError::Api { status: 404, .. } => cli.with_hint("check the doc and table ids in the config"),
        ClientError::RetryExhausted { last_status: 429, .. } => {
            cli.with_hint("the service is rate limiting; retry later or lower [client] batch_size")
        }
        ClientError::RetryExhausted { .. } => cli.with_hint("the service is unavailable; retry later"),
        ClientError::Timeout(_) => cli.with_hint("raise [client] timeout_secs for very large tables"),
        _ => cli,
    }
}

impl CliError {
    fn with_hint_if_none(self, hint: &str) -> Self {
        if self.hint.is_some() {
            self
        } else {
            self.with_hint(hint)
        }
    }
}
