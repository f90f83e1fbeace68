use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use crate::CliError;

const DEFAULT_FILTER: &str = "info";

/// Install the stderr log subscriber. `--log-level` wins over `RUST_LOG`,
/// which wins over the `info` default. Records from the `log` facade used by
/// the library crates are bridged in by `init`.
pub fn init(level: Option<&str>) -> Result<(), CliError> {
    let filter = match level {
        Some(directives) => EnvFilter::try_new(directives).map_err(|e| {
            CliError::usage(format!("invalid --log-level '{directives}': {e}"))
                .with_hint("use a level such as `debug`, or directives like `info,tablemerge_client=debug`")
        })?,
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER)),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .try_init()
        .map_err(|e| CliError::general(format!("cannot initialize logging: {e}")))
}
