//! Log output for the pvm binary.
//!
//! The filter comes from `PVM_LOG` when set (same syntax as `RUST_LOG`),
//! otherwise from the `--verbose` flag. Logs go to stderr so they never mix
//! with command output on stdout.

use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Environment variable holding the log filter.
pub const LOG_ENV: &str = "PVM_LOG";

const VERBOSE_FILTER: &str = "pvm=debug,pvm_core=debug";
const DEFAULT_FILTER: &str = "warn";

/// Installs the global tracing subscriber.
pub fn init(verbose: bool) {
    let fallback = if verbose { VERBOSE_FILTER } else { DEFAULT_FILTER };
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(fallback));

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(verbose)
        .without_time();

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .init();
}
