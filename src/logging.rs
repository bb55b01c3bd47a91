//! Tracing subscriber setup.
//!
//! Console logging goes to stderr so the news summary on stdout stays
//! machine-readable.  `RUST_LOG` overrides the level chosen by the
//! `--verbose` flag.

use tracing_subscriber::EnvFilter;

/// Initialize the global tracing subscriber.
///
/// Safe to call more than once; only the first call installs a subscriber
/// (later calls, e.g. from tests, are ignored).
pub fn init(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
