//! Logging initialization.
//!
//! Diagnostics go through `tracing` to stderr, human-readable or JSON.
//! Progress lines meant for the user are printed to stdout by [`crate::output`]
//! and are not affected by the log level.

use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Initialize the global subscriber.
///
/// * `verbose` - DEBUG level instead of INFO.
/// * `json_format` - one JSON object per event instead of formatted text.
///
/// `RUST_LOG` overrides the level when set.
pub fn init(verbose: bool, json_format: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    if json_format {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_writer(std::io::stderr),
            )
            .init();
    }
}
