//! Logging and tracing configuration
//!
//! The CLI logs result trees through tracing, so the subscriber is
//! installed once at startup before anything runs.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize tracing for the CLI (stderr logging)
///
/// Logs are controlled by the `RUST_LOG` environment variable.
/// Default level is INFO for this crate, WARN for dependencies;
/// `verbose` raises the crate level to DEBUG.
pub fn init_cli(verbose: bool) {
    let default = if verbose {
        "vouch=debug,info"
    } else {
        "vouch=info,warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false)
                .compact(),
        )
        .init();
}
