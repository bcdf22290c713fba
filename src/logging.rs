//! Logging setup shared by the binaries
//!
//! Diagnostics go to stderr; stdout is reserved for tool output.

use tracing_subscriber::EnvFilter;

/// Install the global tracing subscriber
///
/// `RUST_LOG` overrides the default filter when set.
pub fn setup_logging(verbose: bool) {
    let default = if verbose {
        "job_walker=debug,warn"
    } else {
        "warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_names(verbose)
        .with_file(false)
        .with_line_number(false)
        .init();
}
