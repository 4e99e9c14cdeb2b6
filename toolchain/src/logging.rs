//! Diagnostic tracing for the toolchain.
//!
//! Tracing goes to stderr and is controlled by `RUST_LOG`. It is separate from
//! the user-facing summaries (configuration table, PASS/FAIL lines) commands
//! print to stdout.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize the tracing subscriber.
///
/// Reads `RUST_LOG`, defaulting to `warn`. Output: stderr, compact format.
///
/// # Example
/// ```bash
/// RUST_LOG=toolchain=debug toolchain run case.py -t simulation
/// ```
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).compact())
        .init();
}
