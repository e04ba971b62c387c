//! Diagnostic tracing for the simulator.
//!
//! Tracing goes to stderr and is controlled by `RUST_LOG`. The run summary
//! printed by the CLI goes to stdout and is unaffected.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Install the global tracing subscriber.
///
/// Reads `RUST_LOG`, defaulting to `warn`. Compact output on stderr. Safe to
/// call more than once; later calls are ignored.
///
/// # Example
/// ```bash
/// RUST_LOG=coresim=info coresim run --cores 3
/// ```
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).compact())
        .try_init();
}
