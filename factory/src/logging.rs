//! Diagnostic tracing for the pipeline.
//!
//! Tracing goes to stderr and is controlled by `RUST_LOG`. It is not the audit
//! trail: prompts, patches, and versions are persisted in the run directory
//! (`io/run_store`) regardless of the log level.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Install the stderr subscriber. Reads `RUST_LOG`, defaulting to `warn`.
///
/// ```bash
/// RUST_LOG=factory=debug cf render 20250101_120000_remote-work -p linkedin
/// ```
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).compact())
        .try_init()
        .ok();
}
