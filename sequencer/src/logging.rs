//! Development-time tracing for debugging sequencing decisions.
//!
//! Diagnostics go to stderr via `RUST_LOG`. They are never part of CLI
//! stdout, which carries only command results.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_DIRECTIVE: &str = "warn";

/// Install the stderr subscriber for the CLI.
///
/// Reads `RUST_LOG`, falling back to `warn`. Output is compact and carries
/// no target prefix, since every event comes from this crate.
///
/// # Example
/// ```bash
/// RUST_LOG=sequencer=debug sequencer navigate continue
/// ```
pub fn init() {
    tracing_subscriber::registry()
        .with(env_filter())
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .compact(),
        )
        .init();
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVE))
}
