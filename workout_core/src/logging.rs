//! Tracing setup shared by `wgen` and the test suites.
//!
//! Generation decisions (fragmentation reason, relaxed or unfilled slots,
//! clamped levels) are reported through `tracing`; this module only decides
//! where those events go.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Install the subscriber at `info`
pub fn init() {
    init_with_level("info")
}

/// Install the subscriber with `default_level` unless `RUST_LOG` is set
///
/// Events are written to stderr in the compact format; stdout is reserved
/// for sessions, which `wgen generate --json` prints for other programs.
pub fn init_with_level(default_level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact().with_writer(std::io::stderr))
        .init();
}

/// Debug-level subscriber routed through the test harness; safe to call
/// from every test
#[cfg(test)]
pub fn init_test() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter(EnvFilter::new("debug"))
        .try_init();
}
