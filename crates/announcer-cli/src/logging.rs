//! Logging setup for the CLI.
//!
//! Logs go to stderr so command output on stdout stays machine-readable.
//! `ANNOUNCER_LOG` takes an `EnvFilter` directive (default `info`). Set
//! `DEBUG_LOGGING=1` to enable debug output for the announcer crates.

use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

const DEBUG_DIRECTIVE: &str = "info,announcer_core=debug,announcer=debug";

pub fn init() {
    let debug_logging = std::env::var("DEBUG_LOGGING").is_ok_and(|v| v == "1");

    let filter = match std::env::var("ANNOUNCER_LOG") {
        Ok(directive) if !directive.is_empty() => EnvFilter::new(directive),
        _ if debug_logging => EnvFilter::new(DEBUG_DIRECTIVE),
        _ => EnvFilter::new("info"),
    };

    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_span_events(FmtSpan::NONE);

    // A second init (tests) is not an error worth reporting.
    let _ = tracing_subscriber::registry()
        .with(stderr_layer)
        .with(filter)
        .try_init();

    tracing::debug!(debug_logging, "logging initialized");
}
