//! Structured logging for the simulator.
//!
//! Centralised subscriber setup with a human-readable and a JSON variant.
//! Both honour `RUST_LOG` and write to stderr, keeping stdout for reports.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Default filter when `RUST_LOG` is unset
pub const DEFAULT_FILTER: &str = "info";

fn env_filter(fallback: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback))
}

/// Initialize the logging system with human-readable output.
///
/// Log level can be configured via the `RUST_LOG` environment variable.
/// If not set, defaults to `info` level.
///
/// # Example
/// ```no_run
/// use byzantine_core::logging;
///
/// logging::init();
/// tracing::info!("Simulation started");
/// ```
pub fn init() {
    init_with_level(DEFAULT_FILTER);
}

/// Same as [`init`] with an explicit fallback filter
pub fn init_with_level(fallback: &str) {
    // try_init: a second call (tests, embedding) is not an error
    let _ = tracing_subscriber::registry()
        .with(env_filter(fallback))
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_thread_ids(true),
        )
        .try_init();
}

/// Initialize the logging system with JSON output.
///
/// Suitable for log aggregation when runs are scripted.
///
/// # Example
/// ```no_run
/// use byzantine_core::logging;
///
/// logging::init_json();
/// tracing::info!(population = 7, "Run started");
/// ```
pub fn init_json() {
    init_json_with_level(DEFAULT_FILTER);
}

/// Same as [`init_json`] with an explicit fallback filter
pub fn init_json_with_level(fallback: &str) {
    let _ = tracing_subscriber::registry()
        .with(env_filter(fallback))
        .with(
            fmt::layer()
                .json()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_thread_ids(true),
        )
        .try_init();
}
