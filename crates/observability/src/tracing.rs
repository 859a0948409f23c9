//! Subscriber construction.
//!
//! `RUST_LOG` drives the filter in both modes; absent that, everything at
//! `info` and above is kept. Hosts that need fancier layering (correlation
//! IDs, OTLP export) can build their own subscriber instead.

use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::time::SystemTime;

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

/// JSON lines on stdout, one object per event.
///
/// Safe to call multiple times (subsequent calls are no-ops).
pub fn init() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .json()
        .with_timer(SystemTime)
        .with_target(false)
        .try_init();
}

/// Single-line human-readable output. Targets stay visible so engine
/// events can be told apart from the host's own.
///
/// Safe to call multiple times (subsequent calls are no-ops).
pub fn init_compact() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .compact()
        .with_timer(SystemTime)
        .try_init();
}
