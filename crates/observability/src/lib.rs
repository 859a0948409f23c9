//! Tracing and logging setup shared by engine hosts.
//!
//! The engine crates only *emit* `tracing` events; installing a subscriber
//! is the embedding application's job, and this crate is the one-liner for
//! doing that consistently. Managed deployments want [`init`]; interactive
//! hosts and test runs usually prefer [`init_compact`].

/// Initialize process-wide observability with JSON output.
///
/// This is safe to call multiple times; subsequent calls become no-ops.
pub fn init() {
    tracing::init();
}

/// Initialize process-wide observability with compact console output.
///
/// This is safe to call multiple times; subsequent calls become no-ops.
pub fn init_compact() {
    tracing::init_compact();
}

/// Tracing configuration (filters, layers).
pub mod tracing;
