// Path: crates/vmcore-telemetry/src/init.rs
//! The initialization routine for global structured logging, carried over
//! from the teacher's `ioi-telemetry::init` verbatim: JSON output on
//! stderr, RFC 3339 timestamps, and an `RUST_LOG`-driven env filter
//! defaulting to `info`.

use tracing_subscriber::{fmt, layer::SubscriberExt, EnvFilter, Registry};

/// Initializes the global `tracing` subscriber. Idempotent: a second call
/// returns an error from `tracing`/`tracing_log` rather than panicking, so
/// callers embedding this crate inside a larger process that already set a
/// global subscriber can ignore the result.
pub fn init_tracing() -> Result<(), anyhow::Error> {
    let fmt_layer = fmt::layer()
        .json()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_timer(fmt::time::UtcTime::rfc_3339());
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = Registry::default().with(filter).with(fmt_layer);
    tracing_log::LogTracer::init()?;
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}
