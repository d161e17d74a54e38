//! Tracing initialization for the TTS facade.
//!
//! Filtering is controlled by `RUST_LOG`, for example:
//!   - `RUST_LOG=debug` - debug logging everywhere
//!   - `RUST_LOG=tts_facade_server=debug` - debug for the facade only
//!   - `RUST_LOG=warn,tts_facade_common=debug` - warn by default, debug for common
//!
//! ```no_run
//! use tts_facade_common::tracing::init_tracing;
//!
//! init_tracing();
//! tracing::info!("Server starting");
//! ```

use tracing_subscriber::{
    EnvFilter,
    fmt::{self, format::FmtSpan},
    prelude::*,
    registry::Registry,
};

/// Log level used when `RUST_LOG` is not set.
pub const DEFAULT_LEVEL: &str = "info";

fn env_filter(default_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level))
}

fn fmt_layer<S>() -> impl tracing_subscriber::Layer<S>
where
    S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
{
    fmt::layer()
        .with_target(true)
        .with_level(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_file(false)
        .with_line_number(false)
        .with_span_events(FmtSpan::NONE)
}

fn subscriber(default_level: &str) -> impl tracing::Subscriber + Send + Sync + use<> {
    Registry::default()
        .with(env_filter(default_level))
        .with(fmt_layer())
}

/// Initialize the global subscriber with an `info` default.
///
/// # Panics
///
/// Panics if a global subscriber is already set.
pub fn init_tracing() {
    init_tracing_with_default(DEFAULT_LEVEL);
}

/// Initialize the global subscriber, falling back to `default_level` when
/// `RUST_LOG` is not set.
///
/// # Panics
///
/// Panics if a global subscriber is already set.
pub fn init_tracing_with_default(default_level: &str) {
    subscriber(default_level).init();
}

/// Like [`init_tracing`], but returns `Err(())` instead of panicking when a
/// subscriber is already installed. Useful from tests.
pub fn try_init_tracing() -> Result<(), ()> {
    subscriber(DEFAULT_LEVEL).try_init().map_err(|_| ())
}
