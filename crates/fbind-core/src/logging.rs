#![forbid(unsafe_code)]

//! Logging facade.
//!
//! With the `tracing` feature the usual `tracing` macros are re-exported so
//! downstream crates can log through `fbind_core::debug!` and friends. The
//! `tracing-json` feature adds a one-call JSON subscriber for production
//! processes; the filter comes from `RUST_LOG` and falls back to `info`.

#[cfg(feature = "tracing")]
pub use tracing::{
    debug, debug_span, error, error_span, info, info_span, trace, trace_span, warn, warn_span,
};

/// Install a global JSON subscriber writing to stderr.
///
/// Returns `false` if a global subscriber was already installed.
#[cfg(feature = "tracing-json")]
pub fn init_json_logging() -> bool {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .json()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .is_ok()
}
