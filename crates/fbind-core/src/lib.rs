#![forbid(unsafe_code)]

//! Core: errors, dynamic input values, and configuration.
//!
//! # Role in fbind
//! `fbind-core` is the boundary layer. It owns the single error type, the
//! loosely typed [`Input`] a binding layer hands to an observable array, the
//! aliasable [`SharedArray`] storage handle, and the [`ArrayConfig`] knobs.
//!
//! # How it fits in the system
//! The runtime (`fbind-runtime`) builds observables on top of these types.
//! Nothing here notifies or tracks; it only validates and stores.

pub mod config;
pub mod error;
pub mod input;
pub mod logging;

pub use config::ArrayConfig;
pub use error::ReactiveError;
pub use input::{Input, InputKind, SharedArray};

// Re-export tracing macros at crate root for ergonomic use.
#[cfg(feature = "tracing")]
pub use logging::{
    debug, debug_span, error, error_span, info, info_span, trace, trace_span, warn, warn_span,
};
