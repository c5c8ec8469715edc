#![doc = include_str!("../README.md")]
#![deny(missing_docs)]
#![cfg_attr(test, deny(warnings))]

/// Exposes an application configuration section.
mod config;
pub use self::config::RollbarConfig;

/// Defines the errors reported by the Rollbar sink.
mod error;
pub use self::error::RollbarError;

/// Extracts trace chains from [`Diagnostic`] errors.
pub mod chain;

/// Defines the wire format of a Rollbar item.
mod payload;

/// Implements the Rollbar [`Sink`].
mod sink;
pub use self::sink::RollbarSink;

/// Re-exports the sink capability contract and its data model to facilitate
/// stand-alone usage of this crate.
pub use flare_sink::{
    Caller, Diagnostic, Field, FieldValue, LogEntry, PlainError, Report, Severity, Sink, Typed,
};

/// Re-exports the `tracing` bridge of `flare_sink`.
#[cfg(feature = "layer")]
pub use flare_sink::tracing::{SinkLayer, make_layer};
