#![doc = include_str!("../README.md")]
#![deny(missing_docs)]
#![cfg_attr(test, deny(warnings))]

/// Defines the ordered [`Severity`] of log entries.
mod severity;
pub use self::severity::Severity;

/// Defines the data model of a single log entry.
mod entry;
pub use self::entry::{Caller, Field, FieldValue, LogEntry};

/// Defines the capability contract of a log sink.
mod sink;
pub use self::sink::{Decision, Sink};

/// Implements the tagged-error abstraction used to walk stack frames and
/// cause chains.
mod diagnostic;
pub use self::diagnostic::{
    Diagnostic, ErrorClass, PlainError, Report, StackFrame, Typed, diagnose,
};

/// Implements a [`Layer`](tracing_subscriber::Layer) that forwards `tracing`
/// events into any [`Sink`].
#[cfg(feature = "tracing")]
pub mod tracing;

/// Globally recognized field name that, when present in a `tracing` macro call
/// at level `ERROR`, promotes the event to [`Severity::Critical`].
pub const CRITICAL_FIELD_NAME: &str = "critical";
