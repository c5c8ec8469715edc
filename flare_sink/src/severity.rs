use serde::Deserialize;
use std::fmt::{Display, Formatter};
use tracing_core::Level;

/// The ordered importance of a log entry.
///
/// A severity is “higher” if it is more important. In this sense,
/// [`Critical`](Severity::Critical) is higher than [`Error`](Severity::Error),
/// which in turn is higher than [`Warn`](Severity::Warn).
///
/// Note that this order is the reverse of the verbosity order used by the
/// `tracing` crate’s [`Level`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Very fine-grained diagnostics.
    Trace,

    /// Diagnostics useful during development.
    Debug,

    /// Routine operational messages.
    Info,

    /// Something unexpected that the application recovered from.
    #[serde(alias = "warning")]
    Warn,

    /// A failure. This is the error threshold: anything above it is
    /// [`Critical`](Severity::Critical).
    #[serde(alias = "err")]
    Error,

    /// A failure that threatens the application as a whole.
    #[serde(alias = "fatal", alias = "crit")]
    Critical,
}

impl Default for Severity {
    /// Defines a reasonable default [`Severity`] threshold for alerting.
    fn default() -> Self {
        Self::Error
    }
}

impl Severity {
    /// Reports whether this severity lies strictly above the
    /// [error threshold](Severity::Error).
    pub fn is_above_error(&self) -> bool {
        *self > Self::Error
    }

    /// Returns the lowercase name of this severity.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
            Self::Critical => "critical",
        }
    }
}

impl Display for Severity {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<Level> for Severity {
    fn from(value: Level) -> Self {
        match value {
            Level::TRACE => Self::Trace,
            Level::DEBUG => Self::Debug,
            Level::INFO => Self::Info,
            Level::WARN => Self::Warn,
            _ => Self::Error,
        }
    }
}

impl From<&Level> for Severity {
    fn from(value: &Level) -> Self {
        Self::from(*value)
    }
}
