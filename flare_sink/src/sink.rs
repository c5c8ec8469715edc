use crate::{Field, LogEntry, Severity};
use std::error::Error;

/// The capability contract of a log destination.
///
/// A logging core fans each [`LogEntry`] out to any number of sinks. For every
/// sink it first asks for a [`Decision`] via
/// [`prepare_write`](Sink::prepare_write), and only calls
/// [`write`](Sink::write) when the sink wants the entry.
///
/// Implementations must tolerate concurrent calls to [`write`](Sink::write)
/// from multiple threads.
pub trait Sink: Send + Sync {
    /// The error reported by a failed [`write`](Sink::write) or
    /// [`flush`](Sink::flush).
    type Error: Error + Send + Sync + 'static;

    /// Reports whether this sink accepts entries of the given severity.
    fn enabled_for(&self, severity: Severity) -> bool;

    /// Decides whether this sink should receive the given entry.
    fn prepare_write(&self, entry: &LogEntry) -> Decision {
        if self.enabled_for(entry.severity()) {
            Decision::Write
        } else {
            Decision::Skip
        }
    }

    /// Delivers the given entry along with its fields.
    fn write(&self, entry: &LogEntry, fields: &[Field]) -> Result<(), Self::Error>;

    /// Returns a sink that attaches the given fields to every subsequent
    /// entry. Sinks that do not support persistent fields return themselves
    /// unchanged.
    fn with(&self, fields: &[Field]) -> Self
    where
        Self: Sized;

    /// Blocks until every write started before this call has completed.
    fn flush(&self) -> Result<(), Self::Error>;
}

/// The outcome of [`Sink::prepare_write`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Decision {
    /// The sink wants to receive the entry.
    Write,

    /// The sink is not interested in the entry.
    Skip,
}

impl Decision {
    /// Reports whether this decision is [`Write`](Decision::Write).
    pub fn is_write(&self) -> bool {
        matches!(self, Self::Write)
    }
}
