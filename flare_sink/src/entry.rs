use crate::{Diagnostic, Severity, Typed};
use std::error::Error;
use std::sync::Arc;
use std::time::SystemTime;

/// A single structured log entry, as handed over to a [`Sink`](crate::Sink).
///
/// The entry does not include its key/value fields: these are passed to the
/// sink separately, as a slice of [`Field`]s.
#[derive(Debug, Clone, PartialEq)]
pub struct LogEntry {
    severity: Severity,
    message: String,
    time: SystemTime,
    logger_name: String,
    caller: Caller,
}

/// Metadata about the call site that produced a [`LogEntry`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Caller {
    /// Source file of the call site, if known.
    pub file: Option<String>,

    /// Line number of the call site, if known.
    pub line: Option<u32>,

    /// Module path of the call site, if known.
    pub module_path: Option<String>,
}

impl LogEntry {
    /// Creates a new entry with the given severity and message, stamped with
    /// the current time, an empty logger name and an unknown caller.
    pub fn new(severity: Severity, message: impl Into<String>) -> Self {
        Self {
            severity,
            message: message.into(),
            time: SystemTime::now(),
            logger_name: String::new(),
            caller: Caller::default(),
        }
    }

    /// Replaces the timestamp of this entry.
    pub fn with_time(self, time: SystemTime) -> Self {
        Self { time, ..self }
    }

    /// Replaces the logger name of this entry.
    pub fn with_logger_name(self, logger_name: impl Into<String>) -> Self {
        Self {
            logger_name: logger_name.into(),
            ..self
        }
    }

    /// Replaces the call site metadata of this entry.
    pub fn with_caller(self, caller: Caller) -> Self {
        Self { caller, ..self }
    }
}

impl LogEntry {
    /// Reports the [`Severity`] of this entry.
    pub fn severity(&self) -> Severity {
        self.severity
    }

    /// Reports the human-readable message of this entry.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Reports the time at which this entry was produced.
    pub fn time(&self) -> SystemTime {
        self.time
    }

    /// Reports the name of the logger that produced this entry.
    pub fn logger_name(&self) -> &str {
        &self.logger_name
    }

    /// Reports the call site that produced this entry.
    pub fn caller(&self) -> &Caller {
        &self.caller
    }
}

/// A key/value pair accompanying a [`LogEntry`].
#[derive(Debug, Clone)]
pub struct Field {
    key: String,
    value: FieldValue,
}

/// The value of a [`Field`].
#[derive(Debug, Clone)]
pub enum FieldValue {
    /// A string value.
    Str(String),

    /// A signed integer value.
    I64(i64),

    /// An unsigned integer value.
    U64(u64),

    /// A floating point value.
    F64(f64),

    /// A boolean value.
    Bool(bool),

    /// A value of any other type, already rendered with its
    /// [`Debug`](std::fmt::Debug) implementation.
    Debug(String),

    /// An error value.
    Error(Arc<dyn Diagnostic>),
}

impl Field {
    /// Creates a new field.
    pub fn new(key: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }

    /// Creates a new field that carries the given [`Diagnostic`] error.
    pub fn error(key: impl Into<String>, error: impl Diagnostic + 'static) -> Self {
        Self::new(key, FieldValue::Error(Arc::new(error)))
    }

    /// Creates a new field that carries an arbitrary standard error, wrapped
    /// into [`Typed`] to retain its type name.
    pub fn std_error<E>(key: impl Into<String>, error: E) -> Self
    where
        E: Error + Send + Sync + 'static,
    {
        Self::error(key, Typed::from(error))
    }

    /// Reports the key of this field.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Reports the value of this field.
    pub fn value(&self) -> &FieldValue {
        &self.value
    }
}

impl FieldValue {
    /// Returns the carried error, if this value is an error.
    pub fn as_error(&self) -> Option<&dyn Diagnostic> {
        match self {
            Self::Error(error) => Some(error.as_ref()),
            _ => None,
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self::Str(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        Self::I64(value)
    }
}

impl From<u64> for FieldValue {
    fn from(value: u64) -> Self {
        Self::U64(value)
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        Self::F64(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<Arc<dyn Diagnostic>> for FieldValue {
    fn from(value: Arc<dyn Diagnostic>) -> Self {
        Self::Error(value)
    }
}
