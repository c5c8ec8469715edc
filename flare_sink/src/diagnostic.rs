use std::any::type_name;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

mod report;
pub use self::report::Report;

/// An error that can describe itself to an error-tracking service.
///
/// Every capability is optional: a diagnostic that reports no
/// [stack frames](Diagnostic::stack_frames) and no [cause](Diagnostic::unwrap_cause)
/// is treated as an opaque message.
pub trait Diagnostic: Error + Send + Sync {
    /// Reports the class (type) of this error.
    fn class(&self) -> ErrorClass<'_> {
        ErrorClass::Unknown
    }

    /// Reports the stack at which this error was created, innermost call
    /// first. Returns `None` if this error does not capture stacks.
    fn stack_frames(&self) -> Option<&[StackFrame]> {
        None
    }

    /// Reports the error that caused this one, if any.
    fn unwrap_cause(&self) -> Option<&dyn Diagnostic> {
        None
    }
}

/// The class of a [`Diagnostic`] error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorClass<'a> {
    /// A concrete type name.
    Named(&'a str),

    /// A plain message without a meaningful type of its own.
    Plain,

    /// The type could not be determined.
    Unknown,
}

/// A single entry of a captured call stack.
///
/// Every part is best-effort: symbol resolution may fail for any of them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StackFrame {
    /// Source file of the frame.
    pub filename: Option<String>,

    /// Line number within the source file.
    pub lineno: Option<u32>,

    /// Demangled name of the function, without the symbol hash.
    pub function: Option<String>,
}

/// A plain message error, without a stack and without a cause.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlainError {
    message: String,
}

impl PlainError {
    /// Creates a new plain error with the given message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl Display for PlainError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

impl Error for PlainError {}

impl Diagnostic for PlainError {
    fn class(&self) -> ErrorClass<'_> {
        ErrorClass::Plain
    }
}

/// Wraps an arbitrary standard error, retaining its type name as its
/// [class](Diagnostic::class). The [`source`](Error::source) chain of the
/// wrapped error becomes the [cause](Diagnostic::unwrap_cause) chain.
#[derive(Debug)]
pub struct Typed<E> {
    inner: E,
    cause: Option<Arc<dyn Diagnostic>>,
}

impl<E> Typed<E>
where
    E: Error + Send + Sync + 'static,
{
    /// Wraps the given error.
    pub fn new(inner: E) -> Self {
        let cause = inner.source().map(diagnose);

        Self { inner, cause }
    }
}

impl<E> From<E> for Typed<E>
where
    E: Error + Send + Sync + 'static,
{
    fn from(value: E) -> Self {
        Self::new(value)
    }
}

impl<E> Display for Typed<E>
where
    E: Display,
{
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        Display::fmt(&self.inner, f)
    }
}

impl<E> Error for Typed<E>
where
    E: Error + 'static,
{
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.inner.source()
    }
}

impl<E> Diagnostic for Typed<E>
where
    E: Error + Send + Sync + 'static,
{
    fn class(&self) -> ErrorClass<'_> {
        ErrorClass::Named(type_name::<E>())
    }

    fn unwrap_cause(&self) -> Option<&dyn Diagnostic> {
        self.cause.as_deref()
    }
}

/// An error known only through its message and its source chain.
#[derive(Debug)]
struct Opaque {
    message: String,
    cause: Option<Arc<dyn Diagnostic>>,
}

impl Display for Opaque {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

impl Error for Opaque {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.cause.as_deref().map(|cause| cause as &(dyn Error + 'static))
    }
}

impl Diagnostic for Opaque {
    fn unwrap_cause(&self) -> Option<&dyn Diagnostic> {
        self.cause.as_deref()
    }
}

/// Converts a borrowed standard error into an owned [`Diagnostic`].
///
/// [`Report`]s and [`PlainError`]s are recognized and cloned, keeping their
/// stacks and classes. Any other error becomes a diagnostic of
/// [unknown](ErrorClass::Unknown) class whose cause chain mirrors the
/// [`source`](Error::source) chain of the given error.
pub fn diagnose(error: &(dyn Error + 'static)) -> Arc<dyn Diagnostic> {
    if let Some(report) = error.downcast_ref::<Report>() {
        return Arc::new(report.clone());
    }

    if let Some(plain) = error.downcast_ref::<PlainError>() {
        return Arc::new(plain.clone());
    }

    Arc::new(Opaque {
        message: error.to_string(),
        cause: error.source().map(diagnose),
    })
}
