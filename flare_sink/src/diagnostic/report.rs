use crate::{Diagnostic, ErrorClass, StackFrame};
use backtrace::Backtrace;
use std::any::type_name;
use std::error::Error;
use std::fmt::{Debug, Display, Formatter};
use std::sync::Arc;

/// A stack-capturing error.
///
/// Every [`Report`] captures the call stack at the point of its creation, and
/// exposes it through [`Diagnostic::stack_frames`]. A report is either a plain
/// [message](Report::msg), or a [wrapper](Report::wrap) that adds context to
/// an underlying cause.
///
/// ## Example
///
/// ```
/// use flare_sink::{Diagnostic, Report, Typed};
/// use std::io;
///
/// let cause = io::Error::new(io::ErrorKind::NotFound, "no such file");
/// let report = Report::wrap(Typed::new(cause), "reading settings");
///
/// assert_eq!(report.to_string(), "reading settings: no such file");
/// assert!(report.stack_frames().is_some());
/// assert!(report.unwrap_cause().is_some());
/// ```
#[derive(Clone)]
pub struct Report {
    message: String,
    frames: Arc<[StackFrame]>,
    cause: Option<Arc<dyn Diagnostic>>,
}

impl Report {
    /// Creates a new report with the given message and no cause.
    pub fn msg(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            frames: capture_frames(),
            cause: None,
        }
    }

    /// Creates a new report that adds the given context to the given cause.
    /// The report’s message reads `"{context}: {cause}"`.
    pub fn wrap(cause: impl Diagnostic + 'static, context: impl Display) -> Self {
        Self {
            message: format!("{context}: {cause}"),
            frames: capture_frames(),
            cause: Some(Arc::new(cause)),
        }
    }
}

impl Debug for Report {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Report")
            .field("message", &self.message)
            .field("frames", &self.frames.len())
            .field("cause", &self.cause)
            .finish()
    }
}

impl Display for Report {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

impl Error for Report {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.cause.as_deref().map(|cause| cause as &(dyn Error + 'static))
    }
}

impl Diagnostic for Report {
    fn class(&self) -> ErrorClass<'_> {
        match self.cause {
            None => ErrorClass::Plain,
            Some(_) => ErrorClass::Named(type_name::<Self>()),
        }
    }

    fn stack_frames(&self) -> Option<&[StackFrame]> {
        Some(&self.frames)
    }

    fn unwrap_cause(&self) -> Option<&dyn Diagnostic> {
        self.cause.as_deref()
    }
}

/// Captures and resolves the current call stack, dropping the leading frames
/// that belong to the capturing machinery itself.
fn capture_frames() -> Arc<[StackFrame]> {
    let backtrace = Backtrace::new();

    let frames = backtrace
        .frames()
        .iter()
        .flat_map(|frame| frame.symbols())
        .map(|symbol| StackFrame {
            filename: symbol.filename().map(|path| path.display().to_string()),
            lineno: symbol.lineno(),
            function: symbol.name().map(|name| format!("{name:#}")),
        })
        .collect::<Vec<_>>();

    let skipped = leading_capture_frames(&frames);

    frames.into_iter().skip(skipped).collect()
}

/// Counts the leading frames up to and including the last one that is known
/// to belong to the capturing machinery. Stops at the first named frame that
/// does not. Unnamed frames are kept unless a capturing frame follows them.
fn leading_capture_frames(frames: &[StackFrame]) -> usize {
    let mut skipped = 0;

    for (index, frame) in frames.iter().enumerate() {
        match frame.function.as_deref() {
            Some(name) if is_capturing_symbol(name) => skipped = index + 1,
            Some(_) => break,
            None => continue,
        }
    }

    skipped
}

fn is_capturing_symbol(name: &str) -> bool {
    name.starts_with("backtrace::")
        || name.starts_with("<backtrace::")
        || name.contains("flare_sink::diagnostic::report::capture_frames")
        || name.contains("flare_sink::diagnostic::report::Report")
}
