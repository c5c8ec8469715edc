//! Turns [`Diagnostic`] errors into the trace chains understood by Rollbar.
//!
//! A trace chain holds one [`TraceChainEntry`] per layer of causation,
//! outermost first. Each entry carries the stack frames of its layer (if the
//! layer captured any) and an [`Exception`] naming the layer’s class and
//! message.

use adler2::adler32_slice;
use flare_sink::{Diagnostic, ErrorClass, StackFrame};
use serde::Serialize;

/// The class reported for errors whose type cannot be determined.
const UNKNOWN_CLASS: &str = "panic";

/// One frame of a stack trace, in Rollbar’s format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TraceFrame {
    /// Source location of the frame, or an empty string.
    pub filename: String,

    /// Line number within the source location, or `0`.
    pub lineno: u32,

    /// Function name of the frame, or an empty string.
    pub method: String,
}

/// The class and message of one layer of an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Exception {
    /// The class of the layer. See [`error_class`].
    pub class: String,

    /// The rendered message of the layer.
    pub message: String,
}

/// One layer of a trace chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TraceChainEntry {
    /// Stack frames of the layer, innermost call first.
    pub frames: Vec<TraceFrame>,

    /// Class and message of the layer.
    pub exception: Exception,
}

/// Describes a single layer of the given error, ignoring its cause.
///
/// Errors that capture no stack produce an empty list of frames.
pub fn extract_frame(error: &dyn Diagnostic) -> TraceChainEntry {
    let frames = error
        .stack_frames()
        .map(|frames| frames.iter().map(trace_frame).collect())
        .unwrap_or_default();

    TraceChainEntry {
        frames,
        exception: Exception {
            class: error_class(error),
            message: error.to_string(),
        },
    }
}

/// Describes every layer of the given error, starting with the error itself
/// and following its [cause](Diagnostic::unwrap_cause) until there is none.
///
/// The result always holds at least one entry.
pub fn build_chain(error: &dyn Diagnostic) -> Vec<TraceChainEntry> {
    let mut chain = Vec::new();
    let mut current = Some(error);

    while let Some(error) = current {
        chain.push(extract_frame(error));
        current = error.unwrap_cause();
    }

    chain
}

/// Same as [`build_chain`], except that an error exposing neither a stack nor
/// a cause produces an empty chain: such an error is better reported as a
/// plain message.
pub fn trace_chain(error: &dyn Diagnostic) -> Vec<TraceChainEntry> {
    if error.stack_frames().is_none() && error.unwrap_cause().is_none() {
        return Vec::new();
    }

    build_chain(error)
}

/// Computes the class reported for the given error:
///
/// - a [named](ErrorClass::Named) class is reported as is, minus any leading
///   pointer or reference sigils;
/// - a [plain](ErrorClass::Plain) message is reported as the Adler-32
///   checksum of its text, in lowercase hex wrapped in braces (e.g.
///   `{11e60398}`), so that distinct messages are grouped apart;
/// - an [unknown](ErrorClass::Unknown) class is reported as `panic`.
pub fn error_class(error: &dyn Diagnostic) -> String {
    match error.class() {
        ErrorClass::Named(name) => strip_pointer(name).to_string(),
        ErrorClass::Plain => format!("{{{:x}}}", adler32_slice(error.to_string().as_bytes())),
        ErrorClass::Unknown => UNKNOWN_CLASS.to_string(),
    }
}

fn trace_frame(frame: &StackFrame) -> TraceFrame {
    TraceFrame {
        filename: frame.filename.clone().unwrap_or_default(),
        lineno: frame.lineno.unwrap_or(0),
        method: frame.function.clone().unwrap_or_default(),
    }
}

fn strip_pointer(mut name: &str) -> &str {
    loop {
        let stripped = ["&mut ", "&", "*const ", "*mut "]
            .iter()
            .find_map(|prefix| name.strip_prefix(prefix));

        match stripped {
            Some(rest) => name = rest,
            None => return name,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flare_sink::{PlainError, Report, Typed};
    use pretty_assertions::assert_eq;
    use std::error::Error;
    use std::fmt::{Display, Formatter};
    use std::io;

    /// A configurable error layer.
    #[derive(Debug)]
    struct Layer {
        message: &'static str,
        class: ErrorClass<'static>,
        frames: Option<Vec<StackFrame>>,
        cause: Option<Box<Layer>>,
    }

    impl Layer {
        fn new(message: &'static str, class: ErrorClass<'static>) -> Self {
            Self {
                message,
                class,
                frames: None,
                cause: None,
            }
        }

        fn with_frames(self, frames: Vec<StackFrame>) -> Self {
            Self {
                frames: Some(frames),
                ..self
            }
        }

        fn caused_by(self, cause: Layer) -> Self {
            Self {
                cause: Some(Box::new(cause)),
                ..self
            }
        }
    }

    impl Display for Layer {
        fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
            f.write_str(self.message)
        }
    }

    impl Error for Layer {}

    impl Diagnostic for Layer {
        fn class(&self) -> ErrorClass<'_> {
            self.class
        }

        fn stack_frames(&self) -> Option<&[StackFrame]> {
            self.frames.as_deref()
        }

        fn unwrap_cause(&self) -> Option<&dyn Diagnostic> {
            self.cause.as_deref().map(|cause| cause as &dyn Diagnostic)
        }
    }

    fn frame(filename: &str, lineno: u32, function: &str) -> StackFrame {
        StackFrame {
            filename: Some(filename.into()),
            lineno: Some(lineno),
            function: Some(function.into()),
        }
    }

    fn trace(filename: &str, lineno: u32, method: &str) -> TraceFrame {
        TraceFrame {
            filename: filename.into(),
            lineno,
            method: method.into(),
        }
    }

    #[test]
    fn class_of_plain_message_is_its_checksum() {
        assert_eq!(error_class(&PlainError::new("")), "{1}");
        assert_eq!(error_class(&PlainError::new("a")), "{620062}");
        assert_eq!(error_class(&PlainError::new("Wikipedia")), "{11e60398}");
    }

    #[test]
    fn class_of_named_error() {
        assert_eq!(
            error_class(&Layer::new("", ErrorClass::Named("app::LoadError"))),
            "app::LoadError",
        );
        assert_eq!(
            error_class(&Layer::new("", ErrorClass::Named("&app::LoadError"))),
            "app::LoadError",
        );
        assert_eq!(
            error_class(&Layer::new("", ErrorClass::Named("&mut *const app::LoadError"))),
            "app::LoadError",
        );
    }

    #[test]
    fn class_of_unknown_error() {
        assert_eq!(error_class(&Layer::new("", ErrorClass::Unknown)), "panic");
    }

    #[test]
    fn class_of_plain_errors() {
        // Given
        let first = PlainError::new("Wikipedia");
        let same = Report::msg("Wikipedia");
        let other = PlainError::new("Wikipedie");

        // Then
        assert_eq!(error_class(&first), "{11e60398}");
        assert_eq!(error_class(&first), error_class(&same));
        assert_ne!(error_class(&first), error_class(&other));
    }

    #[test]
    fn extract_without_stack() {
        // Given
        let error = Typed::new(io::Error::other("disk on fire"));

        // When
        let entry = extract_frame(&error);

        // Then
        assert_eq!(
            entry,
            TraceChainEntry {
                frames: vec![],
                exception: Exception {
                    class: "std::io::error::Error".into(),
                    message: "disk on fire".into(),
                },
            },
        );
    }

    #[test]
    fn extract_degrades_unknown_frame_parts() {
        // Given
        let error = Layer::new("boom", ErrorClass::Unknown).with_frames(vec![
            StackFrame::default(),
            frame("src/main.rs", 12, "app::main"),
        ]);

        // When
        let entry = extract_frame(&error);

        // Then
        assert_eq!(
            entry.frames,
            vec![trace("", 0, ""), trace("src/main.rs", 12, "app::main")],
        );
    }

    #[test]
    fn chain_follows_causes_outermost_first() {
        // Given
        let error = Layer::new("saving: writing: disk on fire", ErrorClass::Named("app::SaveError"))
            .with_frames(vec![frame("src/save.rs", 30, "app::save"), frame("src/main.rs", 5, "app::main")])
            .caused_by(
                Layer::new("writing: disk on fire", ErrorClass::Named("app::WriteError"))
                    .with_frames(vec![frame("src/write.rs", 8, "app::write")])
                    .caused_by(
                        Layer::new("disk on fire", ErrorClass::Plain)
                            .with_frames(vec![frame("src/disk.rs", 99, "app::disk::flush")]),
                    ),
            );

        // When
        let chain = build_chain(&error);

        // Then
        assert_eq!(
            chain,
            vec![
                TraceChainEntry {
                    frames: vec![trace("src/save.rs", 30, "app::save"), trace("src/main.rs", 5, "app::main")],
                    exception: Exception {
                        class: "app::SaveError".into(),
                        message: "saving: writing: disk on fire".into(),
                    },
                },
                TraceChainEntry {
                    frames: vec![trace("src/write.rs", 8, "app::write")],
                    exception: Exception {
                        class: "app::WriteError".into(),
                        message: "writing: disk on fire".into(),
                    },
                },
                TraceChainEntry {
                    frames: vec![trace("src/disk.rs", 99, "app::disk::flush")],
                    exception: Exception {
                        class: format!("{{{:x}}}", adler32_slice(b"disk on fire")),
                        message: "disk on fire".into(),
                    },
                },
            ],
        );
    }

    #[test]
    fn trace_chain_requires_capability() {
        // Given
        let plain = PlainError::new("boom");
        let typed = Typed::new(io::Error::other("boom"));
        let stacked = Report::msg("boom");
        let caused = Layer::new("outer", ErrorClass::Unknown)
            .caused_by(Layer::new("inner", ErrorClass::Unknown));

        // Then
        assert!(trace_chain(&plain).is_empty());
        assert!(trace_chain(&typed).is_empty());
        assert_eq!(trace_chain(&stacked).len(), 1);
        assert_eq!(trace_chain(&caused).len(), 2);
        assert_eq!(build_chain(&plain).len(), 1);
    }

    #[test]
    fn trace_chain_of_wrapped_report() {
        // Given
        let error = Report::wrap(Typed::new(io::Error::other("disk on fire")), "saving");

        // When
        let chain = trace_chain(&error);

        // Then
        assert_eq!(chain.len(), 2);
        assert_eq!(chain[0].exception.message, "saving: disk on fire");
        assert!(!chain[0].frames.is_empty());
        assert_eq!(chain[1].exception.class, "std::io::error::Error");
        assert!(chain[1].frames.is_empty());
    }
}
