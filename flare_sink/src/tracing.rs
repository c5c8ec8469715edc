use crate::{CRITICAL_FIELD_NAME, Caller, Field, FieldValue, LogEntry, Severity, Sink, diagnose};
use std::error::Error;
use std::fmt::Debug;
use tracing_core::field::{Field as TracingField, Visit};
use tracing_core::{Event, Level, Subscriber};
use tracing_subscriber::Layer;
use tracing_subscriber::layer::Context;

/// The name of the field in which `tracing` macros record the event message.
const MESSAGE_FIELD_NAME: &str = "message";

/// Creates a [`SinkLayer`] that forwards `tracing` events into the given
/// [`Sink`].
///
/// This layer should be included in the global default [`Subscriber`], next
/// to any other layers (e.g., a console formatter). Every event is turned into
/// a [`LogEntry`] plus a list of [`Field`]s, and handed to the sink if the
/// sink’s [`prepare_write`](Sink::prepare_write) accepts it.
///
/// The level of the event maps onto [`Severity`] one-to-one. Since `tracing`
/// has no level above `ERROR`, an `ERROR` event carrying a field named
/// [`CRITICAL_FIELD_NAME`] is promoted to [`Severity::Critical`], unless the
/// field is explicitly `false`, either as a boolean or as the text `"false"`
/// (in any letter case).
///
/// The layer never filters events for other layers: events rejected by the
/// sink still reach the rest of the subscriber.
///
/// ## Examples
///
/// ```
/// use flare_sink::tracing::make_layer;
/// # use flare_sink::{Field, LogEntry, PlainError, Severity, Sink};
/// use tracing_subscriber::layer::SubscriberExt;
///
/// # #[derive(Clone)]
/// # struct NullSink;
/// # impl Sink for NullSink {
/// #     type Error = PlainError;
/// #     fn enabled_for(&self, severity: Severity) -> bool { severity >= Severity::Error }
/// #     fn write(&self, _: &LogEntry, _: &[Field]) -> Result<(), PlainError> { Ok(()) }
/// #     fn with(&self, _: &[Field]) -> Self { self.clone() }
/// #     fn flush(&self) -> Result<(), PlainError> { Ok(()) }
/// # }
/// let subscriber = tracing_subscriber::registry().with(make_layer(NullSink));
///
/// tracing::subscriber::with_default(subscriber, || {
///     // Delivered to the sink as `Severity::Error`
///     tracing::error!(answer = 42, "Sample message");
///
///     // Delivered to the sink as `Severity::Critical`
///     tracing::error!(critical = true, "Sample message");
///
///     // Rejected by the sink’s severity threshold
///     tracing::info!("Sample message");
/// });
/// ```
pub fn make_layer<K>(sink: K) -> SinkLayer<K>
where
    K: Sink + 'static,
{
    SinkLayer::new(sink)
}

/// A [`Layer`] that forwards `tracing` events into a [`Sink`].
///
/// Failed writes are handed to the layer’s error handler, which by default
/// prints a single line to the standard error stream.
pub struct SinkLayer<K>
where
    K: Sink,
{
    sink: K,
    on_error: Box<dyn Fn(&K::Error) + Send + Sync>,
}

impl<K> SinkLayer<K>
where
    K: Sink + 'static,
{
    /// Creates a new layer around the given sink, with the default error
    /// handler.
    pub fn new(sink: K) -> Self {
        Self {
            sink,
            on_error: Box::new(print_error::<K::Error>),
        }
    }

    /// Replaces the handler invoked for every failed write.
    pub fn with_error_handler(self, handler: impl Fn(&K::Error) + Send + Sync + 'static) -> Self {
        Self {
            sink: self.sink,
            on_error: Box::new(handler),
        }
    }

    /// Exposes the wrapped sink.
    pub fn sink(&self) -> &K {
        &self.sink
    }
}

impl<S, K> Layer<S> for SinkLayer<K>
where
    S: Subscriber,
    K: Sink + 'static,
{
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let metadata = event.metadata();
        let level = *metadata.level();

        // Skip visiting the fields if even the promoted severity is rejected
        let ceiling = if level == Level::ERROR {
            Severity::Critical
        } else {
            Severity::from(level)
        };
        if !self.sink.enabled_for(ceiling) {
            return;
        }

        // Collect the message and the fields
        let mut visitor = EntryVisitor::default();
        event.record(&mut visitor);

        let mut severity = Severity::from(level);
        if visitor.critical && severity == Severity::Error {
            severity = Severity::Critical;
        }

        let entry = LogEntry::new(severity, visitor.message)
            .with_logger_name(metadata.target())
            .with_caller(Caller {
                file: metadata.file().map(String::from),
                line: metadata.line(),
                module_path: metadata.module_path().map(String::from),
            });

        if !self.sink.prepare_write(&entry).is_write() {
            return;
        }

        if let Err(error) = self.sink.write(&entry, &visitor.fields) {
            (self.on_error)(&error);
        }
    }
}

/// The default error handler of a [`SinkLayer`].
fn print_error<E>(error: &E)
where
    E: Error,
{
    let mut message = error.to_string();

    let mut source = error.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }

    eprintln!("failed to deliver log entry to sink: {message}");
}

/// Helper structure for visiting every field on a tracing event. Stores the
/// result of the visit.
#[derive(Default)]
struct EntryVisitor {
    message: String,
    fields: Vec<Field>,
    critical: bool,
}

impl Visit for EntryVisitor {
    fn record_f64(&mut self, field: &TracingField, value: f64) {
        self.push(field, value);
    }

    fn record_i64(&mut self, field: &TracingField, value: i64) {
        self.push(field, value);
    }

    fn record_u64(&mut self, field: &TracingField, value: u64) {
        self.push(field, value);
    }

    fn record_i128(&mut self, field: &TracingField, value: i128) {
        self.push(field, FieldValue::Debug(value.to_string()));
    }

    fn record_u128(&mut self, field: &TracingField, value: u128) {
        self.push(field, FieldValue::Debug(value.to_string()));
    }

    fn record_bool(&mut self, field: &TracingField, value: bool) {
        if field.name() == CRITICAL_FIELD_NAME {
            self.critical = value;
            return;
        }

        self.push(field, value);
    }

    fn record_str(&mut self, field: &TracingField, value: &str) {
        if field.name() == CRITICAL_FIELD_NAME {
            self.critical = !value.eq_ignore_ascii_case("false");
            return;
        }

        if field.name() == MESSAGE_FIELD_NAME {
            self.message = value.to_string();
            return;
        }

        self.push(field, value);
    }

    fn record_error(&mut self, field: &TracingField, value: &(dyn Error + 'static)) {
        self.push(field, FieldValue::Error(diagnose(value)));
    }

    fn record_debug(&mut self, field: &TracingField, value: &dyn Debug) {
        if field.name() == MESSAGE_FIELD_NAME {
            self.message = format!("{value:?}");
            return;
        }

        if field.name() == CRITICAL_FIELD_NAME {
            self.record_str(field, &format!("{value:?}"));
            return;
        }

        self.push(field, FieldValue::Debug(format!("{value:?}")));
    }
}

impl EntryVisitor {
    #[inline(always)]
    fn push(&mut self, field: &TracingField, value: impl Into<FieldValue>) {
        if field.name() == CRITICAL_FIELD_NAME {
            self.critical = true;
            return;
        }

        self.fields.push(Field::new(field.name(), value));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Diagnostic, ErrorClass, PlainError, Report};
    use parking_lot::Mutex;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tracing_subscriber::layer::SubscriberExt;

    #[derive(Clone)]
    struct RecordingSink {
        threshold: Severity,
        fail: bool,
        records: Arc<Mutex<Vec<(LogEntry, Vec<Field>)>>>,
    }

    impl RecordingSink {
        fn new(threshold: Severity) -> Self {
            Self {
                threshold,
                fail: false,
                records: Arc::default(),
            }
        }

        fn failing(threshold: Severity) -> Self {
            Self {
                fail: true,
                ..Self::new(threshold)
            }
        }

        fn take(&self) -> Vec<(LogEntry, Vec<Field>)> {
            std::mem::take(&mut *self.records.lock())
        }
    }

    impl Sink for RecordingSink {
        type Error = PlainError;

        fn enabled_for(&self, severity: Severity) -> bool {
            severity >= self.threshold
        }

        fn write(&self, entry: &LogEntry, fields: &[Field]) -> Result<(), Self::Error> {
            if self.fail {
                return Err(PlainError::new("sink unavailable"));
            }

            self.records.lock().push((entry.clone(), fields.to_vec()));

            Ok(())
        }

        fn with(&self, _fields: &[Field]) -> Self {
            self.clone()
        }

        fn flush(&self) -> Result<(), Self::Error> {
            Ok(())
        }
    }

    fn with_sink(sink: &RecordingSink, f: impl FnOnce()) {
        let subscriber = tracing_subscriber::registry().with(make_layer(sink.clone()));

        ::tracing::subscriber::with_default(subscriber, f);
    }

    #[test]
    fn filters_by_severity() {
        // Given
        let sink = RecordingSink::new(Severity::Error);

        // When
        with_sink(&sink, || {
            ::tracing::info!("routine");
            ::tracing::warn!("suspicious");
            ::tracing::error!("broken");
        });

        // Then
        let records = sink.take();
        assert_eq!(records.len(), 1);
        let (entry, fields) = &records[0];
        assert_eq!(entry.severity(), Severity::Error);
        assert_eq!(entry.message(), "broken");
        assert_eq!(entry.logger_name(), "flare_sink::tracing::tests");
        assert_eq!(
            entry.caller().module_path.as_deref(),
            Some("flare_sink::tracing::tests"),
        );
        assert!(entry.caller().line.is_some());
        assert!(fields.is_empty());
    }

    #[test]
    fn promotes_critical() {
        // Given
        let sink = RecordingSink::new(Severity::Critical);

        // When
        with_sink(&sink, || {
            ::tracing::error!("just an error");
            ::tracing::error!(critical = false, "still just an error");
            ::tracing::error!(critical = "false", "textually just an error");
            ::tracing::error!(critical = ?false, "debug-formatted just an error");
            ::tracing::error!(critical = true, "meltdown");
            ::tracing::warn!(critical = true, "not promoted");
        });

        // Then
        let records = sink.take();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].0.severity(), Severity::Critical);
        assert_eq!(records[0].0.message(), "meltdown");
        assert!(records[0].1.is_empty());
    }

    #[test]
    fn collects_fields() {
        // Given
        let sink = RecordingSink::new(Severity::Warn);

        // When
        with_sink(&sink, || {
            ::tracing::warn!(answer = 42, name = "deep thought", ratio = 0.5, ok = false, "computed");
        });

        // Then
        let records = sink.take();
        let fields = &records[0].1;
        assert_eq!(fields.len(), 4);
        assert_eq!(fields[0].key(), "answer");
        assert!(matches!(fields[0].value(), FieldValue::I64(42)));
        assert!(matches!(fields[1].value(), FieldValue::Str(name) if name == "deep thought"));
        assert!(matches!(fields[2].value(), FieldValue::F64(ratio) if *ratio == 0.5));
        assert!(matches!(fields[3].value(), FieldValue::Bool(false)));
    }

    #[test]
    fn collects_errors() {
        // Given
        let sink = RecordingSink::new(Severity::Error);
        let report = Report::msg("disk on fire");

        // When
        with_sink(&sink, || {
            ::tracing::error!(error = &report as &(dyn Error + 'static), "saving failed");
        });

        // Then
        let records = sink.take();
        let (entry, fields) = &records[0];
        assert_eq!(entry.message(), "saving failed");
        let error = fields[0].value().as_error().unwrap();
        assert_eq!(error.to_string(), "disk on fire");
        assert_eq!(error.class(), ErrorClass::Plain);
        assert_eq!(error.stack_frames(), report.stack_frames());
    }

    #[test]
    fn hands_failures_to_error_handler() {
        // Given
        let failures = Arc::new(AtomicUsize::new(0));
        let layer = make_layer(RecordingSink::failing(Severity::Error)).with_error_handler({
            let failures = failures.clone();
            move |error: &PlainError| {
                assert_eq!(error.to_string(), "sink unavailable");
                failures.fetch_add(1, Ordering::SeqCst);
            }
        });
        let subscriber = tracing_subscriber::registry().with(layer);

        // When
        ::tracing::subscriber::with_default(subscriber, || {
            ::tracing::error!("first");
            ::tracing::info!("ignored");
            ::tracing::error!("second");
        });

        // Then
        assert_eq!(failures.load(Ordering::SeqCst), 2);
    }
}
