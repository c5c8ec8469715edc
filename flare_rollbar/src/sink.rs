use crate::payload::Item;
use crate::{RollbarConfig, RollbarError};
use flare_sink::{Field, LogEntry, Severity, Sink};
use flare_sync::InFlight;
use scopeguard::defer;
use std::io;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;
use ureq::{Agent, AgentBuilder, Response};

/// A [`Sink`] that reports log entries to Rollbar, one blocking HTTPS request
/// per entry.
///
/// This sink is cheap to clone: all clones share the same configuration,
/// HTTP agent, and in-flight counter, so that [flushing](Sink::flush) any
/// clone waits for the deliveries started through every other clone.
///
/// ## Limitations
///
/// This sink does not support persistent fields: [`Sink::with`] returns an
/// identical sink and discards the given fields.
#[derive(Debug, Clone)]
pub struct RollbarSink {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    config: RollbarConfig,
    host: String,
    agent: Agent,
    in_flight: InFlight,
}

impl RollbarSink {
    /// Creates a new sink from the given config, resolving the host name of
    /// the current machine once.
    ///
    /// ## Panics
    ///
    /// Panics if the host name cannot be resolved. Use
    /// [`try_new`](RollbarSink::try_new) to handle this failure instead.
    pub fn new(config: impl Into<RollbarConfig>) -> Self {
        match Self::try_new(config) {
            Ok(sink) => sink,
            Err(error) => panic!("failed to create the Rollbar sink: {error:?}"),
        }
    }

    /// Creates a new sink from the given config, resolving the host name of
    /// the current machine once. Reports [`RollbarError::Hostname`] if the
    /// host name cannot be resolved.
    pub fn try_new(config: impl Into<RollbarConfig>) -> Result<Self, RollbarError> {
        let host = resolve_host().map_err(RollbarError::Hostname)?;

        Ok(Self::with_host(config, host))
    }

    /// Creates a new sink that reports the given host name.
    pub(crate) fn with_host(config: impl Into<RollbarConfig>, host: impl Into<String>) -> Self {
        let config = config.into();
        let host = host.into();

        let agent = AgentBuilder::new().timeout(config.timeout()).build();

        debug!(
            environment = config.environment(),
            host = host.as_str(),
            endpoint = config.endpoint(),
            min_severity = config.min_severity().as_str(),
            "Created the Rollbar sink",
        );

        Self {
            inner: Arc::new(Inner {
                config,
                host,
                agent,
                in_flight: InFlight::new(),
            }),
        }
    }
}

impl RollbarSink {
    /// Returns the config of this sink.
    pub fn config(&self) -> &RollbarConfig {
        &self.inner.config
    }

    /// Returns the host name reported by this sink.
    pub fn host(&self) -> &str {
        &self.inner.host
    }

    /// Returns the number of deliveries currently in flight.
    pub fn in_flight(&self) -> usize {
        self.inner.in_flight.count()
    }

    /// Same as [`Sink::flush`], but gives up after the given timeout. Reports
    /// whether every delivery in flight completed in time.
    pub fn flush_timeout(&self, timeout: Duration) -> bool {
        self.announce_flush();

        self.inner.in_flight.wait_timeout(timeout)
    }

    fn announce_flush(&self) {
        let count = self.inner.in_flight.count();
        if count > 0 {
            debug!(count, "Waiting for in-flight Rollbar deliveries");
        }
    }
}

impl Sink for RollbarSink {
    type Error = RollbarError;

    fn enabled_for(&self, severity: Severity) -> bool {
        severity >= self.inner.config.min_severity()
    }

    fn write(&self, entry: &LogEntry, fields: &[Field]) -> Result<(), Self::Error> {
        // Count this delivery as in flight until we return, no matter the outcome
        self.inner.in_flight.enter();
        defer! { self.inner.in_flight.leave() }

        let item = Item::new(&self.inner.config, &self.inner.host, entry, fields);
        let body = serde_json::to_vec(&item).map_err(RollbarError::Marshal)?;

        let outcome = self
            .inner
            .agent
            .post(self.inner.config.endpoint())
            .set("Content-Type", "application/json")
            .send_bytes(&body);

        match outcome {
            Ok(response) if response.status() == 200 => Ok(()),
            Ok(response) => Err(rejected(&response)),
            Err(ureq::Error::Status(_, response)) => Err(rejected(&response)),
            Err(ureq::Error::Transport(transport)) => Err(RollbarError::Post(Box::new(transport))),
        }
    }

    fn with(&self, _fields: &[Field]) -> Self {
        self.clone()
    }

    fn flush(&self) -> Result<(), Self::Error> {
        self.announce_flush();

        self.inner.in_flight.wait();

        Ok(())
    }
}

impl AsRef<RollbarConfig> for RollbarSink {
    fn as_ref(&self) -> &RollbarConfig {
        self.config()
    }
}

fn resolve_host() -> io::Result<String> {
    let host = hostname::get()?;

    Ok(host
        .into_string()
        .unwrap_or_else(|host| host.to_string_lossy().into_owned()))
}

fn rejected(response: &Response) -> RollbarError {
    RollbarError::Rejected {
        status: response.status(),
        text: response.status_text().to_string(),
    }
}
