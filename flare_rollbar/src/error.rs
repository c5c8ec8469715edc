use std::io;
use thiserror::Error;

/// Represents the failures of the [Rollbar sink](crate::RollbarSink).
///
/// None of these failures is retried. The sink reports them to its caller,
/// which decides whether to log, ignore, or escalate.
#[derive(Debug, Error)]
pub enum RollbarError {
    /// The host name of the current machine could not be resolved.
    #[error("resolving host name")]
    Hostname(#[source] io::Error),

    /// The item could not be serialized.
    #[error("marshalling rollbar post body to json")]
    Marshal(#[source] serde_json::Error),

    /// The item could not be sent (connection, TLS, timeout, etc.).
    #[error("posting rollbar request")]
    Post(#[source] Box<ureq::Transport>),

    /// Rollbar responded with a status other than `200`.
    #[error("expected 200 from rollbar but got {status} {text}")]
    Rejected {
        /// The observed status code.
        status: u16,
        /// The observed status text.
        text: String,
    },
}
