use crate::RollbarConfig;
use crate::chain::{TraceChainEntry, trace_chain};
use flare_sink::{Field, LogEntry};
use serde::Serialize;
use std::time::UNIX_EPOCH;
use uuid::Uuid;

/// The language tag reported with every item.
const LANGUAGE: &str = "rust";

/// A single Rollbar item, as posted to the item endpoint.
#[derive(Debug, Serialize)]
pub(crate) struct Item<'a> {
    access_token: &'a str,
    data: Data<'a>,
}

#[derive(Debug, Serialize)]
struct Data<'a> {
    uuid: String,
    level: Level,
    timestamp: u64,
    platform: &'static str,
    server: Server<'a>,
    language: &'static str,
    environment: &'a str,
    body: Body,
    notifier: Notifier<'a>,
}

/// The coarse level of an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum Level {
    Error,
    Critical,
}

/// The body of an item: either a plain message, or a trace chain.
#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub(crate) enum Body {
    Message { body: String },
    TraceChain(Vec<TraceChainEntry>),
}

#[derive(Debug, Serialize)]
struct Server<'a> {
    host: &'a str,
}

#[derive(Debug, Serialize)]
struct Notifier<'a> {
    name: &'a str,
}

impl<'a> Item<'a> {
    /// Assembles the item for the given entry and fields.
    pub(crate) fn new(
        config: &'a RollbarConfig,
        host: &'a str,
        entry: &'a LogEntry,
        fields: &[Field],
    ) -> Self {
        Self {
            access_token: config.access_token().unsecure(),
            data: Data {
                uuid: Uuid::new_v4().simple().to_string(),
                level: Level::of(entry),
                timestamp: entry
                    .time()
                    .duration_since(UNIX_EPOCH)
                    .map(|since_epoch| since_epoch.as_secs())
                    .unwrap_or(0),
                platform: std::env::consts::OS,
                server: Server { host },
                language: LANGUAGE,
                environment: config.environment(),
                body: Body::of(entry, fields),
                notifier: Notifier {
                    name: entry.logger_name(),
                },
            },
        }
    }
}

impl Level {
    fn of(entry: &LogEntry) -> Self {
        if entry.severity().is_above_error() {
            Self::Critical
        } else {
            Self::Error
        }
    }
}

impl Body {
    /// Picks the first error among the fields, if any, and describes it.
    /// Any further errors are ignored.
    fn of(entry: &LogEntry, fields: &[Field]) -> Self {
        let error = fields.iter().find_map(|field| field.value().as_error());

        let Some(error) = error else {
            return Self::Message {
                body: entry.message().to_string(),
            };
        };

        let chain = trace_chain(error);
        if chain.is_empty() {
            return Self::Message {
                body: error.to_string(),
            };
        }

        Self::TraceChain(chain)
    }
}
