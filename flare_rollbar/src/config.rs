use flare_sink::Severity;
use humantime::parse_duration;
use secure_string::SecureString;
use serde::de::{Error, IgnoredAny, MapAccess, Visitor};
use serde::{Deserialize, Deserializer};
use std::fmt::Formatter;
use std::time::Duration;

/// Represents the application-level configuration section that covers everything
/// related to Rollbar integration.
///
/// This config comes with a custom [`Deserialize`] implementation, to support more
/// human-oriented textual configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct RollbarConfig {
    access_token: SecureString,
    environment: String,
    endpoint: String,
    min_severity: Severity,
    timeout: Duration,
}

impl RollbarConfig {
    /// Creates a new config for the given environment and access token, with
    /// defaults for everything else.
    pub fn new(environment: impl Into<String>, access_token: impl Into<String>) -> Self {
        Self {
            access_token: SecureString::from(access_token.into()),
            environment: environment.into(),
            ..Self::default()
        }
    }

    /// Replaces the endpoint to which items are posted.
    pub fn with_endpoint(self, endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            ..self
        }
    }

    /// Replaces the minimum severity of reported log entries.
    pub fn with_min_severity(self, min_severity: Severity) -> Self {
        Self {
            min_severity,
            ..self
        }
    }

    /// Replaces the timeout applied to every delivery.
    pub fn with_timeout(self, timeout: Duration) -> Self {
        Self { timeout, ..self }
    }
}

impl RollbarConfig {
    /// Returns the Rollbar project access token. It must carry the
    /// `post_server_item` scope.
    pub fn access_token(&self) -> &SecureString {
        &self.access_token
    }

    /// Returns the name of the environment (e.g., `production`) under which
    /// items are filed.
    pub fn environment(&self) -> &str {
        &self.environment
    }

    /// Returns the URL to which items are posted.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Returns the minimum severity of log entries that are reported.
    /// Anything less severe is ignored.
    pub fn min_severity(&self) -> Severity {
        self.min_severity
    }

    /// Returns the maximum time a single delivery may take, from connecting
    /// to reading the response status.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

impl Default for RollbarConfig {
    fn default() -> Self {
        Self {
            access_token: Self::default_access_token(),
            environment: Self::default_environment(),
            endpoint: Self::default_endpoint(),
            min_severity: Self::default_min_severity(),
            timeout: Self::default_timeout(),
        }
    }
}

impl RollbarConfig {
    fn default_access_token() -> SecureString {
        "".into()
    }

    fn default_environment() -> String {
        "development".into()
    }

    fn default_endpoint() -> String {
        "https://api.rollbar.com/api/1/item/".into()
    }

    fn default_min_severity() -> Severity {
        Severity::Error
    }

    fn default_timeout() -> Duration {
        Duration::from_secs(10)
    }
}

impl AsRef<RollbarConfig> for RollbarConfig {
    fn as_ref(&self) -> &RollbarConfig {
        self
    }
}

const _: () = {
    impl<'de> Deserialize<'de> for RollbarConfig {
        fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
        where
            D: Deserializer<'de>,
        {
            deserializer.deserialize_any(RollbarConfigVisitor)
        }
    }

    struct RollbarConfigVisitor;

    impl<'de> Visitor<'de> for RollbarConfigVisitor {
        type Value = RollbarConfig;

        fn expecting(&self, formatter: &mut Formatter) -> std::fmt::Result {
            formatter.write_str("a map of Rollbar integration configuration or a string access token")
        }

        fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
        where
            E: Error,
        {
            Ok(RollbarConfig {
                access_token: SecureString::from(value),
                ..RollbarConfig::default()
            })
        }

        fn visit_string<E>(self, value: String) -> Result<Self::Value, E>
        where
            E: Error,
        {
            Ok(RollbarConfig {
                access_token: SecureString::from(value),
                ..RollbarConfig::default()
            })
        }

        fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
        where
            A: MapAccess<'de>,
        {
            let mut access_token = None;
            let mut environment = None;
            let mut endpoint = None;
            let mut min_severity = None;
            let mut timeout = None;

            while let Some(key) = map.next_key()? {
                match key {
                    RollbarConfigField::AccessToken => access_token = Some(map.next_value()?),
                    RollbarConfigField::Environment => environment = Some(map.next_value()?),
                    RollbarConfigField::Endpoint => endpoint = Some(map.next_value()?),
                    RollbarConfigField::MinSeverity => min_severity = Some(map.next_value()?),
                    RollbarConfigField::Timeout => {
                        let duration_string = map.next_value::<String>()?;
                        let duration = parse_duration(&duration_string).map_err(Error::custom)?;
                        timeout = Some(duration);
                    }
                    RollbarConfigField::Ignore => {
                        map.next_value::<IgnoredAny>()?;
                    }
                };
            }

            Ok(RollbarConfig {
                access_token: access_token.unwrap_or_else(RollbarConfig::default_access_token),
                environment: environment.unwrap_or_else(RollbarConfig::default_environment),
                endpoint: endpoint.unwrap_or_else(RollbarConfig::default_endpoint),
                min_severity: min_severity.unwrap_or_else(RollbarConfig::default_min_severity),
                timeout: timeout.unwrap_or_else(RollbarConfig::default_timeout),
            })
        }
    }

    #[derive(Deserialize)]
    #[serde(field_identifier, rename_all = "snake_case")]
    enum RollbarConfigField {
        #[serde(alias = "token")]
        AccessToken,
        #[serde(alias = "env")]
        Environment,
        #[serde(alias = "url")]
        Endpoint,
        #[serde(alias = "level")]
        MinSeverity,
        Timeout,
        #[serde(other)]
        Ignore,
    }
};
