use std::fmt;
use std::time::Duration;

use crate::ClientError;

/// Environment variable holding the ASTR server base URL.
pub const URL_ENV: &str = "LIBASTR_URL";
/// Environment variable holding the user email.
pub const EMAIL_ENV: &str = "LIBASTR_EMAIL";
/// Environment variable holding the user API token.
pub const TOKEN_ENV: &str = "LIBASTR_TOKEN";

/// Request timeout used unless [`ClientConfig::with_timeout`] says otherwise.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Connection parameters for an [`crate::AstrClient`].
///
/// Values are stored exactly as given. Construction never touches the network.
#[derive(Clone, PartialEq, Eq)]
pub struct ClientConfig {
    base_url: String,
    email: String,
    token: String,
    timeout: Duration,
}

impl ClientConfig {
    /// Creates a configuration from explicit values.
    ///
    /// Fails with [`ClientError::Configuration`] when any value is empty.
    pub fn new(
        base_url: impl Into<String>,
        email: impl Into<String>,
        token: impl Into<String>,
    ) -> Result<Self, ClientError> {
        Self::resolve_with(
            Some(base_url.into()),
            Some(email.into()),
            Some(token.into()),
            |_| None,
        )
    }

    /// Reads every value from `LIBASTR_URL`, `LIBASTR_EMAIL` and `LIBASTR_TOKEN`.
    pub fn from_env() -> Result<Self, ClientError> {
        Self::resolve(None, None, None)
    }

    /// Uses the given values and falls back to the environment for each one left out.
    pub fn resolve(
        base_url: Option<String>,
        email: Option<String>,
        token: Option<String>,
    ) -> Result<Self, ClientError> {
        Self::resolve_with(base_url, email, token, |name| std::env::var(name).ok())
    }

    /// Like [`Self::resolve`], with a caller-provided variable lookup.
    pub fn resolve_with<F>(
        base_url: Option<String>,
        email: Option<String>,
        token: Option<String>,
        lookup: F,
    ) -> Result<Self, ClientError>
    where
        F: Fn(&str) -> Option<String>,
    {
        Ok(Self {
            base_url: pick(base_url, URL_ENV, "base URL", &lookup)?,
            email: pick(email, EMAIL_ENV, "email", &lookup)?,
            token: pick(token, TOKEN_ENV, "token", &lookup)?,
            timeout: DEFAULT_TIMEOUT,
        })
    }

    /// Returns the configuration with a different per-request timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("base_url", &self.base_url)
            .field("email", &self.email)
            .field("token", &"<redacted>")
            .field("timeout", &self.timeout)
            .finish()
    }
}

fn pick<F>(
    given: Option<String>,
    variable: &str,
    what: &str,
    lookup: &F,
) -> Result<String, ClientError>
where
    F: Fn(&str) -> Option<String>,
{
    match given {
        Some(value) if value.is_empty() => Err(ClientError::Configuration(format!(
            "{what} must not be empty"
        ))),
        Some(value) => Ok(value),
        None => lookup(variable)
            .filter(|value| !value.is_empty())
            .ok_or_else(|| {
                ClientError::Configuration(format!(
                    "no {what} given, please set the {variable} environment variable"
                ))
            }),
    }
}
