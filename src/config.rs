//! Client configuration.
//!
//! [`ClientConfig`] is produced by [`ClientBuilder`](crate::ClientBuilder)
//! and never changes afterwards, which is what makes a single client safe to
//! share across concurrent calls.

use crate::retry::RetryPolicy;
use crate::{Error, Result};
use std::fmt;
use std::time::Duration;
use url::Url;

pub const DEFAULT_ENDPOINT: &str = "/v1/chatads/messages";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

pub const ENV_API_KEY: &str = "CHATADS_API_KEY";
pub const ENV_BASE_URL: &str = "CHATADS_BASE_URL";
pub const ENV_MAX_RETRIES: &str = "CHATADS_MAX_RETRIES";
pub const ENV_RETRY_BACKOFF_FACTOR: &str = "CHATADS_RETRY_BACKOFF_FACTOR";
pub const ENV_RAISE_ON_FAILURE: &str = "CHATADS_RAISE_ON_FAILURE";
pub const ENV_DEBUG: &str = "CHATADS_DEBUG";

/// Immutable settings shared by every call made through a client.
#[derive(Clone)]
pub struct ClientConfig {
    pub base_url: Url,
    /// `base_url` joined with the endpoint path.
    pub endpoint_url: Url,
    pub api_key: String,
    pub retry_policy: RetryPolicy,
    /// Per-attempt timeout.
    pub timeout: Duration,
    /// Return `Err` for envelopes with `success = false` instead of handing
    /// them back.
    pub raise_on_failure: bool,
    /// Log request and response bodies at `info` level.
    pub debug: bool,
}

impl ClientConfig {
    /// Upper bound on the wall-clock time of one call.
    pub fn max_call_duration(&self) -> Duration {
        self.retry_policy.worst_case_duration(self.timeout)
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("base_url", &self.base_url.as_str())
            .field("endpoint_url", &self.endpoint_url.as_str())
            .field("api_key", &"<redacted>")
            .field("retry_policy", &self.retry_policy)
            .field("timeout", &self.timeout)
            .field("raise_on_failure", &self.raise_on_failure)
            .field("debug", &self.debug)
            .finish()
    }
}

/// Joins an endpoint path onto a base URL, keeping any path prefix the base
/// already has.
pub(crate) fn join_endpoint(base: &Url, endpoint: &str) -> Url {
    let mut url = base.clone();
    let path = format!(
        "{}/{}",
        base.path().trim_end_matches('/'),
        endpoint.trim_start_matches('/')
    );
    url.set_path(&path);
    url
}

/// Reads an environment variable, treating empty values as unset.
pub(crate) fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

pub(crate) fn parse_env_bool(name: &str, raw: &str) -> Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(Error::ConfigurationError(format!(
            "{} must be a boolean, got '{}'",
            name, raw
        ))),
    }
}

pub(crate) fn parse_env_number<T: std::str::FromStr>(name: &str, raw: &str) -> Result<T> {
    raw.trim().parse::<T>().map_err(|_| {
        Error::ConfigurationError(format!("{} must be a number, got '{}'", name, raw))
    })
}
