//! HTTP client with bounded retries and structured failures.
//!
//! The [`Client`] type is the main entry point for calling the analysis
//! endpoint. Use [`ClientBuilder`] to configure and create clients.

use crate::{
    config::{
        self, ClientConfig, DEFAULT_ENDPOINT, DEFAULT_TIMEOUT, ENV_API_KEY, ENV_BASE_URL,
        ENV_DEBUG, ENV_MAX_RETRIES, ENV_RAISE_ON_FAILURE, ENV_RETRY_BACKOFF_FACTOR,
    },
    error::ApiError,
    payload::{build_payload, RequestPayload},
    retry::{is_transient_status, parse_retry_after, RetryPolicy},
    Error, Response, Result,
};
use http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use url::Url;

const API_KEY_HEADER: &str = "x-api-key";

/// A client for the ChatAds analysis API.
///
/// The client is cheap to clone and safe to use from many tasks at once:
/// all configuration is fixed at build time and no state is kept between
/// calls.
///
/// # Examples
///
/// ```no_run
/// use chatads::Client;
/// use serde_json::json;
/// use std::time::Duration;
///
/// # async fn example() -> Result<(), chatads::Error> {
/// let client = Client::builder()
///     .base_url("https://api.example.com")?
///     .api_key("sk_test")
///     .max_retries(3)
///     .retry_backoff_factor(Duration::from_millis(500))
///     .build()?;
///
/// let response = client
///     .analyze_message(
///         "A great home gym set includes bar bells, a bench, and a yoga mat.",
///         [("country", json!("US")), ("language", json!("en"))],
///     )
///     .await?;
///
/// for offer in response.offers() {
///     println!("{} -> {}", offer.link_text, offer.url);
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    http_client: reqwest::Client,
    default_headers: HeaderMap,
    config: ClientConfig,
}

/// Why an attempt did not end in success.
enum Failure {
    /// No HTTP response, or the body could not be read.
    Transport(reqwest::Error),
    /// The server answered, but with an error status or `success = false`.
    Http {
        status: StatusCode,
        retry_after: Option<Duration>,
        response: Option<Response>,
    },
}

impl Failure {
    fn is_transient(&self) -> bool {
        match self {
            Failure::Transport(e) => !e.is_builder(),
            Failure::Http { status, .. } => is_transient_status(*status),
        }
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Failure::Transport(e) => write!(f, "Request failed: {}", e),
            Failure::Http {
                status,
                response: None,
                ..
            } => write!(f, "HTTP {}: response body is not a JSON envelope", status),
            Failure::Http {
                status,
                response: Some(response),
                ..
            } => {
                let prefix = if status.is_success() {
                    "API returned success=false".to_string()
                } else {
                    format!("HTTP {}", status)
                };
                match &response.error {
                    Some(error) if error.message.is_empty() => {
                        write!(f, "{} ({})", prefix, error.code)
                    }
                    Some(error) => write!(f, "{} ({}): {}", prefix, error.code, error.message),
                    None => write!(f, "{}", prefix),
                }
            }
        }
    }
}

impl Client {
    /// Creates a new `ClientBuilder` for configuring a client.
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// The configuration this client was built with.
    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    /// Upper bound on how long one call can take, retries included.
    pub fn max_call_duration(&self) -> Duration {
        self.inner.config.max_call_duration()
    }

    /// Analyzes a message.
    ///
    /// `fields` are applied by name through
    /// [`RequestPayload::set_field`]: recognized fields (and their aliases)
    /// set typed values, anything else (`language`, for example) is sent as
    /// an extension field.
    ///
    /// # Errors
    ///
    /// See [`Client::analyze`].
    pub async fn analyze_message<'a>(
        &self,
        message: impl Into<String>,
        fields: impl IntoIterator<Item = (&'a str, Value)>,
    ) -> Result<Response> {
        let mut request = RequestPayload::new(message);
        for (name, value) in fields {
            request.set_field(name, value)?;
        }
        self.analyze(&request).await
    }

    /// Sends a typed request, retrying transient failures.
    ///
    /// Transport errors, 429 and 5xx responses are retried up to the
    /// configured attempt budget. Other statuses and envelopes with
    /// `success = false` fail immediately.
    ///
    /// # Errors
    ///
    /// - [`Error::Validation`] if the payload cannot be built. Nothing is sent.
    /// - [`Error::Api`] when the call fails in raising mode, or when it fails
    ///   without producing a JSON envelope in either mode.
    ///
    /// In non-raising mode a failed call that produced an envelope returns
    /// `Ok` with that envelope.
    pub async fn analyze(&self, request: &RequestPayload) -> Result<Response> {
        let payload = build_payload(request)?;
        let policy = self.inner.config.retry_policy;
        let start_time = Instant::now();
        let mut attempt = 0;

        loop {
            attempt += 1;

            let failure = match self.execute_request(&payload, attempt).await {
                Ok(response) => {
                    let latency = start_time.elapsed();
                    match self.parse_http_response(response, latency, attempt).await {
                        Ok(envelope) => return Ok(envelope),
                        Err(failure) => failure,
                    }
                }
                Err(e) => Failure::Transport(e),
            };

            tracing::warn!(
                error = %failure,
                attempt = attempt,
                url = %self.inner.config.endpoint_url,
                "ChatAds request failed"
            );

            if failure.is_transient() {
                if let Some(delay) = policy.delay_for_attempt(attempt) {
                    tracing::info!(
                        delay_ms = delay.as_millis() as u64,
                        attempt = attempt,
                        "Retrying request after delay"
                    );
                    tokio::time::sleep(delay).await;
                    continue;
                }
            }

            return self.finish(failure, payload, attempt);
        }
    }

    /// Executes a single request attempt.
    async fn execute_request(
        &self,
        payload: &Map<String, Value>,
        attempt: usize,
    ) -> std::result::Result<reqwest::Response, reqwest::Error> {
        let config = &self.inner.config;

        tracing::debug!(
            url = %config.endpoint_url,
            attempt = attempt,
            "Executing ChatAds request"
        );
        if config.debug {
            tracing::info!(
                payload = %serde_json::Value::Object(payload.clone()),
                "Request payload"
            );
        }

        self.inner
            .http_client
            .post(config.endpoint_url.clone())
            .headers(self.inner.default_headers.clone())
            .json(payload)
            .send()
            .await
    }

    /// Reads the body and decides whether the attempt succeeded.
    async fn parse_http_response(
        &self,
        response: reqwest::Response,
        latency: Duration,
        attempts: usize,
    ) -> std::result::Result<Response, Failure> {
        let status = response.status();
        let retry_after = parse_retry_after(response.headers());
        let body = response.bytes().await.map_err(Failure::Transport)?;

        tracing::info!(
            status = status.as_u16(),
            latency_ms = latency.as_millis() as u64,
            attempts = attempts,
            "Received HTTP response"
        );
        if self.inner.config.debug {
            tracing::info!(body = %String::from_utf8_lossy(&body), "Raw response body");
        } else {
            tracing::trace!(body = %String::from_utf8_lossy(&body), "Raw response body");
        }

        if status.is_client_error() {
            tracing::error!(status = status.as_u16(), "Client error (4xx)");
        } else if status.is_server_error() {
            tracing::warn!(status = status.as_u16(), "Server error (5xx)");
        }

        match Response::from_slice(&body) {
            Some(envelope) if status.is_success() && envelope.success => Ok(envelope),
            envelope => Err(Failure::Http {
                status,
                retry_after,
                response: envelope,
            }),
        }
    }

    /// Turns the last failure into the caller-visible outcome.
    fn finish(
        &self,
        failure: Failure,
        payload: Map<String, Value>,
        attempts: usize,
    ) -> Result<Response> {
        let config = &self.inner.config;
        let message = failure.to_string();

        let mut err = ApiError::new(message);
        err.url = Some(config.endpoint_url.clone());
        err.request_body = Some(payload);
        err.attempts = attempts;

        match failure {
            Failure::Http {
                response: Some(response),
                ..
            } if !config.raise_on_failure => {
                tracing::warn!(
                    request_id = %response.meta.request_id,
                    error_code = response.error_code().unwrap_or(""),
                    attempts = attempts,
                    "Returning unsuccessful response"
                );
                return Ok(response);
            }
            Failure::Http {
                status,
                retry_after,
                response,
            } => {
                err.status_code = Some(status);
                err.retry_after = retry_after;
                err.response = response;
            }
            Failure::Transport(e) => {
                err.source = Some(e);
            }
        }

        tracing::error!(
            error = %err,
            status = err.status_code.map(|s| s.as_u16()),
            attempts = attempts,
            "ChatAds request failed permanently"
        );
        Err(err.into())
    }
}

/// Builder for configuring and creating a [`Client`].
///
/// # Examples
///
/// ```no_run
/// use chatads::ClientBuilder;
/// use std::time::Duration;
///
/// # fn example() -> Result<(), chatads::Error> {
/// let client = ClientBuilder::new()
///     .base_url("https://api.example.com")?
///     .api_key("sk_test")
///     .timeout(Duration::from_secs(5))
///     .raise_on_failure(true)
///     .default_header("x-client-name", "my-app")?
///     .build()?;
/// # Ok(())
/// # }
/// ```
pub struct ClientBuilder {
    base_url: Option<Url>,
    api_key: Option<String>,
    endpoint: String,
    default_headers: HeaderMap,
    retry_policy: RetryPolicy,
    timeout: Duration,
    raise_on_failure: bool,
    debug: bool,
}

impl ClientBuilder {
    /// Creates a new `ClientBuilder` with default settings.
    pub fn new() -> Self {
        Self {
            base_url: None,
            api_key: None,
            endpoint: DEFAULT_ENDPOINT.to_string(),
            default_headers: HeaderMap::new(),
            retry_policy: RetryPolicy::default(),
            timeout: DEFAULT_TIMEOUT,
            raise_on_failure: false,
            debug: false,
        }
    }

    /// Creates a builder seeded from `CHATADS_*` environment variables.
    ///
    /// Unset or empty variables keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is set to a malformed value.
    pub fn from_env() -> Result<Self> {
        let mut builder = Self::new();

        if let Some(url) = config::env_var(ENV_BASE_URL) {
            builder = builder.base_url(url)?;
        }
        if let Some(key) = config::env_var(ENV_API_KEY) {
            builder = builder.api_key(key);
        }
        if let Some(raw) = config::env_var(ENV_MAX_RETRIES) {
            builder = builder.max_retries(config::parse_env_number(ENV_MAX_RETRIES, &raw)?);
        }
        if let Some(raw) = config::env_var(ENV_RETRY_BACKOFF_FACTOR) {
            let secs = config::parse_env_number(ENV_RETRY_BACKOFF_FACTOR, &raw)?;
            builder = builder.retry_backoff_factor_secs(secs)?;
        }
        if let Some(raw) = config::env_var(ENV_RAISE_ON_FAILURE) {
            builder = builder.raise_on_failure(config::parse_env_bool(ENV_RAISE_ON_FAILURE, &raw)?);
        }
        if let Some(raw) = config::env_var(ENV_DEBUG) {
            builder = builder.debug(config::parse_env_bool(ENV_DEBUG, &raw)?);
        }

        Ok(builder)
    }

    /// Sets the base URL of the service.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid.
    pub fn base_url(mut self, url: impl AsRef<str>) -> Result<Self> {
        self.base_url = Some(Url::parse(url.as_ref())?);
        Ok(self)
    }

    /// Sets the API key sent with every request.
    pub fn api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Overrides the endpoint path, relative to the base URL.
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Adds a default header that will be included in all requests.
    ///
    /// # Errors
    ///
    /// Returns an error if the header name or value is invalid.
    pub fn default_header(mut self, name: impl AsRef<str>, value: impl AsRef<str>) -> Result<Self> {
        let name = HeaderName::try_from(name.as_ref())
            .map_err(|e| Error::ConfigurationError(format!("Invalid header name: {}", e)))?;
        let value = HeaderValue::try_from(value.as_ref())
            .map_err(|e| Error::ConfigurationError(format!("Invalid header value: {}", e)))?;
        self.default_headers.insert(name, value);
        Ok(self)
    }

    /// Sets the total number of attempts per call. `1` means no retries.
    pub fn max_retries(mut self, max_retries: usize) -> Self {
        self.retry_policy.max_attempts = max_retries;
        self
    }

    /// Sets the base backoff delay.
    pub fn retry_backoff_factor(mut self, factor: Duration) -> Self {
        self.retry_policy.backoff_factor = factor;
        self
    }

    /// Sets the base backoff delay in (fractional) seconds.
    ///
    /// # Errors
    ///
    /// Returns an error for negative or non-finite values.
    pub fn retry_backoff_factor_secs(self, secs: f64) -> Result<Self> {
        let factor = Duration::try_from_secs_f64(secs).map_err(|_| {
            Error::ConfigurationError(format!("Invalid retry backoff factor: {}", secs))
        })?;
        Ok(self.retry_backoff_factor(factor))
    }

    /// Replaces the whole retry policy.
    pub fn retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = policy;
        self
    }

    /// Sets the per-attempt timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Return `Err` instead of the envelope when a call fails.
    pub fn raise_on_failure(mut self, raise: bool) -> Self {
        self.raise_on_failure = raise;
        self
    }

    /// Log request payloads and raw response bodies at `info` level.
    pub fn debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Builds the configured `Client`.
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL or API key is missing, if the retry
    /// budget is zero, or if the HTTP client cannot be constructed.
    pub fn build(self) -> Result<Client> {
        let base_url = self
            .base_url
            .ok_or_else(|| Error::ConfigurationError("Base URL is required".to_string()))?;

        let api_key = self
            .api_key
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| Error::ConfigurationError("API key is required".to_string()))?;

        if self.retry_policy.max_attempts == 0 {
            return Err(Error::ConfigurationError(
                "max_retries must be at least 1".to_string(),
            ));
        }

        let mut default_headers = self.default_headers;
        let mut key_value = HeaderValue::try_from(api_key.as_str())
            .map_err(|e| Error::ConfigurationError(format!("Invalid API key: {}", e)))?;
        key_value.set_sensitive(true);
        default_headers.insert(API_KEY_HEADER, key_value);

        let http_client = reqwest::Client::builder()
            .timeout(self.timeout)
            .user_agent(concat!("chatads-rust/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| {
                Error::ConfigurationError(format!("Failed to build HTTP client: {}", e))
            })?;

        let endpoint_url = config::join_endpoint(&base_url, &self.endpoint);

        Ok(Client {
            inner: Arc::new(ClientInner {
                http_client,
                default_headers,
                config: ClientConfig {
                    base_url,
                    endpoint_url,
                    api_key,
                    retry_policy: self.retry_policy,
                    timeout: self.timeout,
                    raise_on_failure: self.raise_on_failure,
                    debug: self.debug,
                },
            }),
        })
    }
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}
