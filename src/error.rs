//! Error types for the ChatAds client.
//!
//! Two errors reach callers: [`Error::Validation`] when a payload cannot be
//! built, and [`Error::Api`] when a call fails for good. Transient failures
//! are absorbed by the retry loop and never surface on their own.

use crate::response::Response;
use http::StatusCode;
use serde_json::{Map, Value};
use std::time::Duration;
use url::Url;

/// The main error type for the ChatAds client.
///
/// # Examples
///
/// ```no_run
/// use chatads::{Client, Error};
///
/// # async fn example() -> Result<(), Error> {
/// let client = Client::builder()
///     .base_url("https://api.example.com")?
///     .api_key("key")
///     .raise_on_failure(true)
///     .build()?;
///
/// match client.analyze_message("I need a new yoga mat", []).await {
///     Ok(response) => println!("{} offers", response.offers().len()),
///     Err(Error::Api(err)) => {
///         eprintln!("status: {:?}", err.status_code);
///         eprintln!("code: {:?}", err.error_code());
///     }
///     Err(e) => eprintln!("other error: {}", e),
/// }
/// # Ok(())
/// # }
/// ```
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// The request payload was rejected before anything was sent.
    #[error("Invalid request: {0}")]
    Validation(String),

    /// The call failed after classification and any retries.
    #[error(transparent)]
    Api(Box<ApiError>),

    /// Invalid client configuration, such as a missing API key.
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    /// An invalid URL was provided.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

impl Error {
    /// Returns the structured API failure, if this is one.
    pub fn as_api(&self) -> Option<&ApiError> {
        match self {
            Error::Api(err) => Some(err),
            _ => None,
        }
    }

    /// Returns the HTTP status code if the server answered at all.
    pub fn status(&self) -> Option<StatusCode> {
        self.as_api().and_then(|err| err.status_code)
    }
}

impl From<ApiError> for Error {
    fn from(err: ApiError) -> Self {
        Error::Api(Box::new(err))
    }
}

/// A terminal API failure with everything needed to reproduce it.
///
/// The same value backs both execution modes: it is returned as
/// `Err(Error::Api(..))` in raising mode, and for transport failures in
/// either mode. In non-raising mode a failed call that still produced an
/// envelope returns that envelope instead.
#[derive(thiserror::Error, Debug)]
#[error("{message}")]
pub struct ApiError {
    pub message: String,

    /// `None` when no HTTP response was received.
    pub status_code: Option<StatusCode>,

    /// The fully-resolved request URL.
    pub url: Option<Url>,

    /// The exact payload that was sent.
    pub request_body: Option<Map<String, Value>>,

    /// The parsed envelope, when the server returned one.
    pub response: Option<Response>,

    /// Parsed from the `Retry-After` header.
    pub retry_after: Option<Duration>,

    /// Number of attempts made, including the first.
    pub attempts: usize,

    #[source]
    pub source: Option<reqwest::Error>,
}

impl ApiError {
    pub(crate) fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            status_code: None,
            url: None,
            request_body: None,
            response: None,
            retry_after: None,
            attempts: 0,
            source: None,
        }
    }

    /// The `error.code` of the parsed envelope, if any.
    pub fn error_code(&self) -> Option<&str> {
        self.response.as_ref().and_then(Response::error_code)
    }

    /// Returns `true` if the failure happened below HTTP (no response at all).
    pub fn is_transport(&self) -> bool {
        self.status_code.is_none() && self.source.is_some()
    }
}

/// A specialized `Result` type for ChatAds calls.
pub type Result<T> = std::result::Result<T, Error>;
