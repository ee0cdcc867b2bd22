//! # ChatAds - client for the ChatAds message analysis API
//!
//! Send a free-text message, get back a ranked list of affiliate offers plus
//! request metadata. The client builds the request payload, retries
//! transient failures with exponential backoff, and parses the response
//! envelope without ever failing on odd or partial JSON.
//!
//! ## Quick Start
//!
//! ```no_run
//! use chatads::{Client, RequestPayload};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), chatads::Error> {
//!     let client = Client::builder()
//!         .base_url("https://api.example.com")?
//!         .api_key("sk_live_...")
//!         .max_retries(3)
//!         .retry_backoff_factor(Duration::from_millis(500))
//!         .raise_on_failure(true)
//!         .build()?;
//!
//!     let request = RequestPayload::new("Any tips for a beginner road bike?")
//!         .with_country("US")
//!         .with_max_offers(2)
//!         .with_extra_field("language", "en");
//!
//!     let response = client.analyze(&request).await?;
//!     println!("request id: {}", response.request_id());
//!     for offer in response.offers() {
//!         println!("{} ({}) -> {}", offer.link_text, offer.intent_level, offer.url);
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Error Handling
//!
//! Only two errors reach callers for a well-configured client:
//!
//! - [`Error::Validation`] when the payload is rejected locally, before any
//!   network activity (for example an extension field named `country`).
//! - [`Error::Api`] when the call fails for good. The boxed [`ApiError`]
//!   carries the status code, URL, request body, parsed envelope, and any
//!   `Retry-After` hint.
//!
//! With `raise_on_failure(false)` (the default), a call that fails but still
//! gets a JSON envelope back returns `Ok` with `success = false`, so callers
//! can inspect `response.error` themselves.
//!
//! ## Retries
//!
//! Transport errors, `429` and `5xx` responses are retried. `max_retries`
//! is the total number of attempts, and the delay before retry `n` is
//! `retry_backoff_factor * 2^(n-1)`.

mod client;
pub mod config;
mod error;
mod offer;
mod payload;
mod response;
pub mod retry;
mod value;

pub use client::{Client, ClientBuilder};
pub use config::ClientConfig;
pub use error::{ApiError, Error, Result};
pub use offer::{AnalyzeData, Offer, Product};
pub use payload::{build_payload, OptionalField, RequestPayload, RESERVED_PAYLOAD_KEYS};
pub use response::{parse_response, ErrorBody, Meta, Response, UsageInfo};
pub use retry::RetryPolicy;
