//! The response envelope returned by the analysis endpoint.
//!
//! [`Response`] keeps both the typed view of the envelope and the raw JSON
//! object it was built from, so fields the model does not know about yet are
//! still reachable through [`Response::raw`] and [`Meta::raw`].
//!
//! Parsing never fails. Missing, `null`, or wrong-typed fields degrade to
//! defaults; see [`parse_response`].

use crate::offer::{AnalyzeData, Offer};
use crate::value::{self, Object};
use serde_json::Value;
use std::collections::BTreeMap;

/// The top-level envelope.
///
/// `data` and `error` may both be present. Whether a call succeeded is
/// decided from `success` together with the HTTP status, never from which
/// of the two is populated.
///
/// # Examples
///
/// ```
/// use chatads::parse_response;
/// use serde_json::json;
///
/// let body = json!({
///     "success": true,
///     "data": {"Offers": [{"URL": "https://shop.example/mat"}], "Requested": 1, "Returned": 1},
///     "meta": {"request_id": "req_123"}
/// });
///
/// let response = parse_response(body.as_object().unwrap());
/// assert!(response.success);
/// assert_eq!(response.offers()[0].url, "https://shop.example/mat");
/// assert_eq!(response.request_id(), "req_123");
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Response {
    pub success: bool,
    pub data: Option<AnalyzeData>,
    pub error: Option<ErrorBody>,
    pub meta: Meta,

    /// The envelope exactly as received.
    pub raw: Object,
}

impl Response {
    /// Parses an arbitrary JSON value; non-object input is treated as `{}`.
    pub fn from_value(value: &Value) -> Self {
        match value {
            Value::Object(map) => parse_response(map),
            _ => parse_response(&Object::new()),
        }
    }

    /// Parses a raw response body.
    ///
    /// Returns `None` when the body is not a JSON object, since there is no
    /// envelope to build in that case.
    pub fn from_slice(body: &[u8]) -> Option<Self> {
        match serde_json::from_slice::<Value>(body) {
            Ok(Value::Object(map)) => Some(parse_response(&map)),
            _ => None,
        }
    }

    /// The returned offers, or an empty slice when there is no `data`.
    pub fn offers(&self) -> &[Offer] {
        self.data
            .as_ref()
            .map(|d| d.offers.as_slice())
            .unwrap_or_default()
    }

    pub fn error_code(&self) -> Option<&str> {
        self.error.as_ref().map(|e| e.code.as_str())
    }

    pub fn request_id(&self) -> &str {
        &self.meta.request_id
    }
}

/// Request metadata attached to every envelope.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Meta {
    pub request_id: String,
    pub timestamp: Option<String>,
    pub version: Option<String>,
    pub country: Option<String>,
    pub usage: Option<UsageInfo>,
    /// Named timings in milliseconds. Non-numeric entries are skipped.
    pub timing_ms: Option<BTreeMap<String, f64>>,

    /// The `meta` object exactly as received.
    pub raw: Object,
}

impl Meta {
    /// Always produces a `Meta`, even when the object is missing.
    pub fn parse(data: Option<&Object>) -> Self {
        let Some(data) = data else {
            return Self::default();
        };

        let timing_ms = match data.get("timing_ms") {
            Some(Value::Object(timings)) => Some(
                timings
                    .iter()
                    .filter_map(|(name, ms)| value::to_float(ms).map(|ms| (name.clone(), ms)))
                    .collect(),
            ),
            _ => None,
        };

        Self {
            request_id: value::string_or(data, "request_id", ""),
            timestamp: value::string(data, "timestamp"),
            version: value::string(data, "version"),
            country: value::string(data, "country"),
            usage: UsageInfo::parse(value::object(data, "usage")),
            timing_ms,
            raw: data.clone(),
        }
    }
}

/// Quota snapshot for the calling API key.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UsageInfo {
    pub monthly_requests: i64,
    pub is_free_tier: bool,
    pub free_tier_limit: Option<i64>,
    pub free_tier_remaining: Option<i64>,
    pub daily_requests: Option<i64>,
    pub daily_limit: Option<i64>,
}

impl UsageInfo {
    pub fn parse(data: Option<&Object>) -> Option<Self> {
        let data = data.filter(|d| !d.is_empty())?;
        Some(Self {
            monthly_requests: value::int(data, "monthly_requests").unwrap_or(0),
            is_free_tier: value::flag(data, "is_free_tier"),
            free_tier_limit: value::int(data, "free_tier_limit"),
            free_tier_remaining: value::int(data, "free_tier_remaining"),
            daily_requests: value::int(data, "daily_requests"),
            daily_limit: value::int(data, "daily_limit"),
        })
    }

    /// Returns `true` once the free-tier allowance is used up.
    pub fn is_exhausted(&self) -> bool {
        self.free_tier_remaining.is_some_and(|remaining| remaining <= 0)
    }
}

/// The `error` object of a failed envelope.
#[derive(Debug, Clone, PartialEq)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
    pub details: Object,
}

impl Default for ErrorBody {
    fn default() -> Self {
        Self {
            code: "UNKNOWN".to_string(),
            message: String::new(),
            details: Object::new(),
        }
    }
}

impl ErrorBody {
    pub fn parse(data: Option<&Object>) -> Option<Self> {
        let data = data.filter(|d| !d.is_empty())?;
        let details = match data.get("details") {
            Some(Value::Object(details)) => details.clone(),
            _ => Object::new(),
        };

        Some(Self {
            code: value::string_or(data, "code", "UNKNOWN"),
            message: value::string_or(data, "message", ""),
            details,
        })
    }
}

/// Builds a [`Response`] from a decoded JSON object.
///
/// This function is total. The returned envelope's `raw` field is a copy of
/// `json`, and `meta` is always populated.
pub fn parse_response(json: &Object) -> Response {
    Response {
        success: value::flag(json, "success"),
        data: AnalyzeData::parse(value::object(json, "data")),
        error: ErrorBody::parse(value::object(json, "error")),
        meta: Meta::parse(json.get("meta").and_then(Value::as_object)),
        raw: json.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(value: Value) -> Response {
        Response::from_value(&value)
    }

    #[test]
    fn test_empty_envelope() {
        let response = parse(json!({}));
        assert!(!response.success);
        assert!(response.data.is_none());
        assert!(response.error.is_none());
        assert_eq!(response.meta.request_id, "");
        assert!(response.meta.raw.is_empty());
        assert!(response.raw.is_empty());
        assert!(response.offers().is_empty());
    }

    #[test]
    fn test_raw_is_preserved() {
        let body = json!({
            "success": true,
            "future_field": {"nested": [1, 2, 3]},
            "meta": {"request_id": "r1", "region": "us-east"}
        });
        let response = parse(body.clone());
        assert_eq!(Value::Object(response.raw.clone()), body);
        assert_eq!(response.meta.raw.get("region"), Some(&json!("us-east")));
    }

    #[test]
    fn test_wrong_types_degrade() {
        let response = parse(json!({
            "success": "yes",
            "data": [1, 2],
            "error": "boom",
            "meta": 7
        }));
        assert!(response.success);
        assert!(response.data.is_none());
        assert!(response.error.is_none());
        assert_eq!(response.meta, Meta::default());
    }

    #[test]
    fn test_non_object_input() {
        let response = parse(json!([{"success": true}]));
        assert!(!response.success);
        assert!(response.raw.is_empty());
        assert!(Response::from_slice(b"[1,2]").is_none());
        assert!(Response::from_slice(b"<html>").is_none());
        assert!(Response::from_slice(b"{}").is_some());
    }

    #[test]
    fn test_error_defaults() {
        let response = parse(json!({"error": {"details": "not a map"}}));
        let error = response.error.unwrap();
        assert_eq!(error.code, "UNKNOWN");
        assert_eq!(error.message, "");
        assert!(error.details.is_empty());
    }

    #[test]
    fn test_error_with_details() {
        let response = parse(json!({
            "success": false,
            "error": {"code": "NO_OFFERS", "message": "none found", "details": {"checked": 4}},
            "meta": {}
        }));
        assert_eq!(response.error_code(), Some("NO_OFFERS"));
        let error = response.error.unwrap();
        assert_eq!(error.message, "none found");
        assert_eq!(error.details.get("checked"), Some(&json!(4)));
    }

    #[test]
    fn test_meta_and_usage() {
        let response = parse(json!({
            "meta": {
                "request_id": "req_9",
                "timestamp": "2025-01-01T00:00:00Z",
                "version": "1.4.0",
                "country": "US",
                "usage": {
                    "monthly_requests": "41",
                    "is_free_tier": true,
                    "free_tier_limit": 100,
                    "free_tier_remaining": "n/a",
                    "daily_requests": 3.0,
                    "daily_limit": null
                },
                "timing_ms": {"total": 120.5, "lookup": "40", "note": "slow"}
            }
        }));

        let meta = response.meta;
        assert_eq!(meta.request_id, "req_9");
        assert_eq!(meta.version.as_deref(), Some("1.4.0"));
        assert_eq!(meta.country.as_deref(), Some("US"));

        let usage = meta.usage.unwrap();
        assert_eq!(usage.monthly_requests, 41);
        assert!(usage.is_free_tier);
        assert_eq!(usage.free_tier_limit, Some(100));
        assert_eq!(usage.free_tier_remaining, None);
        assert_eq!(usage.daily_requests, Some(3));
        assert_eq!(usage.daily_limit, None);
        assert!(!usage.is_exhausted());

        let timings = meta.timing_ms.unwrap();
        assert_eq!(timings.get("total"), Some(&120.5));
        assert_eq!(timings.get("lookup"), Some(&40.0));
        assert!(!timings.contains_key("note"));
    }

    #[test]
    fn test_usage_defaults_and_exhaustion() {
        let usage = UsageInfo::parse(json!({"free_tier_remaining": 0}).as_object()).unwrap();
        assert_eq!(usage.monthly_requests, 0);
        assert!(!usage.is_free_tier);
        assert!(usage.is_exhausted());
        assert!(UsageInfo::parse(json!({}).as_object()).is_none());
    }

    #[test]
    fn test_offer_url_round_trip() {
        let body = json!({
            "success": true,
            "data": {
                "Offers": [{"LinkText": "bench", "IntentLevel": "medium", "URL": "https://shop.example/bench", "Status": "ok"}],
                "Requested": 1,
                "Returned": 1
            },
            "meta": {"request_id": "abc"}
        });
        let response = parse(body.clone());
        assert_eq!(
            Value::String(response.offers()[0].url.clone()),
            body["data"]["Offers"][0]["URL"]
        );
    }
}
