//! Offers and the analysis payload that carries them.
//!
//! The service speaks PascalCase for these objects (`LinkText`, `URL`, ...).
//! Parsing is total: absent or wrong-typed fields fall back to defaults, and
//! empty objects produce no value at all.

use crate::value::{self, Object};
use serde_json::Value;

/// Display metadata for the product behind an offer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Product {
    pub title: Option<String>,
    pub description: Option<String>,
}

impl Product {
    /// Returns `None` for a missing or empty product object.
    pub fn parse(data: Option<&Object>) -> Option<Self> {
        let data = data.filter(|d| !d.is_empty())?;
        Some(Self {
            title: value::string(data, "Title"),
            description: value::string(data, "Description"),
        })
    }
}

/// A single affiliate recommendation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Offer {
    pub link_text: String,
    pub intent_level: String,
    pub url: String,
    pub status: String,
    pub search_term: Option<String>,
    pub intent_score: Option<f64>,
    pub url_source: Option<String>,
    pub reason: Option<String>,
    pub category: Option<String>,
    pub product: Option<Product>,
}

impl Offer {
    /// Parses one entry of the `Offers` list.
    ///
    /// Returns `None` for `null`, non-objects, and empty objects so that the
    /// list never contains placeholder offers.
    pub fn parse(data: &Value) -> Option<Self> {
        let data = data.as_object().filter(|d| !d.is_empty())?;
        Some(Self {
            link_text: value::string_or(data, "LinkText", ""),
            intent_level: value::string_or(data, "IntentLevel", ""),
            url: value::string_or(data, "URL", ""),
            status: value::string_or(data, "Status", ""),
            search_term: value::string(data, "SearchTerm"),
            intent_score: value::float(data, "IntentScore"),
            url_source: value::string(data, "URLSource"),
            reason: value::string(data, "Reason"),
            category: value::string(data, "Category"),
            product: Product::parse(value::object(data, "Product")),
        })
    }
}

/// The `data` section of a successful analysis.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnalyzeData {
    /// Offers in the order the service ranked them.
    pub offers: Vec<Offer>,
    pub requested: i64,
    pub returned: i64,
    pub latency_ms: Option<f64>,
    pub extraction_ms: Option<f64>,
    pub lookup_ms: Option<f64>,
}

impl AnalyzeData {
    pub fn parse(data: Option<&Object>) -> Option<Self> {
        let data = data.filter(|d| !d.is_empty())?;
        let offers = match data.get("Offers") {
            Some(Value::Array(items)) => items.iter().filter_map(Offer::parse).collect(),
            _ => Vec::new(),
        };

        Some(Self {
            offers,
            requested: value::int(data, "Requested").unwrap_or(0),
            returned: value::int(data, "Returned").unwrap_or(0),
            latency_ms: value::float(data, "LatencyMs"),
            extraction_ms: value::float(data, "ExtractionMs"),
            lookup_ms: value::float(data, "LookupMs"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse_data(value: Value) -> Option<AnalyzeData> {
        AnalyzeData::parse(value.as_object())
    }

    #[test]
    fn test_full_offer() {
        let offer = Offer::parse(&json!({
            "LinkText": "yoga mat",
            "IntentLevel": "high",
            "URL": "https://shop.example/mat",
            "Status": "filled",
            "SearchTerm": "yoga mat",
            "IntentScore": 0.87,
            "URLSource": "amazon",
            "Reason": "explicit product mention",
            "Category": "fitness",
            "Product": {"Title": "Cork Mat", "Description": "Non-slip"}
        }))
        .unwrap();

        assert_eq!(offer.link_text, "yoga mat");
        assert_eq!(offer.url, "https://shop.example/mat");
        assert_eq!(offer.intent_score, Some(0.87));
        assert_eq!(offer.url_source.as_deref(), Some("amazon"));
        let product = offer.product.unwrap();
        assert_eq!(product.title.as_deref(), Some("Cork Mat"));
        assert_eq!(product.description.as_deref(), Some("Non-slip"));
    }

    #[test]
    fn test_sparse_offer_uses_defaults() {
        let offer = Offer::parse(&json!({"Reason": "only field"})).unwrap();
        assert_eq!(offer.link_text, "");
        assert_eq!(offer.intent_level, "");
        assert_eq!(offer.url, "");
        assert_eq!(offer.status, "");
        assert_eq!(offer.reason.as_deref(), Some("only field"));
        assert!(offer.product.is_none());
    }

    #[test]
    fn test_empty_offer_is_dropped() {
        assert!(Offer::parse(&json!({})).is_none());
        assert!(Offer::parse(&json!(null)).is_none());
        assert!(Offer::parse(&json!("offer")).is_none());
    }

    #[test]
    fn test_offer_list_filters_holes_and_keeps_order() {
        let data = parse_data(json!({
            "Offers": [
                {"URL": "https://a"},
                null,
                {},
                false,
                {"URL": "https://b"}
            ],
            "Requested": 3,
            "Returned": 2
        }))
        .unwrap();

        let urls: Vec<_> = data.offers.iter().map(|o| o.url.as_str()).collect();
        assert_eq!(urls, ["https://a", "https://b"]);
    }

    #[test]
    fn test_counts_are_coerced() {
        let data = parse_data(json!({"Requested": "4", "Returned": "lots"})).unwrap();
        assert_eq!(data.requested, 4);
        assert_eq!(data.returned, 0);
        assert!(data.offers.is_empty());
    }

    #[test]
    fn test_offers_not_a_list() {
        let data = parse_data(json!({"Offers": {"URL": "x"}, "LatencyMs": 12.5})).unwrap();
        assert!(data.offers.is_empty());
        assert_eq!(data.latency_ms, Some(12.5));
        assert_eq!(data.extraction_ms, None);
    }

    #[test]
    fn test_empty_data_is_none() {
        assert!(parse_data(json!({})).is_none());
        assert!(AnalyzeData::parse(None).is_none());
    }
}
