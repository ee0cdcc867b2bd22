//! Request payload construction.
//!
//! [`RequestPayload`] holds the message, the optional fields the service
//! recognizes, and free-form extension fields. [`build_payload`] turns it into
//! the JSON object that is POSTed, refusing extension fields that would
//! overwrite one of the typed fields.

use crate::{Error, Result};
use serde::Serialize;
use serde_json::{Map, Value};

/// Wire keys owned by the typed payload. Extension fields may not use them.
pub const RESERVED_PAYLOAD_KEYS: [&str; 8] = [
    "message",
    "ip",
    "country",
    "message_analysis",
    "fill_priority",
    "min_intent",
    "skip_message_analysis",
    "max_offers",
];

/// One of the recognized optional request fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionalField {
    Ip,
    Country,
    MessageAnalysis,
    FillPriority,
    MinIntent,
    SkipMessageAnalysis,
    MaxOffers,
}

impl OptionalField {
    pub const ALL: [OptionalField; 7] = [
        OptionalField::Ip,
        OptionalField::Country,
        OptionalField::MessageAnalysis,
        OptionalField::FillPriority,
        OptionalField::MinIntent,
        OptionalField::SkipMessageAnalysis,
        OptionalField::MaxOffers,
    ];

    /// The key this field is sent under.
    pub fn wire_key(self) -> &'static str {
        match self {
            OptionalField::Ip => "ip",
            OptionalField::Country => "country",
            OptionalField::MessageAnalysis => "message_analysis",
            OptionalField::FillPriority => "fill_priority",
            OptionalField::MinIntent => "min_intent",
            OptionalField::SkipMessageAnalysis => "skip_message_analysis",
            OptionalField::MaxOffers => "max_offers",
        }
    }

    /// Resolves a field name given in snake_case or flattened lowercase
    /// (`min_intent` or `minintent`). Matching is exact.
    pub fn from_name(name: &str) -> Option<Self> {
        let field = match name {
            "ip" => OptionalField::Ip,
            "country" => OptionalField::Country,
            "message_analysis" | "messageanalysis" => OptionalField::MessageAnalysis,
            "fill_priority" | "fillpriority" => OptionalField::FillPriority,
            "min_intent" | "minintent" => OptionalField::MinIntent,
            "skip_message_analysis" | "skipmessageanalysis" => OptionalField::SkipMessageAnalysis,
            "max_offers" | "maxoffers" => OptionalField::MaxOffers,
            _ => return None,
        };
        Some(field)
    }
}

/// A typed analysis request.
///
/// An empty `message` is passed through unchanged; the service decides
/// whether it is acceptable.
///
/// # Examples
///
/// ```
/// use chatads::{build_payload, RequestPayload};
/// use serde_json::json;
///
/// let payload = RequestPayload::new("Looking for a standing desk")
///     .with_country("US")
///     .with_max_offers(2)
///     .with_extra_field("language", "en");
///
/// let body = build_payload(&payload).unwrap();
/// assert_eq!(body["country"], json!("US"));
/// assert_eq!(body["max_offers"], json!(2));
/// assert_eq!(body["language"], json!("en"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RequestPayload {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_analysis: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fill_priority: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_intent: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skip_message_analysis: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_offers: Option<u32>,

    /// Fields the typed model does not know about yet.
    #[serde(skip)]
    pub extra_fields: Map<String, Value>,
}

impl RequestPayload {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Default::default()
        }
    }

    pub fn with_ip(mut self, ip: impl Into<String>) -> Self {
        self.ip = Some(ip.into());
        self
    }

    pub fn with_country(mut self, country: impl Into<String>) -> Self {
        self.country = Some(country.into());
        self
    }

    pub fn with_message_analysis(mut self, mode: impl Into<String>) -> Self {
        self.message_analysis = Some(mode.into());
        self
    }

    pub fn with_fill_priority(mut self, priority: impl Into<String>) -> Self {
        self.fill_priority = Some(priority.into());
        self
    }

    pub fn with_min_intent(mut self, level: impl Into<String>) -> Self {
        self.min_intent = Some(level.into());
        self
    }

    pub fn with_skip_message_analysis(mut self, skip: bool) -> Self {
        self.skip_message_analysis = Some(skip);
        self
    }

    pub fn with_max_offers(mut self, max: u32) -> Self {
        self.max_offers = Some(max);
        self
    }

    /// Adds an extension field. Reserved keys are rejected later, by
    /// [`build_payload`].
    pub fn with_extra_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra_fields.insert(key.into(), value.into());
        self
    }

    /// Builder form of [`set_field`](Self::set_field).
    pub fn with_field(mut self, name: &str, value: Value) -> Result<Self> {
        self.set_field(name, value)?;
        Ok(self)
    }

    /// Sets a field by name.
    ///
    /// Recognized names (including their flattened aliases) set the typed
    /// field, and `null` clears it. Any other name becomes an extension field.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] if the value has the wrong JSON type for
    /// a recognized field.
    pub fn set_field(&mut self, name: &str, value: Value) -> Result<()> {
        let Some(field) = OptionalField::from_name(name) else {
            self.extra_fields.insert(name.to_string(), value);
            return Ok(());
        };

        match field {
            OptionalField::Ip => self.ip = expect_string(field, value)?,
            OptionalField::Country => self.country = expect_string(field, value)?,
            OptionalField::MessageAnalysis => self.message_analysis = expect_string(field, value)?,
            OptionalField::FillPriority => self.fill_priority = expect_string(field, value)?,
            OptionalField::MinIntent => self.min_intent = expect_string(field, value)?,
            OptionalField::SkipMessageAnalysis => {
                self.skip_message_analysis = match value {
                    Value::Null => None,
                    Value::Bool(b) => Some(b),
                    other => return Err(type_mismatch(field, "a boolean", &other)),
                }
            }
            OptionalField::MaxOffers => {
                self.max_offers = match value {
                    Value::Null => None,
                    other => match other.as_u64().and_then(|n| u32::try_from(n).ok()) {
                        Some(max) => Some(max),
                        None => {
                            return Err(type_mismatch(field, "a non-negative integer", &other))
                        }
                    },
                }
            }
        }
        Ok(())
    }

    /// Serializes this payload; see [`build_payload`].
    pub fn to_payload(&self) -> Result<Map<String, Value>> {
        build_payload(self)
    }
}

fn expect_string(field: OptionalField, value: Value) -> Result<Option<String>> {
    match value {
        Value::Null => Ok(None),
        Value::String(s) => Ok(Some(s)),
        other => Err(type_mismatch(field, "a string", &other)),
    }
}

fn type_mismatch(field: OptionalField, expected: &str, got: &Value) -> Error {
    Error::Validation(format!(
        "field '{}' must be {}, got {}",
        field.wire_key(),
        expected,
        got
    ))
}

/// Builds the JSON body for a [`RequestPayload`].
///
/// The result always contains `message`, every optional field that is set,
/// and every extension field.
///
/// # Errors
///
/// Returns [`Error::Validation`] if any extension field uses a reserved key.
/// The message lists every conflicting key, sorted and comma-separated.
pub fn build_payload(request: &RequestPayload) -> Result<Map<String, Value>> {
    let mut payload = match serde_json::to_value(request) {
        Ok(Value::Object(map)) => map,
        Ok(_) => return Err(Error::Validation("payload did not serialize to an object".to_string())),
        Err(e) => return Err(Error::Validation(format!("failed to serialize payload: {}", e))),
    };

    let mut conflicts: Vec<&str> = request
        .extra_fields
        .keys()
        .map(String::as_str)
        .filter(|key| RESERVED_PAYLOAD_KEYS.contains(key))
        .collect();

    if !conflicts.is_empty() {
        conflicts.sort_unstable();
        return Err(Error::Validation(format!(
            "extra_fields contains reserved keys that would override core payload data: {}",
            conflicts.join(", ")
        )));
    }

    payload.extend(
        request
            .extra_fields
            .iter()
            .map(|(key, value)| (key.clone(), value.clone())),
    );
    Ok(payload)
}
