//! Envelope encoding and decoding.
//!
//! Canonical wire shape:
//! ```text
//! { "event": "embedded::<ns>.<action>",
//!   "payload": { ... },
//!   "correlationId": "...",      // request/response pairs only
//!   "timestamp": 1700000000000 } // advisory
//! ```
//!
//! Older hosts send the flat form `{ "event": "<name>", ...fields }` with the
//! data inline next to `event`. Parsing accepts both and every accessor looks
//! in the nested `payload` first, then at the inline fields.
//!
//! Nothing in here fails on shape: a value without a usable `event` simply
//! doesn't parse into an [`Envelope`] and is classified [`MessageClass::Unknown`].

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::events;

/// Token linking an outbound request to its inbound response.
pub type CorrelationId = String;

/// Field names that may carry the correlation id (canonical first).
const CORRELATION_FIELDS: [&str; 2] = ["correlationId", "requestId"];

/// Outbound serialization style.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WireFormat {
    /// `{event, payload, correlationId?, timestamp?}`.
    #[default]
    Nested,
    /// Payload fields flattened next to `event` (pre-migration hosts).
    Inline,
}

/// Coarse classification of an inbound value, used for logging and filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageClass {
    /// `event` carries the `embedded::` namespace.
    Namespaced,
    /// `event` is a non-empty flat name.
    Legacy,
    /// No usable `event` at all.
    Unknown,
}

impl MessageClass {
    /// Classify a raw inbound value.
    pub fn of(data: &Value) -> Self {
        match event_name(data) {
            Some(event) if events::is_namespaced(event) => MessageClass::Namespaced,
            Some(_) => MessageClass::Legacy,
            None => MessageClass::Unknown,
        }
    }
}

/// Extract a non-empty `event` string from a raw value.
pub fn event_name(data: &Value) -> Option<&str> {
    data.get("event")
        .and_then(Value::as_str)
        .filter(|event| !event.is_empty())
}

/// Milliseconds since the Unix epoch, for the advisory `timestamp`.
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// A single message exchanged with the host.
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    /// Event name (never empty).
    pub event: String,
    /// Nested payload, if the sender used one.
    pub payload: Option<Value>,
    /// Correlation id for request/response pairs.
    pub correlation_id: Option<CorrelationId>,
    /// Advisory send time in milliseconds.
    pub timestamp: Option<u64>,
    /// Any other top-level fields (legacy inline data).
    pub inline: Map<String, Value>,
}

impl Envelope {
    /// Create an outbound envelope.
    pub fn new(event: impl Into<String>, payload: Value) -> Self {
        Self {
            event: event.into(),
            payload: Some(payload),
            correlation_id: None,
            timestamp: None,
            inline: Map::new(),
        }
    }

    /// Tag the envelope with a correlation id.
    pub fn with_correlation_id(mut self, id: impl Into<CorrelationId>) -> Self {
        self.correlation_id = Some(id.into());
        self
    }

    /// Set the advisory timestamp.
    pub fn with_timestamp(mut self, timestamp: u64) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    /// Parse an untrusted inbound value.
    ///
    /// Returns `None` when the value is not an object or has no non-empty
    /// string `event`. Never panics.
    pub fn parse(data: &Value) -> Option<Self> {
        let object = data.as_object()?;
        let event = event_name(data)?.to_string();

        let mut payload = None;
        let mut timestamp = None;
        let mut inline = Map::new();

        for (key, value) in object {
            match key.as_str() {
                "event" | "correlationId" => {}
                "payload" => payload = Some(value.clone()),
                "timestamp" => {
                    timestamp = value
                        .as_u64()
                        .or_else(|| value.as_f64().filter(|t| *t >= 0.0).map(|t| t as u64));
                }
                _ => {
                    inline.insert(key.clone(), value.clone());
                }
            }
        }

        let correlation_id = correlation_id_in(object).or_else(|| {
            payload
                .as_ref()
                .and_then(Value::as_object)
                .and_then(correlation_id_in)
        });

        Some(Self {
            event,
            payload,
            correlation_id,
            timestamp,
            inline,
        })
    }

    /// Whether the event carries the protocol namespace.
    pub fn is_namespaced(&self) -> bool {
        events::is_namespaced(&self.event)
    }

    /// Look up a field, nested payload first, then inline.
    ///
    /// `null` counts as absent.
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.payload
            .as_ref()
            .and_then(|p| p.get(name))
            .filter(|v| !v.is_null())
            .or_else(|| self.inline.get(name).filter(|v| !v.is_null()))
    }

    /// String field accessor.
    pub fn str_field(&self, name: &str) -> Option<&str> {
        self.field(name).and_then(Value::as_str)
    }

    /// Boolean field accessor.
    pub fn bool_field(&self, name: &str) -> Option<bool> {
        self.field(name).and_then(Value::as_bool)
    }

    /// Merged view of the message data.
    ///
    /// Inline fields overlaid with the nested payload's fields. A non-object
    /// payload is returned as-is.
    pub fn body(&self) -> Value {
        match &self.payload {
            Some(Value::Object(nested)) => {
                let mut merged = self.inline.clone();
                for (key, value) in nested {
                    merged.insert(key.clone(), value.clone());
                }
                Value::Object(merged)
            }
            Some(Value::Null) | None => Value::Object(self.inline.clone()),
            Some(other) => other.clone(),
        }
    }

    /// Detect a host-signaled failure.
    ///
    /// A response fails when it carries a non-null, non-`false` `error`, or
    /// `success: false`. Returns the message and the raw details.
    pub fn host_failure(&self) -> Option<(String, Value)> {
        if let Some(error) = self.field("error").filter(|e| **e != Value::Bool(false)) {
            let message = error
                .as_str()
                .map(str::to_string)
                .or_else(|| {
                    error
                        .get("message")
                        .and_then(Value::as_str)
                        .map(str::to_string)
                })
                .unwrap_or_else(|| error.to_string());
            return Some((message, error.clone()));
        }

        if self.bool_field("success") == Some(false) {
            let message = self
                .str_field("message")
                .unwrap_or("request failed")
                .to_string();
            return Some((message, self.body()));
        }

        None
    }

    /// Serialize for the wire.
    pub fn to_wire(&self, format: WireFormat) -> Value {
        let mut object = Map::new();
        object.insert("event".to_string(), Value::String(self.event.clone()));

        for (key, value) in &self.inline {
            object.insert(key.clone(), value.clone());
        }

        match (format, &self.payload) {
            (WireFormat::Inline, Some(Value::Object(fields))) => {
                for (key, value) in fields {
                    if key != "event" {
                        object.insert(key.clone(), value.clone());
                    }
                }
            }
            (WireFormat::Inline, Some(Value::Null)) | (WireFormat::Inline, None) => {}
            (_, Some(payload)) => {
                object.insert("payload".to_string(), payload.clone());
            }
            (WireFormat::Nested, None) => {
                object.insert("payload".to_string(), Value::Object(Map::new()));
            }
        }

        if let Some(id) = &self.correlation_id {
            object.insert("correlationId".to_string(), Value::String(id.clone()));
        }
        if let Some(timestamp) = self.timestamp {
            object.insert("timestamp".to_string(), Value::from(timestamp));
        }

        Value::Object(object)
    }
}

fn correlation_id_in(object: &Map<String, Value>) -> Option<CorrelationId> {
    CORRELATION_FIELDS
        .iter()
        .filter_map(|key| object.get(*key))
        .find_map(|value| match value {
            Value::String(s) if !s.is_empty() => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        })
}
