//! JSON codec using `serde_json`.
//!
//! Everything crossing the window boundary is a JSON value (the structured
//! clone of a plain object). Typed payloads are converted to
//! [`serde_json::Value`] on the way out and decoded from a value on the way in.
//!
//! # Example
//!
//! ```
//! use embedded_bridge::codec::JsonCodec;
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Serialize, Deserialize, PartialEq, Debug)]
//! #[serde(rename_all = "camelCase")]
//! struct Resize {
//!     height: u32,
//! }
//!
//! let value = JsonCodec::encode(&Resize { height: 800 }).unwrap();
//! assert_eq!(value["height"], 800);
//! let back: Resize = JsonCodec::decode(value).unwrap();
//! assert_eq!(back.height, 800);
//! ```

use serde_json::{Map, Value};

use crate::error::Result;

/// JSON codec for structured payloads.
pub struct JsonCodec;

impl JsonCodec {
    /// Encode a value into a JSON tree.
    ///
    /// # Errors
    ///
    /// Returns error if the value cannot be serialized (e.g. a map with
    /// non-string keys).
    #[inline]
    pub fn encode<T: serde::Serialize>(value: &T) -> Result<Value> {
        Ok(serde_json::to_value(value)?)
    }

    /// Decode a JSON tree into a typed value.
    ///
    /// # Errors
    ///
    /// Returns error if the value does not match type T.
    #[inline]
    pub fn decode<T: serde::de::DeserializeOwned>(value: Value) -> Result<T> {
        Ok(serde_json::from_value(value)?)
    }

    /// Encode a value, requiring the result to be a JSON object.
    ///
    /// Unit-like payloads (`()` or `null`) become an empty object, matching
    /// the `{}` payloads the host expects for argument-less commands.
    pub fn encode_object<T: serde::Serialize>(value: &T) -> Result<Map<String, Value>> {
        match Self::encode(value)? {
            Value::Object(map) => Ok(map),
            Value::Null => Ok(Map::new()),
            other => {
                let mut map = Map::new();
                map.insert("value".to_string(), other);
                Ok(map)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};

    #[derive(Serialize, Deserialize, PartialEq, Debug)]
    #[serde(rename_all = "camelCase")]
    struct ConfirmOptions {
        title: String,
        confirm_text: Option<String>,
    }

    #[test]
    fn test_encode_uses_serde_renames() {
        let value = JsonCodec::encode(&ConfirmOptions {
            title: "Delete?".to_string(),
            confirm_text: Some("Delete".to_string()),
        })
        .unwrap();

        assert_eq!(value["title"], "Delete?");
        assert_eq!(value["confirmText"], "Delete");
    }

    #[test]
    fn test_decode_type_mismatch() {
        let result: Result<ConfirmOptions> = JsonCodec::decode(serde_json::json!({ "title": 5 }));
        assert!(result.is_err());
    }

    #[test]
    fn test_encode_object_unit_is_empty() {
        let map = JsonCodec::encode_object(&()).unwrap();
        assert!(map.is_empty());
    }

    #[test]
    fn test_encode_object_wraps_scalars() {
        let map = JsonCodec::encode_object(&42).unwrap();
        assert_eq!(map.get("value"), Some(&serde_json::json!(42)));
    }
}
