//! Handshake and lifecycle message payloads.
//!
//! The handshake is `embedded::iframe.ready` carrying the current content
//! height, tagged with a correlation id. The host answers with
//! `embedded::context.provide` (or the legacy flat `iframe.loading`).

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::codec::JsonCodec;
use crate::error::Result;
use crate::protocol::{events::outbound, Envelope};

/// Height reported when the app does not know its content height yet.
pub const DEFAULT_FRAME_HEIGHT: u32 = 600;

/// Payload of `embedded::iframe.ready`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandshakeRequest {
    /// Content height in pixels.
    pub height: u32,
}

impl HandshakeRequest {
    pub fn new(height: Option<u32>) -> Self {
        Self {
            height: height.filter(|h| *h > 0).unwrap_or(DEFAULT_FRAME_HEIGHT),
        }
    }
}

/// Build the handshake envelope.
pub fn handshake_envelope(height: Option<u32>, correlation_id: &str) -> Result<Envelope> {
    let payload = JsonCodec::encode(&HandshakeRequest::new(height))?;
    Ok(Envelope::new(outbound::IFRAME_READY, payload).with_correlation_id(correlation_id))
}

/// Build the `embedded::ready` envelope.
pub fn ready_envelope() -> Envelope {
    Envelope::new(outbound::READY, Value::Object(Default::default()))
}

/// Build the `embedded::destroy` envelope.
pub fn destroy_envelope() -> Envelope {
    Envelope::new(outbound::DESTROY, Value::Object(Default::default()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::WireFormat;
    use serde_json::json;

    #[test]
    fn test_handshake_envelope() {
        let env = handshake_envelope(Some(900), "req-1").unwrap();

        assert_eq!(
            env.to_wire(WireFormat::Nested),
            json!({
                "event": "embedded::iframe.ready",
                "payload": { "height": 900 },
                "correlationId": "req-1"
            })
        );
    }

    #[test]
    fn test_default_height() {
        assert_eq!(HandshakeRequest::new(None).height, DEFAULT_FRAME_HEIGHT);
        assert_eq!(HandshakeRequest::new(Some(0)).height, DEFAULT_FRAME_HEIGHT);
    }

    #[test]
    fn test_lifecycle_envelopes() {
        assert_eq!(ready_envelope().event, "embedded::ready");
        assert_eq!(destroy_envelope().payload, Some(json!({})));
    }
}
