//! Inbound message handling.
//!
//! Every inbound message goes through [`Inner::handle_message`]:
//! observe, drop if destroyed or from a foreign origin, route, then run the
//! handler for the route's kind. Nothing in here returns an error; bad input
//! is logged and ignored.

use serde_json::Value;

use super::{lock, Inner};
use crate::control::LifecycleState;
use crate::error::EmbeddedError;
use crate::protocol::{events, ActionClick, CheckoutResult, Envelope, HostContext, Theme};
use crate::router::{InboundKind, Route};
use crate::transport::InboundMessage;

impl Inner {
    pub(crate) fn handle_message(&self, message: InboundMessage) {
        if self.lifecycle.state() == LifecycleState::Destroyed {
            self.transport
                .observe_incoming(&message, Some("instance destroyed"));
            return;
        }

        if !self.config.accepts_origin(&message.origin) {
            tracing::warn!(origin = %message.origin, "Rejected message from untrusted origin");
            self.transport
                .observe_incoming(&message, Some("origin not allowed"));
            return;
        }

        self.transport.observe_incoming(&message, None);

        match self.router.route(&message.data) {
            Route::Dispatch { kind, envelope } => {
                tracing::debug!(event = %envelope.event, ?kind, "Dispatching");
                self.dispatch(kind, envelope, &message);
            }
            Route::Unhandled {
                envelope,
                namespaced,
            } => {
                if namespaced {
                    tracing::debug!(event = %envelope.event, "Unhandled namespaced event, ignoring");
                }
            }
            Route::Unknown => {}
        }
    }

    fn dispatch(&self, kind: InboundKind, envelope: Envelope, message: &InboundMessage) {
        match kind {
            InboundKind::ContextProvide => self.on_context(envelope, message),
            InboundKind::ThemeChange => self.on_theme(&envelope),
            InboundKind::ActionClick => self.on_action_click(&envelope),
            InboundKind::CheckoutResult => {
                self.topics
                    .checkout
                    .emit(CheckoutResult::from_envelope(&envelope));
            }
            InboundKind::LegacyAuth => match envelope.str_field("token") {
                Some(token) => {
                    tracing::debug!("Token updated by host");
                    self.set_token(token.to_string());
                }
                None => tracing::debug!("Legacy auth message without token, ignoring"),
            },
            InboundKind::Response => self.on_response(envelope),
        }
    }

    fn on_context(&self, envelope: Envelope, message: &InboundMessage) {
        match self.lifecycle.state() {
            LifecycleState::Initializing => {
                let Some(pending) = lock(&self.handshake_id).clone() else {
                    tracing::debug!("Context arrived before the handshake was sent, ignoring");
                    return;
                };

                // Older hosts answer without echoing the correlation id.
                let id = envelope.correlation_id.as_deref().unwrap_or(pending.as_str());
                if id != pending {
                    tracing::debug!(id, "Context for a stale handshake, ignoring");
                    return;
                }

                self.record_parent_origin(&message.origin);
                self.correlator.resolve(&pending, Ok(message.data.clone()));
            }
            LifecycleState::Ready => {
                tracing::debug!("Host re-sent context, updating layout");
                self.set_layout(HostContext::from_envelope(&envelope).effective_layout());
            }
            state => tracing::debug!(%state, "Context outside of init, ignoring"),
        }
    }

    fn on_theme(&self, envelope: &Envelope) {
        let Some(theme) = Theme::from_envelope(envelope) else {
            tracing::debug!(event = %envelope.event, "Theme change without a valid theme, ignoring");
            return;
        };

        self.set_layout_theme(theme);
        self.topics.theme.emit(theme);
    }

    fn on_action_click(&self, envelope: &Envelope) {
        let click = ActionClick::from_envelope(envelope);

        let local = lock(&self.action_handler).clone();
        if let Some(handler) = local {
            if std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| handler(&click))).is_err()
            {
                tracing::error!("Action click handler panicked");
            }
        }

        self.topics.action.emit(click);
    }

    fn on_response(&self, envelope: Envelope) {
        let Some(id) = envelope.correlation_id.clone() else {
            tracing::debug!(event = %envelope.event, "Response without correlation id, ignoring");
            return;
        };

        let request_event = self.correlator.event_of(&id).unwrap_or_else(|| {
            envelope
                .event
                .strip_suffix(events::RESPONSE_SUFFIX)
                .unwrap_or(&envelope.event)
                .to_string()
        });

        let outcome = match envelope.host_failure() {
            Some((message, details)) => Err(EmbeddedError::Host {
                event: request_event,
                message,
                details,
            }),
            None => Ok(response_body(&envelope)),
        };

        self.correlator.resolve(&id, outcome);
    }
}

/// Response data with correlation bookkeeping stripped.
fn response_body(envelope: &Envelope) -> Value {
    let mut body = envelope.body();
    if let Value::Object(fields) = &mut body {
        fields.remove("correlationId");
        fields.remove("requestId");
    }
    body
}
