//! Router module - classify inbound values and pick a handler kind.
//!
//! Provides:
//! - [`EventTable`] - closed map of event names to [`InboundKind`]
//! - [`Router`] - turns a raw inbound value into a [`Route`]
//!
//! Routing never fails. Values without an `event` become [`Route::Unknown`];
//! names that are not in the table become [`Route::Unhandled`] and are only
//! logged, so hosts can add events without breaking older apps.

mod table;

pub use table::{EventTable, Family, InboundKind};

use serde_json::Value;

use crate::protocol::{events, Envelope};

/// Routing decision for one inbound value.
#[derive(Debug, Clone, PartialEq)]
pub enum Route {
    /// Known event; run the handler for `kind`.
    Dispatch {
        kind: InboundKind,
        envelope: Envelope,
    },
    /// Well-formed but not in the table.
    Unhandled {
        envelope: Envelope,
        /// Whether the name carries the protocol namespace.
        namespaced: bool,
    },
    /// No usable `event` field.
    Unknown,
}

impl Route {
    /// Handler kind, if the route dispatches.
    pub fn kind(&self) -> Option<InboundKind> {
        match self {
            Route::Dispatch { kind, .. } => Some(*kind),
            _ => None,
        }
    }
}

/// Router over an [`EventTable`].
#[derive(Debug, Clone, Default)]
pub struct Router {
    table: EventTable,
}

impl Router {
    /// Router over the standard table.
    pub fn new() -> Self {
        Self::with_table(EventTable::standard())
    }

    pub fn with_table(table: EventTable) -> Self {
        Self { table }
    }

    pub fn table(&self) -> &EventTable {
        &self.table
    }

    /// Route a raw inbound value.
    pub fn route(&self, data: &Value) -> Route {
        match Envelope::parse(data) {
            Some(envelope) => self.route_envelope(envelope),
            None => Route::Unknown,
        }
    }

    /// Route an already parsed envelope.
    pub fn route_envelope(&self, envelope: Envelope) -> Route {
        if let Some(kind) = self.table.lookup(&envelope.event) {
            if self.table.family(&envelope.event) == Some(Family::Legacy) {
                tracing::debug!(event = %envelope.event, ?kind, "Routing legacy alias");
            }
            return Route::Dispatch { kind, envelope };
        }

        if events::is_response(&envelope.event) {
            return Route::Dispatch {
                kind: InboundKind::Response,
                envelope,
            };
        }

        let namespaced = envelope.is_namespaced();
        Route::Unhandled {
            envelope,
            namespaced,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_missing_event_is_unknown() {
        let router = Router::new();

        for value in [
            json!({}),
            json!({ "payload": { "theme": "dark" } }),
            json!({ "event": "" }),
            json!({ "event": false }),
            json!(null),
            json!("embedded::theme.change"),
            json!([{ "event": "embedded::theme.change" }]),
        ] {
            assert_eq!(router.route(&value), Route::Unknown, "value: {}", value);
        }
    }

    #[test]
    fn test_dispatch_known() {
        let router = Router::new();

        let route = router.route(&json!({ "event": "embedded::nav.actionClick", "value": "x" }));
        assert_eq!(route.kind(), Some(InboundKind::ActionClick));
    }

    #[test]
    fn test_legacy_and_namespaced_share_kind() {
        let router = Router::new();

        let a = router.route(&json!({ "event": "embedded::theme.change", "theme": "dark" }));
        let b = router.route(&json!({ "event": "salla::theme.change", "dark": true }));
        assert_eq!(a.kind(), b.kind());
    }

    #[test]
    fn test_response_suffix() {
        let router = Router::new();

        let route = router.route(&json!({
            "event": "embedded::ui.confirm.response",
            "correlationId": "req-1",
            "confirmed": true
        }));
        assert_eq!(route.kind(), Some(InboundKind::Response));

        // Without the namespace it is just an unknown legacy name.
        let route = router.route(&json!({ "event": "ui.confirm.response" }));
        assert!(matches!(route, Route::Unhandled { namespaced: false, .. }));
    }

    #[test]
    fn test_forward_compatible_namespaced() {
        let router = Router::new();

        let route = router.route(&json!({ "event": "embedded::something.new", "payload": 1 }));
        match route {
            Route::Unhandled {
                envelope,
                namespaced,
            } => {
                assert!(namespaced);
                assert_eq!(envelope.event, "embedded::something.new");
            }
            other => panic!("unexpected route: {:?}", other),
        }
    }
}
