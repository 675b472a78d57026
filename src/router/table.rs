//! Event table mapping inbound event names to handler kinds.
//!
//! The table is closed: kinds are a fixed enum and the app decides what each
//! kind does. Namespaced and legacy names map onto the same kinds so both wire
//! generations share one set of handlers.
//!
//! # Example
//!
//! ```
//! use embedded_bridge::router::{EventTable, InboundKind};
//!
//! let table = EventTable::standard();
//! assert_eq!(table.lookup("embedded::theme.change"), Some(InboundKind::ThemeChange));
//! assert_eq!(table.lookup("salla::theme.change"), Some(InboundKind::ThemeChange));
//! ```

use std::collections::HashMap;

use crate::protocol::events::{inbound, legacy};

/// Internal handler kinds for inbound events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InboundKind {
    /// Handshake answer with layout/merchant context.
    ContextProvide,
    ThemeChange,
    ActionClick,
    CheckoutResult,
    /// Token pushed outside the handshake.
    LegacyAuth,
    /// Correlated answer to an outbound request.
    Response,
}

/// Which naming generation an entry belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Family {
    Namespaced,
    Legacy,
}

#[derive(Debug, Clone, Copy)]
struct Entry {
    kind: InboundKind,
    family: Family,
}

/// Exact-match table of known inbound event names.
#[derive(Debug, Clone)]
pub struct EventTable {
    entries: HashMap<String, Entry>,
}

impl EventTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Table with every event this SDK understands.
    pub fn standard() -> Self {
        let mut table = Self::new();

        table.register(inbound::CONTEXT_PROVIDE, InboundKind::ContextProvide, Family::Namespaced);
        table.register(inbound::THEME_CHANGE, InboundKind::ThemeChange, Family::Namespaced);
        table.register(inbound::NAV_ACTION_CLICK, InboundKind::ActionClick, Family::Namespaced);
        table.register(inbound::CHECKOUT_RESULT, InboundKind::CheckoutResult, Family::Namespaced);

        table.register(legacy::IFRAME_LOADING, InboundKind::ContextProvide, Family::Legacy);
        table.register(legacy::THEME_CHANGE, InboundKind::ThemeChange, Family::Legacy);
        table.register(legacy::PRIMARY_ACTION_CLICKED, InboundKind::ActionClick, Family::Legacy);
        table.register(legacy::AUTH, InboundKind::LegacyAuth, Family::Legacy);

        table
    }

    /// Register an event name.
    ///
    /// The first registration of a name wins; later ones are ignored.
    pub fn register(&mut self, event: &str, kind: InboundKind, family: Family) -> bool {
        if self.entries.contains_key(event) {
            return false;
        }
        self.entries
            .insert(event.to_string(), Entry { kind, family });
        true
    }

    /// Look up the kind for an exact event name.
    pub fn lookup(&self, event: &str) -> Option<InboundKind> {
        self.entries.get(event).map(|e| e.kind)
    }

    /// Naming generation of a registered name.
    pub fn family(&self, event: &str) -> Option<Family> {
        self.entries.get(event).map(|e| e.family)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for EventTable {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_table() {
        let table = EventTable::standard();

        assert_eq!(
            table.lookup("embedded::context.provide"),
            Some(InboundKind::ContextProvide)
        );
        assert_eq!(table.lookup("iframe.loading"), Some(InboundKind::ContextProvide));
        assert_eq!(
            table.lookup("nav.primary-action.clicked"),
            Some(InboundKind::ActionClick)
        );
        assert_eq!(table.lookup("iframe.legacy.auth"), Some(InboundKind::LegacyAuth));
        assert_eq!(table.family("iframe.loading"), Some(Family::Legacy));
        assert_eq!(
            table.family("embedded::checkout.result"),
            Some(Family::Namespaced)
        );
    }

    #[test]
    fn test_exact_match_only() {
        let table = EventTable::standard();

        assert!(table.lookup("embedded::theme.change ").is_none());
        assert!(table.lookup("EMBEDDED::theme.change").is_none());
        assert!(table.lookup("embedded::theme").is_none());
    }

    #[test]
    fn test_first_registration_wins() {
        let mut table = EventTable::new();

        assert!(table.register("a", InboundKind::ThemeChange, Family::Legacy));
        assert!(!table.register("a", InboundKind::ActionClick, Family::Legacy));
        assert_eq!(table.lookup("a"), Some(InboundKind::ThemeChange));
        assert_eq!(table.len(), 1);
    }
}
