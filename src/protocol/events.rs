//! Event names exchanged with the host.
//!
//! Canonical names carry the [`NAMESPACE`] prefix. A handful of pre-migration
//! flat names are still accepted on input (see [`legacy`]).

/// Prefix of every protocol-owned event name.
pub const NAMESPACE: &str = "embedded::";

/// Suffix marking a correlated answer to an outbound request.
pub const RESPONSE_SUFFIX: &str = ".response";

/// Events sent from the embedded context to the host.
pub mod outbound {
    /// Handshake: announce the frame and request layout context.
    pub const IFRAME_READY: &str = "embedded::iframe.ready";
    /// App fully loaded; host removes its loading overlay.
    pub const READY: &str = "embedded::ready";
    /// Leave the embedded view.
    pub const DESTROY: &str = "embedded::destroy";
    /// Ask the host to change the frame height.
    pub const IFRAME_RESIZE: &str = "embedded::iframe.resize";

    pub const AUTH_REFRESH: &str = "embedded::auth.refresh";
    pub const AUTH_INTROSPECT: &str = "embedded::auth.introspect";
    pub const AUTH_ERROR: &str = "embedded::auth.error";
    pub const AUTH_LOGOUT: &str = "embedded::auth.logout";

    pub const PAGE_NAVIGATE: &str = "embedded::page.navigate";
    pub const PAGE_REDIRECT: &str = "embedded::page.redirect";
    pub const PAGE_SET_TITLE: &str = "embedded::page.setTitle";
    pub const PAGE_SET_BREADCRUMBS: &str = "embedded::page.setBreadcrumbs";

    pub const NAV_SET_ACTION: &str = "embedded::nav.setAction";
    pub const NAV_CLEAR_ACTION: &str = "embedded::nav.clearAction";

    pub const UI_LOADING_SHOW: &str = "embedded::ui.loading-show";
    pub const UI_LOADING_HIDE: &str = "embedded::ui.loading-hide";
    pub const UI_OVERLAY_OPEN: &str = "embedded::ui.overlay-open";
    pub const UI_OVERLAY_CLOSE: &str = "embedded::ui.overlay-close";
    pub const UI_TOAST_SUCCESS: &str = "embedded::ui.toast-success";
    pub const UI_TOAST_ERROR: &str = "embedded::ui.toast-error";
    pub const UI_TOAST_WARNING: &str = "embedded::ui.toast-warning";
    pub const UI_TOAST_INFO: &str = "embedded::ui.toast-info";
    pub const UI_MODAL_OPEN: &str = "embedded::ui.modal-open";
    pub const UI_MODAL_CLOSE: &str = "embedded::ui.modal-close";
    pub const UI_CONFIRM: &str = "embedded::ui.confirm";

    pub const CHECKOUT_CREATE: &str = "embedded::checkout.create";
    pub const CHECKOUT_GET_ADDONS: &str = "embedded::checkout.getAddons";

    pub const LOG: &str = "embedded::log";
}

/// Events sent from the host to the embedded context.
pub mod inbound {
    /// Handshake answer carrying layout (theme, width, locale, currency).
    pub const CONTEXT_PROVIDE: &str = "embedded::context.provide";
    pub const THEME_CHANGE: &str = "embedded::theme.change";
    pub const NAV_ACTION_CLICK: &str = "embedded::nav.actionClick";
    /// Outcome of a checkout, possibly delivered after a full reload.
    pub const CHECKOUT_RESULT: &str = "embedded::checkout.result";
}

/// Pre-migration flat event names still accepted from older hosts.
pub mod legacy {
    /// Flat handshake answer with inline merchant fields.
    pub const IFRAME_LOADING: &str = "iframe.loading";
    /// Token pushed by the host outside the handshake.
    pub const AUTH: &str = "iframe.legacy.auth";
    /// Theme change carrying `dark: bool`.
    pub const THEME_CHANGE: &str = "salla::theme.change";
    pub const PRIMARY_ACTION_CLICKED: &str = "nav.primary-action.clicked";
}

/// Whether the name carries the protocol namespace.
#[inline]
pub fn is_namespaced(event: &str) -> bool {
    event.starts_with(NAMESPACE) && event.len() > NAMESPACE.len()
}

/// Whether the name is a namespaced correlated response.
#[inline]
pub fn is_response(event: &str) -> bool {
    is_namespaced(event) && event.ends_with(RESPONSE_SUFFIX)
}

/// Name of the response event the host uses to answer `request`.
pub fn response_event(request: &str) -> String {
    format!("{}{}", request, RESPONSE_SUFFIX)
}

/// Event name without the namespace prefix, for display.
pub fn display_name(event: &str) -> &str {
    event.strip_prefix(NAMESPACE).unwrap_or(event)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_namespaced() {
        assert!(is_namespaced(inbound::THEME_CHANGE));
        assert!(!is_namespaced(legacy::THEME_CHANGE));
        assert!(!is_namespaced("embedded::"));
    }

    #[test]
    fn test_is_response() {
        assert!(is_response("embedded::ui.confirm.response"));
        assert!(!is_response("ui.confirm.response"));
        assert!(!is_response(outbound::UI_CONFIRM));
    }

    #[test]
    fn test_response_event() {
        assert_eq!(
            response_event(outbound::AUTH_INTROSPECT),
            "embedded::auth.introspect.response"
        );
    }

    #[test]
    fn test_display_name() {
        assert_eq!(display_name(outbound::PAGE_NAVIGATE), "page.navigate");
        assert_eq!(display_name("resize"), "resize");
    }
}
