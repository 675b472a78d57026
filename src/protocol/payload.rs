//! Typed views over inbound host data.
//!
//! All parsing here is field-by-field on top of [`Envelope`] accessors: a
//! missing or mistyped field becomes `None`, it never fails the message.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::Envelope;

/// Dashboard color scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Light,
    Dark,
}

impl Theme {
    /// Parse a theme name; anything but `light`/`dark` is rejected.
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "light" => Some(Theme::Light),
            "dark" => Some(Theme::Dark),
            _ => None,
        }
    }

    /// Map the legacy `dark: bool` flag.
    pub fn from_dark_flag(dark: bool) -> Self {
        if dark {
            Theme::Dark
        } else {
            Theme::Light
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
        }
    }

    /// Read a theme from a message: `theme` string first, then legacy `dark`.
    pub fn from_envelope(envelope: &Envelope) -> Option<Self> {
        envelope
            .str_field("theme")
            .and_then(Theme::parse)
            .or_else(|| envelope.bool_field("dark").map(Theme::from_dark_flag))
    }
}

impl std::fmt::Display for Theme {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Layout context provided by the host during the handshake.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Layout {
    /// Raw theme string as sent (kept verbatim even if unrecognized).
    pub theme: Option<String>,
    /// Host content width in pixels.
    pub width: Option<u64>,
    pub locale: Option<String>,
    pub currency: Option<String>,
    /// The layout object exactly as received.
    pub raw: Map<String, Value>,
}

impl Layout {
    /// Build from a raw layout object. Non-objects give an empty layout.
    pub fn from_value(value: &Value) -> Self {
        let raw = value.as_object().cloned().unwrap_or_default();
        let text = |key: &str| raw.get(key).and_then(Value::as_str).map(str::to_string);

        Self {
            theme: text("theme"),
            width: raw.get("width").and_then(Value::as_u64),
            locale: text("locale"),
            currency: text("currency"),
            raw: raw.clone(),
        }
    }

    /// Parsed theme, if the host sent a recognized one.
    pub fn theme(&self) -> Option<Theme> {
        self.theme.as_deref().and_then(Theme::parse)
    }

    /// Record a theme change in the stored layout.
    pub fn set_theme(&mut self, theme: Theme) {
        self.theme = Some(theme.as_str().to_string());
        self.raw
            .insert("theme".to_string(), Value::String(theme.as_str().to_string()));
    }
}

/// Merchant fields of the pre-migration flat handshake.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LegacyContext {
    pub token: Option<String>,
    pub dark: Option<bool>,
    pub store_id: Option<u64>,
    pub user_id: Option<u64>,
    pub plan: Option<String>,
    pub base_url: Option<String>,
    pub base_api_url: Option<String>,
    pub parent_width: Option<u64>,
}

impl LegacyContext {
    fn from_envelope(envelope: &Envelope) -> Option<Self> {
        let id = |key: &str| {
            envelope.field(key).and_then(|v| {
                v.as_u64()
                    .or_else(|| v.as_str().and_then(|s| s.parse().ok()))
            })
        };
        let text = |key: &str| envelope.str_field(key).map(str::to_string);

        let context = Self {
            token: text("token"),
            dark: envelope.bool_field("dark"),
            store_id: id("s-store-id"),
            user_id: id("userId"),
            plan: text("plan"),
            base_url: text("baseUrl"),
            base_api_url: text("baseApiUrl"),
            parent_width: id("parentWidth"),
        };

        if context == Self::default() {
            None
        } else {
            Some(context)
        }
    }
}

/// Everything the host supplied in its handshake answer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HostContext {
    pub layout: Option<Layout>,
    pub legacy: Option<LegacyContext>,
    /// Merged message body as received.
    pub raw: Value,
}

impl HostContext {
    /// Parse a context-provide (or legacy `iframe.loading`) message.
    pub fn from_envelope(envelope: &Envelope) -> Self {
        Self {
            layout: envelope.field("layout").map(Layout::from_value),
            legacy: LegacyContext::from_envelope(envelope),
            raw: envelope.body(),
        }
    }

    /// Effective theme: layout theme, else legacy dark flag.
    pub fn theme(&self) -> Option<Theme> {
        self.layout
            .as_ref()
            .and_then(Layout::theme)
            .or_else(|| {
                self.legacy
                    .as_ref()
                    .and_then(|l| l.dark)
                    .map(Theme::from_dark_flag)
            })
    }

    /// Token delivered inline by older hosts.
    pub fn token(&self) -> Option<&str> {
        self.legacy.as_ref().and_then(|l| l.token.as_deref())
    }

    /// Layout to store after the handshake.
    ///
    /// Falls back to one synthesized from the legacy `dark` and
    /// `parentWidth` fields when the host sent no `layout` object.
    pub fn effective_layout(&self) -> Option<Layout> {
        if let Some(layout) = &self.layout {
            return Some(layout.clone());
        }

        let legacy = self.legacy.as_ref()?;
        if legacy.dark.is_none() && legacy.parent_width.is_none() {
            return None;
        }

        let mut layout = Layout {
            width: legacy.parent_width,
            ..Default::default()
        };
        if let Some(dark) = legacy.dark {
            layout.set_theme(Theme::from_dark_flag(dark));
        }
        if let Some(width) = legacy.parent_width {
            layout.raw.insert("width".to_string(), Value::from(width));
        }
        Some(layout)
    }
}

/// Primary nav action clicked by the merchant.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActionClick {
    /// `value` configured via `nav.setAction`.
    pub value: Option<String>,
    pub url: Option<String>,
}

impl ActionClick {
    pub fn from_envelope(envelope: &Envelope) -> Self {
        Self {
            value: envelope.str_field("value").map(str::to_string),
            url: envelope.str_field("url").map(str::to_string),
        }
    }
}

/// Outcome of a checkout started with `checkout.create`.
///
/// The host echoes back the `context` supplied at creation time; that is the
/// only way to match a result to a request, since results may arrive after
/// a full reload.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckoutResult {
    pub success: bool,
    /// `success`, `pending`, `cancelled`, `failed`, ...
    pub status: Option<String>,
    pub order_id: Option<String>,
    pub error: Option<Value>,
    pub context: Option<Value>,
    /// Merged message body as received.
    pub raw: Value,
}

impl CheckoutResult {
    pub fn from_envelope(envelope: &Envelope) -> Self {
        let order_id = envelope.field("order_id").and_then(|v| match v {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        });

        Self {
            success: envelope.bool_field("success").unwrap_or(false),
            status: envelope.str_field("status").map(str::to_string),
            order_id,
            error: envelope.field("error").cloned(),
            context: envelope.field("context").cloned(),
            raw: envelope.body(),
        }
    }

    /// Whether the merchant cancelled the checkout.
    pub fn is_cancelled(&self) -> bool {
        self.status.as_deref() == Some("cancelled")
    }

    /// Whether payment is still being processed.
    pub fn is_pending(&self) -> bool {
        self.success && self.status.as_deref() == Some("pending")
    }

    /// Best-effort error message.
    pub fn error_message(&self) -> Option<&str> {
        self.error
            .as_ref()
            .and_then(|e| e.get("message").and_then(Value::as_str).or_else(|| e.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn envelope(value: Value) -> Envelope {
        Envelope::parse(&value).unwrap()
    }

    #[test]
    fn test_theme_from_envelope() {
        let env = envelope(json!({ "event": "embedded::theme.change", "theme": "dark" }));
        assert_eq!(Theme::from_envelope(&env), Some(Theme::Dark));

        let legacy = envelope(json!({ "event": "salla::theme.change", "dark": false }));
        assert_eq!(Theme::from_envelope(&legacy), Some(Theme::Light));

        let bogus = envelope(json!({ "event": "embedded::theme.change", "theme": 7 }));
        assert_eq!(Theme::from_envelope(&bogus), None);
    }

    #[test]
    fn test_layout_keeps_raw() {
        let layout = Layout::from_value(&json!({
            "theme": "dark",
            "width": 390,
            "locale": "ar",
            "currency": "SAR",
            "direction": "rtl"
        }));

        assert_eq!(layout.theme(), Some(Theme::Dark));
        assert_eq!(layout.width, Some(390));
        assert_eq!(layout.locale.as_deref(), Some("ar"));
        assert_eq!(layout.currency.as_deref(), Some("SAR"));
        assert_eq!(layout.raw["direction"], "rtl");
    }

    #[test]
    fn test_layout_tolerates_bad_fields() {
        let layout = Layout::from_value(&json!({ "width": "wide", "theme": ["dark"] }));
        assert_eq!(layout.width, None);
        assert_eq!(layout.theme, None);

        let empty = Layout::from_value(&json!("nope"));
        assert_eq!(empty, Layout::default());
    }

    #[test]
    fn test_host_context_legacy_fields() {
        let env = envelope(json!({
            "event": "iframe.loading",
            "token": "tok",
            "dark": true,
            "s-store-id": "1234",
            "userId": 99,
            "plan": "pro"
        }));

        let ctx = HostContext::from_envelope(&env);
        assert!(ctx.layout.is_none());
        let legacy = ctx.legacy.as_ref().unwrap();
        assert_eq!(legacy.store_id, Some(1234));
        assert_eq!(legacy.user_id, Some(99));
        assert_eq!(ctx.token(), Some("tok"));
        assert_eq!(ctx.theme(), Some(Theme::Dark));

        let layout = ctx.effective_layout().unwrap();
        assert_eq!(layout.theme(), Some(Theme::Dark));
        assert_eq!(layout.width, None);
    }

    #[test]
    fn test_host_context_namespaced() {
        let env = envelope(json!({
            "event": "embedded::context.provide",
            "payload": { "layout": { "theme": "light", "width": 1024 } }
        }));

        let ctx = HostContext::from_envelope(&env);
        assert!(ctx.legacy.is_none());
        assert_eq!(ctx.theme(), Some(Theme::Light));
    }

    #[test]
    fn test_checkout_result() {
        let env = envelope(json!({
            "event": "embedded::checkout.result",
            "payload": {
                "success": false,
                "status": "failed",
                "error": { "message": "card declined" },
                "context": { "addonSlug": "a" }
            }
        }));

        let result = CheckoutResult::from_envelope(&env);
        assert!(!result.success);
        assert!(!result.is_cancelled());
        assert_eq!(result.error_message(), Some("card declined"));
        assert_eq!(result.context, Some(json!({ "addonSlug": "a" })));
    }

    #[test]
    fn test_action_click() {
        let env = envelope(json!({ "event": "embedded::nav.actionClick", "value": "create" }));
        let click = ActionClick::from_envelope(&env);
        assert_eq!(click.value.as_deref(), Some("create"));
        assert_eq!(click.url, None);
    }
}
