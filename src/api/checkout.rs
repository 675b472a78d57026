use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::Result;
use crate::protocol::{events::outbound, CheckoutResult};
use crate::subscription::Subscription;
use crate::EmbeddedApp;

/// One purchasable item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutItem {
    /// Item type, e.g. `addon`.
    #[serde(rename = "type")]
    pub kind: String,
    pub slug: String,
    pub quantity: u32,
}

impl CheckoutItem {
    pub fn addon(slug: impl Into<String>, quantity: u32) -> Self {
        Self {
            kind: "addon".to_string(),
            slug: slug.into(),
            quantity: quantity.max(1),
        }
    }
}

/// Options for [`Checkout::create`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CheckoutOptions {
    /// Opaque value echoed back in `embedded::checkout.result`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<Value>,
}

impl CheckoutOptions {
    pub fn with_context(context: Value) -> Self {
        Self {
            context: Some(context),
        }
    }
}

#[derive(Serialize)]
struct CreatePayload<'a> {
    items: &'a [CheckoutItem],
    #[serde(flatten)]
    options: &'a CheckoutOptions,
}

/// `embedded::checkout.*` commands.
///
/// Checkout results are not correlated: the host may deliver them after a
/// full reload of the app, so callers subscribe with [`on_result`](Self::on_result)
/// and match on the `context` they passed to [`create`](Self::create).
pub struct Checkout<'a> {
    app: &'a EmbeddedApp,
}

impl<'a> Checkout<'a> {
    pub(crate) fn new(app: &'a EmbeddedApp) -> Self {
        Self { app }
    }

    /// Start a checkout.
    pub fn create(&self, items: &[CheckoutItem], options: &CheckoutOptions) -> Result<bool> {
        self.app
            .emit_with(outbound::CHECKOUT_CREATE, &CreatePayload { items, options })
    }

    /// List addons available for purchase.
    ///
    /// # Errors
    ///
    /// `Timeout` after the request timeout, `Host` when the host answers
    /// `success: false`.
    pub async fn get_addons(&self) -> Result<Vec<Value>> {
        let answer = self
            .app
            .call(outbound::CHECKOUT_GET_ADDONS, json!({}), None)
            .await?;

        Ok(answer
            .get("addons")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default())
    }

    /// Subscribe to checkout outcomes.
    pub fn on_result<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&CheckoutResult) + Send + Sync + 'static,
    {
        self.app.inner.topics.checkout.subscribe(callback)
    }
}
