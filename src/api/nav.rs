use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::app::lock;
use crate::error::Result;
use crate::protocol::{events::outbound, ActionClick};
use crate::subscription::Subscription;
use crate::EmbeddedApp;

/// Secondary entry in the action button's dropdown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtendedAction {
    pub title: String,
    pub value: String,
}

/// Primary nav action button.
///
/// `value` is echoed back in `embedded::nav.actionClick`, which is how
/// clicks are told apart.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionConfig {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sub_title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disabled: Option<bool>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub extended_actions: Vec<ExtendedAction>,
}

impl ActionConfig {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }

    pub fn value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = Some(icon.into());
        self
    }

    pub fn extended(mut self, title: impl Into<String>, value: impl Into<String>) -> Self {
        self.extended_actions.push(ExtendedAction {
            title: title.into(),
            value: value.into(),
        });
        self
    }
}

#[derive(Serialize)]
struct SetActionPayload<'a> {
    #[serde(flatten)]
    config: &'a ActionConfig,
    #[serde(rename = "onClick", skip_serializing_if = "std::ops::Not::not")]
    on_click: bool,
}

/// `embedded::nav.*` commands.
pub struct Nav<'a> {
    app: &'a EmbeddedApp,
}

impl<'a> Nav<'a> {
    pub(crate) fn new(app: &'a EmbeddedApp) -> Self {
        Self { app }
    }

    /// Show the primary action button.
    ///
    /// Replaces any closure installed with [`set_action_with`](Self::set_action_with).
    pub fn set_action(&self, config: &ActionConfig) -> Result<bool> {
        self.app.ensure_alive()?;
        *lock(&self.app.inner.action_handler) = None;
        self.send(config, false)
    }

    /// Show the primary action button and run `handler` on every click.
    ///
    /// The closure runs before `on_action_click` subscribers and is replaced
    /// by the next `set_action*` or `clear_action` call.
    pub fn set_action_with<F>(&self, config: &ActionConfig, handler: F) -> Result<bool>
    where
        F: Fn(&ActionClick) + Send + Sync + 'static,
    {
        self.app.ensure_alive()?;
        *lock(&self.app.inner.action_handler) = Some(Arc::new(handler));
        self.send(config, true)
    }

    /// Remove the action button.
    pub fn clear_action(&self) -> Result<bool> {
        self.app.ensure_alive()?;
        *lock(&self.app.inner.action_handler) = None;
        self.app.emit(outbound::NAV_CLEAR_ACTION, json!({}))
    }

    /// Subscribe to action clicks (dispatch on `click.value`).
    pub fn on_action_click<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&ActionClick) + Send + Sync + 'static,
    {
        self.app.inner.topics.action.subscribe(callback)
    }

    fn send(&self, config: &ActionConfig, on_click: bool) -> Result<bool> {
        self.app.emit_with(
            outbound::NAV_SET_ACTION,
            &SetActionPayload { config, on_click },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::test_support::{connected, next};
    use std::sync::Mutex;
    use std::time::Duration;

    #[tokio::test]
    async fn test_set_action_payload() {
        let (app, mut host) = connected();

        let config = ActionConfig::new("Add Product")
            .url("/products/new")
            .value("create")
            .extended("Import Products", "import");
        app.nav().set_action(&config).unwrap();

        let posted = next(&mut host).await;
        assert_eq!(posted.data["event"], "embedded::nav.setAction");
        assert_eq!(
            posted.data["payload"],
            json!({
                "title": "Add Product",
                "url": "/products/new",
                "value": "create",
                "extendedActions": [{ "title": "Import Products", "value": "import" }]
            })
        );
    }

    #[tokio::test]
    async fn test_click_dispatch_by_value() {
        let (app, host) = connected();
        let seen = Arc::new(Mutex::new(Vec::new()));

        let sink = seen.clone();
        let sub = app.nav().on_action_click(move |click| {
            sink.lock().unwrap().push(click.value.clone());
        });

        host.post(json!({ "event": "embedded::nav.actionClick", "payload": { "value": "import" } }));
        host.post(json!({ "event": "nav.primary-action.clicked", "value": "create" }));
        tokio::time::sleep(Duration::from_millis(20)).await;

        assert_eq!(
            *seen.lock().unwrap(),
            vec![Some("import".to_string()), Some("create".to_string())]
        );
        assert!(sub.unsubscribe());
    }

    #[tokio::test]
    async fn test_local_handler_runs_first_and_is_replaced() {
        let (app, mut host) = connected();
        let order = Arc::new(Mutex::new(Vec::new()));

        let o = order.clone();
        app.nav().on_action_click(move |_| o.lock().unwrap().push("topic"));
        let o = order.clone();
        app.nav()
            .set_action_with(&ActionConfig::new("Buy").value("buy"), move |_| {
                o.lock().unwrap().push("local")
            })
            .unwrap();

        let posted = next(&mut host).await;
        assert_eq!(posted.data["payload"]["onClick"], true);

        host.post(json!({ "event": "embedded::nav.actionClick", "value": "buy" }));
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(*order.lock().unwrap(), vec!["local", "topic"]);

        app.nav().clear_action().unwrap();
        host.post(json!({ "event": "embedded::nav.actionClick", "value": "buy" }));
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(*order.lock().unwrap(), vec!["local", "topic", "topic"]);
    }
}
