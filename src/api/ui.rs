use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::codec::JsonCodec;
use crate::error::Result;
use crate::protocol::events::outbound;
use crate::EmbeddedApp;

/// How much of the frame the loading indicator covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoadingMode {
    #[default]
    Full,
    Component,
}

/// Toast severity. Each maps to its own event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToastKind {
    Success,
    Error,
    Warning,
    Info,
}

impl ToastKind {
    fn event(&self) -> &'static str {
        match self {
            ToastKind::Success => outbound::UI_TOAST_SUCCESS,
            ToastKind::Error => outbound::UI_TOAST_ERROR,
            ToastKind::Warning => outbound::UI_TOAST_WARNING,
            ToastKind::Info => outbound::UI_TOAST_INFO,
        }
    }
}

/// Confirm dialog contents.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmOptions {
    pub title: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confirm_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cancel_text: Option<String>,
    /// `danger`, `warning`, ...
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variant: Option<String>,
}

impl ConfirmOptions {
    pub fn new(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
            ..Default::default()
        }
    }
}

/// Merchant's answer to a confirm dialog.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfirmResult {
    #[serde(default)]
    pub confirmed: bool,
}

/// `embedded::ui.*` commands.
pub struct Ui<'a> {
    app: &'a EmbeddedApp,
}

impl<'a> Ui<'a> {
    pub(crate) fn new(app: &'a EmbeddedApp) -> Self {
        Self { app }
    }

    pub fn show_loading(&self, mode: LoadingMode) -> Result<bool> {
        self.app.emit(
            outbound::UI_LOADING_SHOW,
            json!({ "status": false, "mode": mode }),
        )
    }

    pub fn hide_loading(&self) -> Result<bool> {
        self.app.emit(
            outbound::UI_LOADING_HIDE,
            json!({ "status": true, "mode": LoadingMode::Full }),
        )
    }

    /// Enter fullscreen overlay mode.
    pub fn open_overlay(&self) -> Result<bool> {
        self.app
            .emit(outbound::UI_OVERLAY_OPEN, json!({ "action": "open" }))
    }

    pub fn close_overlay(&self) -> Result<bool> {
        self.app
            .emit(outbound::UI_OVERLAY_CLOSE, json!({ "action": "close" }))
    }

    /// Show a toast. `duration` is in milliseconds; the host picks a default
    /// when omitted.
    pub fn toast(&self, kind: ToastKind, message: &str, duration: Option<u64>) -> Result<bool> {
        let mut payload = json!({ "type": kind, "message": message });
        if let Some(duration) = duration {
            payload["duration"] = Value::from(duration);
        }
        self.app.emit(kind.event(), payload)
    }

    pub fn success(&self, message: &str) -> Result<bool> {
        self.toast(ToastKind::Success, message, None)
    }

    pub fn error(&self, message: &str) -> Result<bool> {
        self.toast(ToastKind::Error, message, None)
    }

    pub fn open_modal(&self, id: &str, content: Value) -> Result<bool> {
        self.app.emit(
            outbound::UI_MODAL_OPEN,
            json!({ "action": "open", "id": id, "content": content }),
        )
    }

    pub fn close_modal(&self, id: &str) -> Result<bool> {
        self.app.emit(
            outbound::UI_MODAL_CLOSE,
            json!({ "action": "close", "id": id }),
        )
    }

    /// Show a confirm dialog and wait for the merchant's choice.
    ///
    /// # Errors
    ///
    /// `Timeout` after the confirm timeout, `Host` if the host fails the
    /// dialog, `Json` if the answer is not a confirm result.
    pub async fn confirm(&self, options: &ConfirmOptions) -> Result<ConfirmResult> {
        let payload = Value::Object(JsonCodec::encode_object(options)?);
        let timeout = self.app.config().confirm_timeout;
        let answer = self
            .app
            .call(outbound::UI_CONFIRM, payload, Some(timeout))
            .await?;
        JsonCodec::decode(answer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::test_support::{connected, next};
    use crate::error::EmbeddedError;

    #[tokio::test]
    async fn test_toasts_and_loading() {
        let (app, mut host) = connected();

        app.ui().toast(ToastKind::Warning, "Please review your input", Some(4000)).unwrap();
        app.ui().success("Saved").unwrap();
        app.ui().show_loading(LoadingMode::Component).unwrap();
        app.ui().hide_loading().unwrap();

        let sent: Vec<Value> = host.drain().into_iter().map(|m| m.data).collect();
        assert_eq!(sent[0]["event"], "embedded::ui.toast-warning");
        assert_eq!(
            sent[0]["payload"],
            json!({ "type": "warning", "message": "Please review your input", "duration": 4000 })
        );
        assert_eq!(sent[1]["payload"]["type"], "success");
        assert!(sent[1]["payload"].get("duration").is_none());
        assert_eq!(sent[2]["payload"]["mode"], "component");
        assert_eq!(sent[3]["event"], "embedded::ui.loading-hide");
    }

    #[tokio::test]
    async fn test_overlay_and_modal() {
        let (app, mut host) = connected();

        app.ui().open_overlay().unwrap();
        app.ui()
            .open_modal("confirm-dialog", json!({ "title": "Confirm Action" }))
            .unwrap();
        app.ui().close_modal("confirm-dialog").unwrap();
        app.ui().close_overlay().unwrap();

        let sent: Vec<Value> = host.drain().into_iter().map(|m| m.data).collect();
        assert_eq!(sent[0]["event"], "embedded::ui.overlay-open");
        assert_eq!(sent[1]["payload"]["content"]["title"], "Confirm Action");
        assert_eq!(sent[2]["payload"], json!({ "action": "close", "id": "confirm-dialog" }));
        assert_eq!(sent[3]["event"], "embedded::ui.overlay-close");
    }

    #[tokio::test]
    async fn test_confirm_round_trip() {
        let (app, mut host) = connected();

        let call = tokio::spawn({
            let app = app.clone();
            async move {
                app.ui()
                    .confirm(&ConfirmOptions::new("Delete Product?", "Are you sure?"))
                    .await
            }
        });

        let request = next(&mut host).await;
        assert_eq!(request.data["event"], "embedded::ui.confirm");
        assert_eq!(request.data["payload"]["title"], "Delete Product?");

        // Older hosts answer inline with `requestId`.
        host.post(json!({
            "event": "embedded::ui.confirm.response",
            "requestId": request.data["correlationId"],
            "confirmed": true
        }));

        assert_eq!(call.await.unwrap().unwrap(), ConfirmResult { confirmed: true });
        assert_eq!(app.pending_requests(), 0);
    }

    #[tokio::test]
    async fn test_confirm_timeout() {
        let (app, mut host) = connected();

        let result = app
            .ui()
            .confirm(&ConfirmOptions::new("Sure?", "Really?"))
            .await;
        assert!(matches!(result, Err(EmbeddedError::Timeout { .. })));

        // A late answer is ignored.
        let request = next(&mut host).await;
        host.post(json!({
            "event": "embedded::ui.confirm.response",
            "correlationId": request.data["correlationId"],
            "confirmed": true
        }));
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        assert_eq!(app.pending_requests(), 0);
    }
}
