use serde_json::{json, Value};

use crate::error::Result;
use crate::protocol::events::outbound;
use crate::EmbeddedApp;

/// `embedded::auth.*` commands.
pub struct Auth<'a> {
    app: &'a EmbeddedApp,
}

impl<'a> Auth<'a> {
    pub(crate) fn new(app: &'a EmbeddedApp) -> Self {
        Self { app }
    }

    /// Session token from the launch URL, or the latest one pushed by the host.
    pub fn token(&self) -> Option<String> {
        self.app.token()
    }

    /// Ask the host to reload the app with a fresh token.
    pub fn refresh(&self) -> Result<bool> {
        self.app.emit(outbound::AUTH_REFRESH, json!({}))
    }

    /// Ask the host to introspect the current token.
    ///
    /// # Errors
    ///
    /// `Timeout` after the request timeout, `Host` if the host reports an
    /// error (for example an expired token).
    pub async fn introspect(&self) -> Result<Value> {
        self.app
            .call(outbound::AUTH_INTROSPECT, json!({}), None)
            .await
    }

    /// Report an auth failure; the host navigates away with a toast.
    pub fn error(&self, message: &str) -> Result<bool> {
        self.app
            .emit(outbound::AUTH_ERROR, json!({ "message": message }))
    }

    /// Leave the app for the installed apps page.
    pub fn logout(&self) -> Result<bool> {
        self.app.emit(outbound::AUTH_LOGOUT, json!({}))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::test_support::{connected, next, HOST_ORIGIN};
    use crate::error::EmbeddedError;
    use crate::transport::pair;

    #[tokio::test]
    async fn test_token_from_launch_url() {
        let (end, _host) = pair(HOST_ORIGIN);
        let app = EmbeddedApp::builder()
            .launch_url("https://app.example/?token=tok-1&appId=5")
            .connect(end)
            .unwrap();

        assert_eq!(app.auth().token().as_deref(), Some("tok-1"));
        assert_eq!(app.config().app_id.as_deref(), Some("5"));
    }

    #[tokio::test]
    async fn test_legacy_auth_updates_token() {
        let (app, host) = connected();
        assert!(app.auth().token().is_none());

        host.post(json!({ "event": "iframe.legacy.auth", "token": "tok-2" }));
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;

        assert_eq!(app.auth().token().as_deref(), Some("tok-2"));
    }

    #[tokio::test]
    async fn test_introspect_resolves() {
        let (app, mut host) = connected();

        let call = tokio::spawn({
            let app = app.clone();
            async move { app.auth().introspect().await }
        });

        let request = next(&mut host).await;
        assert_eq!(request.data["event"], "embedded::auth.introspect");
        let id = request.data["correlationId"].as_str().unwrap().to_string();

        host.post(json!({
            "event": "embedded::auth.introspect.response",
            "correlationId": id,
            "payload": { "data": { "id": 1, "user_id": 7 } }
        }));

        let value = call.await.unwrap().unwrap();
        assert_eq!(value["data"]["user_id"], 7);
    }

    #[tokio::test]
    async fn test_introspect_host_error() {
        let (app, mut host) = connected();

        let call = tokio::spawn({
            let app = app.clone();
            async move { app.auth().introspect().await }
        });

        let request = next(&mut host).await;
        host.post(json!({
            "event": "embedded::auth.introspect.response",
            "correlationId": request.data["correlationId"],
            "error": { "message": "token expired" }
        }));

        match call.await.unwrap() {
            Err(EmbeddedError::Host { event, message, .. }) => {
                assert_eq!(event, "embedded::auth.introspect");
                assert_eq!(message, "token expired");
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_fire_and_forget_commands() {
        let (app, mut host) = connected();

        app.auth().refresh().unwrap();
        app.auth().error("Token verification failed").unwrap();
        app.auth().logout().unwrap();

        let events: Vec<Value> = host.drain().into_iter().map(|m| m.data).collect();
        assert_eq!(events[0]["event"], "embedded::auth.refresh");
        assert_eq!(events[1]["payload"]["message"], "Token verification failed");
        assert_eq!(events[2]["event"], "embedded::auth.logout");
    }

    #[tokio::test]
    async fn test_commands_after_destroy() {
        let (app, _host) = connected();
        app.destroy();

        assert!(matches!(app.auth().refresh(), Err(EmbeddedError::Destroyed)));
        assert!(matches!(
            app.auth().introspect().await,
            Err(EmbeddedError::Destroyed)
        ));
    }
}
