use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::Result;
use crate::protocol::events::outbound;
use crate::EmbeddedApp;

/// Options for [`Page::navigate`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NavigateOptions {
    /// History state handed to the dashboard router.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<Value>,
    /// Replace the current history entry instead of pushing.
    pub replace: bool,
}

/// One breadcrumb entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Breadcrumb {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl Breadcrumb {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            url: None,
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }
}

#[derive(Serialize)]
struct NavigatePayload<'a> {
    path: &'a str,
    #[serde(flatten)]
    options: &'a NavigateOptions,
}

/// `embedded::page.*` commands.
pub struct Page<'a> {
    app: &'a EmbeddedApp,
}

impl<'a> Page<'a> {
    pub(crate) fn new(app: &'a EmbeddedApp) -> Self {
        Self { app }
    }

    /// SPA navigation to a dashboard path.
    pub fn navigate(&self, path: &str, options: NavigateOptions) -> Result<bool> {
        self.app.emit_with(
            outbound::PAGE_NAVIGATE,
            &NavigatePayload {
                path,
                options: &options,
            },
        )
    }

    /// Full-page redirect to an external URL.
    pub fn redirect(&self, url: &str) -> Result<bool> {
        self.app.emit(outbound::PAGE_REDIRECT, json!({ "url": url }))
    }

    pub fn set_title(&self, title: &str) -> Result<bool> {
        self.app
            .emit(outbound::PAGE_SET_TITLE, json!({ "title": title }))
    }

    pub fn set_breadcrumbs(&self, breadcrumbs: &[Breadcrumb]) -> Result<bool> {
        self.app.emit(
            outbound::PAGE_SET_BREADCRUMBS,
            json!({ "breadcrumbs": breadcrumbs }),
        )
    }

    /// Ask the host to change the frame height.
    pub fn resize(&self, height: u32) -> Result<bool> {
        self.app
            .emit(outbound::IFRAME_RESIZE, json!({ "height": height }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::test_support::{connected, next};

    #[tokio::test]
    async fn test_navigate_before_ready() {
        let (app, mut host) = connected();

        // Commands are optimistic: no init required.
        assert!(app
            .page()
            .navigate(
                "/products",
                NavigateOptions {
                    state: Some(json!({ "from": "app" })),
                    replace: true,
                },
            )
            .unwrap());

        let posted = next(&mut host).await;
        assert_eq!(posted.data["event"], "embedded::page.navigate");
        assert_eq!(
            posted.data["payload"],
            json!({ "path": "/products", "state": { "from": "app" }, "replace": true })
        );
        assert!(posted.data["timestamp"].is_u64());
    }

    #[tokio::test]
    async fn test_page_commands() {
        let (app, mut host) = connected();

        app.page().redirect("https://salla.sa").unwrap();
        app.page().set_title("My App - Product Details").unwrap();
        app.page()
            .set_breadcrumbs(&[
                Breadcrumb::new("Apps").with_url("/apps"),
                Breadcrumb::new("Settings"),
            ])
            .unwrap();
        app.page().resize(800).unwrap();

        let sent: Vec<Value> = host.drain().into_iter().map(|m| m.data).collect();
        assert_eq!(sent[0]["payload"]["url"], "https://salla.sa");
        assert_eq!(sent[1]["event"], "embedded::page.setTitle");
        assert_eq!(
            sent[2]["payload"]["breadcrumbs"],
            json!([{ "title": "Apps", "url": "/apps" }, { "title": "Settings" }])
        );
        assert_eq!(sent[3]["event"], "embedded::iframe.resize");
        assert_eq!(sent[3]["payload"]["height"], 800);
    }

    #[test]
    fn test_standalone_returns_false() {
        let app = EmbeddedApp::builder().build().unwrap();
        assert!(!app.page().set_title("x").unwrap());
    }
}
