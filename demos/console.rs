//! Console demo - an embedded app talking to a simulated dashboard.
//!
//! This demo shows:
//! - Wiring an app to a host over an in-process pair
//! - The bootstrap sequence (handshake, token check, ready)
//! - Fire-and-forget commands and a correlated confirm dialog
//! - Theme and action-click subscriptions
//! - The message log
//!
//! # Running
//!
//! ```text
//! EMBEDDED_LOG=debug cargo run --example console
//! ```

use std::sync::Arc;
use std::time::Duration;

use embedded_bridge::api::{ActionConfig, Breadcrumb, ConfirmOptions, ToastKind};
use embedded_bridge::bootstrap::{self, Verification};
use embedded_bridge::logging::init_tracing;
use embedded_bridge::observer::MessageLog;
use embedded_bridge::transport::{pair, HostEnd};
use embedded_bridge::verify::{FnVerifier, VerifyRequest, VerifyResponse};
use embedded_bridge::EmbeddedApp;
use serde_json::json;

const DASHBOARD: &str = "https://s.salla.sa";

/// Minimal dashboard: answers the handshake and confirm dialogs, pushes a
/// theme change and a nav click, and prints every command it receives.
async fn run_host(mut host: HostEnd) {
    while let Some(message) = host.recv().await {
        let data = message.data;
        let event = data["event"].as_str().unwrap_or("?").to_string();
        println!("[host] <- {} {}", event, data["payload"]);

        match event.as_str() {
            "embedded::iframe.ready" => {
                host.post(json!({
                    "event": "embedded::context.provide",
                    "correlationId": data["correlationId"],
                    "payload": {
                        "layout": { "theme": "light", "locale": "ar", "width": 1180, "currency": "SAR" }
                    }
                }));
            }
            "embedded::ui.confirm" => {
                host.post(json!({
                    "event": "embedded::ui.confirm.response",
                    "correlationId": data["correlationId"],
                    "payload": { "confirmed": true }
                }));
            }
            "embedded::ready" => {
                host.post(json!({ "event": "embedded::theme.change", "payload": { "theme": "dark" } }));
                host.post(json!({ "event": "embedded::nav.actionClick", "payload": { "value": "import" } }));
            }
            "embedded::destroy" => break,
            _ => {}
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing(true);

    let (end, host) = pair(DASHBOARD);
    let host_task = tokio::spawn(run_host(host));

    let log = Arc::new(MessageLog::new());
    let app = EmbeddedApp::builder()
        .launch_url("https://app.example/?token=demo-token&appId=1888000112&dark=false")
        .allowed_origin(DASHBOARD)
        .observer(log.clone())
        .connect(end)?;

    app.on_theme_change(|theme| println!("[app] theme is now {}", theme));
    app.nav().on_action_click(|click| {
        println!("[app] action clicked: {}", click.value.as_deref().unwrap_or("-"))
    });

    // Stand-in for the backend verification endpoint.
    let verifier = FnVerifier::new(|request: VerifyRequest| async move {
        Ok(VerifyResponse::verified(
            json!({ "app_id": request.app_id, "merchant": 1234 }),
        ))
    });

    let report = bootstrap::run(&app, &verifier).await?;
    match &report.verification {
        Verification::Verified(data) => println!("[app] token verified: {}", data),
        Verification::Skipped => println!("[app] no token"),
        Verification::Failed(reason) => {
            println!("[app] verification failed: {}", reason);
            return Ok(());
        }
    }

    app.page().set_title("Demo - Products")?;
    app.page().set_breadcrumbs(&[
        Breadcrumb::new("Apps").with_url("/apps"),
        Breadcrumb::new("Demo"),
    ])?;
    app.nav().set_action(
        &ActionConfig::new("Add Product")
            .value("create")
            .extended("Import Products", "import"),
    )?;

    let answer = app
        .ui()
        .confirm(&ConfirmOptions::new("Delete Product?", "This cannot be undone."))
        .await?;
    if answer.confirmed {
        app.ui().toast(ToastKind::Success, "Product deleted", Some(3000))?;
    }

    tokio::time::sleep(Duration::from_millis(50)).await;
    app.destroy();
    host_task.await?;

    println!("\n--- message log ---\n{}", log.render(true));
    Ok(())
}
