//! Standard startup sequence of an embedded app.
//!
//! ```text
//! init() ──► token? ──no──────────────────────► ready()
//!              │
//!              └─yes─► verify ──ok──────────────► ready()
//!                         └───failed──► stop (no ready)
//! ```
//!
//! The host keeps its loading state until `embedded::ready` arrives, so a
//! rejected token leaves the app behind the host's loader instead of showing
//! an unauthenticated page.

use serde_json::Value;

use crate::error::{EmbeddedError, Result};
use crate::protocol::HostContext;
use crate::verify::{TokenVerifier, VerifyRequest};
use crate::EmbeddedApp;

/// Reported when the verifier gives no reason.
pub const VERIFICATION_FAILED: &str = "Token verification failed";

/// Outcome of the token check.
#[derive(Debug, Clone, PartialEq)]
pub enum Verification {
    /// No token in the launch URL or handshake.
    Skipped,
    /// Verified; carries the service's `data`.
    Verified(Value),
    Failed(String),
}

impl Verification {
    pub fn is_failed(&self) -> bool {
        matches!(self, Verification::Failed(_))
    }
}

/// Result of [`run`].
#[derive(Debug, Clone)]
pub struct BootstrapReport {
    pub context: HostContext,
    pub token: Option<String>,
    pub verification: Verification,
    /// Whether `embedded::ready` was posted.
    pub ready_sent: bool,
}

/// Run the startup sequence.
///
/// A rejected token is not an `Err`: the report carries
/// [`Verification::Failed`] and `ready` is not sent.
///
/// # Errors
///
/// Handshake errors from [`EmbeddedApp::init`] and `Destroyed` if the app
/// goes away midway. To retry after an error, call
/// [`EmbeddedApp::reset`] and run again.
pub async fn run(app: &EmbeddedApp, verifier: &dyn TokenVerifier) -> Result<BootstrapReport> {
    let context = app.init().await?;
    tracing::debug!(theme = ?context.theme(), "Handshake complete");

    let token = app.auth().token();
    let verification = match &token {
        None => {
            tracing::debug!("No token, skipping verification");
            Verification::Skipped
        }
        Some(token) => verify(app, verifier, token).await,
    };

    if let Verification::Failed(reason) = &verification {
        tracing::warn!(reason = %reason, "Token verification failed, not signalling ready");
        return Ok(BootstrapReport {
            context,
            token,
            verification,
            ready_sent: false,
        });
    }

    let ready_sent = match app.ready() {
        Ok(sent) => sent,
        // Someone else already moved the lifecycle on.
        Err(EmbeddedError::InvalidState(_)) => false,
        Err(e) => return Err(e),
    };

    Ok(BootstrapReport {
        context,
        token,
        verification,
        ready_sent,
    })
}

async fn verify(app: &EmbeddedApp, verifier: &dyn TokenVerifier, token: &str) -> Verification {
    let config = app.config();
    let request = VerifyRequest::new(
        token,
        config.app_id.clone().unwrap_or_default(),
        config.env,
    );

    match verifier.verify(request).await {
        Ok(response) if response.success => {
            Verification::Verified(response.data.unwrap_or(Value::Null))
        }
        Ok(response) => Verification::Failed(
            response
                .error_message()
                .unwrap_or_else(|| VERIFICATION_FAILED.to_string()),
        ),
        Err(e) => Verification::Failed(e.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::test_support::{next, HOST_ORIGIN};
    use crate::transport::{pair, HostEnd};
    use crate::verify::{FnVerifier, VerifyResponse};
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    fn app_with(url: &str) -> (EmbeddedApp, HostEnd) {
        let (end, host) = pair(HOST_ORIGIN);
        let app = EmbeddedApp::builder()
            .launch_url(url)
            .handshake_timeout(Duration::from_millis(300))
            .connect(end)
            .unwrap();
        (app, host)
    }

    /// Answer the handshake, then collect what follows.
    async fn answer_handshake(host: &mut HostEnd) {
        let ready = next(host).await;
        assert_eq!(ready.data["event"], "embedded::iframe.ready");
        host.post(json!({
            "event": "embedded::context.provide",
            "correlationId": ready.data["correlationId"],
            "payload": { "layout": { "theme": "light", "locale": "ar" } }
        }));
    }

    fn accepting() -> FnVerifier<
        impl Fn(VerifyRequest) -> std::future::Ready<Result<VerifyResponse>> + Send + Sync,
        std::future::Ready<Result<VerifyResponse>>,
    > {
        FnVerifier::new(|request: VerifyRequest| {
            std::future::ready(Ok(VerifyResponse::verified(
                json!({ "app_id": request.app_id }),
            )))
        })
    }

    #[tokio::test]
    async fn test_verified_then_ready() {
        let (app, mut host) = app_with("https://app.example/?token=tok&appId=42");

        let run = tokio::spawn({
            let app = app.clone();
            async move { run(&app, &accepting()).await }
        });
        answer_handshake(&mut host).await;

        let report = run.await.unwrap().unwrap();
        assert_eq!(report.token.as_deref(), Some("tok"));
        assert_eq!(report.verification, Verification::Verified(json!({ "app_id": "42" })));
        assert!(report.ready_sent);
        assert_eq!(next(&mut host).await.data["event"], "embedded::ready");
    }

    #[tokio::test]
    async fn test_rejected_token_withholds_ready() {
        let (app, mut host) = app_with("https://app.example/?token=bad&appId=42");
        let verifier = FnVerifier::new(|_| {
            std::future::ready(Ok(VerifyResponse {
                success: false,
                ..Default::default()
            }))
        });

        let run = tokio::spawn({
            let app = app.clone();
            async move { run(&app, &verifier).await }
        });
        answer_handshake(&mut host).await;

        let report = run.await.unwrap().unwrap();
        assert_eq!(
            report.verification,
            Verification::Failed(VERIFICATION_FAILED.to_string())
        );
        assert!(!report.ready_sent);

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(host.try_recv().is_none());
    }

    #[tokio::test]
    async fn test_no_token_skips_verification() {
        let (app, mut host) = app_with("https://app.example/?appId=42");
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let verifier = FnVerifier::new(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            std::future::ready(Ok(VerifyResponse::verified(Value::Null)))
        });

        let run = tokio::spawn({
            let app = app.clone();
            async move { run(&app, &verifier).await }
        });
        answer_handshake(&mut host).await;

        let report = run.await.unwrap().unwrap();
        assert_eq!(report.verification, Verification::Skipped);
        assert!(report.ready_sent);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_missing_app_id_fails_verification() {
        let (app, mut host) = app_with("https://app.example/?token=tok");

        let run = tokio::spawn({
            let app = app.clone();
            async move { run(&app, &accepting()).await }
        });
        answer_handshake(&mut host).await;

        let report = run.await.unwrap().unwrap();
        match report.verification {
            Verification::Failed(reason) => assert!(reason.contains("App ID is required")),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_handshake_timeout_then_retry() {
        let (app, mut host) = app_with("https://app.example/?appId=42");

        let first = run(&app, &accepting()).await;
        assert!(matches!(first, Err(EmbeddedError::Timeout { .. })));
        host.drain();

        app.reset();
        let retry = tokio::spawn({
            let app = app.clone();
            async move { run(&app, &accepting()).await }
        });
        answer_handshake(&mut host).await;

        assert!(retry.await.unwrap().unwrap().ready_sent);
    }
}
