//! Token verification collaborator.
//!
//! The embedded app receives a short-lived token in its launch URL and must
//! have it verified by a backend before trusting it. The backend itself is
//! opaque; this module only defines the request/response contract and an
//! HTTP client for it.
//!
//! ```text
//! POST <endpoint>
//! { "token": "...", "appId": "...", "iss": "merchant-dashboard",
//!   "subject": "embedded-page", "env": "prod" }
//!
//! 200 { "success": true,  "data": { ... } }
//! 4xx { "success": false, "error": "Token is required" }
//! ```

use std::future::Future;
use std::marker::PhantomData;
use std::pin::Pin;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use url::Url;

use crate::config::Environment;
use crate::error::{EmbeddedError, Result};

/// Default token issuer.
pub const DEFAULT_ISSUER: &str = "merchant-dashboard";
/// Default token subject.
pub const DEFAULT_SUBJECT: &str = "embedded-page";
/// Header carrying the app id on verification calls.
pub const APP_ID_HEADER: &str = "s-source";

const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// Boxed future returned by verifiers.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Verification request body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyRequest {
    pub token: String,
    pub app_id: String,
    pub iss: String,
    pub subject: String,
    pub env: Environment,
}

impl VerifyRequest {
    /// Request with the default issuer and subject.
    pub fn new(token: impl Into<String>, app_id: impl Into<String>, env: Environment) -> Self {
        Self {
            token: token.into(),
            app_id: app_id.into(),
            iss: DEFAULT_ISSUER.to_string(),
            subject: DEFAULT_SUBJECT.to_string(),
            env,
        }
    }

    /// Reject requests the verification service would refuse.
    ///
    /// Empty issuer or subject are replaced by the defaults.
    pub fn validate(mut self) -> Result<Self> {
        if self.token.trim().is_empty() {
            return Err(EmbeddedError::Verification("Token is required".into()));
        }
        if self.app_id.trim().is_empty() {
            return Err(EmbeddedError::Verification("App ID is required".into()));
        }
        if self.iss.is_empty() {
            self.iss = DEFAULT_ISSUER.to_string();
        }
        if self.subject.is_empty() {
            self.subject = DEFAULT_SUBJECT.to_string();
        }
        Ok(self)
    }
}

/// Verification service answer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VerifyResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<Value>,
}

impl VerifyResponse {
    pub fn verified(data: Value) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn rejected(error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(Value::String(error.into())),
        }
    }

    /// Error as text (string or `{message}`).
    pub fn error_message(&self) -> Option<String> {
        self.error.as_ref().map(|e| match e {
            Value::String(s) => s.clone(),
            other => other
                .get("message")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| other.to_string()),
        })
    }
}

/// Something that can verify a launch token.
pub trait TokenVerifier: Send + Sync {
    /// Verify a request.
    ///
    /// A service-level rejection is `Ok` with `success: false`; `Err` means
    /// the service could not be asked (validation, network, bad body).
    fn verify(&self, request: VerifyRequest) -> BoxFuture<'_, Result<VerifyResponse>>;
}

/// [`TokenVerifier`] over an async closure.
pub struct FnVerifier<F, Fut>
where
    F: Fn(VerifyRequest) -> Fut + Send + Sync,
    Fut: Future<Output = Result<VerifyResponse>> + Send + 'static,
{
    f: F,
    _phantom: PhantomData<fn() -> Fut>,
}

impl<F, Fut> FnVerifier<F, Fut>
where
    F: Fn(VerifyRequest) -> Fut + Send + Sync,
    Fut: Future<Output = Result<VerifyResponse>> + Send + 'static,
{
    pub fn new(f: F) -> Self {
        Self {
            f,
            _phantom: PhantomData,
        }
    }
}

impl<F, Fut> TokenVerifier for FnVerifier<F, Fut>
where
    F: Fn(VerifyRequest) -> Fut + Send + Sync,
    Fut: Future<Output = Result<VerifyResponse>> + Send + 'static,
{
    fn verify(&self, request: VerifyRequest) -> BoxFuture<'_, Result<VerifyResponse>> {
        match request.validate() {
            Ok(request) => Box::pin((self.f)(request)),
            Err(e) => Box::pin(async move { Err(e) }),
        }
    }
}

/// Verifier posting JSON to an HTTP endpoint.
#[derive(Debug, Clone)]
pub struct HttpTokenVerifier {
    http: reqwest::Client,
    endpoint: Url,
}

impl HttpTokenVerifier {
    /// # Errors
    ///
    /// `Url` if the endpoint is not an absolute URL, `Http` if the client
    /// cannot be built.
    pub fn new(endpoint: &str) -> Result<Self> {
        let endpoint = Url::parse(endpoint)?;
        let http = reqwest::Client::builder().timeout(HTTP_TIMEOUT).build()?;
        Ok(Self { http, endpoint })
    }

    /// Use a preconfigured client.
    pub fn with_client(http: reqwest::Client, endpoint: Url) -> Self {
        Self { http, endpoint }
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    async fn post(&self, request: VerifyRequest) -> Result<VerifyResponse> {
        let request = request.validate()?;

        tracing::debug!(
            endpoint = %self.endpoint,
            app_id = %request.app_id,
            env = %request.env,
            "Verifying token"
        );

        let response = self
            .http
            .post(self.endpoint.clone())
            .header(APP_ID_HEADER, request.app_id.as_str())
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        tracing::debug!(status = status.as_u16(), "Verification service answered");

        // Rejections come back as 4xx with a JSON body.
        let body: VerifyResponse = response.json().await?;
        if !status.is_success() && body.success {
            return Ok(VerifyResponse::rejected(format!("HTTP {}", status.as_u16())));
        }
        Ok(body)
    }
}

impl TokenVerifier for HttpTokenVerifier {
    fn verify(&self, request: VerifyRequest) -> BoxFuture<'_, Result<VerifyResponse>> {
        Box::pin(self.post(request))
    }
}
