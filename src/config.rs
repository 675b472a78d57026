//! SDK configuration.
//!
//! [`SdkConfig`] carries everything an [`EmbeddedApp`](crate::EmbeddedApp)
//! needs besides its window. It can be built in code (all fields have
//! defaults) or loaded from JSON, where durations are given in milliseconds:
//!
//! ```
//! use embedded_bridge::config::{Environment, SdkConfig};
//!
//! let config = SdkConfig::from_json(r#"{
//!     "appId": "1888000112",
//!     "env": "prod",
//!     "allowedOrigins": ["https://s.salla.sa"],
//!     "requestTimeout": 3000
//! }"#).unwrap();
//!
//! assert_eq!(config.env, Environment::Prod);
//! assert_eq!(config.request_timeout.as_millis(), 3000);
//! ```
//!
//! [`LaunchParams`] reads the query string the host appends to the embedded
//! app's URL (`?token=...&appId=...&dark=true`).

use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{EmbeddedError, Result};
use crate::protocol::{Theme, WireFormat};
use crate::transport::ANY_ORIGIN;

/// Default deadline for the init handshake.
pub const DEFAULT_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);
/// Default deadline for simple reads (`auth.introspect`, `checkout.getAddons`).
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(5);
/// Default deadline for interactive requests (`ui.confirm`).
pub const DEFAULT_CONFIRM_TIMEOUT: Duration = Duration::from_secs(10);

/// Deployment environment of the verification service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Dev,
    Prod,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Dev => "dev",
            Environment::Prod => "prod",
        }
    }

    /// Parse `dev` / `prod`.
    ///
    /// # Errors
    ///
    /// Anything else is a `Config` error.
    pub fn parse(value: &str) -> Result<Self> {
        match value {
            "dev" => Ok(Environment::Dev),
            "prod" => Ok(Environment::Prod),
            other => Err(EmbeddedError::Config(format!(
                "Invalid environment: {}. Must be 'dev' or 'prod'",
                other
            ))),
        }
    }
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Configuration for one SDK instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SdkConfig {
    /// Application id assigned by the platform.
    pub app_id: Option<String>,
    pub env: Environment,
    /// Verbose protocol logging.
    pub debug: bool,
    /// Target origin for outbound messages.
    pub target_origin: String,
    /// Origins accepted for inbound messages. Empty accepts any origin.
    pub allowed_origins: Vec<String>,
    /// Outbound envelope layout.
    pub wire_format: WireFormat,
    /// Content height reported in the handshake.
    pub frame_height: Option<u32>,
    #[serde(with = "duration_ms")]
    pub handshake_timeout: Duration,
    #[serde(with = "duration_ms")]
    pub request_timeout: Duration,
    #[serde(with = "duration_ms")]
    pub confirm_timeout: Duration,
}

impl Default for SdkConfig {
    fn default() -> Self {
        Self {
            app_id: None,
            env: Environment::default(),
            debug: false,
            target_origin: ANY_ORIGIN.to_string(),
            allowed_origins: Vec::new(),
            wire_format: WireFormat::default(),
            frame_height: None,
            handshake_timeout: DEFAULT_HANDSHAKE_TIMEOUT,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            confirm_timeout: DEFAULT_CONFIRM_TIMEOUT,
        }
    }
}

impl SdkConfig {
    /// Load from a JSON document. Missing fields take their defaults.
    ///
    /// # Errors
    ///
    /// Returns `Json` on malformed input and `Config` if validation fails.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Check invariants that serde cannot express.
    pub fn validate(&self) -> Result<()> {
        if self.target_origin.is_empty() {
            return Err(EmbeddedError::Config("targetOrigin must not be empty".into()));
        }
        for origin in &self.allowed_origins {
            if origin != ANY_ORIGIN {
                Url::parse(origin).map_err(|e| {
                    EmbeddedError::Config(format!("invalid allowed origin '{}': {}", origin, e))
                })?;
            }
        }
        for (name, timeout) in [
            ("handshakeTimeout", self.handshake_timeout),
            ("requestTimeout", self.request_timeout),
            ("confirmTimeout", self.confirm_timeout),
        ] {
            if timeout.is_zero() {
                return Err(EmbeddedError::Config(format!("{} must be > 0", name)));
            }
        }
        Ok(())
    }

    /// Whether an inbound origin passes the allow-list.
    pub fn accepts_origin(&self, origin: &str) -> bool {
        self.allowed_origins.is_empty()
            || self
                .allowed_origins
                .iter()
                .any(|allowed| {
                    allowed == ANY_ORIGIN
                        || allowed.trim_end_matches('/') == origin.trim_end_matches('/')
                })
    }

    /// Fill gaps from launch parameters (explicit config wins).
    pub fn merge_launch(&mut self, params: &LaunchParams) {
        if self.app_id.is_none() {
            self.app_id = params.app_id.clone();
        }
    }
}

/// Parameters the host puts in the embedded app's URL.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LaunchParams {
    /// Short-lived session token (`?token=`).
    pub token: Option<String>,
    /// Application id (`?appId=`).
    pub app_id: Option<String>,
    /// Initial theme hint (`?dark=true`).
    pub dark: Option<bool>,
}

impl LaunchParams {
    /// Parse a launch URL.
    ///
    /// # Errors
    ///
    /// Returns `Url` if the string is not an absolute URL.
    pub fn from_url(url: &str) -> Result<Self> {
        let url = Url::parse(url)?;
        Ok(Self::from_parsed(&url))
    }

    pub fn from_parsed(url: &Url) -> Self {
        let mut params = Self::default();

        for (key, value) in url.query_pairs() {
            let value = value.trim();
            match key.as_ref() {
                "token" if !value.is_empty() => params.token = Some(value.to_string()),
                "appId" if !value.is_empty() => params.app_id = Some(value.to_string()),
                "dark" => params.dark = Some(matches!(value, "true" | "1")),
                _ => {}
            }
        }

        params
    }

    /// Theme hint derived from `dark`.
    pub fn theme(&self) -> Option<Theme> {
        self.dark.map(Theme::from_dark_flag)
    }
}

/// Serde helper: `Duration` as integer milliseconds.
mod duration_ms {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
