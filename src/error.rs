//! Error types for embedded-bridge.

use std::time::Duration;

use thiserror::Error;

/// Main error type for all embedded SDK operations.
#[derive(Debug, Error)]
pub enum EmbeddedError {
    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Malformed URL (launch URL or verifier endpoint).
    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),

    /// HTTP error while talking to the verification service.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// No parent window is attached (running standalone).
    #[error("No target window")]
    NoTargetWindow,

    /// The window channel was closed by the other side.
    #[error("Connection closed")]
    ConnectionClosed,

    /// The host did not answer a correlated request in time.
    #[error("Request '{event}' timed out after {after:?}")]
    Timeout {
        /// Event name of the request.
        event: String,
        /// Configured deadline.
        after: Duration,
    },

    /// The host answered a correlated request with an error.
    #[error("Host rejected '{event}': {message}")]
    Host {
        /// Event name of the request.
        event: String,
        /// Human readable message extracted from the response.
        message: String,
        /// Raw error data supplied by the host.
        details: serde_json::Value,
    },

    /// The SDK instance has been destroyed.
    #[error("SDK destroyed")]
    Destroyed,

    /// Operation is not allowed in the current lifecycle state.
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// An earlier handshake attempt on this instance failed.
    #[error("Handshake failed: {0}")]
    HandshakeFailed(String),

    /// Token verification request was rejected before being sent.
    #[error("Verification error: {0}")]
    Verification(String),

    /// Invalid configuration value.
    #[error("Config error: {0}")]
    Config(String),
}

impl EmbeddedError {
    /// Whether this error is a request timeout.
    pub fn is_timeout(&self) -> bool {
        matches!(self, EmbeddedError::Timeout { .. })
    }
}

/// Result type alias using EmbeddedError.
pub type Result<T> = std::result::Result<T, EmbeddedError>;
