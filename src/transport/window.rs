//! Window abstraction and an in-process channel implementation.
//!
//! [`ParentWindow`] stands in for the host window's `postMessage`. Whatever
//! embeds the app (WebView bridge, wasm shim, test harness) implements it and
//! feeds inbound messages as [`InboundMessage`] values.
//!
//! [`pair`] wires an embedded end to a simulated host over tokio channels:
//!
//! ```text
//! EmbeddedApp ─► ChannelWindow ─► mpsc ─► HostEnd::recv()
//! EmbeddedApp ◄─ WindowEnd.inbound ◄─ mpsc ◄─ HostEnd::post()
//! ```

use serde_json::Value;
use tokio::sync::mpsc;

use crate::error::{EmbeddedError, Result};

/// Wildcard target origin.
pub const ANY_ORIGIN: &str = "*";

/// A message received from another browsing context.
#[derive(Debug, Clone, PartialEq)]
pub struct InboundMessage {
    /// Origin of the sender, as reported by the platform.
    pub origin: String,
    /// Untrusted message data.
    pub data: Value,
}

impl InboundMessage {
    pub fn new(origin: impl Into<String>, data: Value) -> Self {
        Self {
            origin: origin.into(),
            data,
        }
    }
}

/// A message posted to the host window.
#[derive(Debug, Clone, PartialEq)]
pub struct PostedMessage {
    pub data: Value,
    pub target_origin: String,
}

/// Target of outbound messages (the host window).
pub trait ParentWindow: Send + Sync {
    /// Post a message to the window.
    ///
    /// # Errors
    ///
    /// Returns an error if the window is gone or refuses the message.
    fn post_message(&self, data: Value, target_origin: &str) -> Result<()>;
}

/// [`ParentWindow`] backed by a tokio channel.
#[derive(Debug, Clone)]
pub struct ChannelWindow {
    tx: mpsc::UnboundedSender<PostedMessage>,
}

impl ChannelWindow {
    /// Create a window and the receiver of everything posted to it.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<PostedMessage>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl ParentWindow for ChannelWindow {
    fn post_message(&self, data: Value, target_origin: &str) -> Result<()> {
        self.tx
            .send(PostedMessage {
                data,
                target_origin: target_origin.to_string(),
            })
            .map_err(|_| EmbeddedError::ConnectionClosed)
    }
}

/// Embedded side of an in-process [`pair`].
pub struct WindowEnd {
    /// Window to hand to the SDK.
    pub window: ChannelWindow,
    /// Messages posted by the host, to hand to the SDK listener.
    pub inbound: mpsc::UnboundedReceiver<InboundMessage>,
}

/// Simulated host side of an in-process [`pair`].
pub struct HostEnd {
    origin: String,
    received: mpsc::UnboundedReceiver<PostedMessage>,
    sender: mpsc::UnboundedSender<InboundMessage>,
}

impl HostEnd {
    /// Origin stamped on every message this host posts.
    pub fn origin(&self) -> &str {
        &self.origin
    }

    /// Post a message to the embedded context.
    ///
    /// Returns `false` if the embedded side has stopped listening.
    pub fn post(&self, data: Value) -> bool {
        self.post_from(&self.origin, data)
    }

    /// Post a message with a spoofed origin.
    pub fn post_from(&self, origin: &str, data: Value) -> bool {
        self.sender.send(InboundMessage::new(origin, data)).is_ok()
    }

    /// Wait for the next message from the embedded context.
    pub async fn recv(&mut self) -> Option<PostedMessage> {
        self.received.recv().await
    }

    /// Take a message if one is already queued.
    pub fn try_recv(&mut self) -> Option<PostedMessage> {
        self.received.try_recv().ok()
    }

    /// Everything queued right now.
    pub fn drain(&mut self) -> Vec<PostedMessage> {
        let mut out = Vec::new();
        while let Some(message) = self.try_recv() {
            out.push(message);
        }
        out
    }
}

/// Create a connected embedded/host pair.
pub fn pair(host_origin: &str) -> (WindowEnd, HostEnd) {
    let (window, received) = ChannelWindow::new();
    let (sender, inbound) = mpsc::unbounded_channel();

    (
        WindowEnd { window, inbound },
        HostEnd {
            origin: host_origin.to_string(),
            received,
            sender,
        },
    )
}
