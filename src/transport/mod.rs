//! Transport module - outbound posting and the inbound listener.
//!
//! The [`Transport`] owns the target window (if any), the wire format, the
//! observer hook and the single inbound listener task. It never interprets
//! messages; inbound values go straight to the handler installed with
//! [`Transport::listen`].
//!
//! # Example
//!
//! ```ignore
//! use embedded_bridge::transport::{pair, Transport};
//!
//! let (embedded, host) = pair("https://dashboard.example");
//! let transport = Transport::new(Some(Arc::new(embedded.window)));
//! transport.listen(embedded.inbound, |msg| println!("{:?}", msg))?;
//! ```

mod window;

pub use window::{
    pair, ChannelWindow, HostEnd, InboundMessage, ParentWindow, PostedMessage, WindowEnd,
    ANY_ORIGIN,
};

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::error::{EmbeddedError, Result};
use crate::observer::{MessageObserver, MessageRecord};
use crate::protocol::{Envelope, WireFormat};

/// Sends envelopes to the host window and runs the inbound listener.
pub struct Transport {
    window: Option<Arc<dyn ParentWindow>>,
    target_origin: String,
    format: WireFormat,
    observer: Option<Arc<dyn MessageObserver>>,
    listening: AtomicBool,
    listener: Mutex<Option<JoinHandle<()>>>,
}

impl Transport {
    /// Create a transport. `None` means standalone (not embedded).
    pub fn new(window: Option<Arc<dyn ParentWindow>>) -> Self {
        Self {
            window,
            target_origin: ANY_ORIGIN.to_string(),
            format: WireFormat::default(),
            observer: None,
            listening: AtomicBool::new(false),
            listener: Mutex::new(None),
        }
    }

    /// Restrict outbound messages to a specific target origin.
    pub fn with_target_origin(mut self, origin: impl Into<String>) -> Self {
        self.target_origin = origin.into();
        self
    }

    pub fn with_format(mut self, format: WireFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_observer(mut self, observer: Arc<dyn MessageObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Whether a target window is attached.
    pub fn has_target(&self) -> bool {
        self.window.is_some()
    }

    pub fn target_origin(&self) -> &str {
        &self.target_origin
    }

    /// Post an envelope to the host.
    ///
    /// Returns `false` when there is no target window or the window refused
    /// the message. Either way the attempt is reported to the observer.
    pub fn send(&self, envelope: &Envelope) -> bool {
        let data = envelope.to_wire(self.format);

        let window = match &self.window {
            Some(w) => w,
            None => {
                tracing::warn!(event = %envelope.event, "No parent window, message not sent");
                self.observe(MessageRecord::outgoing(data).with_error("No parent window"));
                return false;
            }
        };

        match window.post_message(data.clone(), &self.target_origin) {
            Ok(()) => {
                self.observe(MessageRecord::outgoing(data));
                true
            }
            Err(e) => {
                tracing::warn!(event = %envelope.event, "Failed to post message: {}", e);
                self.observe(MessageRecord::outgoing(data).with_error(e.to_string()));
                false
            }
        }
    }

    /// Report an inbound message to the observer.
    pub fn observe_incoming(&self, message: &InboundMessage, error: Option<&str>) {
        let record = MessageRecord::incoming(message.data.clone(), message.origin.clone());
        self.observe(match error {
            Some(e) => record.with_error(e),
            None => record,
        });
    }

    fn observe(&self, record: MessageRecord) {
        if let Some(observer) = &self.observer {
            observer.observe(&record);
        }
    }

    /// Install the inbound listener.
    ///
    /// Only one listener may run; a second call is a no-op returning
    /// `Ok(false)`. The handler runs for every message in arrival order; a
    /// panicking handler is caught and the listener keeps going.
    ///
    /// # Errors
    ///
    /// Returns `InvalidState` when called outside a tokio runtime.
    pub fn listen<F>(
        &self,
        mut inbound: mpsc::UnboundedReceiver<InboundMessage>,
        handler: F,
    ) -> Result<bool>
    where
        F: Fn(InboundMessage) + Send + Sync + 'static,
    {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|_| EmbeddedError::InvalidState("listener needs a tokio runtime".into()))?;

        if self.listening.swap(true, Ordering::AcqRel) {
            tracing::debug!("Inbound listener already installed");
            return Ok(false);
        }

        let task = runtime.spawn(async move {
            while let Some(message) = inbound.recv().await {
                if catch_unwind(AssertUnwindSafe(|| handler(message))).is_err() {
                    tracing::error!("Inbound handler panicked; listener continues");
                }
            }
            tracing::debug!("Inbound channel closed");
        });

        *lock(&self.listener) = Some(task);
        Ok(true)
    }

    pub fn is_listening(&self) -> bool {
        self.listening.load(Ordering::Acquire)
    }

    /// Stop the listener task. Safe to call repeatedly.
    pub fn shutdown(&self) {
        if let Some(task) = lock(&self.listener).take() {
            task.abort();
        }
        self.listening.store(false, Ordering::Release);
    }
}

impl Drop for Transport {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observer::MessageLog;
    use serde_json::json;
    use std::time::Duration;

    #[test]
    fn test_send_without_window() {
        let log = Arc::new(MessageLog::new());
        let transport = Transport::new(None).with_observer(log.clone());

        let sent = transport.send(&Envelope::new("embedded::ready", json!({})));
        assert!(!sent);
        assert!(!transport.has_target());

        let entries = log.entries(false);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].error.as_deref(), Some("No parent window"));
    }

    #[tokio::test]
    async fn test_send_with_window() {
        let (embedded, mut host) = pair("https://host.example");
        let transport = Transport::new(Some(Arc::new(embedded.window)))
            .with_target_origin("https://host.example");

        assert!(transport.send(&Envelope::new("embedded::ready", json!({}))));

        let posted = host.recv().await.unwrap();
        assert_eq!(posted.target_origin, "https://host.example");
        assert_eq!(posted.data, json!({ "event": "embedded::ready", "payload": {} }));
    }

    #[tokio::test]
    async fn test_send_inline_format() {
        let (embedded, mut host) = pair("https://host.example");
        let transport =
            Transport::new(Some(Arc::new(embedded.window))).with_format(WireFormat::Inline);

        transport.send(&Envelope::new("embedded::iframe.resize", json!({ "height": 800 })));

        let posted = host.recv().await.unwrap();
        assert_eq!(posted.data, json!({ "event": "embedded::iframe.resize", "height": 800 }));
    }

    #[tokio::test]
    async fn test_send_after_host_gone() {
        let (embedded, host) = pair("https://host.example");
        drop(host);
        let transport = Transport::new(Some(Arc::new(embedded.window)));

        assert!(!transport.send(&Envelope::new("embedded::ready", json!({}))));
    }

    #[tokio::test]
    async fn test_listen_is_idempotent() {
        let (embedded, host) = pair("https://host.example");
        let (_, second_inbound) = mpsc::unbounded_channel();
        let transport = Transport::new(None);
        let seen = Arc::new(Mutex::new(Vec::new()));

        let sink = seen.clone();
        assert!(transport
            .listen(embedded.inbound, move |m| sink.lock().unwrap().push(m.data))
            .unwrap());
        assert!(!transport.listen(second_inbound, |_| {}).unwrap());

        host.post(json!({ "event": "a" }));
        tokio::time::sleep(Duration::from_millis(20)).await;

        assert_eq!(seen.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_listener_survives_panicking_handler() {
        let (embedded, host) = pair("https://host.example");
        let transport = Transport::new(None);
        let seen = Arc::new(Mutex::new(Vec::new()));

        let sink = seen.clone();
        transport
            .listen(embedded.inbound, move |m| {
                if m.data["boom"] == true {
                    panic!("bad handler");
                }
                sink.lock().unwrap().push(m.data);
            })
            .unwrap();

        host.post(json!({ "boom": true }));
        host.post(json!({ "event": "after" }));
        tokio::time::sleep(Duration::from_millis(20)).await;

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0]["event"], "after");
    }

    #[tokio::test]
    async fn test_shutdown_allows_relisten() {
        let (embedded, _host) = pair("https://host.example");
        let (_, other) = mpsc::unbounded_channel();
        let transport = Transport::new(None);

        transport.listen(embedded.inbound, |_| {}).unwrap();
        transport.shutdown();
        assert!(!transport.is_listening());
        assert!(transport.listen(other, |_| {}).unwrap());
    }

    #[test]
    fn test_listen_without_runtime() {
        let (_, inbound) = mpsc::unbounded_channel();
        let transport = Transport::new(None);

        assert!(matches!(
            transport.listen(inbound, |_| {}),
            Err(EmbeddedError::InvalidState(_))
        ));
    }
}
