//! Embedded app context object and builder.
//!
//! The [`EmbeddedAppBuilder`] provides a fluent API for configuring the SDK.
//! The [`EmbeddedApp`] owns every piece of protocol state (lifecycle,
//! pending requests, subscriptions) and manages the lifecycle:
//! 1. Install the inbound listener
//! 2. Send `embedded::iframe.ready` and await the host context
//! 3. Dispatch host events to subscribers
//! 4. `destroy()` rejects pending work and stops the listener
//!
//! There is no global instance; create one per embedded context.
//!
//! # Example
//!
//! ```ignore
//! use embedded_bridge::{EmbeddedApp, transport::pair};
//!
//! #[tokio::main]
//! async fn main() -> embedded_bridge::Result<()> {
//!     let (end, _host) = pair("https://s.salla.sa");
//!     let app = EmbeddedApp::builder()
//!         .app_id("1888000112")
//!         .launch_url("https://app.example/?token=abc")
//!         .connect(end)?;
//!
//!     let context = app.init().await?;
//!     println!("theme: {:?}", context.theme());
//!
//!     app.on_theme_change(|theme| println!("theme -> {}", theme));
//!     app.ready()?;
//!     Ok(())
//! }
//! ```

mod dispatch;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use serde::Serialize;
use serde_json::Value;
use tokio::sync::{mpsc, oneshot};

use crate::api::{Auth, Checkout, LogLevel, Nav, Page, Ui};
use crate::codec::JsonCodec;
use crate::config::{Environment, LaunchParams, SdkConfig};
use crate::control::{
    destroy_envelope, handshake_envelope, ready_envelope, InitEvent, InitTicket, Lifecycle,
    LifecycleState,
};
use crate::correlator::Correlator;
use crate::error::{EmbeddedError, Result};
use crate::observer::MessageObserver;
use crate::protocol::{
    events::outbound, now_millis, ActionClick, CheckoutResult, CorrelationId, Envelope,
    HostContext, Layout, Theme, WireFormat,
};
use crate::router::Router;
use crate::subscription::{Subscription, Topic};
use crate::transport::{InboundMessage, ParentWindow, Transport, WindowEnd};

pub(crate) type ActionHandler = Arc<dyn Fn(&ActionClick) + Send + Sync>;

/// Builder for configuring and creating an [`EmbeddedApp`].
pub struct EmbeddedAppBuilder {
    config: SdkConfig,
    window: Option<Arc<dyn ParentWindow>>,
    observer: Option<Arc<dyn MessageObserver>>,
    launch_url: Option<String>,
    launch: LaunchParams,
    router: Router,
}

impl EmbeddedAppBuilder {
    /// Create a builder with default configuration and no window.
    pub fn new() -> Self {
        Self {
            config: SdkConfig::default(),
            window: None,
            observer: None,
            launch_url: None,
            launch: LaunchParams::default(),
            router: Router::new(),
        }
    }

    /// Replace the whole configuration.
    pub fn config(mut self, config: SdkConfig) -> Self {
        self.config = config;
        self
    }

    pub fn app_id(mut self, app_id: impl Into<String>) -> Self {
        self.config.app_id = Some(app_id.into());
        self
    }

    pub fn env(mut self, env: Environment) -> Self {
        self.config.env = env;
        self
    }

    pub fn debug(mut self, debug: bool) -> Self {
        self.config.debug = debug;
        self
    }

    /// Attach the host window. Without one the app runs standalone and
    /// every send returns `false`.
    pub fn window<W: ParentWindow + 'static>(mut self, window: W) -> Self {
        self.window = Some(Arc::new(window));
        self
    }

    pub fn shared_window(mut self, window: Arc<dyn ParentWindow>) -> Self {
        self.window = Some(window);
        self
    }

    /// Report every inbound and outbound message to `observer`.
    pub fn observer(mut self, observer: Arc<dyn MessageObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// URL the embedded app was loaded from (token, app id, theme hint).
    pub fn launch_url(mut self, url: impl Into<String>) -> Self {
        self.launch_url = Some(url.into());
        self
    }

    pub fn launch_params(mut self, params: LaunchParams) -> Self {
        self.launch = params;
        self
    }

    pub fn target_origin(mut self, origin: impl Into<String>) -> Self {
        self.config.target_origin = origin.into();
        self
    }

    /// Accept inbound messages only from `origin`. May be called repeatedly.
    pub fn allowed_origin(mut self, origin: impl Into<String>) -> Self {
        self.config.allowed_origins.push(origin.into());
        self
    }

    pub fn wire_format(mut self, format: WireFormat) -> Self {
        self.config.wire_format = format;
        self
    }

    pub fn frame_height(mut self, height: u32) -> Self {
        self.config.frame_height = Some(height);
        self
    }

    /// Deadline for the init handshake.
    ///
    /// Default: 10 seconds
    pub fn handshake_timeout(mut self, timeout: Duration) -> Self {
        self.config.handshake_timeout = timeout;
        self
    }

    /// Deadline for simple reads (`auth.introspect`, `checkout.getAddons`).
    ///
    /// Default: 5 seconds
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.config.request_timeout = timeout;
        self
    }

    /// Deadline for `ui.confirm`.
    ///
    /// Default: 10 seconds
    pub fn confirm_timeout(mut self, timeout: Duration) -> Self {
        self.config.confirm_timeout = timeout;
        self
    }

    /// Replace the inbound routing table.
    pub fn router(mut self, router: Router) -> Self {
        self.router = router;
        self
    }

    /// Build the app without installing a listener.
    ///
    /// # Errors
    ///
    /// Returns `Config` for an invalid configuration and `Url` for an
    /// unparsable launch URL.
    pub fn build(mut self) -> Result<EmbeddedApp> {
        if let Some(url) = &self.launch_url {
            self.launch = LaunchParams::from_url(url)?;
        }
        self.config.merge_launch(&self.launch);
        self.config.validate()?;

        let mut transport = Transport::new(self.window)
            .with_target_origin(self.config.target_origin.clone())
            .with_format(self.config.wire_format);
        if let Some(observer) = self.observer {
            transport = transport.with_observer(observer);
        }

        tracing::debug!(
            app_id = self.config.app_id.as_deref().unwrap_or("-"),
            env = %self.config.env,
            embedded = transport.has_target(),
            "Embedded app created"
        );

        Ok(EmbeddedApp {
            inner: Arc::new(Inner {
                token: Mutex::new(self.launch.token.clone()),
                launch: self.launch,
                config: self.config,
                transport,
                router: self.router,
                correlator: Correlator::new(),
                lifecycle: Lifecycle::new(),
                handshake_id: Mutex::new(None),
                ready_sent: AtomicBool::new(false),
                layout: Mutex::new(None),
                parent_origin: Mutex::new(None),
                topics: Topics::new(),
                action_handler: Mutex::new(None),
            }),
        })
    }

    /// Build the app on one end of an in-process [`pair`](crate::transport::pair)
    /// and start listening.
    pub fn connect(self, end: WindowEnd) -> Result<EmbeddedApp> {
        let app = self.window(end.window).build()?;
        app.listen(end.inbound)?;
        Ok(app)
    }
}

impl Default for EmbeddedAppBuilder {
    fn default() -> Self {
        Self::new()
    }
}

pub(crate) struct Topics {
    pub(crate) init: Topic<InitEvent>,
    pub(crate) theme: Topic<Theme>,
    pub(crate) action: Topic<ActionClick>,
    pub(crate) checkout: Topic<CheckoutResult>,
}

impl Topics {
    fn new() -> Self {
        Self {
            init: Topic::replaying("init"),
            theme: Topic::new("theme"),
            action: Topic::new("action_click"),
            checkout: Topic::new("checkout_result"),
        }
    }

    fn close(&self) {
        self.init.close();
        self.theme.close();
        self.action.close();
        self.checkout.close();
    }

    fn reset(&self) {
        self.init.reset();
        self.theme.reset();
        self.action.reset();
        self.checkout.reset();
    }
}

pub(crate) struct Inner {
    pub(crate) config: SdkConfig,
    launch: LaunchParams,
    pub(crate) transport: Transport,
    router: Router,
    pub(crate) correlator: Correlator,
    pub(crate) lifecycle: Lifecycle,
    handshake_id: Mutex<Option<CorrelationId>>,
    ready_sent: AtomicBool,
    layout: Mutex<Option<Layout>>,
    token: Mutex<Option<String>>,
    parent_origin: Mutex<Option<String>>,
    pub(crate) topics: Topics,
    pub(crate) action_handler: Mutex<Option<ActionHandler>>,
}

/// A single embedded app instance.
///
/// Cheap to clone; clones share the same state.
#[derive(Clone)]
pub struct EmbeddedApp {
    pub(crate) inner: Arc<Inner>,
}

impl EmbeddedApp {
    /// Create a new builder.
    pub fn builder() -> EmbeddedAppBuilder {
        EmbeddedAppBuilder::new()
    }

    /// Install the inbound listener over a message stream.
    ///
    /// Returns `Ok(false)` if a listener is already running.
    pub fn listen(&self, inbound: mpsc::UnboundedReceiver<InboundMessage>) -> Result<bool> {
        let weak = Arc::downgrade(&self.inner);
        self.inner.transport.listen(inbound, move |message| {
            if let Some(inner) = weak.upgrade() {
                inner.handle_message(message);
            }
        })
    }

    /// Feed one inbound message directly, bypassing the listener.
    pub fn handle_message(&self, message: InboundMessage) {
        self.inner.handle_message(message);
    }

    /// Perform the init handshake.
    ///
    /// Concurrent and repeated calls share one handshake: only the first
    /// call sends `embedded::iframe.ready`, the rest get the same outcome.
    /// A failed handshake stays failed until `destroy()`/`reset()`.
    ///
    /// The handshake runs in its own task, so it settles even if every
    /// caller stops waiting.
    ///
    /// # Errors
    ///
    /// - `Timeout` if the host does not answer in time (first caller)
    /// - `HandshakeFailed` for callers arriving after a failure
    /// - `Destroyed` if the app is destroyed or reset before or during init
    pub async fn init(&self) -> Result<HostContext> {
        match self.inner.lifecycle.begin_init() {
            InitTicket::Done(outcome) => outcome,
            InitTicket::Wait(waiter) => waiter.wait().await,
            InitTicket::Start => {
                let inner = self.inner.clone();
                let (tx, rx) = oneshot::channel();
                tokio::spawn(async move {
                    let outcome = inner.run_handshake().await;
                    // The starting caller may be gone; the lifecycle already
                    // carries the outcome for everyone else.
                    let _ = tx.send(outcome);
                });
                rx.await.unwrap_or(Err(EmbeddedError::Destroyed))
            }
        }
    }

    /// Tell the host the app finished loading.
    ///
    /// Sent at most once per lifecycle. Returns `Ok(false)` on repeat calls
    /// or when there is no parent window.
    ///
    /// # Errors
    ///
    /// `Destroyed` after destroy, `InvalidState` before the handshake completed.
    pub fn ready(&self) -> Result<bool> {
        match self.state() {
            LifecycleState::Ready => {}
            LifecycleState::Destroyed => return Err(EmbeddedError::Destroyed),
            other => {
                return Err(EmbeddedError::InvalidState(format!(
                    "ready() requires the ready state, current state is {}",
                    other
                )))
            }
        }

        if self.inner.ready_sent.swap(true, Ordering::AcqRel) {
            tracing::debug!("ready() already sent");
            return Ok(false);
        }
        Ok(self.inner.send(ready_envelope()))
    }

    /// Tear down the instance.
    ///
    /// Sends `embedded::destroy`, rejects pending requests with `Destroyed`,
    /// drops all subscribers and stops the listener. Returns `false` if the
    /// instance was already destroyed.
    pub fn destroy(&self) -> bool {
        if !self.inner.lifecycle.destroy() {
            return false;
        }

        self.inner.send(destroy_envelope());
        self.inner.correlator.fail_all(|_| EmbeddedError::Destroyed);
        self.inner.topics.close();
        *lock(&self.inner.action_handler) = None;
        self.inner.transport.shutdown();

        tracing::debug!("Embedded app destroyed");
        true
    }

    /// Return to `Uninitialized` with fresh state, without messaging the host.
    ///
    /// Pending requests are rejected and subscribers dropped. The inbound
    /// listener keeps running.
    pub fn reset(&self) {
        let inner = &self.inner;

        // Cleared before fail_all: a woken handshake must find the slot empty.
        *lock(&inner.handshake_id) = None;
        inner.correlator.fail_all(|_| EmbeddedError::Destroyed);
        inner.topics.reset();
        *lock(&inner.action_handler) = None;
        *lock(&inner.layout) = None;
        *lock(&inner.parent_origin) = None;
        *lock(&inner.token) = inner.launch.token.clone();
        inner.ready_sent.store(false, Ordering::Release);
        inner.lifecycle.reset();
    }

    pub fn state(&self) -> LifecycleState {
        self.inner.lifecycle.state()
    }

    pub fn is_ready(&self) -> bool {
        self.state() == LifecycleState::Ready
    }

    /// Whether a parent window is attached.
    pub fn is_embedded(&self) -> bool {
        self.inner.transport.has_target()
    }

    /// Layout from the handshake, updated by theme changes.
    pub fn layout(&self) -> Option<Layout> {
        lock(&self.inner.layout).clone()
    }

    /// Current theme: layout theme, else the launch URL hint.
    pub fn theme(&self) -> Option<Theme> {
        self.layout()
            .and_then(|l| l.theme())
            .or_else(|| self.inner.launch.theme())
    }

    /// Full handshake context, once ready.
    pub fn context(&self) -> Option<HostContext> {
        self.inner.lifecycle.context()
    }

    /// Origin of the host that answered the handshake.
    pub fn parent_origin(&self) -> Option<String> {
        lock(&self.inner.parent_origin).clone()
    }

    pub fn config(&self) -> &SdkConfig {
        &self.inner.config
    }

    pub fn launch_params(&self) -> &LaunchParams {
        &self.inner.launch
    }

    /// Number of requests awaiting a host response.
    pub fn pending_requests(&self) -> usize {
        self.inner.correlator.pending_count()
    }

    /// Subscribe to init outcomes.
    ///
    /// If init already settled the callback runs immediately, once, with
    /// that outcome.
    pub fn on_init<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&InitEvent) + Send + Sync + 'static,
    {
        self.inner.topics.init.subscribe(callback)
    }

    /// Subscribe to host theme changes. The handshake theme is not replayed.
    pub fn on_theme_change<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&Theme) + Send + Sync + 'static,
    {
        self.inner.topics.theme.subscribe(callback)
    }

    pub fn auth(&self) -> Auth<'_> {
        Auth::new(self)
    }

    pub fn page(&self) -> Page<'_> {
        Page::new(self)
    }

    pub fn nav(&self) -> Nav<'_> {
        Nav::new(self)
    }

    pub fn ui(&self) -> Ui<'_> {
        Ui::new(self)
    }

    pub fn checkout(&self) -> Checkout<'_> {
        Checkout::new(self)
    }

    /// Forward a log line to the host console (`embedded::log`).
    pub fn log(&self, level: LogLevel, message: &str, context: Option<Value>) -> Result<bool> {
        let mut payload = serde_json::Map::new();
        payload.insert("level".into(), Value::from(level.as_str()));
        payload.insert("message".into(), Value::from(message));
        if let Some(context) = context {
            payload.insert("context".into(), context);
        }
        self.emit(outbound::LOG, Value::Object(payload))
    }

    /// Send a fire-and-forget command.
    ///
    /// Commands are allowed before `ready` (optimistic). Returns `Ok(false)`
    /// when there is no parent window.
    ///
    /// # Errors
    ///
    /// `Destroyed` after destroy.
    pub fn emit(&self, event: &str, payload: Value) -> Result<bool> {
        self.ensure_alive()?;
        Ok(self.inner.send(Envelope::new(event, payload)))
    }

    /// Typed variant of [`emit`](Self::emit).
    pub fn emit_with<T: Serialize>(&self, event: &str, payload: &T) -> Result<bool> {
        let payload = Value::Object(JsonCodec::encode_object(payload)?);
        self.emit(event, payload)
    }

    /// Send a correlated request and await the host's answer.
    ///
    /// `timeout` defaults to the configured request timeout.
    ///
    /// # Errors
    ///
    /// - `Config` if the effective timeout is zero
    /// - `NoTargetWindow` when running standalone
    /// - `Timeout` if no response arrives in time
    /// - `Host` if the response signals failure
    /// - `Destroyed` if the app is destroyed while waiting
    pub async fn call(&self, event: &str, payload: Value, timeout: Option<Duration>) -> Result<Value> {
        self.ensure_alive()?;

        let timeout = timeout.unwrap_or(self.inner.config.request_timeout);
        if timeout.is_zero() {
            return Err(EmbeddedError::Config(format!(
                "timeout for '{}' must be > 0",
                event
            )));
        }
        let (id, reply) = self.inner.correlator.register(event, timeout);

        let envelope = Envelope::new(event, payload).with_correlation_id(id.clone());
        if !self.inner.send(envelope) {
            self.inner
                .correlator
                .resolve(&id, Err(EmbeddedError::NoTargetWindow));
        }

        reply.await.map_err(|_| EmbeddedError::Destroyed)?
    }

    pub(crate) fn ensure_alive(&self) -> Result<()> {
        if self.state() == LifecycleState::Destroyed {
            return Err(EmbeddedError::Destroyed);
        }
        Ok(())
    }

    pub(crate) fn token(&self) -> Option<String> {
        lock(&self.inner.token).clone()
    }
}

impl std::fmt::Debug for EmbeddedApp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmbeddedApp")
            .field("state", &self.state())
            .field("embedded", &self.is_embedded())
            .field("pending", &self.pending_requests())
            .finish()
    }
}

impl Inner {
    /// Stamp and post an envelope.
    pub(crate) fn send(&self, envelope: Envelope) -> bool {
        self.transport.send(&envelope.with_timestamp(now_millis()))
    }

    async fn run_handshake(&self) -> Result<HostContext> {
        let timeout = self.config.handshake_timeout;
        let (id, reply) = self.correlator.register(outbound::IFRAME_READY, timeout);
        *lock(&self.handshake_id) = Some(id.clone());

        match handshake_envelope(self.config.frame_height, &id) {
            Ok(envelope) => {
                if !self.send(envelope) {
                    tracing::warn!("Handshake not delivered, waiting for timeout");
                }
            }
            Err(e) => {
                self.correlator.resolve(&id, Err(e));
            }
        }

        let outcome = reply.await.unwrap_or(Err(EmbeddedError::Destroyed));

        // After reset() the slot is empty or owned by a newer handshake;
        // this one must leave both it and the lifecycle alone.
        let current = {
            let mut slot = lock(&self.handshake_id);
            if slot.as_deref() == Some(id.as_str()) {
                *slot = None;
                true
            } else {
                false
            }
        };
        if !current {
            tracing::debug!(id = %id, "Handshake superseded by reset");
            return Err(match outcome {
                Err(e) => e,
                Ok(_) => EmbeddedError::Destroyed,
            });
        }

        let data = match outcome {
            Ok(data) => data,
            Err(e) => {
                if self.lifecycle.fail(e.to_string()) {
                    tracing::warn!("Init failed: {}", e);
                    self.topics.init.emit(InitEvent::failed(e.to_string()));
                }
                return Err(e);
            }
        };

        let context = Envelope::parse(&data)
            .map(|envelope| HostContext::from_envelope(&envelope))
            .unwrap_or_default();
        let layout = context.effective_layout();

        *lock(&self.layout) = layout.clone();
        if let Some(token) = context.token() {
            *lock(&self.token) = Some(token.to_string());
        }

        if !self.lifecycle.complete(context.clone()) {
            return Err(EmbeddedError::Destroyed);
        }

        tracing::debug!(theme = ?context.theme(), "Init complete");
        self.topics.init.emit(InitEvent::ready(layout));
        Ok(context)
    }

    pub(crate) fn set_layout_theme(&self, theme: Theme) {
        let mut layout = lock(&self.layout);
        layout.get_or_insert_with(Layout::default).set_theme(theme);
    }

    pub(crate) fn set_layout(&self, layout: Option<Layout>) {
        if layout.is_some() {
            *lock(&self.layout) = layout;
        }
    }

    pub(crate) fn set_token(&self, token: String) {
        *lock(&self.token) = Some(token);
    }

    pub(crate) fn record_parent_origin(&self, origin: &str) {
        let mut parent = lock(&self.parent_origin);
        if parent.is_none() {
            *parent = Some(origin.to_string());
        }
    }
}

pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
