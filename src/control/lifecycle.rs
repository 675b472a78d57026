//! Lifecycle state machine.
//!
//! ```text
//! Uninitialized ──init──► Initializing ──context──► Ready
//!                              │                      │
//!                              └──timeout/error──► Failed
//!   (any non-destroyed state) ──destroy──► Destroyed
//! ```
//!
//! The state lives in a tokio `watch` channel so concurrent `init()` callers
//! can wait for the single in-flight handshake instead of starting another.

use serde::Serialize;
use tokio::sync::watch;

use crate::error::{EmbeddedError, Result};
use crate::protocol::{HostContext, Layout};

/// Public lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LifecycleState {
    Uninitialized,
    Initializing,
    Ready,
    Failed,
    Destroyed,
}

impl LifecycleState {
    pub fn as_str(&self) -> &'static str {
        match self {
            LifecycleState::Uninitialized => "uninitialized",
            LifecycleState::Initializing => "initializing",
            LifecycleState::Ready => "ready",
            LifecycleState::Failed => "failed",
            LifecycleState::Destroyed => "destroyed",
        }
    }

    /// Whether `self -> next` is a legal transition.
    pub fn can_transition_to(&self, next: LifecycleState) -> bool {
        use LifecycleState::*;
        matches!(
            (self, next),
            (Uninitialized, Initializing)
                | (Initializing, Ready)
                | (Initializing, Failed)
                | (Uninitialized, Destroyed)
                | (Initializing, Destroyed)
                | (Ready, Destroyed)
                | (Failed, Destroyed)
        )
    }
}

impl std::fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Init outcome delivered to `on_init` subscribers.
#[derive(Debug, Clone, PartialEq)]
pub struct InitEvent {
    /// `Ready` or `Failed`.
    pub state: LifecycleState,
    /// Layout received in the handshake (ready only).
    pub layout: Option<Layout>,
    /// Failure reason (failed only).
    pub error: Option<String>,
}

impl InitEvent {
    pub fn ready(layout: Option<Layout>) -> Self {
        Self {
            state: LifecycleState::Ready,
            layout,
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            state: LifecycleState::Failed,
            layout: None,
            error: Some(error.into()),
        }
    }

    pub fn is_ready(&self) -> bool {
        self.state == LifecycleState::Ready
    }
}

#[derive(Debug, Clone)]
enum Phase {
    Uninitialized,
    Initializing,
    Ready(HostContext),
    Failed(String),
    Destroyed,
}

impl Phase {
    fn state(&self) -> LifecycleState {
        match self {
            Phase::Uninitialized => LifecycleState::Uninitialized,
            Phase::Initializing => LifecycleState::Initializing,
            Phase::Ready(_) => LifecycleState::Ready,
            Phase::Failed(_) => LifecycleState::Failed,
            Phase::Destroyed => LifecycleState::Destroyed,
        }
    }

    fn outcome(&self) -> Result<HostContext> {
        match self {
            Phase::Ready(context) => Ok(context.clone()),
            Phase::Failed(reason) => Err(EmbeddedError::HandshakeFailed(reason.clone())),
            Phase::Destroyed | Phase::Uninitialized => Err(EmbeddedError::Destroyed),
            Phase::Initializing => Err(EmbeddedError::InvalidState(
                "handshake still in progress".into(),
            )),
        }
    }
}

/// What an `init()` caller should do.
#[derive(Debug)]
pub enum InitTicket {
    /// This caller owns the handshake and must send it.
    Start,
    /// Another caller owns the handshake; wait for its outcome.
    Wait(InitWaiter),
    /// Already settled.
    Done(Result<HostContext>),
}

/// Waits for an in-flight handshake to settle.
#[derive(Debug)]
pub struct InitWaiter {
    rx: watch::Receiver<Phase>,
}

impl InitWaiter {
    pub async fn wait(mut self) -> Result<HostContext> {
        let phase = self
            .rx
            .wait_for(|phase| !matches!(phase, Phase::Initializing))
            .await
            .map_err(|_| EmbeddedError::Destroyed)?
            .clone();
        phase.outcome()
    }
}

/// Owner of the lifecycle state.
#[derive(Debug)]
pub struct Lifecycle {
    tx: watch::Sender<Phase>,
}

impl Lifecycle {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(Phase::Uninitialized);
        Self { tx }
    }

    pub fn state(&self) -> LifecycleState {
        self.tx.borrow().state()
    }

    /// Context received in the handshake, once ready.
    pub fn context(&self) -> Option<HostContext> {
        match &*self.tx.borrow() {
            Phase::Ready(context) => Some(context.clone()),
            _ => None,
        }
    }

    /// Claim the handshake or learn how to get its outcome.
    pub fn begin_init(&self) -> InitTicket {
        let rx = self.tx.subscribe();

        let mut started = false;
        self.tx.send_if_modified(|phase| {
            if matches!(phase, Phase::Uninitialized) {
                *phase = Phase::Initializing;
                started = true;
                true
            } else {
                false
            }
        });

        if started {
            return InitTicket::Start;
        }

        let current = rx.borrow().clone();
        match current {
            Phase::Initializing => InitTicket::Wait(InitWaiter { rx }),
            other => InitTicket::Done(other.outcome()),
        }
    }

    /// Initializing -> Ready. Returns `false` if the handshake was abandoned.
    pub fn complete(&self, context: HostContext) -> bool {
        self.transition(LifecycleState::Ready, Phase::Ready(context))
    }

    /// Initializing -> Failed.
    pub fn fail(&self, reason: impl Into<String>) -> bool {
        self.transition(LifecycleState::Failed, Phase::Failed(reason.into()))
    }

    /// Any non-destroyed state -> Destroyed. Returns `false` if already destroyed.
    pub fn destroy(&self) -> bool {
        self.transition(LifecycleState::Destroyed, Phase::Destroyed)
    }

    /// Back to Uninitialized, whatever the current state.
    pub fn reset(&self) {
        self.tx.send_replace(Phase::Uninitialized);
    }

    fn transition(&self, next: LifecycleState, phase: Phase) -> bool {
        self.tx.send_if_modified(move |current| {
            if !current.state().can_transition_to(next) {
                tracing::debug!("Ignoring lifecycle transition {} -> {}", current.state(), next);
                return false;
            }
            tracing::debug!("Lifecycle {} -> {}", current.state(), next);
            *current = phase;
            true
        })
    }
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_transitions() {
        use LifecycleState::*;

        assert!(Uninitialized.can_transition_to(Initializing));
        assert!(Initializing.can_transition_to(Ready));
        assert!(Initializing.can_transition_to(Failed));
        assert!(Ready.can_transition_to(Destroyed));
        assert!(Failed.can_transition_to(Destroyed));

        assert!(!Ready.can_transition_to(Initializing));
        assert!(!Failed.can_transition_to(Ready));
        assert!(!Destroyed.can_transition_to(Initializing));
        assert!(!Destroyed.can_transition_to(Destroyed));
    }

    #[test]
    fn test_single_owner() {
        let lifecycle = Lifecycle::new();

        assert!(matches!(lifecycle.begin_init(), InitTicket::Start));
        assert_eq!(lifecycle.state(), LifecycleState::Initializing);
        assert!(matches!(lifecycle.begin_init(), InitTicket::Wait(_)));
    }

    #[tokio::test]
    async fn test_waiter_sees_ready() {
        let lifecycle = Lifecycle::new();
        lifecycle.begin_init();

        let waiter = match lifecycle.begin_init() {
            InitTicket::Wait(w) => w,
            other => panic!("unexpected: {:?}", other),
        };

        let context = HostContext {
            raw: json!({ "layout": { "theme": "dark" } }),
            ..Default::default()
        };
        assert!(lifecycle.complete(context.clone()));

        assert_eq!(waiter.wait().await.unwrap(), context);
        assert_eq!(lifecycle.context(), Some(context));
    }

    #[test]
    fn test_failed_is_cached() {
        let lifecycle = Lifecycle::new();
        lifecycle.begin_init();
        assert!(lifecycle.fail("timed out"));

        match lifecycle.begin_init() {
            InitTicket::Done(Err(EmbeddedError::HandshakeFailed(reason))) => {
                assert_eq!(reason, "timed out")
            }
            other => panic!("unexpected: {:?}", other),
        }
        assert_eq!(lifecycle.state(), LifecycleState::Failed);
    }

    #[tokio::test]
    async fn test_destroy_during_init_releases_waiters() {
        let lifecycle = Lifecycle::new();
        lifecycle.begin_init();
        let waiter = match lifecycle.begin_init() {
            InitTicket::Wait(w) => w,
            other => panic!("unexpected: {:?}", other),
        };

        assert!(lifecycle.destroy());
        assert!(!lifecycle.destroy());
        assert!(!lifecycle.complete(HostContext::default()));

        assert!(matches!(waiter.wait().await, Err(EmbeddedError::Destroyed)));
        assert!(matches!(
            lifecycle.begin_init(),
            InitTicket::Done(Err(EmbeddedError::Destroyed))
        ));
    }

    #[test]
    fn test_reset() {
        let lifecycle = Lifecycle::new();
        lifecycle.destroy();
        lifecycle.reset();

        assert_eq!(lifecycle.state(), LifecycleState::Uninitialized);
        assert!(matches!(lifecycle.begin_init(), InitTicket::Start));
    }

    #[test]
    fn test_init_event() {
        let event = InitEvent::failed("no parent window");
        assert!(!event.is_ready());
        assert_eq!(event.error.as_deref(), Some("no parent window"));
        assert_eq!(serde_json::to_value(LifecycleState::Ready).unwrap(), json!("ready"));
    }
}
