//! Request/response correlation.
//!
//! Every outbound request gets a fresh correlation id from a monotonic
//! counter. The pending entry holds the reply sender and its own timeout
//! timer; whichever comes first (response, timeout, `fail_all`) removes the
//! entry and settles it. Later messages for the same id find nothing and are
//! ignored.
//!
//! ```text
//! register("embedded::ui.confirm", 10s) ─► ("req-4", rx)
//!        │                                      │
//!   response(req-4) ─► resolve ─► entry removed ─► rx yields Ok(payload)
//!   timer fires     ─► entry removed ─► rx yields Err(Timeout)
//! ```

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::{Duration, Instant};

use serde_json::Value;
use tokio::sync::oneshot;

use crate::error::{EmbeddedError, Result};
use crate::protocol::CorrelationId;
use crate::timer::Timer;

/// Prefix of generated correlation ids.
const ID_PREFIX: &str = "req-";

/// Receiving half of a pending request.
pub type Reply = oneshot::Receiver<Result<Value>>;

struct PendingRequest {
    event: String,
    created_at: Instant,
    reply: oneshot::Sender<Result<Value>>,
    // Cleared on drop.
    _timer: Timer,
}

#[derive(Default)]
struct State {
    next_id: u64,
    pending: HashMap<CorrelationId, PendingRequest>,
}

/// Table of outstanding requests.
#[derive(Clone, Default)]
pub struct Correlator {
    state: Arc<Mutex<State>>,
}

impl Correlator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new pending request.
    ///
    /// Returns the id to tag the outbound envelope with and the receiver
    /// that settles exactly once. A zero `timeout` disables the timer.
    pub fn register(&self, event: &str, timeout: Duration) -> (CorrelationId, Reply) {
        let (tx, rx) = oneshot::channel();
        let mut state = self.lock();

        state.next_id += 1;
        let id = format!("{}{}", ID_PREFIX, state.next_id);

        let timer = if timeout.is_zero() {
            Timer::inert()
        } else {
            let weak: Weak<Mutex<State>> = Arc::downgrade(&self.state);
            let timer_id = id.clone();
            Timer::start(timeout, move || {
                if let Some(state) = weak.upgrade() {
                    expire(&state, &timer_id, timeout);
                }
            })
        };

        state.pending.insert(
            id.clone(),
            PendingRequest {
                event: event.to_string(),
                created_at: Instant::now(),
                reply: tx,
                _timer: timer,
            },
        );

        tracing::debug!(event, id = %id, "Registered pending request");
        (id, rx)
    }

    /// Settle a pending request.
    ///
    /// Returns `false` if the id is unknown (already settled, timed out, or
    /// never issued).
    pub fn resolve(&self, id: &str, outcome: Result<Value>) -> bool {
        let entry = self.lock().pending.remove(id);

        match entry {
            Some(entry) => {
                tracing::debug!(
                    event = %entry.event,
                    id,
                    elapsed_ms = entry.created_at.elapsed().as_millis() as u64,
                    "Settled pending request"
                );
                // Receiver may have been dropped by a cancelled caller.
                let _ = entry.reply.send(outcome);
                true
            }
            None => {
                tracing::debug!(id, "No pending request for response, ignoring");
                false
            }
        }
    }

    /// Reject every pending request.
    ///
    /// `make_err` builds the error for each entry from its event name.
    pub fn fail_all<F>(&self, make_err: F) -> usize
    where
        F: Fn(&str) -> EmbeddedError,
    {
        let drained: Vec<PendingRequest> = self.lock().pending.drain().map(|(_, p)| p).collect();
        let count = drained.len();

        for entry in drained {
            let _ = entry.reply.send(Err(make_err(&entry.event)));
        }

        if count > 0 {
            tracing::debug!(count, "Rejected all pending requests");
        }
        count
    }

    pub fn pending_count(&self) -> usize {
        self.lock().pending.len()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.lock().pending.contains_key(id)
    }

    /// Event name of a pending request.
    pub fn event_of(&self, id: &str) -> Option<String> {
        self.lock().pending.get(id).map(|p| p.event.clone())
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        lock(&self.state)
    }
}

impl std::fmt::Debug for Correlator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Correlator")
            .field("pending", &self.pending_count())
            .finish()
    }
}

fn expire(state: &Mutex<State>, id: &str, after: Duration) {
    let entry = lock(state).pending.remove(id);

    if let Some(entry) = entry {
        tracing::warn!(event = %entry.event, id, "Request timed out after {:?}", after);
        let _ = entry.reply.send(Err(EmbeddedError::Timeout {
            event: entry.event.clone(),
            after,
        }));
    }
}

fn lock(state: &Mutex<State>) -> MutexGuard<'_, State> {
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
