//! Subscription registry.
//!
//! A [`Topic`] is an ordered list of callbacks for one kind of host event.
//! Emitting fans out to every callback in subscription order. Callbacks run
//! after the topic lock is released, so a callback may subscribe, unsubscribe
//! or emit without deadlocking. A panicking callback is logged and skipped.
//!
//! Replaying topics ([`Topic::replaying`]) remember the last emitted value and
//! deliver it to late subscribers immediately, exactly once, before any
//! future emission.
//!
//! # Example
//!
//! ```
//! use embedded_bridge::subscription::Topic;
//!
//! let topic: Topic<u32> = Topic::new("counter");
//! let sub = topic.subscribe(|n| println!("got {}", n));
//! assert_eq!(topic.emit(1), 1);
//! sub.unsubscribe();
//! sub.unsubscribe();
//! assert_eq!(topic.emit(2), 0);
//! ```

use std::collections::BTreeMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Weak};

type Callback<T> = Arc<dyn Fn(&T) + Send + Sync>;

struct TopicState<T> {
    next_id: u64,
    callbacks: BTreeMap<u64, Callback<T>>,
    replay: bool,
    last: Option<T>,
    closed: bool,
}

trait Detach: Send + Sync {
    fn detach(&self, id: u64) -> bool;
}

impl<T: Send> Detach for Mutex<TopicState<T>> {
    fn detach(&self, id: u64) -> bool {
        lock(self).callbacks.remove(&id).is_some()
    }
}

/// Fan-out topic for one event kind.
pub struct Topic<T> {
    name: &'static str,
    state: Arc<Mutex<TopicState<T>>>,
}

impl<T> Topic<T>
where
    T: Clone + Send + 'static,
{
    /// Plain fan-out topic, no replay.
    pub fn new(name: &'static str) -> Self {
        Self::build(name, false)
    }

    /// Topic that replays its latest value to new subscribers.
    pub fn replaying(name: &'static str) -> Self {
        Self::build(name, true)
    }

    fn build(name: &'static str, replay: bool) -> Self {
        Self {
            name,
            state: Arc::new(Mutex::new(TopicState {
                next_id: 0,
                callbacks: BTreeMap::new(),
                replay,
                last: None,
                closed: false,
            })),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Add a callback.
    ///
    /// On a replaying topic with a stored value the callback runs once
    /// before this returns. On a closed topic the returned handle is inert
    /// and the callback is never called.
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        let callback: Callback<T> = Arc::new(callback);

        let (id, replay) = {
            let mut state = lock(&self.state);
            if state.closed {
                tracing::debug!(topic = self.name, "Subscribe on closed topic ignored");
                return Subscription::inert();
            }
            state.next_id += 1;
            let id = state.next_id;
            state.callbacks.insert(id, callback.clone());
            let replay = if state.replay { state.last.clone() } else { None };
            (id, replay)
        };

        if let Some(value) = replay {
            invoke(self.name, &callback, &value);
        }

        let state: Arc<Mutex<TopicState<T>>> = self.state.clone();
        let detach: Arc<dyn Detach> = state;
        Subscription {
            id,
            topic: Some(Arc::downgrade(&detach)),
            active: AtomicBool::new(true),
        }
    }

    /// Deliver `value` to every subscriber in subscription order.
    ///
    /// Returns the number of callbacks invoked.
    pub fn emit(&self, value: T) -> usize {
        let snapshot: Vec<Callback<T>> = {
            let mut state = lock(&self.state);
            if state.closed {
                return 0;
            }
            if state.replay {
                state.last = Some(value.clone());
            }
            state.callbacks.values().cloned().collect()
        };

        for callback in &snapshot {
            invoke(self.name, callback, &value);
        }
        snapshot.len()
    }

    /// Latest value on a replaying topic.
    pub fn last(&self) -> Option<T> {
        lock(&self.state).last.clone()
    }

    /// Number of live subscribers.
    pub fn len(&self) -> usize {
        lock(&self.state).callbacks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop all subscribers and refuse new ones.
    pub fn close(&self) {
        let mut state = lock(&self.state);
        state.closed = true;
        state.callbacks.clear();
        state.last = None;
    }

    pub fn is_closed(&self) -> bool {
        lock(&self.state).closed
    }

    /// Return to a fresh, open, empty topic.
    pub fn reset(&self) {
        let mut state = lock(&self.state);
        state.closed = false;
        state.callbacks.clear();
        state.last = None;
    }
}

impl<T> std::fmt::Debug for Topic<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Topic").field("name", &self.name).finish()
    }
}

/// Handle returned by [`Topic::subscribe`].
///
/// Dropping the handle does NOT unsubscribe; call [`unsubscribe`](Self::unsubscribe).
/// Unsubscribing twice, or after the owning SDK was destroyed, is harmless.
pub struct Subscription {
    id: u64,
    topic: Option<Weak<dyn Detach>>,
    active: AtomicBool,
}

impl Subscription {
    /// A handle that is not attached to anything.
    pub fn inert() -> Self {
        Self {
            id: 0,
            topic: None,
            active: AtomicBool::new(false),
        }
    }

    /// Remove the callback. Returns `true` only on the call that removed it.
    pub fn unsubscribe(&self) -> bool {
        if !self.active.swap(false, Ordering::AcqRel) {
            return false;
        }
        self.topic
            .as_ref()
            .and_then(Weak::upgrade)
            .map(|topic| topic.detach(self.id))
            .unwrap_or(false)
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("active", &self.is_active())
            .finish()
    }
}

fn invoke<T>(topic: &str, callback: &Callback<T>, value: &T) {
    if catch_unwind(AssertUnwindSafe(|| callback(value))).is_err() {
        tracing::error!(topic, "Subscriber panicked");
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
