//! One-shot timers over spawned sleep tasks.
//!
//! A [`Timer`] runs its callback once after the delay unless it is cleared
//! first. Dropping a timer clears it, so a timer owned by a pending entry
//! dies with the entry.

use std::time::Duration;

use tokio::task::JoinHandle;

/// Handle to a scheduled callback.
#[derive(Debug)]
pub struct Timer {
    task: Option<JoinHandle<()>>,
}

impl Timer {
    /// Schedule `callback` to run after `after`.
    ///
    /// Outside a tokio runtime the timer is inert and never fires.
    pub fn start<F>(after: Duration, callback: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        let task = match tokio::runtime::Handle::try_current() {
            Ok(runtime) => Some(runtime.spawn(async move {
                tokio::time::sleep(after).await;
                callback();
            })),
            Err(_) => {
                tracing::warn!("Timer started outside a tokio runtime; it will never fire");
                None
            }
        };

        Self { task }
    }

    /// A timer that never fires.
    pub fn inert() -> Self {
        Self { task: None }
    }

    /// Cancel the timer. No-op if it already fired or was cleared.
    pub fn clear(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }

    /// Whether the timer can still fire.
    pub fn is_armed(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }
}

impl Drop for Timer {
    fn drop(&mut self) {
        self.clear();
    }
}
