//! Message observation hook.
//!
//! Every inbound and outbound message is reported to an optional
//! [`MessageObserver`]. This is a debugging aid, not part of the protocol:
//! observers cannot change routing and their output is never read back.
//!
//! [`MessageLog`] keeps a bounded in-memory history with an "unknown" filter
//! and a plain-text export; [`TracingObserver`] forwards to `tracing`.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

use serde_json::Value;

use crate::protocol::{event_name, MessageClass};

/// Default number of records kept by [`MessageLog`].
pub const DEFAULT_LOG_CAPACITY: usize = 500;

/// Event label used for values without an `event` field.
pub const UNKNOWN_EVENT: &str = "unknown";

/// Message direction relative to the embedded context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Incoming,
    Outgoing,
}

impl Direction {
    /// Arrow used in rendered logs.
    pub fn arrow(&self) -> &'static str {
        match self {
            Direction::Incoming => "←",
            Direction::Outgoing => "→",
        }
    }
}

/// One observed message.
#[derive(Debug, Clone)]
pub struct MessageRecord {
    pub direction: Direction,
    /// Event name, or [`UNKNOWN_EVENT`].
    pub event: String,
    pub class: MessageClass,
    pub data: Value,
    /// Sender origin (incoming only).
    pub origin: Option<String>,
    /// Why the message was dropped or not delivered.
    pub error: Option<String>,
    pub at: SystemTime,
}

impl MessageRecord {
    fn new(direction: Direction, data: Value, origin: Option<String>) -> Self {
        Self {
            direction,
            event: event_name(&data).unwrap_or(UNKNOWN_EVENT).to_string(),
            class: MessageClass::of(&data),
            data,
            origin,
            error: None,
            at: SystemTime::now(),
        }
    }

    pub fn incoming(data: Value, origin: impl Into<String>) -> Self {
        Self::new(Direction::Incoming, data, Some(origin.into()))
    }

    pub fn outgoing(data: Value) -> Self {
        Self::new(Direction::Outgoing, data, None)
    }

    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }

    pub fn is_unknown(&self) -> bool {
        self.class == MessageClass::Unknown
    }

    /// Milliseconds since the Unix epoch.
    pub fn at_millis(&self) -> u128 {
        self.at
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or(0)
    }

    /// Single-line rendering: `[millis] → event: {json}`.
    pub fn to_line(&self) -> String {
        let mut line = format!(
            "[{}] {} {}: {}",
            self.at_millis(),
            self.direction.arrow(),
            self.event,
            self.data
        );
        if let Some(error) = &self.error {
            line.push_str(" (");
            line.push_str(error);
            line.push(')');
        }
        line
    }
}

/// Receives every message passing through the transport.
pub trait MessageObserver: Send + Sync {
    fn observe(&self, record: &MessageRecord);
}

impl<F> MessageObserver for F
where
    F: Fn(&MessageRecord) + Send + Sync,
{
    fn observe(&self, record: &MessageRecord) {
        self(record)
    }
}

/// Observer that emits a `tracing` debug event per message.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl MessageObserver for TracingObserver {
    fn observe(&self, record: &MessageRecord) {
        match &record.error {
            Some(error) => tracing::debug!(
                direction = ?record.direction,
                event = %record.event,
                %error,
                "message not delivered"
            ),
            None => tracing::debug!(
                direction = ?record.direction,
                event = %record.event,
                origin = record.origin.as_deref().unwrap_or("-"),
                "message"
            ),
        }
    }
}

/// Bounded in-memory message history.
#[derive(Debug)]
pub struct MessageLog {
    records: Mutex<VecDeque<MessageRecord>>,
    capacity: usize,
}

impl MessageLog {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_LOG_CAPACITY)
    }

    /// Log keeping at most `capacity` records (oldest dropped first).
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            records: Mutex::new(VecDeque::new()),
            capacity: capacity.max(1),
        }
    }

    pub fn push(&self, record: MessageRecord) {
        let mut records = lock(&self.records);
        if records.len() == self.capacity {
            records.pop_front();
        }
        records.push_back(record);
    }

    /// Snapshot of the history, optionally without `unknown` records.
    pub fn entries(&self, filter_unknown: bool) -> Vec<MessageRecord> {
        lock(&self.records)
            .iter()
            .filter(|r| !(filter_unknown && r.is_unknown()))
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        lock(&self.records).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        lock(&self.records).clear();
    }

    /// Plain-text export, one record per line.
    pub fn render(&self, filter_unknown: bool) -> String {
        self.entries(filter_unknown)
            .iter()
            .map(MessageRecord::to_line)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl Default for MessageLog {
    fn default() -> Self {
        Self::new()
    }
}

impl MessageObserver for MessageLog {
    fn observe(&self, record: &MessageRecord) {
        self.push(record.clone());
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
