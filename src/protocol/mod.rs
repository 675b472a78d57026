//! Protocol module - envelope format, event names, and typed payloads.
//!
//! This module implements the message layer shared with the host:
//! - Envelope parsing/serialization for both wire generations
//! - Namespaced and legacy event name tables
//! - Field-tolerant views over host data (layout, theme, clicks, checkout)

pub mod events;

mod envelope;
mod payload;

pub use envelope::{event_name, now_millis, CorrelationId, Envelope, MessageClass, WireFormat};
pub use payload::{ActionClick, CheckoutResult, HostContext, LegacyContext, Layout, Theme};
