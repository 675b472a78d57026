//! Control plane module - handshake and lifecycle.
//!
//! The embedded context announces itself with `embedded::iframe.ready`, the
//! host answers with its layout context, and only then is the app `Ready`.
//!
//! # Workflow
//!
//! 1. App calls `init()`; lifecycle moves to `Initializing`
//! 2. Handshake envelope is sent with a fresh correlation id
//! 3. Host answers with `embedded::context.provide`
//! 4. Lifecycle moves to `Ready` (or `Failed` on timeout)
//! 5. App calls `ready()` once it finished loading
//!
//! # Example
//!
//! ```ignore
//! use embedded_bridge::control::{handshake_envelope, Lifecycle, InitTicket};
//!
//! let lifecycle = Lifecycle::new();
//! if let InitTicket::Start = lifecycle.begin_init() {
//!     transport.send(&handshake_envelope(None, "req-1")?);
//! }
//! ```

mod handshake;
mod lifecycle;

pub use handshake::{
    destroy_envelope, handshake_envelope, ready_envelope, HandshakeRequest, DEFAULT_FRAME_HEIGHT,
};
pub use lifecycle::{InitEvent, InitTicket, InitWaiter, Lifecycle, LifecycleState};
