//! # embedded-bridge
//!
//! Rust SDK for the embedded app side of the host dashboard message
//! protocol.
//!
//! An embedded app runs inside a frame of the merchant dashboard and talks
//! to it exclusively through `postMessage`. This crate implements the app
//! side of that conversation.
//!
//! ## Architecture
//!
//! - **Transport**: posts envelopes to the parent window and feeds inbound
//!   messages to the dispatcher
//! - **Router**: classifies inbound messages (namespaced events, legacy
//!   aliases, `.response` replies)
//! - **Correlator**: pairs requests with replies by correlation id, with
//!   per-request timeouts
//! - **Subscriptions**: fan-out of host events to any number of callbacks
//! - **Lifecycle**: the `iframe.ready` / `context.provide` handshake and the
//!   uninitialized → ready → destroyed state machine
//!
//! ## Example
//!
//! ```ignore
//! use embedded_bridge::{EmbeddedApp, transport::pair};
//! use embedded_bridge::api::ToastKind;
//!
//! #[tokio::main]
//! async fn main() -> embedded_bridge::Result<()> {
//!     let (end, host) = pair("https://s.salla.sa");
//!     let app = EmbeddedApp::builder()
//!         .launch_url("https://app.example/?token=abc&appId=1888000112")
//!         .connect(end)?;
//!
//!     let context = app.init().await?;
//!     app.ui().toast(ToastKind::Success, "Loaded", None)?;
//!     app.ready()?;
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod bootstrap;
pub mod codec;
pub mod config;
pub mod control;
pub mod correlator;
pub mod error;
pub mod logging;
pub mod observer;
pub mod protocol;
pub mod router;
pub mod subscription;
pub mod timer;
pub mod transport;
pub mod verify;

mod app;

pub use app::{EmbeddedApp, EmbeddedAppBuilder};
pub use config::{Environment, LaunchParams, SdkConfig};
pub use control::{InitEvent, LifecycleState};
pub use error::{EmbeddedError, Result};
pub use protocol::{HostContext, Layout, Theme};
pub use subscription::Subscription;
