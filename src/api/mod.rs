//! Command API facades.
//!
//! Each facade borrows the [`EmbeddedApp`](crate::EmbeddedApp) and builds
//! the outbound envelopes for one namespace:
//! - [`Auth`] - token access, refresh, introspection, auth errors, logout
//! - [`Page`] - navigation, redirects, title, breadcrumbs, frame height
//! - [`Nav`] - the primary action button of the dashboard nav bar
//! - [`Ui`] - loading, overlay, toasts, modals, confirm dialogs
//! - [`Checkout`] - checkout creation, addon listing, checkout results
//!
//! Fire-and-forget commands return `Result<bool>`: `Err(Destroyed)` after
//! destroy, `Ok(false)` when no parent window is attached. Requests return
//! the host's answer and settle exactly once.

mod auth;
mod checkout;
mod log;
mod nav;
mod page;
mod ui;

pub use auth::Auth;
pub use checkout::{Checkout, CheckoutItem, CheckoutOptions};
pub use log::LogLevel;
pub use nav::{ActionConfig, ExtendedAction, Nav};
pub use page::{Breadcrumb, NavigateOptions, Page};
pub use ui::{ConfirmOptions, ConfirmResult, LoadingMode, ToastKind, Ui};
