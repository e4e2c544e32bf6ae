//! Domain models for the storefront.

pub mod session;

pub use session::{AuthSession, CurrentUser, PendingPayment, keys as session_keys};
