//! Core types for the storefront.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod address;
pub mod email;
pub mod id;
pub mod payment;
pub mod price;
pub mod status;

pub use address::{AddressError, INDIAN_STATES, ShippingAddress};
pub use email::{Email, EmailError};
pub use id::*;
pub use payment::PaymentMethod;
pub use price::{CurrencyCode, Price};
pub use status::*;
