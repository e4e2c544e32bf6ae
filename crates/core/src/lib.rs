//! Suraj Electronics Core - Shared types library.
//!
//! This crate provides common types used across the storefront components:
//! - `storefront` - Customer-facing shop and admin back-office
//! - `integration-tests` - In-process fake backend and end-to-end tests
//!
//! # Architecture
//!
//! The core crate contains only types and traits - no I/O, no HTTP clients.
//! The backend service owns persistence and business rules; these types
//! mirror its resources so the storefront can work with them type-safely.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for IDs, prices, emails, addresses and statuses

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
