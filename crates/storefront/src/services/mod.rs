//! Business logic services for storefront.
//!
//! # Services
//!
//! - `catalog` - Category filters, price sorting, search and related products
//! - `checkout` - Order placement and gateway payment verification
//! - `order_filter` - Admin order list filtering and sorting

pub mod catalog;
pub mod checkout;
pub mod order_filter;
