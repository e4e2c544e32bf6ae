//! Typed client for the store's backend REST API.
//!
//! # Architecture
//!
//! - The backend is the source of truth for users, products, carts, orders
//!   and complaints. Nothing is persisted locally.
//! - One async method per endpoint, JSON in and out via `reqwest`
//! - Product reads are cached in memory via `moka`; admin product mutations
//!   invalidate the cache
//! - Authenticated calls carry the user's bearer token from the session
//!
//! # Example
//!
//! ```rust,ignore
//! use suraj_storefront::backend::BackendClient;
//!
//! let client = BackendClient::new(&config.backend)?;
//! let login = client.login(&email, &password).await?;
//! let cart = client.get_cart(&login.token).await?;
//! ```

mod cache;
mod client;
pub mod token;
pub mod types;

pub use client::BackendClient;
pub use token::BearerToken;
pub use types::*;

use thiserror::Error;

/// Errors that can occur when calling the backend.
#[derive(Debug, Error)]
pub enum BackendError {
    /// HTTP request failed before a response arrived.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The backend rejected the bearer token (401).
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// The token is valid but lacks the role the endpoint needs (403).
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Resource not found (404).
    #[error("Not found: {0}")]
    NotFound(String),

    /// Any other non-success response.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Response body did not match the expected shape.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// An endpoint path could not be joined onto the base URL.
    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),
}

impl BackendError {
    /// Message safe to show to the customer.
    ///
    /// Backend-supplied messages are passed through; transport and parse
    /// failures get a generic line.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Unauthorized(message)
            | Self::Forbidden(message)
            | Self::NotFound(message)
            | Self::Api { message, .. } => message.clone(),
            Self::Http(_) | Self::Parse(_) | Self::Url(_) => {
                "Unable to reach the store right now. Please try again.".to_string()
            }
        }
    }

    /// Whether the failure means the session token is no longer valid.
    #[must_use]
    pub const fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_message_passes_backend_text() {
        let err = BackendError::Api {
            status: 400,
            message: "Product out of stock".to_string(),
        };
        assert_eq!(err.user_message(), "Product out of stock");
    }

    #[test]
    fn test_user_message_hides_parse_details() {
        let parse = serde_json::from_str::<u32>("nope").unwrap_err();
        let err = BackendError::Parse(parse);
        assert!(!err.user_message().contains("expected"));
    }

    #[test]
    fn test_is_unauthorized() {
        assert!(BackendError::Unauthorized("expired".to_string()).is_unauthorized());
        assert!(!BackendError::NotFound("x".to_string()).is_unauthorized());
        assert!(!BackendError::Forbidden("admins only".to_string()).is_unauthorized());
    }
}
