//! Handler errors and their HTTP rendering.
//!
//! Handlers return [`Result`]. Server-side failures are reported to Sentry
//! once, here, before the response is built.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use thiserror::Error;

use crate::backend::BackendError;
use crate::models::CurrentUser;

/// Where a rejected backend token sends the visitor. The login page clears
/// the stale session when it sees this code.
pub const SESSION_EXPIRED_REDIRECT: &str = "/auth/login?error=session_expired";

/// Everything a storefront handler can fail with.
#[derive(Debug, Error)]
pub enum AppError {
    /// A backend call failed; see [`BackendError`] for the cases.
    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),

    /// Session store operation failed.
    #[error("Session error: {0}")]
    Session(#[from] tower_sessions::session::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    /// The reason is shown to the visitor.
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Rate limited")]
    RateLimited,

    /// Reason is logged, never shown.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    const fn is_server_error(&self) -> bool {
        match self {
            Self::Backend(err) => match err {
                BackendError::Http(_) | BackendError::Parse(_) | BackendError::Url(_) => true,
                BackendError::Api { status, .. } => *status >= 500,
                BackendError::Unauthorized(_)
                | BackendError::Forbidden(_)
                | BackendError::NotFound(_) => false,
            },
            Self::Session(_) | Self::Internal(_) => true,
            Self::NotFound(_) | Self::BadRequest(_) | Self::RateLimited => false,
        }
    }

    /// Status and customer-facing text. Transport, session and parse
    /// details stay in the logs.
    fn public_parts(&self) -> (StatusCode, String) {
        match self {
            Self::Backend(BackendError::NotFound(_)) | Self::NotFound(_) => {
                (StatusCode::NOT_FOUND, "Not found".to_string())
            }
            Self::Backend(BackendError::Forbidden(_)) => (
                StatusCode::FORBIDDEN,
                "You do not have access to that.".to_string(),
            ),
            Self::Backend(err @ BackendError::Api { status, .. }) if *status < 500 => {
                (StatusCode::BAD_REQUEST, err.user_message())
            }
            Self::Backend(_) => (
                StatusCode::BAD_GATEWAY,
                "The store is unavailable right now. Please try again.".to_string(),
            ),
            Self::Session(_) | Self::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            ),
            Self::BadRequest(reason) => (StatusCode::BAD_REQUEST, reason.clone()),
            Self::RateLimited => (
                StatusCode::TOO_MANY_REQUESTS,
                "Too many attempts. Please wait a moment.".to_string(),
            ),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(error = %self, sentry_event_id = %event_id, "Request failed");
        }

        // The backend no longer accepts the token: send the visitor to log in again.
        if matches!(self, Self::Backend(BackendError::Unauthorized(_))) {
            return Redirect::to(SESSION_EXPIRED_REDIRECT).into_response();
        }

        self.public_parts().into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Tag Sentry events with the logged-in customer, or drop the tag.
pub fn set_sentry_user(user: Option<&CurrentUser>) {
    let sentry_user = user.map(|user| sentry::User {
        id: Some(user.id.to_string()),
        email: Some(user.email.clone()),
        username: Some(user.username.clone()),
        ..Default::default()
    });
    sentry::configure_scope(|scope| scope.set_user(sentry_user));
}

/// Record a shopper action against one entity (`order_id`, `product_id`).
///
/// ```rust,ignore
/// breadcrumb("cart", "Added to cart", ("product_id", "65f1c2"));
/// ```
pub fn breadcrumb(category: &str, message: &str, (key, id): (&str, &str)) {
    let mut crumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };
    crumb
        .data
        .insert(key.to_string(), serde_json::Value::from(id));
    sentry::add_breadcrumb(crumb);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn get_status(err: AppError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn test_internal_details_are_hidden() {
        let (status, message) = AppError::Internal("pool exhausted".to_string()).public_parts();
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!message.contains("pool"));

        let (status, message) = AppError::BadRequest("Quantity must be at least 1".to_string())
            .public_parts();
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(message, "Quantity must be at least 1");

        assert_eq!(get_status(AppError::RateLimited), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(
            get_status(AppError::NotFound("order 65f1".to_string())),
            StatusCode::NOT_FOUND
        );
    }

    #[test]
    fn test_backend_error_mapping() {
        assert_eq!(
            get_status(BackendError::NotFound("Product not found".to_string()).into()),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            get_status(
                BackendError::Api {
                    status: 400,
                    message: "Cart is empty".to_string()
                }
                .into()
            ),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(
                BackendError::Api {
                    status: 502,
                    message: "upstream".to_string()
                }
                .into()
            ),
            StatusCode::BAD_GATEWAY
        );
    }

    #[test]
    fn test_forbidden_keeps_its_status() {
        let response =
            AppError::from(BackendError::Forbidden("Admins only".to_string())).into_response();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert!(response.headers().get("location").is_none());
    }

    #[test]
    fn test_unauthorized_backend_redirects_to_login() {
        let response =
            AppError::from(BackendError::Unauthorized("Token is not valid".to_string()))
                .into_response();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers()["location"], SESSION_EXPIRED_REDIRECT);
    }
}
