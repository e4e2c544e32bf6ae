//! HTTP route handlers for storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET  /                         - Home page (in-stock products)
//! GET  /health                   - Health check
//! GET  /health/ready             - Readiness (pings the backend)
//!
//! # Catalog
//! GET  /products                 - Product listing (?category=&sort=)
//! GET  /products/{id}            - Product detail
//! GET  /search                   - Product search (?q=)
//!
//! # Cart (requires auth for mutations)
//! GET  /cart                     - Cart page
//! POST /cart/add                 - Add a product
//! POST /cart/buy-now             - Add if absent, then go to the cart
//! POST /cart/update              - Set a line's quantity
//! POST /cart/remove              - Remove a line
//! POST /cart/clear               - Remove every line
//!
//! # Checkout (requires auth)
//! GET  /checkout                 - Address and payment form
//! POST /checkout                 - Place the order
//! POST /checkout/verify          - Gateway success callback
//!
//! # Account (requires auth)
//! GET  /orders                   - Order history
//! POST /orders/{id}/cancel       - Cancel a processing order
//! GET  /complaints               - Service request form
//! POST /complaints               - File a service request
//! GET  /profile                  - Profile page
//! POST /profile                  - Update profile
//!
//! # Auth
//! GET  /auth/login               - Login page
//! POST /auth/login               - Login action (rate limited)
//! GET  /auth/register            - Register page
//! POST /auth/register            - Register action (rate limited)
//! POST /auth/logout              - Logout action
//!
//! # Admin (requires admin)
//! GET  /admin                    - Dashboard
//! GET  /admin/users              - User list
//! GET  /admin/users/{id}/edit    - Edit user form
//! POST /admin/users/{id}         - Update user
//! POST /admin/users/{id}/delete  - Delete user
//! GET  /admin/products           - Product list (?q=)
//! GET  /admin/products/new       - New product form
//! POST /admin/products           - Create product
//! GET  /admin/products/{id}/edit - Edit product form
//! POST /admin/products/{id}      - Update product
//! POST /admin/products/{id}/stock  - Toggle in-stock
//! POST /admin/products/{id}/delete - Delete product
//! GET  /admin/orders             - Order list with filters
//! POST /admin/orders/{id}/status - Set order status
//! GET  /admin/complaints         - Complaint list
//! POST /admin/complaints/{id}/status - Set complaint status
//! ```

pub mod admin;
pub mod auth;
pub mod cart;
pub mod checkout;
pub mod complaints;
pub mod home;
pub mod orders;
pub mod products;
pub mod profile;
pub mod search;

use axum::{
    Router,
    routing::{get, post},
};
use serde::Deserialize;

use crate::middleware::auth_rate_limiter;
use crate::state::AppState;

// =============================================================================
// Shared Query Types
// =============================================================================

/// Query parameters for error/success display.
///
/// Values are short codes, translated by [`notice`]; unknown codes show nothing.
#[derive(Debug, Default, Deserialize)]
pub struct MessageQuery {
    pub error: Option<String>,
    pub success: Option<String>,
}

impl MessageQuery {
    #[must_use]
    pub fn error_text(&self) -> Option<String> {
        self.error.as_deref().and_then(notice).map(str::to_string)
    }

    #[must_use]
    pub fn success_text(&self) -> Option<String> {
        self.success.as_deref().and_then(notice).map(str::to_string)
    }
}

/// Human text for a redirect message code.
#[must_use]
pub fn notice(code: &str) -> Option<&'static str> {
    let text = match code {
        // Errors
        "session_expired" => "Your session has expired. Please log in again.",
        "cart_failed" => "Could not update your cart. Please try again.",
        "quantity" => "Quantity must be at least 1.",
        "empty_cart" => "Your cart is empty.",
        "payment_init" => "Failed to initialize payment",
        "payment_verification_failed" => "Payment verification failed",
        "not_cancellable" => "Only orders that are processing can be cancelled.",
        "update_failed" => "The update could not be saved. Please try again.",
        "delete_failed" => "Could not delete. Please try again.",
        // Successes
        "registered" => "Registration successful! Please log in.",
        "added" => "Added to cart.",
        "cleared" => "Your cart has been cleared.",
        "cancelled" => "Order cancelled.",
        "submitted" => "Your complaint has been submitted. We will contact you soon.",
        "updated" => "Changes saved.",
        "created" => "Created successfully.",
        "deleted" => "Deleted successfully.",
        _ => return None,
    };
    Some(text)
}

// =============================================================================
// Redirect Helpers
// =============================================================================

/// A local path to return to after a form post, or `fallback`.
///
/// Only same-site absolute paths are accepted; scheme-relative `//host`
/// and backslash tricks fall back.
#[must_use]
pub fn safe_return_to(return_to: Option<&str>, fallback: &str) -> String {
    return_to
        .map(str::trim)
        .filter(|path| {
            path.starts_with('/')
                && !path.starts_with("//")
                && !path.contains('\\')
                && !path.chars().any(char::is_control)
        })
        .unwrap_or(fallback)
        .to_string()
}

/// Append `key=value` to a path that may already carry a query string.
#[must_use]
pub fn with_query(path: &str, key: &str, value: &str) -> String {
    let separator = if path.contains('?') { '&' } else { '?' };
    format!("{path}{separator}{key}={}", urlencoding::encode(value))
}

/// Whether an HTML checkbox was ticked.
#[must_use]
pub fn checkbox(value: Option<&str>) -> bool {
    matches!(value, Some("on" | "true" | "1" | "yes"))
}

// =============================================================================
// Routers
// =============================================================================

/// Create the auth routes router.
///
/// Form posts share one rate limiter keyed by client IP.
pub fn auth_routes() -> Router<AppState> {
    let limiter = auth_rate_limiter();

    Router::new()
        .route(
            "/login",
            get(auth::login_page).merge(post(auth::login).layer(limiter.clone())),
        )
        .route(
            "/register",
            get(auth::register_page).merge(post(auth::register).layer(limiter)),
        )
        .route("/logout", post(auth::logout))
}

/// Create the product routes router.
pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(products::index))
        .route("/{id}", get(products::show))
}

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show))
        .route("/add", post(cart::add))
        .route("/buy-now", post(cart::buy_now))
        .route("/update", post(cart::update))
        .route("/remove", post(cart::remove))
        .route("/clear", post(cart::clear))
}

/// Create the checkout routes router.
pub fn checkout_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(checkout::show).post(checkout::submit))
        .route("/verify", post(checkout::verify))
}

/// Create the customer account routes router.
pub fn account_routes() -> Router<AppState> {
    Router::new()
        .route("/orders", get(orders::index))
        .route("/orders/{id}/cancel", post(orders::cancel))
        .route(
            "/complaints",
            get(complaints::show).post(complaints::submit),
        )
        .route("/profile", get(profile::show).post(profile::update))
}

/// Create all routes for the storefront.
pub fn routes() -> Router<AppState> {
    Router::new()
        // Home page
        .route("/", get(home::home))
        // Catalog
        .nest("/products", product_routes())
        .route("/search", get(search::index))
        // Cart and checkout
        .nest("/cart", cart_routes())
        .nest("/checkout", checkout_routes())
        // Orders, complaints, profile
        .merge(account_routes())
        // Auth routes
        .nest("/auth", auth_routes())
        // Back-office
        .nest("/admin", admin::routes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_safe_return_to() {
        assert_eq!(safe_return_to(Some("/products?category=TV"), "/"), "/products?category=TV");
        assert_eq!(safe_return_to(Some("//evil.example"), "/cart"), "/cart");
        assert_eq!(safe_return_to(Some("https://evil.example"), "/cart"), "/cart");
        assert_eq!(safe_return_to(Some("/\\evil.example"), "/cart"), "/cart");
        assert_eq!(safe_return_to(None, "/cart"), "/cart");
    }

    #[test]
    fn test_with_query() {
        assert_eq!(with_query("/cart", "error", "quantity"), "/cart?error=quantity");
        assert_eq!(
            with_query("/products?sort=lowToHigh", "success", "added"),
            "/products?sort=lowToHigh&success=added"
        );
    }

    #[test]
    fn test_unknown_notice_codes_are_dropped() {
        let query = MessageQuery {
            error: Some("<script>".to_string()),
            success: Some("registered".to_string()),
        };
        assert!(query.error_text().is_none());
        assert_eq!(
            query.success_text().as_deref(),
            Some("Registration successful! Please log in.")
        );
    }

    #[test]
    fn test_checkbox() {
        assert!(checkbox(Some("on")));
        assert!(!checkbox(None));
        assert!(!checkbox(Some("off")));
    }
}
