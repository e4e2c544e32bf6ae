//! Admin back-office route handlers.
//!
//! Every handler takes `RequireAdmin`; the backend re-checks the admin flag
//! on its side for each call.

pub mod complaints;
pub mod dashboard;
pub mod orders;
pub mod products;
pub mod users;

use axum::{
    Router,
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
};

use crate::backend::BackendError;
use crate::error::{AppError, Result};
use crate::routes::with_query;
use crate::state::AppState;

/// Redirect back to an admin list after a failed mutation.
///
/// A rejected token still ends the session; anything else is logged and
/// reported with an error code.
fn mutation_failed(err: BackendError, back_to: &str, code: &str) -> Result<Response> {
    if err.is_unauthorized() {
        return Err(AppError::Backend(err));
    }
    tracing::warn!(error = %err, back_to, "Admin update failed");
    Ok(Redirect::to(&with_query(back_to, "error", code)).into_response())
}

/// Create the admin routes router.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(dashboard::index))
        // Users
        .route("/users", get(users::index))
        .route("/users/{id}/edit", get(users::edit))
        .route("/users/{id}", post(users::update))
        .route("/users/{id}/delete", post(users::delete))
        // Products
        .route("/products", get(products::index).post(products::create))
        .route("/products/new", get(products::new_product))
        .route("/products/{id}/edit", get(products::edit))
        .route("/products/{id}", post(products::update))
        .route("/products/{id}/stock", post(products::toggle_stock))
        .route("/products/{id}/delete", post(products::delete))
        // Orders
        .route("/orders", get(orders::index))
        .route("/orders/{id}/status", post(orders::update_status))
        // Complaints
        .route("/complaints", get(complaints::index))
        .route("/complaints/{id}/status", post(complaints::update_status))
}
