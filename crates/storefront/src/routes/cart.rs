//! Cart route handlers.
//!
//! The cart lives on the backend. Every mutation is a plain form post that
//! redirects back to a validated local `return_to` path.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Query, State},
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use suraj_core::{CartItemId, Price, ProductId};
use tracing::instrument;

use crate::backend::{BackendError, Cart, Product};
use crate::error::{AppError, Result, breadcrumb};
use crate::filters;
use crate::middleware::{OptionalAuth, RequireAuth};
use crate::models::CurrentUser;
use crate::routes::{MessageQuery, safe_return_to, with_query};
use crate::state::AppState;

// =============================================================================
// View Types
// =============================================================================

/// Cart line display data for templates.
#[derive(Debug, Clone)]
pub struct CartLineView {
    pub item_id: CartItemId,
    pub product: Product,
    pub quantity: u32,
    pub unit_price: Price,
    pub line_total: Price,
}

/// Cart display data for templates.
#[derive(Debug, Clone)]
pub struct CartView {
    pub lines: Vec<CartLineView>,
    pub subtotal: Price,
    pub item_count: u32,
}

impl CartView {
    /// Whether there is nothing to check out.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

impl From<&Cart> for CartView {
    fn from(cart: &Cart) -> Self {
        let lines: Vec<CartLineView> = cart
            .lines()
            .map(|(item, product)| {
                let unit_price = product.unit_price();
                CartLineView {
                    item_id: item.id.clone(),
                    product: product.clone(),
                    quantity: item.quantity,
                    unit_price,
                    line_total: unit_price * item.quantity,
                }
            })
            .collect();

        Self {
            subtotal: lines.iter().map(|line| line.line_total).sum(),
            item_count: lines.iter().map(|line| line.quantity).sum(),
            lines,
        }
    }
}

// =============================================================================
// Form Types
// =============================================================================

/// Add-to-cart form data.
#[derive(Debug, Deserialize)]
pub struct AddForm {
    pub product_id: ProductId,
    pub quantity: Option<u32>,
    pub return_to: Option<String>,
}

/// Buy-now form data.
#[derive(Debug, Deserialize)]
pub struct BuyNowForm {
    pub product_id: ProductId,
}

/// Quantity update form data.
///
/// Signed so that zero and negative values reach the handler and can be
/// refused with a message instead of a form rejection.
#[derive(Debug, Deserialize)]
pub struct UpdateForm {
    pub item_id: CartItemId,
    pub quantity: i64,
    pub return_to: Option<String>,
}

/// Remove-line form data.
#[derive(Debug, Deserialize)]
pub struct RemoveForm {
    pub item_id: CartItemId,
    pub return_to: Option<String>,
}

// =============================================================================
// Templates
// =============================================================================

/// Cart page template.
#[derive(Template, WebTemplate)]
#[template(path = "cart.html")]
pub struct CartTemplate {
    pub user: Option<CurrentUser>,
    pub cart: CartView,
    pub error: Option<String>,
    pub success: Option<String>,
}

// =============================================================================
// Handlers
// =============================================================================

/// Display the cart page. Logged-out visitors get a login prompt.
#[instrument(skip(state, auth))]
pub async fn show(
    State(state): State<AppState>,
    auth: OptionalAuth,
    Query(query): Query<MessageQuery>,
) -> Result<impl IntoResponse> {
    let cart = match &auth.0 {
        Some(auth) => CartView::from(&state.backend().get_cart(&auth.token).await?),
        None => CartView::from(&Cart::default()),
    };

    Ok(CartTemplate {
        user: auth.user().cloned(),
        cart,
        error: query.error_text(),
        success: query.success_text(),
    })
}

/// Turn a mutation failure into a redirect with an error code.
///
/// A rejected token still ends the session.
fn mutation_failed(err: BackendError, return_to: &str) -> Result<Response> {
    if err.is_unauthorized() {
        return Err(AppError::Backend(err));
    }
    tracing::warn!(error = %err, "Cart update failed");
    Ok(Redirect::to(&with_query(return_to, "error", "cart_failed")).into_response())
}

/// Add a product to the cart.
#[instrument(skip(state, auth), fields(user_id = %auth.user.id))]
pub async fn add(
    State(state): State<AppState>,
    RequireAuth(auth): RequireAuth,
    Form(form): Form<AddForm>,
) -> Result<Response> {
    let return_to = safe_return_to(form.return_to.as_deref(), "/cart");
    let quantity = form.quantity.unwrap_or(1).max(1);

    match state
        .backend()
        .add_to_cart(&auth.token, &form.product_id, quantity)
        .await
    {
        Ok(()) => {
            breadcrumb(
                "cart",
                "Added to cart",
                ("product_id", form.product_id.as_str()),
            );
            Ok(Redirect::to(&return_to).into_response())
        }
        Err(e) => mutation_failed(e, &return_to),
    }
}

/// Add the product if it is not already in the cart, then go to the cart.
#[instrument(skip(state, auth), fields(user_id = %auth.user.id))]
pub async fn buy_now(
    State(state): State<AppState>,
    RequireAuth(auth): RequireAuth,
    Form(form): Form<BuyNowForm>,
) -> Result<Response> {
    let cart = state.backend().get_cart(&auth.token).await?;

    if cart.line_for(&form.product_id).is_none()
        && let Err(e) = state
            .backend()
            .add_to_cart(&auth.token, &form.product_id, 1)
            .await
    {
        return mutation_failed(e, "/cart");
    }

    Ok(Redirect::to("/cart").into_response())
}

/// Set a cart line's quantity. Values below 1 are refused without a backend call.
#[instrument(skip(state, auth), fields(user_id = %auth.user.id))]
pub async fn update(
    State(state): State<AppState>,
    RequireAuth(auth): RequireAuth,
    Form(form): Form<UpdateForm>,
) -> Result<Response> {
    let return_to = safe_return_to(form.return_to.as_deref(), "/cart");

    let Some(quantity) = u32::try_from(form.quantity).ok().filter(|q| *q >= 1) else {
        return Ok(Redirect::to(&with_query(&return_to, "error", "quantity")).into_response());
    };

    match state
        .backend()
        .update_cart_item(&auth.token, &form.item_id, quantity)
        .await
    {
        Ok(()) => Ok(Redirect::to(&return_to).into_response()),
        Err(e) => mutation_failed(e, &return_to),
    }
}

/// Remove one cart line.
#[instrument(skip(state, auth), fields(user_id = %auth.user.id))]
pub async fn remove(
    State(state): State<AppState>,
    RequireAuth(auth): RequireAuth,
    Form(form): Form<RemoveForm>,
) -> Result<Response> {
    let return_to = safe_return_to(form.return_to.as_deref(), "/cart");

    match state
        .backend()
        .remove_cart_item(&auth.token, &form.item_id)
        .await
    {
        Ok(()) => Ok(Redirect::to(&return_to).into_response()),
        Err(e) => mutation_failed(e, &return_to),
    }
}

/// Remove every cart line.
#[instrument(skip(state, auth), fields(user_id = %auth.user.id))]
pub async fn clear(State(state): State<AppState>, RequireAuth(auth): RequireAuth) -> Result<Response> {
    match state.backend().clear_cart(&auth.token).await {
        Ok(()) => Ok(Redirect::to("/cart?success=cleared").into_response()),
        Err(e) => mutation_failed(e, "/cart"),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_cart_view_totals() {
        let cart: Cart = serde_json::from_str(
            r#"{"items":[
                {"_id":"ci1","product":{"_id":"p1","name":"Remote","price":250},"quantity":2},
                {"_id":"ci2","product":{"_id":"p2","name":"Soundbar","price":5999.5},"quantity":1},
                {"_id":"ci3","product":null,"quantity":4}
            ]}"#,
        )
        .unwrap();

        let view = CartView::from(&cart);
        assert_eq!(view.lines.len(), 2);
        assert_eq!(view.lines[0].line_total.to_string(), "₹500.00");
        assert_eq!(view.subtotal.to_string(), "₹6499.50");
        assert_eq!(view.item_count, 3);
    }

    #[test]
    fn test_empty_cart_view() {
        let view = CartView::from(&Cart::default());
        assert!(view.is_empty());
        assert_eq!(view.subtotal.to_string(), "₹0.00");
    }
}
