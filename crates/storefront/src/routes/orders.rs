//! Customer order history and cancellation.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Path, Query, State},
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use suraj_core::{OrderId, OrderStatus};
use tracing::instrument;

use crate::backend::Order;
use crate::error::{AppError, Result};
use crate::filters;
use crate::middleware::RequireAuth;
use crate::models::CurrentUser;
use crate::routes::notice;
use crate::state::AppState;

/// Query parameters for the orders page.
#[derive(Debug, Default, Deserialize)]
pub struct OrdersPageQuery {
    /// Cash-on-delivery order just placed.
    pub placed: Option<String>,
    /// Gateway order whose payment was just verified.
    pub verified: Option<String>,
    pub error: Option<String>,
    pub success: Option<String>,
}

impl OrdersPageQuery {
    fn success_text(&self) -> Option<String> {
        if let Some(id) = &self.placed {
            return Some(format!(
                "Order placed successfully! Order ID: {id}. Payment will be collected on delivery."
            ));
        }
        if let Some(id) = &self.verified {
            return Some(format!("Payment successful! Order ID: {id}"));
        }
        self.success.as_deref().and_then(notice).map(str::to_string)
    }

    fn error_text(&self) -> Option<String> {
        self.error.as_deref().and_then(notice).map(str::to_string)
    }
}

/// Orders page template.
#[derive(Template, WebTemplate)]
#[template(path = "orders.html")]
pub struct OrdersTemplate {
    pub user: Option<CurrentUser>,
    pub orders: Vec<Order>,
    pub error: Option<String>,
    pub success: Option<String>,
}

/// Display the logged-in user's orders, in backend order.
#[instrument(skip(state, auth), fields(user_id = %auth.user.id))]
pub async fn index(
    State(state): State<AppState>,
    RequireAuth(auth): RequireAuth,
    Query(query): Query<OrdersPageQuery>,
) -> Result<impl IntoResponse> {
    let orders = state.backend().my_orders(&auth.token).await?;

    Ok(OrdersTemplate {
        user: Some(auth.user),
        orders,
        error: query.error_text(),
        success: query.success_text(),
    })
}

/// Cancel an order. Only orders that are still processing qualify.
#[instrument(skip(state, auth), fields(user_id = %auth.user.id))]
pub async fn cancel(
    State(state): State<AppState>,
    RequireAuth(auth): RequireAuth,
    Path(id): Path<OrderId>,
) -> Result<Response> {
    let orders = state.backend().my_orders(&auth.token).await?;
    let order = orders
        .iter()
        .find(|order| order.id == id)
        .ok_or_else(|| AppError::NotFound(format!("order {id}")))?;

    if !order.is_cancellable() {
        tracing::info!(order_id = %id, status = %order.status_label(), "Refused to cancel order");
        return Ok(Redirect::to("/orders?error=not_cancellable").into_response());
    }

    state
        .backend()
        .update_order_status(&auth.token, &id, OrderStatus::Cancelled)
        .await?;
    tracing::info!(order_id = %id, "Order cancelled by customer");

    Ok(Redirect::to("/orders?success=cancelled").into_response())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_placed_message_names_order() {
        let query = OrdersPageQuery {
            placed: Some("665f00aa".to_string()),
            ..OrdersPageQuery::default()
        };
        assert_eq!(
            query.success_text().as_deref(),
            Some("Order placed successfully! Order ID: 665f00aa. Payment will be collected on delivery.")
        );
    }

    #[test]
    fn test_verified_message() {
        let query = OrdersPageQuery {
            verified: Some("665f00bb".to_string()),
            ..OrdersPageQuery::default()
        };
        assert_eq!(
            query.success_text().as_deref(),
            Some("Payment successful! Order ID: 665f00bb")
        );
    }
}
