//! Admin order management.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, Query, State},
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use suraj_core::{OrderId, OrderStatus};
use tracing::instrument;

use super::mutation_failed;
use crate::backend::Order;
use crate::error::Result;
use crate::filters;
use crate::middleware::RequireAdmin;
use crate::models::CurrentUser;
use crate::routes::MessageQuery;
use crate::services::order_filter::{OrderFilter, OrderSort, OrdersQuery};
use crate::state::AppState;

/// Status change form.
#[derive(Debug, Deserialize)]
pub struct StatusForm {
    pub status: OrderStatus,
}

/// Orders page template.
#[derive(Template, WebTemplate)]
#[template(path = "admin/orders.html")]
pub struct OrdersTemplate {
    pub user: Option<CurrentUser>,
    pub orders: Vec<Order>,
    /// Orders before filtering.
    pub total: usize,
    /// Raw query, echoed back into the filter form.
    pub query: OrdersQuery,
    pub applied: OrderFilter,
    pub statuses: [OrderStatus; 5],
    pub sorts: [OrderSort; 6],
    pub error: Option<String>,
    pub success: Option<String>,
}

impl OrdersTemplate {
    /// Echo a raw filter value back into its input.
    #[must_use]
    pub fn raw(&self, key: &str) -> &str {
        let value = match key {
            "search" => &self.query.search,
            "from" => &self.query.from,
            "to" => &self.query.to,
            "min_price" => &self.query.min_price,
            "max_price" => &self.query.max_price,
            _ => return "",
        };
        value.as_deref().unwrap_or_default()
    }

    #[must_use]
    pub fn status_selected(&self, status: &OrderStatus) -> bool {
        self.applied.status == Some(*status)
    }

    #[must_use]
    pub fn sort_selected(&self, sort: &OrderSort) -> bool {
        self.applied.sort == *sort
    }
}

/// List every order, filtered and sorted by the query string.
#[instrument(skip(state, admin, query), fields(user_id = %admin.user.id))]
pub async fn index(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Query(query): Query<OrdersQuery>,
    Query(messages): Query<MessageQuery>,
) -> Result<impl IntoResponse> {
    let orders = state.backend().all_orders(&admin.token).await?;
    let total = orders.len();
    let filter = OrderFilter::from(&query);
    let orders = filter.apply(orders);

    Ok(OrdersTemplate {
        user: Some(admin.user),
        orders,
        total,
        query,
        applied: filter,
        statuses: OrderStatus::ALL,
        sorts: OrderSort::ALL,
        error: messages.error_text(),
        success: messages.success_text(),
    })
}

/// Move an order to a new status.
#[instrument(skip(state, admin), fields(user_id = %admin.user.id))]
pub async fn update_status(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<OrderId>,
    Form(form): Form<StatusForm>,
) -> Result<Response> {
    match state
        .backend()
        .update_order_status(&admin.token, &id, form.status)
        .await
    {
        Ok(()) => {
            tracing::info!(order_id = %id, status = %form.status, "Order status changed");
            Ok(Redirect::to("/admin/orders?success=updated").into_response())
        }
        Err(e) => mutation_failed(e, "/admin/orders", "update_failed"),
    }
}
