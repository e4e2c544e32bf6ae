//! Admin dashboard.

use askama::Template;
use askama_web::WebTemplate;
use axum::{extract::State, response::IntoResponse};
use suraj_core::{ComplaintStatus, OrderStatus};
use tracing::instrument;

use crate::error::Result;
use crate::filters;
use crate::middleware::RequireAdmin;
use crate::models::CurrentUser;
use crate::state::AppState;

/// Headline numbers for the dashboard cards.
#[derive(Debug, Clone, Default)]
pub struct DashboardCounts {
    pub users: usize,
    pub products: usize,
    pub out_of_stock: usize,
    pub orders: usize,
    pub processing_orders: usize,
    pub complaints: usize,
    pub pending_complaints: usize,
}

/// Dashboard page template.
#[derive(Template, WebTemplate)]
#[template(path = "admin/dashboard.html")]
pub struct DashboardTemplate {
    pub user: Option<CurrentUser>,
    pub counts: DashboardCounts,
}

/// Dashboard: links to the four management areas with their counts.
#[instrument(skip(state, admin), fields(user_id = %admin.user.id))]
pub async fn index(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
) -> Result<impl IntoResponse> {
    let backend = state.backend();
    let (users, products, orders, complaints) = tokio::try_join!(
        backend.list_users(&admin.token),
        backend.list_products(),
        backend.all_orders(&admin.token),
        backend.list_complaints(&admin.token),
    )?;

    let counts = DashboardCounts {
        users: users.len(),
        products: products.len(),
        out_of_stock: products.iter().filter(|p| !p.in_stock).count(),
        orders: orders.len(),
        processing_orders: orders
            .iter()
            .filter(|o| o.known_status() == Some(OrderStatus::Processing))
            .count(),
        complaints: complaints.len(),
        pending_complaints: complaints
            .iter()
            .filter(|c| c.status == ComplaintStatus::Pending)
            .count(),
    };

    Ok(DashboardTemplate {
        user: Some(admin.user),
        counts,
    })
}
