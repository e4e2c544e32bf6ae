//! Admin complaint management.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, Query, State},
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use suraj_core::{ComplaintId, ComplaintStatus};
use tracing::instrument;

use super::mutation_failed;
use crate::backend::Complaint;
use crate::error::Result;
use crate::filters;
use crate::middleware::RequireAdmin;
use crate::models::CurrentUser;
use crate::routes::MessageQuery;
use crate::state::AppState;

/// Status change form.
#[derive(Debug, Deserialize)]
pub struct StatusForm {
    pub status: ComplaintStatus,
}

/// Complaints page template.
#[derive(Template, WebTemplate)]
#[template(path = "admin/complaints.html")]
pub struct ComplaintsTemplate {
    pub user: Option<CurrentUser>,
    pub complaints: Vec<Complaint>,
    pub statuses: [ComplaintStatus; 4],
    pub error: Option<String>,
    pub success: Option<String>,
}

/// List every complaint, newest first.
#[instrument(skip(state, admin), fields(user_id = %admin.user.id))]
pub async fn index(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Query(query): Query<MessageQuery>,
) -> Result<impl IntoResponse> {
    let mut complaints = state.backend().list_complaints(&admin.token).await?;
    complaints.sort_by(|a, b| b.created_at.cmp(&a.created_at));

    Ok(ComplaintsTemplate {
        user: Some(admin.user),
        complaints,
        statuses: ComplaintStatus::ALL,
        error: query.error_text(),
        success: query.success_text(),
    })
}

/// Move a complaint to a new status.
#[instrument(skip(state, admin), fields(user_id = %admin.user.id))]
pub async fn update_status(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<ComplaintId>,
    Form(form): Form<StatusForm>,
) -> Result<Response> {
    match state
        .backend()
        .update_complaint_status(&admin.token, &id, form.status)
        .await
    {
        Ok(()) => {
            tracing::info!(complaint_id = %id, status = %form.status, "Complaint status changed");
            Ok(Redirect::to("/admin/complaints?success=updated").into_response())
        }
        Err(e) => mutation_failed(e, "/admin/complaints", "update_failed"),
    }
}
