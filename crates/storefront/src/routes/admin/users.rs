//! Admin user management.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use suraj_core::{Email, UserId};
use tracing::instrument;

use super::mutation_failed;
use crate::backend::{AdminUserUpdate, BackendError, User};
use crate::error::{AppError, Result};
use crate::filters;
use crate::middleware::RequireAdmin;
use crate::models::CurrentUser;
use crate::routes::{MessageQuery, checkbox};
use crate::state::AppState;

/// User list page template.
#[derive(Template, WebTemplate)]
#[template(path = "admin/users.html")]
pub struct UsersTemplate {
    pub user: Option<CurrentUser>,
    pub users: Vec<User>,
    pub error: Option<String>,
    pub success: Option<String>,
}

/// User edit form data.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub address: String,
    pub is_admin: Option<String>,
}

impl UserForm {
    fn from_user(user: &User) -> Self {
        Self {
            username: user.username.clone(),
            email: user.email.clone(),
            phone: user.phone.clone(),
            address: user.address.clone(),
            is_admin: user.is_admin.then(|| "on".to_string()),
        }
    }

    #[must_use]
    pub fn admin_checked(&self) -> bool {
        checkbox(self.is_admin.as_deref())
    }

    /// Validate into the backend update body.
    ///
    /// # Errors
    ///
    /// Returns the message to show for a blank username or invalid email.
    pub fn to_update(&self) -> std::result::Result<AdminUserUpdate, String> {
        let username = self.username.trim();
        if username.is_empty() {
            return Err("Username is required.".to_string());
        }
        let email = Email::parse(self.email.trim())
            .map_err(|e| format!("Please enter a valid email: {e}."))?;

        Ok(AdminUserUpdate {
            username: username.to_string(),
            email: email.into_inner(),
            phone: self.phone.trim().to_string(),
            address: self.address.trim().to_string(),
            is_admin: self.admin_checked(),
        })
    }
}

/// User edit page template.
#[derive(Template, WebTemplate)]
#[template(path = "admin/user_edit.html")]
pub struct UserEditTemplate {
    pub user: Option<CurrentUser>,
    pub user_id: UserId,
    pub form: UserForm,
    pub error: Option<String>,
}

/// List every account.
#[instrument(skip(state, admin), fields(user_id = %admin.user.id))]
pub async fn index(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Query(query): Query<MessageQuery>,
) -> Result<impl IntoResponse> {
    let users = state.backend().list_users(&admin.token).await?;

    Ok(UsersTemplate {
        user: Some(admin.user),
        users,
        error: query.error_text(),
        success: query.success_text(),
    })
}

/// Display the edit form for one account.
#[instrument(skip(state, admin), fields(user_id = %admin.user.id))]
pub async fn edit(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<UserId>,
) -> Result<impl IntoResponse> {
    let account = state.backend().get_user(&admin.token, &id).await?;

    Ok(UserEditTemplate {
        user: Some(admin.user),
        form: UserForm::from_user(&account),
        user_id: id,
        error: None,
    })
}

/// Save an account.
#[instrument(skip(state, admin, form), fields(user_id = %admin.user.id))]
pub async fn update(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<UserId>,
    Form(form): Form<UserForm>,
) -> Result<Response> {
    let refuse = |form: UserForm, id: UserId, message: String| {
        let template = UserEditTemplate {
            user: Some(admin.user.clone()),
            user_id: id,
            form,
            error: Some(message),
        };
        (StatusCode::UNPROCESSABLE_ENTITY, template).into_response()
    };

    let update = match form.to_update() {
        Ok(update) => update,
        Err(message) => return Ok(refuse(form, id, message)),
    };

    match state.backend().update_user(&admin.token, &id, &update).await {
        Ok(()) => {
            tracing::info!(target_user = %id, is_admin = update.is_admin, "User updated");
            Ok(Redirect::to("/admin/users?success=updated").into_response())
        }
        Err(e) if e.is_unauthorized() => Err(AppError::Backend(e)),
        Err(e @ BackendError::Api { status, .. }) if status < 500 => {
            Ok(refuse(form, id, e.user_message()))
        }
        Err(e) => Err(AppError::Backend(e)),
    }
}

/// Delete an account.
#[instrument(skip(state, admin), fields(user_id = %admin.user.id))]
pub async fn delete(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<UserId>,
) -> Result<Response> {
    if id == admin.user.id {
        return Ok(Redirect::to("/admin/users?error=delete_failed").into_response());
    }

    match state.backend().delete_user(&admin.token, &id).await {
        Ok(()) => {
            tracing::info!(target_user = %id, "User deleted");
            Ok(Redirect::to("/admin/users?success=deleted").into_response())
        }
        Err(e) => mutation_failed(e, "/admin/users", "delete_failed"),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_admin_checkbox_maps_to_flag() {
        let form = UserForm {
            username: "meera".to_string(),
            email: "meera@example.com".to_string(),
            is_admin: Some("on".to_string()),
            ..UserForm::default()
        };
        assert!(form.to_update().unwrap().is_admin);

        let form = UserForm {
            is_admin: None,
            ..form
        };
        assert!(!form.to_update().unwrap().is_admin);
    }

    #[test]
    fn test_prefill_from_backend_user() {
        let user: User = serde_json::from_str(
            r#"{"_id":"u9","username":"meera","email":"meera@example.com","isAdmin":true,"address":"Sitabuldi"}"#,
        )
        .unwrap();
        let form = UserForm::from_user(&user);
        assert!(form.admin_checked());
        assert_eq!(form.address, "Sitabuldi");
    }
}
