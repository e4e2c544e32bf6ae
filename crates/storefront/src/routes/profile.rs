//! Profile route handlers.
//!
//! The profile page always reloads the user from `GET /auth/me`, so edits
//! made by an admin show up and a revoked token ends the session here.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use suraj_core::{Email, INDIAN_STATES, ShippingAddress};
use tower_sessions::Session;
use tracing::instrument;

use crate::backend::{BackendError, ProfileUpdate};
use crate::error::{AppError, Result, SESSION_EXPIRED_REDIRECT, set_sentry_user};
use crate::filters;
use crate::middleware::{RequireAuth, clear_auth_session, update_session_user};
use crate::models::{AuthSession, CurrentUser};
use crate::routes::{MessageQuery, checkbox};
use crate::state::AppState;

/// Profile form data.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfileForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub area: String,
    #[serde(default)]
    pub landmark: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub pincode: String,
    #[serde(default)]
    pub instructions: String,
    pub save_as_default: Option<String>,
}

impl ProfileForm {
    /// Pre-fill from the current profile. The default-address box starts
    /// ticked when a usable address is saved.
    fn from_user(user: &CurrentUser) -> Self {
        let address = user.shipping_address.clone().unwrap_or_default();
        Self {
            username: user.username.clone(),
            email: user.email.clone(),
            phone: user.phone.clone(),
            save_as_default: user.usable_address().map(|_| "on".to_string()),
            area: address.area,
            landmark: address.landmark,
            city: address.city,
            state: address.state,
            pincode: address.pincode,
            instructions: address.instructions,
        }
    }

    /// Whether `name` is the selected state.
    #[must_use]
    pub fn state_is(&self, name: &str) -> bool {
        self.state == name
    }

    #[must_use]
    pub fn saves_default(&self) -> bool {
        checkbox(self.save_as_default.as_deref())
    }

    /// Build the update body. An unticked default box clears the saved address.
    ///
    /// # Errors
    ///
    /// Returns the message to show for an invalid email or address.
    pub fn to_update(&self) -> std::result::Result<ProfileUpdate, String> {
        let username = self.username.trim();
        if username.is_empty() {
            return Err("Username is required.".to_string());
        }
        let email = Email::parse(self.email.trim())
            .map_err(|e| format!("Please enter a valid email: {e}."))?;

        let shipping_address = if self.saves_default() {
            let address = ShippingAddress {
                area: self.area.clone(),
                landmark: self.landmark.clone(),
                city: self.city.clone(),
                state: self.state.clone(),
                pincode: self.pincode.clone(),
                instructions: self.instructions.clone(),
            }
            .trimmed();
            address
                .validate()
                .map_err(|e| format!("Please check your address: {e}."))?;
            Some(address)
        } else {
            None
        };

        Ok(ProfileUpdate {
            username: Some(username.to_string()),
            email: Some(email.into_inner()),
            phone: Some(self.phone.trim().to_string()),
            shipping_address,
        })
    }
}

/// Profile page template.
#[derive(Template, WebTemplate)]
#[template(path = "profile.html")]
pub struct ProfileTemplate {
    pub user: Option<CurrentUser>,
    pub form: ProfileForm,
    pub states: &'static [&'static str],
    pub error: Option<String>,
    pub success: Option<String>,
}

fn render(user: CurrentUser, form: ProfileForm, error: Option<String>, success: Option<String>) -> Response {
    let status = if error.is_some() {
        StatusCode::UNPROCESSABLE_ENTITY
    } else {
        StatusCode::OK
    };
    let template = ProfileTemplate {
        user: Some(user),
        form,
        states: &INDIAN_STATES,
        error,
        success,
    };
    (status, template).into_response()
}

/// End the session after the backend rejected the token.
async fn expire_session(session: &Session, err: &BackendError) -> Result<Response> {
    tracing::info!(error = %err, "Backend rejected session token");
    clear_auth_session(session).await?;
    Ok(Redirect::to(SESSION_EXPIRED_REDIRECT).into_response())
}

/// Display the profile page with fresh data from the backend.
#[instrument(skip(state, auth, session), fields(user_id = %auth.user.id))]
pub async fn show(
    State(state): State<AppState>,
    RequireAuth(auth): RequireAuth,
    session: Session,
    Query(query): Query<MessageQuery>,
) -> Result<Response> {
    let user = match state.backend().me(&auth.token).await {
        Ok(user) => CurrentUser::from(user),
        Err(e) if e.is_unauthorized() => return expire_session(&session, &e).await,
        Err(e) => return Err(e.into()),
    };
    update_session_user(&session, &auth, user.clone()).await?;

    let form = ProfileForm::from_user(&user);
    Ok(render(user, form, query.error_text(), query.success_text()))
}

/// Save profile changes. The returned user replaces the session copy.
#[instrument(skip(state, auth, session, form), fields(user_id = %auth.user.id))]
pub async fn update(
    State(state): State<AppState>,
    RequireAuth(auth): RequireAuth,
    session: Session,
    Form(form): Form<ProfileForm>,
) -> Result<Response> {
    let AuthSession { user, .. } = &auth;

    let update = match form.to_update() {
        Ok(update) => update,
        Err(message) => return Ok(render(user.clone(), form, Some(message), None)),
    };

    match state.backend().update_profile(&auth.token, &update).await {
        Ok(updated) => {
            let updated = CurrentUser::from(updated);
            set_sentry_user(Some(&updated));
            update_session_user(&session, &auth, updated).await?;
            Ok(Redirect::to("/profile?success=updated").into_response())
        }
        Err(e) if e.is_unauthorized() => expire_session(&session, &e).await,
        Err(e @ BackendError::Api { status, .. }) if status < 500 => {
            Ok(render(user.clone(), form, Some(e.user_message()), None))
        }
        Err(e) => Err(AppError::Backend(e)),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use suraj_core::UserId;

    use super::*;

    fn form() -> ProfileForm {
        ProfileForm {
            username: "ravi".to_string(),
            email: "ravi@example.com".to_string(),
            phone: "9876543210".to_string(),
            area: "12 MG Road".to_string(),
            city: "Pune".to_string(),
            state: "Maharashtra".to_string(),
            pincode: "411001".to_string(),
            save_as_default: Some("on".to_string()),
            ..ProfileForm::default()
        }
    }

    #[test]
    fn test_update_includes_address_when_ticked() {
        let update = form().to_update().unwrap();
        assert_eq!(update.shipping_address.unwrap().city, "Pune");
        assert_eq!(update.username.as_deref(), Some("ravi"));
    }

    #[test]
    fn test_unticked_box_sends_null_address() {
        let mut form = form();
        form.save_as_default = None;
        let update = form.to_update().unwrap();
        let json = serde_json::to_value(&update).unwrap();
        assert!(json["shippingAddress"].is_null());
    }

    #[test]
    fn test_invalid_pincode_refused_only_when_saving() {
        let mut form = form();
        form.pincode = "41100".to_string();
        assert!(form.to_update().is_err());
        form.save_as_default = None;
        assert!(form.to_update().is_ok());
    }

    #[test]
    fn test_prefill_from_user() {
        let user = CurrentUser {
            id: UserId::new("u1"),
            username: "ravi".to_string(),
            email: "ravi@example.com".to_string(),
            phone: String::new(),
            is_admin: false,
            shipping_address: None,
        };
        let form = ProfileForm::from_user(&user);
        assert!(!form.saves_default());
        assert_eq!(form.email, "ravi@example.com");
    }
}
