//! Authentication route handlers.
//!
//! Handles login, registration and logout against the backend's
//! `/auth/login` and `/auth/register` endpoints. The returned bearer token
//! is kept in the server-side session only.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use suraj_core::Email;
use tower_sessions::Session;
use tracing::instrument;

use crate::backend::{BearerToken, RegisterRequest};
use crate::error::{Result, set_sentry_user};
use crate::filters;
use crate::middleware::{OptionalAuth, clear_auth_session, set_auth_session};
use crate::models::{AuthSession, CurrentUser};
use crate::routes::MessageQuery;
use crate::state::AppState;

/// Shortest password accepted at registration.
pub const MIN_PASSWORD_LEN: usize = 6;

// =============================================================================
// Form Types
// =============================================================================

/// Login form data.
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

/// Registration form data.
#[derive(Debug, Default, Deserialize)]
pub struct RegisterForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub password_confirm: String,
}

impl RegisterForm {
    /// Check the form before calling the backend.
    ///
    /// # Errors
    ///
    /// Returns the message to show when a field is missing, the email is
    /// malformed, or the passwords are too short or differ.
    pub fn to_request(&self) -> std::result::Result<RegisterRequest, String> {
        let username = self.username.trim();
        let phone = self.phone.trim();
        if username.is_empty() || phone.is_empty() {
            return Err("Please fill in every field.".to_string());
        }
        let email = Email::parse(self.email.trim())
            .map_err(|e| format!("Please enter a valid email: {e}."))?;
        if self.password != self.password_confirm {
            return Err("Passwords do not match".to_string());
        }
        if self.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(format!(
                "Password must be at least {MIN_PASSWORD_LEN} characters long"
            ));
        }

        Ok(RegisterRequest {
            username: username.to_string(),
            email: email.into_inner(),
            phone: phone.to_string(),
            password: self.password.clone(),
        })
    }
}

// =============================================================================
// Templates
// =============================================================================

/// Login page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/login.html")]
pub struct LoginTemplate {
    pub user: Option<CurrentUser>,
    pub email: String,
    pub error: Option<String>,
    pub success: Option<String>,
}

/// Register page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/register.html")]
pub struct RegisterTemplate {
    pub user: Option<CurrentUser>,
    pub username: String,
    pub email: String,
    pub phone: String,
    pub error: Option<String>,
}

// =============================================================================
// Login Routes
// =============================================================================

/// Display the login page.
///
/// A `session_expired` code clears whatever is left of the old session;
/// otherwise a logged-in visitor is sent home.
pub async fn login_page(
    auth: OptionalAuth,
    session: Session,
    Query(query): Query<MessageQuery>,
) -> Result<Response> {
    if query.error.as_deref() == Some("session_expired") {
        clear_auth_session(&session).await?;
        set_sentry_user(None);
    } else if auth.0.is_some() {
        return Ok(Redirect::to("/").into_response());
    }

    Ok(LoginTemplate {
        user: None,
        email: String::new(),
        error: query.error_text(),
        success: query.success_text(),
    }
    .into_response())
}

/// Handle login form submission.
#[instrument(skip(state, session, form))]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<LoginForm>,
) -> Result<Response> {
    let email = form.email.trim();

    let response = match state.backend().login(email, &form.password).await {
        Ok(response) => response,
        Err(e) => {
            tracing::warn!(error = %e, "Login failed");
            let template = LoginTemplate {
                user: None,
                email: email.to_string(),
                error: Some(e.user_message()),
                success: None,
            };
            return Ok((StatusCode::UNAUTHORIZED, template).into_response());
        }
    };

    let auth = AuthSession {
        token: BearerToken::new(response.token),
        user: CurrentUser::from(response.user),
    };
    set_auth_session(&session, &auth).await?;
    set_sentry_user(Some(&auth.user));
    tracing::info!(user_id = %auth.user.id, is_admin = auth.user.is_admin, "User logged in");

    Ok(Redirect::to("/").into_response())
}

// =============================================================================
// Registration Routes
// =============================================================================

/// Display the registration page.
pub async fn register_page(auth: OptionalAuth) -> Response {
    if auth.0.is_some() {
        return Redirect::to("/").into_response();
    }
    RegisterTemplate {
        user: None,
        username: String::new(),
        email: String::new(),
        phone: String::new(),
        error: None,
    }
    .into_response()
}

/// Handle registration form submission.
///
/// Success sends the visitor to the login page; registration does not log in.
#[instrument(skip(state, form))]
pub async fn register(State(state): State<AppState>, Form(form): Form<RegisterForm>) -> Response {
    let refuse = |form: &RegisterForm, message: String| {
        let template = RegisterTemplate {
            user: None,
            username: form.username.clone(),
            email: form.email.clone(),
            phone: form.phone.clone(),
            error: Some(message),
        };
        (StatusCode::UNPROCESSABLE_ENTITY, template).into_response()
    };

    let request = match form.to_request() {
        Ok(request) => request,
        Err(message) => return refuse(&form, message),
    };

    match state.backend().register(&request).await {
        Ok(()) => {
            tracing::info!("User registered");
            Redirect::to("/auth/login?success=registered").into_response()
        }
        Err(e) => {
            tracing::warn!(error = %e, "Registration failed");
            refuse(&form, e.user_message())
        }
    }
}

// =============================================================================
// Logout
// =============================================================================

/// Handle logout: drop the whole session.
pub async fn logout(session: Session) -> Result<Response> {
    session.flush().await?;
    set_sentry_user(None);
    Ok(Redirect::to("/").into_response())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form() -> RegisterForm {
        RegisterForm {
            username: "ravi".to_string(),
            email: "ravi@example.com".to_string(),
            phone: "9876543210".to_string(),
            password: "secret1".to_string(),
            password_confirm: "secret1".to_string(),
        }
    }

    #[test]
    fn test_valid_registration() {
        let request = form().to_request();
        assert!(request.is_ok_and(|r| r.email == "ravi@example.com"));
    }

    #[test]
    fn test_passwords_must_match() {
        let mut form = form();
        form.password_confirm = "secret2".to_string();
        assert_eq!(form.to_request().err().as_deref(), Some("Passwords do not match"));
    }

    #[test]
    fn test_password_min_length() {
        let mut form = form();
        form.password = "abc".to_string();
        form.password_confirm = "abc".to_string();
        assert_eq!(
            form.to_request().err().as_deref(),
            Some("Password must be at least 6 characters long")
        );
    }

    #[test]
    fn test_email_must_be_valid() {
        let mut form = form();
        form.email = "ravi.example.com".to_string();
        assert!(form.to_request().is_err());
    }
}
