//! Authentication middleware and extractors.
//!
//! Provides extractors for requiring a logged-in user (or an admin) in route
//! handlers. The bearer token lives in the server-side session; an expired
//! token ends the session before any backend call is made.

use axum::{
    extract::FromRequestParts,
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Redirect, Response},
};
use chrono::Utc;
use tower_sessions::Session;

use crate::models::{AuthSession, CurrentUser, session_keys};

/// Extractor that requires a logged-in user.
///
/// If the user is not logged in, returns a redirect to the login page.
///
/// # Example
///
/// ```rust,ignore
/// async fn protected_handler(
///     RequireAuth(auth): RequireAuth,
/// ) -> impl IntoResponse {
///     format!("Hello, {}!", auth.user.username)
/// }
/// ```
pub struct RequireAuth(pub AuthSession);

/// Extractor that requires a logged-in admin.
///
/// Anonymous visitors go to the login page; logged-in customers go home.
pub struct RequireAdmin(pub AuthSession);

/// Error returned when authentication is required but the user is not logged in.
#[derive(Debug)]
pub enum AuthRejection {
    /// Redirect to login page (for HTML requests).
    RedirectToLogin,
    /// Redirect home (logged in, but not allowed here).
    RedirectHome,
    /// Unauthorized response (for API requests).
    Unauthorized,
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        match self {
            Self::RedirectToLogin => Redirect::to("/auth/login").into_response(),
            Self::RedirectHome => Redirect::to("/").into_response(),
            Self::Unauthorized => StatusCode::UNAUTHORIZED.into_response(),
        }
    }
}

/// Read the auth session, dropping it if the token has expired.
async fn load_auth(session: &Session) -> Option<AuthSession> {
    let auth: AuthSession = session.get(session_keys::AUTH).await.ok().flatten()?;

    if auth.token.is_expired(Utc::now()) {
        tracing::info!(user_id = %auth.user.id, "Session token expired");
        if let Err(e) = clear_auth_session(session).await {
            tracing::warn!(error = %e, "Failed to clear expired session");
        }
        return None;
    }

    Some(auth)
}

fn login_rejection(parts: &Parts) -> AuthRejection {
    if parts.uri.path().starts_with("/api/") {
        AuthRejection::Unauthorized
    } else {
        AuthRejection::RedirectToLogin
    }
}

impl<S> FromRequestParts<S> for RequireAuth
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        // Get the session from extensions (set by SessionManagerLayer)
        let session = parts
            .extensions
            .get::<Session>()
            .cloned()
            .ok_or(AuthRejection::Unauthorized)?;

        let auth = load_auth(&session)
            .await
            .ok_or_else(|| login_rejection(parts))?;

        Ok(Self(auth))
    }
}

impl<S> FromRequestParts<S> for RequireAdmin
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let RequireAuth(auth) = RequireAuth::from_request_parts(parts, state).await?;

        if !auth.user.is_admin {
            tracing::warn!(user_id = %auth.user.id, path = %parts.uri.path(), "Non-admin denied");
            return Err(AuthRejection::RedirectHome);
        }

        Ok(Self(auth))
    }
}

/// Extractor that optionally gets the current user.
///
/// Unlike `RequireAuth`, this does not reject the request if the user is not logged in.
pub struct OptionalAuth(pub Option<AuthSession>);

impl OptionalAuth {
    #[must_use]
    pub fn user(&self) -> Option<&CurrentUser> {
        self.0.as_ref().map(|auth| &auth.user)
    }
}

impl<S> FromRequestParts<S> for OptionalAuth
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let auth = match parts.extensions.get::<Session>().cloned() {
            Some(session) => load_auth(&session).await,
            None => None,
        };

        Ok(Self(auth))
    }
}

/// Store the logged-in user in the session.
///
/// Cycles the session id first so a pre-login id cannot be reused.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn set_auth_session(
    session: &Session,
    auth: &AuthSession,
) -> Result<(), tower_sessions::session::Error> {
    session.cycle_id().await?;
    session.insert(session_keys::AUTH, auth).await
}

/// Replace the session user after the backend returns a fresh record.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn update_session_user(
    session: &Session,
    auth: &AuthSession,
    user: CurrentUser,
) -> Result<(), tower_sessions::session::Error> {
    let updated = AuthSession {
        token: auth.token.clone(),
        user,
    };
    session.insert(session_keys::AUTH, &updated).await
}

/// Remove the logged-in user and any pending payment from the session.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn clear_auth_session(session: &Session) -> Result<(), tower_sessions::session::Error> {
    session.remove::<AuthSession>(session_keys::AUTH).await?;
    session
        .remove::<serde_json::Value>(session_keys::PENDING_PAYMENT)
        .await?;
    Ok(())
}
