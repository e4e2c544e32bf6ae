//! Service complaint form.
//!
//! Customers describe a faulty TV by size, brand and symptom. The backend
//! stores the device as one `model` string, `"<inches> inch <company>"`.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tracing::instrument;

use crate::backend::{BackendError, NewComplaint};
use crate::error::{AppError, Result};
use crate::filters;
use crate::middleware::RequireAuth;
use crate::models::CurrentUser;
use crate::routes::MessageQuery;
use crate::state::AppState;

/// Symptoms a complaint can report.
pub const FAULT_OPTIONS: [&str; 5] = [
    "no indicator",
    "no display",
    "no sound",
    "restart",
    "led blinking",
];

/// Complaint form data.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ComplaintForm {
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub phone_number: String,
    #[serde(default)]
    pub inches: String,
    #[serde(default)]
    pub company: String,
    #[serde(default)]
    pub fault: String,
}

impl ComplaintForm {
    #[must_use]
    pub fn fault_is(&self, fault: &str) -> bool {
        self.fault == fault
    }

    /// Validate the form into the backend request.
    ///
    /// # Errors
    ///
    /// Returns the message to show when a field is missing or the screen
    /// size or fault is not acceptable.
    pub fn to_complaint(&self) -> std::result::Result<NewComplaint, &'static str> {
        let address = self.address.trim();
        let phone_number = self.phone_number.trim();
        let inches = self.inches.trim();
        let company = self.company.trim();
        let fault = self.fault.trim();

        if address.is_empty() || phone_number.is_empty() || inches.is_empty() || company.is_empty()
        {
            return Err("Please fill in every field.");
        }
        if !inches.parse::<u32>().is_ok_and(|size| size > 0) {
            return Err("Screen size must be a whole number of inches.");
        }
        if !FAULT_OPTIONS.contains(&fault) {
            return Err("Please choose a fault from the list.");
        }

        Ok(NewComplaint {
            issue: fault.to_string(),
            model: format!("{inches} inch {company}"),
            address: address.to_string(),
            phone_number: phone_number.to_string(),
        })
    }
}

/// Complaint page template.
#[derive(Template, WebTemplate)]
#[template(path = "complaints.html")]
pub struct ComplaintTemplate {
    pub user: Option<CurrentUser>,
    pub faults: &'static [&'static str],
    pub store_phone: Option<String>,
    pub form: ComplaintForm,
    pub error: Option<String>,
    pub success: Option<String>,
}

fn render(
    state: &AppState,
    user: CurrentUser,
    form: ComplaintForm,
    error: Option<String>,
    success: Option<String>,
) -> Response {
    let status = if error.is_some() {
        StatusCode::UNPROCESSABLE_ENTITY
    } else {
        StatusCode::OK
    };
    let template = ComplaintTemplate {
        user: Some(user),
        faults: &FAULT_OPTIONS,
        store_phone: state.config().store_phone.clone(),
        form,
        error,
        success,
    };
    (status, template).into_response()
}

/// Display the complaint form.
#[instrument(skip(state, auth), fields(user_id = %auth.user.id))]
pub async fn show(
    State(state): State<AppState>,
    RequireAuth(auth): RequireAuth,
    Query(query): Query<MessageQuery>,
) -> Response {
    let form = ComplaintForm {
        phone_number: auth.user.phone.clone(),
        fault: FAULT_OPTIONS[0].to_string(),
        ..ComplaintForm::default()
    };
    render(
        &state,
        auth.user,
        form,
        query.error_text(),
        query.success_text(),
    )
}

/// File a complaint.
#[instrument(skip(state, auth, form), fields(user_id = %auth.user.id))]
pub async fn submit(
    State(state): State<AppState>,
    RequireAuth(auth): RequireAuth,
    Form(form): Form<ComplaintForm>,
) -> Result<Response> {
    let complaint = match form.to_complaint() {
        Ok(complaint) => complaint,
        Err(message) => return Ok(render(&state, auth.user, form, Some(message.to_string()), None)),
    };

    match state
        .backend()
        .create_complaint(&auth.token, &complaint)
        .await
    {
        Ok(()) => {
            tracing::info!(issue = %complaint.issue, "Complaint submitted");
            Ok(Redirect::to("/complaints?success=submitted").into_response())
        }
        Err(e) if e.is_unauthorized() => Err(AppError::Backend(e)),
        Err(e @ BackendError::Api { status, .. }) if status < 500 => Ok(render(
            &state,
            auth.user,
            form,
            Some(format!("Submission failed: {}", e.user_message())),
            None,
        )),
        Err(e) => Err(AppError::Backend(e)),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn form() -> ComplaintForm {
        ComplaintForm {
            address: " 4 Station Road, Nagpur ".to_string(),
            phone_number: "9876543210".to_string(),
            inches: "43".to_string(),
            company: "Sony".to_string(),
            fault: "no sound".to_string(),
        }
    }

    #[test]
    fn test_model_combines_size_and_brand() {
        let complaint = form().to_complaint().unwrap();
        assert_eq!(complaint.model, "43 inch Sony");
        assert_eq!(complaint.issue, "no sound");
        assert_eq!(complaint.address, "4 Station Road, Nagpur");
    }

    #[test]
    fn test_missing_field_refused() {
        let mut form = form();
        form.company = "  ".to_string();
        assert!(form.to_complaint().is_err());
    }

    #[test]
    fn test_fault_must_be_listed() {
        let mut form = form();
        form.fault = "smoke".to_string();
        assert_eq!(
            form.to_complaint().unwrap_err(),
            "Please choose a fault from the list."
        );
    }

    #[test]
    fn test_inches_must_be_numeric() {
        let mut form = form();
        form.inches = "forty".to_string();
        assert!(form.to_complaint().is_err());
    }
}
