//! Checkout route handlers.
//!
//! `POST /checkout` runs the checkout sequence. Cash on delivery redirects
//! to the order list; gateway payment renders a page that opens the
//! Razorpay widget, whose success handler posts back to `/checkout/verify`.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use suraj_core::{INDIAN_STATES, PaymentMethod, ShippingAddress};
use tower_sessions::Session;
use tracing::instrument;

use crate::backend::{GatewayCallback, Order};
use crate::error::{AppError, Result, breadcrumb};
use crate::filters;
use crate::middleware::{RequireAuth, update_session_user};
use crate::models::{AuthSession, CurrentUser, PendingPayment, session_keys};
use crate::routes::cart::CartView;
use crate::routes::{MessageQuery, checkbox, with_query};
use crate::services::checkout::{
    AddressChoice, Checkout, CheckoutError, CheckoutOutcome, CheckoutRequest,
};
use crate::state::AppState;

// =============================================================================
// Form Types
// =============================================================================

/// Checkout form data.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CheckoutForm {
    /// `saved` or `manual`.
    #[serde(default)]
    pub address_choice: String,
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
    #[serde(default)]
    pub payment_method: PaymentMethod,
}

impl CheckoutForm {
    /// Initial form: the saved address is preselected when there is one.
    fn initial(user: &CurrentUser) -> Self {
        Self {
            address_choice: if user.usable_address().is_some() {
                "saved".to_string()
            } else {
                "manual".to_string()
            },
            ..Self::default()
        }
    }

    fn to_request(&self) -> CheckoutRequest {
        let address = if self.address_choice == "saved" {
            AddressChoice::Saved
        } else {
            AddressChoice::Manual {
                address: ShippingAddress {
                    area: self.area.clone(),
                    landmark: self.landmark.clone(),
                    city: self.city.clone(),
                    state: self.state.clone(),
                    pincode: self.pincode.clone(),
                    instructions: self.instructions.clone(),
                },
                save_as_default: checkbox(self.save_as_default.as_deref()),
            }
        };
        CheckoutRequest {
            address,
            payment_method: self.payment_method,
        }
    }

    #[must_use]
    pub fn saves_default(&self) -> bool {
        checkbox(self.save_as_default.as_deref())
    }

    /// Whether `name` is the selected state.
    #[must_use]
    pub fn state_is(&self, name: &str) -> bool {
        self.state == name
    }

    #[must_use]
    pub fn pays_online(&self) -> bool {
        self.payment_method == PaymentMethod::Razorpay
    }
}

// =============================================================================
// Templates
// =============================================================================

/// Checkout form page template.
#[derive(Template, WebTemplate)]
#[template(path = "checkout/form.html")]
pub struct CheckoutTemplate {
    pub user: Option<CurrentUser>,
    pub cart: CartView,
    pub saved_address: Option<ShippingAddress>,
    pub states: &'static [&'static str],
    pub gateway_enabled: bool,
    pub form: CheckoutForm,
    pub error: Option<String>,
}

/// Gateway hand-off page template.
#[derive(Template, WebTemplate)]
#[template(path = "checkout/pay.html")]
pub struct PaymentTemplate {
    pub user: Option<CurrentUser>,
    pub order: Order,
    /// Widget options as JSON, placed in a `data-` attribute.
    pub options_json: String,
}

// =============================================================================
// Handlers
// =============================================================================

async fn render_form(
    state: &AppState,
    auth: &AuthSession,
    form: CheckoutForm,
    error: Option<String>,
) -> Result<Response> {
    let cart = CartView::from(&state.backend().get_cart(&auth.token).await?);
    if cart.is_empty() {
        return Ok(Redirect::to("/cart?error=empty_cart").into_response());
    }

    let status = if error.is_some() {
        StatusCode::UNPROCESSABLE_ENTITY
    } else {
        StatusCode::OK
    };

    let template = CheckoutTemplate {
        user: Some(auth.user.clone()),
        cart,
        saved_address: auth.user.usable_address().cloned(),
        states: &INDIAN_STATES,
        gateway_enabled: state.payment().gateway_enabled(),
        form,
        error,
    };
    Ok((status, template).into_response())
}

/// Display the checkout form.
#[instrument(skip(state, auth), fields(user_id = %auth.user.id))]
pub async fn show(
    State(state): State<AppState>,
    RequireAuth(auth): RequireAuth,
    Query(query): Query<MessageQuery>,
) -> Result<Response> {
    let form = CheckoutForm::initial(&auth.user);
    render_form(&state, &auth, form, query.error_text()).await
}

/// Place the order.
#[instrument(skip(state, auth, session, form), fields(user_id = %auth.user.id, payment_method = %form.payment_method))]
pub async fn submit(
    State(state): State<AppState>,
    RequireAuth(auth): RequireAuth,
    session: Session,
    Form(form): Form<CheckoutForm>,
) -> Result<Response> {
    let checkout = Checkout::new(state.backend(), state.payment());

    let result = match checkout
        .place_order(&auth.token, &auth.user, form.to_request())
        .await
    {
        Ok(result) => result,
        Err(CheckoutError::OrderCreation(e)) if e.is_unauthorized() => {
            return Err(AppError::Backend(e));
        }
        Err(e @ (CheckoutError::PaymentInit { .. } | CheckoutError::AmountOutOfRange(_))) => {
            // The order exists; the customer can see it on the orders page.
            tracing::error!(error = %e, "Payment initialization failed");
            return Ok(Redirect::to("/orders?error=payment_init").into_response());
        }
        Err(e) => {
            tracing::info!(error = %e, "Checkout refused");
            return render_form(&state, &auth, form, Some(e.user_message())).await;
        }
    };

    if let Some(user) = result.updated_user {
        update_session_user(&session, &auth, CurrentUser::from(user)).await?;
    }

    match result.outcome {
        CheckoutOutcome::Placed { order } => {
            breadcrumb("checkout", "Order placed", ("order_id", order.id.as_str()));
            Ok(Redirect::to(&with_query("/orders", "placed", order.id.as_str())).into_response())
        }
        CheckoutOutcome::AwaitingPayment { pending, options } => {
            let options_json = serde_json::to_string(&options)
                .map_err(|e| AppError::Internal(format!("gateway options: {e}")))?;
            session
                .insert(session_keys::PENDING_PAYMENT, &pending)
                .await?;
            breadcrumb(
                "checkout",
                "Gateway payment opened",
                ("order_id", pending.order.id.as_str()),
            );

            Ok(PaymentTemplate {
                user: Some(auth.user),
                order: pending.order,
                options_json,
            }
            .into_response())
        }
    }
}

/// Gateway success callback: verify the payment for the pending order.
#[instrument(skip(state, auth, session, callback), fields(user_id = %auth.user.id))]
pub async fn verify(
    State(state): State<AppState>,
    RequireAuth(auth): RequireAuth,
    session: Session,
    Form(callback): Form<GatewayCallback>,
) -> Result<Response> {
    let pending: Option<PendingPayment> = session.get(session_keys::PENDING_PAYMENT).await?;
    let checkout = Checkout::new(state.backend(), state.payment());

    match checkout
        .verify_payment(&auth.token, pending.as_ref(), &callback)
        .await
    {
        Ok(order_id) => {
            session
                .remove::<PendingPayment>(session_keys::PENDING_PAYMENT)
                .await?;
            breadcrumb("checkout", "Payment verified", ("order_id", order_id.as_str()));
            Ok(Redirect::to(&with_query("/orders", "verified", order_id.as_str())).into_response())
        }
        Err(e) => {
            tracing::warn!(error = %e, "Payment verification failed");
            Ok(Redirect::to("/cart?error=payment_verification_failed").into_response())
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use suraj_core::UserId;

    use super::*;

    fn user(saved: Option<ShippingAddress>) -> CurrentUser {
        CurrentUser {
            id: UserId::new("u1"),
            username: "ravi".to_string(),
            email: "ravi@example.com".to_string(),
            phone: "9876543210".to_string(),
            is_admin: false,
            shipping_address: saved,
        }
    }

    #[test]
    fn test_initial_choice_follows_saved_address() {
        assert_eq!(CheckoutForm::initial(&user(None)).address_choice, "manual");
        let saved = ShippingAddress {
            area: "12 MG Road".to_string(),
            ..ShippingAddress::default()
        };
        assert_eq!(CheckoutForm::initial(&user(Some(saved))).address_choice, "saved");
    }

    #[test]
    fn test_form_to_request() {
        let form: CheckoutForm = serde_json::from_value(serde_json::json!({
            "address_choice": "manual",
            "area": "12 MG Road",
            "city": "Pune",
            "state": "Maharashtra",
            "pincode": "411001",
            "save_as_default": "on",
            "payment_method": "razorpay",
        }))
        .unwrap();

        let request = form.to_request();
        assert_eq!(request.payment_method, PaymentMethod::Razorpay);
        match request.address {
            AddressChoice::Manual {
                address,
                save_as_default,
            } => {
                assert!(save_as_default);
                assert_eq!(address.pincode, "411001");
            }
            AddressChoice::Saved => panic!("expected manual address"),
        }
    }

    #[test]
    fn test_saved_choice_ignores_form_fields() {
        let form = CheckoutForm {
            address_choice: "saved".to_string(),
            area: "ignored".to_string(),
            ..CheckoutForm::default()
        };
        assert!(matches!(form.to_request().address, AddressChoice::Saved));
        assert_eq!(form.to_request().payment_method, PaymentMethod::Cod);
    }
}
