//! Checkout sequencing.
//!
//! Placing an order is a fixed series of backend calls:
//!
//! 1. Resolve the delivery address (saved default or the submitted form).
//! 2. Optionally save a manual address as the profile default. Failure here
//!    is logged and checkout carries on.
//! 3. Create the order. Failure stops checkout.
//! 4. For cash on delivery, stop. For gateway payment, open a gateway order
//!    for the order total in minor units and hand the widget options back.
//! 5. After the widget succeeds, submit its three fields plus the pending
//!    order for verification.
//!
//! There are no retries and no idempotency keys. A widget that is closed
//! without paying leaves the order as created.

use serde::Serialize;
use suraj_core::{AddressError, GatewayOrderId, OrderId, PaymentMethod, ShippingAddress};
use thiserror::Error;
use tracing::instrument;

use crate::backend::{
    BackendClient, BackendError, BearerToken, CreateOrder, GatewayCallback, Order,
    ProfileUpdate, User, VerifyPayment,
};
use crate::config::PaymentConfig;
use crate::models::{CurrentUser, PendingPayment};

/// Description shown inside the gateway widget.
const PAYMENT_DESCRIPTION: &str = "Payment for your order";

/// Errors that stop checkout.
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// The saved-address option was chosen but the profile has none.
    #[error("no saved shipping address")]
    NoSavedAddress,

    /// The manual address failed validation.
    #[error("invalid address: {0}")]
    InvalidAddress(#[from] AddressError),

    /// Gateway payment was chosen but no gateway key is configured.
    #[error("online payment is not available")]
    GatewayUnavailable,

    /// The backend refused to create the order.
    #[error("order creation failed: {0}")]
    OrderCreation(#[source] BackendError),

    /// The order exists but the gateway order could not be opened.
    #[error("payment initialization failed for order {order_id}: {source}")]
    PaymentInit {
        order_id: OrderId,
        #[source]
        source: BackendError,
    },

    /// The order total cannot be expressed in minor units.
    #[error("order {0} total is out of range")]
    AmountOutOfRange(OrderId),

    /// A verify callback arrived with no pending order in the session.
    #[error("no payment is pending")]
    NoPendingPayment,

    /// The gateway order in the callback is not the one opened for this session.
    #[error("gateway order mismatch")]
    GatewayOrderMismatch,

    /// The backend did not confirm the payment.
    #[error("payment verification failed")]
    VerificationFailed(#[source] Option<BackendError>),
}

impl CheckoutError {
    /// Message shown to the customer.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::NoSavedAddress => "You have no saved address. Please enter one.".to_string(),
            Self::InvalidAddress(e) => format!("Please check your address: {e}."),
            Self::GatewayUnavailable => "Online payment is not available right now.".to_string(),
            Self::OrderCreation(e) => e.user_message(),
            Self::PaymentInit { .. } | Self::AmountOutOfRange(_) => {
                "Failed to initialize payment".to_string()
            }
            Self::NoPendingPayment | Self::GatewayOrderMismatch | Self::VerificationFailed(_) => {
                "Payment verification failed".to_string()
            }
        }
    }
}

/// Where the order ships to.
#[derive(Debug, Clone)]
pub enum AddressChoice {
    /// The profile's saved default. Never re-saved.
    Saved,
    /// An address typed at checkout.
    Manual {
        address: ShippingAddress,
        save_as_default: bool,
    },
}

/// What the customer submitted at checkout.
#[derive(Debug, Clone)]
pub struct CheckoutRequest {
    pub address: AddressChoice,
    pub payment_method: PaymentMethod,
}

/// Options handed to the gateway's checkout widget.
///
/// Field names match the widget's option object.
#[derive(Debug, Clone, Serialize)]
pub struct GatewayOptions {
    pub key: String,
    pub amount: i64,
    pub currency: String,
    pub name: String,
    pub description: String,
    pub order_id: GatewayOrderId,
    pub prefill: GatewayPrefill,
    pub theme: GatewayTheme,
}

#[derive(Debug, Clone, Serialize)]
pub struct GatewayPrefill {
    pub name: String,
    pub email: String,
    pub contact: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct GatewayTheme {
    pub color: String,
}

/// Result of a successful checkout submission.
#[derive(Debug, Clone)]
pub enum CheckoutOutcome {
    /// Cash on delivery: the order is placed.
    Placed { order: Order },
    /// Gateway payment: the widget must be opened with `options`.
    AwaitingPayment {
        pending: PendingPayment,
        options: GatewayOptions,
    },
}

/// A checkout result plus the refreshed profile when step 2 saved an address.
#[derive(Debug, Clone)]
pub struct CheckoutResult {
    pub outcome: CheckoutOutcome,
    pub updated_user: Option<User>,
}

/// Runs the checkout sequence against the backend.
pub struct Checkout<'a> {
    client: &'a BackendClient,
    payment: &'a PaymentConfig,
}

impl<'a> Checkout<'a> {
    #[must_use]
    pub const fn new(client: &'a BackendClient, payment: &'a PaymentConfig) -> Self {
        Self { client, payment }
    }

    /// Run steps 1 through 4.
    ///
    /// # Errors
    ///
    /// Returns a [`CheckoutError`] for the step that stopped checkout.
    #[instrument(skip_all, fields(user_id = %user.id, payment_method = %request.payment_method))]
    pub async fn place_order(
        &self,
        token: &BearerToken,
        user: &CurrentUser,
        request: CheckoutRequest,
    ) -> Result<CheckoutResult, CheckoutError> {
        if request.payment_method == PaymentMethod::Razorpay && !self.payment.gateway_enabled() {
            return Err(CheckoutError::GatewayUnavailable);
        }

        // Step 1: address resolution
        let (address, save_as_default) = resolve_address(user, request.address)?;

        // Step 2: optional default-address persistence
        let updated_user = if save_as_default {
            self.save_default_address(token, &address).await
        } else {
            None
        };

        // Step 3: order creation
        let order = self
            .client
            .create_order(
                token,
                &CreateOrder {
                    address: &address,
                    payment_method: request.payment_method,
                },
            )
            .await
            .map_err(CheckoutError::OrderCreation)?;
        tracing::info!(order_id = %order.id, "Order created");

        // Step 4: branch on payment method
        let outcome = match request.payment_method {
            PaymentMethod::Cod => CheckoutOutcome::Placed { order },
            PaymentMethod::Razorpay => self.open_gateway_order(token, order, user).await?,
        };

        Ok(CheckoutResult {
            outcome,
            updated_user,
        })
    }

    /// Save `address` as the profile default. Errors are logged, not returned.
    async fn save_default_address(
        &self,
        token: &BearerToken,
        address: &ShippingAddress,
    ) -> Option<User> {
        match self
            .client
            .update_profile(token, &ProfileUpdate::default_address(address.clone()))
            .await
        {
            Ok(user) => {
                tracing::info!("Saved default shipping address");
                Some(user)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to save default address, continuing checkout");
                None
            }
        }
    }

    async fn open_gateway_order(
        &self,
        token: &BearerToken,
        order: Order,
        user: &CurrentUser,
    ) -> Result<CheckoutOutcome, CheckoutError> {
        let amount = order
            .total()
            .to_minor_units()
            .ok_or_else(|| CheckoutError::AmountOutOfRange(order.id.clone()))?;

        let gateway_order = self
            .client
            .create_payment(token, amount, self.payment.currency.code())
            .await
            .map_err(|source| CheckoutError::PaymentInit {
                order_id: order.id.clone(),
                source,
            })?;

        let options = GatewayOptions {
            key: self.payment.razorpay_key_id.clone().unwrap_or_default(),
            amount: gateway_order.amount,
            currency: gateway_order.currency,
            name: self.payment.store_name.clone(),
            description: PAYMENT_DESCRIPTION.to_string(),
            order_id: gateway_order.id,
            prefill: GatewayPrefill {
                name: user.username.clone(),
                email: user.email.clone(),
                contact: user.phone.clone(),
            },
            theme: GatewayTheme {
                color: self.payment.theme_color.clone(),
            },
        };

        tracing::info!(
            order_id = %order.id,
            gateway_order_id = %options.order_id,
            amount,
            "Gateway order opened"
        );

        Ok(CheckoutOutcome::AwaitingPayment {
            pending: PendingPayment {
                order,
                gateway_order_id: options.order_id.clone(),
            },
            options,
        })
    }

    /// Step 5: verify the widget callback for the pending order.
    ///
    /// Returns the id of the verified order.
    ///
    /// # Errors
    ///
    /// Returns `NoPendingPayment` without calling the backend when nothing is
    /// pending, and `VerificationFailed` when the backend does not confirm.
    #[instrument(skip_all, fields(gateway_order_id = %callback.razorpay_order_id))]
    pub async fn verify_payment(
        &self,
        token: &BearerToken,
        pending: Option<&PendingPayment>,
        callback: &GatewayCallback,
    ) -> Result<OrderId, CheckoutError> {
        let pending = pending.ok_or(CheckoutError::NoPendingPayment)?;
        if pending.gateway_order_id.as_str() != callback.razorpay_order_id {
            tracing::warn!(
                expected = %pending.gateway_order_id,
                "Callback gateway order does not match pending payment"
            );
            return Err(CheckoutError::GatewayOrderMismatch);
        }

        let request = VerifyPayment {
            callback,
            order_data: &pending.order,
        };

        match self.client.verify_payment(token, &request).await {
            Ok(response) if response.success => {
                let order_id = response
                    .order
                    .map_or_else(|| pending.order.id.clone(), |order| order.id);
                tracing::info!(order_id = %order_id, "Payment verified");
                Ok(order_id)
            }
            Ok(_) => {
                tracing::warn!(order_id = %pending.order.id, "Backend rejected payment signature");
                Err(CheckoutError::VerificationFailed(None))
            }
            Err(e) => {
                tracing::error!(order_id = %pending.order.id, error = %e, "Payment verification call failed");
                Err(CheckoutError::VerificationFailed(Some(e)))
            }
        }
    }
}

/// Step 1. Returns the address to ship to and whether to save it.
fn resolve_address(
    user: &CurrentUser,
    choice: AddressChoice,
) -> Result<(ShippingAddress, bool), CheckoutError> {
    match choice {
        AddressChoice::Saved => user
            .usable_address()
            .cloned()
            .map(|address| (address, false))
            .ok_or(CheckoutError::NoSavedAddress),
        AddressChoice::Manual {
            address,
            save_as_default,
        } => {
            let address = address.trimmed();
            address.validate()?;
            Ok((address, save_as_default))
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use suraj_core::UserId;

    use super::*;

    fn address() -> ShippingAddress {
        ShippingAddress {
            area: "12 MG Road".to_string(),
            landmark: String::new(),
            city: "Pune".to_string(),
            state: "Maharashtra".to_string(),
            pincode: "411001".to_string(),
            instructions: String::new(),
        }
    }

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
    fn test_saved_address_is_never_resaved() {
        let (resolved, save) = resolve_address(&user(Some(address())), AddressChoice::Saved).unwrap();
        assert_eq!(resolved, address());
        assert!(!save);
    }

    #[test]
    fn test_saved_address_missing() {
        let err = resolve_address(&user(None), AddressChoice::Saved).unwrap_err();
        assert!(matches!(err, CheckoutError::NoSavedAddress));

        let blank = ShippingAddress::default();
        let err = resolve_address(&user(Some(blank)), AddressChoice::Saved).unwrap_err();
        assert!(matches!(err, CheckoutError::NoSavedAddress));
    }

    #[test]
    fn test_manual_address_is_trimmed_and_validated() {
        let mut typed = address();
        typed.city = "  Pune ".to_string();
        let (resolved, save) = resolve_address(
            &user(None),
            AddressChoice::Manual {
                address: typed,
                save_as_default: true,
            },
        )
        .unwrap();
        assert_eq!(resolved.city, "Pune");
        assert!(save);

        let mut bad = address();
        bad.pincode = "12".to_string();
        let err = resolve_address(
            &user(None),
            AddressChoice::Manual {
                address: bad,
                save_as_default: false,
            },
        )
        .unwrap_err();
        assert!(matches!(
            err,
            CheckoutError::InvalidAddress(AddressError::InvalidPincode)
        ));
    }

    #[test]
    fn test_user_messages() {
        assert_eq!(
            CheckoutError::AmountOutOfRange(OrderId::new("o1")).user_message(),
            "Failed to initialize payment"
        );
        assert_eq!(
            CheckoutError::VerificationFailed(None).user_message(),
            "Payment verification failed"
        );
        let err = CheckoutError::OrderCreation(BackendError::Api {
            status: 400,
            message: "Cart is empty".to_string(),
        });
        assert_eq!(err.user_message(), "Cart is empty");
    }

    #[test]
    fn test_gateway_options_shape() {
        let options = GatewayOptions {
            key: "rzp_test_key".to_string(),
            amount: 49_999,
            currency: "INR".to_string(),
            name: "Suraj Electronics".to_string(),
            description: PAYMENT_DESCRIPTION.to_string(),
            order_id: GatewayOrderId::new("order_9A33XWu170gUtm"),
            prefill: GatewayPrefill {
                name: "ravi".to_string(),
                email: "ravi@example.com".to_string(),
                contact: String::new(),
            },
            theme: GatewayTheme {
                color: "#3B82F6".to_string(),
            },
        };
        let json = serde_json::to_value(&options).unwrap();
        assert_eq!(json["order_id"], "order_9A33XWu170gUtm");
        assert_eq!(json["theme"]["color"], "#3B82F6");
        assert_eq!(json["amount"], 49_999);
    }
}
