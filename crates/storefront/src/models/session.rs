//! Session-related types.
//!
//! Types stored in the session for authentication and checkout state.

use serde::{Deserialize, Serialize};
use suraj_core::{GatewayOrderId, ShippingAddress, UserId};

use crate::backend::{BearerToken, Order, User};

/// Session-stored user identity, refreshed whenever the backend returns a
/// newer user record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentUser {
    pub id: UserId,
    pub username: String,
    pub email: String,
    pub phone: String,
    pub is_admin: bool,
    /// Default shipping address saved on the profile.
    pub shipping_address: Option<ShippingAddress>,
}

impl CurrentUser {
    /// The saved address, if it is complete enough to offer at checkout.
    #[must_use]
    pub fn usable_address(&self) -> Option<&ShippingAddress> {
        self.shipping_address
            .as_ref()
            .filter(|address| address.is_usable())
    }
}

impl From<User> for CurrentUser {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            phone: user.phone,
            is_admin: user.is_admin,
            shipping_address: user.shipping_address,
        }
    }
}

/// Everything the session holds for a logged-in user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthSession {
    pub token: BearerToken,
    pub user: CurrentUser,
}

/// An order created for gateway payment, awaiting the verify callback.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingPayment {
    pub order: Order,
    /// Gateway order opened for `order`; the callback must name the same one.
    pub gateway_order_id: GatewayOrderId,
}

/// Session keys.
pub mod keys {
    /// Key for the logged-in user's token and profile.
    pub const AUTH: &str = "auth";

    /// Key for the order awaiting payment verification.
    pub const PENDING_PAYMENT: &str = "pending_payment";
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_current_user_from_backend_user() {
        let user: User = serde_json::from_str(
            r#"{"_id":"u1","username":"ravi","email":"ravi@example.com","phone":"9876543210",
                "shippingAddress":{"area":"","city":"Pune"}}"#,
        )
        .unwrap();
        let current = CurrentUser::from(user);
        assert!(!current.is_admin);
        assert!(current.shipping_address.is_some());
        assert!(current.usable_address().is_none());
    }

    #[test]
    fn test_auth_session_round_trips_through_json() {
        let session = AuthSession {
            token: BearerToken::new("abc.def.ghi"),
            user: CurrentUser {
                id: UserId::new("u1"),
                username: "ravi".to_string(),
                email: "ravi@example.com".to_string(),
                phone: String::new(),
                is_admin: true,
                shipping_address: None,
            },
        };
        let json = serde_json::to_value(&session).unwrap();
        let back: AuthSession = serde_json::from_value(json).unwrap();
        assert_eq!(back.token.expose(), "abc.def.ghi");
        assert!(back.user.is_admin);
    }
}
