//! Wire types for the backend REST API.
//!
//! Records use the backend's `_id` and camelCase field names. Prices arrive as
//! plain JSON numbers and are sent back the same way.

use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use suraj_core::{
    CartItemId, ComplaintId, ComplaintStatus, GatewayOrderId, OrderId, OrderStatus,
    PaymentMethod, Price, ProductId, ShippingAddress, UserId,
};

/// Treat an explicit `null` the same as a missing field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}

// =============================================================================
// Users
// =============================================================================

/// A user account as returned by the auth endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(rename = "_id")]
    pub id: UserId,
    #[serde(default, deserialize_with = "null_as_default")]
    pub username: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub email: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub phone: String,
    /// Free-text address kept on the account by admins.
    #[serde(default, deserialize_with = "null_as_default")]
    pub address: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub is_admin: bool,
    #[serde(default)]
    pub shipping_address: Option<ShippingAddress>,
}

/// `POST /auth/login` response.
#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: User,
}

/// Endpoints that answer with a user either bare or wrapped in `{ user }`.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum UserEnvelope {
    Wrapped { user: User },
    Bare(User),
}

impl UserEnvelope {
    #[must_use]
    pub fn into_user(self) -> User {
        match self {
            Self::Wrapped { user } | Self::Bare(user) => user,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Clone, Serialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub phone: String,
    pub password: String,
}

/// `PUT /auth/profile` body.
///
/// `shipping_address` is always sent; `null` clears the saved default.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    pub shipping_address: Option<ShippingAddress>,
}

impl ProfileUpdate {
    /// Update that only replaces the default shipping address.
    #[must_use]
    pub fn default_address(address: ShippingAddress) -> Self {
        Self {
            shipping_address: Some(address),
            ..Self::default()
        }
    }
}

/// `PUT /auth/users/{id}` body used by admins.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminUserUpdate {
    pub username: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    pub is_admin: bool,
}

// =============================================================================
// Products
// =============================================================================

/// A catalog product.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    #[serde(rename = "_id")]
    pub id: ProductId,
    pub name: String,
    #[serde(serialize_with = "rust_decimal::serde::float::serialize")]
    pub price: Decimal,
    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub image: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub in_stock: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub category: String,
}

impl Product {
    #[must_use]
    pub const fn unit_price(&self) -> Price {
        Price::inr(self.price)
    }
}

/// `POST /products` and full `PUT /products/{id}` body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductInput {
    pub name: String,
    #[serde(serialize_with = "rust_decimal::serde::float::serialize")]
    pub price: Decimal,
    pub description: String,
    pub image: String,
    pub in_stock: bool,
    pub category: String,
}

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StockUpdate {
    pub in_stock: bool,
}

// =============================================================================
// Cart
// =============================================================================

/// The logged-in user's cart.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Cart {
    #[serde(default, deserialize_with = "null_as_default")]
    pub items: Vec<CartItem>,
}

/// One cart line. `product` is `None` when the product was deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartItem {
    #[serde(rename = "_id")]
    pub id: CartItemId,
    #[serde(default)]
    pub product: Option<Product>,
    pub quantity: u32,
}

impl Cart {
    /// Lines whose product still exists.
    pub fn lines(&self) -> impl Iterator<Item = (&CartItem, &Product)> {
        self.items
            .iter()
            .filter_map(|item| item.product.as_ref().map(|product| (item, product)))
    }

    /// The line holding `product_id`, if any.
    #[must_use]
    pub fn line_for(&self, product_id: &ProductId) -> Option<&CartItem> {
        self.lines()
            .find(|(_, product)| &product.id == product_id)
            .map(|(item, _)| item)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines().next().is_none()
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AddToCart<'a> {
    pub product_id: &'a ProductId,
    pub quantity: u32,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct QuantityUpdate {
    pub quantity: u32,
}

// =============================================================================
// Orders
// =============================================================================

/// A reference that the backend may or may not have populated.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum UserRef {
    Id(UserId),
    Populated(UserSummary),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserSummary {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<UserId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl UserRef {
    #[must_use]
    pub fn email(&self) -> Option<&str> {
        match self {
            Self::Id(_) => None,
            Self::Populated(summary) => summary.email.as_deref(),
        }
    }

    #[must_use]
    pub fn display_name(&self) -> Option<&str> {
        match self {
            Self::Id(_) => None,
            Self::Populated(summary) => summary.name.as_deref().or(summary.username.as_deref()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ProductRef {
    Id(ProductId),
    Populated(ProductSummary),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductSummary {
    #[serde(rename = "_id")]
    pub id: ProductId,
    #[serde(default)]
    pub name: Option<String>,
}

/// A line item snapshotted into an order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderItem {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product: Option<ProductRef>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub image: String,
    #[serde(
        default,
        deserialize_with = "null_as_default",
        serialize_with = "rust_decimal::serde::float::serialize"
    )]
    pub price: Decimal,
    pub quantity: u32,
}

impl OrderItem {
    #[must_use]
    pub fn line_total(&self) -> Price {
        Price::inr(self.price) * self.quantity
    }

    /// Product name used for order search: the populated product's name,
    /// falling back to the snapshotted name.
    #[must_use]
    pub fn product_name(&self) -> &str {
        match &self.product {
            Some(ProductRef::Populated(ProductSummary {
                name: Some(name), ..
            })) => name,
            _ => &self.name,
        }
    }
}

/// Order status as sent by the backend.
///
/// Values outside [`OrderStatus`] are kept verbatim so one odd record does not
/// fail a whole order list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StatusValue {
    Known(OrderStatus),
    Other(String),
}

impl StatusValue {
    #[must_use]
    pub const fn known(&self) -> Option<OrderStatus> {
        match self {
            Self::Known(status) => Some(*status),
            Self::Other(_) => None,
        }
    }

    /// Badge label: the known label, or the raw value with a leading capital.
    #[must_use]
    pub fn label(&self) -> String {
        match self {
            Self::Known(status) => status.label().to_string(),
            Self::Other(raw) => {
                let raw = raw.trim();
                let mut chars = raw.chars();
                chars.next().map_or_else(
                    || "Pending".to_string(),
                    |first| first.to_uppercase().chain(chars).collect(),
                )
            }
        }
    }
}

/// An order as stored by the backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    #[serde(rename = "_id")]
    pub id: OrderId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<UserRef>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub order_items: Vec<OrderItem>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub shipping_address: ShippingAddress,
    #[serde(
        default,
        deserialize_with = "null_as_default",
        serialize_with = "rust_decimal::serde::float::serialize"
    )]
    pub total_price: Decimal,
    #[serde(default)]
    pub status: Option<StatusValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_method: Option<PaymentMethod>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub is_paid: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl Order {
    #[must_use]
    pub const fn total(&self) -> Price {
        Price::inr(self.total_price)
    }

    #[must_use]
    pub fn item_count(&self) -> u32 {
        self.order_items.iter().map(|item| item.quantity).sum()
    }

    #[must_use]
    pub fn customer_email(&self) -> Option<&str> {
        self.user.as_ref().and_then(UserRef::email)
    }

    /// Last six characters of the id, as shown in order headings.
    #[must_use]
    pub fn short_id(&self) -> &str {
        let id = self.id.as_str();
        let start = id
            .char_indices()
            .rev()
            .nth(5)
            .map_or(0, |(index, _)| index);
        id.get(start..).unwrap_or(id)
    }

    /// Status when it is one the shop recognises.
    #[must_use]
    pub fn known_status(&self) -> Option<OrderStatus> {
        self.status.as_ref().and_then(StatusValue::known)
    }

    #[must_use]
    pub fn status_label(&self) -> String {
        self.status
            .as_ref()
            .map_or_else(|| "Pending".to_string(), StatusValue::label)
    }

    #[must_use]
    pub fn is_cancellable(&self) -> bool {
        self.known_status().is_some_and(|status| status.is_cancellable())
    }

    #[must_use]
    pub fn has_status(&self, status: &OrderStatus) -> bool {
        self.known_status().as_ref() == Some(status)
    }

    #[must_use]
    pub fn created_label(&self) -> String {
        format_timestamp(self.created_at)
    }

    /// Store-local calendar day the order was placed on.
    #[must_use]
    pub fn created_on(&self) -> Option<NaiveDate> {
        self.created_at.map(store_date)
    }
}

/// India Standard Time, UTC+05:30.
const IST_OFFSET_SECS: i32 = 5 * 3600 + 30 * 60;

/// Calendar day of `at` in store-local time.
#[must_use]
pub fn store_date(at: DateTime<Utc>) -> NaiveDate {
    FixedOffset::east_opt(IST_OFFSET_SECS)
        .map_or_else(|| at.date_naive(), |ist| at.with_timezone(&ist).date_naive())
}

/// Format a backend timestamp in store-local time, e.g. `18 October 2026, 08:30 PM`.
#[must_use]
pub fn format_timestamp(at: Option<DateTime<Utc>>) -> String {
    let Some(at) = at else {
        return "-".to_string();
    };
    FixedOffset::east_opt(IST_OFFSET_SECS).map_or_else(
        || at.format("%-d %B %Y, %I:%M %p UTC").to_string(),
        |ist| at.with_timezone(&ist).format("%-d %B %Y, %I:%M %p").to_string(),
    )
}

/// `POST /orders` body.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrder<'a> {
    pub address: &'a ShippingAddress,
    pub payment_method: PaymentMethod,
}

/// `{ status }` body for order and complaint updates.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct StatusUpdate<S> {
    pub status: S,
}

// =============================================================================
// Payments
// =============================================================================

/// `POST /orders/create-payment` body. `amount` is in minor units.
#[derive(Debug, Clone, Serialize)]
pub struct CreatePayment<'a> {
    pub amount: i64,
    pub currency: &'a str,
}

/// Gateway order created by the backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayOrder {
    pub id: GatewayOrderId,
    pub amount: i64,
    pub currency: String,
}

/// The three fields the gateway widget hands back on success.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayCallback {
    pub razorpay_payment_id: String,
    pub razorpay_order_id: String,
    pub razorpay_signature: String,
}

/// `POST /orders/verify-payment` body.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyPayment<'a> {
    #[serde(flatten)]
    pub callback: &'a GatewayCallback,
    pub order_data: &'a Order,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VerifyPaymentResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub order: Option<Order>,
}

// =============================================================================
// Complaints
// =============================================================================

/// A service ticket.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Complaint {
    #[serde(rename = "_id")]
    pub id: ComplaintId,
    #[serde(default)]
    pub user: Option<UserRef>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub issue: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub model: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub address: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub phone_number: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub status: ComplaintStatus,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl Complaint {
    #[must_use]
    pub fn created_label(&self) -> String {
        format_timestamp(self.created_at)
    }

    #[must_use]
    pub fn customer_email(&self) -> Option<&str> {
        self.user.as_ref().and_then(UserRef::email)
    }

    #[must_use]
    pub fn has_status(&self, status: &ComplaintStatus) -> bool {
        self.status == *status
    }
}

/// `POST /complaints` body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewComplaint {
    pub issue: String,
    pub model: String,
    pub address: String,
    pub phone_number: String,
}

// =============================================================================
// Errors
// =============================================================================

/// Error body shape. Login failures use `msg`, everything else `message`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiErrorBody {
    pub message: Option<String>,
    pub msg: Option<String>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::str::FromStr;

    use super::*;

    #[test]
    fn test_format_timestamp_in_store_time() {
        let at = DateTime::parse_from_rfc3339("2026-10-18T15:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        assert_eq!(format_timestamp(Some(at)), "18 October 2026, 08:30 PM");
        assert_eq!(format_timestamp(None), "-");
    }

    #[test]
    fn test_user_coerces_missing_admin_flag() {
        let user: User = serde_json::from_str(
            r#"{"_id":"u1","username":"ravi","email":"ravi@example.com","isAdmin":null}"#,
        )
        .unwrap();
        assert!(!user.is_admin);
        assert!(user.shipping_address.is_none());
    }

    #[test]
    fn test_user_envelope_accepts_both_shapes() {
        let wrapped: UserEnvelope =
            serde_json::from_str(r#"{"user":{"_id":"u1","email":"a@b.in"}}"#).unwrap();
        let bare: UserEnvelope = serde_json::from_str(r#"{"_id":"u2","email":"c@d.in"}"#).unwrap();
        assert_eq!(wrapped.into_user().id.as_str(), "u1");
        assert_eq!(bare.into_user().id.as_str(), "u2");
    }

    #[test]
    fn test_product_price_round_trips_as_number() {
        let product: Product = serde_json::from_str(
            r#"{"_id":"p1","name":"32 inch LED TV","price":12499.5,"inStock":true,"category":"TV"}"#,
        )
        .unwrap();
        assert_eq!(product.price, Decimal::from_str("12499.5").unwrap());

        let json = serde_json::to_value(&product).unwrap();
        assert_eq!(json["price"], serde_json::json!(12499.5));
        assert_eq!(json["_id"], "p1");
    }

    #[test]
    fn test_cart_skips_deleted_products() {
        let cart: Cart = serde_json::from_str(
            r#"{"items":[
                {"_id":"c1","product":null,"quantity":1},
                {"_id":"c2","product":{"_id":"p2","name":"Remote","price":250},"quantity":2}
            ]}"#,
        )
        .unwrap();
        assert_eq!(cart.lines().count(), 1);
        assert_eq!(
            cart.line_for(&ProductId::new("p2")).unwrap().id.as_str(),
            "c2"
        );
        assert!(!cart.is_empty());
    }

    #[test]
    fn test_order_accepts_populated_and_bare_refs() {
        let order: Order = serde_json::from_str(
            r#"{
                "_id":"6650aa00bb11cc22dd33ee44",
                "user":{"_id":"u1","email":"ravi@example.com"},
                "orderItems":[
                    {"_id":"i1","product":"p1","name":"Remote","image":"","price":250,"quantity":2},
                    {"_id":"i2","product":{"_id":"p2","name":"LED Panel"},"name":"Panel","price":1000,"quantity":1}
                ],
                "shippingAddress":{"area":"MG Road","city":"Pune","state":"Maharashtra","pincode":"411001"},
                "totalPrice":1500,
                "status":"processing",
                "createdAt":"2026-10-18T15:00:00.000Z"
            }"#,
        )
        .unwrap();

        assert_eq!(order.customer_email(), Some("ravi@example.com"));
        assert_eq!(order.item_count(), 3);
        assert_eq!(order.short_id(), "33ee44");
        assert_eq!(order.order_items[0].product_name(), "Remote");
        assert_eq!(order.order_items[1].product_name(), "LED Panel");
        assert!(order.is_cancellable());
        assert_eq!(order.total().display(), "₹1500.00");
    }

    #[test]
    fn test_order_missing_status_is_pending() {
        let order: Order = serde_json::from_str(r#"{"_id":"o1","user":"u1"}"#).unwrap();
        assert_eq!(order.status_label(), "Pending");
        assert!(!order.is_cancellable());
        assert!(order.customer_email().is_none());
        assert_eq!(order.short_id(), "o1");
    }

    #[test]
    fn test_unrecognised_status_is_kept_as_label() {
        let orders: Vec<Order> = serde_json::from_str(
            r#"[{"_id":"o1","status":"pending"},{"_id":"o2","status":"processing"}]"#,
        )
        .unwrap();

        assert_eq!(orders[0].status_label(), "Pending");
        assert!(orders[0].known_status().is_none());
        assert!(!orders[0].is_cancellable());
        assert!(!orders[0].has_status(&OrderStatus::Received));
        assert_eq!(orders[1].known_status(), Some(OrderStatus::Processing));

        let json = serde_json::to_value(&orders[0]).unwrap();
        assert_eq!(json["status"], "pending");
    }

    #[test]
    fn test_verify_payment_body_shape() {
        let order: Order = serde_json::from_str(r#"{"_id":"o1","totalPrice":499.99}"#).unwrap();
        let callback = GatewayCallback {
            razorpay_payment_id: "pay_1".to_string(),
            razorpay_order_id: "order_1".to_string(),
            razorpay_signature: "sig".to_string(),
        };
        let body = serde_json::to_value(VerifyPayment {
            callback: &callback,
            order_data: &order,
        })
        .unwrap();

        assert_eq!(body["razorpay_payment_id"], "pay_1");
        assert_eq!(body["razorpay_order_id"], "order_1");
        assert_eq!(body["razorpay_signature"], "sig");
        assert_eq!(body["orderData"]["_id"], "o1");
    }

    #[test]
    fn test_profile_update_sends_null_address() {
        let body = serde_json::to_value(ProfileUpdate {
            username: Some("ravi".to_string()),
            ..ProfileUpdate::default()
        })
        .unwrap();
        assert_eq!(body["username"], "ravi");
        assert!(body["shippingAddress"].is_null());
        assert!(body.get("email").is_none());
    }

    #[test]
    fn test_complaint_default_status() {
        let complaint: Complaint =
            serde_json::from_str(r#"{"_id":"c1","issue":"no sound","model":"32 inch Sony"}"#)
                .unwrap();
        assert_eq!(complaint.status, ComplaintStatus::Pending);
    }
}
