//! Integration test support for the Suraj Electronics storefront.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p suraj-integration-tests
//! ```
//!
//! Nothing external is needed: [`FakeBackend`] is an in-memory stand-in for
//! the backend REST API, and [`TestApp`] serves the real storefront router
//! against it on an ephemeral port.
//!
//! # Test Categories
//!
//! - `backend_client` - `BackendClient` against the fake API
//! - `checkout` - Checkout sequencing end to end
//! - `storefront_routes` - Page, auth, cart and admin flows

#![allow(clippy::missing_panics_doc)]

use std::collections::HashMap;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use axum::{
    Json, Router,
    extract::{Path, Request, State},
    http::{HeaderMap, StatusCode, header::AUTHORIZATION},
    middleware::Next,
    response::{IntoResponse, Response},
    routing::{get, post, put},
};
use serde_json::{Value, json};
use suraj_storefront::config::{
    BackendConfig, LogFormat, PaymentConfig, SentryConfig, StorefrontConfig,
};
use suraj_storefront::state::AppState;
use tokio::net::TcpListener;
use url::Url;

/// Seeded customer account.
pub const CUSTOMER_ID: &str = "u1";
pub const CUSTOMER_EMAIL: &str = "ravi@example.com";
pub const CUSTOMER_PASSWORD: &str = "secret1";

/// Seeded admin account.
pub const ADMIN_ID: &str = "u2";
pub const ADMIN_EMAIL: &str = "admin@example.com";
pub const ADMIN_PASSWORD: &str = "admin123";

/// Signature the fake gateway accepts at verification.
pub const VALID_SIGNATURE: &str = "valid-signature";

/// Timestamp stamped on every record the fake backend creates.
const CREATED_AT: &str = "2026-10-18T10:00:00Z";

type ApiResult = Result<Response, Response>;

// =============================================================================
// Fake Backend
// =============================================================================

#[derive(Debug, Clone)]
struct FakeUser {
    id: String,
    username: String,
    email: String,
    phone: String,
    password: String,
    address: String,
    is_admin: bool,
    shipping_address: Option<Value>,
}

impl FakeUser {
    fn to_json(&self) -> Value {
        json!({
            "_id": self.id,
            "username": self.username,
            "email": self.email,
            "phone": self.phone,
            "address": self.address,
            "isAdmin": self.is_admin,
            "shippingAddress": self.shipping_address,
        })
    }

    fn token(&self) -> String {
        format!("token-{}", self.id)
    }
}

#[derive(Debug, Clone)]
struct CartLine {
    id: String,
    product_id: String,
    quantity: u64,
}

#[derive(Debug, Default)]
struct FakeState {
    users: Vec<FakeUser>,
    products: Vec<Value>,
    carts: HashMap<String, Vec<CartLine>>,
    orders: Vec<Value>,
    complaints: Vec<Value>,
    calls: Vec<String>,
    next_id: u64,
    fail_payment_init: bool,
    tokens_revoked: bool,
}

impl FakeState {
    fn next_id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{prefix}{}", self.next_id)
    }

    fn product(&self, id: &str) -> Option<&Value> {
        self.products.iter().find(|p| p["_id"] == id)
    }
}

/// In-memory implementation of the backend REST API.
///
/// Records every call as `"METHOD /path"` (without the `/api` prefix) so
/// tests can assert on what the storefront did and did not send.
#[derive(Clone)]
pub struct FakeBackend {
    state: Arc<Mutex<FakeState>>,
}

impl Default for FakeBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeBackend {
    /// A backend seeded with one customer, one admin and three products.
    #[must_use]
    pub fn new() -> Self {
        let state = FakeState {
            users: vec![
                FakeUser {
                    id: CUSTOMER_ID.to_string(),
                    username: "ravi".to_string(),
                    email: CUSTOMER_EMAIL.to_string(),
                    phone: "9876543210".to_string(),
                    password: CUSTOMER_PASSWORD.to_string(),
                    address: String::new(),
                    is_admin: false,
                    shipping_address: None,
                },
                FakeUser {
                    id: ADMIN_ID.to_string(),
                    username: "suraj".to_string(),
                    email: ADMIN_EMAIL.to_string(),
                    phone: "9822012345".to_string(),
                    password: ADMIN_PASSWORD.to_string(),
                    address: "Main Road, Nagpur".to_string(),
                    is_admin: true,
                    shipping_address: None,
                },
            ],
            products: vec![
                product_json("p1", "LED TV 43", 24999.0, "Television", true),
                product_json("p2", "Soundbar 120W", 7999.0, "Audio", true),
                product_json("p3", "Smart TV 55", 54999.0, "Television", false),
            ],
            next_id: 100,
            ..FakeState::default()
        };
        Self {
            state: Arc::new(Mutex::new(state)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Serve the fake API on an ephemeral port. Returns the API base URL.
    pub async fn spawn(&self) -> String {
        let app = Router::new()
            .nest("/api", api_routes())
            .layer(axum::middleware::from_fn_with_state(self.clone(), record_call))
            .with_state(self.clone());

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind fake backend");
        let addr = listener.local_addr().expect("Failed to read fake backend address");
        tokio::spawn(async move {
            axum::serve(listener, app).await.ok();
        });

        format!("http://{addr}/api")
    }

    /// Every call received so far, e.g. `"POST /orders"`.
    #[must_use]
    pub fn calls(&self) -> Vec<String> {
        self.lock().calls.clone()
    }

    /// Whether `call` (e.g. `"PUT /auth/profile"`) was received.
    #[must_use]
    pub fn called(&self, call: &str) -> bool {
        self.lock().calls.iter().any(|c| c == call)
    }

    /// Forget recorded calls.
    pub fn clear_calls(&self) {
        self.lock().calls.clear();
    }

    /// Make `POST /orders/create-payment` fail with a 500.
    pub fn fail_payment_init(&self) {
        self.lock().fail_payment_init = true;
    }

    /// Reject every bearer token from now on.
    pub fn revoke_tokens(&self) {
        self.lock().tokens_revoked = true;
    }

    /// Drop the admin role from a user without touching their token.
    pub fn demote(&self, id: &str) {
        if let Some(user) = self.lock().users.iter_mut().find(|u| u.id == id) {
            user.is_admin = false;
        }
    }

    /// All stored orders, oldest first.
    #[must_use]
    pub fn orders(&self) -> Vec<Value> {
        self.lock().orders.clone()
    }

    /// Store an order as-is.
    pub fn insert_order(&self, order: Value) {
        self.lock().orders.push(order);
    }

    /// All stored complaints.
    #[must_use]
    pub fn complaints(&self) -> Vec<Value> {
        self.lock().complaints.clone()
    }

    /// All products, as the API returns them.
    #[must_use]
    pub fn products(&self) -> Vec<Value> {
        self.lock().products.clone()
    }

    /// Quantity of `product_id` in a user's cart.
    #[must_use]
    pub fn cart_quantity(&self, user_id: &str, product_id: &str) -> Option<u64> {
        self.lock()
            .carts
            .get(user_id)?
            .iter()
            .find(|line| line.product_id == product_id)
            .map(|line| line.quantity)
    }

    /// Put a line straight into a user's cart. Returns the cart item id.
    pub fn put_in_cart(&self, user_id: &str, product_id: &str, quantity: u64) -> String {
        let mut state = self.lock();
        let id = state.next_id("c");
        state.carts.entry(user_id.to_string()).or_default().push(CartLine {
            id: id.clone(),
            product_id: product_id.to_string(),
            quantity,
        });
        id
    }

    /// A user record, as the API returns it.
    #[must_use]
    pub fn user(&self, id: &str) -> Option<Value> {
        self.lock()
            .users
            .iter()
            .find(|u| u.id == id)
            .map(FakeUser::to_json)
    }

    /// Save a default shipping address on a user.
    pub fn set_shipping_address(&self, user_id: &str, address: Value) {
        if let Some(user) = self.lock().users.iter_mut().find(|u| u.id == user_id) {
            user.shipping_address = Some(address);
        }
    }

    fn authenticate(&self, headers: &HeaderMap) -> Result<FakeUser, Response> {
        let state = self.lock();
        let token = headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "));
        match token {
            Some(token) if !state.tokens_revoked => state
                .users
                .iter()
                .find(|u| u.token() == token)
                .cloned()
                .ok_or_else(|| error(StatusCode::UNAUTHORIZED, "Not authorized, token failed")),
            _ => Err(error(StatusCode::UNAUTHORIZED, "Not authorized, token failed")),
        }
    }

    fn authenticate_admin(&self, headers: &HeaderMap) -> Result<FakeUser, Response> {
        let user = self.authenticate(headers)?;
        if user.is_admin {
            Ok(user)
        } else {
            Err(error(StatusCode::FORBIDDEN, "Not authorized as an admin"))
        }
    }
}

fn product_json(id: &str, name: &str, price: f64, category: &str, in_stock: bool) -> Value {
    json!({
        "_id": id,
        "name": name,
        "price": price,
        "description": format!("{name} from Suraj Electronics"),
        "image": format!("https://cdn.example.in/{id}.jpg"),
        "inStock": in_stock,
        "category": category,
    })
}

fn error(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "message": message }))).into_response()
}

fn ok(body: Value) -> ApiResult {
    Ok(Json(body).into_response())
}

async fn record_call(State(backend): State<FakeBackend>, request: Request, next: Next) -> Response {
    let path = request
        .uri()
        .path()
        .trim_start_matches("/api")
        .to_string();
    backend
        .lock()
        .calls
        .push(format!("{} {path}", request.method()));
    next.run(request).await
}

fn api_routes() -> Router<FakeBackend> {
    Router::new()
        // Auth
        .route("/auth/login", post(login))
        .route("/auth/register", post(register))
        .route("/auth/me", get(me))
        .route("/auth/profile", put(update_profile))
        .route("/auth/users", get(list_users))
        .route(
            "/auth/users/{id}",
            get(get_user).put(update_user).delete(delete_user),
        )
        // Products
        .route("/products", get(list_products).post(create_product))
        .route(
            "/products/{id}",
            get(get_product).put(update_product).delete(delete_product),
        )
        // Cart
        .route("/cart", get(get_cart).post(add_to_cart).delete(clear_cart))
        .route("/cart/{id}", put(update_cart_line).delete(remove_cart_line))
        // Orders
        .route("/orders", get(all_orders).post(create_order))
        .route("/orders/my", get(my_orders))
        .route("/orders/create-payment", post(create_payment))
        .route("/orders/verify-payment", post(verify_payment))
        .route("/orders/{id}", put(update_order_status))
        // Complaints
        .route("/complaints", get(list_complaints).post(create_complaint))
        .route("/complaints/{id}", put(update_complaint_status))
}

// =============================================================================
// Auth Endpoints
// =============================================================================

async fn login(State(backend): State<FakeBackend>, Json(body): Json<Value>) -> ApiResult {
    let state = backend.lock();
    let user = state
        .users
        .iter()
        .find(|u| body["email"] == u.email.as_str() && body["password"] == u.password.as_str())
        .ok_or_else(|| error(StatusCode::UNAUTHORIZED, "Invalid email or password"))?;
    ok(json!({ "token": user.token(), "user": user.to_json() }))
}

async fn register(State(backend): State<FakeBackend>, Json(body): Json<Value>) -> ApiResult {
    let mut state = backend.lock();
    let email = body["email"].as_str().unwrap_or_default().to_string();
    if state.users.iter().any(|u| u.email == email) {
        return Err(error(StatusCode::BAD_REQUEST, "User already exists"));
    }
    let id = state.next_id("u");
    state.users.push(FakeUser {
        id,
        username: body["username"].as_str().unwrap_or_default().to_string(),
        email,
        phone: body["phone"].as_str().unwrap_or_default().to_string(),
        password: body["password"].as_str().unwrap_or_default().to_string(),
        address: String::new(),
        is_admin: false,
        shipping_address: None,
    });
    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "User registered successfully" })),
    )
        .into_response())
}

async fn me(State(backend): State<FakeBackend>, headers: HeaderMap) -> ApiResult {
    let user = backend.authenticate(&headers)?;
    ok(json!({ "user": user.to_json() }))
}

async fn update_profile(
    State(backend): State<FakeBackend>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> ApiResult {
    let current = backend.authenticate(&headers)?;
    let mut state = backend.lock();
    let user = state
        .users
        .iter_mut()
        .find(|u| u.id == current.id)
        .ok_or_else(|| error(StatusCode::NOT_FOUND, "User not found"))?;
    if let Some(username) = body["username"].as_str() {
        user.username = username.to_string();
    }
    if let Some(email) = body["email"].as_str() {
        user.email = email.to_string();
    }
    if let Some(phone) = body["phone"].as_str() {
        user.phone = phone.to_string();
    }
    if let Some(address) = body.get("shippingAddress") {
        user.shipping_address = (!address.is_null()).then(|| address.clone());
    }
    ok(json!({ "user": user.to_json() }))
}

async fn list_users(State(backend): State<FakeBackend>, headers: HeaderMap) -> ApiResult {
    backend.authenticate_admin(&headers)?;
    let users: Vec<Value> = backend.lock().users.iter().map(FakeUser::to_json).collect();
    ok(Value::Array(users))
}

async fn get_user(
    State(backend): State<FakeBackend>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> ApiResult {
    backend.authenticate_admin(&headers)?;
    backend
        .user(&id)
        .map_or_else(|| Err(error(StatusCode::NOT_FOUND, "User not found")), ok)
}

async fn update_user(
    State(backend): State<FakeBackend>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> ApiResult {
    backend.authenticate_admin(&headers)?;
    let mut state = backend.lock();
    let user = state
        .users
        .iter_mut()
        .find(|u| u.id == id)
        .ok_or_else(|| error(StatusCode::NOT_FOUND, "User not found"))?;
    user.username = body["username"].as_str().unwrap_or_default().to_string();
    user.email = body["email"].as_str().unwrap_or_default().to_string();
    user.phone = body["phone"].as_str().unwrap_or_default().to_string();
    user.address = body["address"].as_str().unwrap_or_default().to_string();
    user.is_admin = body["isAdmin"].as_bool().unwrap_or_default();
    ok(user.to_json())
}

async fn delete_user(
    State(backend): State<FakeBackend>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> ApiResult {
    backend.authenticate_admin(&headers)?;
    let mut state = backend.lock();
    match state.users.iter().find(|u| u.id == id) {
        None => return Err(error(StatusCode::NOT_FOUND, "User not found")),
        Some(user) if user.is_admin => {
            return Err(error(StatusCode::BAD_REQUEST, "Cannot delete admin user"));
        }
        Some(_) => {}
    }
    state.users.retain(|u| u.id != id);
    ok(json!({ "message": "User removed" }))
}

// =============================================================================
// Product Endpoints
// =============================================================================

async fn list_products(State(backend): State<FakeBackend>) -> ApiResult {
    ok(Value::Array(backend.lock().products.clone()))
}

async fn get_product(State(backend): State<FakeBackend>, Path(id): Path<String>) -> ApiResult {
    backend
        .lock()
        .product(&id)
        .cloned()
        .map_or_else(|| Err(error(StatusCode::NOT_FOUND, "Product not found")), ok)
}

async fn create_product(
    State(backend): State<FakeBackend>,
    headers: HeaderMap,
    Json(mut body): Json<Value>,
) -> ApiResult {
    backend.authenticate_admin(&headers)?;
    let mut state = backend.lock();
    let id = state.next_id("p");
    body["_id"] = json!(id);
    state.products.push(body.clone());
    Ok((StatusCode::CREATED, Json(body)).into_response())
}

async fn update_product(
    State(backend): State<FakeBackend>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> ApiResult {
    backend.authenticate_admin(&headers)?;
    let mut state = backend.lock();
    let product = state
        .products
        .iter_mut()
        .find(|p| p["_id"] == id.as_str())
        .ok_or_else(|| error(StatusCode::NOT_FOUND, "Product not found"))?;
    if let (Some(product), Some(changes)) = (product.as_object_mut(), body.as_object()) {
        for (key, value) in changes {
            product.insert(key.clone(), value.clone());
        }
    }
    ok(product.clone())
}

async fn delete_product(
    State(backend): State<FakeBackend>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> ApiResult {
    backend.authenticate_admin(&headers)?;
    let mut state = backend.lock();
    let before = state.products.len();
    state.products.retain(|p| p["_id"] != id.as_str());
    if state.products.len() == before {
        return Err(error(StatusCode::NOT_FOUND, "Product not found"));
    }
    ok(json!({ "message": "Product removed" }))
}

// =============================================================================
// Cart Endpoints
// =============================================================================

fn cart_json(state: &FakeState, user_id: &str) -> Value {
    let items: Vec<Value> = state
        .carts
        .get(user_id)
        .map(|lines| {
            lines
                .iter()
                .map(|line| {
                    json!({
                        "_id": line.id,
                        "product": state.product(&line.product_id),
                        "quantity": line.quantity,
                    })
                })
                .collect()
        })
        .unwrap_or_default();
    json!({ "user": user_id, "items": items })
}

async fn get_cart(State(backend): State<FakeBackend>, headers: HeaderMap) -> ApiResult {
    let user = backend.authenticate(&headers)?;
    let state = backend.lock();
    if !state.carts.contains_key(&user.id) {
        return Err(error(StatusCode::NOT_FOUND, "Cart not found"));
    }
    ok(cart_json(&state, &user.id))
}

async fn add_to_cart(
    State(backend): State<FakeBackend>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> ApiResult {
    let user = backend.authenticate(&headers)?;
    let product_id = body["productId"].as_str().unwrap_or_default().to_string();
    let quantity = body["quantity"].as_u64().unwrap_or(1);

    let mut state = backend.lock();
    match state.product(&product_id) {
        None => return Err(error(StatusCode::NOT_FOUND, "Product not found")),
        Some(product) if product["inStock"] != true => {
            return Err(error(StatusCode::BAD_REQUEST, "Product out of stock"));
        }
        Some(_) => {}
    }
    let id = state.next_id("c");
    let lines = state.carts.entry(user.id.clone()).or_default();
    if let Some(line) = lines.iter_mut().find(|l| l.product_id == product_id) {
        line.quantity += quantity;
    } else {
        lines.push(CartLine {
            id,
            product_id,
            quantity,
        });
    }
    ok(cart_json(&state, &user.id))
}

async fn update_cart_line(
    State(backend): State<FakeBackend>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> ApiResult {
    let user = backend.authenticate(&headers)?;
    let mut state = backend.lock();
    let line = state
        .carts
        .get_mut(&user.id)
        .and_then(|lines| lines.iter_mut().find(|l| l.id == id))
        .ok_or_else(|| error(StatusCode::NOT_FOUND, "Item not found in cart"))?;
    line.quantity = body["quantity"].as_u64().unwrap_or(line.quantity);
    ok(cart_json(&state, &user.id))
}

async fn remove_cart_line(
    State(backend): State<FakeBackend>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> ApiResult {
    let user = backend.authenticate(&headers)?;
    let mut state = backend.lock();
    if let Some(lines) = state.carts.get_mut(&user.id) {
        lines.retain(|l| l.id != id);
    }
    ok(cart_json(&state, &user.id))
}

async fn clear_cart(State(backend): State<FakeBackend>, headers: HeaderMap) -> ApiResult {
    let user = backend.authenticate(&headers)?;
    backend.lock().carts.remove(&user.id);
    ok(json!({ "message": "Cart cleared" }))
}

// =============================================================================
// Order Endpoints
// =============================================================================

async fn create_order(
    State(backend): State<FakeBackend>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> ApiResult {
    let user = backend.authenticate(&headers)?;
    if body["address"].is_null() {
        return Err(error(StatusCode::BAD_REQUEST, "Shipping address is required"));
    }

    let mut state = backend.lock();
    let lines = state.carts.get(&user.id).cloned().unwrap_or_default();
    let items: Vec<Value> = lines
        .iter()
        .filter_map(|line| {
            let product = state.product(&line.product_id)?;
            Some(json!({
                "product": { "_id": product["_id"], "name": product["name"] },
                "name": product["name"],
                "image": product["image"],
                "price": product["price"],
                "quantity": line.quantity,
            }))
        })
        .collect();
    if items.is_empty() {
        return Err(error(StatusCode::BAD_REQUEST, "Cart is empty"));
    }
    #[allow(clippy::cast_precision_loss)]
    let total: f64 = items
        .iter()
        .map(|item| {
            item["price"].as_f64().unwrap_or_default() * item["quantity"].as_u64().unwrap_or(0) as f64
        })
        .sum();

    let id = state.next_id("o");
    let order = json!({
        "_id": id,
        "user": { "_id": user.id, "username": user.username, "email": user.email },
        "orderItems": items,
        "shippingAddress": body["address"],
        "totalPrice": total,
        "status": "processing",
        "paymentMethod": body["paymentMethod"],
        "isPaid": false,
        "createdAt": CREATED_AT,
    });
    state.orders.push(order.clone());
    state.carts.remove(&user.id);
    Ok((StatusCode::CREATED, Json(order)).into_response())
}

async fn my_orders(State(backend): State<FakeBackend>, headers: HeaderMap) -> ApiResult {
    let user = backend.authenticate(&headers)?;
    let orders: Vec<Value> = backend
        .lock()
        .orders
        .iter()
        .rev()
        .filter(|o| o["user"]["_id"] == user.id.as_str())
        .cloned()
        .collect();
    ok(Value::Array(orders))
}

async fn all_orders(State(backend): State<FakeBackend>, headers: HeaderMap) -> ApiResult {
    backend.authenticate_admin(&headers)?;
    ok(Value::Array(backend.lock().orders.clone()))
}

async fn update_order_status(
    State(backend): State<FakeBackend>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> ApiResult {
    let user = backend.authenticate(&headers)?;
    let mut state = backend.lock();
    let order = state
        .orders
        .iter_mut()
        .find(|o| o["_id"] == id.as_str())
        .ok_or_else(|| error(StatusCode::NOT_FOUND, "Order not found"))?;
    let own_cancel = order["user"]["_id"] == user.id.as_str() && body["status"] == "cancelled";
    if !user.is_admin && !own_cancel {
        return Err(error(StatusCode::FORBIDDEN, "Not authorized as an admin"));
    }
    order["status"] = body["status"].clone();
    ok(order.clone())
}

async fn create_payment(
    State(backend): State<FakeBackend>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> ApiResult {
    backend.authenticate(&headers)?;
    let mut state = backend.lock();
    if state.fail_payment_init {
        return Err(error(StatusCode::INTERNAL_SERVER_ERROR, "Payment gateway unavailable"));
    }
    let id = state.next_id("order_gw_");
    ok(json!({ "id": id, "amount": body["amount"], "currency": body["currency"] }))
}

async fn verify_payment(
    State(backend): State<FakeBackend>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> ApiResult {
    backend.authenticate(&headers)?;
    if body["razorpay_signature"] != VALID_SIGNATURE {
        return ok(json!({ "success": false, "message": "Invalid signature" }));
    }
    let mut state = backend.lock();
    let order_id = body["orderData"]["_id"].clone();
    let order = state
        .orders
        .iter_mut()
        .find(|o| o["_id"] == order_id)
        .ok_or_else(|| error(StatusCode::NOT_FOUND, "Order not found"))?;
    order["isPaid"] = json!(true);
    ok(json!({ "success": true, "order": order.clone() }))
}

// =============================================================================
// Complaint Endpoints
// =============================================================================

async fn create_complaint(
    State(backend): State<FakeBackend>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> ApiResult {
    let user = backend.authenticate(&headers)?;
    let mut state = backend.lock();
    let id = state.next_id("k");
    let complaint = json!({
        "_id": id,
        "user": { "_id": user.id, "username": user.username, "email": user.email },
        "issue": body["issue"],
        "model": body["model"],
        "address": body["address"],
        "phoneNumber": body["phoneNumber"],
        "status": "Pending",
        "createdAt": CREATED_AT,
    });
    state.complaints.push(complaint.clone());
    Ok((StatusCode::CREATED, Json(complaint)).into_response())
}

async fn list_complaints(State(backend): State<FakeBackend>, headers: HeaderMap) -> ApiResult {
    backend.authenticate_admin(&headers)?;
    ok(Value::Array(backend.lock().complaints.clone()))
}

async fn update_complaint_status(
    State(backend): State<FakeBackend>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> ApiResult {
    backend.authenticate_admin(&headers)?;
    let mut state = backend.lock();
    let complaint = state
        .complaints
        .iter_mut()
        .find(|c| c["_id"] == id.as_str())
        .ok_or_else(|| error(StatusCode::NOT_FOUND, "Complaint not found"))?;
    complaint["status"] = body["status"].clone();
    ok(complaint.clone())
}

// =============================================================================
// Storefront Under Test
// =============================================================================

/// Storefront configuration pointing at `api_url`.
///
/// `razorpay_key` enables the online payment option.
#[must_use]
pub fn test_config(api_url: &str, razorpay_key: Option<&str>) -> StorefrontConfig {
    StorefrontConfig {
        host: IpAddr::V4(Ipv4Addr::LOCALHOST),
        port: 0,
        base_url: "http://127.0.0.1".to_string(),
        backend: BackendConfig {
            api_url: Url::parse(&format!("{api_url}/")).expect("Invalid fake backend URL"),
            timeout: Duration::from_secs(5),
            catalog_cache_ttl: Duration::from_secs(60),
        },
        payment: PaymentConfig {
            razorpay_key_id: razorpay_key.map(str::to_string),
            ..PaymentConfig::default()
        },
        store_phone: Some("+91 98220 12345".to_string()),
        sentry: SentryConfig::default(),
        log_format: LogFormat::Text,
    }
}

/// A running storefront wired to a [`FakeBackend`].
pub struct TestApp {
    pub base_url: String,
    pub backend: FakeBackend,
    /// Cookie-keeping client that does not follow redirects.
    pub client: reqwest::Client,
}

impl TestApp {
    /// Start a fake backend and a storefront in front of it.
    pub async fn spawn() -> Self {
        Self::spawn_with(FakeBackend::new(), None).await
    }

    /// Start a storefront with online payment enabled.
    pub async fn spawn_with_gateway() -> Self {
        Self::spawn_with(FakeBackend::new(), Some("rzp_test_1DP5mmOlF5G5ag")).await
    }

    pub async fn spawn_with(backend: FakeBackend, razorpay_key: Option<&str>) -> Self {
        let api_url = backend.spawn().await;
        let state = AppState::new(test_config(&api_url, razorpay_key))
            .expect("Failed to build app state");
        let app = suraj_storefront::build_router(state);

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind storefront");
        let addr = listener.local_addr().expect("Failed to read storefront address");
        tokio::spawn(async move {
            axum::serve(
                listener,
                app.into_make_service_with_connect_info::<SocketAddr>(),
            )
            .await
            .ok();
        });

        let client = reqwest::Client::builder()
            .cookie_store(true)
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .expect("Failed to create HTTP client");

        Self {
            base_url: format!("http://{addr}"),
            backend,
            client,
        }
    }

    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    pub async fn get(&self, path: &str) -> reqwest::Response {
        self.client
            .get(self.url(path))
            .send()
            .await
            .expect("GET request failed")
    }

    pub async fn post_form(&self, path: &str, form: &[(&str, &str)]) -> reqwest::Response {
        self.client
            .post(self.url(path))
            .form(form)
            .send()
            .await
            .expect("POST request failed")
    }

    /// Log in through the login form.
    pub async fn login(&self, email: &str, password: &str) -> reqwest::Response {
        self.post_form("/auth/login", &[("email", email), ("password", password)])
            .await
    }

    pub async fn login_customer(&self) {
        let resp = self.login(CUSTOMER_EMAIL, CUSTOMER_PASSWORD).await;
        assert_eq!(location(&resp), "/", "customer login failed");
    }

    pub async fn login_admin(&self) {
        let resp = self.login(ADMIN_EMAIL, ADMIN_PASSWORD).await;
        assert_eq!(location(&resp), "/", "admin login failed");
    }
}

/// The `Location` header of a redirect, or an empty string.
#[must_use]
pub fn location(resp: &reqwest::Response) -> &str {
    resp.headers()
        .get(reqwest::header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
}
