//! Backend REST client implementation.
//!
//! Uses `reqwest` 0.13 for HTTP with JSON bodies. Caches product reads using
//! `moka` with a configurable TTL.

use std::sync::Arc;

use moka::future::Cache;
use reqwest::{Method, RequestBuilder, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use suraj_core::{CartItemId, ComplaintId, ComplaintStatus, OrderId, OrderStatus, ProductId, UserId};
use tracing::{debug, instrument};
use url::Url;

use super::BackendError;
use super::cache::{CacheKey, CacheValue};
use super::token::BearerToken;
use super::types::{
    AddToCart, AdminUserUpdate, ApiErrorBody, Cart, Complaint, CreateOrder, CreatePayment,
    GatewayOrder, LoginRequest, LoginResponse, NewComplaint, Order, Product, ProductInput,
    ProfileUpdate, QuantityUpdate, RegisterRequest, StatusUpdate, StockUpdate, User,
    UserEnvelope, VerifyPayment, VerifyPaymentResponse,
};
use crate::config::BackendConfig;

/// Longest slice of an error body kept in logs.
const LOG_BODY_LIMIT: usize = 500;

// =============================================================================
// BackendClient
// =============================================================================

/// Client for the backend REST API.
///
/// Cheap to clone. Product list and product detail reads are cached.
#[derive(Clone)]
pub struct BackendClient {
    inner: Arc<BackendClientInner>,
}

struct BackendClientInner {
    client: reqwest::Client,
    base_url: Url,
    cache: Cache<CacheKey, CacheValue>,
}

impl BackendClient {
    /// Create a new backend client.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client fails to build.
    pub fn new(config: &BackendConfig) -> Result<Self, BackendError> {
        let cache = Cache::builder()
            .max_capacity(1000)
            .time_to_live(config.catalog_cache_ttl)
            .build();

        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("suraj-storefront/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            inner: Arc::new(BackendClientInner {
                client,
                base_url: config.api_url.clone(),
                cache,
            }),
        })
    }

    /// Build a request for `path`, relative to the API base URL.
    fn request(
        &self,
        method: Method,
        path: &str,
        token: Option<&BearerToken>,
    ) -> Result<RequestBuilder, BackendError> {
        let url = self.inner.base_url.join(path)?;
        let builder = self.inner.client.request(method, url);
        Ok(match token {
            Some(token) => builder.bearer_auth(token.expose()),
            None => builder,
        })
    }

    /// Send a request and return the body text of a successful response.
    async fn send_raw(&self, request: RequestBuilder) -> Result<String, BackendError> {
        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if status.is_success() {
            return Ok(body);
        }

        let message = error_message(status, &body);
        match status {
            StatusCode::UNAUTHORIZED => {
                debug!(message = %message, "Backend rejected credentials");
                Err(BackendError::Unauthorized(message))
            }
            StatusCode::FORBIDDEN => {
                debug!(message = %message, "Backend refused access");
                Err(BackendError::Forbidden(message))
            }
            StatusCode::NOT_FOUND => Err(BackendError::NotFound(message)),
            _ => {
                if status.is_server_error() {
                    tracing::error!(
                        status = %status,
                        body = %body.chars().take(LOG_BODY_LIMIT).collect::<String>(),
                        "Backend returned server error"
                    );
                } else {
                    tracing::warn!(status = %status, message = %message, "Backend rejected request");
                }
                Err(BackendError::Api {
                    status: status.as_u16(),
                    message,
                })
            }
        }
    }

    /// Send a request and parse the JSON response.
    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, BackendError> {
        let body = self.send_raw(request).await?;
        serde_json::from_str(&body).map_err(|e| {
            tracing::error!(
                error = %e,
                body = %body.chars().take(LOG_BODY_LIMIT).collect::<String>(),
                "Failed to parse backend response"
            );
            BackendError::Parse(e)
        })
    }

    /// Send a request whose response body is not needed.
    async fn send_empty(&self, request: RequestBuilder) -> Result<(), BackendError> {
        self.send_raw(request).await.map(drop)
    }

    fn json<B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        token: Option<&BearerToken>,
        body: &B,
    ) -> Result<RequestBuilder, BackendError> {
        Ok(self.request(method, path, token)?.json(body))
    }

    /// Check the backend is answering. Used by the readiness probe.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend is unreachable or unhealthy.
    #[instrument(skip(self))]
    pub async fn ping(&self) -> Result<(), BackendError> {
        self.send_empty(self.request(Method::GET, "products", None)?)
            .await
    }

    // =========================================================================
    // Auth Methods
    // =========================================================================

    /// Exchange credentials for a bearer token and the user record.
    ///
    /// # Errors
    ///
    /// Returns an error carrying the backend's message on bad credentials.
    #[instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: &str) -> Result<LoginResponse, BackendError> {
        let body = LoginRequest { email, password };
        self.send(self.json(Method::POST, "auth/login", None, &body)?)
            .await
    }

    /// Create a new customer account.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend refuses the registration.
    #[instrument(skip(self, request), fields(email = %request.email))]
    pub async fn register(&self, request: &RegisterRequest) -> Result<(), BackendError> {
        self.send_empty(self.json(Method::POST, "auth/register", None, request)?)
            .await
    }

    /// Fetch the user the token belongs to.
    ///
    /// # Errors
    ///
    /// Returns `Unauthorized` if the token is no longer accepted.
    #[instrument(skip(self, token))]
    pub async fn me(&self, token: &BearerToken) -> Result<User, BackendError> {
        let envelope: UserEnvelope = self
            .send(self.request(Method::GET, "auth/me", Some(token))?)
            .await?;
        Ok(envelope.into_user())
    }

    /// Update the caller's profile and return the updated user.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend rejects the update.
    #[instrument(skip(self, token, update))]
    pub async fn update_profile(
        &self,
        token: &BearerToken,
        update: &ProfileUpdate,
    ) -> Result<User, BackendError> {
        let envelope: UserEnvelope = self
            .send(self.json(Method::PUT, "auth/profile", Some(token), update)?)
            .await?;
        Ok(envelope.into_user())
    }

    /// List every user (admin).
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the caller is not an admin.
    #[instrument(skip(self, token))]
    pub async fn list_users(&self, token: &BearerToken) -> Result<Vec<User>, BackendError> {
        self.send(self.request(Method::GET, "auth/users", Some(token))?)
            .await
    }

    /// Fetch one user (admin).
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the user does not exist.
    #[instrument(skip(self, token), fields(user_id = %id))]
    pub async fn get_user(&self, token: &BearerToken, id: &UserId) -> Result<User, BackendError> {
        let path = format!("auth/users/{}", urlencoding::encode(id.as_str()));
        self.send(self.request(Method::GET, &path, Some(token))?)
            .await
    }

    /// Overwrite a user's account fields (admin).
    ///
    /// # Errors
    ///
    /// Returns an error if the backend rejects the update.
    #[instrument(skip(self, token, update), fields(user_id = %id))]
    pub async fn update_user(
        &self,
        token: &BearerToken,
        id: &UserId,
        update: &AdminUserUpdate,
    ) -> Result<(), BackendError> {
        let path = format!("auth/users/{}", urlencoding::encode(id.as_str()));
        self.send_empty(self.json(Method::PUT, &path, Some(token), update)?)
            .await
    }

    /// Delete a user (admin).
    ///
    /// # Errors
    ///
    /// Returns an error if the backend refuses the deletion.
    #[instrument(skip(self, token), fields(user_id = %id))]
    pub async fn delete_user(&self, token: &BearerToken, id: &UserId) -> Result<(), BackendError> {
        let path = format!("auth/users/{}", urlencoding::encode(id.as_str()));
        self.send_empty(self.request(Method::DELETE, &path, Some(token))?)
            .await
    }

    // =========================================================================
    // Product Methods
    // =========================================================================

    /// Get the whole catalog, in backend order.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn list_products(&self) -> Result<Arc<Vec<Product>>, BackendError> {
        if let Some(CacheValue::Products(products)) = self.inner.cache.get(&CacheKey::Products).await
        {
            debug!("Cache hit for products");
            return Ok(products);
        }

        let products: Vec<Product> = self
            .send(self.request(Method::GET, "products", None)?)
            .await?;
        let products = Arc::new(products);

        self.inner
            .cache
            .insert(CacheKey::Products, CacheValue::Products(Arc::clone(&products)))
            .await;

        Ok(products)
    }

    /// Get a product by id.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the product does not exist.
    #[instrument(skip(self), fields(product_id = %id))]
    pub async fn get_product(&self, id: &ProductId) -> Result<Product, BackendError> {
        let cache_key = CacheKey::Product(id.clone());

        if let Some(CacheValue::Product(product)) = self.inner.cache.get(&cache_key).await {
            debug!("Cache hit for product");
            return Ok(*product);
        }

        let path = format!("products/{}", urlencoding::encode(id.as_str()));
        let product: Product = self
            .send(self.request(Method::GET, &path, None)?)
            .await?;

        self.inner
            .cache
            .insert(cache_key, CacheValue::Product(Box::new(product.clone())))
            .await;

        Ok(product)
    }

    /// Add a product to the catalog (admin).
    ///
    /// # Errors
    ///
    /// Returns an error if the backend rejects the product.
    #[instrument(skip(self, token, input), fields(name = %input.name))]
    pub async fn create_product(
        &self,
        token: &BearerToken,
        input: &ProductInput,
    ) -> Result<(), BackendError> {
        let result = self
            .send_empty(self.json(Method::POST, "products", Some(token), input)?)
            .await;
        self.invalidate_catalog();
        result
    }

    /// Replace a product's fields (admin).
    ///
    /// # Errors
    ///
    /// Returns an error if the backend rejects the update.
    #[instrument(skip(self, token, input), fields(product_id = %id))]
    pub async fn update_product(
        &self,
        token: &BearerToken,
        id: &ProductId,
        input: &ProductInput,
    ) -> Result<(), BackendError> {
        let path = format!("products/{}", urlencoding::encode(id.as_str()));
        let result = self
            .send_empty(self.json(Method::PUT, &path, Some(token), input)?)
            .await;
        self.invalidate_catalog();
        result
    }

    /// Flip a product's availability (admin).
    ///
    /// # Errors
    ///
    /// Returns an error if the backend rejects the update.
    #[instrument(skip(self, token), fields(product_id = %id))]
    pub async fn set_product_stock(
        &self,
        token: &BearerToken,
        id: &ProductId,
        in_stock: bool,
    ) -> Result<(), BackendError> {
        let path = format!("products/{}", urlencoding::encode(id.as_str()));
        let result = self
            .send_empty(self.json(Method::PUT, &path, Some(token), &StockUpdate { in_stock })?)
            .await;
        self.invalidate_catalog();
        result
    }

    /// Remove a product from the catalog (admin).
    ///
    /// # Errors
    ///
    /// Returns an error if the backend refuses the deletion.
    #[instrument(skip(self, token), fields(product_id = %id))]
    pub async fn delete_product(
        &self,
        token: &BearerToken,
        id: &ProductId,
    ) -> Result<(), BackendError> {
        let path = format!("products/{}", urlencoding::encode(id.as_str()));
        let result = self
            .send_empty(self.request(Method::DELETE, &path, Some(token))?)
            .await;
        self.invalidate_catalog();
        result
    }

    /// Drop every cached catalog response.
    pub fn invalidate_catalog(&self) {
        self.inner.cache.invalidate_all();
    }

    // =========================================================================
    // Cart Methods
    // =========================================================================

    /// Get the caller's cart. A missing cart is an empty cart.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self, token))]
    pub async fn get_cart(&self, token: &BearerToken) -> Result<Cart, BackendError> {
        match self
            .send::<Cart>(self.request(Method::GET, "cart", Some(token))?)
            .await
        {
            Err(BackendError::NotFound(_)) => Ok(Cart::default()),
            other => other,
        }
    }

    /// Add `quantity` of a product to the cart.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend rejects the line.
    #[instrument(skip(self, token), fields(product_id = %product_id))]
    pub async fn add_to_cart(
        &self,
        token: &BearerToken,
        product_id: &ProductId,
        quantity: u32,
    ) -> Result<(), BackendError> {
        let body = AddToCart {
            product_id,
            quantity,
        };
        self.send_empty(self.json(Method::POST, "cart", Some(token), &body)?)
            .await
    }

    /// Set the quantity of one cart line.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend rejects the update.
    #[instrument(skip(self, token), fields(item_id = %item_id))]
    pub async fn update_cart_item(
        &self,
        token: &BearerToken,
        item_id: &CartItemId,
        quantity: u32,
    ) -> Result<(), BackendError> {
        let path = format!("cart/{}", urlencoding::encode(item_id.as_str()));
        self.send_empty(self.json(Method::PUT, &path, Some(token), &QuantityUpdate { quantity })?)
            .await
    }

    /// Remove one cart line.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self, token), fields(item_id = %item_id))]
    pub async fn remove_cart_item(
        &self,
        token: &BearerToken,
        item_id: &CartItemId,
    ) -> Result<(), BackendError> {
        let path = format!("cart/{}", urlencoding::encode(item_id.as_str()));
        self.send_empty(self.request(Method::DELETE, &path, Some(token))?)
            .await
    }

    /// Empty the cart.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self, token))]
    pub async fn clear_cart(&self, token: &BearerToken) -> Result<(), BackendError> {
        self.send_empty(self.request(Method::DELETE, "cart", Some(token))?)
            .await
    }

    // =========================================================================
    // Order Methods
    // =========================================================================

    /// The caller's orders, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self, token))]
    pub async fn my_orders(&self, token: &BearerToken) -> Result<Vec<Order>, BackendError> {
        self.send(self.request(Method::GET, "orders/my", Some(token))?)
            .await
    }

    /// Every order in the store (admin).
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the caller is not an admin.
    #[instrument(skip(self, token))]
    pub async fn all_orders(&self, token: &BearerToken) -> Result<Vec<Order>, BackendError> {
        self.send(self.request(Method::GET, "orders", Some(token))?)
            .await
    }

    /// Create an order from the caller's cart.
    ///
    /// # Errors
    ///
    /// Returns an error carrying the backend's message if the order is refused.
    #[instrument(skip(self, token, order), fields(payment_method = %order.payment_method))]
    pub async fn create_order(
        &self,
        token: &BearerToken,
        order: &CreateOrder<'_>,
    ) -> Result<Order, BackendError> {
        self.send(self.json(Method::POST, "orders", Some(token), order)?)
            .await
    }

    /// Change an order's status.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend rejects the change.
    #[instrument(skip(self, token), fields(order_id = %id, status = %status))]
    pub async fn update_order_status(
        &self,
        token: &BearerToken,
        id: &OrderId,
        status: OrderStatus,
    ) -> Result<(), BackendError> {
        let path = format!("orders/{}", urlencoding::encode(id.as_str()));
        self.send_empty(self.json(Method::PUT, &path, Some(token), &StatusUpdate { status })?)
            .await
    }

    /// Ask the backend to open a gateway order for `amount` minor units.
    ///
    /// # Errors
    ///
    /// Returns an error if the gateway order cannot be created.
    #[instrument(skip(self, token))]
    pub async fn create_payment(
        &self,
        token: &BearerToken,
        amount: i64,
        currency: &str,
    ) -> Result<GatewayOrder, BackendError> {
        let body = CreatePayment { amount, currency };
        self.send(self.json(Method::POST, "orders/create-payment", Some(token), &body)?)
            .await
    }

    /// Submit the gateway callback for signature verification.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails. A processed but failed
    /// verification comes back as `success: false`.
    #[instrument(skip(self, token, request), fields(order_id = %request.order_data.id))]
    pub async fn verify_payment(
        &self,
        token: &BearerToken,
        request: &VerifyPayment<'_>,
    ) -> Result<VerifyPaymentResponse, BackendError> {
        self.send(self.json(Method::POST, "orders/verify-payment", Some(token), request)?)
            .await
    }

    // =========================================================================
    // Complaint Methods
    // =========================================================================

    /// File a service complaint.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend rejects the complaint.
    #[instrument(skip(self, token, complaint), fields(issue = %complaint.issue))]
    pub async fn create_complaint(
        &self,
        token: &BearerToken,
        complaint: &NewComplaint,
    ) -> Result<(), BackendError> {
        self.send_empty(self.json(Method::POST, "complaints", Some(token), complaint)?)
            .await
    }

    /// Every complaint (admin).
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the caller is not an admin.
    #[instrument(skip(self, token))]
    pub async fn list_complaints(
        &self,
        token: &BearerToken,
    ) -> Result<Vec<Complaint>, BackendError> {
        self.send(self.request(Method::GET, "complaints", Some(token))?)
            .await
    }

    /// Change a complaint's status (admin).
    ///
    /// # Errors
    ///
    /// Returns an error if the backend rejects the change.
    #[instrument(skip(self, token), fields(complaint_id = %id, status = %status))]
    pub async fn update_complaint_status(
        &self,
        token: &BearerToken,
        id: &ComplaintId,
        status: ComplaintStatus,
    ) -> Result<(), BackendError> {
        let path = format!("complaints/{}", urlencoding::encode(id.as_str()));
        self.send_empty(self.json(Method::PUT, &path, Some(token), &StatusUpdate { status })?)
            .await
    }
}

/// Pull the human-readable message out of an error body.
///
/// Prefers `message`, then `msg`, then a line derived from the status.
fn error_message(status: StatusCode, body: &str) -> String {
    let parsed: ApiErrorBody = serde_json::from_str(body).unwrap_or_default();
    parsed
        .message
        .or(parsed.msg)
        .filter(|message| !message.trim().is_empty())
        .unwrap_or_else(|| {
            format!(
                "Request failed ({})",
                status.canonical_reason().unwrap_or("unknown error")
            )
        })
}
