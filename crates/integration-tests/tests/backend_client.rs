//! Integration tests for `BackendClient` against the fake REST API.

use std::time::Duration;

use rust_decimal::Decimal;
use suraj_core::{CartItemId, ProductId};
use suraj_integration_tests::{CUSTOMER_EMAIL, CUSTOMER_ID, CUSTOMER_PASSWORD, FakeBackend};
use suraj_storefront::backend::{BackendClient, BackendError, BearerToken, ProductInput};
use suraj_storefront::config::BackendConfig;
use url::Url;

async fn client(backend: &FakeBackend) -> BackendClient {
    let api_url = backend.spawn().await;
    BackendClient::new(&BackendConfig {
        api_url: Url::parse(&format!("{api_url}/")).expect("Invalid API URL"),
        timeout: Duration::from_secs(5),
        catalog_cache_ttl: Duration::from_secs(60),
    })
    .expect("Failed to build backend client")
}

async fn customer_token(client: &BackendClient) -> BearerToken {
    let response = client
        .login(CUSTOMER_EMAIL, CUSTOMER_PASSWORD)
        .await
        .expect("Customer login failed");
    BearerToken::new(response.token)
}

// ============================================================================
// Auth
// ============================================================================

#[tokio::test]
async fn test_login_returns_token_and_user() {
    let backend = FakeBackend::new();
    let client = client(&backend).await;

    let response = client
        .login(CUSTOMER_EMAIL, CUSTOMER_PASSWORD)
        .await
        .expect("Login failed");

    assert_eq!(response.token, format!("token-{CUSTOMER_ID}"));
    assert_eq!(response.user.email, CUSTOMER_EMAIL);
    assert!(!response.user.is_admin);
    assert!(backend.called("POST /auth/login"));
}

#[tokio::test]
async fn test_bad_credentials_carry_backend_message() {
    let backend = FakeBackend::new();
    let client = client(&backend).await;

    let err = client
        .login(CUSTOMER_EMAIL, "wrong")
        .await
        .expect_err("Login should fail");

    assert_eq!(err.user_message(), "Invalid email or password");
}

#[tokio::test]
async fn test_me_unwraps_user_envelope() {
    let backend = FakeBackend::new();
    let client = client(&backend).await;
    let token = customer_token(&client).await;

    let user = client.me(&token).await.expect("Failed to load profile");

    assert_eq!(user.id.as_str(), CUSTOMER_ID);
    assert_eq!(user.username, "ravi");
}

#[tokio::test]
async fn test_rejected_token_maps_to_unauthorized() {
    let backend = FakeBackend::new();
    let client = client(&backend).await;
    let token = customer_token(&client).await;
    backend.revoke_tokens();

    let err = client.me(&token).await.expect_err("Token should be refused");

    assert!(err.is_unauthorized());
}

#[tokio::test]
async fn test_customer_cannot_list_users() {
    let backend = FakeBackend::new();
    let client = client(&backend).await;
    let token = customer_token(&client).await;

    let err = client
        .list_users(&token)
        .await
        .expect_err("Customer should not see users");

    assert!(matches!(err, BackendError::Forbidden(_)));
    assert!(!err.is_unauthorized());
}

// ============================================================================
// Catalog
// ============================================================================

#[tokio::test]
async fn test_product_list_is_cached_until_invalidated() {
    let backend = FakeBackend::new();
    let client = client(&backend).await;

    let first = client.list_products().await.expect("List failed");
    let second = client.list_products().await.expect("List failed");
    assert_eq!(first.len(), 3);
    assert_eq!(second.len(), 3);
    let fetches = |calls: Vec<String>| calls.iter().filter(|c| *c == "GET /products").count();
    assert_eq!(fetches(backend.calls()), 1);

    client.invalidate_catalog();
    client.list_products().await.expect("List failed");
    assert_eq!(fetches(backend.calls()), 2);
}

#[tokio::test]
async fn test_missing_product_is_not_found() {
    let backend = FakeBackend::new();
    let client = client(&backend).await;

    let err = client
        .get_product(&ProductId::new("nope"))
        .await
        .expect_err("Product should be missing");

    assert!(matches!(err, BackendError::NotFound(_)));
}

#[tokio::test]
async fn test_product_prices_parse_as_decimals() {
    let backend = FakeBackend::new();
    let client = client(&backend).await;

    let product = client
        .get_product(&ProductId::new("p1"))
        .await
        .expect("Product should exist");

    assert_eq!(product.name, "LED TV 43");
    assert_eq!(product.price, Decimal::from(24_999));
    assert!(product.in_stock);
}

#[tokio::test]
async fn test_admin_create_product_round_trips_through_api() {
    let backend = FakeBackend::new();
    let client = client(&backend).await;
    let admin = client
        .login(
            suraj_integration_tests::ADMIN_EMAIL,
            suraj_integration_tests::ADMIN_PASSWORD,
        )
        .await
        .expect("Admin login failed");
    let token = BearerToken::new(admin.token);

    let input = ProductInput {
        name: "Set-top Box".to_string(),
        price: Decimal::from(1_499),
        description: "HD receiver".to_string(),
        image: String::new(),
        in_stock: true,
        category: "Accessories".to_string(),
    };
    client
        .create_product(&token, &input)
        .await
        .expect("Create failed");

    let names: Vec<String> = backend
        .products()
        .iter()
        .filter_map(|p| p["name"].as_str().map(str::to_string))
        .collect();
    assert!(names.contains(&"Set-top Box".to_string()));
}

// ============================================================================
// Cart
// ============================================================================

#[tokio::test]
async fn test_missing_cart_reads_as_empty() {
    let backend = FakeBackend::new();
    let client = client(&backend).await;
    let token = customer_token(&client).await;

    let cart = client.get_cart(&token).await.expect("Cart read failed");

    assert!(cart.items.is_empty());
}

#[tokio::test]
async fn test_cart_add_update_remove() {
    let backend = FakeBackend::new();
    let client = client(&backend).await;
    let token = customer_token(&client).await;

    client
        .add_to_cart(&token, &ProductId::new("p1"), 2)
        .await
        .expect("Add failed");
    let cart = client.get_cart(&token).await.expect("Cart read failed");
    assert_eq!(cart.items.len(), 1);
    assert_eq!(cart.items[0].quantity, 2);
    let item_id: CartItemId = cart.items[0].id.clone();

    client
        .update_cart_item(&token, &item_id, 5)
        .await
        .expect("Update failed");
    assert_eq!(backend.cart_quantity(CUSTOMER_ID, "p1"), Some(5));

    client
        .remove_cart_item(&token, &item_id)
        .await
        .expect("Remove failed");
    assert_eq!(backend.cart_quantity(CUSTOMER_ID, "p1"), None);
}

#[tokio::test]
async fn test_out_of_stock_add_is_refused_with_message() {
    let backend = FakeBackend::new();
    let client = client(&backend).await;
    let token = customer_token(&client).await;

    let err = client
        .add_to_cart(&token, &ProductId::new("p3"), 1)
        .await
        .expect_err("Out of stock add should fail");

    assert!(matches!(err, BackendError::Api { status: 400, .. }));
    assert_eq!(err.user_message(), "Product out of stock");
}
