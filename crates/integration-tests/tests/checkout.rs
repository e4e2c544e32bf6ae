//! Integration tests for the checkout sequence.
//!
//! Each test drives the storefront's forms through a cookie-keeping client
//! and inspects the fake backend to see which calls were made.

use reqwest::StatusCode;
use suraj_integration_tests::{CUSTOMER_ID, FakeBackend, TestApp, VALID_SIGNATURE, location};

const RAZORPAY_KEY: &str = "rzp_test_1DP5mmOlF5G5ag";

fn manual_address(payment_method: &str) -> Vec<(&str, &str)> {
    vec![
        ("address_choice", "manual"),
        ("area", "12 Civil Lines"),
        ("landmark", "Near Zero Mile"),
        ("city", "Nagpur"),
        ("state", "Maharashtra"),
        ("pincode", "440001"),
        ("instructions", ""),
        ("payment_method", payment_method),
    ]
}

async fn customer_with_cart(app: &TestApp) {
    app.backend.put_in_cart(CUSTOMER_ID, "p1", 1);
    app.login_customer().await;
}

/// Submit a gateway checkout and return the gateway order id from the pay page.
async fn open_gateway(app: &TestApp) -> String {
    let resp = app.post_form("/checkout", &manual_address("razorpay")).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = resp.text().await.expect("Failed to read pay page");
    assert!(body.contains("pay-button"));

    let start = body.find("order_gw_").expect("Gateway order id missing");
    body[start..]
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric() || *c == '_')
        .collect()
}

// ============================================================================
// Access
// ============================================================================

#[tokio::test]
async fn test_checkout_requires_login() {
    let app = TestApp::spawn().await;

    let resp = app.get("/checkout").await;

    assert!(resp.status().is_redirection());
    assert_eq!(location(&resp), "/auth/login");
}

#[tokio::test]
async fn test_empty_cart_redirects_back_to_cart() {
    let app = TestApp::spawn().await;
    app.login_customer().await;

    let resp = app.get("/checkout").await;

    assert_eq!(location(&resp), "/cart?error=empty_cart");
}

// ============================================================================
// Cash on Delivery
// ============================================================================

#[tokio::test]
async fn test_cod_checkout_places_order() {
    let app = TestApp::spawn().await;
    customer_with_cart(&app).await;

    let resp = app.post_form("/checkout", &manual_address("cod")).await;

    assert!(resp.status().is_redirection());
    assert!(location(&resp).starts_with("/orders?placed="));
    let orders = app.backend.orders();
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0]["paymentMethod"], "cod");
    assert_eq!(orders[0]["shippingAddress"]["pincode"], "440001");
    assert!(!app.backend.called("POST /orders/create-payment"));
}

#[tokio::test]
async fn test_invalid_pincode_never_reaches_backend() {
    let app = TestApp::spawn().await;
    customer_with_cart(&app).await;
    app.backend.clear_calls();

    let mut form = manual_address("cod");
    form.retain(|(key, _)| *key != "pincode");
    form.push(("pincode", "44A"));
    let resp = app.post_form("/checkout", &form).await;

    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert!(!app.backend.called("POST /orders"));
}

#[tokio::test]
async fn test_saved_address_used_when_chosen() {
    let backend = FakeBackend::new();
    backend.set_shipping_address(
        CUSTOMER_ID,
        serde_json::json!({
            "area": "7 Sitabuldi",
            "landmark": "",
            "city": "Nagpur",
            "state": "Maharashtra",
            "pincode": "440012",
            "instructions": "",
        }),
    );
    let app = TestApp::spawn_with(backend, None).await;
    customer_with_cart(&app).await;

    let resp = app
        .post_form(
            "/checkout",
            &[("address_choice", "saved"), ("payment_method", "cod")],
        )
        .await;

    assert!(location(&resp).starts_with("/orders?placed="));
    assert_eq!(app.backend.orders()[0]["shippingAddress"]["pincode"], "440012");
}

#[tokio::test]
async fn test_save_as_default_updates_profile_before_order() {
    let app = TestApp::spawn().await;
    customer_with_cart(&app).await;
    app.backend.clear_calls();

    let mut form = manual_address("cod");
    form.push(("save_as_default", "on"));
    let resp = app.post_form("/checkout", &form).await;

    assert!(location(&resp).starts_with("/orders?placed="));
    let calls = app.backend.calls();
    let profile = calls.iter().position(|c| c == "PUT /auth/profile");
    let order = calls.iter().position(|c| c == "POST /orders");
    assert!(profile.is_some());
    assert!(profile < order);
    let user = app.backend.user(CUSTOMER_ID).expect("Customer missing");
    assert_eq!(user["shippingAddress"]["city"], "Nagpur");
}

// ============================================================================
// Online Payment
// ============================================================================

#[tokio::test]
async fn test_gateway_refused_when_not_configured() {
    let app = TestApp::spawn().await;
    customer_with_cart(&app).await;

    let resp = app.post_form("/checkout", &manual_address("razorpay")).await;

    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert!(app.backend.orders().is_empty());
}

#[tokio::test]
async fn test_gateway_payment_verified() {
    let app = TestApp::spawn_with(FakeBackend::new(), Some(RAZORPAY_KEY)).await;
    customer_with_cart(&app).await;

    let gateway_order_id = open_gateway(&app).await;
    let order_id = app.backend.orders()[0]["_id"]
        .as_str()
        .expect("Order id missing")
        .to_string();

    let resp = app
        .post_form(
            "/checkout/verify",
            &[
                ("razorpay_payment_id", "pay_29QQoUBi66xm2f"),
                ("razorpay_order_id", gateway_order_id.as_str()),
                ("razorpay_signature", VALID_SIGNATURE),
            ],
        )
        .await;

    assert_eq!(location(&resp), format!("/orders?verified={order_id}"));
    assert_eq!(app.backend.orders()[0]["isPaid"], true);
}

#[tokio::test]
async fn test_mismatched_gateway_order_is_not_verified() {
    let app = TestApp::spawn_with(FakeBackend::new(), Some(RAZORPAY_KEY)).await;
    customer_with_cart(&app).await;
    open_gateway(&app).await;
    app.backend.clear_calls();

    let resp = app
        .post_form(
            "/checkout/verify",
            &[
                ("razorpay_payment_id", "pay_29QQoUBi66xm2f"),
                ("razorpay_order_id", "order_gw_forged"),
                ("razorpay_signature", VALID_SIGNATURE),
            ],
        )
        .await;

    assert_eq!(location(&resp), "/cart?error=payment_verification_failed");
    assert!(!app.backend.called("POST /orders/verify-payment"));
    assert_eq!(app.backend.orders()[0]["isPaid"], false);
}

#[tokio::test]
async fn test_bad_signature_fails_verification() {
    let app = TestApp::spawn_with(FakeBackend::new(), Some(RAZORPAY_KEY)).await;
    customer_with_cart(&app).await;
    let gateway_order_id = open_gateway(&app).await;

    let resp = app
        .post_form(
            "/checkout/verify",
            &[
                ("razorpay_payment_id", "pay_29QQoUBi66xm2f"),
                ("razorpay_order_id", gateway_order_id.as_str()),
                ("razorpay_signature", "tampered"),
            ],
        )
        .await;

    assert_eq!(location(&resp), "/cart?error=payment_verification_failed");
    assert!(app.backend.called("POST /orders/verify-payment"));
    assert_eq!(app.backend.orders()[0]["isPaid"], false);
}

#[tokio::test]
async fn test_verify_without_pending_payment_fails() {
    let app = TestApp::spawn_with(FakeBackend::new(), Some(RAZORPAY_KEY)).await;
    app.login_customer().await;

    let resp = app
        .post_form(
            "/checkout/verify",
            &[
                ("razorpay_payment_id", "pay_29QQoUBi66xm2f"),
                ("razorpay_order_id", "order_gw_1"),
                ("razorpay_signature", VALID_SIGNATURE),
            ],
        )
        .await;

    assert_eq!(location(&resp), "/cart?error=payment_verification_failed");
    assert!(!app.backend.called("POST /orders/verify-payment"));
}

#[tokio::test]
async fn test_payment_init_failure_leaves_order_visible() {
    let backend = FakeBackend::new();
    backend.fail_payment_init();
    let app = TestApp::spawn_with(backend, Some(RAZORPAY_KEY)).await;
    customer_with_cart(&app).await;

    let resp = app.post_form("/checkout", &manual_address("razorpay")).await;

    assert_eq!(location(&resp), "/orders?error=payment_init");
    assert_eq!(app.backend.orders().len(), 1);
}
