mod common;

use axum::http::{Method, StatusCode};
use common::{order_payload, read_json, TestApp, TEST_PAYPAL_CLIENT_ID, TEST_STRIPE_PUBLISHABLE_KEY};
use serde_json::json;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn mock_paypal_token(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/v1/oauth2/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "test-access-token",
            "token_type": "Bearer",
            "expires_in": 32400
        })))
        .mount(server)
        .await;
}

async fn mock_paypal_order(
    server: &MockServer,
    provider_order_id: &str,
    status: &str,
    amount: &str,
) {
    Mock::given(method("GET"))
        .and(path(format!("/v2/checkout/orders/{provider_order_id}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": provider_order_id,
            "status": status,
            "update_time": "2025-09-12T10:21:00Z",
            "payer": { "email_address": "payer@example.com" },
            "purchase_units": [{
                "amount": { "currency_code": "USD", "value": amount },
                "payments": {
                    "captures": [{
                        "amount": { "currency_code": "USD", "value": amount },
                        "update_time": "2025-09-12T10:22:30Z"
                    }]
                }
            }]
        })))
        .mount(server)
        .await;
}

fn stripe_intent_json(intent_id: &str, status: &str, amount_minor: i64) -> serde_json::Value {
    json!({
        "id": intent_id,
        "object": "payment_intent",
        "client_secret": format!("{intent_id}_secret_abc"),
        "amount": amount_minor,
        "currency": "usd",
        "status": status,
        "created": 1757671260,
        "receipt_email": null
    })
}

#[tokio::test]
async fn provider_endpoints_degrade_when_unconfigured() {
    let app = TestApp::new().await;
    let token = app.register("Nora", "nora@example.com", "password123").await;

    let response = app
        .request(Method::GET, "/api/v1/orders/paypal-client-id", None, None)
        .await;
    let (status, body) = read_json(response).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert!(body["message"].as_str().unwrap().contains("PayPal"));

    let response = app
        .request(
            Method::GET,
            "/api/v1/orders/stripe-publishable-key",
            None,
            None,
        )
        .await;
    let (status, _) = read_json(response).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);

    // Finalization against an unconfigured provider is the same 503
    let order_id = app.create_order(&token, "PayPal", "43.99").await;
    let response = app
        .request(
            Method::PUT,
            &format!("/api/v1/orders/{order_id}/pay"),
            Some(json!({ "paypal_order_id": "5O190127TN364715T" })),
            Some(&token),
        )
        .await;
    let (status, _) = read_json(response).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn public_provider_keys_are_exposed_when_configured() {
    let paypal = MockServer::start().await;
    let stripe = MockServer::start().await;
    let app = TestApp::with_providers(Some(paypal.uri()), Some(stripe.uri())).await;

    let response = app
        .request(Method::GET, "/api/v1/orders/paypal-client-id", None, None)
        .await;
    let (status, body) = read_json(response).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["client_id"], TEST_PAYPAL_CLIENT_ID);

    let response = app
        .request(
            Method::GET,
            "/api/v1/orders/stripe-publishable-key",
            None,
            None,
        )
        .await;
    let (status, body) = read_json(response).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["publishable_key"], TEST_STRIPE_PUBLISHABLE_KEY);
}

#[tokio::test]
async fn paypal_finalization_marks_order_paid() {
    let paypal = MockServer::start().await;
    mock_paypal_token(&paypal).await;
    mock_paypal_order(&paypal, "5O190127TN364715T", "COMPLETED", "43.99").await;

    let app = TestApp::with_providers(Some(paypal.uri()), None).await;
    let token = app.register("Nora", "nora@example.com", "password123").await;
    let order_id = app.create_order(&token, "PayPal", "43.99").await;

    let response = app
        .request(
            Method::PUT,
            &format!("/api/v1/orders/{order_id}/pay"),
            Some(json!({ "paypal_order_id": "5O190127TN364715T" })),
            Some(&token),
        )
        .await;
    let (status, body) = read_json(response).await;
    assert_eq!(status, StatusCode::OK, "finalize failed: {body}");

    let order = &body["data"];
    assert_eq!(order["is_paid"], true);
    assert!(order["paid_at"].is_string());
    let receipt = &order["payment_receipt"];
    assert_eq!(receipt["transaction_id"], "5O190127TN364715T");
    assert_eq!(receipt["status"], "COMPLETED");
    assert_eq!(receipt["payer_email"], "payer@example.com");
    assert_eq!(receipt["update_time"], "2025-09-12T10:22:30Z");
}

#[tokio::test]
async fn unsettled_paypal_order_is_rejected_and_order_stays_unpaid() {
    let paypal = MockServer::start().await;
    mock_paypal_token(&paypal).await;
    // Client-side capture never completed; provider still reports APPROVED
    Mock::given(method("GET"))
        .and(path("/v2/checkout/orders/8XJ32101WL9843032"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "8XJ32101WL9843032",
            "status": "APPROVED",
            "purchase_units": [{
                "amount": { "currency_code": "USD", "value": "43.99" }
            }]
        })))
        .mount(&paypal)
        .await;

    let app = TestApp::with_providers(Some(paypal.uri()), None).await;
    let token = app.register("Nora", "nora@example.com", "password123").await;
    let order_id = app.create_order(&token, "PayPal", "43.99").await;

    let response = app
        .request(
            Method::PUT,
            &format!("/api/v1/orders/{order_id}/pay"),
            Some(json!({ "paypal_order_id": "8XJ32101WL9843032" })),
            Some(&token),
        )
        .await;
    let (status, body) = read_json(response).await;
    assert_eq!(status, StatusCode::PAYMENT_REQUIRED);
    assert!(body["message"].as_str().unwrap().contains("APPROVED"));

    let response = app
        .request(
            Method::GET,
            &format!("/api/v1/orders/{order_id}"),
            None,
            Some(&token),
        )
        .await;
    let (_, body) = read_json(response).await;
    assert_eq!(body["data"]["is_paid"], false);
    assert!(body["data"]["payment_receipt"].is_null());
}

#[tokio::test]
async fn amount_mismatch_is_rejected() {
    let paypal = MockServer::start().await;
    mock_paypal_token(&paypal).await;
    // Provider captured one cent less than the order total
    mock_paypal_order(&paypal, "5O190127TN364715T", "COMPLETED", "43.98").await;

    let app = TestApp::with_providers(Some(paypal.uri()), None).await;
    let token = app.register("Nora", "nora@example.com", "password123").await;
    let order_id = app.create_order(&token, "PayPal", "43.99").await;

    let response = app
        .request(
            Method::PUT,
            &format!("/api/v1/orders/{order_id}/pay"),
            Some(json!({ "paypal_order_id": "5O190127TN364715T" })),
            Some(&token),
        )
        .await;
    let (status, body) = read_json(response).await;
    assert_eq!(status, StatusCode::PAYMENT_REQUIRED);
    assert!(body["message"].as_str().unwrap().contains("mismatch"));
}

#[tokio::test]
async fn repeat_finalization_with_same_proof_is_a_stable_success() {
    let paypal = MockServer::start().await;
    mock_paypal_token(&paypal).await;
    mock_paypal_order(&paypal, "5O190127TN364715T", "COMPLETED", "43.99").await;

    let app = TestApp::with_providers(Some(paypal.uri()), None).await;
    let token = app.register("Nora", "nora@example.com", "password123").await;
    let order_id = app.create_order(&token, "PayPal", "43.99").await;

    let finalize = json!({ "paypal_order_id": "5O190127TN364715T" });
    let uri = format!("/api/v1/orders/{order_id}/pay");

    let first = app
        .request(Method::PUT, &uri, Some(finalize.clone()), Some(&token))
        .await;
    let (status, first_body) = read_json(first).await;
    assert_eq!(status, StatusCode::OK);

    let second = app
        .request(Method::PUT, &uri, Some(finalize), Some(&token))
        .await;
    let (status, second_body) = read_json(second).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(second_body["data"]["is_paid"], true);
    assert_eq!(
        second_body["data"]["payment_receipt"]["transaction_id"],
        first_body["data"]["payment_receipt"]["transaction_id"]
    );
    assert_eq!(
        second_body["data"]["paid_at"],
        first_body["data"]["paid_at"]
    );
}

#[tokio::test]
async fn different_proof_against_a_paid_order_conflicts() {
    let paypal = MockServer::start().await;
    mock_paypal_token(&paypal).await;
    mock_paypal_order(&paypal, "5O190127TN364715T", "COMPLETED", "43.99").await;
    mock_paypal_order(&paypal, "2GG903833H261305C", "COMPLETED", "43.99").await;

    let app = TestApp::with_providers(Some(paypal.uri()), None).await;
    let token = app.register("Nora", "nora@example.com", "password123").await;
    let order_id = app.create_order(&token, "PayPal", "43.99").await;
    let uri = format!("/api/v1/orders/{order_id}/pay");

    let first = app
        .request(
            Method::PUT,
            &uri,
            Some(json!({ "paypal_order_id": "5O190127TN364715T" })),
            Some(&token),
        )
        .await;
    assert_eq!(first.status(), StatusCode::OK);

    let second = app
        .request(
            Method::PUT,
            &uri,
            Some(json!({ "paypal_order_id": "2GG903833H261305C" })),
            Some(&token),
        )
        .await;
    let (status, body) = read_json(second).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["message"].as_str().unwrap().contains("already paid"));
}

#[tokio::test]
async fn one_provider_proof_cannot_settle_two_orders() {
    let paypal = MockServer::start().await;
    mock_paypal_token(&paypal).await;
    mock_paypal_order(&paypal, "5O190127TN364715T", "COMPLETED", "43.99").await;

    let app = TestApp::with_providers(Some(paypal.uri()), None).await;
    let token = app.register("Nora", "nora@example.com", "password123").await;
    let first_order = app.create_order(&token, "PayPal", "43.99").await;
    let second_order = app.create_order(&token, "PayPal", "43.99").await;

    let finalize = json!({ "paypal_order_id": "5O190127TN364715T" });

    let response = app
        .request(
            Method::PUT,
            &format!("/api/v1/orders/{first_order}/pay"),
            Some(finalize.clone()),
            Some(&token),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    // The same capture satisfies the amount check for the second order, but
    // the transaction id is already recorded against the first.
    let response = app
        .request(
            Method::PUT,
            &format!("/api/v1/orders/{second_order}/pay"),
            Some(finalize),
            Some(&token),
        )
        .await;
    let (status, body) = read_json(response).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["message"]
        .as_str()
        .unwrap()
        .contains("already settles another order"));

    let response = app
        .request(
            Method::GET,
            &format!("/api/v1/orders/{second_order}"),
            None,
            Some(&token),
        )
        .await;
    let (_, body) = read_json(response).await;
    assert_eq!(body["data"]["is_paid"], false);
}

#[tokio::test]
async fn stripe_intent_requires_exact_amount() {
    let stripe = MockServer::start().await;
    let app = TestApp::with_providers(None, Some(stripe.uri())).await;
    let token = app.register("Nora", "nora@example.com", "password123").await;
    let order_id = app.create_order(&token, "Stripe", "43.99").await;

    // Client claims one cent less than the stored total
    let response = app
        .request(
            Method::POST,
            "/api/v1/orders/stripe/create-payment-intent",
            Some(json!({ "order_id": order_id, "amount": "43.98" })),
            Some(&token),
        )
        .await;
    let (status, body) = read_json(response).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"]
        .as_str()
        .unwrap()
        .contains("does not match order total"));
}

#[tokio::test]
async fn stripe_intent_creation_returns_client_secret() {
    let stripe = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/payment_intents"))
        .and(body_string_contains("amount=4399"))
        .and(body_string_contains("currency=usd"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(stripe_intent_json("pi_test_123", "requires_payment_method", 4399)),
        )
        .mount(&stripe)
        .await;

    let app = TestApp::with_providers(None, Some(stripe.uri())).await;
    let token = app.register("Nora", "nora@example.com", "password123").await;
    let order_id = app.create_order(&token, "Stripe", "43.99").await;

    let response = app
        .request(
            Method::POST,
            "/api/v1/orders/stripe/create-payment-intent",
            Some(json!({ "order_id": order_id, "amount": "43.99" })),
            Some(&token),
        )
        .await;
    let (status, body) = read_json(response).await;
    assert_eq!(status, StatusCode::OK, "intent creation failed: {body}");
    assert_eq!(body["data"]["client_secret"], "pi_test_123_secret_abc");
}

#[tokio::test]
async fn stripe_finalization_uses_account_email_when_receipt_has_none() {
    let stripe = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/payment_intents/pi_test_123"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(stripe_intent_json(
                "pi_test_123",
                "succeeded",
                4399,
            )),
        )
        .mount(&stripe)
        .await;

    let app = TestApp::with_providers(None, Some(stripe.uri())).await;
    let token = app.register("Nora", "nora@example.com", "password123").await;
    let order_id = app.create_order(&token, "Stripe", "43.99").await;

    let response = app
        .request(
            Method::PUT,
            &format!("/api/v1/orders/{order_id}/pay/stripe"),
            Some(json!({ "payment_intent_id": "pi_test_123" })),
            Some(&token),
        )
        .await;
    let (status, body) = read_json(response).await;
    assert_eq!(status, StatusCode::OK, "finalize failed: {body}");

    let receipt = &body["data"]["payment_receipt"];
    assert_eq!(receipt["transaction_id"], "pi_test_123");
    assert_eq!(receipt["status"], "succeeded");
    // Stripe reported no receipt email, so the account's email is recorded
    assert_eq!(receipt["payer_email"], "nora@example.com");
}

#[tokio::test]
async fn unsettled_stripe_intent_is_rejected() {
    let stripe = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/payment_intents/pi_test_123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(stripe_intent_json(
            "pi_test_123",
            "requires_payment_method",
            4399,
        )))
        .mount(&stripe)
        .await;

    let app = TestApp::with_providers(None, Some(stripe.uri())).await;
    let token = app.register("Nora", "nora@example.com", "password123").await;
    let order_id = app.create_order(&token, "Stripe", "43.99").await;

    let response = app
        .request(
            Method::PUT,
            &format!("/api/v1/orders/{order_id}/pay/stripe"),
            Some(json!({ "payment_intent_id": "pi_test_123" })),
            Some(&token),
        )
        .await;
    let (status, body) = read_json(response).await;
    assert_eq!(status, StatusCode::PAYMENT_REQUIRED);
    assert!(body["message"]
        .as_str()
        .unwrap()
        .contains("requires_payment_method"));
}

#[tokio::test]
async fn creating_an_intent_for_a_paid_order_is_invalid() {
    let paypal = MockServer::start().await;
    let stripe = MockServer::start().await;
    mock_paypal_token(&paypal).await;
    mock_paypal_order(&paypal, "5O190127TN364715T", "COMPLETED", "43.99").await;

    let app = TestApp::with_providers(Some(paypal.uri()), Some(stripe.uri())).await;
    let token = app.register("Nora", "nora@example.com", "password123").await;
    let order_id = app.create_order(&token, "PayPal", "43.99").await;

    let response = app
        .request(
            Method::PUT,
            &format!("/api/v1/orders/{order_id}/pay"),
            Some(json!({ "paypal_order_id": "5O190127TN364715T" })),
            Some(&token),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .request(
            Method::POST,
            "/api/v1/orders/stripe/create-payment-intent",
            Some(json!({ "order_id": order_id, "amount": "43.99" })),
            Some(&token),
        )
        .await;
    let (status, body) = read_json(response).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].as_str().unwrap().contains("already paid"));
}

#[tokio::test]
async fn finalizing_another_users_order_is_not_found() {
    let paypal = MockServer::start().await;
    mock_paypal_token(&paypal).await;
    mock_paypal_order(&paypal, "5O190127TN364715T", "COMPLETED", "43.99").await;

    let app = TestApp::with_providers(Some(paypal.uri()), None).await;
    let owner = app.register("Nora", "nora@example.com", "password123").await;
    let other = app.register("Sam", "sam@example.com", "password123").await;
    let order_id = app.create_order(&owner, "PayPal", "43.99").await;

    let response = app
        .request(
            Method::PUT,
            &format!("/api/v1/orders/{order_id}/pay"),
            Some(json!({ "paypal_order_id": "5O190127TN364715T" })),
            Some(&other),
        )
        .await;
    let (status, _) = read_json(response).await;
    // The response must not confirm the order id exists for another account
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn trusted_totals_are_validated_against_the_capture_not_the_client() {
    // Regression scenario: client claims 43.98 at intent time while the
    // order's stored total is 43.99; the stored total always wins.
    let stripe = MockServer::start().await;
    let app = TestApp::with_providers(None, Some(stripe.uri())).await;
    let token = app.register("Nora", "nora@example.com", "password123").await;

    let response = app
        .request(
            Method::POST,
            "/api/v1/orders",
            Some(order_payload("Stripe", "43.99")),
            Some(&token),
        )
        .await;
    let (status, body) = read_json(response).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["total_price"], "43.99");
}
