mod common;

use axum::http::{Method, StatusCode};
use common::{read_json, TestApp};
use serde_json::json;

#[tokio::test]
async fn registration_returns_a_token_and_profile() {
    let app = TestApp::new().await;

    let response = app
        .request(
            Method::POST,
            "/api/v1/auth/register",
            Some(json!({
                "name": "Nora",
                "email": "nora@example.com",
                "password": "password123"
            })),
            None,
        )
        .await;

    let (status, body) = read_json(response).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["success"], true);
    assert!(body["data"]["token"].as_str().is_some());
    assert_eq!(body["data"]["user"]["email"], "nora@example.com");
    assert_eq!(body["data"]["user"]["name"], "Nora");
    // Password material never appears in responses
    assert!(body["data"]["user"].get("password_hash").is_none());
}

#[tokio::test]
async fn duplicate_email_conflicts() {
    let app = TestApp::new().await;
    app.register("Nora", "nora@example.com", "password123").await;

    let response = app
        .request(
            Method::POST,
            "/api/v1/auth/register",
            Some(json!({
                "name": "Other Nora",
                "email": "nora@example.com",
                "password": "different456"
            })),
            None,
        )
        .await;

    let (status, body) = read_json(response).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["message"].as_str().unwrap().contains("already"));
}

#[tokio::test]
async fn registration_validates_input() {
    let app = TestApp::new().await;

    let response = app
        .request(
            Method::POST,
            "/api/v1/auth/register",
            Some(json!({
                "name": "Nora",
                "email": "not-an-email",
                "password": "short"
            })),
            None,
        )
        .await;

    let (status, _) = read_json(response).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn login_succeeds_with_correct_credentials() {
    let app = TestApp::new().await;
    app.register("Nora", "nora@example.com", "password123").await;

    let response = app
        .request(
            Method::POST,
            "/api/v1/auth/login",
            Some(json!({
                "email": "nora@example.com",
                "password": "password123"
            })),
            None,
        )
        .await;

    let (status, body) = read_json(response).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["data"]["token"].as_str().is_some());
}

#[tokio::test]
async fn login_rejects_a_wrong_password() {
    let app = TestApp::new().await;
    app.register("Nora", "nora@example.com", "password123").await;

    let response = app
        .request(
            Method::POST,
            "/api/v1/auth/login",
            Some(json!({
                "email": "nora@example.com",
                "password": "wrong-password"
            })),
            None,
        )
        .await;

    let (status, _) = read_json(response).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn login_does_not_reveal_whether_the_account_exists() {
    let app = TestApp::new().await;
    app.register("Nora", "nora@example.com", "password123").await;

    let wrong_password = app
        .request(
            Method::POST,
            "/api/v1/auth/login",
            Some(json!({
                "email": "nora@example.com",
                "password": "wrong-password"
            })),
            None,
        )
        .await;
    let (_, wrong_password_body) = read_json(wrong_password).await;

    let unknown_account = app
        .request(
            Method::POST,
            "/api/v1/auth/login",
            Some(json!({
                "email": "nobody@example.com",
                "password": "password123"
            })),
            None,
        )
        .await;
    let (status, unknown_account_body) = read_json(unknown_account).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong_password_body["message"], unknown_account_body["message"]);
}

#[tokio::test]
async fn protected_endpoints_require_a_token() {
    let app = TestApp::new().await;

    let response = app
        .request(Method::GET, "/api/v1/orders/myorders", None, None)
        .await;
    let (status, _) = read_json(response).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let response = app
        .request(Method::GET, "/api/v1/cart", None, Some("not-a-real-token"))
        .await;
    let (status, _) = read_json(response).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn health_and_status_endpoints_respond() {
    let app = TestApp::new().await;

    let response = app.request(Method::GET, "/api/v1/status", None, None).await;
    let (status, body) = read_json(response).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["service"], "framevault-api");

    let response = app.request(Method::GET, "/api/v1/health", None, None).await;
    let (status, body) = read_json(response).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["checks"]["database"], "healthy");
}

#[tokio::test]
async fn responses_carry_a_request_id() {
    let app = TestApp::new().await;

    let response = app.request(Method::GET, "/api/v1/status", None, None).await;
    assert!(response.headers().get("x-request-id").is_some());

    let (_, body) = read_json(response).await;
    assert!(body["meta"]["request_id"].as_str().is_some());
}
