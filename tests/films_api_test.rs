mod common;

use axum::http::{Method, StatusCode};
use common::{read_json, TestApp};
use rust_decimal_macros::dec;
use serde_json::json;
use uuid::Uuid;

#[tokio::test]
async fn catalog_starts_empty() {
    let app = TestApp::new().await;

    let response = app.request(Method::GET, "/api/v1/films", None, None).await;
    let (status, body) = read_json(response).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["films"].as_array().unwrap().len(), 0);
    assert_eq!(body["data"]["pagination"]["total"], 0);
}

#[tokio::test]
async fn catalog_browsing_requires_no_auth_but_curation_does() {
    let app = TestApp::new().await;

    let film = json!({
        "title": "Tokyo Story",
        "director": "Yasujiro Ozu",
        "release_year": 1953,
        "price": "34.99",
        "stock": 20,
        "genres": ["Drama"]
    });

    let response = app
        .request(Method::POST, "/api/v1/films", Some(film.clone()), None)
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let token = app.register("Nora", "nora@example.com", "password123").await;
    let response = app
        .request(Method::POST, "/api/v1/films", Some(film), Some(&token))
        .await;
    let (status, body) = read_json(response).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["title"], "Tokyo Story");
    assert_eq!(body["data"]["price"], "34.99");

    // Anyone can read it back
    let id = body["data"]["id"].as_str().unwrap().to_string();
    let response = app
        .request(Method::GET, &format!("/api/v1/films/{id}"), None, None)
        .await;
    let (status, body) = read_json(response).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["director"], "Yasujiro Ozu");
}

#[tokio::test]
async fn duplicate_titles_are_rejected() {
    let app = TestApp::new().await;
    app.seed_film("Tokyo Story", dec!(34.99), 20).await;

    let token = app.register("Nora", "nora@example.com", "password123").await;
    let response = app
        .request(
            Method::POST,
            "/api/v1/films",
            Some(json!({
                "title": "Tokyo Story",
                "price": "29.99",
                "stock": 5
            })),
            Some(&token),
        )
        .await;

    let (status, body) = read_json(response).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].as_str().unwrap().contains("already exists"));
}

#[tokio::test]
async fn unknown_film_is_not_found() {
    let app = TestApp::new().await;

    let response = app
        .request(
            Method::GET,
            &format!("/api/v1/films/{}", Uuid::new_v4()),
            None,
            None,
        )
        .await;
    let (status, _) = read_json(response).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn featured_filter_narrows_the_list() {
    let app = TestApp::new().await;
    let token = app.register("Nora", "nora@example.com", "password123").await;

    app.seed_film("Seven Samurai", dec!(39.99), 25).await;
    let featured = app.seed_film("Stalker", dec!(36.99), 8).await;
    app.request(
        Method::PUT,
        &format!("/api/v1/films/{featured}"),
        Some(json!({ "featured": true })),
        Some(&token),
    )
    .await;

    let response = app
        .request(Method::GET, "/api/v1/films?featured=true", None, None)
        .await;
    let (status, body) = read_json(response).await;

    assert_eq!(status, StatusCode::OK);
    let films = body["data"]["films"].as_array().unwrap();
    assert_eq!(films.len(), 1);
    assert_eq!(films[0]["title"], "Stalker");
}

#[tokio::test]
async fn search_matches_title_case_insensitively() {
    let app = TestApp::new().await;
    app.seed_film("Seven Samurai", dec!(39.99), 25).await;
    app.seed_film("Tokyo Story", dec!(34.99), 20).await;

    let response = app
        .request(Method::GET, "/api/v1/films?search=samurai", None, None)
        .await;
    let (status, body) = read_json(response).await;

    assert_eq!(status, StatusCode::OK);
    let films = body["data"]["films"].as_array().unwrap();
    assert_eq!(films.len(), 1);
    assert_eq!(films[0]["title"], "Seven Samurai");
}

#[tokio::test]
async fn pagination_caps_the_page_size() {
    let app = TestApp::new().await;
    for i in 0..5 {
        app.seed_film(&format!("Film {i}"), dec!(19.99), 10).await;
    }

    let response = app
        .request(Method::GET, "/api/v1/films?page=1&limit=2", None, None)
        .await;
    let (status, body) = read_json(response).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["films"].as_array().unwrap().len(), 2);
    assert_eq!(body["data"]["pagination"]["total"], 5);
    assert_eq!(body["data"]["pagination"]["pages"], 3);
}

#[tokio::test]
async fn update_changes_only_the_given_fields() {
    let app = TestApp::new().await;
    let token = app.register("Nora", "nora@example.com", "password123").await;
    let id = app.seed_film("Stalker", dec!(36.99), 8).await;

    let response = app
        .request(
            Method::PUT,
            &format!("/api/v1/films/{id}"),
            Some(json!({ "stock": 3, "price": "41.99" })),
            Some(&token),
        )
        .await;
    let (status, body) = read_json(response).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["stock"], 3);
    assert_eq!(body["data"]["price"], "41.99");
    assert_eq!(body["data"]["title"], "Stalker");
}

#[tokio::test]
async fn delete_removes_the_film() {
    let app = TestApp::new().await;
    let token = app.register("Nora", "nora@example.com", "password123").await;
    let id = app.seed_film("Stalker", dec!(36.99), 8).await;

    let response = app
        .request(
            Method::DELETE,
            &format!("/api/v1/films/{id}"),
            None,
            Some(&token),
        )
        .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = app
        .request(Method::GET, &format!("/api/v1/films/{id}"), None, None)
        .await;
    let (status, _) = read_json(response).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
