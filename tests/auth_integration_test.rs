//! Authentication and role gating through the full router.

mod common;

use axum::http::{Method, StatusCode};
use common::TestApp;
use serde_json::json;

#[tokio::test]
async fn register_then_login_issues_working_tokens() {
    let app = TestApp::new().await;
    let (token, user_id) = app.register_customer("Jane@Example.com").await;

    let (status, profile) = app
        .request(Method::GET, "/api/users/profile", None, Some(&token))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(profile["id"], user_id.to_string());
    assert_eq!(profile["email"], "jane@example.com");
    assert_eq!(profile["role"], "customer");
    assert!(profile.get("password_hash").is_none());

    let (status, body) = app
        .request(
            Method::POST,
            "/api/auth/login",
            Some(json!({ "email": "jane@example.com", "password": "secret-password" })),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["token"]["token_type"], "Bearer");
    assert!(body["token"]["access_token"].as_str().is_some());
}

#[tokio::test]
async fn duplicate_registration_is_rejected() {
    let app = TestApp::new().await;
    app.register_customer("dup@example.com").await;

    let (status, _) = app
        .request(
            Method::POST,
            "/api/auth/register",
            Some(json!({
                "email": "DUP@example.com",
                "password": "another-password",
                "name": "Second",
            })),
            None,
        )
        .await;
    assert!(status.is_client_error(), "got {status}");
}

#[tokio::test]
async fn wrong_password_is_unauthenticated() {
    let app = TestApp::new().await;
    app.register_customer("wrong@example.com").await;

    let (status, body) = app
        .request(
            Method::POST,
            "/api/auth/login",
            Some(json!({ "email": "wrong@example.com", "password": "not-it" })),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "unauthenticated");
}

#[tokio::test]
async fn missing_or_garbage_tokens_are_rejected() {
    let app = TestApp::new().await;

    let (status, _) = app.request(Method::GET, "/api/cart", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    for bad in ["not-a-jwt", "a.b.c", ""] {
        let (status, _) = app
            .request(Method::GET, "/api/cart", None, Some(bad))
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "token {bad:?}");
    }
}

#[tokio::test]
async fn customers_cannot_reach_admin_routes() {
    let app = TestApp::new().await;
    let (token, _) = app.register_customer("shopper@example.com").await;

    let (status, body) = app
        .request(
            Method::POST,
            "/api/categories",
            Some(json!({ "name": "Shoes", "slug": "shoes" })),
            Some(&token),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "permission_denied");

    let (status, _) = app
        .request(Method::GET, "/api/orders", None, Some(&token))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .request(Method::GET, "/api/orders", None, Some(app.admin_token()))
        .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn change_password_requires_the_current_one() {
    let app = TestApp::new().await;
    let (token, _) = app.register_customer("pw@example.com").await;

    let (status, _) = app
        .request(
            Method::PUT,
            "/api/users/change-password",
            Some(json!({ "current_password": "nope", "new_password": "fresh-password" })),
            Some(&token),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .request(
            Method::PUT,
            "/api/users/change-password",
            Some(json!({
                "current_password": "secret-password",
                "new_password": "fresh-password",
            })),
            Some(&token),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app
        .request(
            Method::POST,
            "/api/auth/login",
            Some(json!({ "email": "pw@example.com", "password": "fresh-password" })),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn addresses_are_private_to_their_owner() {
    let app = TestApp::new().await;
    let (alice, _) = app.register_customer("alice@example.com").await;
    let (bob, _) = app.register_customer("bob@example.com").await;

    let (status, address) = app
        .request(
            Method::POST,
            "/api/addresses",
            Some(json!({
                "address_line1": "1 Main St",
                "city": "Springfield",
                "state": "IL",
                "postal_code": "62701",
                "country": "US",
            })),
            Some(&alice),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{address}");
    let id = address["id"].as_str().expect("address id").to_string();

    let (status, _) = app
        .request(Method::DELETE, &format!("/api/addresses/{id}"), None, Some(&bob))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, list) = app
        .request(Method::GET, "/api/addresses", None, Some(&alice))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list.as_array().map(Vec::len), Some(1));

    let (status, _) = app
        .request(Method::DELETE, &format!("/api/addresses/{id}"), None, Some(&alice))
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
}
