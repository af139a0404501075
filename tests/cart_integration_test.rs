mod common;

use axum::http::{Method, StatusCode};
use common::{json_money, TestApp};
use emporium_api::entities::cart_item::MAX_QUANTITY;
use rust_decimal_macros::dec;
use serde_json::json;

#[tokio::test]
async fn first_visit_shows_an_empty_cart() {
    let app = TestApp::new().await;
    let (token, _) = app.register_customer("fresh@example.com").await;

    let (status, cart) = app.request(Method::GET, "/api/cart", None, Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cart["items"].as_array().map(Vec::len), Some(0));
    assert_eq!(json_money(&cart["total"]), dec!(0));
}

#[tokio::test]
async fn quantities_must_be_positive() {
    let app = TestApp::new().await;
    let (token, _) = app.register_customer("qty@example.com").await;
    let category = app.create_category("Pens").await;
    let pen = app.create_product(category, "Gel Pen", "2.25").await;

    for quantity in [0, -2] {
        let (status, _) = app
            .request(
                Method::POST,
                "/api/cart/items",
                Some(json!({ "product_id": pen, "quantity": quantity })),
                Some(&token),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "quantity {quantity}");
    }

    let line = app.add_to_cart(&token, pen, 4).await;
    let uri = format!("/api/cart/items/{}", line["id"].as_str().expect("line id"));

    let (status, _) = app
        .request(Method::PUT, &uri, Some(json!({ "quantity": 0 })), Some(&token))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, updated) = app
        .request(Method::PUT, &uri, Some(json!({ "quantity": 6 })), Some(&token))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["quantity"], 6);

    let (_, cart) = app.request(Method::GET, "/api/cart", None, Some(&token)).await;
    assert_eq!(json_money(&cart["total"]), dec!(13.50));
}

#[tokio::test]
async fn unknown_products_and_foreign_lines_are_not_found() {
    let app = TestApp::new().await;
    let (alice, _) = app.register_customer("alice-cart@example.com").await;
    let (bob, _) = app.register_customer("bob-cart@example.com").await;

    let (status, _) = app
        .request(
            Method::POST,
            "/api/cart/items",
            Some(json!({ "product_id": uuid::Uuid::new_v4(), "quantity": 1 })),
            Some(&alice),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let category = app.create_category("Lamps").await;
    let lamp = app.create_product(category, "Desk Lamp", "30.00").await;
    let line = app.add_to_cart(&alice, lamp, 1).await;
    let uri = format!("/api/cart/items/{}", line["id"].as_str().expect("line id"));

    let (status, _) = app
        .request(Method::PUT, &uri, Some(json!({ "quantity": 9 })), Some(&bob))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app.request(Method::DELETE, &uri, None, Some(&bob)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn clearing_keeps_the_cart_but_drops_every_line() {
    let app = TestApp::new().await;
    let (token, _) = app.register_customer("clear@example.com").await;

    let (status, _) = app.request(Method::DELETE, "/api/cart", None, Some(&token)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let category = app.create_category("Plants").await;
    let fern = app.create_product(category, "Boston Fern", "18.00").await;
    let cactus = app.create_product(category, "Tiny Cactus", "6.00").await;
    app.add_to_cart(&token, fern, 1).await;
    app.add_to_cart(&token, cactus, 2).await;

    let (status, _) = app.request(Method::DELETE, "/api/cart", None, Some(&token)).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, cart) = app.request(Method::GET, "/api/cart", None, Some(&token)).await;
    assert_eq!(cart["items"].as_array().map(Vec::len), Some(0));

    let line = app.add_to_cart(&token, fern, 1).await;
    assert_eq!(line["quantity"], 1);
}

#[tokio::test]
async fn oversized_quantities_are_rejected_and_the_cart_stays_readable() {
    let app = TestApp::new().await;
    let (token, _) = app.register_customer("bulk@example.com").await;
    let category = app.create_category("Hardware").await;
    let nail = app.create_product(category, "Steel Nail", "0.10").await;

    let (status, body) = app
        .request(
            Method::POST,
            "/api/cart/items",
            Some(json!({ "product_id": nail, "quantity": i32::MAX })),
            Some(&token),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "invalid_argument");

    let line = app.add_to_cart(&token, nail, MAX_QUANTITY).await;
    let (status, _) = app
        .request(
            Method::POST,
            "/api/cart/items",
            Some(json!({ "product_id": nail, "quantity": 1 })),
            Some(&token),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let uri = format!("/api/cart/items/{}", line["id"].as_str().expect("line id"));
    let (status, _) = app
        .request(
            Method::PUT,
            &uri,
            Some(json!({ "quantity": MAX_QUANTITY + 1 })),
            Some(&token),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, cart) = app.request(Method::GET, "/api/cart", None, Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cart["items"][0]["quantity"], MAX_QUANTITY);
}
