//! Cart to order checkout against SQLite, including the admin status machine.

mod common;

use axum::http::{Method, StatusCode};
use common::{json_money, json_uuid, TestApp};
use rust_decimal_macros::dec;
use serde_json::json;

#[tokio::test]
async fn checkout_snapshots_prices_and_empties_the_cart() {
    let app = TestApp::new().await;
    let (token, user_id) = app.register_customer("checkout@example.com").await;
    let category = app.create_category("Shirts").await;
    let tee = app.create_product(category, "Plain Tee", "19.99").await;
    let cap = app.create_product(category, "Logo Cap", "5.00").await;

    app.add_to_cart(&token, tee, 2).await;
    app.add_to_cart(&token, cap, 1).await;

    let (status, cart) = app.request(Method::GET, "/api/cart", None, Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json_money(&cart["total"]), dec!(44.98));

    let order = app.place_order(&token).await;
    assert_eq!(json_uuid(&order["user_id"]), user_id);
    assert_eq!(order["status"], "pending");
    assert_eq!(json_money(&order["total"]), dec!(44.98));
    assert_eq!(order["items"].as_array().map(Vec::len), Some(2));

    // later price changes do not touch the placed order
    let (status, _) = app
        .request(
            Method::PUT,
            &format!("/api/products/{tee}"),
            Some(json!({ "price": "99.00" })),
            Some(app.admin_token()),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let order_id = order["id"].as_str().expect("order id");
    let (status, fetched) = app
        .request(Method::GET, &format!("/api/orders/{order_id}"), None, Some(&token))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json_money(&fetched["total"]), dec!(44.98));
    let tee_line = fetched["items"]
        .as_array()
        .and_then(|items| items.iter().find(|i| json_uuid(&i["product_id"]) == tee))
        .expect("tee line");
    assert_eq!(json_money(&tee_line["unit_price"]), dec!(19.99));

    let (_, cart) = app.request(Method::GET, "/api/cart", None, Some(&token)).await;
    assert_eq!(cart["items"].as_array().map(Vec::len), Some(0));
}

#[tokio::test]
async fn discount_price_wins_at_checkout() {
    let app = TestApp::new().await;
    let (token, _) = app.register_customer("discount@example.com").await;
    let category = app.create_category("Sale").await;
    let product = app.create_product(category, "Clearance Hoodie", "40.00").await;

    let (status, _) = app
        .request(
            Method::PUT,
            &format!("/api/products/{product}"),
            Some(json!({ "discount_price": "30.00" })),
            Some(app.admin_token()),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    app.add_to_cart(&token, product, 3).await;
    let order = app.place_order(&token).await;
    assert_eq!(json_money(&order["total"]), dec!(90.00));
}

#[tokio::test]
async fn empty_or_missing_cart_cannot_be_checked_out() {
    let app = TestApp::new().await;
    let (token, _) = app.register_customer("empty@example.com").await;

    // no cart yet
    let (status, body) = app.request(Method::POST, "/api/orders", None, Some(&token)).await;
    assert_eq!(status, StatusCode::NOT_FOUND, "{body}");

    let category = app.create_category("Socks").await;
    let socks = app.create_product(category, "Wool Socks", "8.50").await;
    let line = app.add_to_cart(&token, socks, 1).await;
    let line_id = line["id"].as_str().expect("line id");

    let (status, _) = app
        .request(Method::DELETE, &format!("/api/cart/items/{line_id}"), None, Some(&token))
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, body) = app.request(Method::POST, "/api/orders", None, Some(&token)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "invalid_state");

    let (_, mine) = app.request(Method::GET, "/api/orders/mine", None, Some(&token)).await;
    assert_eq!(mine.as_array().map(Vec::len), Some(0));
}

#[tokio::test]
async fn same_variant_accumulates_and_other_variants_get_their_own_line() {
    let app = TestApp::new().await;
    let (token, _) = app.register_customer("variants@example.com").await;
    let category = app.create_category("Jackets").await;
    let jacket = app.create_product(category, "Rain Jacket", "120.00").await;

    for (size, quantity) in [("M", 1), ("M", 2), ("L", 1)] {
        let (status, _) = app
            .request(
                Method::POST,
                "/api/cart/items",
                Some(json!({ "product_id": jacket, "quantity": quantity, "size": size })),
                Some(&token),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
    }

    let (_, cart) = app.request(Method::GET, "/api/cart", None, Some(&token)).await;
    let items = cart["items"].as_array().expect("items");
    assert_eq!(items.len(), 2);
    let medium = items.iter().find(|i| i["size"] == "M").expect("M line");
    assert_eq!(medium["quantity"], 3);
}

#[tokio::test]
async fn other_users_orders_are_invisible() {
    let app = TestApp::new().await;
    let (owner, _) = app.register_customer("owner@example.com").await;
    let (stranger, _) = app.register_customer("stranger@example.com").await;
    let category = app.create_category("Bags").await;
    let bag = app.create_product(category, "Tote Bag", "15.00").await;

    app.add_to_cart(&owner, bag, 1).await;
    let order = app.place_order(&owner).await;
    let order_id = order["id"].as_str().expect("order id");

    let (status, _) = app
        .request(Method::GET, &format!("/api/orders/{order_id}"), None, Some(&stranger))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app
        .request(
            Method::POST,
            &format!("/api/orders/{order_id}/cancel"),
            None,
            Some(&stranger),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn admin_status_changes_follow_the_state_machine() {
    let app = TestApp::new().await;
    let (token, _) = app.register_customer("admin-flow@example.com").await;
    let category = app.create_category("Mugs").await;
    let mug = app.create_product(category, "Enamel Mug", "12.00").await;
    app.add_to_cart(&token, mug, 1).await;
    let order = app.place_order(&token).await;
    let status_uri = format!("/api/orders/{}/status", order["id"].as_str().expect("id"));

    // paid is reserved for payment confirmation
    let (status, _) = app
        .request(
            Method::PUT,
            &status_uri,
            Some(json!({ "status": "paid" })),
            Some(app.admin_token()),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .request(
            Method::PUT,
            &status_uri,
            Some(json!({ "status": "shipped" })),
            Some(app.admin_token()),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .request(
            Method::PUT,
            &status_uri,
            Some(json!({ "status": "teleported" })),
            Some(app.admin_token()),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, canceled) = app
        .request(
            Method::PUT,
            &status_uri,
            Some(json!({ "status": "canceled" })),
            Some(app.admin_token()),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(canceled["status"], "canceled");

    let (status, page) = app
        .request(Method::GET, "/api/orders?page=1&limit=5", None, Some(app.admin_token()))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["pagination"]["total"], 1);
    assert_eq!(page["items"][0]["status"], "canceled");
}

#[tokio::test]
async fn customer_can_cancel_only_pending_orders() {
    let app = TestApp::new().await;
    let (token, _) = app.register_customer("cancel@example.com").await;
    let category = app.create_category("Hats").await;
    let hat = app.create_product(category, "Bucket Hat", "22.00").await;
    app.add_to_cart(&token, hat, 1).await;
    let order = app.place_order(&token).await;
    let cancel_uri = format!("/api/orders/{}/cancel", order["id"].as_str().expect("id"));

    let (status, body) = app.request(Method::POST, &cancel_uri, None, Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "canceled");

    let (status, _) = app.request(Method::POST, &cancel_uri, None, Some(&token)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
