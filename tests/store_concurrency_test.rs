//! SeaOrmStore race handling and checkout rollback against SQLite.

mod common;

use assert_matches::assert_matches;
use axum::http::{Method, StatusCode};
use common::TestApp;
use emporium_api::{
    entities::cart_item::{self, Variant},
    errors::ServiceError,
    models::OrderDraft,
    repositories::CommerceStore,
};
use serde_json::json;

#[tokio::test]
async fn concurrent_lazy_cart_creation_yields_one_cart() {
    let app = TestApp::new().await;
    let (_, user_id) = app.register_customer("cart-race@example.com").await;
    let store = app.store.clone();

    let (first, second) = tokio::join!(store.create_cart(user_id), store.create_cart(user_id));
    let first = first.expect("first create");
    let second = second.expect("second create");
    assert_eq!(first.id, second.id);

    let found = store
        .find_cart_by_user(user_id)
        .await
        .expect("lookup")
        .expect("cart");
    assert_eq!(found.id, first.id);
}

#[tokio::test]
async fn concurrent_adds_of_a_new_variant_share_one_line() {
    let app = TestApp::new().await;
    let (_, user_id) = app.register_customer("line-race@example.com").await;
    let category = app.create_category("Race").await;
    let product = app.create_product(category, "Race Tee", "10.00").await;

    let store = app.store.clone();
    let cart = store.create_cart(user_id).await.expect("cart");
    let variant = Variant::new(Some("M".to_string()), None);

    let (a, b) = tokio::join!(
        store.upsert_cart_item(cart.id, product, &variant, 2),
        store.upsert_cart_item(cart.id, product, &variant, 3),
    );
    a.expect("first add");
    b.expect("second add");

    let lines = store.cart_lines(cart.id).await.expect("lines");
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0].quantity, 5);
}

#[tokio::test]
async fn concurrent_first_adds_through_the_api_create_one_cart() {
    let app = TestApp::new().await;
    let (token, user_id) = app.register_customer("api-race@example.com").await;
    let category = app.create_category("Mugs").await;
    let mug = app.create_product(category, "Race Mug", "7.00").await;

    let body = json!({ "product_id": mug, "quantity": 1 });
    let ((first, _), (second, _)) = tokio::join!(
        app.request(Method::POST, "/api/cart/items", Some(body.clone()), Some(&token)),
        app.request(Method::POST, "/api/cart/items", Some(body), Some(&token)),
    );
    assert_eq!(first, StatusCode::OK);
    assert_eq!(second, StatusCode::OK);

    let cart = app
        .store
        .find_cart_by_user(user_id)
        .await
        .expect("lookup")
        .expect("cart");
    let lines = app.store.cart_lines(cart.id).await.expect("lines");
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0].quantity, 2);
}

#[tokio::test]
async fn checkout_rolls_back_when_cart_lines_vanish() {
    let app = TestApp::new().await;
    let (_, user_id) = app.register_customer("rollback@example.com").await;
    let category = app.create_category("Lamps").await;
    let lamp = app.create_product(category, "Floor Lamp", "60.00").await;
    let bulb = app.create_product(category, "Spare Bulb", "4.00").await;

    let store = app.store.clone();
    let cart = store.create_cart(user_id).await.expect("cart");
    let plain = Variant::new(None, None);
    store
        .upsert_cart_item(cart.id, lamp, &plain, 1)
        .await
        .expect("lamp");
    store
        .upsert_cart_item(cart.id, bulb, &plain, 4)
        .await
        .expect("bulb");

    let lines = store.cart_lines(cart.id).await.expect("lines");
    let draft = OrderDraft::from_cart_lines(user_id, cart.id, &lines).expect("draft");

    // another checkout consumed one line after the draft was taken
    store
        .delete_cart_item(lines[0].id)
        .await
        .expect("delete line");

    assert_matches!(
        store.create_order_with_items(&draft).await,
        Err(ServiceError::InvalidState(_))
    );
    assert!(store
        .list_orders_for_user(user_id)
        .await
        .expect("orders")
        .is_empty());

    let remaining = store.cart_lines(cart.id).await.expect("lines");
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].id, lines[1].id);
}

#[tokio::test]
async fn increments_past_the_line_cap_leave_the_line_intact() {
    let app = TestApp::new().await;
    let (_, user_id) = app.register_customer("cap@example.com").await;
    let category = app.create_category("Bulk").await;
    let screws = app.create_product(category, "Wood Screw", "0.05").await;

    let store = app.store.clone();
    let cart = store.create_cart(user_id).await.expect("cart");
    let plain = Variant::new(None, None);
    store
        .upsert_cart_item(cart.id, screws, &plain, cart_item::MAX_QUANTITY)
        .await
        .expect("fill line");

    assert_matches!(
        store.upsert_cart_item(cart.id, screws, &plain, 1).await,
        Err(ServiceError::InvalidArgument(_))
    );

    let lines = store.cart_lines(cart.id).await.expect("lines");
    assert_eq!(lines[0].quantity, cart_item::MAX_QUANTITY);
}
