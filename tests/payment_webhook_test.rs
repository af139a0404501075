//! Payment intents and signed webhook reconciliation through the router.

mod common;

use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
};
use chrono::Utc;
use common::{json_money, MockProcessor, TestApp, WEBHOOK_SECRET};
use emporium_api::{
    services::payment_processor::ProcessorIntent,
    webhooks::{sign_payload, SIGNATURE_HEADER},
};
use rust_decimal_macros::dec;
use serde_json::{json, Value};

fn succeeded_event(event_id: &str, intent_id: &str, order_id: Option<&str>) -> Vec<u8> {
    let metadata = match order_id {
        Some(id) => json!({ "order_id": id }),
        None => json!({}),
    };
    serde_json::to_vec(&json!({
        "id": event_id,
        "type": "payment_intent.succeeded",
        "data": { "object": { "id": intent_id, "metadata": metadata } }
    }))
    .expect("event json")
}

fn webhook_request(payload: Vec<u8>, signature: &str) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri("/api/webhook")
        .header("content-type", "application/json")
        .header(SIGNATURE_HEADER, signature)
        .body(Body::from(payload))
        .expect("webhook request")
}

fn signed(payload: Vec<u8>) -> Request<Body> {
    let signature = sign_payload(&payload, WEBHOOK_SECRET, Utc::now().timestamp());
    webhook_request(payload, &signature)
}

/// Customer with one pending order for a single 25.50 item
async fn pending_order(app: &TestApp) -> (String, Value) {
    let (token, _) = app.register_customer("payer@example.com").await;
    let category = app.create_category("Prints").await;
    let print = app.create_product(category, "Poster Print", "25.50").await;
    app.add_to_cart(&token, print, 1).await;
    let order = app.place_order(&token).await;
    (token, order)
}

async fn order_status(app: &TestApp, token: &str, order_id: &str) -> Value {
    let (status, order) = app
        .request(Method::GET, &format!("/api/orders/{order_id}"), None, Some(token))
        .await;
    assert_eq!(status, StatusCode::OK);
    order["status"].clone()
}

#[tokio::test]
async fn create_intent_for_an_order_leaves_the_order_untouched() {
    let mut processor = MockProcessor::new();
    processor
        .expect_create_payment_intent()
        .withf(|req| req.amount_minor == 2550 && req.currency == "usd" && req.order_id.is_some())
        .times(1)
        .returning(|_| {
            Ok(ProcessorIntent {
                id: "pi_order".to_string(),
                client_secret: "pi_order_secret".to_string(),
            })
        });
    let app = TestApp::with_processor(processor).await;
    let (token, order) = pending_order(&app).await;

    let (status, body) = app
        .request(
            Method::POST,
            "/api/payments/create-intent",
            Some(json!({ "amount": "25.50", "order_id": order["id"] })),
            Some(&token),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["client_secret"], "pi_order_secret");
    assert_eq!(body["amount_minor"], 2550);

    let order_id = order["id"].as_str().expect("order id");
    let (_, fetched) = app
        .request(Method::GET, &format!("/api/orders/{order_id}"), None, Some(&token))
        .await;
    assert!(fetched["payment_intent_id"].is_null());
    assert_eq!(fetched["status"], "pending");
}

#[tokio::test]
async fn create_intent_rejects_bad_amounts() {
    let app = TestApp::new().await;
    let (token, order) = pending_order(&app).await;

    for amount in ["0", "-3.00", "0.001"] {
        let (status, _) = app
            .request(
                Method::POST,
                "/api/payments/create-intent",
                Some(json!({ "amount": amount })),
                Some(&token),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "amount {amount}");
    }

    let (status, _) = app
        .request(
            Method::POST,
            "/api/payments/create-intent",
            Some(json!({ "amount": "1.00", "order_id": order["id"] })),
            Some(&token),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn signed_webhook_marks_the_order_paid_exactly_once() {
    let app = TestApp::new().await;
    let (token, order) = pending_order(&app).await;
    let order_id = order["id"].as_str().expect("order id").to_string();
    let payload = succeeded_event("evt_1", "pi_1", Some(&order_id));

    let (status, ack) = app.send(signed(payload.clone())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ack["received"], true);
    assert_eq!(order_status(&app, &token, &order_id).await, "paid");

    // redelivery is acknowledged without another transition
    let (status, _) = app.send(signed(payload)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(order_status(&app, &token, &order_id).await, "paid");

    let (_, fetched) = app
        .request(Method::GET, &format!("/api/orders/{order_id}"), None, Some(&token))
        .await;
    assert_eq!(fetched["payment_intent_id"], "pi_1");
    assert_eq!(json_money(&fetched["total"]), dec!(25.50));
}

#[tokio::test]
async fn tampered_or_unsigned_webhooks_change_nothing() {
    let app = TestApp::new().await;
    let (token, order) = pending_order(&app).await;
    let order_id = order["id"].as_str().expect("order id").to_string();

    let payload = succeeded_event("evt_2", "pi_2", Some(&order_id));
    let signature = sign_payload(&payload, "whsec_someone_else", Utc::now().timestamp());
    let (status, body) = app.send(webhook_request(payload.clone(), &signature)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "unauthenticated");

    let stale = sign_payload(&payload, WEBHOOK_SECRET, Utc::now().timestamp() - 3_600);
    let (status, _) = app.send(webhook_request(payload.clone(), &stale)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = app.send(webhook_request(payload, "")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "unauthenticated");

    // valid signature over different bytes
    let original = succeeded_event("evt_3", "pi_3", Some(&order_id));
    let signature = sign_payload(&original, WEBHOOK_SECRET, Utc::now().timestamp());
    let mut forged = original.clone();
    forged.extend_from_slice(b" ");
    let (status, _) = app.send(webhook_request(forged, &signature)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    assert_eq!(order_status(&app, &token, &order_id).await, "pending");
}

#[tokio::test]
async fn uncorrelated_events_are_rejected_and_unknown_types_ignored() {
    let app = TestApp::new().await;

    let (status, _) = app.send(signed(succeeded_event("evt_4", "pi_4", None))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let unknown_order = uuid::Uuid::new_v4().to_string();
    let (status, _) = app
        .send(signed(succeeded_event("evt_5", "pi_5", Some(&unknown_order))))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let refund = serde_json::to_vec(&json!({
        "id": "evt_6",
        "type": "charge.refunded",
        "data": { "object": { "id": "ch_1" } }
    }))
    .expect("event json");
    let (status, ack) = app.send(signed(refund)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ack["received"], true);
}

#[tokio::test]
async fn payment_for_a_canceled_order_leaves_it_canceled() {
    let app = TestApp::new().await;
    let (token, order) = pending_order(&app).await;
    let order_id = order["id"].as_str().expect("order id").to_string();

    let (status, _) = app
        .request(
            Method::POST,
            &format!("/api/orders/{order_id}/cancel"),
            None,
            Some(&token),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app
        .send(signed(succeeded_event("evt_7", "pi_7", Some(&order_id))))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(order_status(&app, &token, &order_id).await, "canceled");
}
