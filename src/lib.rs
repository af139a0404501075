//! Emporium API Library
//!
//! Storefront backend: accounts, catalog, carts, checkout and payment
//! reconciliation behind an axum router.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

// Core modules
pub mod auth;
pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod handlers;
pub mod middleware_helpers;
pub mod migrator;
pub mod models;
pub mod openapi;
pub mod repositories;
pub mod services;
pub mod telemetry;
pub mod webhooks;

use std::sync::Arc;

use axum::{
    extract::{DefaultBodyLimit, Request, State},
    http::{HeaderValue, StatusCode},
    middleware::Next,
    routing::{get, post, put},
    Router,
};
use sea_orm::DatabaseConnection;
use tower_http::{
    cors::{Any, CorsLayer},
    limit::RequestBodyLimitLayer,
    timeout::TimeoutLayer,
};
use tracing::{info, warn};

use crate::auth::{AuthRouterExt, AuthService};
use crate::entities::Role;

// App state definition
#[derive(Clone)]
pub struct AppState {
    /// Absent when the services run over a non-relational store
    pub db: Option<Arc<DatabaseConnection>>,
    pub config: config::AppConfig,
    pub services: handlers::AppServices,
}

/// Every `/api` route, grouped by the guard in front of it
pub fn api_routes() -> Router<AppState> {
    use handlers::{
        addresses, auth, cart, categories, orders, payment_webhooks, payments, products, users,
    };

    let public = Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        // signature-verified instead of authenticated
        .route("/webhook", post(payment_webhooks::payment_webhook));

    let account = Router::new()
        .route(
            "/users/profile",
            get(users::get_profile).put(users::update_profile),
        )
        .route("/users/change-password", put(users::change_password))
        .route(
            "/addresses",
            get(addresses::list_addresses).post(addresses::create_address),
        )
        .route(
            "/addresses/{id}",
            put(addresses::update_address).delete(addresses::delete_address),
        )
        .with_auth();

    let catalog_read = Router::new()
        .route("/categories", get(categories::list_categories))
        .route("/categories/{id}", get(categories::get_category))
        .route("/products", get(products::list_products))
        .route("/products/{id}", get(products::get_product))
        .route("/products/slug/{slug}", get(products::get_product_by_slug))
        .route(
            "/products/category/{id}",
            get(products::products_by_category),
        )
        .with_auth();

    let catalog_admin = Router::new()
        .route("/categories", post(categories::create_category))
        .route(
            "/categories/{id}",
            put(categories::update_category).delete(categories::delete_category),
        )
        .route("/products", post(products::create_product))
        .route(
            "/products/{id}",
            put(products::update_product).delete(products::delete_product),
        )
        .with_role(Role::Admin);

    let shopping = Router::new()
        .route("/cart", get(cart::get_cart).delete(cart::clear_cart))
        .route("/cart/items", post(cart::add_item))
        .route(
            "/cart/items/{id}",
            put(cart::update_item).delete(cart::remove_item),
        )
        .route("/orders", post(orders::place_order))
        .route("/orders/mine", get(orders::my_orders))
        .route("/orders/{id}", get(orders::get_order))
        .route("/orders/{id}/cancel", post(orders::cancel_order))
        .route(
            "/payments/create-intent",
            post(payments::create_payment_intent),
        )
        .with_auth();

    let orders_admin = Router::new()
        .route("/orders", get(orders::list_orders))
        .route("/orders/{id}/status", put(orders::update_order_status))
        .with_role(Role::Admin);

    Router::new()
        .merge(public)
        .merge(account)
        .merge(catalog_read)
        .merge(catalog_admin)
        .merge(shopping)
        .merge(orders_admin)
}

/// CORS from configured origins; permissive only in development.
fn cors_layer(cfg: &config::AppConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = cfg
        .cors_origins()
        .iter()
        .filter_map(|origin| HeaderValue::from_str(origin).ok())
        .collect();

    if !origins.is_empty() {
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    } else if cfg.is_development() {
        info!("Using permissive CORS because no origins are configured (development environment)");
        CorsLayer::permissive()
    } else {
        // config validation rejects this outside development
        warn!("No CORS origins configured; cross-origin requests will be refused");
        CorsLayer::new()
    }
}

/// Puts the shared [`AuthService`] where `auth_middleware` looks for it
async fn inject_auth_service(
    State(auth): State<Arc<AuthService>>,
    mut req: Request,
    next: Next,
) -> axum::response::Response {
    req.extensions_mut().insert(auth);
    next.run(req).await
}

/// Full application router with the ambient layer stack applied.
pub fn build_router(state: AppState) -> Router {
    let cfg = &state.config;

    Router::<AppState>::new()
        .route("/", get(|| async { "emporium-api up" }))
        .route("/health", get(handlers::health::health_check))
        .route("/api-docs/openapi.json", get(openapi::openapi_json))
        .nest("/api", api_routes())
        // HTTP tracing layer for consistent request/response telemetry
        .layer(telemetry::configure_http_tracing())
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            cfg.request_timeout(),
        ))
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(cfg.max_body_size))
        .layer(cors_layer(cfg))
        // Inject AuthService into request extensions for auth middleware
        .layer(axum::middleware::from_fn_with_state(
            state.services.auth.clone(),
            inject_auth_service,
        ))
        // Ensure every request carries a request id for traceability
        .layer(axum::middleware::from_fn(
            middleware_helpers::request_id::request_id_middleware,
        ))
        .with_state(state)
}
