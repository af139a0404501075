#![allow(dead_code)]

use std::str::FromStr;
use std::sync::Arc;

use axum::{
    body::{self, Body},
    http::{Method, Request, StatusCode},
    Router,
};
use chrono::Utc;
use emporium_api::{
    auth::{hash_password, AuthConfig, AuthService},
    build_router,
    config::AppConfig,
    db::{self, DbConfig},
    entities::{user, Role},
    errors::ServiceError,
    handlers::AppServices,
    repositories::{AccountStore, SeaOrmStore},
    services::payment_processor::{PaymentIntentRequest, PaymentProcessor, ProcessorIntent},
    AppState,
};
use rust_decimal::Decimal;
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

pub const JWT_SECRET: &str = "k3y-f0r-integration-tests-Qw8rT5yU2iO9pL";
pub const WEBHOOK_SECRET: &str = "whsec_integration_tests";

mockall::mock! {
    pub Processor {}

    #[async_trait::async_trait]
    impl PaymentProcessor for Processor {
        async fn create_payment_intent(
            &self,
            request: PaymentIntentRequest,
        ) -> Result<ProcessorIntent, ServiceError>;
    }
}

/// Processor that hands out a fresh intent for every request
pub fn accepting_processor() -> MockProcessor {
    let mut processor = MockProcessor::new();
    processor.expect_create_payment_intent().returning(|_| {
        let id = format!("pi_{}", Uuid::new_v4().simple());
        Ok(ProcessorIntent {
            client_secret: format!("{id}_secret"),
            id,
        })
    });
    processor
}

/// Full router over a private in-memory SQLite database.
pub struct TestApp {
    router: Router,
    pub state: AppState,
    pub store: Arc<SeaOrmStore>,
    admin_token: String,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_processor(accepting_processor()).await
    }

    pub async fn with_processor(processor: impl PaymentProcessor + 'static) -> Self {
        let mut cfg = AppConfig::new(
            "sqlite::memory:".to_string(),
            JWT_SECRET.to_string(),
            "development".to_string(),
        );
        cfg.payment_webhook_secret = Some(WEBHOOK_SECRET.to_string());

        let pool = db::establish_connection_with_config(&DbConfig::sqlite_in_memory())
            .await
            .expect("failed to open test database");
        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations in tests");

        let db_arc = Arc::new(pool);
        let store = Arc::new(SeaOrmStore::new(db_arc.clone()));
        let auth_service = Arc::new(AuthService::new(AuthConfig::from(&cfg)));
        let services =
            AppServices::new(store.clone(), Arc::new(processor), auth_service.clone(), &cfg);

        let state = AppState {
            db: Some(db_arc),
            config: cfg,
            services,
        };
        let router = build_router(state.clone());

        // Registration only ever creates customers, so the admin is seeded directly.
        let now = Utc::now();
        let admin = store
            .create_user(user::Model {
                id: Uuid::new_v4(),
                email: "admin@example.com".to_string(),
                password_hash: hash_password("admin-password").expect("hash admin password"),
                name: "Admin".to_string(),
                role: Role::Admin,
                created_at: now,
                updated_at: now,
            })
            .await
            .expect("seed admin user");
        let admin_token = auth_service
            .issue_token(&admin)
            .expect("issue admin token")
            .access_token;

        Self {
            router,
            state,
            store,
            admin_token,
        }
    }

    pub fn admin_token(&self) -> &str {
        &self.admin_token
    }

    /// Send a request against the router with an optional bearer token.
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);

        if let Some(tok) = token {
            builder = builder.header("authorization", format!("Bearer {}", tok));
        }

        let body = if let Some(json) = body {
            builder = builder.header("content-type", "application/json");
            Body::from(serde_json::to_vec(&json).expect("failed to serialize json request body"))
        } else {
            Body::empty()
        };

        let request = builder.body(body).expect("failed to build request");
        self.send(request).await
    }

    /// Send a prepared request and decode the JSON body (`Null` when empty).
    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("router error during test request");
        let status = response.status();
        let bytes = body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("response body bytes");
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).expect("json response")
        };
        (status, json)
    }

    /// Registers a customer and returns its bearer token and id.
    pub async fn register_customer(&self, email: &str) -> (String, Uuid) {
        let (status, body) = self
            .request(
                Method::POST,
                "/api/auth/register",
                Some(json!({
                    "email": email,
                    "password": "secret-password",
                    "name": "Test Customer",
                })),
                None,
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "register failed: {body}");

        let token = body["token"]["access_token"]
            .as_str()
            .expect("access token")
            .to_string();
        let id = Uuid::parse_str(body["user"]["id"].as_str().expect("user id")).expect("uuid");
        (token, id)
    }

    pub async fn create_category(&self, name: &str) -> Uuid {
        let (status, body) = self
            .request(
                Method::POST,
                "/api/categories",
                Some(json!({ "name": name, "slug": slugify(name) })),
                Some(self.admin_token()),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "create category failed: {body}");
        json_uuid(&body["id"])
    }

    pub async fn create_product(&self, category_id: Uuid, name: &str, price: &str) -> Uuid {
        let (status, body) = self
            .request(
                Method::POST,
                "/api/products",
                Some(json!({
                    "name": name,
                    "slug": slugify(name),
                    "price": price,
                    "stock": 25,
                    "sizes": ["S", "M", "L"],
                    "category_id": category_id,
                })),
                Some(self.admin_token()),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "create product failed: {body}");
        json_uuid(&body["id"])
    }

    pub async fn add_to_cart(&self, token: &str, product_id: Uuid, quantity: i32) -> Value {
        let (status, body) = self
            .request(
                Method::POST,
                "/api/cart/items",
                Some(json!({ "product_id": product_id, "quantity": quantity })),
                Some(token),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "add to cart failed: {body}");
        body
    }

    pub async fn place_order(&self, token: &str) -> Value {
        let (status, body) = self
            .request(Method::POST, "/api/orders", None, Some(token))
            .await;
        assert_eq!(status, StatusCode::CREATED, "place order failed: {body}");
        body
    }
}

pub fn slugify(name: &str) -> String {
    name.to_lowercase().replace(' ', "-")
}

pub fn json_uuid(value: &Value) -> Uuid {
    Uuid::parse_str(value.as_str().expect("uuid string")).expect("valid uuid")
}

/// Money fields serialize as strings; compare them at cent precision.
pub fn json_money(value: &Value) -> Decimal {
    let raw = match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    Decimal::from_str(&raw).expect("decimal").round_dp(2)
}
