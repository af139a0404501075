use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Emporium API",
        version = "0.1.0",
        description = r#"
# Emporium storefront API

Accounts, a category/product catalog, per-user carts, order placement and
payment reconciliation.

## Authentication

Protected endpoints expect a JWT issued by `/api/auth/login` or
`/api/auth/register`:

```
Authorization: Bearer <token>
```

Catalog writes and order administration require the `admin` role.

## Errors

```json
{
  "error": "Not Found",
  "code": "not_found",
  "message": "Product not found",
  "timestamp": "2024-01-01T00:00:00Z"
}
```

## Pagination

`GET /api/products` and `GET /api/orders` accept `page` (from 1) and
`limit` (capped by configuration) and return `{ items, pagination }`.
        "#,
        license(name = "MIT", url = "https://opensource.org/licenses/MIT")
    ),
    servers((url = "http://localhost:8080", description = "Local development")),
    modifiers(&BearerSecurity),
    tags(
        (name = "Auth", description = "Registration and login"),
        (name = "Users", description = "Caller profile"),
        (name = "Addresses", description = "Caller address book"),
        (name = "Catalog", description = "Categories and products"),
        (name = "Cart", description = "Caller cart"),
        (name = "Orders", description = "Checkout and order administration"),
        (name = "Payments", description = "Payment intents and processor webhooks"),
        (name = "Health", description = "Health check endpoints")
    ),
    paths(
        crate::handlers::auth::register,
        crate::handlers::auth::login,

        crate::handlers::users::get_profile,
        crate::handlers::users::update_profile,
        crate::handlers::users::change_password,

        crate::handlers::addresses::list_addresses,
        crate::handlers::addresses::create_address,
        crate::handlers::addresses::update_address,
        crate::handlers::addresses::delete_address,

        crate::handlers::categories::list_categories,
        crate::handlers::categories::get_category,
        crate::handlers::categories::create_category,
        crate::handlers::categories::update_category,
        crate::handlers::categories::delete_category,

        crate::handlers::products::list_products,
        crate::handlers::products::get_product,
        crate::handlers::products::get_product_by_slug,
        crate::handlers::products::products_by_category,
        crate::handlers::products::create_product,
        crate::handlers::products::update_product,
        crate::handlers::products::delete_product,

        crate::handlers::cart::get_cart,
        crate::handlers::cart::add_item,
        crate::handlers::cart::update_item,
        crate::handlers::cart::remove_item,
        crate::handlers::cart::clear_cart,

        crate::handlers::orders::place_order,
        crate::handlers::orders::my_orders,
        crate::handlers::orders::get_order,
        crate::handlers::orders::cancel_order,
        crate::handlers::orders::list_orders,
        crate::handlers::orders::update_order_status,

        crate::handlers::payments::create_payment_intent,
        crate::handlers::payment_webhooks::payment_webhook,

        crate::handlers::health::health_check,
    ),
    components(
        schemas(
            crate::entities::user::Role,
            crate::entities::order::OrderStatus,
            crate::errors::ErrorResponse
        )
    )
)]
pub struct ApiDoc;

/// Registers the `Bearer` scheme referenced by protected paths
struct BearerSecurity;

impl Modify for BearerSecurity {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "Bearer",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

/// GET /api-docs/openapi.json
pub async fn openapi_json() -> axum::Json<utoipa::openapi::OpenApi> {
    axum::Json(ApiDoc::openapi())
}
