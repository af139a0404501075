use axum::{
    extract::{Path, State},
    response::Response,
    Json,
};
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::errors::ServiceError;
use crate::handlers::common::no_content_response;
use crate::models::CartLine;
use crate::services::cart::{AddItemInput, CartView, UpdateItemInput};
use crate::AppState;

#[utoipa::path(
    get,
    path = "/api/cart",
    responses((status = 200, description = "Caller's cart with a rounded total", body = CartView)),
    security(("Bearer" = [])),
    tag = "Cart"
)]
pub async fn get_cart(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> Result<Json<CartView>, ServiceError> {
    Ok(Json(state.services.carts.get_cart(auth_user.user_id).await?))
}

/// Add a product, or more of it, to the caller's cart
#[utoipa::path(
    post,
    path = "/api/cart/items",
    request_body = AddItemInput,
    responses(
        (status = 200, description = "Resulting cart line", body = CartLine),
        (status = 400, description = "Invalid quantity", body = crate::errors::ErrorResponse),
        (status = 404, description = "Product not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "Cart"
)]
pub async fn add_item(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Json(input): Json<AddItemInput>,
) -> Result<Json<CartLine>, ServiceError> {
    Ok(Json(
        state
            .services
            .carts
            .add_item(auth_user.user_id, input)
            .await?,
    ))
}

#[utoipa::path(
    put,
    path = "/api/cart/items/{id}",
    params(("id" = Uuid, Path, description = "Cart line id")),
    request_body = UpdateItemInput,
    responses(
        (status = 200, description = "Updated cart line", body = CartLine),
        (status = 400, description = "Invalid quantity", body = crate::errors::ErrorResponse),
        (status = 404, description = "Cart item not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "Cart"
)]
pub async fn update_item(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
    Json(input): Json<UpdateItemInput>,
) -> Result<Json<CartLine>, ServiceError> {
    Ok(Json(
        state
            .services
            .carts
            .update_item(auth_user.user_id, id, input.quantity)
            .await?,
    ))
}

#[utoipa::path(
    delete,
    path = "/api/cart/items/{id}",
    params(("id" = Uuid, Path, description = "Cart line id")),
    responses(
        (status = 204, description = "Line removed"),
        (status = 404, description = "Cart item not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "Cart"
)]
pub async fn remove_item(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Response, ServiceError> {
    state
        .services
        .carts
        .remove_item(auth_user.user_id, id)
        .await?;
    Ok(no_content_response())
}

#[utoipa::path(
    delete,
    path = "/api/cart",
    responses(
        (status = 204, description = "Cart emptied"),
        (status = 404, description = "Cart not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "Cart"
)]
pub async fn clear_cart(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> Result<Response, ServiceError> {
    state.services.carts.clear_cart(auth_user.user_id).await?;
    Ok(no_content_response())
}
