use axum::{
    extract::{Path, Query, State},
    response::Response,
    Json,
};
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::errors::ServiceError;
use crate::handlers::common::{created_response, PageParams};
use crate::models::{OrderWithItems, Page};
use crate::services::orders::UpdateStatusInput;
use crate::AppState;

/// Check out the caller's cart
#[utoipa::path(
    post,
    path = "/api/orders",
    responses(
        (status = 201, description = "Order placed; cart emptied", body = OrderWithItems),
        (status = 400, description = "Cart is empty", body = crate::errors::ErrorResponse),
        (status = 404, description = "Cart not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "Orders"
)]
pub async fn place_order(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> Result<Response, ServiceError> {
    let placed = state.services.orders.place_order(auth_user.user_id).await?;
    Ok(created_response(placed))
}

#[utoipa::path(
    get,
    path = "/api/orders/mine",
    responses((status = 200, description = "Caller's orders, newest first", body = [OrderWithItems])),
    security(("Bearer" = [])),
    tag = "Orders"
)]
pub async fn my_orders(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> Result<Json<Vec<OrderWithItems>>, ServiceError> {
    Ok(Json(
        state.services.orders.list_my_orders(auth_user.user_id).await?,
    ))
}

#[utoipa::path(
    get,
    path = "/api/orders/{id}",
    params(("id" = Uuid, Path, description = "Order id")),
    responses(
        (status = 200, description = "Order with its lines", body = OrderWithItems),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "Orders"
)]
pub async fn get_order(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<OrderWithItems>, ServiceError> {
    Ok(Json(
        state
            .services
            .orders
            .get_order(auth_user.user_id, id)
            .await?,
    ))
}

#[utoipa::path(
    post,
    path = "/api/orders/{id}/cancel",
    params(("id" = Uuid, Path, description = "Order id")),
    responses(
        (status = 200, description = "Order canceled", body = OrderWithItems),
        (status = 400, description = "Order is no longer pending", body = crate::errors::ErrorResponse),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "Orders"
)]
pub async fn cancel_order(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<OrderWithItems>, ServiceError> {
    Ok(Json(
        state
            .services
            .orders
            .cancel_order(auth_user.user_id, id)
            .await?,
    ))
}

/// Every order in the store (admin)
#[utoipa::path(
    get,
    path = "/api/orders",
    params(PageParams),
    responses(
        (status = 200, description = "One page of orders", body = Page<OrderWithItems>),
        (status = 403, description = "Admins only", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "Orders"
)]
pub async fn list_orders(
    State(state): State<AppState>,
    Query(params): Query<PageParams>,
) -> Result<Json<Page<OrderWithItems>>, ServiceError> {
    Ok(Json(
        state
            .services
            .orders
            .list_all_orders(params.page, params.limit)
            .await?,
    ))
}

/// Administrative status change; `paid` is reserved for payment confirmation
#[utoipa::path(
    put,
    path = "/api/orders/{id}/status",
    params(("id" = Uuid, Path, description = "Order id")),
    request_body = UpdateStatusInput,
    responses(
        (status = 200, description = "Order after the change", body = OrderWithItems),
        (status = 400, description = "Unknown status or disallowed transition", body = crate::errors::ErrorResponse),
        (status = 403, description = "Admins only", body = crate::errors::ErrorResponse),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "Orders"
)]
pub async fn update_order_status(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(input): Json<UpdateStatusInput>,
) -> Result<Json<OrderWithItems>, ServiceError> {
    Ok(Json(
        state
            .services
            .orders
            .update_status(id, &input.status)
            .await?,
    ))
}
