use axum::{
    extract::{Path, State},
    response::Response,
    Json,
};
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::entities::address;
use crate::errors::ServiceError;
use crate::handlers::common::{created_response, no_content_response};
use crate::services::accounts::{AddressInput, UpdateAddressInput};
use crate::AppState;

#[utoipa::path(
    get,
    path = "/api/addresses",
    responses((status = 200, description = "Caller's addresses", body = [address::Model])),
    security(("Bearer" = [])),
    tag = "Addresses"
)]
pub async fn list_addresses(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> Result<Json<Vec<address::Model>>, ServiceError> {
    Ok(Json(
        state.services.accounts.list_addresses(auth_user.user_id).await?,
    ))
}

#[utoipa::path(
    post,
    path = "/api/addresses",
    request_body = AddressInput,
    responses(
        (status = 201, description = "Address added", body = address::Model),
        (status = 400, description = "Missing or invalid fields", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "Addresses"
)]
pub async fn create_address(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Json(input): Json<AddressInput>,
) -> Result<Response, ServiceError> {
    let created = state
        .services
        .accounts
        .add_address(auth_user.user_id, input)
        .await?;
    Ok(created_response(created))
}

#[utoipa::path(
    put,
    path = "/api/addresses/{id}",
    params(("id" = Uuid, Path, description = "Address id")),
    request_body = UpdateAddressInput,
    responses(
        (status = 200, description = "Address updated", body = address::Model),
        (status = 404, description = "Not the caller's address", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "Addresses"
)]
pub async fn update_address(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
    Json(input): Json<UpdateAddressInput>,
) -> Result<Json<address::Model>, ServiceError> {
    let updated = state
        .services
        .accounts
        .update_address(auth_user.user_id, id, input)
        .await?;
    Ok(Json(updated))
}

#[utoipa::path(
    delete,
    path = "/api/addresses/{id}",
    params(("id" = Uuid, Path, description = "Address id")),
    responses(
        (status = 204, description = "Address deleted"),
        (status = 404, description = "Not the caller's address", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "Addresses"
)]
pub async fn delete_address(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Response, ServiceError> {
    state
        .services
        .accounts
        .delete_address(auth_user.user_id, id)
        .await?;
    Ok(no_content_response())
}
