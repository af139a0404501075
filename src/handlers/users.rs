use axum::{extract::State, Json};

use crate::auth::AuthUser;
use crate::entities::user;
use crate::errors::ServiceError;
use crate::handlers::common::MessageResponse;
use crate::services::accounts::{ChangePasswordInput, UpdateProfileInput};
use crate::AppState;

#[utoipa::path(
    get,
    path = "/api/users/profile",
    responses(
        (status = 200, description = "Caller's profile", body = user::Model),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "Users"
)]
pub async fn get_profile(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> Result<Json<user::Model>, ServiceError> {
    Ok(Json(state.services.accounts.profile(auth_user.user_id).await?))
}

#[utoipa::path(
    put,
    path = "/api/users/profile",
    request_body = UpdateProfileInput,
    responses(
        (status = 200, description = "Updated profile", body = user::Model),
        (status = 400, description = "Invalid profile data", body = crate::errors::ErrorResponse),
        (status = 409, description = "Email already registered", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "Users"
)]
pub async fn update_profile(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Json(input): Json<UpdateProfileInput>,
) -> Result<Json<user::Model>, ServiceError> {
    let updated = state
        .services
        .accounts
        .update_profile(auth_user.user_id, input)
        .await?;
    Ok(Json(updated))
}

#[utoipa::path(
    put,
    path = "/api/users/change-password",
    request_body = ChangePasswordInput,
    responses(
        (status = 200, description = "Password changed", body = MessageResponse),
        (status = 400, description = "Current password is incorrect", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "Users"
)]
pub async fn change_password(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Json(input): Json<ChangePasswordInput>,
) -> Result<Json<MessageResponse>, ServiceError> {
    state
        .services
        .accounts
        .change_password(auth_user.user_id, input)
        .await?;
    Ok(Json(MessageResponse::new("Password changed successfully")))
}
