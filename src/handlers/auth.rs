use axum::{extract::State, response::Response, Json};

use crate::errors::ServiceError;
use crate::handlers::common::{created_response, success_response};
use crate::services::accounts::{AuthResponse, LoginInput, RegisterInput};
use crate::AppState;

/// Register a customer account
#[utoipa::path(
    post,
    path = "/api/auth/register",
    request_body = RegisterInput,
    responses(
        (status = 201, description = "Account created", body = AuthResponse),
        (status = 400, description = "Invalid registration data", body = crate::errors::ErrorResponse),
        (status = 409, description = "Email already registered", body = crate::errors::ErrorResponse),
    ),
    tag = "Auth"
)]
pub async fn register(
    State(state): State<AppState>,
    Json(input): Json<RegisterInput>,
) -> Result<Response, ServiceError> {
    let registered = state.services.accounts.register(input).await?;
    Ok(created_response(registered))
}

/// Exchange credentials for a bearer token
#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginInput,
    responses(
        (status = 200, description = "Logged in", body = AuthResponse),
        (status = 401, description = "Invalid email or password", body = crate::errors::ErrorResponse),
    ),
    tag = "Auth"
)]
pub async fn login(
    State(state): State<AppState>,
    Json(input): Json<LoginInput>,
) -> Result<Response, ServiceError> {
    let session = state.services.accounts.login(input).await?;
    Ok(success_response(session))
}
