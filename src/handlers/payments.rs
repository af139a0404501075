use axum::{extract::State, Json};

use crate::auth::AuthUser;
use crate::errors::ServiceError;
use crate::services::payments::{CreateIntentInput, PaymentIntentResponse};
use crate::AppState;

/// Start a payment at the processor
#[utoipa::path(
    post,
    path = "/api/payments/create-intent",
    request_body = CreateIntentInput,
    responses(
        (status = 200, description = "Intent created", body = PaymentIntentResponse),
        (status = 400, description = "Invalid amount or order not payable", body = crate::errors::ErrorResponse),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse),
        (status = 502, description = "Payment processor unavailable", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "Payments"
)]
pub async fn create_payment_intent(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Json(input): Json<CreateIntentInput>,
) -> Result<Json<PaymentIntentResponse>, ServiceError> {
    Ok(Json(
        state
            .services
            .payments
            .create_intent(auth_user.user_id, input)
            .await?,
    ))
}
