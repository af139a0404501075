use axum::{extract::State, http::HeaderMap, Json};
use bytes::Bytes;
use chrono::Utc;
use serde::Serialize;
use tracing::{error, info, warn};
use utoipa::ToSchema;

use crate::errors::ServiceError;
use crate::services::payments::ReconcileOutcome;
use crate::webhooks::{parse_event, verify_signature, SIGNATURE_HEADER};
use crate::AppState;

#[derive(Debug, Serialize, ToSchema)]
pub struct WebhookAck {
    pub received: bool,
}

const REJECTED: &str = "invalid webhook signature";

// POST /api/webhook
#[utoipa::path(
    post,
    path = "/api/webhook",
    request_body(content = String, description = "Raw processor event", content_type = "application/json"),
    params(("stripe-signature" = String, Header, description = "t=<unix>,v1=<hex hmac-sha256>")),
    responses(
        (status = 200, description = "Event applied, already applied, or ignored", body = WebhookAck),
        (status = 400, description = "Bad signature or uncorrelated event", body = crate::errors::ErrorResponse),
        (status = 500, description = "Not persisted; the processor should redeliver", body = crate::errors::ErrorResponse),
    ),
    tag = "Payments"
)]
pub async fn payment_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookAck>, ServiceError> {
    let Some(secret) = state.config.payment_webhook_secret.as_deref() else {
        error!("payment webhook received but no webhook secret is configured");
        return Err(ServiceError::Internal(
            "webhook verification is not configured".to_string(),
        ));
    };

    let header = headers
        .get(SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();

    let verdict = verify_signature(
        &body,
        header,
        secret,
        state.config.webhook_tolerance(),
        Utc::now().timestamp(),
    );
    if !verdict.is_verified() {
        warn!("payment webhook signature verification failed");
        return Err(ServiceError::InvalidSignature(REJECTED.to_string()));
    }

    let event = parse_event(&body)?;
    let event_id = event.event_id().to_string();

    match state.services.payments.reconcile(event).await {
        Ok(outcome) => {
            match outcome {
                ReconcileOutcome::MarkedPaid => info!(%event_id, "webhook applied"),
                ReconcileOutcome::AlreadyApplied => info!(%event_id, "webhook already applied"),
                ReconcileOutcome::Ignored => info!(%event_id, "webhook ignored"),
            }
            Ok(Json(WebhookAck { received: true }))
        }
        Err(ServiceError::InvalidArgument(msg)) | Err(ServiceError::NotFound(msg)) => {
            warn!(%event_id, reason = %msg, "webhook could not be correlated");
            Err(ServiceError::InvalidArgument(msg))
        }
        Err(err) => {
            error!(%event_id, error = %err, "webhook not persisted");
            Err(ServiceError::Internal(err.to_string()))
        }
    }
}
