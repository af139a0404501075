//! Client side of the external payment processor.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{error, instrument};
use uuid::Uuid;

use crate::errors::ServiceError;

/// Intent to be created at the processor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentIntentRequest {
    /// Amount in minor currency units
    pub amount_minor: i64,
    pub currency: String,
    /// Travels as `metadata[order_id]` and comes back on the webhook
    pub order_id: Option<Uuid>,
}

/// Intent as acknowledged by the processor
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ProcessorIntent {
    pub id: String,
    pub client_secret: String,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PaymentProcessor: Send + Sync {
    async fn create_payment_intent(
        &self,
        request: PaymentIntentRequest,
    ) -> Result<ProcessorIntent, ServiceError>;
}

#[derive(Debug, Deserialize)]
struct ProcessorErrorBody {
    error: ProcessorErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ProcessorErrorDetail {
    #[serde(default)]
    message: Option<String>,
}

/// Stripe-compatible REST client
#[derive(Clone)]
pub struct StripeProcessor {
    client: reqwest::Client,
    base_url: String,
    secret_key: String,
}

impl std::fmt::Debug for StripeProcessor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StripeProcessor")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl StripeProcessor {
    pub fn new(
        base_url: impl Into<String>,
        secret_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, ServiceError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ServiceError::Internal(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            secret_key: secret_key.into(),
        })
    }
}

#[async_trait]
impl PaymentProcessor for StripeProcessor {
    #[instrument(skip(self), fields(amount_minor = request.amount_minor))]
    async fn create_payment_intent(
        &self,
        request: PaymentIntentRequest,
    ) -> Result<ProcessorIntent, ServiceError> {
        let mut form = vec![
            ("amount", request.amount_minor.to_string()),
            ("currency", request.currency.clone()),
            ("automatic_payment_methods[enabled]", "true".to_string()),
        ];
        if let Some(order_id) = request.order_id {
            form.push(("metadata[order_id]", order_id.to_string()));
        }

        let mut builder = self
            .client
            .post(format!("{}/v1/payment_intents", self.base_url))
            .bearer_auth(&self.secret_key)
            .form(&form);
        if let Some(order_id) = request.order_id {
            builder = builder.header("Idempotency-Key", format!("order-{}", order_id));
        }

        let response = builder.send().await.map_err(|e| {
            error!(error = %e, "payment processor request failed");
            ServiceError::Upstream("payment processor unavailable".to_string())
        })?;

        let status = response.status();
        if !status.is_success() {
            let detail = response
                .json::<ProcessorErrorBody>()
                .await
                .ok()
                .and_then(|body| body.error.message)
                .unwrap_or_else(|| status.to_string());
            error!(%status, %detail, "payment processor rejected intent");
            return Err(ServiceError::Upstream(format!(
                "payment processor rejected the request: {}",
                detail
            )));
        }

        response.json::<ProcessorIntent>().await.map_err(|e| {
            error!(error = %e, "unreadable payment processor response");
            ServiceError::Upstream("unexpected payment processor response".to_string())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use wiremock::matchers::{body_string_contains, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn processor(server: &MockServer) -> StripeProcessor {
        StripeProcessor::new(server.uri(), "sk_test_123", Duration::from_secs(2)).unwrap()
    }

    #[tokio::test]
    async fn posts_form_encoded_intent() {
        let server = MockServer::start().await;
        let order_id = Uuid::new_v4();

        Mock::given(method("POST"))
            .and(path("/v1/payment_intents"))
            .and(header("authorization", "Bearer sk_test_123"))
            .and(header("idempotency-key", format!("order-{}", order_id).as_str()))
            .and(body_string_contains("amount=4498"))
            .and(body_string_contains("currency=usd"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "pi_123",
                "client_secret": "pi_123_secret_abc",
                "object": "payment_intent"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let intent = processor(&server)
            .create_payment_intent(PaymentIntentRequest {
                amount_minor: 4498,
                currency: "usd".into(),
                order_id: Some(order_id),
            })
            .await
            .unwrap();

        assert_eq!(intent.id, "pi_123");
        assert_eq!(intent.client_secret, "pi_123_secret_abc");
    }

    #[tokio::test]
    async fn processor_error_is_upstream() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/payment_intents"))
            .respond_with(ResponseTemplate::new(402).set_body_json(serde_json::json!({
                "error": { "message": "Your card was declined." }
            })))
            .mount(&server)
            .await;

        let result = processor(&server)
            .create_payment_intent(PaymentIntentRequest {
                amount_minor: 100,
                currency: "usd".into(),
                order_id: None,
            })
            .await;

        assert_matches!(result, Err(ServiceError::Upstream(msg)) if msg.contains("declined"));
    }

    #[tokio::test]
    async fn slow_processor_times_out_as_upstream() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
            .mount(&server)
            .await;

        let slow = StripeProcessor::new(server.uri(), "sk_test", Duration::from_millis(200)).unwrap();
        let result = slow
            .create_payment_intent(PaymentIntentRequest {
                amount_minor: 100,
                currency: "usd".into(),
                order_id: None,
            })
            .await;

        assert_matches!(result, Err(ServiceError::Upstream(_)));
    }
}
