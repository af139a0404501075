use std::sync::Arc;
use std::time::Duration;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::entities::OrderStatus;
use crate::errors::ServiceError;
use crate::repositories::CommerceStore;
use crate::services::orders::OrderService;
use crate::services::payment_processor::{PaymentIntentRequest, PaymentProcessor};
use crate::webhooks::WebhookEvent;

/// Request to start a payment
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct CreateIntentInput {
    /// Amount in major units, e.g. `44.98`
    #[schema(value_type = String, example = "44.98")]
    pub amount: Decimal,
    pub order_id: Option<Uuid>,
}

#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct PaymentIntentResponse {
    pub client_secret: String,
    pub payment_intent_id: String,
    pub amount_minor: i64,
}

/// What reconciliation did with a verified event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    MarkedPaid,
    AlreadyApplied,
    Ignored,
}

/// Converts a positive major-unit amount to minor units, rounding half away
/// from zero at the cent.
pub fn to_minor_units(amount: Decimal) -> Result<i64, ServiceError> {
    if amount <= Decimal::ZERO {
        return Err(ServiceError::InvalidArgument(
            "amount must be greater than zero".to_string(),
        ));
    }

    let cents = amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
        * Decimal::ONE_HUNDRED;
    let minor = cents
        .to_i64()
        .ok_or_else(|| ServiceError::InvalidArgument("amount is too large".to_string()))?;

    if minor == 0 {
        return Err(ServiceError::InvalidArgument(
            "amount must be at least one minor unit".to_string(),
        ));
    }
    Ok(minor)
}

/// Payment intents and processor reconciliation
#[derive(Clone)]
pub struct PaymentService {
    store: Arc<dyn CommerceStore>,
    orders: OrderService,
    processor: Arc<dyn PaymentProcessor>,
    currency: String,
    timeout: Duration,
}

impl PaymentService {
    pub fn new(
        store: Arc<dyn CommerceStore>,
        orders: OrderService,
        processor: Arc<dyn PaymentProcessor>,
        currency: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            store,
            orders,
            processor,
            currency: currency.into().to_lowercase(),
            timeout,
        }
    }

    /// Creates an intent at the processor.
    ///
    /// When an order is named it must be the caller's, still pending, and the
    /// amount must equal its frozen total. The order id rides along as intent
    /// metadata; nothing is written locally, the webhook records the intent.
    #[instrument(skip(self, input), fields(order_id = ?input.order_id))]
    pub async fn create_intent(
        &self,
        user_id: Uuid,
        input: CreateIntentInput,
    ) -> Result<PaymentIntentResponse, ServiceError> {
        let amount_minor = to_minor_units(input.amount)?;

        if let Some(order_id) = input.order_id {
            let order = self.orders.payable_order(user_id, order_id).await?;
            if to_minor_units(order.total)? != amount_minor {
                return Err(ServiceError::InvalidArgument(
                    "amount does not match the order total".to_string(),
                ));
            }
        }

        let request = PaymentIntentRequest {
            amount_minor,
            currency: self.currency.clone(),
            order_id: input.order_id,
        };
        let intent = tokio::time::timeout(self.timeout, self.processor.create_payment_intent(request))
            .await
            .map_err(|_| {
                error!(timeout = ?self.timeout, "payment processor timed out");
                ServiceError::Upstream("payment processor timed out".to_string())
            })??;

        info!(payment_intent_id = %intent.id, amount_minor, "payment intent created");
        Ok(PaymentIntentResponse {
            client_secret: intent.client_secret,
            payment_intent_id: intent.id,
            amount_minor,
        })
    }

    /// Applies a verified processor event. Safe to call any number of times
    /// with the same event.
    #[instrument(skip(self, event), fields(event_id = %event.event_id()))]
    pub async fn reconcile(&self, event: WebhookEvent) -> Result<ReconcileOutcome, ServiceError> {
        let (payment_intent_id, raw_order_id) = match event {
            WebhookEvent::PaymentSucceeded {
                payment_intent_id,
                order_id,
                ..
            } => (payment_intent_id, order_id),
            WebhookEvent::Other { event_type, .. } => {
                info!(%event_type, "ignoring unhandled webhook event");
                return Ok(ReconcileOutcome::Ignored);
            }
        };

        let order_id = raw_order_id
            .as_deref()
            .and_then(|raw| Uuid::parse_str(raw).ok())
            .ok_or_else(|| {
                warn!(%payment_intent_id, "payment event without a usable order id");
                ServiceError::InvalidArgument("event carries no valid order_id".to_string())
            })?;

        let order = self
            .store
            .find_order(order_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Order not found".to_string()))?;

        match order.status {
            OrderStatus::Pending => {}
            OrderStatus::Canceled => {
                warn!(%order_id, %payment_intent_id, "payment succeeded for a canceled order");
                return Ok(ReconcileOutcome::Ignored);
            }
            status => {
                info!(%order_id, %status, "payment already applied");
                return Ok(ReconcileOutcome::AlreadyApplied);
            }
        }

        if !self
            .store
            .update_order_status(order_id, OrderStatus::Pending, OrderStatus::Paid)
            .await?
        {
            // Lost the race to another delivery or a cancellation.
            let current = self
                .store
                .find_order(order_id)
                .await?
                .ok_or_else(|| ServiceError::NotFound("Order not found".to_string()))?;
            return Ok(if current.status.is_paid_or_later() {
                ReconcileOutcome::AlreadyApplied
            } else {
                warn!(%order_id, status = %current.status, "order left pending by another writer");
                ReconcileOutcome::Ignored
            });
        }

        if order.payment_intent_id.is_none() && !payment_intent_id.is_empty() {
            self.store
                .set_payment_intent(order_id, &payment_intent_id)
                .await?;
        }

        info!(%order_id, %payment_intent_id, "order marked paid");
        Ok(ReconcileOutcome::MarkedPaid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::cart::AddItemInput;
    use crate::services::payment_processor::{MockPaymentProcessor, ProcessorIntent};
    use crate::services::test_support::{seed_product, Fixture};
    use assert_matches::assert_matches;
    use rust_decimal_macros::dec;

    fn payments(fx: &Fixture, processor: MockPaymentProcessor) -> PaymentService {
        PaymentService::new(
            Arc::new(fx.store.clone()),
            fx.orders.clone(),
            Arc::new(processor),
            "USD",
            Duration::from_secs(1),
        )
    }

    async fn pending_order(fx: &Fixture, user: Uuid) -> crate::models::OrderWithItems {
        let product = seed_product(&fx.store, dec!(19.99), None).await;
        fx.carts
            .add_item(
                user,
                AddItemInput {
                    product_id: product.id,
                    quantity: 2,
                    size: None,
                    color: None,
                },
            )
            .await
            .unwrap();
        fx.orders.place_order(user).await.unwrap()
    }

    fn succeeded(order_id: Uuid) -> WebhookEvent {
        WebhookEvent::PaymentSucceeded {
            event_id: "evt_1".into(),
            payment_intent_id: "pi_1".into(),
            order_id: Some(order_id.to_string()),
        }
    }

    #[test]
    fn minor_units_round_half_up() {
        assert_eq!(to_minor_units(dec!(44.98)).unwrap(), 4498);
        assert_eq!(to_minor_units(dec!(10.005)).unwrap(), 1001);
        assert_eq!(to_minor_units(dec!(10.004)).unwrap(), 1000);
        assert_eq!(to_minor_units(dec!(0.01)).unwrap(), 1);
        assert_matches!(to_minor_units(dec!(0)), Err(ServiceError::InvalidArgument(_)));
        assert_matches!(to_minor_units(dec!(-5)), Err(ServiceError::InvalidArgument(_)));
        assert_matches!(to_minor_units(dec!(0.004)), Err(ServiceError::InvalidArgument(_)));
    }

    #[tokio::test]
    async fn intent_for_order_carries_the_order_id_only() {
        let fx = Fixture::new();
        let user = Uuid::new_v4();
        let order = pending_order(&fx, user).await;
        let order_id = order.order.id;

        let mut processor = MockPaymentProcessor::new();
        processor
            .expect_create_payment_intent()
            .withf(move |req| {
                req.amount_minor == 3998 && req.currency == "usd" && req.order_id == Some(order_id)
            })
            .times(1)
            .returning(|_| {
                Ok(ProcessorIntent {
                    id: "pi_42".into(),
                    client_secret: "pi_42_secret".into(),
                })
            });

        let response = payments(&fx, processor)
            .create_intent(
                user,
                CreateIntentInput {
                    amount: dec!(39.98),
                    order_id: Some(order_id),
                },
            )
            .await
            .unwrap();

        assert_eq!(response.amount_minor, 3998);
        assert_eq!(response.payment_intent_id, "pi_42");
        let stored = fx.store.find_order(order_id).await.unwrap().unwrap();
        assert!(stored.payment_intent_id.is_none());
        assert_eq!(stored.status, OrderStatus::Pending);
    }

    #[tokio::test]
    async fn processor_failure_writes_nothing() {
        let fx = Fixture::new();
        let user = Uuid::new_v4();
        let order = pending_order(&fx, user).await;

        let mut processor = MockPaymentProcessor::new();
        processor
            .expect_create_payment_intent()
            .returning(|_| Err(ServiceError::Upstream("card network down".into())));

        let result = payments(&fx, processor)
            .create_intent(
                user,
                CreateIntentInput {
                    amount: dec!(39.98),
                    order_id: Some(order.order.id),
                },
            )
            .await;

        assert_matches!(result, Err(ServiceError::Upstream(_)));
        let stored = fx.store.find_order(order.order.id).await.unwrap().unwrap();
        assert!(stored.payment_intent_id.is_none());
    }

    #[tokio::test]
    async fn intent_checks_order_before_calling_processor() {
        let fx = Fixture::new();
        let user = Uuid::new_v4();
        let order = pending_order(&fx, user).await;

        let mut processor = MockPaymentProcessor::new();
        processor.expect_create_payment_intent().never();
        let service = payments(&fx, processor);

        assert_matches!(
            service
                .create_intent(
                    Uuid::new_v4(),
                    CreateIntentInput {
                        amount: dec!(39.98),
                        order_id: Some(order.order.id),
                    },
                )
                .await,
            Err(ServiceError::NotFound(_))
        );
        assert_matches!(
            service
                .create_intent(
                    user,
                    CreateIntentInput {
                        amount: dec!(1.00),
                        order_id: Some(order.order.id),
                    },
                )
                .await,
            Err(ServiceError::InvalidArgument(_))
        );

        fx.orders.cancel_order(user, order.order.id).await.unwrap();
        assert_matches!(
            service
                .create_intent(
                    user,
                    CreateIntentInput {
                        amount: dec!(39.98),
                        order_id: Some(order.order.id),
                    },
                )
                .await,
            Err(ServiceError::InvalidState(_))
        );
    }

    #[tokio::test]
    async fn duplicate_delivery_transitions_once() {
        let fx = Fixture::new();
        let order = pending_order(&fx, Uuid::new_v4()).await;
        let service = payments(&fx, MockPaymentProcessor::new());

        assert_eq!(
            service.reconcile(succeeded(order.order.id)).await.unwrap(),
            ReconcileOutcome::MarkedPaid
        );
        assert_eq!(
            service.reconcile(succeeded(order.order.id)).await.unwrap(),
            ReconcileOutcome::AlreadyApplied
        );

        let stored = fx.store.find_order(order.order.id).await.unwrap().unwrap();
        assert_eq!(stored.status, OrderStatus::Paid);
        assert_eq!(stored.payment_intent_id.as_deref(), Some("pi_1"));
    }

    #[tokio::test]
    async fn canceled_orders_are_never_resurrected() {
        let fx = Fixture::new();
        let user = Uuid::new_v4();
        let order = pending_order(&fx, user).await;
        fx.orders.cancel_order(user, order.order.id).await.unwrap();

        let service = payments(&fx, MockPaymentProcessor::new());
        assert_eq!(
            service.reconcile(succeeded(order.order.id)).await.unwrap(),
            ReconcileOutcome::Ignored
        );
        let stored = fx.store.find_order(order.order.id).await.unwrap().unwrap();
        assert_eq!(stored.status, OrderStatus::Canceled);
    }

    #[tokio::test]
    async fn uncorrelated_events() {
        let fx = Fixture::new();
        let service = payments(&fx, MockPaymentProcessor::new());

        let other = WebhookEvent::Other {
            event_id: "evt_9".into(),
            event_type: "charge.refunded".into(),
        };
        assert_eq!(service.reconcile(other).await.unwrap(), ReconcileOutcome::Ignored);

        let no_order = WebhookEvent::PaymentSucceeded {
            event_id: "evt_2".into(),
            payment_intent_id: "pi_2".into(),
            order_id: None,
        };
        assert_matches!(service.reconcile(no_order).await, Err(ServiceError::InvalidArgument(_)));

        assert_matches!(
            service.reconcile(succeeded(Uuid::new_v4())).await,
            Err(ServiceError::NotFound(_))
        );
    }

    #[tokio::test]
    async fn store_outage_is_an_error_not_an_ack() {
        let fx = Fixture::new();
        let order = pending_order(&fx, Uuid::new_v4()).await;
        let service = payments(&fx, MockPaymentProcessor::new());

        fx.store.set_unavailable(true);
        assert_matches!(
            service.reconcile(succeeded(order.order.id)).await,
            Err(ServiceError::Upstream(_))
        );
        fx.store.set_unavailable(false);
        assert_eq!(
            fx.store.find_order(order.order.id).await.unwrap().unwrap().status,
            OrderStatus::Pending
        );
    }
}
