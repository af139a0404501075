use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::entities::{order, OrderStatus};
use crate::errors::ServiceError;
use crate::models::{OrderDraft, OrderWithItems, Page, PageRequest, Pagination};
use crate::repositories::CommerceStore;

/// Administrative status change
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct UpdateStatusInput {
    /// One of `pending`, `paid`, `shipped`, `delivered`, `canceled`
    pub status: String,
}

/// Order placement and lifecycle.
///
/// Orders are created from the caller's cart with prices frozen at that
/// moment. Status writes are compare-and-set against the status the decision
/// was made on, so two writers racing from the same state cannot both win.
#[derive(Clone)]
pub struct OrderService {
    store: Arc<dyn CommerceStore>,
    default_page_size: u64,
    max_page_size: u64,
}

impl OrderService {
    pub fn new(store: Arc<dyn CommerceStore>, default_page_size: u64, max_page_size: u64) -> Self {
        Self {
            store,
            default_page_size,
            max_page_size,
        }
    }

    /// Turns the caller's cart into a pending order and empties the cart.
    ///
    /// # Errors
    ///
    /// * `NotFound` when the caller has never had a cart
    /// * `InvalidState` when the cart is empty, or when a concurrent checkout
    ///   consumed the same lines first (nothing is written in that case)
    #[instrument(skip(self))]
    pub async fn place_order(&self, user_id: Uuid) -> Result<OrderWithItems, ServiceError> {
        let cart = self
            .store
            .find_cart_by_user(user_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Cart not found".to_string()))?;

        let lines = self.store.cart_lines(cart.id).await?;
        let draft = OrderDraft::from_cart_lines(user_id, cart.id, &lines)
            .ok_or_else(|| ServiceError::InvalidState("cart is empty".to_string()))?;

        let placed = self.store.create_order_with_items(&draft).await?;

        info!(
            order_id = %placed.order.id,
            total = %placed.order.total,
            items = placed.items.len(),
            "order placed"
        );
        Ok(placed)
    }

    #[instrument(skip(self))]
    pub async fn list_my_orders(&self, user_id: Uuid) -> Result<Vec<OrderWithItems>, ServiceError> {
        self.store.list_orders_for_user(user_id).await
    }

    /// Orders owned by someone else read as missing.
    #[instrument(skip(self))]
    pub async fn get_order(
        &self,
        user_id: Uuid,
        order_id: Uuid,
    ) -> Result<OrderWithItems, ServiceError> {
        match self.store.find_order_with_items(order_id).await? {
            Some(found) if found.order.user_id == user_id => Ok(found),
            _ => Err(ServiceError::NotFound("Order not found".to_string())),
        }
    }

    /// Pending order owned by the caller, for attaching a payment intent
    pub async fn payable_order(
        &self,
        user_id: Uuid,
        order_id: Uuid,
    ) -> Result<order::Model, ServiceError> {
        let found = match self.store.find_order(order_id).await? {
            Some(found) if found.user_id == user_id => found,
            _ => return Err(ServiceError::NotFound("Order not found".to_string())),
        };
        if found.status != OrderStatus::Pending {
            return Err(ServiceError::InvalidState(format!(
                "order is {} and cannot be paid",
                found.status
            )));
        }
        Ok(found)
    }

    #[instrument(skip(self))]
    pub async fn list_all_orders(
        &self,
        page: Option<u64>,
        limit: Option<u64>,
    ) -> Result<Page<OrderWithItems>, ServiceError> {
        let request = PageRequest::new(page, limit, self.default_page_size, self.max_page_size)?;
        let (items, total) = self.store.list_orders(request).await?;
        Ok(Page {
            items,
            pagination: Pagination::new(total, request.page, request.limit),
        })
    }

    /// Administrative transition. `paid` is only ever set by payment
    /// reconciliation; asking for the current status is a no-op.
    #[instrument(skip(self))]
    pub async fn update_status(
        &self,
        order_id: Uuid,
        raw_status: &str,
    ) -> Result<OrderWithItems, ServiceError> {
        let target: OrderStatus = raw_status.parse()?;
        let current = self.load(order_id).await?;

        if !current.order.status.check_admin_transition(target)? {
            return Ok(current);
        }

        self.transition(order_id, current.order.status, target).await?;
        info!(from = %current.order.status, to = %target, "order status updated");
        self.load(order_id).await
    }

    /// Owner cancellation, allowed while the order is still pending.
    #[instrument(skip(self))]
    pub async fn cancel_order(
        &self,
        user_id: Uuid,
        order_id: Uuid,
    ) -> Result<OrderWithItems, ServiceError> {
        let current = self.get_order(user_id, order_id).await?;
        if current.order.status != OrderStatus::Pending {
            return Err(ServiceError::InvalidState(format!(
                "order is {}; only pending orders can be canceled",
                current.order.status
            )));
        }

        self.transition(order_id, OrderStatus::Pending, OrderStatus::Canceled)
            .await?;
        info!("order canceled by owner");
        self.load(order_id).await
    }

    async fn load(&self, order_id: Uuid) -> Result<OrderWithItems, ServiceError> {
        self.store
            .find_order_with_items(order_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Order not found".to_string()))
    }

    async fn transition(
        &self,
        order_id: Uuid,
        from: OrderStatus,
        to: OrderStatus,
    ) -> Result<(), ServiceError> {
        if self.store.update_order_status(order_id, from, to).await? {
            return Ok(());
        }
        warn!(%order_id, %from, %to, "status changed underneath transition");
        Err(ServiceError::InvalidState(format!(
            "order is no longer {}",
            from
        )))
    }
}
