//! Aggregates that span several tables and the paging envelope used by list
//! endpoints.

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::entities::{cart_item, category, order, order_item, product};

/// Tells an absent field (`None`) apart from an explicit `null`
/// (`Some(None)`) in partial updates. Use with `#[serde(default)]`.
pub fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Product together with its category
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ProductWithCategory {
    #[serde(flatten)]
    pub product: product::Model,
    pub category: Option<category::Model>,
}

/// Cart line as presented to the cart owner
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct CartLine {
    pub id: Uuid,
    pub cart_id: Uuid,
    pub product_id: Uuid,
    pub quantity: i32,
    pub size: Option<String>,
    pub color: Option<String>,
    pub product: ProductWithCategory,
}

impl CartLine {
    pub fn new(item: cart_item::Model, product: ProductWithCategory) -> Self {
        let variant = item.variant();
        Self {
            id: item.id,
            cart_id: item.cart_id,
            product_id: item.product_id,
            quantity: item.quantity,
            size: variant.size,
            color: variant.color,
            product,
        }
    }

    pub fn unit_price(&self) -> Decimal {
        self.product.product.effective_price()
    }

    pub fn line_total(&self) -> Decimal {
        self.unit_price() * Decimal::from(self.quantity)
    }
}

/// Order with its snapshotted lines
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct OrderWithItems {
    #[serde(flatten)]
    pub order: order::Model,
    pub items: Vec<order_item::Model>,
}

/// One line of an order about to be written
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OrderItemDraft {
    pub product_id: Uuid,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub size: Option<String>,
    pub color: Option<String>,
}

/// Everything needed to persist an order and consume the cart lines it came from
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OrderDraft {
    pub user_id: Uuid,
    pub cart_id: Uuid,
    /// Cart lines that must be removed in the same transaction
    pub source_item_ids: Vec<Uuid>,
    pub items: Vec<OrderItemDraft>,
    pub total: Decimal,
}

impl OrderDraft {
    /// Freezes the current effective price of every line.
    ///
    /// Returns `None` for an empty cart.
    pub fn from_cart_lines(user_id: Uuid, cart_id: Uuid, lines: &[CartLine]) -> Option<Self> {
        if lines.is_empty() {
            return None;
        }

        let items: Vec<OrderItemDraft> = lines
            .iter()
            .map(|line| OrderItemDraft {
                product_id: line.product_id,
                quantity: line.quantity,
                unit_price: line.unit_price(),
                size: line.size.clone(),
                color: line.color.clone(),
            })
            .collect();

        let total = items
            .iter()
            .map(|item| item.unit_price * Decimal::from(item.quantity))
            .sum();

        Some(Self {
            user_id,
            cart_id,
            source_item_ids: lines.iter().map(|line| line.id).collect(),
            items,
            total,
        })
    }
}

/// Paging metadata
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Pagination {
    pub total: u64,
    pub page: u64,
    pub limit: u64,
    pub total_pages: u64,
}

impl Pagination {
    pub fn new(total: u64, page: u64, limit: u64) -> Self {
        let total_pages = if limit == 0 { 0 } else { total.div_ceil(limit) };
        Self {
            total,
            page,
            limit,
            total_pages,
        }
    }
}

/// A page of results
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub pagination: Pagination,
}

/// Validated page request
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u64,
    pub limit: u64,
}

impl PageRequest {
    /// `page` and `limit` must be at least 1; `limit` is capped at `max_limit`.
    pub fn new(
        page: Option<u64>,
        limit: Option<u64>,
        default_limit: u64,
        max_limit: u64,
    ) -> Result<Self, crate::errors::ServiceError> {
        let page = page.unwrap_or(1);
        let limit = limit.unwrap_or(default_limit);
        if page < 1 {
            return Err(crate::errors::ServiceError::InvalidArgument(
                "page must be at least 1".to_string(),
            ));
        }
        if limit < 1 {
            return Err(crate::errors::ServiceError::InvalidArgument(
                "limit must be at least 1".to_string(),
            ));
        }
        let limit = limit.min(max_limit);
        let in_range = (page - 1)
            .checked_mul(limit)
            .is_some_and(|offset| offset <= i64::MAX as u64);
        if !in_range {
            return Err(crate::errors::ServiceError::InvalidArgument(
                "page is out of range".to_string(),
            ));
        }
        Ok(Self { page, limit })
    }

    pub fn offset(&self) -> u64 {
        (self.page - 1).saturating_mul(self.limit)
    }
}
