use std::sync::Arc;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::entities::{cart, cart_item};
use crate::errors::ServiceError;
use crate::models::CartLine;
use crate::repositories::{CatalogStore, CommerceStore};

/// Line to add to the caller's cart
#[derive(Debug, Clone, Deserialize, Serialize, Validate, ToSchema)]
pub struct AddItemInput {
    pub product_id: Uuid,
    #[schema(minimum = 1, maximum = 9999)]
    pub quantity: i32,
    #[validate(length(max = 50))]
    pub size: Option<String>,
    #[validate(length(max = 50))]
    pub color: Option<String>,
}

/// New quantity for an existing line
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct UpdateItemInput {
    #[schema(minimum = 1, maximum = 9999)]
    pub quantity: i32,
}

/// The caller's cart as presented to them
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CartView {
    pub items: Vec<CartLine>,
    /// Sum of effective price times quantity, rounded to cents
    pub total: Decimal,
}

impl CartView {
    pub fn empty() -> Self {
        Self {
            items: Vec::new(),
            total: Decimal::ZERO,
        }
    }

    pub fn from_lines(items: Vec<CartLine>) -> Self {
        let total: Decimal = items.iter().map(CartLine::line_total).sum();
        Self {
            items,
            total: total.round_dp(2),
        }
    }
}

fn check_quantity(quantity: i32) -> Result<(), ServiceError> {
    if !(1..=cart_item::MAX_QUANTITY).contains(&quantity) {
        return Err(ServiceError::InvalidArgument(format!(
            "quantity must be between 1 and {}",
            cart_item::MAX_QUANTITY
        )));
    }
    Ok(())
}

/// Per-user shopping cart.
///
/// A user has at most one cart. It is created on the first add and survives
/// checkout and clearing; only its lines come and go.
#[derive(Clone)]
pub struct CartService {
    store: Arc<dyn CommerceStore>,
    catalog: Arc<dyn CatalogStore>,
}

impl CartService {
    pub fn new(store: Arc<dyn CommerceStore>, catalog: Arc<dyn CatalogStore>) -> Self {
        Self { store, catalog }
    }

    async fn cart_for(&self, user_id: Uuid) -> Result<cart::Model, ServiceError> {
        match self.store.find_cart_by_user(user_id).await? {
            Some(cart) => Ok(cart),
            None => self.store.create_cart(user_id).await,
        }
    }

    /// Loads a line and checks it sits in the caller's cart. Lines in other
    /// carts are reported as missing.
    async fn owned_item(
        &self,
        user_id: Uuid,
        item_id: Uuid,
    ) -> Result<cart_item::Model, ServiceError> {
        let not_found = || ServiceError::NotFound("Cart item not found".to_string());

        let item = self
            .store
            .find_cart_item(item_id)
            .await?
            .ok_or_else(not_found)?;
        let cart = self
            .store
            .find_cart_by_user(user_id)
            .await?
            .ok_or_else(not_found)?;

        if item.cart_id != cart.id {
            return Err(not_found());
        }
        Ok(item)
    }

    /// Adds a product to the caller's cart.
    ///
    /// The same (product, size, color) accumulates on one line; a different
    /// variant gets its own line.
    #[instrument(skip(self, input), fields(product_id = %input.product_id, quantity = input.quantity))]
    pub async fn add_item(
        &self,
        user_id: Uuid,
        input: AddItemInput,
    ) -> Result<CartLine, ServiceError> {
        check_quantity(input.quantity)?;
        input.validate()?;

        let product = self
            .catalog
            .find_product(input.product_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Product not found".to_string()))?;

        let cart = self.cart_for(user_id).await?;
        let variant = cart_item::Variant::new(input.size, input.color);
        let item = self
            .store
            .upsert_cart_item(cart.id, product.product.id, &variant, input.quantity)
            .await?;

        info!(cart_id = %cart.id, item_id = %item.id, quantity = item.quantity, "cart line updated");
        Ok(CartLine::new(item, product))
    }

    #[instrument(skip(self))]
    pub async fn get_cart(&self, user_id: Uuid) -> Result<CartView, ServiceError> {
        let Some(cart) = self.store.find_cart_by_user(user_id).await? else {
            return Ok(CartView::empty());
        };
        let lines = self.store.cart_lines(cart.id).await?;
        Ok(CartView::from_lines(lines))
    }

    #[instrument(skip(self))]
    pub async fn update_item(
        &self,
        user_id: Uuid,
        item_id: Uuid,
        quantity: i32,
    ) -> Result<CartLine, ServiceError> {
        check_quantity(quantity)?;
        let item = self.owned_item(user_id, item_id).await?;

        let product = self
            .catalog
            .find_product(item.product_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Product not found".to_string()))?;
        let updated = self.store.set_cart_item_quantity(item.id, quantity).await?;

        info!(item_id = %updated.id, quantity, "cart line quantity set");
        Ok(CartLine::new(updated, product))
    }

    #[instrument(skip(self))]
    pub async fn remove_item(&self, user_id: Uuid, item_id: Uuid) -> Result<(), ServiceError> {
        let item = self.owned_item(user_id, item_id).await?;
        self.store.delete_cart_item(item.id).await?;
        info!(item_id = %item.id, "cart line removed");
        Ok(())
    }

    /// Removes every line. The cart itself stays.
    #[instrument(skip(self))]
    pub async fn clear_cart(&self, user_id: Uuid) -> Result<(), ServiceError> {
        let cart = self
            .store
            .find_cart_by_user(user_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Cart not found".to_string()))?;
        let removed = self.store.delete_cart_items(cart.id).await?;
        info!(cart_id = %cart.id, removed, "cart cleared");
        Ok(())
    }
}
