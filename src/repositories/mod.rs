//! Persistence gateway.
//!
//! Services depend on these traits only. [`SeaOrmStore`] is the relational
//! implementation; [`InMemoryStore`] backs unit tests and local experiments.
//! Every method is all-or-nothing from the caller's point of view.

use async_trait::async_trait;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::entities::{address, cart, cart_item, category, order, product, user, OrderStatus};
use crate::errors::ServiceError;
use crate::models::{CartLine, OrderDraft, OrderWithItems, PageRequest, ProductWithCategory};

pub mod memory;
pub mod sea_orm_store;

pub use memory::InMemoryStore;
pub use sea_orm_store::SeaOrmStore;

/// Column a product listing is ordered by
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProductSortField {
    Name,
    Price,
    CreatedAt,
    Stock,
}

impl std::str::FromStr for ProductSortField {
    type Err = ServiceError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw {
            "name" => Ok(Self::Name),
            "price" => Ok(Self::Price),
            "created_at" | "createdAt" => Ok(Self::CreatedAt),
            "stock" => Ok(Self::Stock),
            other => Err(ServiceError::InvalidArgument(format!(
                "cannot sort products by '{}'",
                other
            ))),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ProductSort {
    pub field: ProductSortField,
    pub descending: bool,
}

impl Default for ProductSort {
    /// Newest first
    fn default() -> Self {
        Self {
            field: ProductSortField::CreatedAt,
            descending: true,
        }
    }
}

/// Validated product search criteria
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ProductFilter {
    /// Case-insensitive substring of name or description
    pub search: Option<String>,
    /// Exact category name
    pub category: Option<String>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
    pub sort: ProductSort,
}

#[async_trait]
pub trait CommerceStore: Send + Sync {
    async fn find_cart_by_user(&self, user_id: Uuid) -> Result<Option<cart::Model>, ServiceError>;

    /// Creates the user's cart; when another request won the race the
    /// existing cart is returned instead.
    async fn create_cart(&self, user_id: Uuid) -> Result<cart::Model, ServiceError>;

    async fn find_cart_item(&self, item_id: Uuid)
        -> Result<Option<cart_item::Model>, ServiceError>;

    /// Adds `quantity` to the line matching (cart, product, variant), creating it if absent.
    async fn upsert_cart_item(
        &self,
        cart_id: Uuid,
        product_id: Uuid,
        variant: &cart_item::Variant,
        quantity: i32,
    ) -> Result<cart_item::Model, ServiceError>;

    async fn set_cart_item_quantity(
        &self,
        item_id: Uuid,
        quantity: i32,
    ) -> Result<cart_item::Model, ServiceError>;

    async fn delete_cart_item(&self, item_id: Uuid) -> Result<(), ServiceError>;

    /// Removes every line of a cart, returning how many were removed.
    async fn delete_cart_items(&self, cart_id: Uuid) -> Result<u64, ServiceError>;

    /// Lines of a cart with product and category, oldest first.
    async fn cart_lines(&self, cart_id: Uuid) -> Result<Vec<CartLine>, ServiceError>;

    /// Inserts the order and its items and deletes exactly the source cart
    /// lines in one transaction. Fails with `InvalidState` and writes nothing
    /// when any of those lines is already gone.
    async fn create_order_with_items(
        &self,
        draft: &OrderDraft,
    ) -> Result<OrderWithItems, ServiceError>;

    async fn find_order(&self, order_id: Uuid) -> Result<Option<order::Model>, ServiceError>;

    async fn find_order_with_items(
        &self,
        order_id: Uuid,
    ) -> Result<Option<OrderWithItems>, ServiceError>;

    async fn list_orders_for_user(&self, user_id: Uuid)
        -> Result<Vec<OrderWithItems>, ServiceError>;

    async fn list_orders(
        &self,
        page: PageRequest,
    ) -> Result<(Vec<OrderWithItems>, u64), ServiceError>;

    /// Compare-and-set: moves the order to `to` only if it is currently in
    /// `from`. Returns whether the write happened.
    async fn update_order_status(
        &self,
        order_id: Uuid,
        from: OrderStatus,
        to: OrderStatus,
    ) -> Result<bool, ServiceError>;

    async fn set_payment_intent(
        &self,
        order_id: Uuid,
        payment_intent_id: &str,
    ) -> Result<(), ServiceError>;
}

#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Duplicate slug is a `Conflict`.
    async fn create_category(
        &self,
        category: category::Model,
    ) -> Result<category::Model, ServiceError>;

    async fn list_categories(&self) -> Result<Vec<category::Model>, ServiceError>;

    async fn find_category(&self, id: Uuid) -> Result<Option<category::Model>, ServiceError>;

    async fn update_category(
        &self,
        category: category::Model,
    ) -> Result<category::Model, ServiceError>;

    /// Returns false when nothing was deleted. A category still holding
    /// products is a `Conflict`.
    async fn delete_category(&self, id: Uuid) -> Result<bool, ServiceError>;

    /// Duplicate slug is a `Conflict`.
    async fn create_product(&self, product: product::Model)
        -> Result<product::Model, ServiceError>;

    async fn find_product(&self, id: Uuid) -> Result<Option<ProductWithCategory>, ServiceError>;

    async fn find_product_by_slug(
        &self,
        slug: &str,
    ) -> Result<Option<ProductWithCategory>, ServiceError>;

    async fn update_product(&self, product: product::Model)
        -> Result<product::Model, ServiceError>;

    /// A product referenced by an order is a `Conflict`.
    async fn delete_product(&self, id: Uuid) -> Result<bool, ServiceError>;

    async fn search_products(
        &self,
        filter: &ProductFilter,
        page: PageRequest,
    ) -> Result<(Vec<ProductWithCategory>, u64), ServiceError>;

    async fn products_in_category(
        &self,
        category_id: Uuid,
    ) -> Result<Vec<ProductWithCategory>, ServiceError>;
}

#[async_trait]
pub trait AccountStore: Send + Sync {
    /// Duplicate email is a `Conflict`.
    async fn create_user(&self, user: user::Model) -> Result<user::Model, ServiceError>;

    async fn find_user(&self, id: Uuid) -> Result<Option<user::Model>, ServiceError>;

    async fn find_user_by_email(&self, email: &str) -> Result<Option<user::Model>, ServiceError>;

    async fn update_user(&self, user: user::Model) -> Result<user::Model, ServiceError>;

    async fn list_addresses(&self, user_id: Uuid) -> Result<Vec<address::Model>, ServiceError>;

    async fn find_address(&self, id: Uuid) -> Result<Option<address::Model>, ServiceError>;

    async fn create_address(&self, address: address::Model)
        -> Result<address::Model, ServiceError>;

    async fn update_address(&self, address: address::Model)
        -> Result<address::Model, ServiceError>;

    async fn delete_address(&self, id: Uuid) -> Result<bool, ServiceError>;
}
