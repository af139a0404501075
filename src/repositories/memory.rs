use async_trait::async_trait;
use chrono::Utc;
use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{
    AccountStore, CatalogStore, CommerceStore, ProductFilter, ProductSortField,
};
use crate::entities::{
    address, cart, cart_item, category, order, order_item, product, user, OrderStatus,
};
use crate::errors::ServiceError;
use crate::models::{CartLine, OrderDraft, OrderWithItems, PageRequest, ProductWithCategory};

#[derive(Default)]
struct State {
    users: HashMap<Uuid, user::Model>,
    addresses: HashMap<Uuid, address::Model>,
    categories: HashMap<Uuid, category::Model>,
    products: HashMap<Uuid, product::Model>,
    carts: HashMap<Uuid, cart::Model>,
    cart_items: HashMap<Uuid, cart_item::Model>,
    orders: HashMap<Uuid, order::Model>,
    order_items: HashMap<Uuid, order_item::Model>,
}

impl State {
    fn with_category(&self, product: &product::Model) -> ProductWithCategory {
        ProductWithCategory {
            product: product.clone(),
            category: self.categories.get(&product.category_id).cloned(),
        }
    }

    fn order_with_items(&self, order: &order::Model) -> OrderWithItems {
        let mut items: Vec<_> = self
            .order_items
            .values()
            .filter(|item| item.order_id == order.id)
            .cloned()
            .collect();
        items.sort_by_key(|item| item.id);
        OrderWithItems {
            order: order.clone(),
            items,
        }
    }
}

/// Lock-protected maps implementing every store trait.
///
/// `set_unavailable(true)` makes every call fail with an upstream error,
/// which is how tests exercise store outages.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    state: Arc<RwLock<State>>,
    unavailable: Arc<AtomicBool>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check(&self) -> Result<(), ServiceError> {
        if self.unavailable.load(Ordering::SeqCst) {
            Err(ServiceError::Upstream("store unavailable".to_string()))
        } else {
            Ok(())
        }
    }
}

fn newest_first<T, F>(values: &mut [T], created: F)
where
    F: Fn(&T) -> chrono::DateTime<Utc>,
{
    values.sort_by(|a, b| created(b).cmp(&created(a)));
}

#[async_trait]
impl CommerceStore for InMemoryStore {
    async fn find_cart_by_user(&self, user_id: Uuid) -> Result<Option<cart::Model>, ServiceError> {
        self.check()?;
        let state = self.state.read().await;
        Ok(state.carts.values().find(|c| c.user_id == user_id).cloned())
    }

    async fn create_cart(&self, user_id: Uuid) -> Result<cart::Model, ServiceError> {
        self.check()?;
        let mut state = self.state.write().await;
        if let Some(existing) = state.carts.values().find(|c| c.user_id == user_id) {
            return Ok(existing.clone());
        }
        let now = Utc::now();
        let cart = cart::Model {
            id: Uuid::new_v4(),
            user_id,
            created_at: now,
            updated_at: now,
        };
        state.carts.insert(cart.id, cart.clone());
        Ok(cart)
    }

    async fn find_cart_item(
        &self,
        item_id: Uuid,
    ) -> Result<Option<cart_item::Model>, ServiceError> {
        self.check()?;
        Ok(self.state.read().await.cart_items.get(&item_id).cloned())
    }

    async fn upsert_cart_item(
        &self,
        cart_id: Uuid,
        product_id: Uuid,
        variant: &cart_item::Variant,
        quantity: i32,
    ) -> Result<cart_item::Model, ServiceError> {
        self.check()?;
        let mut state = self.state.write().await;
        let now = Utc::now();

        if let Some(existing) = state.cart_items.values_mut().find(|item| {
            item.cart_id == cart_id
                && item.product_id == product_id
                && item.size == variant.size_column()
                && item.color == variant.color_column()
        }) {
            existing.quantity = existing
                .quantity
                .checked_add(quantity)
                .filter(|total| *total <= cart_item::MAX_QUANTITY)
                .ok_or_else(|| {
                    ServiceError::InvalidArgument(format!(
                        "line quantity cannot exceed {}",
                        cart_item::MAX_QUANTITY
                    ))
                })?;
            existing.updated_at = now;
            return Ok(existing.clone());
        }

        let item = cart_item::Model {
            id: Uuid::new_v4(),
            cart_id,
            product_id,
            quantity,
            size: variant.size_column().to_string(),
            color: variant.color_column().to_string(),
            created_at: now,
            updated_at: now,
        };
        state.cart_items.insert(item.id, item.clone());
        Ok(item)
    }

    async fn set_cart_item_quantity(
        &self,
        item_id: Uuid,
        quantity: i32,
    ) -> Result<cart_item::Model, ServiceError> {
        self.check()?;
        let mut state = self.state.write().await;
        let item = state
            .cart_items
            .get_mut(&item_id)
            .ok_or_else(|| ServiceError::NotFound("Cart item not found".to_string()))?;
        item.quantity = quantity;
        item.updated_at = Utc::now();
        Ok(item.clone())
    }

    async fn delete_cart_item(&self, item_id: Uuid) -> Result<(), ServiceError> {
        self.check()?;
        self.state.write().await.cart_items.remove(&item_id);
        Ok(())
    }

    async fn delete_cart_items(&self, cart_id: Uuid) -> Result<u64, ServiceError> {
        self.check()?;
        let mut state = self.state.write().await;
        let before = state.cart_items.len();
        state.cart_items.retain(|_, item| item.cart_id != cart_id);
        Ok((before - state.cart_items.len()) as u64)
    }

    async fn cart_lines(&self, cart_id: Uuid) -> Result<Vec<CartLine>, ServiceError> {
        self.check()?;
        let state = self.state.read().await;
        let mut items: Vec<_> = state
            .cart_items
            .values()
            .filter(|item| item.cart_id == cart_id)
            .cloned()
            .collect();
        items.sort_by_key(|item| (item.created_at, item.id));

        Ok(items
            .into_iter()
            .filter_map(|item| {
                let product = state.products.get(&item.product_id)?;
                Some(CartLine::new(item, state.with_category(product)))
            })
            .collect())
    }

    async fn create_order_with_items(
        &self,
        draft: &OrderDraft,
    ) -> Result<OrderWithItems, ServiceError> {
        self.check()?;
        let mut state = self.state.write().await;

        let all_present = draft.source_item_ids.iter().all(|id| {
            state
                .cart_items
                .get(id)
                .map(|item| item.cart_id == draft.cart_id)
                .unwrap_or(false)
        });
        if !all_present {
            return Err(ServiceError::InvalidState(
                "cart changed during checkout; no order was placed".to_string(),
            ));
        }

        let now = Utc::now();
        let order = order::Model {
            id: Uuid::new_v4(),
            user_id: draft.user_id,
            total: draft.total,
            status: OrderStatus::Pending,
            payment_intent_id: None,
            created_at: now,
            updated_at: now,
        };
        let items: Vec<order_item::Model> = draft
            .items
            .iter()
            .map(|line| order_item::Model {
                id: Uuid::new_v4(),
                order_id: order.id,
                product_id: line.product_id,
                quantity: line.quantity,
                unit_price: line.unit_price,
                size: line.size.clone(),
                color: line.color.clone(),
            })
            .collect();

        for id in &draft.source_item_ids {
            state.cart_items.remove(id);
        }
        state.orders.insert(order.id, order.clone());
        for item in &items {
            state.order_items.insert(item.id, item.clone());
        }

        Ok(OrderWithItems { order, items })
    }

    async fn find_order(&self, order_id: Uuid) -> Result<Option<order::Model>, ServiceError> {
        self.check()?;
        Ok(self.state.read().await.orders.get(&order_id).cloned())
    }

    async fn find_order_with_items(
        &self,
        order_id: Uuid,
    ) -> Result<Option<OrderWithItems>, ServiceError> {
        self.check()?;
        let state = self.state.read().await;
        Ok(state
            .orders
            .get(&order_id)
            .map(|order| state.order_with_items(order)))
    }

    async fn list_orders_for_user(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<OrderWithItems>, ServiceError> {
        self.check()?;
        let state = self.state.read().await;
        let mut orders: Vec<_> = state
            .orders
            .values()
            .filter(|order| order.user_id == user_id)
            .cloned()
            .collect();
        newest_first(&mut orders, |o| o.created_at);
        Ok(orders
            .iter()
            .map(|order| state.order_with_items(order))
            .collect())
    }

    async fn list_orders(
        &self,
        page: PageRequest,
    ) -> Result<(Vec<OrderWithItems>, u64), ServiceError> {
        self.check()?;
        let state = self.state.read().await;
        let mut orders: Vec<_> = state.orders.values().cloned().collect();
        newest_first(&mut orders, |o| o.created_at);
        let total = orders.len() as u64;
        let items = orders
            .iter()
            .skip(page.offset() as usize)
            .take(page.limit as usize)
            .map(|order| state.order_with_items(order))
            .collect();
        Ok((items, total))
    }

    async fn update_order_status(
        &self,
        order_id: Uuid,
        from: OrderStatus,
        to: OrderStatus,
    ) -> Result<bool, ServiceError> {
        self.check()?;
        let mut state = self.state.write().await;
        match state.orders.get_mut(&order_id) {
            Some(order) if order.status == from => {
                order.status = to;
                order.updated_at = Utc::now();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn set_payment_intent(
        &self,
        order_id: Uuid,
        payment_intent_id: &str,
    ) -> Result<(), ServiceError> {
        self.check()?;
        let mut state = self.state.write().await;
        let order = state
            .orders
            .get_mut(&order_id)
            .ok_or_else(|| ServiceError::NotFound("Order not found".to_string()))?;
        order.payment_intent_id = Some(payment_intent_id.to_string());
        order.updated_at = Utc::now();
        Ok(())
    }
}

#[async_trait]
impl CatalogStore for InMemoryStore {
    async fn create_category(
        &self,
        category: category::Model,
    ) -> Result<category::Model, ServiceError> {
        self.check()?;
        let mut state = self.state.write().await;
        if state.categories.values().any(|c| c.slug == category.slug) {
            return Err(ServiceError::Conflict(
                "category slug already exists".to_string(),
            ));
        }
        state.categories.insert(category.id, category.clone());
        Ok(category)
    }

    async fn list_categories(&self) -> Result<Vec<category::Model>, ServiceError> {
        self.check()?;
        let mut categories: Vec<_> = self
            .state
            .read()
            .await
            .categories
            .values()
            .cloned()
            .collect();
        newest_first(&mut categories, |c| c.created_at);
        Ok(categories)
    }

    async fn find_category(&self, id: Uuid) -> Result<Option<category::Model>, ServiceError> {
        self.check()?;
        Ok(self.state.read().await.categories.get(&id).cloned())
    }

    async fn update_category(
        &self,
        category: category::Model,
    ) -> Result<category::Model, ServiceError> {
        self.check()?;
        let mut state = self.state.write().await;
        if !state.categories.contains_key(&category.id) {
            return Err(ServiceError::NotFound("Category not found".to_string()));
        }
        if state
            .categories
            .values()
            .any(|c| c.id != category.id && c.slug == category.slug)
        {
            return Err(ServiceError::Conflict(
                "category slug already exists".to_string(),
            ));
        }
        state.categories.insert(category.id, category.clone());
        Ok(category)
    }

    async fn delete_category(&self, id: Uuid) -> Result<bool, ServiceError> {
        self.check()?;
        let mut state = self.state.write().await;
        if state.products.values().any(|p| p.category_id == id) {
            return Err(ServiceError::Conflict(
                "category still has products".to_string(),
            ));
        }
        Ok(state.categories.remove(&id).is_some())
    }

    async fn create_product(
        &self,
        product: product::Model,
    ) -> Result<product::Model, ServiceError> {
        self.check()?;
        let mut state = self.state.write().await;
        if state.products.values().any(|p| p.slug == product.slug) {
            return Err(ServiceError::Conflict(
                "product slug already exists".to_string(),
            ));
        }
        if !state.categories.contains_key(&product.category_id) {
            return Err(ServiceError::Conflict(
                "product category does not exist".to_string(),
            ));
        }
        state.products.insert(product.id, product.clone());
        Ok(product)
    }

    async fn find_product(&self, id: Uuid) -> Result<Option<ProductWithCategory>, ServiceError> {
        self.check()?;
        let state = self.state.read().await;
        Ok(state.products.get(&id).map(|p| state.with_category(p)))
    }

    async fn find_product_by_slug(
        &self,
        slug: &str,
    ) -> Result<Option<ProductWithCategory>, ServiceError> {
        self.check()?;
        let state = self.state.read().await;
        Ok(state
            .products
            .values()
            .find(|p| p.slug == slug)
            .map(|p| state.with_category(p)))
    }

    async fn update_product(
        &self,
        product: product::Model,
    ) -> Result<product::Model, ServiceError> {
        self.check()?;
        let mut state = self.state.write().await;
        if !state.products.contains_key(&product.id) {
            return Err(ServiceError::NotFound("Product not found".to_string()));
        }
        if state
            .products
            .values()
            .any(|p| p.id != product.id && p.slug == product.slug)
        {
            return Err(ServiceError::Conflict(
                "product slug already exists".to_string(),
            ));
        }
        state.products.insert(product.id, product.clone());
        Ok(product)
    }

    async fn delete_product(&self, id: Uuid) -> Result<bool, ServiceError> {
        self.check()?;
        let mut state = self.state.write().await;
        if state.order_items.values().any(|item| item.product_id == id) {
            return Err(ServiceError::Conflict(
                "product is referenced by orders".to_string(),
            ));
        }
        state.cart_items.retain(|_, item| item.product_id != id);
        Ok(state.products.remove(&id).is_some())
    }

    async fn search_products(
        &self,
        filter: &ProductFilter,
        page: PageRequest,
    ) -> Result<(Vec<ProductWithCategory>, u64), ServiceError> {
        self.check()?;
        let state = self.state.read().await;
        let needle = filter.search.as_deref().map(str::to_lowercase);

        let mut matches: Vec<&product::Model> = state
            .products
            .values()
            .filter(|p| match &needle {
                Some(needle) => {
                    p.name.to_lowercase().contains(needle)
                        || p
                            .description
                            .as_deref()
                            .map(|d| d.to_lowercase().contains(needle))
                            .unwrap_or(false)
                }
                None => true,
            })
            .filter(|p| match filter.category.as_deref() {
                Some(name) => state
                    .categories
                    .get(&p.category_id)
                    .map(|c| c.name == name)
                    .unwrap_or(false),
                None => true,
            })
            .filter(|p| filter.min_price.map_or(true, |min| p.price >= min))
            .filter(|p| filter.max_price.map_or(true, |max| p.price <= max))
            .collect();

        matches.sort_by(|a, b| {
            let ordering = match filter.sort.field {
                ProductSortField::Name => a.name.cmp(&b.name),
                ProductSortField::Price => a.price.cmp(&b.price),
                ProductSortField::CreatedAt => a.created_at.cmp(&b.created_at),
                ProductSortField::Stock => a.stock.cmp(&b.stock),
            };
            let ordering = if filter.sort.descending {
                ordering.reverse()
            } else {
                ordering
            };
            ordering.then_with(|| a.id.cmp(&b.id))
        });

        let total = matches.len() as u64;
        let items = matches
            .into_iter()
            .skip(page.offset() as usize)
            .take(page.limit as usize)
            .map(|p| state.with_category(p))
            .collect();
        Ok((items, total))
    }

    async fn products_in_category(
        &self,
        category_id: Uuid,
    ) -> Result<Vec<ProductWithCategory>, ServiceError> {
        self.check()?;
        let state = self.state.read().await;
        let mut products: Vec<_> = state
            .products
            .values()
            .filter(|p| p.category_id == category_id)
            .cloned()
            .collect();
        newest_first(&mut products, |p| p.created_at);
        Ok(products.iter().map(|p| state.with_category(p)).collect())
    }
}

#[async_trait]
impl AccountStore for InMemoryStore {
    async fn create_user(&self, user: user::Model) -> Result<user::Model, ServiceError> {
        self.check()?;
        let mut state = self.state.write().await;
        if state.users.values().any(|u| u.email == user.email) {
            return Err(ServiceError::Conflict("email already registered".to_string()));
        }
        state.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn find_user(&self, id: Uuid) -> Result<Option<user::Model>, ServiceError> {
        self.check()?;
        Ok(self.state.read().await.users.get(&id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<user::Model>, ServiceError> {
        self.check()?;
        Ok(self
            .state
            .read()
            .await
            .users
            .values()
            .find(|u| u.email == email)
            .cloned())
    }

    async fn update_user(&self, user: user::Model) -> Result<user::Model, ServiceError> {
        self.check()?;
        let mut state = self.state.write().await;
        if !state.users.contains_key(&user.id) {
            return Err(ServiceError::NotFound("User not found".to_string()));
        }
        if state
            .users
            .values()
            .any(|u| u.id != user.id && u.email == user.email)
        {
            return Err(ServiceError::Conflict("email already registered".to_string()));
        }
        state.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn list_addresses(&self, user_id: Uuid) -> Result<Vec<address::Model>, ServiceError> {
        self.check()?;
        let mut addresses: Vec<_> = self
            .state
            .read()
            .await
            .addresses
            .values()
            .filter(|a| a.user_id == user_id)
            .cloned()
            .collect();
        addresses.sort_by_key(|a| (a.created_at, a.id));
        Ok(addresses)
    }

    async fn find_address(&self, id: Uuid) -> Result<Option<address::Model>, ServiceError> {
        self.check()?;
        Ok(self.state.read().await.addresses.get(&id).cloned())
    }

    async fn create_address(
        &self,
        address: address::Model,
    ) -> Result<address::Model, ServiceError> {
        self.check()?;
        self.state
            .write()
            .await
            .addresses
            .insert(address.id, address.clone());
        Ok(address)
    }

    async fn update_address(
        &self,
        address: address::Model,
    ) -> Result<address::Model, ServiceError> {
        self.check()?;
        let mut state = self.state.write().await;
        match state.addresses.get_mut(&address.id) {
            Some(existing) => {
                *existing = address.clone();
                Ok(address)
            }
            None => Err(ServiceError::NotFound("Address not found".to_string())),
        }
    }

    async fn delete_address(&self, id: Uuid) -> Result<bool, ServiceError> {
        self.check()?;
        Ok(self.state.write().await.addresses.remove(&id).is_some())
    }
}
