use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{
    sea_query::{Expr, Func, LikeExpr, Order, Query},
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DatabaseConnection, DbErr,
    EntityTrait, LoaderTrait, ModelTrait, PaginatorTrait, QueryFilter, QueryOrder, Set, SqlErr,
    TransactionTrait,
};
use std::{future::Future, sync::Arc, time::Duration};
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use super::{
    AccountStore, CatalogStore, CommerceStore, ProductFilter, ProductSortField,
};
use crate::entities::{
    address, cart, cart_item, category, order, order_item, product, user, OrderStatus,
};
use crate::errors::ServiceError;
use crate::models::{CartLine, OrderDraft, OrderWithItems, PageRequest, ProductWithCategory};

const DEFAULT_QUERY_TIMEOUT: Duration = Duration::from_secs(5);

/// Relational store over a sea-orm connection pool (Postgres or SQLite).
///
/// Every operation runs under `query_timeout`; expiry is reported as a
/// database error rather than left to the request timeout.
#[derive(Debug, Clone)]
pub struct SeaOrmStore {
    db: Arc<DatabaseConnection>,
    query_timeout: Duration,
}

impl SeaOrmStore {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self {
            db,
            query_timeout: DEFAULT_QUERY_TIMEOUT,
        }
    }

    pub fn with_query_timeout(mut self, query_timeout: Duration) -> Self {
        self.query_timeout = query_timeout;
        self
    }

    pub fn connection(&self) -> &DatabaseConnection {
        &self.db
    }
}

async fn bounded<T, F>(limit: Duration, operation: F) -> Result<T, ServiceError>
where
    F: Future<Output = Result<T, ServiceError>>,
{
    match tokio::time::timeout(limit, operation).await {
        Ok(result) => result,
        Err(_) => {
            warn!(?limit, "store operation timed out");
            Err(ServiceError::DatabaseError(DbErr::Custom(
                "store operation timed out".to_string(),
            )))
        }
    }
}

const LIKE_ESCAPE: char = '\\';

/// `%needle%` with the needle's own wildcards matched literally.
fn contains_pattern(needle: &str) -> String {
    let mut escaped = String::with_capacity(needle.len() + 2);
    escaped.push('%');
    for c in needle.chars() {
        if matches!(c, '%' | '_' | LIKE_ESCAPE) {
            escaped.push(LIKE_ESCAPE);
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

fn is_unique_violation(err: &DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}

fn map_update_err(err: DbErr, what: &str, conflict_message: &str) -> ServiceError {
    match err {
        DbErr::RecordNotUpdated | DbErr::RecordNotFound(_) => {
            ServiceError::NotFound(format!("{} not found", what))
        }
        other => ServiceError::from_db_write(other, conflict_message),
    }
}

async fn find_line<C: ConnectionTrait>(
    db: &C,
    cart_id: Uuid,
    product_id: Uuid,
    variant: &cart_item::Variant,
) -> Result<Option<cart_item::Model>, DbErr> {
    cart_item::Entity::find()
        .filter(cart_item::Column::CartId.eq(cart_id))
        .filter(cart_item::Column::ProductId.eq(product_id))
        .filter(cart_item::Column::Size.eq(variant.size_column()))
        .filter(cart_item::Column::Color.eq(variant.color_column()))
        .one(db)
        .await
}

/// Atomic `quantity = quantity + n`, so concurrent adds never lose an update.
/// The row is only touched while the sum stays within `MAX_QUANTITY`.
async fn increment_line<C: ConnectionTrait>(
    db: &C,
    item_id: Uuid,
    quantity: i32,
) -> Result<cart_item::Model, ServiceError> {
    let headroom = cart_item::MAX_QUANTITY.saturating_sub(quantity);
    let updated = cart_item::Entity::update_many()
        .col_expr(
            cart_item::Column::Quantity,
            Expr::col(cart_item::Column::Quantity).add(quantity),
        )
        .col_expr(cart_item::Column::UpdatedAt, Expr::value(Utc::now()))
        .filter(cart_item::Column::Id.eq(item_id))
        .filter(cart_item::Column::Quantity.lte(headroom))
        .exec(db)
        .await?
        .rows_affected;

    let item = cart_item::Entity::find_by_id(item_id)
        .one(db)
        .await?
        .ok_or_else(|| ServiceError::NotFound("Cart item not found".to_string()))?;
    if updated == 0 {
        return Err(ServiceError::InvalidArgument(format!(
            "line quantity cannot exceed {}",
            cart_item::MAX_QUANTITY
        )));
    }
    Ok(item)
}

async fn with_categories<C: ConnectionTrait>(
    db: &C,
    products: Vec<product::Model>,
) -> Result<Vec<ProductWithCategory>, DbErr> {
    let categories = products.load_one(category::Entity, db).await?;
    Ok(products
        .into_iter()
        .zip(categories)
        .map(|(product, category)| ProductWithCategory { product, category })
        .collect())
}

async fn with_items<C: ConnectionTrait>(
    db: &C,
    orders: Vec<order::Model>,
) -> Result<Vec<OrderWithItems>, DbErr> {
    let items = orders.load_many(order_item::Entity, db).await?;
    Ok(orders
        .into_iter()
        .zip(items)
        .map(|(order, items)| OrderWithItems { order, items })
        .collect())
}

fn category_active(model: category::Model) -> category::ActiveModel {
    category::ActiveModel {
        id: Set(model.id),
        name: Set(model.name),
        slug: Set(model.slug),
        description: Set(model.description),
        image_url: Set(model.image_url),
        created_at: Set(model.created_at),
        updated_at: Set(model.updated_at),
    }
}

fn product_active(model: product::Model) -> product::ActiveModel {
    product::ActiveModel {
        id: Set(model.id),
        name: Set(model.name),
        description: Set(model.description),
        price: Set(model.price),
        discount_price: Set(model.discount_price),
        slug: Set(model.slug),
        image_url: Set(model.image_url),
        images: Set(model.images),
        sizes: Set(model.sizes),
        colors: Set(model.colors),
        stock: Set(model.stock),
        badge: Set(model.badge),
        category_id: Set(model.category_id),
        created_at: Set(model.created_at),
        updated_at: Set(model.updated_at),
    }
}

fn user_active(model: user::Model) -> user::ActiveModel {
    user::ActiveModel {
        id: Set(model.id),
        email: Set(model.email),
        password_hash: Set(model.password_hash),
        name: Set(model.name),
        role: Set(model.role),
        created_at: Set(model.created_at),
        updated_at: Set(model.updated_at),
    }
}

fn address_active(model: address::Model) -> address::ActiveModel {
    address::ActiveModel {
        id: Set(model.id),
        user_id: Set(model.user_id),
        address_line1: Set(model.address_line1),
        address_line2: Set(model.address_line2),
        city: Set(model.city),
        state: Set(model.state),
        postal_code: Set(model.postal_code),
        country: Set(model.country),
        phone: Set(model.phone),
        created_at: Set(model.created_at),
        updated_at: Set(model.updated_at),
    }
}

#[async_trait]
impl CommerceStore for SeaOrmStore {
    async fn find_cart_by_user(&self, user_id: Uuid) -> Result<Option<cart::Model>, ServiceError> {
        bounded(self.query_timeout, async move {
            Ok(cart::Entity::find()
                .filter(cart::Column::UserId.eq(user_id))
                .one(self.connection())
                .await?)
        })
        .await
    }

    #[instrument(skip(self))]
    async fn create_cart(&self, user_id: Uuid) -> Result<cart::Model, ServiceError> {
        bounded(self.query_timeout, async move {
            let now = Utc::now();
            let cart = cart::ActiveModel {
                id: Set(Uuid::new_v4()),
                user_id: Set(user_id),
                created_at: Set(now),
                updated_at: Set(now),
            };

            match cart.insert(self.connection()).await {
                Ok(cart) => Ok(cart),
                Err(err) if is_unique_violation(&err) => {
                    debug!(%user_id, "cart created by a concurrent request; reusing it");
                    self.find_cart_by_user(user_id).await?.ok_or_else(|| {
                        ServiceError::Internal("cart missing after unique violation".to_string())
                    })
                }
                Err(err) => Err(err.into()),
            }
        })
        .await
    }

    async fn find_cart_item(
        &self,
        item_id: Uuid,
    ) -> Result<Option<cart_item::Model>, ServiceError> {
        bounded(self.query_timeout, async move {
            Ok(cart_item::Entity::find_by_id(item_id)
                .one(self.connection())
                .await?)
        })
        .await
    }

    #[instrument(skip(self, variant))]
    async fn upsert_cart_item(
        &self,
        cart_id: Uuid,
        product_id: Uuid,
        variant: &cart_item::Variant,
        quantity: i32,
    ) -> Result<cart_item::Model, ServiceError> {
        bounded(self.query_timeout, async move {
            let db = self.connection();

            if let Some(existing) = find_line(db, cart_id, product_id, variant).await? {
                return increment_line(db, existing.id, quantity).await;
            }

            let now = Utc::now();
            let line = cart_item::ActiveModel {
                id: Set(Uuid::new_v4()),
                cart_id: Set(cart_id),
                product_id: Set(product_id),
                quantity: Set(quantity),
                size: Set(variant.size_column().to_string()),
                color: Set(variant.color_column().to_string()),
                created_at: Set(now),
                updated_at: Set(now),
            };

            match line.insert(db).await {
                Ok(item) => Ok(item),
                Err(err) if is_unique_violation(&err) => {
                    debug!(%cart_id, %product_id, "cart line inserted concurrently; incrementing");
                    let existing = find_line(db, cart_id, product_id, variant)
                        .await?
                        .ok_or_else(|| {
                            ServiceError::Internal("cart line missing after unique violation".into())
                        })?;
                    increment_line(db, existing.id, quantity).await
                }
                Err(err) => Err(err.into()),
            }
        })
        .await
    }

    async fn set_cart_item_quantity(
        &self,
        item_id: Uuid,
        quantity: i32,
    ) -> Result<cart_item::Model, ServiceError> {
        bounded(self.query_timeout, async move {
            let item = cart_item::Entity::find_by_id(item_id)
                .one(self.connection())
                .await?
                .ok_or_else(|| ServiceError::NotFound("Cart item not found".to_string()))?;

            let mut active: cart_item::ActiveModel = item.into();
            active.quantity = Set(quantity);
            active.updated_at = Set(Utc::now());
            active
                .update(self.connection())
                .await
                .map_err(|e| map_update_err(e, "Cart item", "cart item conflict"))
        })
        .await
    }

    async fn delete_cart_item(&self, item_id: Uuid) -> Result<(), ServiceError> {
        bounded(self.query_timeout, async move {
            cart_item::Entity::delete_by_id(item_id)
                .exec(self.connection())
                .await?;
            Ok(())
        })
        .await
    }

    async fn delete_cart_items(&self, cart_id: Uuid) -> Result<u64, ServiceError> {
        bounded(self.query_timeout, async move {
            let result = cart_item::Entity::delete_many()
                .filter(cart_item::Column::CartId.eq(cart_id))
                .exec(self.connection())
                .await?;
            Ok(result.rows_affected)
        })
        .await
    }

    async fn cart_lines(&self, cart_id: Uuid) -> Result<Vec<CartLine>, ServiceError> {
        bounded(self.query_timeout, async move {
            let db = self.connection();
            let rows = cart_item::Entity::find()
                .filter(cart_item::Column::CartId.eq(cart_id))
                .order_by_asc(cart_item::Column::CreatedAt)
                .find_also_related(product::Entity)
                .all(db)
                .await?;

            let (items, products): (Vec<_>, Vec<_>) = rows
                .into_iter()
                .filter_map(|(item, product)| product.map(|p| (item, p)))
                .unzip();
            let products = with_categories(db, products).await?;

            Ok(items
                .into_iter()
                .zip(products)
                .map(|(item, product)| CartLine::new(item, product))
                .collect())
        })
        .await
    }

    #[instrument(skip(self, draft), fields(user_id = %draft.user_id, lines = draft.items.len()))]
    async fn create_order_with_items(
        &self,
        draft: &OrderDraft,
    ) -> Result<OrderWithItems, ServiceError> {
        bounded(self.query_timeout, async move {
            let txn = self.db.begin().await?;
            let now = Utc::now();

            let order = order::ActiveModel {
                id: Set(Uuid::new_v4()),
                user_id: Set(draft.user_id),
                total: Set(draft.total),
                status: Set(OrderStatus::Pending),
                payment_intent_id: Set(None),
                created_at: Set(now),
                updated_at: Set(now),
            }
            .insert(&txn)
            .await?;

            let mut items = Vec::with_capacity(draft.items.len());
            for line in &draft.items {
                let item = order_item::ActiveModel {
                    id: Set(Uuid::new_v4()),
                    order_id: Set(order.id),
                    product_id: Set(line.product_id),
                    quantity: Set(line.quantity),
                    unit_price: Set(line.unit_price),
                    size: Set(line.size.clone()),
                    color: Set(line.color.clone()),
                }
                .insert(&txn)
                .await?;
                items.push(item);
            }

            let removed = cart_item::Entity::delete_many()
                .filter(cart_item::Column::CartId.eq(draft.cart_id))
                .filter(cart_item::Column::Id.is_in(draft.source_item_ids.clone()))
                .exec(&txn)
                .await?
                .rows_affected;

            if removed != draft.source_item_ids.len() as u64 {
                txn.rollback().await?;
                warn!(
                    expected = draft.source_item_ids.len(),
                    removed, "cart lines consumed concurrently; order rolled back"
                );
                return Err(ServiceError::InvalidState(
                    "cart changed during checkout; no order was placed".to_string(),
                ));
            }

            txn.commit().await?;
            Ok(OrderWithItems { order, items })
        })
        .await
    }

    async fn find_order(&self, order_id: Uuid) -> Result<Option<order::Model>, ServiceError> {
        bounded(self.query_timeout, async move {
            Ok(order::Entity::find_by_id(order_id)
                .one(self.connection())
                .await?)
        })
        .await
    }

    async fn find_order_with_items(
        &self,
        order_id: Uuid,
    ) -> Result<Option<OrderWithItems>, ServiceError> {
        bounded(self.query_timeout, async move {
            let db = self.connection();
            let Some(order) = order::Entity::find_by_id(order_id).one(db).await? else {
                return Ok(None);
            };
            let items = order.find_related(order_item::Entity).all(db).await?;
            Ok(Some(OrderWithItems { order, items }))
        })
        .await
    }

    async fn list_orders_for_user(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<OrderWithItems>, ServiceError> {
        bounded(self.query_timeout, async move {
            let db = self.connection();
            let orders = order::Entity::find()
                .filter(order::Column::UserId.eq(user_id))
                .order_by_desc(order::Column::CreatedAt)
                .all(db)
                .await?;
            Ok(with_items(db, orders).await?)
        })
        .await
    }

    async fn list_orders(
        &self,
        page: PageRequest,
    ) -> Result<(Vec<OrderWithItems>, u64), ServiceError> {
        bounded(self.query_timeout, async move {
            let db = self.connection();
            let paginator = order::Entity::find()
                .order_by_desc(order::Column::CreatedAt)
                .paginate(db, page.limit);

            let total = paginator.num_items().await?;
            let orders = paginator.fetch_page(page.page - 1).await?;

            Ok((with_items(db, orders).await?, total))
        })
        .await
    }

    #[instrument(skip(self))]
    async fn update_order_status(
        &self,
        order_id: Uuid,
        from: OrderStatus,
        to: OrderStatus,
    ) -> Result<bool, ServiceError> {
        bounded(self.query_timeout, async move {
            let result = order::Entity::update_many()
                .col_expr(order::Column::Status, Expr::value(to.as_str()))
                .col_expr(order::Column::UpdatedAt, Expr::value(Utc::now()))
                .filter(order::Column::Id.eq(order_id))
                .filter(order::Column::Status.eq(from.as_str()))
                .exec(self.connection())
                .await?;
            Ok(result.rows_affected == 1)
        })
        .await
    }

    async fn set_payment_intent(
        &self,
        order_id: Uuid,
        payment_intent_id: &str,
    ) -> Result<(), ServiceError> {
        bounded(self.query_timeout, async move {
            let result = order::Entity::update_many()
                .col_expr(order::Column::PaymentIntentId, Expr::value(payment_intent_id))
                .col_expr(order::Column::UpdatedAt, Expr::value(Utc::now()))
                .filter(order::Column::Id.eq(order_id))
                .exec(self.connection())
                .await?;
            if result.rows_affected == 0 {
                return Err(ServiceError::NotFound("Order not found".to_string()));
            }
            Ok(())
        })
        .await
    }
}

#[async_trait]
impl CatalogStore for SeaOrmStore {
    async fn create_category(
        &self,
        category: category::Model,
    ) -> Result<category::Model, ServiceError> {
        bounded(self.query_timeout, async move {
            category_active(category)
                .insert(self.connection())
                .await
                .map_err(|e| ServiceError::from_db_write(e, "category slug already exists"))
        })
        .await
    }

    async fn list_categories(&self) -> Result<Vec<category::Model>, ServiceError> {
        bounded(self.query_timeout, async move {
            Ok(category::Entity::find()
                .order_by_desc(category::Column::CreatedAt)
                .all(self.connection())
                .await?)
        })
        .await
    }

    async fn find_category(&self, id: Uuid) -> Result<Option<category::Model>, ServiceError> {
        bounded(self.query_timeout, async move {
            Ok(category::Entity::find_by_id(id)
                .one(self.connection())
                .await?)
        })
        .await
    }

    async fn update_category(
        &self,
        category: category::Model,
    ) -> Result<category::Model, ServiceError> {
        bounded(self.query_timeout, async move {
            category_active(category)
                .update(self.connection())
                .await
                .map_err(|e| map_update_err(e, "Category", "category slug already exists"))
        })
        .await
    }

    async fn delete_category(&self, id: Uuid) -> Result<bool, ServiceError> {
        bounded(self.query_timeout, async move {
            let result = category::Entity::delete_by_id(id)
                .exec(self.connection())
                .await
                .map_err(|e| ServiceError::from_db_write(e, "category still has products"))?;
            Ok(result.rows_affected > 0)
        })
        .await
    }

    async fn create_product(
        &self,
        product: product::Model,
    ) -> Result<product::Model, ServiceError> {
        bounded(self.query_timeout, async move {
            product_active(product)
                .insert(self.connection())
                .await
                .map_err(|e| ServiceError::from_db_write(e, "product slug already exists"))
        })
        .await
    }

    async fn find_product(&self, id: Uuid) -> Result<Option<ProductWithCategory>, ServiceError> {
        bounded(self.query_timeout, async move {
            Ok(product::Entity::find_by_id(id)
                .find_also_related(category::Entity)
                .one(self.connection())
                .await?
                .map(|(product, category)| ProductWithCategory { product, category }))
        })
        .await
    }

    async fn find_product_by_slug(
        &self,
        slug: &str,
    ) -> Result<Option<ProductWithCategory>, ServiceError> {
        bounded(self.query_timeout, async move {
            Ok(product::Entity::find()
                .filter(product::Column::Slug.eq(slug))
                .find_also_related(category::Entity)
                .one(self.connection())
                .await?
                .map(|(product, category)| ProductWithCategory { product, category }))
        })
        .await
    }

    async fn update_product(
        &self,
        product: product::Model,
    ) -> Result<product::Model, ServiceError> {
        bounded(self.query_timeout, async move {
            product_active(product)
                .update(self.connection())
                .await
                .map_err(|e| map_update_err(e, "Product", "product slug already exists"))
        })
        .await
    }

    async fn delete_product(&self, id: Uuid) -> Result<bool, ServiceError> {
        bounded(self.query_timeout, async move {
            let result = product::Entity::delete_by_id(id)
                .exec(self.connection())
                .await
                .map_err(|e| ServiceError::from_db_write(e, "product is referenced by orders"))?;
            Ok(result.rows_affected > 0)
        })
        .await
    }

    #[instrument(skip(self))]
    async fn search_products(
        &self,
        filter: &ProductFilter,
        page: PageRequest,
    ) -> Result<(Vec<ProductWithCategory>, u64), ServiceError> {
        bounded(self.query_timeout, async move {
            let mut select = product::Entity::find();

            if let Some(search) = filter.search.as_deref() {
                let pattern = contains_pattern(&search.to_lowercase());
                select = select.filter(
                    Condition::any()
                        .add(
                            Expr::expr(Func::lower(Expr::col((
                                product::Entity,
                                product::Column::Name,
                            ))))
                            .like(LikeExpr::new(pattern.clone()).escape(LIKE_ESCAPE)),
                        )
                        .add(
                            Expr::expr(Func::lower(Expr::col((
                                product::Entity,
                                product::Column::Description,
                            ))))
                            .like(LikeExpr::new(pattern).escape(LIKE_ESCAPE)),
                        ),
                );
            }

            if let Some(name) = filter.category.as_deref() {
                select = select.filter(
                    product::Column::CategoryId.in_subquery(
                        Query::select()
                            .column(category::Column::Id)
                            .from(category::Entity)
                            .and_where(category::Column::Name.eq(name))
                            .to_owned(),
                    ),
                );
            }

            if let Some(min) = filter.min_price {
                select = select.filter(product::Column::Price.gte(min));
            }
            if let Some(max) = filter.max_price {
                select = select.filter(product::Column::Price.lte(max));
            }

            let column = match filter.sort.field {
                ProductSortField::Name => product::Column::Name,
                ProductSortField::Price => product::Column::Price,
                ProductSortField::CreatedAt => product::Column::CreatedAt,
                ProductSortField::Stock => product::Column::Stock,
            };
            let direction = if filter.sort.descending {
                Order::Desc
            } else {
                Order::Asc
            };
            select = select
                .order_by(column, direction)
                .order_by(product::Column::Id, Order::Asc);

            let paginator = select
                .find_also_related(category::Entity)
                .paginate(self.connection(), page.limit);
            let total = paginator.num_items().await?;
            let rows = paginator.fetch_page(page.page - 1).await?;

            Ok((
                rows.into_iter()
                    .map(|(product, category)| ProductWithCategory { product, category })
                    .collect(),
                total,
            ))
        })
        .await
    }

    async fn products_in_category(
        &self,
        category_id: Uuid,
    ) -> Result<Vec<ProductWithCategory>, ServiceError> {
        bounded(self.query_timeout, async move {
            let db = self.connection();
            let products = product::Entity::find()
                .filter(product::Column::CategoryId.eq(category_id))
                .order_by_desc(product::Column::CreatedAt)
                .all(db)
                .await?;
            Ok(with_categories(db, products).await?)
        })
        .await
    }
}

#[async_trait]
impl AccountStore for SeaOrmStore {
    async fn create_user(&self, user: user::Model) -> Result<user::Model, ServiceError> {
        bounded(self.query_timeout, async move {
            user_active(user)
                .insert(self.connection())
                .await
                .map_err(|e| ServiceError::from_db_write(e, "email already registered"))
        })
        .await
    }

    async fn find_user(&self, id: Uuid) -> Result<Option<user::Model>, ServiceError> {
        bounded(self.query_timeout, async move {
            Ok(user::Entity::find_by_id(id).one(self.connection()).await?)
        })
        .await
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<user::Model>, ServiceError> {
        bounded(self.query_timeout, async move {
            Ok(user::Entity::find()
                .filter(user::Column::Email.eq(email))
                .one(self.connection())
                .await?)
        })
        .await
    }

    async fn update_user(&self, user: user::Model) -> Result<user::Model, ServiceError> {
        bounded(self.query_timeout, async move {
            user_active(user)
                .update(self.connection())
                .await
                .map_err(|e| map_update_err(e, "User", "email already registered"))
        })
        .await
    }

    async fn list_addresses(&self, user_id: Uuid) -> Result<Vec<address::Model>, ServiceError> {
        bounded(self.query_timeout, async move {
            Ok(address::Entity::find()
                .filter(address::Column::UserId.eq(user_id))
                .order_by_asc(address::Column::CreatedAt)
                .all(self.connection())
                .await?)
        })
        .await
    }

    async fn find_address(&self, id: Uuid) -> Result<Option<address::Model>, ServiceError> {
        bounded(self.query_timeout, async move {
            Ok(address::Entity::find_by_id(id)
                .one(self.connection())
                .await?)
        })
        .await
    }

    async fn create_address(
        &self,
        address: address::Model,
    ) -> Result<address::Model, ServiceError> {
        bounded(self.query_timeout, async move {
            Ok(address_active(address).insert(self.connection()).await?)
        })
        .await
    }

    async fn update_address(
        &self,
        address: address::Model,
    ) -> Result<address::Model, ServiceError> {
        bounded(self.query_timeout, async move {
            address_active(address)
                .update(self.connection())
                .await
                .map_err(|e| map_update_err(e, "Address", "address conflict"))
        })
        .await
    }

    async fn delete_address(&self, id: Uuid) -> Result<bool, ServiceError> {
        bounded(self.query_timeout, async move {
            let result = address::Entity::delete_by_id(id)
                .exec(self.connection())
                .await?;
            Ok(result.rows_affected > 0)
        })
        .await
    }
}
