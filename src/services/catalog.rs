use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::entities::{category, product};
use crate::errors::ServiceError;
use crate::models::{double_option, Page, PageRequest, Pagination, ProductWithCategory};
use crate::repositories::{CatalogStore, ProductFilter, ProductSort, ProductSortField};

#[derive(Debug, Clone, Deserialize, Serialize, Validate, ToSchema)]
pub struct CreateCategoryInput {
    #[validate(length(min = 1, max = 120, message = "name is required"))]
    pub name: String,
    #[validate(length(min = 1, max = 160, message = "slug is required"))]
    pub slug: String,
    pub description: Option<String>,
    pub image_url: Option<String>,
}

/// Partial category update; `null` clears an optional field
#[derive(Debug, Clone, Default, Deserialize, Serialize, Validate, ToSchema)]
pub struct UpdateCategoryInput {
    #[validate(length(min = 1, max = 120))]
    pub name: Option<String>,
    #[validate(length(min = 1, max = 160))]
    pub slug: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub description: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub image_url: Option<Option<String>>,
}

#[derive(Debug, Clone, Deserialize, Serialize, Validate, ToSchema)]
pub struct CreateProductInput {
    #[validate(length(min = 1, max = 200, message = "name is required"))]
    pub name: String,
    pub description: Option<String>,
    #[schema(value_type = String, example = "19.99")]
    pub price: Decimal,
    #[schema(value_type = Option<String>)]
    pub discount_price: Option<Decimal>,
    #[validate(length(min = 1, max = 200, message = "slug is required"))]
    pub slug: String,
    pub image_url: Option<String>,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub sizes: Vec<String>,
    #[schema(value_type = Option<Object>)]
    pub colors: Option<serde_json::Value>,
    #[serde(default)]
    pub stock: i32,
    pub badge: Option<String>,
    pub category_id: Uuid,
}

/// Partial product update: only provided fields change, `null` clears an
/// optional one
#[derive(Debug, Clone, Default, Deserialize, Serialize, Validate, ToSchema)]
pub struct UpdateProductInput {
    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub description: Option<Option<String>>,
    #[schema(value_type = Option<String>)]
    pub price: Option<Decimal>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub discount_price: Option<Option<Decimal>>,
    #[validate(length(min = 1, max = 200))]
    pub slug: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub image_url: Option<Option<String>>,
    pub images: Option<Vec<String>>,
    pub sizes: Option<Vec<String>>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<Object>)]
    pub colors: Option<Option<serde_json::Value>>,
    pub stock: Option<i32>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub badge: Option<Option<String>>,
    pub category_id: Option<Uuid>,
}

/// Product listing query string
#[derive(Debug, Clone, Default, Deserialize, Serialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct ProductQuery {
    /// Case-insensitive match on name or description
    pub search: Option<String>,
    /// Exact category name
    pub category: Option<String>,
    #[serde(alias = "minPrice")]
    #[param(value_type = Option<String>)]
    #[schema(value_type = Option<String>)]
    pub min_price: Option<Decimal>,
    #[serde(alias = "maxPrice")]
    #[param(value_type = Option<String>)]
    #[schema(value_type = Option<String>)]
    pub max_price: Option<Decimal>,
    /// `name`, `price`, `created_at` or `stock`
    #[serde(alias = "sortBy")]
    pub sort_by: Option<String>,
    /// `asc` (default) or `desc`
    #[serde(alias = "sortOrder")]
    pub sort_order: Option<String>,
    pub page: Option<u64>,
    pub limit: Option<u64>,
}

fn check_money(field: &str, value: Decimal) -> Result<(), ServiceError> {
    if value.is_sign_negative() {
        return Err(ServiceError::InvalidArgument(format!(
            "{} cannot be negative",
            field
        )));
    }
    Ok(())
}

fn check_stock(stock: i32) -> Result<(), ServiceError> {
    if stock < 0 {
        return Err(ServiceError::InvalidArgument(
            "stock cannot be negative".to_string(),
        ));
    }
    Ok(())
}

impl ProductQuery {
    /// Validates the query into store criteria and a page request.
    pub fn into_filter(
        self,
        default_limit: u64,
        max_limit: u64,
    ) -> Result<(ProductFilter, PageRequest), ServiceError> {
        let page = PageRequest::new(self.page, self.limit, default_limit, max_limit)?;

        if let (Some(min), Some(max)) = (self.min_price, self.max_price) {
            if min > max {
                return Err(ServiceError::InvalidArgument(
                    "min_price cannot exceed max_price".to_string(),
                ));
            }
        }

        let sort = match self.sort_by.as_deref() {
            None => ProductSort::default(),
            Some(raw) => {
                let field: ProductSortField = raw.parse()?;
                let descending = match self.sort_order.as_deref() {
                    None | Some("asc") => false,
                    Some("desc") => true,
                    Some(other) => {
                        return Err(ServiceError::InvalidArgument(format!(
                            "sort_order must be 'asc' or 'desc', got '{}'",
                            other
                        )))
                    }
                };
                ProductSort { field, descending }
            }
        };

        let search = self
            .search
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());
        let category = self.category.filter(|c| !c.is_empty());

        Ok((
            ProductFilter {
                search,
                category,
                min_price: self.min_price,
                max_price: self.max_price,
                sort,
            },
            page,
        ))
    }
}

/// Categories and products
#[derive(Clone)]
pub struct CatalogService {
    store: Arc<dyn CatalogStore>,
    default_page_size: u64,
    max_page_size: u64,
}

impl CatalogService {
    pub fn new(store: Arc<dyn CatalogStore>, default_page_size: u64, max_page_size: u64) -> Self {
        Self {
            store,
            default_page_size,
            max_page_size,
        }
    }

    #[instrument(skip(self, input), fields(slug = %input.slug))]
    pub async fn create_category(
        &self,
        input: CreateCategoryInput,
    ) -> Result<category::Model, ServiceError> {
        input.validate()?;
        let now = Utc::now();
        let created = self
            .store
            .create_category(category::Model {
                id: Uuid::new_v4(),
                name: input.name.trim().to_string(),
                slug: input.slug.trim().to_string(),
                description: input.description,
                image_url: input.image_url,
                created_at: now,
                updated_at: now,
            })
            .await?;
        info!(category_id = %created.id, "category created");
        Ok(created)
    }

    pub async fn list_categories(&self) -> Result<Vec<category::Model>, ServiceError> {
        self.store.list_categories().await
    }

    pub async fn get_category(&self, id: Uuid) -> Result<category::Model, ServiceError> {
        self.store
            .find_category(id)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Category not found".to_string()))
    }

    #[instrument(skip(self, input))]
    pub async fn update_category(
        &self,
        id: Uuid,
        input: UpdateCategoryInput,
    ) -> Result<category::Model, ServiceError> {
        input.validate()?;
        let mut current = self.get_category(id).await?;

        if let Some(name) = input.name {
            current.name = name.trim().to_string();
        }
        if let Some(slug) = input.slug {
            current.slug = slug.trim().to_string();
        }
        if let Some(description) = input.description {
            current.description = description;
        }
        if let Some(image_url) = input.image_url {
            current.image_url = image_url;
        }
        current.updated_at = Utc::now();

        let updated = self.store.update_category(current).await?;
        info!(category_id = %updated.id, "category updated");
        Ok(updated)
    }

    #[instrument(skip(self))]
    pub async fn delete_category(&self, id: Uuid) -> Result<(), ServiceError> {
        if !self.store.delete_category(id).await? {
            return Err(ServiceError::NotFound("Category not found".to_string()));
        }
        info!(category_id = %id, "category deleted");
        Ok(())
    }

    #[instrument(skip(self, input), fields(slug = %input.slug))]
    pub async fn create_product(
        &self,
        input: CreateProductInput,
    ) -> Result<ProductWithCategory, ServiceError> {
        input.validate()?;
        check_money("price", input.price)?;
        if let Some(discount) = input.discount_price {
            check_money("discount_price", discount)?;
        }
        check_stock(input.stock)?;
        self.get_category(input.category_id).await?;

        let now = Utc::now();
        let created = self
            .store
            .create_product(product::Model {
                id: Uuid::new_v4(),
                name: input.name.trim().to_string(),
                description: input.description,
                price: input.price,
                discount_price: input.discount_price,
                slug: input.slug.trim().to_string(),
                image_url: input.image_url,
                images: input.images.into(),
                sizes: input.sizes.into(),
                colors: input.colors,
                stock: input.stock,
                badge: input.badge,
                category_id: input.category_id,
                created_at: now,
                updated_at: now,
            })
            .await?;

        info!(product_id = %created.id, "product created");
        self.get_product(created.id).await
    }

    pub async fn get_product(&self, id: Uuid) -> Result<ProductWithCategory, ServiceError> {
        self.store
            .find_product(id)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Product not found".to_string()))
    }

    pub async fn get_product_by_slug(&self, slug: &str) -> Result<ProductWithCategory, ServiceError> {
        self.store
            .find_product_by_slug(slug)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Product not found".to_string()))
    }

    /// Newest first
    pub async fn products_in_category(
        &self,
        category_id: Uuid,
    ) -> Result<Vec<ProductWithCategory>, ServiceError> {
        self.store.products_in_category(category_id).await
    }

    #[instrument(skip(self, input))]
    pub async fn update_product(
        &self,
        id: Uuid,
        input: UpdateProductInput,
    ) -> Result<ProductWithCategory, ServiceError> {
        input.validate()?;
        let mut current = self.get_product(id).await?.product;

        if let Some(name) = input.name {
            current.name = name.trim().to_string();
        }
        if let Some(description) = input.description {
            current.description = description;
        }
        if let Some(price) = input.price {
            check_money("price", price)?;
            current.price = price;
        }
        if let Some(discount_price) = input.discount_price {
            if let Some(discount) = discount_price {
                check_money("discount_price", discount)?;
            }
            current.discount_price = discount_price;
        }
        if let Some(slug) = input.slug {
            current.slug = slug.trim().to_string();
        }
        if let Some(image_url) = input.image_url {
            current.image_url = image_url;
        }
        if let Some(images) = input.images {
            current.images = images.into();
        }
        if let Some(sizes) = input.sizes {
            current.sizes = sizes.into();
        }
        if let Some(colors) = input.colors {
            current.colors = colors;
        }
        if let Some(stock) = input.stock {
            check_stock(stock)?;
            current.stock = stock;
        }
        if let Some(badge) = input.badge {
            current.badge = badge;
        }
        if let Some(category_id) = input.category_id {
            self.get_category(category_id).await?;
            current.category_id = category_id;
        }
        current.updated_at = Utc::now();

        self.store.update_product(current).await?;
        info!(product_id = %id, "product updated");
        self.get_product(id).await
    }

    #[instrument(skip(self))]
    pub async fn delete_product(&self, id: Uuid) -> Result<(), ServiceError> {
        if !self.store.delete_product(id).await? {
            return Err(ServiceError::NotFound("Product not found".to_string()));
        }
        info!(product_id = %id, "product deleted");
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn list_products(
        &self,
        query: ProductQuery,
    ) -> Result<Page<ProductWithCategory>, ServiceError> {
        let (filter, page) = query.into_filter(self.default_page_size, self.max_page_size)?;
        let (items, total) = self.store.search_products(&filter, page).await?;
        Ok(Page {
            items,
            pagination: Pagination::new(total, page.page, page.limit),
        })
    }
}
