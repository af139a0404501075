use axum::{
    extract::{Path, Query, State},
    response::Response,
    Json,
};
use uuid::Uuid;

use crate::errors::ServiceError;
use crate::handlers::common::{created_response, no_content_response};
use crate::models::{Page, ProductWithCategory};
use crate::services::catalog::{CreateProductInput, ProductQuery, UpdateProductInput};
use crate::AppState;

/// Search, filter, sort and page the catalog
#[utoipa::path(
    get,
    path = "/api/products",
    params(ProductQuery),
    responses(
        (status = 200, description = "One page of products", body = Page<ProductWithCategory>),
        (status = 400, description = "Invalid query parameters", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "Catalog"
)]
pub async fn list_products(
    State(state): State<AppState>,
    Query(query): Query<ProductQuery>,
) -> Result<Json<Page<ProductWithCategory>>, ServiceError> {
    Ok(Json(state.services.catalog.list_products(query).await?))
}

#[utoipa::path(
    get,
    path = "/api/products/{id}",
    params(("id" = Uuid, Path, description = "Product id")),
    responses(
        (status = 200, description = "Product with category", body = ProductWithCategory),
        (status = 404, description = "Product not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "Catalog"
)]
pub async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ProductWithCategory>, ServiceError> {
    Ok(Json(state.services.catalog.get_product(id).await?))
}

#[utoipa::path(
    get,
    path = "/api/products/slug/{slug}",
    params(("slug" = String, Path, description = "Product slug")),
    responses(
        (status = 200, description = "Product with category", body = ProductWithCategory),
        (status = 404, description = "Product not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "Catalog"
)]
pub async fn get_product_by_slug(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<ProductWithCategory>, ServiceError> {
    Ok(Json(state.services.catalog.get_product_by_slug(&slug).await?))
}

#[utoipa::path(
    get,
    path = "/api/products/category/{id}",
    params(("id" = Uuid, Path, description = "Category id")),
    responses((status = 200, description = "Products in the category, newest first", body = [ProductWithCategory])),
    security(("Bearer" = [])),
    tag = "Catalog"
)]
pub async fn products_by_category(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<ProductWithCategory>>, ServiceError> {
    Ok(Json(state.services.catalog.products_in_category(id).await?))
}

#[utoipa::path(
    post,
    path = "/api/products",
    request_body = CreateProductInput,
    responses(
        (status = 201, description = "Product created", body = ProductWithCategory),
        (status = 400, description = "Invalid product data", body = crate::errors::ErrorResponse),
        (status = 404, description = "Category not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Slug already in use", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "Catalog"
)]
pub async fn create_product(
    State(state): State<AppState>,
    Json(input): Json<CreateProductInput>,
) -> Result<Response, ServiceError> {
    let created = state.services.catalog.create_product(input).await?;
    Ok(created_response(created))
}

#[utoipa::path(
    put,
    path = "/api/products/{id}",
    params(("id" = Uuid, Path, description = "Product id")),
    request_body = UpdateProductInput,
    responses(
        (status = 200, description = "Product updated", body = ProductWithCategory),
        (status = 404, description = "Product not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "Catalog"
)]
pub async fn update_product(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(input): Json<UpdateProductInput>,
) -> Result<Json<ProductWithCategory>, ServiceError> {
    Ok(Json(state.services.catalog.update_product(id, input).await?))
}

#[utoipa::path(
    delete,
    path = "/api/products/{id}",
    params(("id" = Uuid, Path, description = "Product id")),
    responses(
        (status = 204, description = "Product deleted"),
        (status = 404, description = "Product not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Product is referenced by orders", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "Catalog"
)]
pub async fn delete_product(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Response, ServiceError> {
    state.services.catalog.delete_product(id).await?;
    Ok(no_content_response())
}
