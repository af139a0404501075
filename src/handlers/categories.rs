use axum::{
    extract::{Path, State},
    response::Response,
    Json,
};
use uuid::Uuid;

use crate::entities::category;
use crate::errors::ServiceError;
use crate::handlers::common::{created_response, MessageResponse};
use crate::services::catalog::{CreateCategoryInput, UpdateCategoryInput};
use crate::AppState;

#[utoipa::path(
    get,
    path = "/api/categories",
    responses((status = 200, description = "Categories, newest first", body = [category::Model])),
    security(("Bearer" = [])),
    tag = "Catalog"
)]
pub async fn list_categories(
    State(state): State<AppState>,
) -> Result<Json<Vec<category::Model>>, ServiceError> {
    Ok(Json(state.services.catalog.list_categories().await?))
}

#[utoipa::path(
    get,
    path = "/api/categories/{id}",
    params(("id" = Uuid, Path, description = "Category id")),
    responses(
        (status = 200, description = "Category", body = category::Model),
        (status = 404, description = "Category not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "Catalog"
)]
pub async fn get_category(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<category::Model>, ServiceError> {
    Ok(Json(state.services.catalog.get_category(id).await?))
}

#[utoipa::path(
    post,
    path = "/api/categories",
    request_body = CreateCategoryInput,
    responses(
        (status = 201, description = "Category created", body = category::Model),
        (status = 400, description = "Name and slug are required", body = crate::errors::ErrorResponse),
        (status = 403, description = "Admins only", body = crate::errors::ErrorResponse),
        (status = 409, description = "Slug already in use", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "Catalog"
)]
pub async fn create_category(
    State(state): State<AppState>,
    Json(input): Json<CreateCategoryInput>,
) -> Result<Response, ServiceError> {
    let created = state.services.catalog.create_category(input).await?;
    Ok(created_response(created))
}

#[utoipa::path(
    put,
    path = "/api/categories/{id}",
    params(("id" = Uuid, Path, description = "Category id")),
    request_body = UpdateCategoryInput,
    responses(
        (status = 200, description = "Category updated", body = category::Model),
        (status = 404, description = "Category not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Slug already in use", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "Catalog"
)]
pub async fn update_category(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(input): Json<UpdateCategoryInput>,
) -> Result<Json<category::Model>, ServiceError> {
    Ok(Json(state.services.catalog.update_category(id, input).await?))
}

#[utoipa::path(
    delete,
    path = "/api/categories/{id}",
    params(("id" = Uuid, Path, description = "Category id")),
    responses(
        (status = 200, description = "Category deleted", body = MessageResponse),
        (status = 404, description = "Category not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Category still has products", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "Catalog"
)]
pub async fn delete_category(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<MessageResponse>, ServiceError> {
    state.services.catalog.delete_category(id).await?;
    Ok(Json(MessageResponse::new("Category deleted successfully")))
}
