use crate::error::{AppError, AppResult};
use crate::middleware::auth::{require_permission, AuthUser};
use crate::models::{CategoryModel, Permission};
use crate::response::ApiResponse;
use crate::services::cache::CacheService;
use crate::services::category::{CategoryInput, CategoryService, CategoryWithCount};
use axum::{extract::Path, response::IntoResponse, Extension, Json};
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CategoryRequest {
    #[validate(length(min = 1, max = 50))]
    pub name: String,
    /// Lowercase letters, digits and hyphens
    #[validate(length(min = 1, max = 50))]
    pub slug: String,
    #[validate(length(max = 500))]
    pub description: Option<String>,
    pub sort_order: Option<i32>,
}

impl CategoryRequest {
    fn as_input(&self) -> CategoryInput<'_> {
        CategoryInput {
            name: self.name.trim(),
            slug: self.slug.trim(),
            description: self.description.as_deref().unwrap_or("").trim(),
            sort_order: self.sort_order.unwrap_or(0),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CategoryResponse {
    pub id: i32,
    pub name: String,
    pub slug: String,
    pub description: String,
    pub sort_order: i32,
    pub created_at: String,
    pub updated_at: String,
}

impl From<CategoryModel> for CategoryResponse {
    fn from(c: CategoryModel) -> Self {
        Self {
            id: c.id,
            name: c.name,
            slug: c.slug,
            description: c.description,
            sort_order: c.sort_order,
            created_at: c.created_at.to_string(),
            updated_at: c.updated_at.to_string(),
        }
    }
}

fn make_category_service(
    db: DatabaseConnection,
    cache: Option<Extension<CacheService>>,
) -> CategoryService {
    let service = CategoryService::new(db);
    match cache {
        Some(Extension(c)) => service.with_cache(c),
        None => service,
    }
}

#[utoipa::path(
    get,
    path = "/api/v1/categories",
    responses(
        (status = 200, description = "Categories with approved prompt counts", body = Vec<CategoryWithCount>),
    ),
    tag = "categories"
)]
pub async fn list_categories(
    Extension(db): Extension<DatabaseConnection>,
    cache: Option<Extension<CacheService>>,
) -> AppResult<impl IntoResponse> {
    let service = make_category_service(db, cache);
    Ok(ApiResponse::ok(service.list().await?))
}

#[utoipa::path(
    get,
    path = "/api/v1/categories/{slug}",
    params(("slug" = String, Path, description = "Category slug")),
    responses(
        (status = 200, description = "Category details", body = CategoryWithCount),
        (status = 404, description = "Category not found", body = AppError),
    ),
    tag = "categories"
)]
pub async fn get_category(
    Extension(db): Extension<DatabaseConnection>,
    Path(slug): Path<String>,
) -> AppResult<impl IntoResponse> {
    let service = CategoryService::new(db);
    Ok(ApiResponse::ok(service.get_by_slug(&slug).await?))
}

#[utoipa::path(
    post,
    path = "/api/v1/admin/categories",
    security(("jwt_token" = [])),
    request_body = CategoryRequest,
    responses(
        (status = 200, description = "Category created", body = CategoryResponse),
        (status = 400, description = "Validation error", body = AppError),
        (status = 403, description = "Requires system.settings", body = AppError),
        (status = 409, description = "Name or slug taken", body = AppError),
    ),
    tag = "admin"
)]
pub async fn create_category(
    Extension(db): Extension<DatabaseConnection>,
    cache: Option<Extension<CacheService>>,
    auth_user: AuthUser,
    Json(payload): Json<CategoryRequest>,
) -> AppResult<impl IntoResponse> {
    let actor_id = require_permission(&auth_user, Permission::SystemSettings)?;
    payload.validate()?;

    let service = make_category_service(db, cache);
    let category = service.create(actor_id, payload.as_input()).await?;
    Ok(ApiResponse::ok(CategoryResponse::from(category)))
}

#[utoipa::path(
    put,
    path = "/api/v1/admin/categories/{id}",
    security(("jwt_token" = [])),
    params(("id" = i32, Path, description = "Category ID")),
    request_body = CategoryRequest,
    responses(
        (status = 200, description = "Category updated", body = CategoryResponse),
        (status = 403, description = "Requires system.settings", body = AppError),
        (status = 404, description = "Category not found", body = AppError),
        (status = 409, description = "Name or slug taken", body = AppError),
    ),
    tag = "admin"
)]
pub async fn update_category(
    Extension(db): Extension<DatabaseConnection>,
    cache: Option<Extension<CacheService>>,
    auth_user: AuthUser,
    Path(id): Path<i32>,
    Json(payload): Json<CategoryRequest>,
) -> AppResult<impl IntoResponse> {
    let actor_id = require_permission(&auth_user, Permission::SystemSettings)?;
    payload.validate()?;

    let service = make_category_service(db, cache);
    let category = service.update(actor_id, id, payload.as_input()).await?;
    Ok(ApiResponse::ok(CategoryResponse::from(category)))
}

#[utoipa::path(
    delete,
    path = "/api/v1/admin/categories/{id}",
    security(("jwt_token" = [])),
    params(("id" = i32, Path, description = "Category ID")),
    responses(
        (status = 200, description = "Category deleted", body = String),
        (status = 403, description = "Requires system.settings", body = AppError),
        (status = 404, description = "Category not found", body = AppError),
        (status = 409, description = "Category still has prompts", body = AppError),
    ),
    tag = "admin"
)]
pub async fn delete_category(
    Extension(db): Extension<DatabaseConnection>,
    cache: Option<Extension<CacheService>>,
    auth_user: AuthUser,
    Path(id): Path<i32>,
) -> AppResult<impl IntoResponse> {
    let actor_id = require_permission(&auth_user, Permission::SystemSettings)?;

    let service = make_category_service(db, cache);
    service.delete(actor_id, id).await?;
    Ok(ApiResponse::ok("Category deleted"))
}
