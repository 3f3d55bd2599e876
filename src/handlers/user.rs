use crate::error::{AppError, AppResult};
use crate::handlers::prompt::{to_responses, PromptResponse};
use crate::models::{PromptStatus, UserModel, UserRole};
use crate::response::{ApiResponse, PaginatedResponse, PaginationQuery};
use crate::services::{
    prompt::{PromptFilter, PromptService},
    user::UserService,
};
use axum::{
    extract::{Path, Query},
    response::IntoResponse,
    Extension,
};
use sea_orm::DatabaseConnection;
use serde::Serialize;
use utoipa::ToSchema;

/// What anyone may see about an account.
#[derive(Debug, Serialize, ToSchema)]
pub struct UserProfileResponse {
    pub id: i32,
    pub username: String,
    pub role: UserRole,
    /// Number of approved prompts
    pub prompt_count: u64,
    pub created_at: String,
}

impl UserProfileResponse {
    fn new(user: UserModel, prompt_count: u64) -> Self {
        Self {
            id: user.id,
            username: user.username,
            role: user.role,
            prompt_count,
            created_at: user.created_at.to_string(),
        }
    }
}

fn approved_by(user_id: i32) -> PromptFilter {
    PromptFilter {
        status: Some(PromptStatus::Approved),
        user_id: Some(user_id),
        ..Default::default()
    }
}

#[utoipa::path(
    get,
    path = "/api/v1/users/{id}",
    params(("id" = i32, Path, description = "User ID")),
    responses(
        (status = 200, description = "Public profile", body = UserProfileResponse),
        (status = 404, description = "User not found", body = AppError),
    ),
    tag = "users"
)]
pub async fn get_user_profile(
    Extension(db): Extension<DatabaseConnection>,
    Path(id): Path<i32>,
) -> AppResult<impl IntoResponse> {
    let user = UserService::new(db.clone()).get_by_id(id).await?;
    let prompt_count = PromptService::new(db).count(&approved_by(id)).await?;
    Ok(ApiResponse::ok(UserProfileResponse::new(user, prompt_count)))
}

#[utoipa::path(
    get,
    path = "/api/v1/users/{id}/prompts",
    params(
        ("id" = i32, Path, description = "User ID"),
        ("page" = Option<u64>, Query, description = "Page number"),
        ("per_page" = Option<u64>, Query, description = "Items per page"),
    ),
    responses(
        (status = 200, description = "The user's approved prompts", body = PaginatedResponse<PromptResponse>),
        (status = 404, description = "User not found", body = AppError),
    ),
    tag = "users"
)]
pub async fn list_user_prompts(
    Extension(db): Extension<DatabaseConnection>,
    Path(id): Path<i32>,
    Query(params): Query<PaginationQuery>,
) -> AppResult<impl IntoResponse> {
    let (page, per_page) = params.resolve();
    UserService::new(db.clone()).get_by_id(id).await?;

    let service = PromptService::new(db);
    let (prompts, total) = service.list(&approved_by(id), page, per_page).await?;
    let items = to_responses(&service, prompts).await?;

    Ok(ApiResponse::ok(PaginatedResponse::new(
        items, total, page, per_page,
    )))
}
