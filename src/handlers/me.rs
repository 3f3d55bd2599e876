use crate::error::{AppError, AppResult};
use crate::handlers::prompt::{to_responses, PromptResponse};
use crate::middleware::AuthUser;
use crate::models::PromptStatus;
use crate::response::{resolve_page, ApiResponse, PaginatedResponse, PaginationQuery};
use crate::services::{
    like::LikeService,
    prompt::{PromptFilter, PromptService},
};
use axum::{
    extract::{Path, Query},
    response::IntoResponse,
    Extension,
};
use sea_orm::DatabaseConnection;
use serde::Deserialize;
use utoipa::ToSchema;

#[derive(Debug, Deserialize, ToSchema)]
pub struct MyPromptsQuery {
    pub page: Option<u64>,
    pub per_page: Option<u64>,
    /// `pending`, `approved` or `rejected` (display labels accepted too)
    pub status: Option<String>,
}

#[utoipa::path(
    get,
    path = "/api/v1/me/likes",
    security(("jwt_token" = [])),
    params(
        ("page" = Option<u64>, Query, description = "Page number"),
        ("per_page" = Option<u64>, Query, description = "Items per page"),
    ),
    responses(
        (status = 200, description = "Prompts the caller liked", body = PaginatedResponse<PromptResponse>),
        (status = 401, description = "Unauthorized", body = AppError),
    ),
    tag = "me"
)]
pub async fn list_my_likes(
    Extension(db): Extension<DatabaseConnection>,
    auth_user: AuthUser,
    Query(params): Query<PaginationQuery>,
) -> AppResult<impl IntoResponse> {
    let (page, per_page) = params.resolve();

    let (prompts, total) = LikeService::new(db.clone())
        .list_liked(auth_user.user_id, page, per_page)
        .await?;
    let items = to_responses(&PromptService::new(db), prompts).await?;

    Ok(ApiResponse::ok(PaginatedResponse::new(
        items, total, page, per_page,
    )))
}

#[utoipa::path(
    get,
    path = "/api/v1/me/prompts",
    security(("jwt_token" = [])),
    params(
        ("page" = Option<u64>, Query, description = "Page number"),
        ("per_page" = Option<u64>, Query, description = "Items per page"),
        ("status" = Option<String>, Query, description = "Filter by review status"),
    ),
    responses(
        (status = 200, description = "The caller's prompts in any status", body = PaginatedResponse<PromptResponse>),
        (status = 400, description = "Invalid status", body = AppError),
        (status = 401, description = "Unauthorized", body = AppError),
    ),
    tag = "me"
)]
pub async fn list_my_prompts(
    Extension(db): Extension<DatabaseConnection>,
    auth_user: AuthUser,
    Query(params): Query<MyPromptsQuery>,
) -> AppResult<impl IntoResponse> {
    let (page, per_page) = resolve_page(params.page, params.per_page);
    let status = parse_status_filter(params.status.as_deref())?;

    let service = PromptService::new(db);
    let filter = PromptFilter {
        status,
        user_id: Some(auth_user.user_id),
        ..Default::default()
    };
    let (prompts, total) = service.list(&filter, page, per_page).await?;
    let items = to_responses(&service, prompts).await?;

    Ok(ApiResponse::ok(PaginatedResponse::new(
        items, total, page, per_page,
    )))
}

#[utoipa::path(
    delete,
    path = "/api/v1/me/prompts/{id}",
    security(("jwt_token" = [])),
    params(("id" = i32, Path, description = "Prompt ID")),
    responses(
        (status = 200, description = "Prompt deleted", body = String),
        (status = 401, description = "Unauthorized", body = AppError),
        (status = 404, description = "No such prompt owned by the caller", body = AppError),
    ),
    tag = "me"
)]
pub async fn delete_my_prompt(
    Extension(db): Extension<DatabaseConnection>,
    auth_user: AuthUser,
    Path(id): Path<i32>,
) -> AppResult<impl IntoResponse> {
    PromptService::new(db)
        .delete_own(id, auth_user.user_id)
        .await?;
    Ok(ApiResponse::ok("Prompt deleted"))
}

/// Empty and `all` mean no filter.
pub(crate) fn parse_status_filter(raw: Option<&str>) -> AppResult<Option<PromptStatus>> {
    match raw.map(str::trim) {
        None | Some("") | Some("all") | Some("全部") => Ok(None),
        Some(value) => value
            .parse::<PromptStatus>()
            .map(Some)
            .map_err(AppError::Validation),
    }
}
