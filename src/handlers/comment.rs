use crate::error::{AppError, AppResult};
use crate::middleware::AuthUser;
use crate::models::{CommentModel, CommentStatus};
use crate::response::{ApiResponse, PaginatedResponse, PaginationQuery};
use crate::services::{comment::CommentService, user::UserService};
use crate::utils::render_markdown;
use axum::{
    extract::{Path, Query},
    response::IntoResponse,
    Extension, Json,
};
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use utoipa::ToSchema;

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateCommentRequest {
    pub prompt_id: i32,
    /// Comment body (Markdown, 1-2000 characters after trimming)
    pub content: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CommentResponse {
    pub id: i32,
    pub prompt_id: i32,
    pub user_id: i32,
    pub author: Option<String>,
    pub content: String,
    pub content_html: String,
    pub status: CommentStatus,
    pub status_label: String,
    pub created_at: String,
}

impl CommentResponse {
    pub fn build(c: CommentModel, authors: &HashMap<i32, String>) -> Self {
        Self {
            id: c.id,
            prompt_id: c.prompt_id,
            user_id: c.user_id,
            author: authors.get(&c.user_id).cloned(),
            content_html: render_markdown(&c.content),
            content: c.content,
            status: c.status,
            status_label: c.status.label().to_string(),
            created_at: c.created_at.to_string(),
        }
    }
}

pub(crate) async fn to_responses(
    db: &DatabaseConnection,
    comments: Vec<CommentModel>,
) -> AppResult<Vec<CommentResponse>> {
    let ids = comments.iter().map(|c| c.user_id).collect();
    let authors = UserService::new(db.clone()).usernames(ids).await?;
    Ok(comments
        .into_iter()
        .map(|c| CommentResponse::build(c, &authors))
        .collect())
}

pub(crate) async fn to_response(
    db: &DatabaseConnection,
    comment: CommentModel,
) -> AppResult<CommentResponse> {
    let authors = UserService::new(db.clone())
        .usernames(vec![comment.user_id])
        .await?;
    Ok(CommentResponse::build(comment, &authors))
}

#[utoipa::path(
    get,
    path = "/api/v1/prompts/{id}/comments",
    params(
        ("id" = i32, Path, description = "Prompt ID"),
        ("page" = Option<u64>, Query, description = "Page number"),
        ("per_page" = Option<u64>, Query, description = "Items per page"),
    ),
    responses(
        (status = 200, description = "Comments, oldest first", body = PaginatedResponse<CommentResponse>),
        (status = 404, description = "Prompt not found", body = AppError),
    ),
    tag = "comments"
)]
pub async fn list_comments(
    Extension(db): Extension<DatabaseConnection>,
    Path(prompt_id): Path<i32>,
    Query(params): Query<PaginationQuery>,
) -> AppResult<impl IntoResponse> {
    let (page, per_page) = params.resolve();

    let service = CommentService::new(db.clone());
    let (comments, total) = service.list_by_prompt(prompt_id, page, per_page).await?;
    let items = to_responses(&db, comments).await?;

    Ok(ApiResponse::ok(PaginatedResponse::new(
        items, total, page, per_page,
    )))
}

#[utoipa::path(
    post,
    path = "/api/v1/comments",
    security(("jwt_token" = [])),
    request_body = CreateCommentRequest,
    responses(
        (status = 200, description = "Comment created", body = CommentResponse),
        (status = 400, description = "Empty or overlong content", body = AppError),
        (status = 401, description = "Unauthorized", body = AppError),
        (status = 404, description = "Prompt not found", body = AppError),
    ),
    tag = "comments"
)]
pub async fn create_comment(
    Extension(db): Extension<DatabaseConnection>,
    auth_user: AuthUser,
    Json(payload): Json<CreateCommentRequest>,
) -> AppResult<impl IntoResponse> {
    let service = CommentService::new(db.clone());
    let comment = service
        .create(payload.prompt_id, auth_user.user_id, &payload.content)
        .await?;

    Ok(ApiResponse::ok(to_response(&db, comment).await?))
}

#[utoipa::path(
    delete,
    path = "/api/v1/comments/{id}",
    security(("jwt_token" = [])),
    params(("id" = i32, Path, description = "Comment ID")),
    responses(
        (status = 200, description = "Comment deleted", body = String),
        (status = 403, description = "Not the author", body = AppError),
        (status = 404, description = "Comment not found", body = AppError),
    ),
    tag = "comments"
)]
pub async fn delete_comment(
    Extension(db): Extension<DatabaseConnection>,
    auth_user: AuthUser,
    Path(id): Path<i32>,
) -> AppResult<impl IntoResponse> {
    let service = CommentService::new(db);
    service.delete(id, &auth_user).await?;
    Ok(ApiResponse::ok("Comment deleted"))
}

#[utoipa::path(
    post,
    path = "/api/v1/comments/{id}/report",
    security(("jwt_token" = [])),
    params(("id" = i32, Path, description = "Comment ID")),
    responses(
        (status = 200, description = "Comment flagged", body = CommentResponse),
        (status = 401, description = "Unauthorized", body = AppError),
        (status = 404, description = "Comment not found", body = AppError),
    ),
    tag = "comments"
)]
pub async fn report_comment(
    Extension(db): Extension<DatabaseConnection>,
    auth_user: AuthUser,
    Path(id): Path<i32>,
) -> AppResult<impl IntoResponse> {
    let service = CommentService::new(db.clone());
    let comment = service.report(id, auth_user.user_id).await?;

    Ok(ApiResponse::with_message(
        to_response(&db, comment).await?,
        "Comment reported",
    ))
}
