use crate::error::{AppError, AppResult};
use crate::middleware::AuthUser;
use crate::response::ApiResponse;
use crate::services::like::{LikeService, LikeState};
use axum::{extract::Path, response::IntoResponse, Extension};
use sea_orm::DatabaseConnection;

#[utoipa::path(
    post,
    path = "/api/v1/prompts/{id}/like",
    security(("jwt_token" = [])),
    params(("id" = i32, Path, description = "Prompt ID")),
    responses(
        (status = 200, description = "Like toggled", body = LikeState),
        (status = 401, description = "Unauthorized", body = AppError),
        (status = 404, description = "Prompt not found", body = AppError),
    ),
    tag = "likes"
)]
pub async fn toggle_like(
    Extension(db): Extension<DatabaseConnection>,
    auth_user: AuthUser,
    Path(id): Path<i32>,
) -> AppResult<impl IntoResponse> {
    let service = LikeService::new(db);
    let state = service.toggle(auth_user.user_id, id).await?;
    let message = if state.liked { "Liked" } else { "Like removed" };
    Ok(ApiResponse::with_message(state, message))
}

#[utoipa::path(
    get,
    path = "/api/v1/prompts/{id}/like",
    security(("jwt_token" = [])),
    params(("id" = i32, Path, description = "Prompt ID")),
    responses(
        (status = 200, description = "Current like state", body = LikeState),
        (status = 401, description = "Unauthorized", body = AppError),
        (status = 404, description = "Prompt not found", body = AppError),
    ),
    tag = "likes"
)]
pub async fn get_like_state(
    Extension(db): Extension<DatabaseConnection>,
    auth_user: AuthUser,
    Path(id): Path<i32>,
) -> AppResult<impl IntoResponse> {
    let service = LikeService::new(db);
    Ok(ApiResponse::ok(service.state(auth_user.user_id, id).await?))
}
