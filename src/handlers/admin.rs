use crate::error::{AppError, AppResult};
use crate::handlers::auth::UserResponse;
use crate::handlers::comment::{self, CommentResponse};
use crate::handlers::me::parse_status_filter;
use crate::handlers::prompt::{self, PromptResponse};
use crate::middleware::auth::{require_admin, require_permission, AuthUser};
use crate::models::{AuditLogModel, CommentStatus, Permission, PermissionMatrix, UserRole};
use crate::response::{resolve_page, ApiResponse, PaginatedResponse};
use crate::services::{
    admin::{AdminService, AdminStats},
    audit::AuditService,
    cache::CacheService,
    comment::CommentService,
    moderation::{ModerationService, ReviewDecision},
    prompt::{PromptFilter, PromptService, PromptSort},
    user::{NewUser, UserService},
};
use axum::{
    extract::{Path, Query},
    response::IntoResponse,
    Extension, Json,
};
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use utoipa::ToSchema;
use validator::Validate;

const MAX_BATCH: usize = 100;

fn check_batch(ids: &[i32]) -> AppResult<()> {
    if ids.is_empty() {
        return Err(AppError::Validation("ids cannot be empty".to_string()));
    }
    if ids.len() > MAX_BATCH {
        return Err(AppError::Validation(format!(
            "At most {MAX_BATCH} ids per request"
        )));
    }
    Ok(())
}

fn make_moderation_service(
    db: DatabaseConnection,
    cache: Option<Extension<CacheService>>,
) -> ModerationService {
    let service = ModerationService::new(db);
    match cache {
        Some(Extension(c)) => service.with_cache(c),
        None => service,
    }
}

#[utoipa::path(
    get,
    path = "/api/v1/admin/stats",
    security(("jwt_token" = [])),
    responses(
        (status = 200, description = "Dashboard counters", body = AdminStats),
        (status = 401, description = "Unauthorized", body = AppError),
        (status = 403, description = "Requires system.analytics", body = AppError),
    ),
    tag = "admin"
)]
pub async fn get_stats(
    Extension(db): Extension<DatabaseConnection>,
    auth_user: AuthUser,
) -> AppResult<impl IntoResponse> {
    require_permission(&auth_user, Permission::SystemAnalytics)?;
    let stats = AdminService::new(db).get_stats().await?;
    Ok(ApiResponse::ok(stats))
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct AdminPromptQuery {
    pub page: Option<u64>,
    pub per_page: Option<u64>,
    /// Review status; display labels accepted
    pub status: Option<String>,
    pub q: Option<String>,
    pub category_id: Option<i32>,
    pub user_id: Option<i32>,
    /// `new` (default) or `popular`
    pub sort: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct BatchIdsRequest {
    pub ids: Vec<i32>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct BatchDeleteResponse {
    pub deleted: u64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PendingCountResponse {
    pub count: u64,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct ReviewRequest {
    /// `pending`, `approved` or `rejected` (display labels accepted)
    pub status: String,
    /// Kept only when rejecting
    #[validate(length(max = 500))]
    pub reason: Option<String>,
}

impl ReviewRequest {
    fn decision(&self) -> AppResult<ReviewDecision> {
        self.validate()?;
        let status = self.status.parse().map_err(AppError::Validation)?;
        Ok(ReviewDecision::new(status, self.reason.as_deref()))
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct BatchReviewRequest {
    pub ids: Vec<i32>,
    pub status: String,
    #[validate(length(max = 500))]
    pub reason: Option<String>,
}

#[utoipa::path(
    get,
    path = "/api/v1/admin/prompts",
    security(("jwt_token" = [])),
    params(
        ("page" = Option<u64>, Query, description = "Page number"),
        ("per_page" = Option<u64>, Query, description = "Items per page"),
        ("status" = Option<String>, Query, description = "Review status"),
        ("q" = Option<String>, Query, description = "Search text"),
        ("category_id" = Option<i32>, Query, description = "Category ID"),
        ("user_id" = Option<i32>, Query, description = "Author ID"),
        ("sort" = Option<String>, Query, description = "Sort order: new, popular"),
    ),
    responses(
        (status = 200, description = "Prompts in every status", body = PaginatedResponse<PromptResponse>),
        (status = 400, description = "Invalid filter", body = AppError),
        (status = 403, description = "Requires prompts.view", body = AppError),
    ),
    tag = "admin"
)]
pub async fn list_prompts(
    Extension(db): Extension<DatabaseConnection>,
    auth_user: AuthUser,
    Query(params): Query<AdminPromptQuery>,
) -> AppResult<impl IntoResponse> {
    require_permission(&auth_user, Permission::PromptsView)?;

    let (page, per_page) = resolve_page(params.page, params.per_page);
    let filter = PromptFilter {
        status: parse_status_filter(params.status.as_deref())?,
        category_id: params.category_id,
        user_id: params.user_id,
        search: params.q,
        sort: params.sort.as_deref().unwrap_or_default().parse::<PromptSort>()?,
        ..Default::default()
    };

    let service = PromptService::new(db);
    let (prompts, total) = service.list(&filter, page, per_page).await?;
    let items = prompt::to_responses(&service, prompts).await?;

    Ok(ApiResponse::ok(PaginatedResponse::new(
        items, total, page, per_page,
    )))
}

#[utoipa::path(
    get,
    path = "/api/v1/admin/prompts/pending-count",
    security(("jwt_token" = [])),
    responses(
        (status = 200, description = "Prompts awaiting review", body = PendingCountResponse),
        (status = 403, description = "Requires prompts.review", body = AppError),
    ),
    tag = "admin"
)]
pub async fn pending_count(
    Extension(db): Extension<DatabaseConnection>,
    auth_user: AuthUser,
) -> AppResult<impl IntoResponse> {
    require_permission(&auth_user, Permission::PromptsReview)?;
    let count = ModerationService::new(db).pending_count().await?;
    Ok(ApiResponse::ok(PendingCountResponse { count }))
}

#[utoipa::path(
    put,
    path = "/api/v1/admin/prompts/{id}/review",
    security(("jwt_token" = [])),
    params(("id" = i32, Path, description = "Prompt ID")),
    request_body = ReviewRequest,
    responses(
        (status = 200, description = "Review applied", body = PromptResponse),
        (status = 400, description = "Invalid status", body = AppError),
        (status = 403, description = "Requires prompts.review", body = AppError),
        (status = 404, description = "Prompt not found", body = AppError),
    ),
    tag = "admin"
)]
pub async fn review_prompt(
    Extension(db): Extension<DatabaseConnection>,
    cache: Option<Extension<CacheService>>,
    auth_user: AuthUser,
    Path(id): Path<i32>,
    Json(payload): Json<ReviewRequest>,
) -> AppResult<impl IntoResponse> {
    let reviewer_id = require_permission(&auth_user, Permission::PromptsReview)?;
    let decision = payload.decision()?;

    let updated = make_moderation_service(db.clone(), cache)
        .review(id, &decision, reviewer_id)
        .await?;
    let response = prompt::to_response(&PromptService::new(db), updated).await?;

    Ok(ApiResponse::with_message(
        response,
        format!("Prompt {}", decision.status),
    ))
}

#[utoipa::path(
    put,
    path = "/api/v1/admin/prompts/review",
    security(("jwt_token" = [])),
    request_body = BatchReviewRequest,
    responses(
        (status = 200, description = "Review applied to every id", body = Vec<PromptResponse>),
        (status = 400, description = "Invalid status or ids", body = AppError),
        (status = 403, description = "Requires prompts.review", body = AppError),
        (status = 404, description = "One of the prompts does not exist", body = AppError),
    ),
    tag = "admin"
)]
pub async fn batch_review(
    Extension(db): Extension<DatabaseConnection>,
    cache: Option<Extension<CacheService>>,
    auth_user: AuthUser,
    Json(payload): Json<BatchReviewRequest>,
) -> AppResult<impl IntoResponse> {
    let reviewer_id = require_permission(&auth_user, Permission::PromptsReview)?;
    check_batch(&payload.ids)?;
    let decision = ReviewRequest {
        status: payload.status,
        reason: payload.reason,
    }
    .decision()?;

    let updated = make_moderation_service(db.clone(), cache)
        .review_many(&payload.ids, &decision, reviewer_id)
        .await?;
    let items = prompt::to_responses(&PromptService::new(db), updated).await?;

    Ok(ApiResponse::ok(items))
}

#[utoipa::path(
    delete,
    path = "/api/v1/admin/prompts/{id}",
    security(("jwt_token" = [])),
    params(("id" = i32, Path, description = "Prompt ID")),
    responses(
        (status = 200, description = "Prompt deleted", body = String),
        (status = 403, description = "Requires prompts.delete", body = AppError),
        (status = 404, description = "Prompt not found", body = AppError),
    ),
    tag = "admin"
)]
pub async fn delete_prompt(
    Extension(db): Extension<DatabaseConnection>,
    auth_user: AuthUser,
    Path(id): Path<i32>,
) -> AppResult<impl IntoResponse> {
    require_permission(&auth_user, Permission::PromptsDelete)?;
    PromptService::new(db).delete(id, &auth_user).await?;
    Ok(ApiResponse::ok("Prompt deleted"))
}

#[utoipa::path(
    delete,
    path = "/api/v1/admin/prompts",
    security(("jwt_token" = [])),
    request_body = BatchIdsRequest,
    responses(
        (status = 200, description = "Prompts deleted", body = BatchDeleteResponse),
        (status = 400, description = "Empty or oversized batch", body = AppError),
        (status = 403, description = "Requires prompts.delete", body = AppError),
    ),
    tag = "admin"
)]
pub async fn batch_delete_prompts(
    Extension(db): Extension<DatabaseConnection>,
    auth_user: AuthUser,
    Json(payload): Json<BatchIdsRequest>,
) -> AppResult<impl IntoResponse> {
    let actor_id = require_permission(&auth_user, Permission::PromptsDelete)?;
    check_batch(&payload.ids)?;

    let deleted = PromptService::new(db)
        .delete_many(&payload.ids, actor_id)
        .await?;
    Ok(ApiResponse::ok(BatchDeleteResponse { deleted }))
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct AdminCommentQuery {
    pub page: Option<u64>,
    pub per_page: Option<u64>,
    /// `normal` or `reported` (display labels accepted)
    pub status: Option<String>,
    pub prompt_id: Option<i32>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CommentStatusRequest {
    pub status: String,
}

#[utoipa::path(
    get,
    path = "/api/v1/admin/comments",
    security(("jwt_token" = [])),
    params(
        ("page" = Option<u64>, Query, description = "Page number"),
        ("per_page" = Option<u64>, Query, description = "Items per page"),
        ("status" = Option<String>, Query, description = "normal or reported"),
        ("prompt_id" = Option<i32>, Query, description = "Prompt ID"),
    ),
    responses(
        (status = 200, description = "Comments, newest first", body = PaginatedResponse<CommentResponse>),
        (status = 400, description = "Invalid status", body = AppError),
        (status = 403, description = "Requires comments.view", body = AppError),
    ),
    tag = "admin"
)]
pub async fn list_comments(
    Extension(db): Extension<DatabaseConnection>,
    auth_user: AuthUser,
    Query(params): Query<AdminCommentQuery>,
) -> AppResult<impl IntoResponse> {
    require_permission(&auth_user, Permission::CommentsView)?;

    let (page, per_page) = resolve_page(params.page, params.per_page);
    let status = match params.status.as_deref().map(str::trim) {
        None | Some("") | Some("all") => None,
        Some(raw) => Some(raw.parse::<CommentStatus>().map_err(AppError::Validation)?),
    };

    let (comments, total) = CommentService::new(db.clone())
        .admin_list(status, params.prompt_id, page, per_page)
        .await?;
    let items = comment::to_responses(&db, comments).await?;

    Ok(ApiResponse::ok(PaginatedResponse::new(
        items, total, page, per_page,
    )))
}

#[utoipa::path(
    put,
    path = "/api/v1/admin/comments/{id}/status",
    security(("jwt_token" = [])),
    params(("id" = i32, Path, description = "Comment ID")),
    request_body = CommentStatusRequest,
    responses(
        (status = 200, description = "Status updated", body = CommentResponse),
        (status = 400, description = "Invalid status", body = AppError),
        (status = 403, description = "Requires comments.moderate", body = AppError),
        (status = 404, description = "Comment not found", body = AppError),
    ),
    tag = "admin"
)]
pub async fn set_comment_status(
    Extension(db): Extension<DatabaseConnection>,
    auth_user: AuthUser,
    Path(id): Path<i32>,
    Json(payload): Json<CommentStatusRequest>,
) -> AppResult<impl IntoResponse> {
    let actor_id = require_permission(&auth_user, Permission::CommentsModerate)?;
    let status: CommentStatus = payload.status.parse().map_err(AppError::Validation)?;

    let updated = CommentService::new(db.clone())
        .set_status(id, status, actor_id)
        .await?;
    Ok(ApiResponse::ok(comment::to_response(&db, updated).await?))
}

#[utoipa::path(
    delete,
    path = "/api/v1/admin/comments/{id}",
    security(("jwt_token" = [])),
    params(("id" = i32, Path, description = "Comment ID")),
    responses(
        (status = 200, description = "Comment deleted", body = String),
        (status = 403, description = "Requires comments.delete", body = AppError),
        (status = 404, description = "Comment not found", body = AppError),
    ),
    tag = "admin"
)]
pub async fn delete_comment(
    Extension(db): Extension<DatabaseConnection>,
    auth_user: AuthUser,
    Path(id): Path<i32>,
) -> AppResult<impl IntoResponse> {
    require_permission(&auth_user, Permission::CommentsDelete)?;
    CommentService::new(db).delete(id, &auth_user).await?;
    Ok(ApiResponse::ok("Comment deleted"))
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct AdminUserQuery {
    pub page: Option<u64>,
    pub per_page: Option<u64>,
    /// Matches username or email
    pub q: Option<String>,
    pub role: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateUserRequest {
    #[validate(length(min = 3, max = 50))]
    pub username: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 8, max = 128))]
    pub password: String,
    /// Defaults to `user`. Only admins may create admins.
    pub role: Option<UserRole>,
    /// Defaults to the empty matrix. Only admins may grant permissions.
    pub permissions: Option<PermissionMatrix>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateRoleRequest {
    pub role: UserRole,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdatePermissionsRequest {
    pub permissions: PermissionMatrix,
}

#[utoipa::path(
    get,
    path = "/api/v1/admin/users",
    security(("jwt_token" = [])),
    params(
        ("page" = Option<u64>, Query, description = "Page number"),
        ("per_page" = Option<u64>, Query, description = "Items per page"),
        ("q" = Option<String>, Query, description = "Username or email"),
        ("role" = Option<String>, Query, description = "admin or user"),
    ),
    responses(
        (status = 200, description = "Users, newest first", body = PaginatedResponse<UserResponse>),
        (status = 400, description = "Invalid role", body = AppError),
        (status = 403, description = "Requires users.view", body = AppError),
    ),
    tag = "admin"
)]
pub async fn list_users(
    Extension(db): Extension<DatabaseConnection>,
    auth_user: AuthUser,
    Query(params): Query<AdminUserQuery>,
) -> AppResult<impl IntoResponse> {
    require_permission(&auth_user, Permission::UsersView)?;

    let (page, per_page) = resolve_page(params.page, params.per_page);
    let role = match params.role.as_deref().map(str::trim) {
        None | Some("") | Some("all") => None,
        Some(raw) => Some(raw.parse::<UserRole>().map_err(AppError::Validation)?),
    };

    let (users, total) = UserService::new(db)
        .list(params.q.as_deref(), role, page, per_page)
        .await?;
    let items: Vec<UserResponse> = users.into_iter().map(UserResponse::from).collect();

    Ok(ApiResponse::ok(PaginatedResponse::new(
        items, total, page, per_page,
    )))
}

#[utoipa::path(
    post,
    path = "/api/v1/admin/users",
    security(("jwt_token" = [])),
    request_body = CreateUserRequest,
    responses(
        (status = 200, description = "User created", body = UserResponse),
        (status = 400, description = "Validation error", body = AppError),
        (status = 403, description = "Requires users.create", body = AppError),
        (status = 409, description = "Username or email taken", body = AppError),
    ),
    tag = "admin"
)]
pub async fn create_user(
    Extension(db): Extension<DatabaseConnection>,
    auth_user: AuthUser,
    Json(payload): Json<CreateUserRequest>,
) -> AppResult<impl IntoResponse> {
    let actor_id = require_permission(&auth_user, Permission::UsersCreate)?;
    payload.validate()?;

    let role = payload.role.unwrap_or_default();
    let permissions = payload.permissions.unwrap_or_default();
    let elevated = role == UserRole::Admin || permissions != PermissionMatrix::default();
    if elevated {
        require_admin(&auth_user)?;
    }

    let created = UserService::new(db)
        .admin_create(
            actor_id,
            NewUser {
                username: payload.username.trim(),
                email: payload.email.trim(),
                password: &payload.password,
                role,
                permissions,
            },
        )
        .await?;
    Ok(ApiResponse::ok(UserResponse::from(created)))
}

#[utoipa::path(
    delete,
    path = "/api/v1/admin/users/{id}",
    security(("jwt_token" = [])),
    params(("id" = i32, Path, description = "User ID")),
    responses(
        (status = 200, description = "User deleted", body = String),
        (status = 400, description = "Cannot delete yourself", body = AppError),
        (status = 403, description = "Requires users.delete, plus admin role for admin targets", body = AppError),
        (status = 404, description = "User not found", body = AppError),
    ),
    tag = "admin"
)]
pub async fn delete_user(
    Extension(db): Extension<DatabaseConnection>,
    auth_user: AuthUser,
    Path(id): Path<i32>,
) -> AppResult<impl IntoResponse> {
    UserService::new(db).delete(&auth_user, id).await?;
    Ok(ApiResponse::ok("User deleted"))
}

#[utoipa::path(
    put,
    path = "/api/v1/admin/users/{id}/role",
    security(("jwt_token" = [])),
    params(("id" = i32, Path, description = "User ID")),
    request_body = UpdateRoleRequest,
    responses(
        (status = 200, description = "Role updated", body = UserResponse),
        (status = 400, description = "Cannot change your own role", body = AppError),
        (status = 403, description = "Admin only", body = AppError),
        (status = 404, description = "User not found", body = AppError),
    ),
    tag = "admin"
)]
pub async fn update_user_role(
    Extension(db): Extension<DatabaseConnection>,
    auth_user: AuthUser,
    Path(id): Path<i32>,
    Json(payload): Json<UpdateRoleRequest>,
) -> AppResult<impl IntoResponse> {
    let actor_id = require_admin(&auth_user)?;
    let updated = UserService::new(db)
        .update_role(actor_id, id, payload.role)
        .await?;
    Ok(ApiResponse::ok(UserResponse::from(updated)))
}

#[utoipa::path(
    put,
    path = "/api/v1/admin/users/{id}/permissions",
    security(("jwt_token" = [])),
    params(("id" = i32, Path, description = "User ID")),
    request_body = UpdatePermissionsRequest,
    responses(
        (status = 200, description = "Permission matrix replaced", body = UserResponse),
        (status = 403, description = "Admin only", body = AppError),
        (status = 404, description = "User not found", body = AppError),
    ),
    tag = "admin"
)]
pub async fn update_user_permissions(
    Extension(db): Extension<DatabaseConnection>,
    auth_user: AuthUser,
    Path(id): Path<i32>,
    Json(payload): Json<UpdatePermissionsRequest>,
) -> AppResult<impl IntoResponse> {
    let actor_id = require_admin(&auth_user)?;
    let updated = UserService::new(db)
        .update_permissions(actor_id, id, payload.permissions)
        .await?;
    Ok(ApiResponse::ok(UserResponse::from(updated)))
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct AuditLogQuery {
    pub page: Option<u64>,
    pub per_page: Option<u64>,
    /// e.g. `prompt.review`
    pub action: Option<String>,
    /// `prompt`, `comment`, `user` or `category`
    pub target_type: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AuditLogResponse {
    pub id: i32,
    pub actor_id: Option<i32>,
    pub actor: Option<String>,
    pub action: String,
    pub target_type: String,
    pub target_id: i32,
    pub detail: Option<String>,
    pub created_at: String,
}

impl AuditLogResponse {
    fn build(log: AuditLogModel, actors: &HashMap<i32, String>) -> Self {
        Self {
            id: log.id,
            actor_id: log.actor_id,
            actor: log.actor_id.and_then(|id| actors.get(&id).cloned()),
            action: log.action,
            target_type: log.target_type,
            target_id: log.target_id,
            detail: log.detail,
            created_at: log.created_at.to_string(),
        }
    }
}

#[utoipa::path(
    get,
    path = "/api/v1/admin/logs",
    security(("jwt_token" = [])),
    params(
        ("page" = Option<u64>, Query, description = "Page number"),
        ("per_page" = Option<u64>, Query, description = "Items per page"),
        ("action" = Option<String>, Query, description = "Action name"),
        ("target_type" = Option<String>, Query, description = "Target type"),
    ),
    responses(
        (status = 200, description = "Audit log, newest first", body = PaginatedResponse<AuditLogResponse>),
        (status = 403, description = "Requires system.logs", body = AppError),
    ),
    tag = "admin"
)]
pub async fn list_logs(
    Extension(db): Extension<DatabaseConnection>,
    auth_user: AuthUser,
    Query(params): Query<AuditLogQuery>,
) -> AppResult<impl IntoResponse> {
    require_permission(&auth_user, Permission::SystemLogs)?;

    let (page, per_page) = resolve_page(params.page, params.per_page);
    let action = params.action.as_deref().map(str::trim).filter(|s| !s.is_empty());
    let target_type = params
        .target_type
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty());

    let (logs, total) = AuditService::new(db.clone())
        .list(action, target_type, page, per_page)
        .await?;
    let actor_ids = logs.iter().filter_map(|l| l.actor_id).collect();
    let actors = UserService::new(db).usernames(actor_ids).await?;
    let items: Vec<AuditLogResponse> = logs
        .into_iter()
        .map(|l| AuditLogResponse::build(l, &actors))
        .collect();

    Ok(ApiResponse::ok(PaginatedResponse::new(
        items, total, page, per_page,
    )))
}
