use crate::error::{AppError, AppResult};
use crate::middleware::AuthUser;
use crate::models::{PromptModel, PromptStatus};
use crate::response::{resolve_page, ApiResponse, PaginatedResponse};
use crate::services::prompt::{PromptFilter, PromptInput, PromptLabels, PromptService, PromptSort};
use crate::utils::{markdown::excerpt, render_markdown};
use axum::{
    extract::{Path, Query},
    response::IntoResponse,
    Extension, Json,
};
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

const EXCERPT_CHARS: usize = 160;

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct PromptRequest {
    /// Title (1-200 characters)
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    /// Prompt body (Markdown)
    #[validate(length(min = 1, max = 20000))]
    pub content: String,
    #[validate(length(max = 500))]
    pub description: Option<String>,
    pub category_id: i32,
    /// Target model tag, e.g. `gpt-4`
    #[validate(length(min = 1, max = 50))]
    pub model: String,
}

impl PromptRequest {
    pub fn as_input(&self) -> PromptInput<'_> {
        PromptInput {
            title: &self.title,
            content: &self.content,
            description: self.description.as_deref(),
            category_id: self.category_id,
            model: &self.model,
        }
    }

    fn check(&self) -> AppResult<()> {
        self.validate()?;
        if self.title.trim().is_empty() || self.content.trim().is_empty() {
            return Err(AppError::Validation(
                "Title and content cannot be blank".to_string(),
            ));
        }
        if self.model.trim().is_empty() {
            return Err(AppError::Validation("Model cannot be blank".to_string()));
        }
        Ok(())
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PromptResponse {
    pub id: i32,
    pub title: String,
    /// Raw Markdown body
    pub content: String,
    /// Rendered body, only on detail responses
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_html: Option<String>,
    pub excerpt: String,
    pub description: Option<String>,
    pub category_id: i32,
    pub category_name: Option<String>,
    pub model: String,
    pub user_id: i32,
    pub author: Option<String>,
    pub status: PromptStatus,
    /// Display label of `status`
    pub status_label: String,
    pub rejection_reason: Option<String>,
    pub like_count: i32,
    pub view_count: i32,
    pub reviewed_by: Option<i32>,
    pub reviewed_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl PromptResponse {
    pub fn build(p: PromptModel, labels: &PromptLabels) -> Self {
        Self {
            id: p.id,
            excerpt: excerpt(&p.content, EXCERPT_CHARS),
            title: p.title,
            content: p.content,
            content_html: None,
            description: p.description,
            category_id: p.category_id,
            category_name: labels.categories.get(&p.category_id).cloned(),
            model: p.model,
            user_id: p.user_id,
            author: labels.authors.get(&p.user_id).cloned(),
            status: p.status,
            status_label: p.status.label().to_string(),
            rejection_reason: p.rejection_reason,
            like_count: p.like_count,
            view_count: p.view_count,
            reviewed_by: p.reviewed_by,
            reviewed_at: p.reviewed_at.map(|t| t.to_string()),
            created_at: p.created_at.to_string(),
            updated_at: p.updated_at.to_string(),
        }
    }

    pub fn with_html(mut self) -> Self {
        self.content_html = Some(render_markdown(&self.content));
        self
    }
}

/// Attaches author and category names to a page of prompts.
pub(crate) async fn to_responses(
    service: &PromptService,
    prompts: Vec<PromptModel>,
) -> AppResult<Vec<PromptResponse>> {
    let labels = service.labels(&prompts).await?;
    Ok(prompts
        .into_iter()
        .map(|p| PromptResponse::build(p, &labels))
        .collect())
}

pub(crate) async fn to_response(
    service: &PromptService,
    prompt: PromptModel,
) -> AppResult<PromptResponse> {
    let labels = service.labels(std::slice::from_ref(&prompt)).await?;
    Ok(PromptResponse::build(prompt, &labels))
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct PromptListQuery {
    pub page: Option<u64>,
    pub per_page: Option<u64>,
    /// Category slug
    pub category: Option<String>,
    pub model: Option<String>,
    /// Case-insensitive match on title, description and content
    pub q: Option<String>,
    /// `new` (default) or `popular`
    pub sort: Option<String>,
}

#[utoipa::path(
    get,
    path = "/api/v1/prompts",
    params(
        ("page" = Option<u64>, Query, description = "Page number"),
        ("per_page" = Option<u64>, Query, description = "Items per page"),
        ("category" = Option<String>, Query, description = "Category slug"),
        ("model" = Option<String>, Query, description = "Model tag"),
        ("q" = Option<String>, Query, description = "Search text"),
        ("sort" = Option<String>, Query, description = "Sort order: new, popular"),
    ),
    responses(
        (status = 200, description = "Approved prompts", body = PaginatedResponse<PromptResponse>),
        (status = 400, description = "Invalid sort", body = AppError),
    ),
    tag = "prompts"
)]
pub async fn list_prompts(
    Extension(db): Extension<DatabaseConnection>,
    Query(params): Query<PromptListQuery>,
) -> AppResult<impl IntoResponse> {
    let (page, per_page) = resolve_page(params.page, params.per_page);
    let sort: PromptSort = params.sort.as_deref().unwrap_or_default().parse()?;

    let service = PromptService::new(db);
    let filter = PromptFilter {
        category_slug: params.category,
        model: params.model,
        search: params.q,
        sort,
        ..Default::default()
    };
    let (prompts, total) = service.list_public(filter, page, per_page).await?;
    let items = to_responses(&service, prompts).await?;

    Ok(ApiResponse::ok(PaginatedResponse::new(
        items, total, page, per_page,
    )))
}

#[utoipa::path(
    get,
    path = "/api/v1/prompts/{id}",
    params(("id" = i32, Path, description = "Prompt ID")),
    responses(
        (status = 200, description = "Prompt details", body = PromptResponse),
        (status = 404, description = "Prompt not found or not approved", body = AppError),
    ),
    tag = "prompts"
)]
pub async fn get_prompt(
    Extension(db): Extension<DatabaseConnection>,
    Path(id): Path<i32>,
) -> AppResult<impl IntoResponse> {
    let service = PromptService::new(db);
    let prompt = service.view_public(id).await?;
    let response = to_response(&service, prompt).await?.with_html();
    Ok(ApiResponse::ok(response))
}

#[utoipa::path(
    post,
    path = "/api/v1/prompts",
    security(("jwt_token" = [])),
    request_body = PromptRequest,
    responses(
        (status = 200, description = "Prompt submitted for review", body = PromptResponse),
        (status = 400, description = "Validation error", body = AppError),
        (status = 401, description = "Unauthorized", body = AppError),
    ),
    tag = "prompts"
)]
pub async fn create_prompt(
    Extension(db): Extension<DatabaseConnection>,
    auth_user: AuthUser,
    Json(payload): Json<PromptRequest>,
) -> AppResult<impl IntoResponse> {
    payload.check()?;

    let service = PromptService::new(db);
    let prompt = service.create(auth_user.user_id, payload.as_input()).await?;
    let response = to_response(&service, prompt).await?;

    Ok(ApiResponse::with_message(response, "Prompt submitted for review"))
}

#[utoipa::path(
    put,
    path = "/api/v1/prompts/{id}",
    security(("jwt_token" = [])),
    params(("id" = i32, Path, description = "Prompt ID")),
    request_body = PromptRequest,
    responses(
        (status = 200, description = "Prompt updated", body = PromptResponse),
        (status = 400, description = "Validation error", body = AppError),
        (status = 403, description = "Not the owner", body = AppError),
        (status = 404, description = "Prompt not found", body = AppError),
    ),
    tag = "prompts"
)]
pub async fn update_prompt(
    Extension(db): Extension<DatabaseConnection>,
    auth_user: AuthUser,
    Path(id): Path<i32>,
    Json(payload): Json<PromptRequest>,
) -> AppResult<impl IntoResponse> {
    payload.check()?;

    let service = PromptService::new(db);
    let prompt = service.update(id, &auth_user, payload.as_input()).await?;
    let response = to_response(&service, prompt).await?;

    Ok(ApiResponse::ok(response))
}

#[utoipa::path(
    delete,
    path = "/api/v1/prompts/{id}",
    security(("jwt_token" = [])),
    params(("id" = i32, Path, description = "Prompt ID")),
    responses(
        (status = 200, description = "Prompt deleted", body = String),
        (status = 403, description = "Not the owner", body = AppError),
        (status = 404, description = "Prompt not found", body = AppError),
    ),
    tag = "prompts"
)]
pub async fn delete_prompt(
    Extension(db): Extension<DatabaseConnection>,
    auth_user: AuthUser,
    Path(id): Path<i32>,
) -> AppResult<impl IntoResponse> {
    let service = PromptService::new(db);
    service.delete(id, &auth_user).await?;
    Ok(ApiResponse::ok("Prompt deleted"))
}
