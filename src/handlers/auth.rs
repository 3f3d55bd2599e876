use crate::error::{AppError, AppResult};
use crate::middleware::AuthUser;
use crate::models::{PermissionMatrix, UserModel, UserRole};
use crate::response::ApiResponse;
use crate::services::auth::{AuthService, TokenPair};
use axum::{response::IntoResponse, Extension, Json};
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct RegisterRequest {
    /// Username (3-50 characters)
    #[validate(length(min = 3, max = 50))]
    pub username: String,
    /// Email address
    #[validate(email)]
    pub email: String,
    /// Password (min 8 characters, letters and digits)
    #[validate(length(min = 8, max = 128))]
    pub password: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginRequest {
    /// Username or email
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct RefreshTokenRequest {
    pub refresh_token: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: String,
    /// Always `Bearer`
    pub token_type: String,
}

impl From<TokenPair> for TokenResponse {
    fn from(pair: TokenPair) -> Self {
        Self {
            access_token: pair.access_token,
            refresh_token: pair.refresh_token,
            token_type: "Bearer".to_string(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AuthResponse {
    #[serde(flatten)]
    pub tokens: TokenResponse,
    pub user: UserResponse,
}

/// Account view for the owner and for admins.
#[derive(Debug, Serialize, ToSchema)]
pub struct UserResponse {
    pub id: i32,
    pub username: String,
    pub email: String,
    pub role: UserRole,
    pub permissions: PermissionMatrix,
    pub last_login_at: Option<String>,
    pub created_at: String,
}

impl From<UserModel> for UserResponse {
    fn from(user: UserModel) -> Self {
        let permissions = user.permission_matrix();
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            role: user.role,
            permissions,
            last_login_at: user.last_login_at.map(|t| t.to_string()),
            created_at: user.created_at.to_string(),
        }
    }
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 200, description = "User registered", body = AuthResponse),
        (status = 400, description = "Validation error", body = AppError),
        (status = 409, description = "Username or email already exists", body = AppError),
    ),
    tag = "auth"
)]
pub async fn register(
    Extension(db): Extension<DatabaseConnection>,
    Json(payload): Json<RegisterRequest>,
) -> AppResult<impl IntoResponse> {
    payload
        .validate()
        .map_err(|e| AppError::Validation(format!("Validation error: {e}")))?;

    let service = AuthService::new(db);
    let (user, tokens) = service
        .register(payload.username.trim(), payload.email.trim(), &payload.password)
        .await?;

    Ok(ApiResponse::with_message(
        AuthResponse {
            tokens: tokens.into(),
            user: user.into(),
        },
        "Registration successful",
    ))
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = AuthResponse),
        (status = 401, description = "Invalid credentials", body = AppError),
    ),
    tag = "auth"
)]
pub async fn login(
    Extension(db): Extension<DatabaseConnection>,
    Json(payload): Json<LoginRequest>,
) -> AppResult<impl IntoResponse> {
    let service = AuthService::new(db);
    let (user, tokens) = service
        .login(payload.username.trim(), &payload.password)
        .await?;

    Ok(ApiResponse::ok(AuthResponse {
        tokens: tokens.into(),
        user: user.into(),
    }))
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/refresh",
    request_body = RefreshTokenRequest,
    responses(
        (status = 200, description = "New token pair", body = TokenResponse),
        (status = 401, description = "Invalid or expired refresh token", body = AppError),
    ),
    tag = "auth"
)]
pub async fn refresh_token(
    Extension(db): Extension<DatabaseConnection>,
    Json(payload): Json<RefreshTokenRequest>,
) -> AppResult<impl IntoResponse> {
    let service = AuthService::new(db);
    let tokens = service.refresh(payload.refresh_token.trim()).await?;
    Ok(ApiResponse::ok(TokenResponse::from(tokens)))
}

#[utoipa::path(
    get,
    path = "/api/v1/auth/me",
    security(("jwt_token" = [])),
    responses(
        (status = 200, description = "Current user", body = UserResponse),
        (status = 401, description = "Unauthorized", body = AppError),
    ),
    tag = "auth"
)]
pub async fn get_current_user(
    Extension(db): Extension<DatabaseConnection>,
    auth_user: AuthUser,
) -> AppResult<impl IntoResponse> {
    let service = AuthService::new(db);
    let user = service.get_user_by_id(auth_user.user_id).await?;
    Ok(ApiResponse::ok(UserResponse::from(user)))
}
