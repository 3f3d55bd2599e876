use crate::{
    error::{AppError, AppResult},
    models::{Permission, PermissionMatrix, User, UserModel, UserRole},
    utils::jwt::{decode_token_of_kind, TokenKind},
};
use axum::{
    extract::{FromRequestParts, Request},
    http::HeaderMap,
    middleware::Next,
    response::Response,
    Extension,
};
use sea_orm::{DatabaseConnection, EntityTrait};

/// Caller identity resolved from a verified access token.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: i32,
    pub role: UserRole,
    pub permissions: PermissionMatrix,
}

impl AuthUser {
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }

    /// Admins pass every granular check; everyone else needs the matrix entry.
    pub fn can(&self, permission: Permission) -> bool {
        self.is_admin() || self.permissions.allows(permission)
    }
}

impl From<&UserModel> for AuthUser {
    fn from(user: &UserModel) -> Self {
        Self {
            user_id: user.id,
            role: user.role,
            permissions: user.permission_matrix(),
        }
    }
}

/// Verifies `Authorization: Bearer <access token>` and loads the caller.
///
/// The user row is re-read on every request so role and permission edits
/// take effect without waiting for the token to expire.
pub async fn auth_middleware(
    Extension(db): Extension<DatabaseConnection>,
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = extract_bearer_token(&headers).ok_or(AppError::Unauthorized)?;

    let claims =
        decode_token_of_kind(&token, TokenKind::Access).map_err(|_| AppError::Unauthorized)?;
    let user_id = claims.user_id().ok_or(AppError::Unauthorized)?;

    let user = User::find_by_id(user_id)
        .one(&db)
        .await?
        .ok_or(AppError::Unauthorized)?;

    request.extensions_mut().insert(AuthUser::from(&user));

    Ok(next.run(request).await)
}

fn extract_bearer_token(headers: &HeaderMap) -> Option<String> {
    let auth_header = headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())?;

    let token = auth_header.strip_prefix("Bearer ")?.trim();
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}

pub fn require_admin(auth_user: &AuthUser) -> AppResult<i32> {
    if !auth_user.is_admin() {
        return Err(AppError::Forbidden);
    }
    Ok(auth_user.user_id)
}

pub fn require_permission(auth_user: &AuthUser, permission: Permission) -> AppResult<i32> {
    if !auth_user.can(permission) {
        tracing::debug!(
            user_id = auth_user.user_id,
            %permission,
            "permission denied"
        );
        return Err(AppError::Forbidden);
    }
    Ok(auth_user.user_id)
}

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut axum::http::request::Parts,
        _state: &S,
    ) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .ok_or(AppError::Unauthorized)
    }
}
