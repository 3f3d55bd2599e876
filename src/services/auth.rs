use crate::{
    error::{AppError, AppResult},
    models::{user, PermissionMatrix, User, UserModel, UserRole},
    services::user::{NewUser, UserService},
    utils::{
        encode_access_token, encode_refresh_token,
        jwt::{decode_token_of_kind, TokenKind},
        verify_password,
    },
};
use sea_orm::{ColumnTrait, Condition, DatabaseConnection, EntityTrait, QueryFilter};

#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

pub struct AuthService {
    db: DatabaseConnection,
}

impl AuthService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Self-service sign-up: plain `user` role, empty permission matrix.
    pub async fn register(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> AppResult<(UserModel, TokenPair)> {
        let user = UserService::new(self.db.clone())
            .create(NewUser {
                username,
                email,
                password,
                role: UserRole::User,
                permissions: PermissionMatrix::default(),
            })
            .await?;
        tracing::info!(user_id = user.id, "user registered");

        let tokens = issue_tokens(user.id)?;
        Ok((user, tokens))
    }

    /// `login` may be a username or an email address.
    pub async fn login(&self, login: &str, password: &str) -> AppResult<(UserModel, TokenPair)> {
        let mut user = User::find()
            .filter(
                Condition::any()
                    .add(user::Column::Username.eq(login))
                    .add(user::Column::Email.eq(login)),
            )
            .one(&self.db)
            .await?
            .ok_or(AppError::Unauthorized)?;

        if !verify_password(password, &user.password_hash)? {
            return Err(AppError::Unauthorized);
        }

        let logged_in_at = UserService::new(self.db.clone())
            .touch_last_login(user.id)
            .await?;
        user.last_login_at = Some(logged_in_at);

        let tokens = issue_tokens(user.id)?;
        Ok((user, tokens))
    }

    /// Exchanges a valid refresh token for a fresh pair.
    pub async fn refresh(&self, refresh_token: &str) -> AppResult<TokenPair> {
        let claims = decode_token_of_kind(refresh_token, TokenKind::Refresh)
            .map_err(|_| AppError::Unauthorized)?;
        let user_id = claims.user_id().ok_or(AppError::Unauthorized)?;

        // Deleted users can't keep refreshing.
        User::find_by_id(user_id)
            .one(&self.db)
            .await?
            .ok_or(AppError::Unauthorized)?;

        issue_tokens(user_id)
    }

    pub async fn get_user_by_id(&self, id: i32) -> AppResult<UserModel> {
        UserService::new(self.db.clone()).get_by_id(id).await
    }
}

fn issue_tokens(user_id: i32) -> AppResult<TokenPair> {
    Ok(TokenPair {
        access_token: encode_access_token(user_id)?,
        refresh_token: encode_refresh_token(user_id)?,
    })
}
