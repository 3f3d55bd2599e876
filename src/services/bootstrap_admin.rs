use crate::config::rate_limit::parse_bool_env;
use crate::error::AppResult;
use crate::models::{user, PermissionMatrix, User, UserRole};
use crate::services::user::{insert_user, NewUser};
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};
use std::env;

#[derive(Debug, Clone)]
pub struct BootstrapAdminConfig {
    pub username: String,
    pub email: String,
    pub password: String,
}

impl BootstrapAdminConfig {
    pub fn from_env() -> Option<Self> {
        if !parse_bool_env("BOOTSTRAP_ADMIN_ENABLED", false) {
            return None;
        }

        Some(Self {
            username: env::var("BOOTSTRAP_ADMIN_USERNAME").ok()?,
            email: env::var("BOOTSTRAP_ADMIN_EMAIL").ok()?,
            password: env::var("BOOTSTRAP_ADMIN_PASSWORD").ok()?,
        })
    }
}

/// Makes sure at least one admin exists at startup:
/// - any admin already present: nothing to do
/// - configured username/email exists: promote it and grant the full matrix
/// - otherwise create the account as admin
pub async fn ensure_bootstrap_admin(db: &DatabaseConnection) -> AppResult<()> {
    let Some(cfg) = BootstrapAdminConfig::from_env() else {
        return Ok(());
    };

    let admin_exists = User::find()
        .filter(user::Column::Role.eq(UserRole::Admin))
        .one(db)
        .await?
        .is_some();
    if admin_exists {
        return Ok(());
    }

    let existing = User::find()
        .filter(
            sea_orm::Condition::any()
                .add(user::Column::Email.eq(cfg.email.clone()))
                .add(user::Column::Username.eq(cfg.username.clone())),
        )
        .one(db)
        .await?;

    if let Some(found) = existing {
        let user_id = found.id;
        let mut active: user::ActiveModel = found.into();
        active.role = sea_orm::ActiveValue::Set(UserRole::Admin);
        active.permissions = sea_orm::ActiveValue::Set(PermissionMatrix::full().to_json());
        active.updated_at = sea_orm::ActiveValue::Set(chrono::Utc::now().naive_utc());
        active.update(db).await?;
        tracing::info!(user_id, "promoted bootstrap admin");
        return Ok(());
    }

    let created = insert_user(
        db,
        NewUser {
            username: &cfg.username,
            email: &cfg.email,
            password: &cfg.password,
            role: UserRole::Admin,
            permissions: PermissionMatrix::full(),
        },
    )
    .await?;
    tracing::info!(user_id = created.id, "created bootstrap admin");
    Ok(())
}
