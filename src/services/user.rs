use crate::{
    error::{AppError, AppResult},
    middleware::auth::{require_admin, require_permission, AuthUser},
    models::{user, Permission, PermissionMatrix, User, UserModel, UserRole},
    services::{
        audit::{self, AuditAction},
        prompt::like_pattern,
    },
    utils::{hash_password, password::password_weakness},
};
use sea_orm::{
    sea_query::{Expr, Func, LikeExpr},
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Statement, TransactionTrait,
};
use std::collections::HashMap;

pub struct NewUser<'a> {
    pub username: &'a str,
    pub email: &'a str,
    pub password: &'a str,
    pub role: UserRole,
    pub permissions: PermissionMatrix,
}

pub struct UserService {
    db: DatabaseConnection,
}

impl UserService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn get_by_id(&self, id: i32) -> AppResult<UserModel> {
        User::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or(AppError::NotFound)
    }

    pub async fn usernames(&self, ids: Vec<i32>) -> AppResult<HashMap<i32, String>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let rows: Vec<(i32, String)> = User::find()
            .select_only()
            .column(user::Column::Id)
            .column(user::Column::Username)
            .filter(user::Column::Id.is_in(ids))
            .into_tuple()
            .all(&self.db)
            .await?;
        Ok(rows.into_iter().collect())
    }

    /// Inserts a user after checking password strength and uniqueness.
    pub async fn create(&self, new_user: NewUser<'_>) -> AppResult<UserModel> {
        insert_user(&self.db, new_user).await
    }

    pub async fn list(
        &self,
        search: Option<&str>,
        role: Option<UserRole>,
        page: u64,
        per_page: u64,
    ) -> AppResult<(Vec<UserModel>, u64)> {
        let mut query = User::find();
        if let Some(role) = role {
            query = query.filter(user::Column::Role.eq(role));
        }
        if let Some(term) = search.map(str::trim).filter(|s| !s.is_empty()) {
            let pattern = like_pattern(term);
            let matches = |col: user::Column| {
                Expr::expr(Func::lower(Expr::col((user::Entity, col))))
                    .like(LikeExpr::new(pattern.clone()).escape('\\'))
            };
            query = query.filter(
                Condition::any()
                    .add(matches(user::Column::Username))
                    .add(matches(user::Column::Email)),
            );
        }

        let paginator = query
            .order_by_desc(user::Column::CreatedAt)
            .order_by_desc(user::Column::Id)
            .paginate(&self.db, per_page);

        let total = paginator.num_items().await?;
        let users = paginator.fetch_page(page.saturating_sub(1)).await?;
        Ok((users, total))
    }

    pub async fn admin_create(
        &self,
        actor_id: i32,
        new_user: NewUser<'_>,
    ) -> AppResult<UserModel> {
        let txn = self.db.begin().await?;
        let created = insert_user(&txn, new_user).await?;
        audit::record(
            &txn,
            actor_id,
            AuditAction::UserCreate,
            created.id,
            Some(created.username.clone()),
        )
        .await?;
        txn.commit().await?;
        Ok(created)
    }

    /// Admins cannot change their own role, so the last admin can't lock
    /// everyone out by accident.
    pub async fn update_role(
        &self,
        actor_id: i32,
        user_id: i32,
        role: UserRole,
    ) -> AppResult<UserModel> {
        if actor_id == user_id {
            return Err(AppError::Validation(
                "You cannot change your own role".to_string(),
            ));
        }
        let existing = self.get_by_id(user_id).await?;

        let txn = self.db.begin().await?;
        let mut active: user::ActiveModel = existing.into();
        active.role = sea_orm::ActiveValue::Set(role);
        active.updated_at = sea_orm::ActiveValue::Set(chrono::Utc::now().naive_utc());
        let updated = active.update(&txn).await?;
        audit::record(
            &txn,
            actor_id,
            AuditAction::UserRole,
            user_id,
            Some(role.to_string()),
        )
        .await?;
        txn.commit().await?;
        Ok(updated)
    }

    pub async fn update_permissions(
        &self,
        actor_id: i32,
        user_id: i32,
        permissions: PermissionMatrix,
    ) -> AppResult<UserModel> {
        let existing = self.get_by_id(user_id).await?;

        let txn = self.db.begin().await?;
        let mut active: user::ActiveModel = existing.into();
        active.permissions = sea_orm::ActiveValue::Set(permissions.to_json());
        active.updated_at = sea_orm::ActiveValue::Set(chrono::Utc::now().naive_utc());
        let updated = active.update(&txn).await?;

        let granted: Vec<String> = permissions.granted().iter().map(|p| p.to_string()).collect();
        audit::record(
            &txn,
            actor_id,
            AuditAction::UserPermissions,
            user_id,
            Some(granted.join(",")),
        )
        .await?;
        txn.commit().await?;
        Ok(updated)
    }

    /// Removes a user with their prompts, comments and likes.
    ///
    /// Needs `users.delete`; deleting an admin account also needs the admin
    /// role. Like counters on prompts the user liked are decremented in the
    /// same transaction as the cascade that removes the like rows.
    pub async fn delete(&self, actor: &AuthUser, user_id: i32) -> AppResult<()> {
        let actor_id = require_permission(actor, Permission::UsersDelete)?;
        if actor_id == user_id {
            return Err(AppError::Validation(
                "You cannot delete your own account".to_string(),
            ));
        }
        let existing = self.get_by_id(user_id).await?;
        if existing.is_admin() {
            require_admin(actor)?;
        }

        let txn = self.db.begin().await?;
        txn.execute(Statement::from_sql_and_values(
            sea_orm::DatabaseBackend::Postgres,
            "UPDATE prompts SET like_count = GREATEST(like_count - 1, 0)
             WHERE id IN (SELECT prompt_id FROM likes WHERE user_id = $1)",
            vec![user_id.into()],
        ))
        .await?;
        User::delete_by_id(user_id).exec(&txn).await?;
        audit::record(
            &txn,
            actor_id,
            AuditAction::UserDelete,
            user_id,
            Some(existing.username),
        )
        .await?;
        txn.commit().await?;

        tracing::info!(actor_id, user_id, "user deleted");
        Ok(())
    }

    /// Stamps the login time and returns it.
    pub async fn touch_last_login(&self, user_id: i32) -> AppResult<chrono::NaiveDateTime> {
        let now = chrono::Utc::now().naive_utc();
        User::update_many()
            .col_expr(user::Column::LastLoginAt, Expr::value(now))
            .filter(user::Column::Id.eq(user_id))
            .exec(&self.db)
            .await?;
        Ok(now)
    }
}

pub(crate) async fn insert_user<C: ConnectionTrait>(
    conn: &C,
    new_user: NewUser<'_>,
) -> AppResult<UserModel> {
    if let Some(reason) = password_weakness(new_user.password) {
        return Err(AppError::Validation(reason.to_string()));
    }

    let taken = User::find()
        .filter(
            Condition::any()
                .add(user::Column::Username.eq(new_user.username))
                .add(user::Column::Email.eq(new_user.email)),
        )
        .count(conn)
        .await?;
    if taken > 0 {
        return Err(AppError::Conflict(
            "Username or email already exists".to_string(),
        ));
    }

    let password_hash = hash_password(new_user.password)?;
    let now = chrono::Utc::now().naive_utc();

    let active = user::ActiveModel {
        username: sea_orm::ActiveValue::Set(new_user.username.to_string()),
        email: sea_orm::ActiveValue::Set(new_user.email.to_string()),
        password_hash: sea_orm::ActiveValue::Set(password_hash),
        role: sea_orm::ActiveValue::Set(new_user.role),
        permissions: sea_orm::ActiveValue::Set(new_user.permissions.to_json()),
        last_login_at: sea_orm::ActiveValue::Set(None),
        created_at: sea_orm::ActiveValue::Set(now),
        updated_at: sea_orm::ActiveValue::Set(now),
        ..Default::default()
    };

    Ok(active.insert(conn).await?)
}
