use crate::{
    error::{AppError, AppResult},
    models::{like, prompt, Like, Prompt, PromptModel},
};
use sea_orm::{
    sea_query::Expr, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    FromQueryResult, QueryFilter, Statement, TransactionTrait,
};
use serde::Serialize;
use utoipa::ToSchema;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub struct LikeState {
    pub liked: bool,
    pub like_count: i32,
}

/// Counter after applying `delta`, never below zero.
pub fn next_like_count(current: i32, delta: i32) -> i32 {
    current.saturating_add(delta).max(0)
}

pub struct LikeService {
    db: DatabaseConnection,
}

impl LikeService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Flips the caller's like on a prompt.
    ///
    /// The prompt row is locked before `likes` is touched, so concurrent
    /// toggles on one prompt queue up instead of deadlocking on the foreign
    /// key. The row change and the counter change commit together, and the
    /// counter moves only when a row was actually removed or created.
    pub async fn toggle(&self, user_id: i32, prompt_id: i32) -> AppResult<LikeState> {
        let txn = self.db.begin().await?;
        let current = lock_like_count(&txn, prompt_id).await?;

        let removed = Like::delete_many()
            .filter(like::Column::UserId.eq(user_id))
            .filter(like::Column::PromptId.eq(prompt_id))
            .exec(&txn)
            .await?
            .rows_affected;

        let (liked, delta) = if removed > 0 {
            (false, -1)
        } else {
            let inserted = txn
                .execute(Statement::from_sql_and_values(
                    sea_orm::DatabaseBackend::Postgres,
                    "INSERT INTO likes (user_id, prompt_id, created_at)
                     VALUES ($1, $2, NOW())
                     ON CONFLICT (user_id, prompt_id) DO NOTHING",
                    vec![user_id.into(), prompt_id.into()],
                ))
                .await?
                .rows_affected();
            (true, if inserted > 0 { 1 } else { 0 })
        };

        let like_count = next_like_count(current, delta);
        if like_count != current {
            Prompt::update_many()
                .col_expr(prompt::Column::LikeCount, Expr::value(like_count))
                .filter(prompt::Column::Id.eq(prompt_id))
                .exec(&txn)
                .await?;
        }
        txn.commit().await?;

        Ok(LikeState { liked, like_count })
    }

    pub async fn state(&self, user_id: i32, prompt_id: i32) -> AppResult<LikeState> {
        let prompt = Prompt::find_by_id(prompt_id)
            .one(&self.db)
            .await?
            .ok_or(AppError::NotFound)?;

        let liked = Like::find()
            .filter(like::Column::UserId.eq(user_id))
            .filter(like::Column::PromptId.eq(prompt_id))
            .one(&self.db)
            .await?
            .is_some();

        Ok(LikeState {
            liked,
            like_count: prompt.like_count,
        })
    }

    /// Approved prompts the user has liked, most recently liked first.
    pub async fn list_liked(
        &self,
        user_id: i32,
        page: u64,
        per_page: u64,
    ) -> AppResult<(Vec<PromptModel>, u64)> {
        let offset = page.saturating_sub(1) * per_page;

        let count_row = self
            .db
            .query_one(Statement::from_sql_and_values(
                sea_orm::DatabaseBackend::Postgres,
                "SELECT COUNT(*) AS count FROM likes l
                 JOIN prompts p ON p.id = l.prompt_id
                 WHERE l.user_id = $1 AND p.status = 'approved'",
                vec![user_id.into()],
            ))
            .await?
            .ok_or(AppError::Internal(anyhow::anyhow!("Count query failed")))?;
        let total: i64 = count_row.try_get_by_index(0)?;

        let prompts = PromptModel::find_by_statement(Statement::from_sql_and_values(
            sea_orm::DatabaseBackend::Postgres,
            "SELECT p.* FROM likes l
             JOIN prompts p ON p.id = l.prompt_id
             WHERE l.user_id = $1 AND p.status = 'approved'
             ORDER BY l.created_at DESC, l.id DESC
             LIMIT $2 OFFSET $3",
            vec![
                user_id.into(),
                (per_page as i64).into(),
                (offset as i64).into(),
            ],
        ))
        .all(&self.db)
        .await?;

        Ok((prompts, total as u64))
    }
}

/// Locks the prompt row for the rest of the transaction and returns its
/// current like count. Missing prompts are `NotFound`.
async fn lock_like_count<C: ConnectionTrait>(conn: &C, prompt_id: i32) -> AppResult<i32> {
    let row = conn
        .query_one(Statement::from_sql_and_values(
            sea_orm::DatabaseBackend::Postgres,
            "SELECT like_count FROM prompts WHERE id = $1 FOR UPDATE",
            vec![prompt_id.into()],
        ))
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(row.try_get_by_index(0)?)
}
