use crate::{
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::{comment, Comment, CommentModel, CommentStatus, Permission, Prompt, PromptStatus},
    services::audit::{self, AuditAction},
};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, TransactionTrait,
};

pub const MAX_COMMENT_CHARS: usize = 2000;

/// Trimmed comment body, or a validation error when nothing is left.
pub fn normalize_content(raw: &str) -> AppResult<String> {
    let content = raw.trim();
    if content.is_empty() {
        return Err(AppError::Validation(
            "Comment content cannot be empty".to_string(),
        ));
    }
    if content.chars().count() > MAX_COMMENT_CHARS {
        return Err(AppError::Validation(format!(
            "Comment content exceeds {MAX_COMMENT_CHARS} characters"
        )));
    }
    Ok(content.to_string())
}

pub struct CommentService {
    db: DatabaseConnection,
}

impl CommentService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    async fn ensure_public_prompt(&self, prompt_id: i32) -> AppResult<()> {
        Prompt::find_by_id(prompt_id)
            .one(&self.db)
            .await?
            .filter(|p| p.status == PromptStatus::Approved)
            .ok_or(AppError::NotFound)?;
        Ok(())
    }

    pub async fn list_by_prompt(
        &self,
        prompt_id: i32,
        page: u64,
        per_page: u64,
    ) -> AppResult<(Vec<CommentModel>, u64)> {
        self.ensure_public_prompt(prompt_id).await?;

        let paginator = Comment::find()
            .filter(comment::Column::PromptId.eq(prompt_id))
            .order_by_asc(comment::Column::CreatedAt)
            .order_by_asc(comment::Column::Id)
            .paginate(&self.db, per_page);

        let total = paginator.num_items().await?;
        let comments = paginator.fetch_page(page.saturating_sub(1)).await?;
        Ok((comments, total))
    }

    pub async fn create(&self, prompt_id: i32, user_id: i32, raw: &str) -> AppResult<CommentModel> {
        let content = normalize_content(raw)?;
        self.ensure_public_prompt(prompt_id).await?;

        let new_comment = comment::ActiveModel {
            prompt_id: sea_orm::ActiveValue::Set(prompt_id),
            user_id: sea_orm::ActiveValue::Set(user_id),
            content: sea_orm::ActiveValue::Set(content),
            status: sea_orm::ActiveValue::Set(CommentStatus::Normal),
            created_at: sea_orm::ActiveValue::Set(chrono::Utc::now().naive_utc()),
            ..Default::default()
        };

        Ok(new_comment.insert(&self.db).await?)
    }

    pub async fn get_by_id(&self, id: i32) -> AppResult<CommentModel> {
        Comment::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or(AppError::NotFound)
    }

    /// Authors delete their own comments; `comments.delete` deletes any
    /// and is audited.
    pub async fn delete(&self, id: i32, actor: &AuthUser) -> AppResult<()> {
        let existing = self.get_by_id(id).await?;
        let is_author = existing.user_id == actor.user_id;
        if !is_author && !actor.can(Permission::CommentsDelete) {
            return Err(AppError::Forbidden);
        }

        let txn = self.db.begin().await?;
        Comment::delete_by_id(id).exec(&txn).await?;
        if !is_author {
            audit::record(&txn, actor.user_id, AuditAction::CommentDelete, id, None).await?;
        }
        txn.commit().await?;
        Ok(())
    }

    /// Any signed-in user may flag a comment. Flagging twice is a no-op.
    pub async fn report(&self, id: i32, reporter_id: i32) -> AppResult<CommentModel> {
        let existing = self.get_by_id(id).await?;
        if existing.status == CommentStatus::Reported {
            return Ok(existing);
        }

        let mut active: comment::ActiveModel = existing.into();
        active.status = sea_orm::ActiveValue::Set(CommentStatus::Reported);
        let updated = active.update(&self.db).await?;

        tracing::info!(comment_id = id, reporter_id, "comment reported");
        Ok(updated)
    }

    pub async fn admin_list(
        &self,
        status: Option<CommentStatus>,
        prompt_id: Option<i32>,
        page: u64,
        per_page: u64,
    ) -> AppResult<(Vec<CommentModel>, u64)> {
        let mut query = Comment::find();
        if let Some(status) = status {
            query = query.filter(comment::Column::Status.eq(status));
        }
        if let Some(prompt_id) = prompt_id {
            query = query.filter(comment::Column::PromptId.eq(prompt_id));
        }

        let paginator = query
            .order_by_desc(comment::Column::CreatedAt)
            .order_by_desc(comment::Column::Id)
            .paginate(&self.db, per_page);

        let total = paginator.num_items().await?;
        let comments = paginator.fetch_page(page.saturating_sub(1)).await?;
        Ok((comments, total))
    }

    pub async fn set_status(
        &self,
        id: i32,
        status: CommentStatus,
        actor_id: i32,
    ) -> AppResult<CommentModel> {
        let existing = self.get_by_id(id).await?;

        let txn = self.db.begin().await?;
        let mut active: comment::ActiveModel = existing.into();
        active.status = sea_orm::ActiveValue::Set(status);
        let updated = active.update(&txn).await?;
        audit::record(
            &txn,
            actor_id,
            AuditAction::CommentStatus,
            id,
            Some(status.to_string()),
        )
        .await?;
        txn.commit().await?;

        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_and_whitespace_comments_are_rejected() {
        assert!(matches!(normalize_content(""), Err(AppError::Validation(_))));
        assert!(matches!(
            normalize_content(" \n\t "),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn content_is_trimmed() {
        assert_eq!(normalize_content("  nice prompt \n").unwrap(), "nice prompt");
    }

    #[test]
    fn overlong_comment_is_rejected() {
        let long = "字".repeat(MAX_COMMENT_CHARS + 1);
        assert!(normalize_content(&long).is_err());
        let exact = "a".repeat(MAX_COMMENT_CHARS);
        assert!(normalize_content(&exact).is_ok());
    }
}
