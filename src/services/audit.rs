use crate::{
    error::AppResult,
    models::{audit_log, AuditLog, AuditLogModel},
};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder,
};

/// Administrative actions that leave a row in `audit_logs`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditAction {
    PromptReview,
    PromptDelete,
    CommentStatus,
    CommentDelete,
    UserCreate,
    UserDelete,
    UserRole,
    UserPermissions,
    CategoryCreate,
    CategoryUpdate,
    CategoryDelete,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::PromptReview => "prompt.review",
            AuditAction::PromptDelete => "prompt.delete",
            AuditAction::CommentStatus => "comment.status",
            AuditAction::CommentDelete => "comment.delete",
            AuditAction::UserCreate => "user.create",
            AuditAction::UserDelete => "user.delete",
            AuditAction::UserRole => "user.role",
            AuditAction::UserPermissions => "user.permissions",
            AuditAction::CategoryCreate => "category.create",
            AuditAction::CategoryUpdate => "category.update",
            AuditAction::CategoryDelete => "category.delete",
        }
    }

    pub fn target_type(&self) -> &'static str {
        self.as_str()
            .split_once('.')
            .map(|(target, _)| target)
            .unwrap_or("unknown")
    }
}

/// Appends an audit row on `conn`, which may be an open transaction.
pub async fn record<C: ConnectionTrait>(
    conn: &C,
    actor_id: i32,
    action: AuditAction,
    target_id: i32,
    detail: Option<String>,
) -> AppResult<()> {
    let entry = audit_log::ActiveModel {
        actor_id: sea_orm::ActiveValue::Set(Some(actor_id)),
        action: sea_orm::ActiveValue::Set(action.as_str().to_string()),
        target_type: sea_orm::ActiveValue::Set(action.target_type().to_string()),
        target_id: sea_orm::ActiveValue::Set(target_id),
        detail: sea_orm::ActiveValue::Set(detail),
        created_at: sea_orm::ActiveValue::Set(chrono::Utc::now().naive_utc()),
        ..Default::default()
    };
    entry.insert(conn).await?;
    Ok(())
}

pub struct AuditService {
    db: DatabaseConnection,
}

impl AuditService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn list(
        &self,
        action: Option<&str>,
        target_type: Option<&str>,
        page: u64,
        per_page: u64,
    ) -> AppResult<(Vec<AuditLogModel>, u64)> {
        let mut query = AuditLog::find();
        if let Some(action) = action {
            query = query.filter(audit_log::Column::Action.eq(action));
        }
        if let Some(target_type) = target_type {
            query = query.filter(audit_log::Column::TargetType.eq(target_type));
        }

        let paginator = query
            .order_by_desc(audit_log::Column::CreatedAt)
            .order_by_desc(audit_log::Column::Id)
            .paginate(&self.db, per_page);

        let total = paginator.num_items().await?;
        let logs = paginator.fetch_page(page.saturating_sub(1)).await?;
        Ok((logs, total))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn target_type_follows_action_prefix() {
        assert_eq!(AuditAction::PromptReview.target_type(), "prompt");
        assert_eq!(AuditAction::UserPermissions.target_type(), "user");
        assert_eq!(AuditAction::CategoryDelete.target_type(), "category");
        assert_eq!(AuditAction::CommentStatus.as_str(), "comment.status");
    }
}
