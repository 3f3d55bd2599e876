use crate::{
    error::{AppError, AppResult},
    models::{prompt, Prompt, PromptModel, PromptStatus},
    services::{
        audit::{self, AuditAction},
        cache::{invalidate_categories, CacheService},
    },
};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter, TransactionTrait,
};

/// A review decision. The reason only survives when the target is `Rejected`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewDecision {
    pub status: PromptStatus,
    pub reason: Option<String>,
}

impl ReviewDecision {
    pub fn new(status: PromptStatus, reason: Option<&str>) -> Self {
        let reason = match status {
            PromptStatus::Rejected => reason
                .map(str::trim)
                .filter(|r| !r.is_empty())
                .map(str::to_string),
            _ => None,
        };
        Self { status, reason }
    }

    fn audit_detail(&self) -> String {
        match &self.reason {
            Some(reason) => format!("{}: {}", self.status, reason),
            None => self.status.to_string(),
        }
    }
}

pub struct ModerationService {
    db: DatabaseConnection,
    cache: Option<CacheService>,
}

impl ModerationService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db, cache: None }
    }

    pub fn with_cache(mut self, cache: CacheService) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Any status may move to any other status; re-applying the current
    /// status is allowed and refreshes the reviewer stamp.
    pub async fn review(
        &self,
        prompt_id: i32,
        decision: &ReviewDecision,
        reviewer_id: i32,
    ) -> AppResult<PromptModel> {
        let txn = self.db.begin().await?;
        let updated = apply_review(&txn, prompt_id, decision, reviewer_id).await?;
        txn.commit().await?;

        tracing::info!(
            prompt_id,
            reviewer_id,
            status = %decision.status,
            "prompt reviewed"
        );
        invalidate_categories(self.cache.as_ref()).await;
        Ok(updated)
    }

    /// All-or-nothing: one unknown id rolls the whole batch back.
    pub async fn review_many(
        &self,
        prompt_ids: &[i32],
        decision: &ReviewDecision,
        reviewer_id: i32,
    ) -> AppResult<Vec<PromptModel>> {
        let txn = self.db.begin().await?;
        let mut updated = Vec::with_capacity(prompt_ids.len());
        for &prompt_id in prompt_ids {
            updated.push(apply_review(&txn, prompt_id, decision, reviewer_id).await?);
        }
        txn.commit().await?;

        tracing::info!(
            count = updated.len(),
            reviewer_id,
            status = %decision.status,
            "prompts reviewed in batch"
        );
        invalidate_categories(self.cache.as_ref()).await;
        Ok(updated)
    }

    /// Recounted from the table on every call.
    pub async fn pending_count(&self) -> AppResult<u64> {
        Ok(Prompt::find()
            .filter(prompt::Column::Status.eq(PromptStatus::Pending))
            .count(&self.db)
            .await?)
    }
}

async fn apply_review<C: ConnectionTrait>(
    conn: &C,
    prompt_id: i32,
    decision: &ReviewDecision,
    reviewer_id: i32,
) -> AppResult<PromptModel> {
    let existing = Prompt::find_by_id(prompt_id)
        .one(conn)
        .await?
        .ok_or(AppError::NotFound)?;

    let now = chrono::Utc::now().naive_utc();
    let mut active: prompt::ActiveModel = existing.into();
    active.status = sea_orm::ActiveValue::Set(decision.status);
    active.rejection_reason = sea_orm::ActiveValue::Set(decision.reason.clone());
    active.reviewed_by = sea_orm::ActiveValue::Set(Some(reviewer_id));
    active.reviewed_at = sea_orm::ActiveValue::Set(Some(now));
    active.updated_at = sea_orm::ActiveValue::Set(now);
    let updated = active.update(conn).await?;

    audit::record(
        conn,
        reviewer_id,
        AuditAction::PromptReview,
        prompt_id,
        Some(decision.audit_detail()),
    )
    .await?;

    Ok(updated)
}
