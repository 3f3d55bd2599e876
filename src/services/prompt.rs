use crate::{
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::{category, prompt, user, Category, Permission, Prompt, PromptModel, PromptStatus, User},
    services::audit::{self, AuditAction},
};
use sea_orm::{
    sea_query::{Expr, Func, LikeExpr},
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Select, TransactionTrait,
};
use std::collections::HashMap;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PromptSort {
    #[default]
    New,
    Popular,
}

impl FromStr for PromptSort {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "" | "new" | "latest" => Ok(PromptSort::New),
            "popular" | "hot" => Ok(PromptSort::Popular),
            other => Err(AppError::Validation(format!(
                "Invalid sort '{other}'. Must be one of: new, popular"
            ))),
        }
    }
}

/// Listing filters. `None` means "don't filter on this".
#[derive(Debug, Clone, Default)]
pub struct PromptFilter {
    pub status: Option<PromptStatus>,
    pub category_id: Option<i32>,
    pub category_slug: Option<String>,
    pub model: Option<String>,
    pub user_id: Option<i32>,
    pub search: Option<String>,
    pub sort: PromptSort,
}

pub struct PromptInput<'a> {
    pub title: &'a str,
    pub content: &'a str,
    pub description: Option<&'a str>,
    pub category_id: i32,
    pub model: &'a str,
}

/// Display names joined onto a page of prompts.
#[derive(Debug, Default)]
pub struct PromptLabels {
    pub authors: HashMap<i32, String>,
    pub categories: HashMap<i32, String>,
}

pub struct PromptService {
    db: DatabaseConnection,
}

impl PromptService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn list(
        &self,
        filter: &PromptFilter,
        page: u64,
        per_page: u64,
    ) -> AppResult<(Vec<PromptModel>, u64)> {
        let Some(query) = self.filtered(filter).await? else {
            return Ok((Vec::new(), 0));
        };

        let paginator = query.paginate(&self.db, per_page);
        let total = paginator.num_items().await?;
        let prompts = paginator.fetch_page(page.saturating_sub(1)).await?;
        Ok((prompts, total))
    }

    pub async fn count(&self, filter: &PromptFilter) -> AppResult<u64> {
        match self.filtered(filter).await? {
            Some(query) => Ok(query.count(&self.db).await?),
            None => Ok(0),
        }
    }

    /// Public listing: approved prompts only, whatever the caller asked for.
    pub async fn list_public(
        &self,
        filter: PromptFilter,
        page: u64,
        per_page: u64,
    ) -> AppResult<(Vec<PromptModel>, u64)> {
        let filter = PromptFilter {
            status: Some(PromptStatus::Approved),
            ..filter
        };
        self.list(&filter, page, per_page).await
    }

    /// Returns `None` when a named category does not exist, so the caller can
    /// answer with an empty page instead of ignoring the filter.
    async fn filtered(&self, filter: &PromptFilter) -> AppResult<Option<Select<Prompt>>> {
        let mut query = Prompt::find();

        if let Some(status) = filter.status {
            query = query.filter(prompt::Column::Status.eq(status));
        }
        if let Some(category_id) = filter.category_id {
            query = query.filter(prompt::Column::CategoryId.eq(category_id));
        }
        if let Some(slug) = filter.category_slug.as_deref().filter(|s| !s.is_empty()) {
            let Some(found) = Category::find()
                .filter(category::Column::Slug.eq(slug))
                .one(&self.db)
                .await?
            else {
                return Ok(None);
            };
            query = query.filter(prompt::Column::CategoryId.eq(found.id));
        }
        if let Some(model) = filter.model.as_deref().filter(|m| !m.is_empty()) {
            query = query.filter(prompt::Column::Model.eq(model));
        }
        if let Some(user_id) = filter.user_id {
            query = query.filter(prompt::Column::UserId.eq(user_id));
        }
        if let Some(search) = filter.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            let pattern = like_pattern(search);
            let matches = |col: prompt::Column| {
                Expr::expr(Func::lower(Expr::col((prompt::Entity, col))))
                    .like(LikeExpr::new(pattern.clone()).escape('\\'))
            };
            query = query.filter(
                Condition::any()
                    .add(matches(prompt::Column::Title))
                    .add(matches(prompt::Column::Description))
                    .add(matches(prompt::Column::Content)),
            );
        }

        query = match filter.sort {
            PromptSort::New => query
                .order_by_desc(prompt::Column::CreatedAt)
                .order_by_desc(prompt::Column::Id),
            PromptSort::Popular => query
                .order_by_desc(prompt::Column::LikeCount)
                .order_by_desc(prompt::Column::ViewCount)
                .order_by_desc(prompt::Column::CreatedAt),
        };

        Ok(Some(query))
    }

    pub async fn get_by_id(&self, id: i32) -> AppResult<PromptModel> {
        Prompt::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or(AppError::NotFound)
    }

    /// Approved prompt for the public detail page; bumps its view counter.
    pub async fn view_public(&self, id: i32) -> AppResult<PromptModel> {
        let mut found = Prompt::find_by_id(id)
            .filter(prompt::Column::Status.eq(PromptStatus::Approved))
            .one(&self.db)
            .await?
            .ok_or(AppError::NotFound)?;

        Prompt::update_many()
            .col_expr(
                prompt::Column::ViewCount,
                Expr::col(prompt::Column::ViewCount).add(1),
            )
            .filter(prompt::Column::Id.eq(id))
            .exec(&self.db)
            .await?;

        found.view_count += 1;
        Ok(found)
    }

    async fn ensure_category(&self, category_id: i32) -> AppResult<()> {
        Category::find_by_id(category_id)
            .one(&self.db)
            .await?
            .ok_or_else(|| AppError::Validation(format!("Unknown category {category_id}")))?;
        Ok(())
    }

    /// New submissions always start in review.
    pub async fn create(&self, user_id: i32, input: PromptInput<'_>) -> AppResult<PromptModel> {
        self.ensure_category(input.category_id).await?;

        let now = chrono::Utc::now().naive_utc();
        let new_prompt = prompt::ActiveModel {
            user_id: sea_orm::ActiveValue::Set(user_id),
            category_id: sea_orm::ActiveValue::Set(input.category_id),
            title: sea_orm::ActiveValue::Set(input.title.trim().to_string()),
            content: sea_orm::ActiveValue::Set(input.content.to_string()),
            description: sea_orm::ActiveValue::Set(normalize_optional(input.description)),
            model: sea_orm::ActiveValue::Set(input.model.trim().to_string()),
            status: sea_orm::ActiveValue::Set(PromptStatus::Pending),
            rejection_reason: sea_orm::ActiveValue::Set(None),
            like_count: sea_orm::ActiveValue::Set(0),
            view_count: sea_orm::ActiveValue::Set(0),
            reviewed_by: sea_orm::ActiveValue::Set(None),
            reviewed_at: sea_orm::ActiveValue::Set(None),
            created_at: sea_orm::ActiveValue::Set(now),
            updated_at: sea_orm::ActiveValue::Set(now),
            ..Default::default()
        };

        Ok(new_prompt.insert(&self.db).await?)
    }

    /// Owners may edit their own prompt, which sends it back to review.
    /// Holders of `prompts.edit` may edit anyone's without touching status.
    pub async fn update(
        &self,
        id: i32,
        editor: &AuthUser,
        input: PromptInput<'_>,
    ) -> AppResult<PromptModel> {
        let existing = self.get_by_id(id).await?;
        let is_owner = existing.user_id == editor.user_id;
        if !is_owner && !editor.can(Permission::PromptsEdit) {
            return Err(AppError::Forbidden);
        }
        if existing.category_id != input.category_id {
            self.ensure_category(input.category_id).await?;
        }

        let mut active: prompt::ActiveModel = existing.into();
        active.title = sea_orm::ActiveValue::Set(input.title.trim().to_string());
        active.content = sea_orm::ActiveValue::Set(input.content.to_string());
        active.description = sea_orm::ActiveValue::Set(normalize_optional(input.description));
        active.category_id = sea_orm::ActiveValue::Set(input.category_id);
        active.model = sea_orm::ActiveValue::Set(input.model.trim().to_string());
        if is_owner {
            active.status = sea_orm::ActiveValue::Set(PromptStatus::Pending);
            active.rejection_reason = sea_orm::ActiveValue::Set(None);
        }
        active.updated_at = sea_orm::ActiveValue::Set(chrono::Utc::now().naive_utc());

        Ok(active.update(&self.db).await?)
    }

    /// Owner delete, or moderator delete with `prompts.delete` (audited).
    pub async fn delete(&self, id: i32, actor: &AuthUser) -> AppResult<()> {
        let existing = self.get_by_id(id).await?;
        let is_owner = existing.user_id == actor.user_id;
        if !is_owner && !actor.can(Permission::PromptsDelete) {
            return Err(AppError::Forbidden);
        }

        let txn = self.db.begin().await?;
        Prompt::delete_by_id(id).exec(&txn).await?;
        if !is_owner {
            audit::record(
                &txn,
                actor.user_id,
                AuditAction::PromptDelete,
                id,
                Some(existing.title),
            )
            .await?;
        }
        txn.commit().await?;
        Ok(())
    }

    /// Owner-only delete used by the "my prompts" page.
    pub async fn delete_own(&self, id: i32, user_id: i32) -> AppResult<()> {
        let result = Prompt::delete_many()
            .filter(prompt::Column::Id.eq(id))
            .filter(prompt::Column::UserId.eq(user_id))
            .exec(&self.db)
            .await?;
        if result.rows_affected == 0 {
            return Err(AppError::NotFound);
        }
        Ok(())
    }

    /// Deletes every listed prompt that exists; returns how many went.
    pub async fn delete_many(&self, ids: &[i32], actor_id: i32) -> AppResult<u64> {
        if ids.is_empty() {
            return Ok(0);
        }

        let txn = self.db.begin().await?;
        let existing: Vec<i32> = Prompt::find()
            .select_only()
            .column(prompt::Column::Id)
            .filter(prompt::Column::Id.is_in(ids.iter().copied()))
            .into_tuple()
            .all(&txn)
            .await?;

        let result = Prompt::delete_many()
            .filter(prompt::Column::Id.is_in(existing.iter().copied()))
            .exec(&txn)
            .await?;
        for id in &existing {
            audit::record(&txn, actor_id, AuditAction::PromptDelete, *id, None).await?;
        }
        txn.commit().await?;

        Ok(result.rows_affected)
    }

    pub async fn labels(&self, prompts: &[PromptModel]) -> AppResult<PromptLabels> {
        if prompts.is_empty() {
            return Ok(PromptLabels::default());
        }

        let user_ids: Vec<i32> = prompts.iter().map(|p| p.user_id).collect();
        let category_ids: Vec<i32> = prompts.iter().map(|p| p.category_id).collect();

        let authors: Vec<(i32, String)> = User::find()
            .select_only()
            .column(user::Column::Id)
            .column(user::Column::Username)
            .filter(user::Column::Id.is_in(user_ids))
            .into_tuple()
            .all(&self.db)
            .await?;
        let categories: Vec<(i32, String)> = Category::find()
            .select_only()
            .column(category::Column::Id)
            .column(category::Column::Name)
            .filter(category::Column::Id.is_in(category_ids))
            .into_tuple()
            .all(&self.db)
            .await?;

        Ok(PromptLabels {
            authors: authors.into_iter().collect(),
            categories: categories.into_iter().collect(),
        })
    }
}

fn normalize_optional(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Case-insensitive `%term%` with LIKE wildcards escaped; pair it with
/// `.escape('\\')`.
pub(crate) fn like_pattern(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len() + 2);
    escaped.push('%');
    for c in term.to_lowercase().chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}
