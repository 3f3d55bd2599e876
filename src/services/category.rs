use crate::{
    error::{AppError, AppResult},
    models::{category, prompt, Category, CategoryModel, Prompt},
    services::{
        audit::{self, AuditAction},
        cache::{invalidate_categories, CacheService, CATEGORY_LIST_KEY, CATEGORY_LIST_TTL_SECS},
    },
};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, FromQueryResult,
    PaginatorTrait, QueryFilter, Statement, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Category row plus the number of approved prompts filed under it.
#[derive(Debug, Clone, Serialize, Deserialize, FromQueryResult, ToSchema)]
pub struct CategoryWithCount {
    pub id: i32,
    pub name: String,
    pub slug: String,
    pub description: String,
    pub sort_order: i32,
    pub prompt_count: i64,
}

const LIST_SQL: &str = "SELECT c.id, c.name, c.slug, c.description, c.sort_order, \
        COUNT(p.id) AS prompt_count \
    FROM categories c \
    LEFT JOIN prompts p ON p.category_id = c.id AND p.status = 'approved' \
    GROUP BY c.id \
    ORDER BY c.sort_order ASC, c.id ASC";

pub struct CategoryInput<'a> {
    pub name: &'a str,
    pub slug: &'a str,
    pub description: &'a str,
    pub sort_order: i32,
}

pub struct CategoryService {
    db: DatabaseConnection,
    cache: Option<CacheService>,
}

impl CategoryService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db, cache: None }
    }

    pub fn with_cache(mut self, cache: CacheService) -> Self {
        self.cache = Some(cache);
        self
    }

    pub async fn list(&self) -> AppResult<Vec<CategoryWithCount>> {
        if let Some(cache) = &self.cache {
            if let Some(cached) = cache.get::<Vec<CategoryWithCount>>(CATEGORY_LIST_KEY).await {
                return Ok(cached);
            }
        }

        let categories = CategoryWithCount::find_by_statement(Statement::from_string(
            sea_orm::DatabaseBackend::Postgres,
            LIST_SQL,
        ))
        .all(&self.db)
        .await?;

        if let Some(cache) = &self.cache {
            cache
                .set(CATEGORY_LIST_KEY, &categories, CATEGORY_LIST_TTL_SECS)
                .await;
        }

        Ok(categories)
    }

    pub async fn get_by_slug(&self, slug: &str) -> AppResult<CategoryWithCount> {
        let category = Category::find()
            .filter(category::Column::Slug.eq(slug))
            .one(&self.db)
            .await?
            .ok_or(AppError::NotFound)?;
        let prompt_count = self.approved_count(category.id).await?;
        Ok(CategoryWithCount {
            id: category.id,
            name: category.name,
            slug: category.slug,
            description: category.description,
            sort_order: category.sort_order,
            prompt_count: prompt_count as i64,
        })
    }

    pub async fn get_by_id(&self, id: i32) -> AppResult<CategoryModel> {
        Category::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or(AppError::NotFound)
    }

    async fn approved_count(&self, category_id: i32) -> AppResult<u64> {
        Ok(Prompt::find()
            .filter(prompt::Column::CategoryId.eq(category_id))
            .filter(prompt::Column::Status.eq(crate::models::PromptStatus::Approved))
            .count(&self.db)
            .await?)
    }

    async fn ensure_unique(&self, name: &str, slug: &str, except: Option<i32>) -> AppResult<()> {
        let mut query = Category::find().filter(
            Condition::any()
                .add(category::Column::Name.eq(name))
                .add(category::Column::Slug.eq(slug)),
        );
        if let Some(id) = except {
            query = query.filter(category::Column::Id.ne(id));
        }
        if query.count(&self.db).await? > 0 {
            return Err(AppError::Conflict(
                "Category name or slug already exists".to_string(),
            ));
        }
        Ok(())
    }

    pub async fn create(&self, actor_id: i32, input: CategoryInput<'_>) -> AppResult<CategoryModel> {
        validate_slug(input.slug)?;
        self.ensure_unique(input.name, input.slug, None).await?;

        let now = chrono::Utc::now().naive_utc();
        let txn = self.db.begin().await?;
        let created = category::ActiveModel {
            name: sea_orm::ActiveValue::Set(input.name.to_string()),
            slug: sea_orm::ActiveValue::Set(input.slug.to_string()),
            description: sea_orm::ActiveValue::Set(input.description.to_string()),
            sort_order: sea_orm::ActiveValue::Set(input.sort_order),
            created_at: sea_orm::ActiveValue::Set(now),
            updated_at: sea_orm::ActiveValue::Set(now),
            ..Default::default()
        }
        .insert(&txn)
        .await?;
        audit::record(
            &txn,
            actor_id,
            AuditAction::CategoryCreate,
            created.id,
            Some(created.slug.clone()),
        )
        .await?;
        txn.commit().await?;

        invalidate_categories(self.cache.as_ref()).await;
        Ok(created)
    }

    pub async fn update(
        &self,
        actor_id: i32,
        id: i32,
        input: CategoryInput<'_>,
    ) -> AppResult<CategoryModel> {
        validate_slug(input.slug)?;
        let existing = self.get_by_id(id).await?;
        self.ensure_unique(input.name, input.slug, Some(id)).await?;

        let txn = self.db.begin().await?;
        let mut active: category::ActiveModel = existing.into();
        active.name = sea_orm::ActiveValue::Set(input.name.to_string());
        active.slug = sea_orm::ActiveValue::Set(input.slug.to_string());
        active.description = sea_orm::ActiveValue::Set(input.description.to_string());
        active.sort_order = sea_orm::ActiveValue::Set(input.sort_order);
        active.updated_at = sea_orm::ActiveValue::Set(chrono::Utc::now().naive_utc());
        let updated = active.update(&txn).await?;
        audit::record(&txn, actor_id, AuditAction::CategoryUpdate, id, None).await?;
        txn.commit().await?;

        invalidate_categories(self.cache.as_ref()).await;
        Ok(updated)
    }

    /// Refuses while any prompt (of any status) still points at the category.
    pub async fn delete(&self, actor_id: i32, id: i32) -> AppResult<()> {
        let existing = self.get_by_id(id).await?;
        let in_use = Prompt::find()
            .filter(prompt::Column::CategoryId.eq(id))
            .count(&self.db)
            .await?;
        if in_use > 0 {
            return Err(AppError::Conflict(format!(
                "Category still has {in_use} prompt(s)"
            )));
        }

        let txn = self.db.begin().await?;
        Category::delete_by_id(id).exec(&txn).await?;
        audit::record(
            &txn,
            actor_id,
            AuditAction::CategoryDelete,
            id,
            Some(existing.slug),
        )
        .await?;
        txn.commit().await?;

        invalidate_categories(self.cache.as_ref()).await;
        Ok(())
    }
}

/// Slugs are lowercase ASCII letters, digits and single hyphens.
pub fn validate_slug(slug: &str) -> AppResult<()> {
    let well_formed = !slug.is_empty()
        && slug.len() <= 50
        && !slug.starts_with('-')
        && !slug.ends_with('-')
        && !slug.contains("--")
        && slug
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-');
    if well_formed {
        Ok(())
    } else {
        Err(AppError::Validation(format!("Invalid slug '{slug}'")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_simple_slugs() {
        assert!(validate_slug("writing").is_ok());
        assert!(validate_slug("code-gen-2").is_ok());
    }

    #[test]
    fn rejects_malformed_slugs() {
        for bad in ["", "Writing", "code gen", "-lead", "trail-", "a--b", "写作"] {
            assert!(validate_slug(bad).is_err(), "{bad} should be rejected");
        }
    }
}
