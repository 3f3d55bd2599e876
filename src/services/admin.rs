use crate::{
    error::AppResult,
    models::{
        comment, prompt, user, Category, Comment, CommentStatus, Like, Prompt, PromptStatus, User,
    },
};
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect,
};
use serde::Serialize;
use utoipa::ToSchema;

const TOP_PROMPTS: u64 = 5;

#[derive(Debug, Serialize, ToSchema)]
pub struct AdminStats {
    pub total_users: u64,
    pub total_prompts: u64,
    pub pending_prompts: u64,
    pub approved_prompts: u64,
    pub rejected_prompts: u64,
    pub total_comments: u64,
    pub reported_comments: u64,
    pub total_likes: u64,
    pub total_categories: u64,
    pub users_today: u64,
    pub prompts_today: u64,
    pub top_prompts: Vec<TopPrompt>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TopPrompt {
    pub id: i32,
    pub title: String,
    pub like_count: i32,
    pub view_count: i32,
}

pub struct AdminService {
    db: DatabaseConnection,
}

impl AdminService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn get_stats(&self) -> AppResult<AdminStats> {
        let total_users = User::find().count(&self.db).await?;
        let total_prompts = Prompt::find().count(&self.db).await?;
        let pending_prompts = self.prompts_with(PromptStatus::Pending).await?;
        let approved_prompts = self.prompts_with(PromptStatus::Approved).await?;
        let rejected_prompts = self.prompts_with(PromptStatus::Rejected).await?;
        let total_comments = Comment::find().count(&self.db).await?;
        let reported_comments = Comment::find()
            .filter(comment::Column::Status.eq(CommentStatus::Reported))
            .count(&self.db)
            .await?;
        let total_likes = Like::find().count(&self.db).await?;
        let total_categories = Category::find().count(&self.db).await?;

        let today_start = chrono::Utc::now()
            .naive_utc()
            .date()
            .and_time(chrono::NaiveTime::MIN);

        let users_today = User::find()
            .filter(user::Column::CreatedAt.gte(today_start))
            .count(&self.db)
            .await?;
        let prompts_today = Prompt::find()
            .filter(prompt::Column::CreatedAt.gte(today_start))
            .count(&self.db)
            .await?;

        let top_prompts = Prompt::find()
            .filter(prompt::Column::Status.eq(PromptStatus::Approved))
            .order_by_desc(prompt::Column::LikeCount)
            .order_by_desc(prompt::Column::ViewCount)
            .limit(TOP_PROMPTS)
            .all(&self.db)
            .await?
            .into_iter()
            .map(|p| TopPrompt {
                id: p.id,
                title: p.title,
                like_count: p.like_count,
                view_count: p.view_count,
            })
            .collect();

        Ok(AdminStats {
            total_users,
            total_prompts,
            pending_prompts,
            approved_prompts,
            rejected_prompts,
            total_comments,
            reported_comments,
            total_likes,
            total_categories,
            users_today,
            prompts_today,
            top_prompts,
        })
    }

    async fn prompts_with(&self, status: PromptStatus) -> AppResult<u64> {
        Ok(Prompt::find()
            .filter(prompt::Column::Status.eq(status))
            .count(&self.db)
            .await?)
    }
}
