use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();

        db.execute_unprepared(
            "CREATE INDEX IF NOT EXISTS idx_prompts_status_created
             ON prompts (status, created_at DESC)",
        )
        .await?;

        db.execute_unprepared(
            "CREATE INDEX IF NOT EXISTS idx_prompts_status_likes
             ON prompts (status, like_count DESC)",
        )
        .await?;

        db.execute_unprepared(
            "CREATE INDEX IF NOT EXISTS idx_comments_status_created
             ON comments (status, created_at DESC)",
        )
        .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();

        db.execute_unprepared("DROP INDEX IF EXISTS idx_prompts_status_created")
            .await?;
        db.execute_unprepared("DROP INDEX IF EXISTS idx_prompts_status_likes")
            .await?;
        db.execute_unprepared("DROP INDEX IF EXISTS idx_comments_status_created")
            .await?;

        Ok(())
    }
}
