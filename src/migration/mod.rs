use sea_orm_migration::prelude::*;

mod m20250301_000001_create_users_table;
mod m20250301_000002_create_categories_table;
mod m20250301_000003_create_prompts_table;
mod m20250301_000004_create_comments_table;
mod m20250301_000005_create_likes_table;
mod m20250301_000006_create_audit_logs_table;
mod m20250301_000007_add_prompt_listing_indexes;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250301_000001_create_users_table::Migration),
            Box::new(m20250301_000002_create_categories_table::Migration),
            Box::new(m20250301_000003_create_prompts_table::Migration),
            Box::new(m20250301_000004_create_comments_table::Migration),
            Box::new(m20250301_000005_create_likes_table::Migration),
            Box::new(m20250301_000006_create_audit_logs_table::Migration),
            Box::new(m20250301_000007_add_prompt_listing_indexes::Migration),
        ]
    }
}
