use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[derive(DeriveIden)]
enum Prompts {
    Table,
    Id,
    UserId,
    CategoryId,
    Title,
    Content,
    Description,
    Model,
    Status,
    RejectionReason,
    LikeCount,
    ViewCount,
    ReviewedBy,
    ReviewedAt,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Users {
    Table,
    Id,
}

#[derive(DeriveIden)]
enum Categories {
    Table,
    Id,
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Prompts::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Prompts::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Prompts::UserId).integer().not_null())
                    .col(ColumnDef::new(Prompts::CategoryId).integer().not_null())
                    .col(ColumnDef::new(Prompts::Title).string_len(200).not_null())
                    .col(ColumnDef::new(Prompts::Content).text().not_null())
                    .col(ColumnDef::new(Prompts::Description).text().null())
                    .col(ColumnDef::new(Prompts::Model).string_len(50).not_null())
                    .col(
                        ColumnDef::new(Prompts::Status)
                            .string_len(20)
                            .not_null()
                            .default("pending"),
                    )
                    .col(ColumnDef::new(Prompts::RejectionReason).text().null())
                    .col(
                        ColumnDef::new(Prompts::LikeCount)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Prompts::ViewCount)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(Prompts::ReviewedBy).integer().null())
                    .col(ColumnDef::new(Prompts::ReviewedAt).timestamp().null())
                    .col(
                        ColumnDef::new(Prompts::CreatedAt)
                            .timestamp()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Prompts::UpdatedAt)
                            .timestamp()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_prompts_user_id")
                            .from(Prompts::Table, Prompts::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_prompts_category_id")
                            .from(Prompts::Table, Prompts::CategoryId)
                            .to(Categories::Table, Categories::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_prompts_reviewed_by")
                            .from(Prompts::Table, Prompts::ReviewedBy)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_prompts_user_id")
                    .table(Prompts::Table)
                    .col(Prompts::UserId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_prompts_category_id")
                    .table(Prompts::Table)
                    .col(Prompts::CategoryId)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Prompts::Table).to_owned())
            .await
    }
}
