use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ContentFilters::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ContentFilters::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(ContentFilters::OrganizationId)
                            .string_len(255)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ContentFilters::Name)
                            .string_len(255)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ContentFilters::Description)
                            .text()
                            .not_null()
                            .default(""),
                    )
                    .col(
                        ColumnDef::new(ContentFilters::Type)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ContentFilters::Enabled)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(ContentFilters::Priority)
                            .integer()
                            .not_null()
                            .default(100),
                    )
                    .col(ColumnDef::new(ContentFilters::Config).json().not_null())
                    .col(
                        ColumnDef::new(ContentFilters::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(ContentFilters::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(ColumnDef::new(ContentFilters::CreatedBy).string_len(255).null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_content_filters_org_name")
                    .table(ContentFilters::Table)
                    .col(ContentFilters::OrganizationId)
                    .col(ContentFilters::Name)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_content_filters_org_enabled")
                    .table(ContentFilters::Table)
                    .col(ContentFilters::OrganizationId)
                    .col(ContentFilters::Enabled)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ContentFilters::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum ContentFilters {
    Table,
    Id,
    OrganizationId,
    Name,
    Description,
    Type,
    Enabled,
    Priority,
    Config,
    CreatedAt,
    UpdatedAt,
    CreatedBy,
}
