use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(FilterViolations::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(FilterViolations::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(FilterViolations::OrganizationId)
                            .string_len(255)
                            .not_null(),
                    )
                    .col(ColumnDef::new(FilterViolations::FilterId).string_len(255).null())
                    .col(
                        ColumnDef::new(FilterViolations::RequestId)
                            .string_len(255)
                            .not_null(),
                    )
                    .col(ColumnDef::new(FilterViolations::SessionId).string_len(255).null())
                    .col(ColumnDef::new(FilterViolations::ServerId).string_len(255).null())
                    .col(
                        ColumnDef::new(FilterViolations::ViolationType)
                            .string_len(64)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(FilterViolations::ActionTaken)
                            .string_len(16)
                            .not_null(),
                    )
                    .col(ColumnDef::new(FilterViolations::ContentSnippet).text().null())
                    .col(ColumnDef::new(FilterViolations::PatternMatched).text().null())
                    .col(
                        ColumnDef::new(FilterViolations::Severity)
                            .string_len(16)
                            .not_null()
                            .default("medium"),
                    )
                    .col(
                        ColumnDef::new(FilterViolations::UserId)
                            .string_len(255)
                            .not_null()
                            .default(""),
                    )
                    .col(ColumnDef::new(FilterViolations::RemoteIp).string_len(64).null())
                    .col(ColumnDef::new(FilterViolations::UserAgent).text().null())
                    .col(ColumnDef::new(FilterViolations::Direction).string_len(16).null())
                    .col(ColumnDef::new(FilterViolations::Metadata).json().not_null())
                    .col(
                        ColumnDef::new(FilterViolations::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_filter_violations_org_created")
                    .table(FilterViolations::Table)
                    .col(FilterViolations::OrganizationId)
                    .col(FilterViolations::CreatedAt)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(FilterViolations::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum FilterViolations {
    Table,
    Id,
    OrganizationId,
    FilterId,
    RequestId,
    SessionId,
    ServerId,
    ViolationType,
    ActionTaken,
    ContentSnippet,
    PatternMatched,
    Severity,
    UserId,
    RemoteIp,
    UserAgent,
    Direction,
    Metadata,
    CreatedAt,
}
