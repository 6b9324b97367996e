use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(SecurityEvents::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(SecurityEvents::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(SecurityEvents::Kind).string().not_null())
                    .col(ColumnDef::new(SecurityEvents::Severity).string().not_null())
                    .col(ColumnDef::new(SecurityEvents::Message).string().not_null())
                    .col(ColumnDef::new(SecurityEvents::Details).string().null())
                    .col(
                        ColumnDef::new(SecurityEvents::RecordedAt)
                            .date_time()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        // Retention pruning and the newest-first listing both scan on recorded_at
        manager
            .create_index(
                Index::create()
                    .name("idx_security_events_recorded_at")
                    .table(SecurityEvents::Table)
                    .col(SecurityEvents::RecordedAt)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(SecurityEvents::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum SecurityEvents {
    Table,
    Id,
    Kind,
    Severity,
    Message,
    Details,
    RecordedAt,
}
